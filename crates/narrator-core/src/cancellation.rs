//! Teardown signal for a narration session.

use std::sync::Arc;

use tokio::sync::watch;

/// Flipped once by `destroy`. Clones share the flag, and pending waits wake
/// as soon as it is set.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    flag: Arc<watch::Sender<bool>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self {
            flag: Arc::new(watch::Sender::new(false)),
        }
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the token had already been cancelled.
    pub fn cancel(&self) -> bool {
        self.flag.send_if_modified(|cancelled| !std::mem::replace(cancelled, true))
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut watcher = self.flag.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = watcher.wait_for(|cancelled| *cancelled).await;
    }
}
