//! Page navigation: validation, debouncing and empty-page resolution.
//!
//! Each request takes a generation number before it waits out the debounce
//! window. Only the request still holding the newest generation when its
//! timer fires may touch playback state; earlier ones in the same burst stop
//! waiting the moment they are superseded and never mutate anything.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use crate::cancellation::CancellationToken;
use crate::config::SyncConfig;
use crate::pagination::PageMap;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("no document is loaded")]
    NoDocument,
    #[error("page {requested} is outside 1..={total_pages}")]
    InvalidPage { requested: usize, total_pages: usize },
    #[error("page {requested} is empty and no readable page follows it")]
    NoReadablePage { requested: usize },
}

/// Where a validated request ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub page: usize,
    /// Set when an empty page was swapped for the next readable one.
    pub redirected_from: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct NavigationController {
    debounce: Duration,
    skip_empty_pages: bool,
    generation: Arc<watch::Sender<u64>>,
}

impl NavigationController {
    pub fn new(debounce: Duration, skip_empty_pages: bool) -> Self {
        Self {
            debounce,
            skip_empty_pages,
            generation: Arc::new(watch::Sender::new(0)),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.debounce(), config.skip_empty_pages)
    }

    pub fn validate(&self, map: &PageMap, page_number: usize) -> Result<(), NavigationError> {
        let total_pages = map.total_pages();
        if page_number == 0 || page_number > total_pages {
            return Err(NavigationError::InvalidPage {
                requested: page_number,
                total_pages,
            });
        }
        Ok(())
    }

    /// Claim the newest generation, superseding any pending request.
    pub fn begin(&self) -> u64 {
        let mut claimed = 0;
        self.generation.send_modify(|generation| {
            *generation = generation.wrapping_add(1);
            claimed = *generation;
        });
        claimed
    }

    pub fn is_current(&self, generation: u64) -> bool {
        *self.generation.borrow() == generation
    }

    /// Drop whatever request is pending.
    pub fn invalidate(&self) {
        self.generation
            .send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    /// Wait out the debounce window. Returns `false` as soon as the request
    /// is superseded or the session is torn down.
    pub async fn settle(&self, generation: u64, cancel: &CancellationToken) -> bool {
        let mut newer = self.generation.subscribe();
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(generation, "Navigation cancelled by teardown");
                false
            }
            _ = newer.wait_for(|current| *current != generation) => {
                debug!(generation, "Navigation superseded by a newer request");
                false
            }
            () = tokio::time::sleep(self.debounce) => self.is_current(generation),
        }
    }

    /// Pick the page a validated request should land on.
    pub fn resolve(&self, map: &PageMap, page_number: usize) -> Result<Resolution, NavigationError> {
        let page = map.page(page_number).ok_or(NavigationError::InvalidPage {
            requested: page_number,
            total_pages: map.total_pages(),
        })?;
        if !page.is_empty || !self.skip_empty_pages {
            return Ok(Resolution {
                page: page_number,
                redirected_from: None,
            });
        }
        map.next_non_empty_after(page_number)
            .map(|target| Resolution {
                page: target.page_number,
                redirected_from: Some(page_number),
            })
            .ok_or(NavigationError::NoReadablePage {
                requested: page_number,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with_gaps() -> PageMap {
        let page = |text: &str| vec![text.to_string()];
        PageMap::from_page_sentences(
            vec![
                page("First page text."),
                page("Second page text."),
                Vec::new(),
                page("Fourth page text."),
                Vec::new(),
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn rejects_pages_outside_document() {
        let controller = NavigationController::new(Duration::ZERO, true);
        let map = map_with_gaps();
        assert_eq!(
            controller.validate(&map, 0),
            Err(NavigationError::InvalidPage {
                requested: 0,
                total_pages: 5
            })
        );
        assert!(controller.validate(&map, 6).is_err());
        assert!(controller.validate(&map, 5).is_ok());
    }

    #[test]
    fn empty_page_redirects_forward() {
        let controller = NavigationController::new(Duration::ZERO, true);
        let resolution = controller.resolve(&map_with_gaps(), 3).unwrap();
        assert_eq!(
            resolution,
            Resolution {
                page: 4,
                redirected_from: Some(3)
            }
        );
    }

    #[test]
    fn trailing_empty_page_has_nowhere_to_go() {
        let controller = NavigationController::new(Duration::ZERO, true);
        assert_eq!(
            controller.resolve(&map_with_gaps(), 5),
            Err(NavigationError::NoReadablePage { requested: 5 })
        );
    }

    #[test]
    fn empty_pages_are_kept_when_skipping_disabled() {
        let controller = NavigationController::new(Duration::ZERO, false);
        let resolution = controller.resolve(&map_with_gaps(), 3).unwrap();
        assert_eq!(resolution.page, 3);
        assert_eq!(resolution.redirected_from, None);
    }

    #[test]
    fn newer_generation_supersedes_older() {
        let controller = NavigationController::new(Duration::ZERO, true);
        let first = controller.begin();
        let second = controller.begin();
        assert!(!controller.is_current(first));
        assert!(controller.is_current(second));
        controller.invalidate();
        assert!(!controller.is_current(second));
    }

    #[tokio::test(start_paused = true)]
    async fn settle_waits_for_the_debounce_window() {
        let controller = NavigationController::new(Duration::from_millis(300), true);
        let cancel = CancellationToken::new();
        let generation = controller.begin();
        let started = tokio::time::Instant::now();

        assert!(controller.settle(generation, &cancel).await);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_clears_the_pending_timer() {
        let controller = NavigationController::new(Duration::from_millis(300), true);
        let cancel = CancellationToken::new();
        let generation = controller.begin();
        let started = tokio::time::Instant::now();

        let (settled, ()) = tokio::join!(controller.settle(generation, &cancel), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        assert!(!settled);
        assert_eq!(started.elapsed(), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_request_stops_waiting_immediately() {
        let controller = NavigationController::new(Duration::from_millis(300), true);
        let cancel = CancellationToken::new();
        let first = controller.begin();
        let started = tokio::time::Instant::now();

        let (first_settled, second_settled) = tokio::join!(
            controller.settle(first, &cancel),
            async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                let second = controller.begin();
                let settled = controller.settle(second, &cancel).await;
                (settled, started.elapsed())
            }
        );

        assert!(!first_settled);
        assert_eq!(second_settled, (true, Duration::from_millis(400)));
    }
}
