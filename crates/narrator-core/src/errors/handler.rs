use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, info, warn};

use super::{ErrorDetails, ErrorInfo, ErrorLog, ErrorSeverity, ErrorStats, ErrorType};
use crate::events::{EventBus, SyncEvent};

pub const DEFAULT_MAX_RECOVERY_ATTEMPTS: usize = 3;

/// A recovery step; `Ok(())` means the failure was dealt with.
pub type RecoveryFn = Box<dyn Fn(&ErrorInfo) -> anyhow::Result<()> + Send + Sync>;

struct RecoveryAction {
    label: &'static str,
    run: RecoveryFn,
}

/// Classifies failures, runs the registered recovery actions and keeps the
/// bounded error history.
pub struct ErrorHandler {
    log: Mutex<ErrorLog>,
    actions: Mutex<BTreeMap<ErrorType, Vec<Arc<RecoveryAction>>>>,
    max_attempts: usize,
    events: EventBus,
}

impl std::fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("logged", &self.lock_log().len())
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl ErrorHandler {
    pub fn new(log_capacity: usize, max_attempts: usize, events: EventBus) -> Self {
        Self {
            log: Mutex::new(ErrorLog::with_capacity(log_capacity)),
            actions: Mutex::new(BTreeMap::new()),
            max_attempts: max_attempts.max(1),
            events,
        }
    }

    /// Append a recovery action for `error_type`. Actions run in registration
    /// order until one succeeds.
    pub fn register_action(&self, error_type: ErrorType, label: &'static str, run: RecoveryFn) {
        if !error_type.is_recoverable() {
            warn!(%error_type, label, "Ignoring recovery action for unrecoverable error type");
            return;
        }
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(error_type)
            .or_default()
            .push(Arc::new(RecoveryAction { label, run }));
    }

    pub fn action_labels(&self, error_type: ErrorType) -> Vec<&'static str> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&error_type)
            .map(|actions| actions.iter().map(|action| action.label).collect())
            .unwrap_or_default()
    }

    /// Record and try to recover from a failure. Returns `true` when the
    /// caller may continue.
    pub fn handle(
        &self,
        error_type: ErrorType,
        error: impl std::fmt::Display,
        context: Option<&str>,
        details: ErrorDetails,
    ) -> bool {
        let info = self.record(error_type, error, context, details);
        let recovered = info.recoverable && self.attempt_recovery(&info);
        self.publish(info, recovered)
    }

    /// Record a failure whose outcome the caller has already settled. No
    /// recovery actions run; an unrecoverable type is never reported as
    /// recovered.
    pub fn report(
        &self,
        error_type: ErrorType,
        error: impl std::fmt::Display,
        context: Option<&str>,
        details: ErrorDetails,
        recovered: bool,
    ) -> bool {
        let info = self.record(error_type, error, context, details);
        let recovered = recovered && info.recoverable;
        self.publish(info, recovered)
    }

    fn record(
        &self,
        error_type: ErrorType,
        error: impl std::fmt::Display,
        context: Option<&str>,
        details: ErrorDetails,
    ) -> ErrorInfo {
        let info = ErrorInfo::new(error_type, error.to_string(), context, details);
        match info.severity {
            ErrorSeverity::Critical => error!(
                %error_type,
                context = context.unwrap_or("-"),
                "{}",
                info.message
            ),
            _ => warn!(
                %error_type,
                severity = %info.severity,
                context = context.unwrap_or("-"),
                "{}",
                info.message
            ),
        }
        self.lock_log().push(info.clone());
        info
    }

    fn publish(&self, info: ErrorInfo, recovered: bool) -> bool {
        if info.halts_operation(recovered) {
            warn!(error_type = %info.error_type, "{}", info.user_message());
        }
        self.events.emit(&SyncEvent::Error { info, recovered });
        recovered
    }

    fn attempt_recovery(&self, info: &ErrorInfo) -> bool {
        // Cloned out so an action can report further errors without deadlocking.
        let actions: Vec<Arc<RecoveryAction>> = self
            .actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&info.error_type)
            .cloned()
            .unwrap_or_default();
        if actions.is_empty() {
            debug!(error_type = %info.error_type, "No recovery actions registered");
            return false;
        }

        for action in actions.iter().take(self.max_attempts) {
            debug!(error_type = %info.error_type, action = action.label, "Attempting recovery");
            match (action.run)(info) {
                Ok(()) => {
                    info!(error_type = %info.error_type, action = action.label, "Recovered");
                    return true;
                }
                Err(err) => {
                    warn!(
                        error_type = %info.error_type,
                        action = action.label,
                        "Recovery action failed: {err}"
                    );
                }
            }
        }
        false
    }

    pub fn stats(&self) -> ErrorStats {
        self.lock_log().stats()
    }

    pub fn recent(&self, count: usize) -> Vec<ErrorInfo> {
        self.lock_log().recent(count)
    }

    fn lock_log(&self) -> std::sync::MutexGuard<'_, ErrorLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
