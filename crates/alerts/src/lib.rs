//! Failure alerting boundary.
//!
//! The actual transport (email, chat, pager) lives outside this system;
//! callers hand the execution service an [`Alerter`] implementation. The
//! contract is fire-and-forget: implementations must never panic or raise,
//! they log delivery problems themselves.

/// Alert channel for failed task invocations.
pub trait Alerter: Send + Sync {
    /// Notify that a task invocation finished `failed`.
    ///
    /// Must not raise; a delivery failure is the implementation's problem to
    /// log, not the caller's to handle.
    fn alert_task_failure(&self, task_type: &str, error_message: &str);
}

/// Default alerter: records the failure in the application log.
#[derive(Debug, Default)]
pub struct LogAlerter;

impl Alerter for LogAlerter {
    fn alert_task_failure(&self, task_type: &str, error_message: &str) {
        tracing::error!("ALERT: task '{}' failed: {}", task_type, error_message);
    }
}
