use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Outcome status of a single task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Success,
    Failed,
}

/// Structured result returned by every task execution.
///
/// Tasks never raise past their own boundary; internal errors are converted
/// into a `Failed` result carrying the error text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub status: TaskStatus,
    /// Task-specific success payload (file paths, counters, ...).
    #[serde(default)]
    pub data: serde_json::Value,
    /// Failure message, set only when `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            status: TaskStatus::Success,
            data,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed,
            data: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }

    /// Compact single-line rendering used for the persisted result payload.
    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self.status))
    }
}

/// In-process lifecycle of one task instance. Mirrored into the durable
/// TaskLog by the execution service; never persisted directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Identity and local lifecycle shared by all task instances.
///
/// Instances are created fresh per invocation and destroyed after execution
/// returns, so the state here only exists for in-flight observability.
#[derive(Debug)]
pub struct TaskMeta {
    pub name: String,
    pub created_at: DateTime<Utc>,
    state: Mutex<TaskState>,
}

impl TaskMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            state: Mutex::new(TaskState::Pending),
        }
    }

    pub fn state(&self) -> TaskState {
        *self.state.lock().unwrap()
    }

    /// Logging hook: the task is about to do its work.
    pub fn mark_running(&self) {
        info!("Task [{}] starting...", self.name);
        *self.state.lock().unwrap() = TaskState::Running;
    }

    /// Logging hook: the task finished successfully.
    pub fn mark_completed(&self) {
        info!("Task [{}] completed successfully", self.name);
        *self.state.lock().unwrap() = TaskState::Completed;
    }

    /// Logging hook: the task failed.
    pub fn mark_failed(&self, err: &str) {
        error!("Task [{}] failed: {}", self.name, err);
        *self.state.lock().unwrap() = TaskState::Failed;
    }
}

/// A unit of business logic the scheduler can execute.
///
/// `execute` is infallible at the signature level: implementations catch
/// their own errors and convert them into a failed [`TaskResult`].
pub trait Task: Send + Sync + std::fmt::Debug {
    /// Human-readable instance name (defaults to the type name).
    fn name(&self) -> &str;

    /// Perform the work and return a structured result.
    fn execute(&self) -> TaskResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_state_transitions() {
        let meta = TaskMeta::new("t");
        assert_eq!(meta.state(), TaskState::Pending);
        meta.mark_running();
        assert_eq!(meta.state(), TaskState::Running);
        meta.mark_completed();
        assert_eq!(meta.state(), TaskState::Completed);
        meta.mark_failed("boom");
        assert_eq!(meta.state(), TaskState::Failed);
    }

    #[test]
    fn failure_result_carries_error() {
        let r = TaskResult::failure("disk full");
        assert_eq!(r.status, TaskStatus::Failed);
        assert_eq!(r.error.as_deref(), Some("disk full"));
        assert!(!r.is_success());
    }

    #[test]
    fn render_includes_status() {
        let r = TaskResult::success(serde_json::json!({"file": "x.json"}));
        let rendered = r.render();
        assert!(rendered.contains("success"));
        assert!(rendered.contains("x.json"));
    }
}
