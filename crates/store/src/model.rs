use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable status of one task invocation.
///
/// `Running` rows are only ever mutated by invocation finalize or by the
/// startup reconciliation sweep (`Running -> Interrupted`); terminal rows
/// are never touched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Running,
    Completed,
    Failed,
    Interrupted,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Running => "running",
            LogStatus::Completed => "completed",
            LogStatus::Failed => "failed",
            LogStatus::Interrupted => "interrupted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(LogStatus::Running),
            "completed" => Some(LogStatus::Completed),
            "failed" => Some(LogStatus::Failed),
            "interrupted" => Some(LogStatus::Interrupted),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record per task invocation.
///
/// Invariant: `status == Running` implies `completed_at` is `None`; every
/// non-running record has `completed_at` set.
#[derive(Debug, Clone, Serialize)]
pub struct TaskLog {
    pub id: i64,
    pub task_type: String,
    pub task_name: Option<String>,
    pub status: LogStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Truncated success payload.
    pub result_data: Option<String>,
    /// Truncated failure payload.
    pub error_message: Option<String>,
}

/// Fields for a fresh `running` row, created at invocation start.
#[derive(Debug, Clone)]
pub struct NewTaskLog {
    pub task_type: String,
    pub task_name: String,
    pub started_at: DateTime<Utc>,
}

/// Filter for querying execution history.
#[derive(Debug, Clone)]
pub struct LogFilter {
    pub task_type: Option<String>,
    pub status: Option<LogStatus>,
    pub limit: usize,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            task_type: None,
            status: None,
            limit: 100,
        }
    }
}

/// Aggregate execution statistics for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStats {
    pub total_executions: u64,
    pub completed: u64,
    pub failed: u64,
    pub running: u64,
    /// completed / total * 100, rounded to two decimals; 0 when empty.
    pub success_rate: f64,
}

impl TaskStats {
    pub fn from_counts(total: u64, completed: u64, failed: u64, running: u64) -> Self {
        let success_rate = if total > 0 {
            let rate = completed as f64 / total as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        } else {
            0.0
        };
        Self {
            total_executions: total,
            completed,
            failed,
            running,
            success_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in [
            LogStatus::Running,
            LogStatus::Completed,
            LogStatus::Failed,
            LogStatus::Interrupted,
        ] {
            assert_eq!(LogStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LogStatus::parse("bogus"), None);
    }

    #[test]
    fn stats_rate_rounds_to_two_decimals() {
        let stats = TaskStats::from_counts(3, 2, 1, 0);
        assert_eq!(stats.success_rate, 66.67);
    }

    #[test]
    fn stats_rate_is_zero_for_empty_history() {
        let stats = TaskStats::from_counts(0, 0, 0, 0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn stats_rate_full_success() {
        let stats = TaskStats::from_counts(1, 1, 0, 0);
        assert_eq!(stats.success_rate, 100.0);
    }
}
