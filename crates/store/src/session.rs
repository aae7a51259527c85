//! Trait seams for the durable task-log store.
//!
//! Every invocation acquires its own [`Session`] (scoped: released on drop,
//! on every exit path) and no session is shared between concurrent task
//! executions.

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::model::{LogFilter, LogStatus, NewTaskLog, TaskLog, TaskStats};

/// A scoped unit of database access. Dropping the session releases the
/// underlying connection.
pub trait Session: Send {
    /// Insert a fresh `running` row and return its id.
    fn insert_task_log(&mut self, new: &NewTaskLog) -> Result<i64, StoreError>;

    /// Load a row by id.
    fn get_task_log(&mut self, id: i64) -> Result<Option<TaskLog>, StoreError>;

    /// Transition a row to a terminal status with its payload.
    /// Fails with [`StoreError::LogNotFound`] when the row is absent.
    fn finalize_task_log(
        &mut self,
        id: i64,
        status: LogStatus,
        completed_at: DateTime<Utc>,
        result_data: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;

    /// All rows currently in `status`.
    fn find_by_status(&mut self, status: LogStatus) -> Result<Vec<TaskLog>, StoreError>;

    /// Transition every `running` row to `interrupted` in one statement.
    /// Returns the number of rows repaired.
    fn mark_interrupted_all(
        &mut self,
        completed_at: DateTime<Utc>,
        message: &str,
    ) -> Result<usize, StoreError>;

    /// Execution history, newest first.
    fn query_task_logs(&mut self, filter: &LogFilter) -> Result<Vec<TaskLog>, StoreError>;

    /// Aggregate counters over the whole history.
    fn task_stats(&mut self) -> Result<TaskStats, StoreError>;
}

/// Factory for sessions over one durable store.
pub trait Persistence: Send + Sync {
    /// Create the task_logs table and indexes if missing. Idempotent.
    fn init_schema(&self) -> Result<(), StoreError>;

    /// Acquire a fresh session.
    fn open_session(&self) -> Result<Box<dyn Session>, StoreError>;
}

/// Query execution history through a short-lived session.
pub fn query_task_logs(
    store: &dyn Persistence,
    filter: &LogFilter,
) -> Result<Vec<TaskLog>, StoreError> {
    store.open_session()?.query_task_logs(filter)
}

/// Aggregate stats through a short-lived session.
pub fn task_stats(store: &dyn Persistence) -> Result<TaskStats, StoreError> {
    store.open_session()?.task_stats()
}
