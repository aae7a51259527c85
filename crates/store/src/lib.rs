//! Durable task execution history.
//!
//! One [`TaskLog`] row per task invocation, stored in SQLite. The
//! [`Persistence`]/[`Session`] traits are the seam the execution service and
//! startup reconciliation consume, so tests can substitute failing or
//! recording stores.

pub mod error;
pub mod model;
pub mod session;
pub mod sqlite;

pub use error::StoreError;
pub use model::{LogFilter, LogStatus, NewTaskLog, TaskLog, TaskStats};
pub use session::{query_task_logs, task_stats, Persistence, Session};
pub use sqlite::SqliteStore;
