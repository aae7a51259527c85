use thiserror::Error;

use clockwork_store::StoreError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler not initialized. Call init() first.")]
    NotInitialized,

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job already exists: {0}")]
    JobConflict(String),

    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}
