use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database open failed: {0}")]
    Open(String),

    #[error("Database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Task log record not found: {0}")]
    LogNotFound(i64),
}
