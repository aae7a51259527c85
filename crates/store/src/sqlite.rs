//! SQLite-backed implementation of the task-log store.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;

use crate::error::StoreError;
use crate::model::{LogFilter, LogStatus, NewTaskLog, TaskLog, TaskStats};
use crate::session::{Persistence, Session};

/// Opens one connection per session against a single database file.
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn =
            Connection::open(&self.path).map_err(|e| StoreError::Open(e.to_string()))?;
        // WAL allows concurrent firings to read while one writes.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(conn)
    }
}

impl Persistence for SqliteStore {
    fn init_schema(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Open(e.to_string()))?;
        }
        let conn = self.connect()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS task_logs (
                 id            INTEGER PRIMARY KEY AUTOINCREMENT,
                 task_type     TEXT NOT NULL,
                 task_name     TEXT,
                 status        TEXT NOT NULL,
                 started_at    TEXT NOT NULL,
                 completed_at  TEXT,
                 result_data   TEXT,
                 error_message TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_task_logs_type   ON task_logs(task_type);
             CREATE INDEX IF NOT EXISTS idx_task_logs_status ON task_logs(status);",
        )?;
        info!("Task log schema ready at {}", self.path.display());
        Ok(())
    }

    fn open_session(&self) -> Result<Box<dyn Session>, StoreError> {
        Ok(Box::new(SqliteSession {
            conn: self.connect()?,
        }))
    }
}

struct SqliteSession {
    conn: Connection,
}

const LOG_COLUMNS: &str =
    "id, task_type, task_name, status, started_at, completed_at, result_data, error_message";

fn conversion_error(
    idx: usize,
    message: String,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("bad timestamp '{}': {}", raw, e)))
}

fn row_to_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskLog> {
    let status_raw: String = row.get(3)?;
    let status = LogStatus::parse(&status_raw)
        .ok_or_else(|| conversion_error(3, format!("bad status '{}'", status_raw)))?;

    let started_raw: String = row.get(4)?;
    let completed_raw: Option<String> = row.get(5)?;

    Ok(TaskLog {
        id: row.get(0)?,
        task_type: row.get(1)?,
        task_name: row.get(2)?,
        status,
        started_at: parse_timestamp(4, &started_raw)?,
        completed_at: match completed_raw {
            Some(raw) => Some(parse_timestamp(5, &raw)?),
            None => None,
        },
        result_data: row.get(6)?,
        error_message: row.get(7)?,
    })
}

impl Session for SqliteSession {
    fn insert_task_log(&mut self, new: &NewTaskLog) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO task_logs (task_type, task_name, status, started_at)
             VALUES (?1, ?2, 'running', ?3)",
            rusqlite::params![new.task_type, new.task_name, new.started_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_task_log(&mut self, id: i64) -> Result<Option<TaskLog>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM task_logs WHERE id = ?1",
            LOG_COLUMNS
        ))?;
        let mut rows = stmt.query_map([id], row_to_log)?;
        Ok(rows.next().transpose()?)
    }

    fn finalize_task_log(
        &mut self,
        id: i64,
        status: LogStatus,
        completed_at: DateTime<Utc>,
        result_data: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE task_logs
             SET status = ?2, completed_at = ?3, result_data = ?4, error_message = ?5
             WHERE id = ?1",
            rusqlite::params![
                id,
                status.as_str(),
                completed_at.to_rfc3339(),
                result_data,
                error_message
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::LogNotFound(id));
        }
        Ok(())
    }

    fn find_by_status(&mut self, status: LogStatus) -> Result<Vec<TaskLog>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM task_logs WHERE status = ?1 ORDER BY id",
            LOG_COLUMNS
        ))?;
        let rows = stmt.query_map([status.as_str()], row_to_log)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn mark_interrupted_all(
        &mut self,
        completed_at: DateTime<Utc>,
        message: &str,
    ) -> Result<usize, StoreError> {
        let changed = self.conn.execute(
            "UPDATE task_logs
             SET status = 'interrupted', completed_at = ?1, error_message = ?2
             WHERE status = 'running'",
            rusqlite::params![completed_at.to_rfc3339(), message],
        )?;
        Ok(changed)
    }

    fn query_task_logs(&mut self, filter: &LogFilter) -> Result<Vec<TaskLog>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM task_logs
             WHERE (?1 IS NULL OR task_type = ?1)
               AND (?2 IS NULL OR status = ?2)
             ORDER BY started_at DESC, id DESC
             LIMIT ?3",
            LOG_COLUMNS
        ))?;
        let rows = stmt.query_map(
            rusqlite::params![
                filter.task_type,
                filter.status.map(|s| s.as_str()),
                filter.limit as i64
            ],
            row_to_log,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn task_stats(&mut self) -> Result<TaskStats, StoreError> {
        let (total, completed, failed, running) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'running' THEN 1 ELSE 0 END), 0)
             FROM task_logs",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )?;
        Ok(TaskStats::from_counts(
            total as u64,
            completed as u64,
            failed as u64,
            running as u64,
        ))
    }
}
