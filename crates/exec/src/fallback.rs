//! Append-only disk log used when the database is unavailable.
//!
//! One JSON object per line. Never read by the running system; this is an
//! ops recovery artifact, never truncated or rotated here.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::json;
use tracing::{error, warn};

pub const FALLBACK_FILE_NAME: &str = "task_execution_fallback.jsonl";

#[derive(Debug, Clone)]
pub struct FallbackLog {
    path: PathBuf,
}

impl FallbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The conventional location: `<logs_dir>/task_execution_fallback.jsonl`.
    pub fn in_dir(logs_dir: &Path) -> Self {
        Self::new(logs_dir.join(FALLBACK_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. A write failure here is the one unrecoverable
    /// condition in the logging chain: it is reported at the highest
    /// severity and swallowed, so the task's own result stays unaffected.
    pub fn append(&self, task_type: &str, status: &str, data: serde_json::Value) {
        let entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "task_type": task_type,
            "status": status,
            "data": data,
        });
        match self.try_append(&entry) {
            Ok(()) => warn!("Fallback log written to disk for {}", task_type),
            Err(e) => error!("Triple-fault: could not even log to disk: {}", e),
        }
    }

    fn try_append(&self, entry: &serde_json::Value) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}
