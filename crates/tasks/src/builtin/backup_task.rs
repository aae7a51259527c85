use std::path::PathBuf;

use chrono::Utc;
use serde_json::json;

use clockwork_core::save_json;

use crate::task::{Task, TaskMeta, TaskResult};

/// Writes a timestamped backup snapshot file into the configured data
/// directory.
#[derive(Debug)]
pub struct BackupTask {
    meta: TaskMeta,
    data_dir: PathBuf,
}

impl BackupTask {
    pub fn new(name: Option<&str>, data_dir: PathBuf) -> Self {
        Self {
            meta: TaskMeta::new(name.unwrap_or("BackupTask")),
            data_dir,
        }
    }

    fn run_backup(&self) -> Result<TaskResult, clockwork_core::CoreError> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let backup_file = self.data_dir.join(format!("backup_{}.json", timestamp));

        let backup_data = json!({
            "timestamp": timestamp,
            "type": "full_backup",
            "status": "completed",
        });
        save_json(&backup_file, &backup_data)?;

        Ok(TaskResult::success(json!({
            "file": backup_file.to_string_lossy(),
            "timestamp": timestamp,
        })))
    }
}

impl Task for BackupTask {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn execute(&self) -> TaskResult {
        self.meta.mark_running();
        match self.run_backup() {
            Ok(result) => {
                self.meta.mark_completed();
                result
            }
            Err(e) => {
                self.meta.mark_failed(&e.to_string());
                TaskResult::failure(e.to_string())
            }
        }
    }
}
