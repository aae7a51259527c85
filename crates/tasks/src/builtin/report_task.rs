use std::path::PathBuf;

use chrono::Utc;
use serde_json::json;

use clockwork_core::save_json;

use crate::task::{Task, TaskMeta, TaskResult};

/// Generates a system status report file in the configured data directory.
#[derive(Debug)]
pub struct ReportTask {
    meta: TaskMeta,
    data_dir: PathBuf,
}

impl ReportTask {
    pub fn new(name: Option<&str>, data_dir: PathBuf) -> Self {
        Self {
            meta: TaskMeta::new(name.unwrap_or("ReportTask")),
            data_dir,
        }
    }

    /// Count backup snapshots currently on disk, for the report body.
    fn count_backups(&self) -> usize {
        std::fs::read_dir(&self.data_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| {
                        e.file_name().to_string_lossy().starts_with("backup_")
                            && e.path().extension().map(|x| x == "json").unwrap_or(false)
                    })
                    .count()
            })
            .unwrap_or(0)
    }

    fn run_report(&self) -> Result<TaskResult, clockwork_core::CoreError> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let report_file = self.data_dir.join(format!("report_{}.json", timestamp));

        let report_data = json!({
            "generated_at": timestamp,
            "system_status": "operational",
            "backups_on_disk": self.count_backups(),
        });
        save_json(&report_file, &report_data)?;

        Ok(TaskResult::success(json!({
            "report_file": report_file.to_string_lossy(),
        })))
    }
}

impl Task for ReportTask {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn execute(&self) -> TaskResult {
        self.meta.mark_running();
        match self.run_report() {
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
