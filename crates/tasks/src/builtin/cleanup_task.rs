use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde_json::json;
use tracing::debug;
use walkdir::WalkDir;

use crate::task::{Task, TaskMeta, TaskResult};

/// Removes stale `.tmp` files from the data directory.
#[derive(Debug)]
pub struct CleanupTask {
    meta: TaskMeta,
    data_dir: PathBuf,
    max_age: Duration,
}

impl CleanupTask {
    pub fn new(name: Option<&str>, data_dir: PathBuf, max_age_hours: u64) -> Self {
        Self {
            meta: TaskMeta::new(name.unwrap_or("CleanupTask")),
            data_dir,
            max_age: Duration::from_secs(max_age_hours * 3600),
        }
    }

    fn run_cleanup(&self) -> Result<TaskResult, std::io::Error> {
        let mut files_removed = 0u64;
        let mut bytes_freed = 0u64;

        if self.data_dir.exists() {
            let now = SystemTime::now();
            for entry in WalkDir::new(&self.data_dir).into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("tmp") {
                    continue;
                }

                let metadata = entry.metadata()?;
                let age = metadata
                    .modified()
                    .ok()
                    .and_then(|m| now.duration_since(m).ok())
                    .unwrap_or_default();
                if age < self.max_age {
                    continue;
                }

                debug!("Removing stale temp file: {}", path.display());
                std::fs::remove_file(path)?;
                files_removed += 1;
                bytes_freed += metadata.len();
            }
        }

        Ok(TaskResult::success(json!({
            "files_removed": files_removed,
            "space_freed_bytes": bytes_freed,
        })))
    }
}

impl Task for CleanupTask {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn execute(&self) -> TaskResult {
        self.meta.mark_running();
        match self.run_cleanup() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_stale_tmp_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        let stale = tmp.path().join("scratch.tmp");
        let keep = tmp.path().join("data.json");
        std::fs::write(&stale, "abc").unwrap();
        std::fs::write(&keep, "{}").unwrap();

        // max_age of 0 hours makes every .tmp file stale.
        let task = CleanupTask::new(None, tmp.path().to_path_buf(), 0);
        let result = task.execute();

        assert!(result.is_success());
        assert_eq!(result.data["files_removed"], 1);
        assert_eq!(result.data["space_freed_bytes"], 3);
        assert!(!stale.exists());
        assert!(keep.exists());
    }

    #[test]
    fn fresh_tmp_files_survive() {
        let tmp = tempfile::tempdir().unwrap();
        let fresh = tmp.path().join("inflight.tmp");
        std::fs::write(&fresh, "abc").unwrap();

        let task = CleanupTask::new(None, tmp.path().to_path_buf(), 24);
        let result = task.execute();

        assert!(result.is_success());
        assert_eq!(result.data["files_removed"], 0);
        assert!(fresh.exists());
    }

    #[test]
    fn missing_data_dir_is_a_clean_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let task = CleanupTask::new(None, tmp.path().join("absent"), 0);
        let result = task.execute();
        assert!(result.is_success());
        assert_eq!(result.data["files_removed"], 0);
    }
}
