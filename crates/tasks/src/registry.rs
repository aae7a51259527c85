//! Task-type registry and factory.
//!
//! An explicit mapping from task-type name to constructor, owned by whoever
//! builds it and extended only through [`TaskRegistry::register`]. No
//! reflection or auto-discovery.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::builtin::{BackupTask, CleanupTask, ReportTask};
use crate::task::{Task, TaskResult};

/// Injected configuration for the built-in tasks, so tests and deployments
/// can redirect all file output.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Directory backups and reports are written to, and the cleanup scan root.
    pub data_dir: PathBuf,
    /// Age in hours after which a `.tmp` file is considered stale.
    pub tmp_max_age_hours: u64,
}

impl TaskConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            tmp_max_age_hours: 24,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Unknown task type: '{requested}'. Available types: {available}")]
    UnknownType { requested: String, available: String },
}

type TaskConstructor = Arc<dyn Fn(Option<&str>) -> Box<dyn Task> + Send + Sync>;

/// Maps task-type names (case-insensitive) to task constructors.
pub struct TaskRegistry {
    constructors: HashMap<String, TaskConstructor>,
}

impl TaskRegistry {
    /// An empty registry. Most callers want [`TaskRegistry::with_builtins`].
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A registry seeded with the built-in types: backup, cleanup, report.
    pub fn with_builtins(config: TaskConfig) -> Self {
        let mut registry = Self::new();

        let cfg = config.clone();
        registry.register("backup", move |name| {
            Box::new(BackupTask::new(name, cfg.data_dir.clone()))
        });
        let cfg = config.clone();
        registry.register("cleanup", move |name| {
            Box::new(CleanupTask::new(name, cfg.data_dir.clone(), cfg.tmp_max_age_hours))
        });
        let cfg = config;
        registry.register("report", move |name| {
            Box::new(ReportTask::new(name, cfg.data_dir.clone()))
        });

        registry
    }

    /// Register a constructor for `task_type`. Keys are lower-cased;
    /// registering an existing key overwrites it (last writer wins).
    pub fn register<F>(&mut self, task_type: &str, constructor: F)
    where
        F: Fn(Option<&str>) -> Box<dyn Task> + Send + Sync + 'static,
    {
        let key = task_type.to_lowercase();
        if self.constructors.insert(key.clone(), Arc::new(constructor)).is_some() {
            warn!("Task type '{}' re-registered, replacing previous constructor", key);
        } else {
            info!("Registered task type: {}", key);
        }
    }

    /// Resolve `task_type` to a fresh task instance.
    ///
    /// Unknown types fail fast with a message listing the registered types;
    /// no default or no-op task is ever constructed.
    pub fn create(&self, task_type: &str, name: Option<&str>) -> Result<Box<dyn Task>, TaskError> {
        match self.constructors.get(&task_type.to_lowercase()) {
            Some(constructor) => Ok(constructor(name)),
            None => Err(TaskError::UnknownType {
                requested: task_type.to_string(),
                available: self.list_types().join(", "),
            }),
        }
    }

    /// Registered type names, sorted.
    pub fn list_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.constructors.keys().cloned().collect();
        types.sort();
        types
    }

    /// Convenience: create and execute in one call.
    pub fn run(&self, task_type: &str, name: Option<&str>) -> Result<TaskResult, TaskError> {
        let task = self.create(task_type, name)?;
        Ok(task.execute())
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    fn test_registry(dir: &std::path::Path) -> TaskRegistry {
        TaskRegistry::with_builtins(TaskConfig::new(dir))
    }

    #[test]
    fn builtins_are_registered() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = test_registry(tmp.path());
        assert_eq!(registry.list_types(), vec!["backup", "cleanup", "report"]);
    }

    #[test]
    fn all_builtin_types_execute_with_a_status() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = test_registry(tmp.path());

        for task_type in registry.list_types() {
            let result = registry.run(&task_type, None).unwrap();
            assert!(
                matches!(result.status, TaskStatus::Success | TaskStatus::Failed),
                "{} returned no status",
                task_type
            );
        }
    }

    #[test]
    fn unknown_type_lists_available_types() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = test_registry(tmp.path());

        let err = registry.create("teleport", None).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Unknown task type: 'teleport'"));
        assert!(msg.contains("backup, cleanup, report"));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = test_registry(tmp.path());
        assert!(registry.create("BACKUP", None).is_ok());
    }

    #[test]
    fn register_overwrites_existing_key() {
        let tmp = tempfile::tempdir().unwrap();
        let mut registry = test_registry(tmp.path());

        registry.register("Backup", |name| {
            Box::new(crate::builtin::ReportTask::new(name, std::path::PathBuf::from("/nowhere")))
        });

        // Still exactly one 'backup' entry, now resolving to the replacement.
        assert_eq!(registry.list_types(), vec!["backup", "cleanup", "report"]);
        let task = registry.create("backup", None).unwrap();
        assert_eq!(task.name(), "ReportTask");
    }

    #[test]
    fn custom_name_is_forwarded() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = test_registry(tmp.path());
        let task = registry.create("backup", Some("nightly")).unwrap();
        assert_eq!(task.name(), "nightly");
    }
}
