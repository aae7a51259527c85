//! Centralized task execution: one entry point that guarantees the TaskLog
//! lifecycle is managed, failures are never masked, and alerts go out even
//! when the database is down.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{error, info, warn};

use clockwork_alerts::Alerter;
use clockwork_core::truncate_chars;
use clockwork_store::{LogStatus, NewTaskLog, Persistence, Session, StoreError};
use clockwork_tasks::{TaskRegistry, TaskResult};

use crate::fallback::FallbackLog;

/// Persisted payloads are capped at this many characters.
const PAYLOAD_LIMIT: usize = 500;

pub struct ExecutionService {
    store: Arc<dyn Persistence>,
    registry: Arc<TaskRegistry>,
    alerter: Arc<dyn Alerter>,
    fallback: FallbackLog,
}

impl ExecutionService {
    pub fn new(
        store: Arc<dyn Persistence>,
        registry: Arc<TaskRegistry>,
        alerter: Arc<dyn Alerter>,
        fallback: FallbackLog,
    ) -> Self {
        Self {
            store,
            registry,
            alerter,
            fallback,
        }
    }

    /// Execute one task invocation and manage its full lifecycle.
    ///
    /// The return value always mirrors the task's own result; logging and
    /// alerting are side effects. Task-level failures never escape this
    /// call, and a database outage downgrades logging to the disk fallback
    /// without affecting execution.
    pub fn execute_task(&self, task_type: &str, task_name: Option<&str>) -> TaskResult {
        let started_at = Utc::now();

        let (session, log_id) = self.initialize_log(task_type, task_name, started_at);

        let result = self.run_task(task_type, task_name);

        let status = if result.is_success() {
            LogStatus::Completed
        } else {
            LogStatus::Failed
        };
        self.finalize_log(session, log_id, task_type, status, &result);

        // Alerting is independent of the persistence path above: it fires
        // even when the database was down for the whole invocation.
        if status == LogStatus::Failed {
            let message = result.error.as_deref().unwrap_or("Unknown error");
            self.alerter
                .alert_task_failure(task_type, &truncate_chars(message, PAYLOAD_LIMIT));
        }

        result
        // Session (if any) was consumed by finalize_log and is already
        // released; nothing outlives the invocation.
    }

    /// Step (a): open a session and insert the `running` row. A failure here
    /// is a double-fault: recorded on disk, execution proceeds regardless.
    fn initialize_log(
        &self,
        task_type: &str,
        task_name: Option<&str>,
        started_at: DateTime<Utc>,
    ) -> (Option<Box<dyn Session>>, Option<i64>) {
        let mut session = match self.store.open_session() {
            Ok(s) => s,
            Err(e) => {
                self.init_double_fault(task_type, &e);
                return (None, None);
            }
        };

        let new = NewTaskLog {
            task_type: task_type.to_string(),
            task_name: task_name.unwrap_or(task_type).to_string(),
            started_at,
        };
        match session.insert_task_log(&new) {
            Ok(id) => {
                info!("Task {} started (log ID: {})", task_type, id);
                (Some(session), Some(id))
            }
            Err(e) => {
                self.init_double_fault(task_type, &e);
                (Some(session), None)
            }
        }
    }

    fn init_double_fault(&self, task_type: &str, e: &StoreError) {
        warn!("Double-fault: database failed during task init for {}: {}", task_type, e);
        self.fallback.append(
            task_type,
            LogStatus::Running.as_str(),
            json!({"error": "DB_DOWN", "msg": e.to_string()}),
        );
    }

    /// Step (b): run the task. Factory and task failures are converted into
    /// a failed result, never raised to the caller.
    fn run_task(&self, task_type: &str, task_name: Option<&str>) -> TaskResult {
        match self.registry.run(task_type, task_name) {
            Ok(result) => result,
            Err(e) => {
                error!("Critical task execution error for {}: {}", task_type, e);
                TaskResult::failure(e.to_string())
            }
        }
    }

    /// Step (c): load the row and finalize it with the truncated payload.
    /// Any persistence failure here falls back to disk, this time carrying
    /// the finalization status and result.
    fn finalize_log(
        &self,
        session: Option<Box<dyn Session>>,
        log_id: Option<i64>,
        task_type: &str,
        status: LogStatus,
        result: &TaskResult,
    ) {
        let completed_at = Utc::now();

        let outcome = match (session, log_id) {
            (Some(mut session), Some(id)) => {
                self.finalize_row(session.as_mut(), id, status, completed_at, result)
            }
            _ => Err(StoreError::Open("No active session or log ID".to_string())),
        };

        match outcome {
            Ok(id) => info!("Task {} finished: {} (log ID: {})", task_type, status, id),
            Err(e) => {
                warn!(
                    "Double-fault: database failed during task finalize for {}: {}",
                    task_type, e
                );
                let data = serde_json::to_value(result).unwrap_or_else(|_| json!({}));
                self.fallback.append(task_type, status.as_str(), data);
            }
        }
    }

    fn finalize_row(
        &self,
        session: &mut dyn Session,
        id: i64,
        status: LogStatus,
        completed_at: DateTime<Utc>,
        result: &TaskResult,
    ) -> Result<i64, StoreError> {
        session
            .get_task_log(id)?
            .ok_or(StoreError::LogNotFound(id))?;

        let (result_data, error_message) = match status {
            LogStatus::Completed => (Some(truncate_chars(&result.render(), PAYLOAD_LIMIT)), None),
            _ => {
                let message = result.error.as_deref().unwrap_or("Unknown");
                (None, Some(truncate_chars(message, PAYLOAD_LIMIT)))
            }
        };
        session.finalize_task_log(
            id,
            status,
            completed_at,
            result_data.as_deref(),
            error_message.as_deref(),
        )?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use clockwork_store::{LogFilter, SqliteStore, TaskLog, TaskStats};
    use clockwork_tasks::{Task, TaskStatus};

    // ── Test doubles ────────────────────────────────────────────

    #[derive(Debug)]
    struct OkTask;
    impl Task for OkTask {
        fn name(&self) -> &str {
            "OkTask"
        }
        fn execute(&self) -> TaskResult {
            TaskResult::success(json!({"file": "backup_x.json"}))
        }
    }

    #[derive(Debug)]
    struct FailingTask {
        message: String,
    }
    impl Task for FailingTask {
        fn name(&self) -> &str {
            "FailingTask"
        }
        fn execute(&self) -> TaskResult {
            TaskResult::failure(self.message.clone())
        }
    }

    #[derive(Default)]
    struct RecordingAlerter {
        calls: Mutex<Vec<(String, String)>>,
    }
    impl Alerter for RecordingAlerter {
        fn alert_task_failure(&self, task_type: &str, error_message: &str) {
            self.calls
                .lock()
                .unwrap()
                .push((task_type.to_string(), error_message.to_string()));
        }
    }

    /// Store whose sessions can never be opened (database down).
    struct DownStore;
    impl Persistence for DownStore {
        fn init_schema(&self) -> Result<(), StoreError> {
            Ok(())
        }
        fn open_session(&self) -> Result<Box<dyn Session>, StoreError> {
            Err(StoreError::Open("connection refused".to_string()))
        }
    }

    /// Store that opens sessions whose finalize path fails.
    struct FinalizeFailStore {
        inner: SqliteStore,
    }
    struct FinalizeFailSession {
        inner: Box<dyn Session>,
    }
    impl Persistence for FinalizeFailStore {
        fn init_schema(&self) -> Result<(), StoreError> {
            self.inner.init_schema()
        }
        fn open_session(&self) -> Result<Box<dyn Session>, StoreError> {
            Ok(Box::new(FinalizeFailSession {
                inner: self.inner.open_session()?,
            }))
        }
    }
    impl Session for FinalizeFailSession {
        fn insert_task_log(&mut self, new: &NewTaskLog) -> Result<i64, StoreError> {
            self.inner.insert_task_log(new)
        }
        fn get_task_log(&mut self, id: i64) -> Result<Option<TaskLog>, StoreError> {
            self.inner.get_task_log(id)
        }
        fn finalize_task_log(
            &mut self,
            _id: i64,
            _status: LogStatus,
            _completed_at: DateTime<Utc>,
            _result_data: Option<&str>,
            _error_message: Option<&str>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Open("lost connection".to_string()))
        }
        fn find_by_status(&mut self, status: LogStatus) -> Result<Vec<TaskLog>, StoreError> {
            self.inner.find_by_status(status)
        }
        fn mark_interrupted_all(
            &mut self,
            completed_at: DateTime<Utc>,
            message: &str,
        ) -> Result<usize, StoreError> {
            self.inner.mark_interrupted_all(completed_at, message)
        }
        fn query_task_logs(&mut self, filter: &LogFilter) -> Result<Vec<TaskLog>, StoreError> {
            self.inner.query_task_logs(filter)
        }
        fn task_stats(&mut self) -> Result<TaskStats, StoreError> {
            self.inner.task_stats()
        }
    }

    // ── Fixtures ────────────────────────────────────────────────

    fn registry() -> Arc<TaskRegistry> {
        let mut registry = TaskRegistry::new();
        registry.register("backup", |_| Box::new(OkTask));
        registry.register("flaky", |_| {
            Box::new(FailingTask {
                message: "disk full".to_string(),
            })
        });
        Arc::new(registry)
    }

    fn service_with(
        store: Arc<dyn Persistence>,
        fallback_dir: &std::path::Path,
    ) -> (ExecutionService, Arc<RecordingAlerter>) {
        let alerter = Arc::new(RecordingAlerter::default());
        let service = ExecutionService::new(
            store,
            registry(),
            alerter.clone(),
            FallbackLog::in_dir(fallback_dir),
        );
        (service, alerter)
    }

    fn sqlite_store(dir: &std::path::Path) -> Arc<SqliteStore> {
        let store = Arc::new(SqliteStore::new(dir.join("logs.db")));
        store.init_schema().unwrap();
        store
    }

    fn read_fallback_lines(dir: &std::path::Path) -> Vec<serde_json::Value> {
        let path = dir.join(crate::fallback::FALLBACK_FILE_NAME);
        if !path.exists() {
            return Vec::new();
        }
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    // ── Tests ───────────────────────────────────────────────────

    #[test]
    fn success_finalizes_log_and_skips_alert() {
        let tmp = tempfile::tempdir().unwrap();
        let store = sqlite_store(tmp.path());
        let (service, alerter) = service_with(store.clone(), tmp.path());

        let result = service.execute_task("backup", Some("nightly"));
        assert_eq!(result.status, TaskStatus::Success);

        let logs =
            clockwork_store::query_task_logs(store.as_ref(), &LogFilter::default()).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, LogStatus::Completed);
        assert_eq!(logs[0].task_type, "backup");
        assert_eq!(logs[0].task_name.as_deref(), Some("nightly"));
        assert!(logs[0].completed_at.is_some());
        assert!(logs[0].result_data.as_deref().unwrap().contains("backup_x.json"));

        assert!(alerter.calls.lock().unwrap().is_empty());
        assert!(read_fallback_lines(tmp.path()).is_empty());
    }

    #[test]
    fn failure_finalizes_log_and_alerts_once() {
        let tmp = tempfile::tempdir().unwrap();
        let store = sqlite_store(tmp.path());
        let (service, alerter) = service_with(store.clone(), tmp.path());

        let result = service.execute_task("flaky", None);
        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("disk full"));

        let logs =
            clockwork_store::query_task_logs(store.as_ref(), &LogFilter::default()).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, LogStatus::Failed);
        assert!(logs[0].error_message.as_deref().unwrap().contains("disk full"));
        assert!(logs[0].completed_at.is_some());

        let calls = alerter.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "flaky");
        assert_eq!(calls[0].1, "disk full");
    }

    #[test]
    fn unknown_type_becomes_failed_result_with_failed_log() {
        let tmp = tempfile::tempdir().unwrap();
        let store = sqlite_store(tmp.path());
        let (service, alerter) = service_with(store.clone(), tmp.path());

        let result = service.execute_task("teleport", None);
        assert_eq!(result.status, TaskStatus::Failed);
        assert!(result.error.as_deref().unwrap().contains("Unknown task type"));

        let logs =
            clockwork_store::query_task_logs(store.as_ref(), &LogFilter::default()).unwrap();
        assert_eq!(logs[0].status, LogStatus::Failed);
        assert_eq!(alerter.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn database_down_still_executes_and_records_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let (service, alerter) = service_with(Arc::new(DownStore), tmp.path());

        let result = service.execute_task("backup", None);
        assert_eq!(result.status, TaskStatus::Success);

        // Two fallback entries: the failed init and the finalize.
        let lines = read_fallback_lines(tmp.path());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "running");
        assert_eq!(lines[0]["data"]["error"], "DB_DOWN");
        assert_eq!(lines[1]["status"], "completed");

        assert!(alerter.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn database_down_does_not_suppress_failure_alert() {
        let tmp = tempfile::tempdir().unwrap();
        let (service, alerter) = service_with(Arc::new(DownStore), tmp.path());

        let result = service.execute_task("flaky", None);
        assert_eq!(result.status, TaskStatus::Failed);

        let calls = alerter.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "disk full");
    }

    #[test]
    fn finalize_failure_falls_back_with_final_status() {
        let tmp = tempfile::tempdir().unwrap();
        let inner = SqliteStore::new(tmp.path().join("logs.db"));
        inner.init_schema().unwrap();
        let store = Arc::new(FinalizeFailStore { inner });
        let (service, _alerter) = service_with(store, tmp.path());

        let result = service.execute_task("backup", None);
        assert_eq!(result.status, TaskStatus::Success);

        let lines = read_fallback_lines(tmp.path());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["status"], "completed");
        assert_eq!(lines[0]["data"]["status"], "success");
    }

    #[test]
    fn long_error_message_is_truncated_in_log_but_result_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let store = sqlite_store(tmp.path());

        let mut registry = TaskRegistry::new();
        registry.register("verbose", |_| {
            Box::new(FailingTask {
                message: "e".repeat(900),
            })
        });
        let alerter = Arc::new(RecordingAlerter::default());
        let service = ExecutionService::new(
            store.clone(),
            Arc::new(registry),
            alerter.clone(),
            FallbackLog::in_dir(tmp.path()),
        );

        let result = service.execute_task("verbose", None);
        assert_eq!(result.error.as_deref().unwrap().len(), 900);

        let logs =
            clockwork_store::query_task_logs(store.as_ref(), &LogFilter::default()).unwrap();
        assert_eq!(logs[0].error_message.as_deref().unwrap().len(), 500);
        assert_eq!(alerter.calls.lock().unwrap()[0].1.len(), 500);
    }

    #[test]
    fn triple_fault_is_swallowed() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocked");
        std::fs::write(&blocker, "not a dir").unwrap();

        let alerter = Arc::new(RecordingAlerter::default());
        let service = ExecutionService::new(
            Arc::new(DownStore),
            registry(),
            alerter,
            FallbackLog::new(blocker.join("deep").join("f.jsonl")),
        );

        // DB down and the fallback unwritable: the task result must still
        // come back unaffected.
        let result = service.execute_task("backup", None);
        assert_eq!(result.status, TaskStatus::Success);
    }
}
