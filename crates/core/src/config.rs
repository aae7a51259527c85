use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_opt(key) {
        Some(v) => v == "true" || v == "1",
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub scheduler: SchedulerSettings,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            storage: StorageConfig::from_env(),
            scheduler: SchedulerSettings::from_env(),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  storage:    data_dir={}, logs_dir={}",
            self.storage.data_dir.display(),
            self.storage.logs_dir.display()
        );
        tracing::info!("  database:   path={}", self.storage.db_path.display());
        tracing::info!(
            "  scheduler:  tick={}ms, workers={}, max_instances={}, misfire_grace={}s, coalesce={}",
            self.scheduler.tick_interval_ms,
            self.scheduler.worker_threads,
            self.scheduler.max_instances,
            self.scheduler.misfire_grace_secs,
            self.scheduler.coalesce,
        );
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory task output files (backups, reports) are written to.
    pub data_dir: PathBuf,
    /// Directory for the disk fallback log.
    pub logs_dir: PathBuf,
    /// SQLite database file holding the task_logs table.
    pub db_path: PathBuf,
}

impl StorageConfig {
    fn from_env() -> Self {
        let data_dir = PathBuf::from(env_or("DATA_DIR", "data"));
        let db_path = env_opt("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("clockwork.db"));
        Self {
            data_dir,
            logs_dir: PathBuf::from(env_or("LOGS_DIR", "logs")),
            db_path,
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────

/// Raw scheduler settings from the environment. The scheduler crate maps
/// these into its own typed config at wiring time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Dispatch loop tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Number of worker threads. 0 = num_cpus.
    pub worker_threads: usize,
    /// Default cap on overlapping firings of the same job.
    pub max_instances: usize,
    /// Default grace window (seconds) for late firings.
    pub misfire_grace_secs: u64,
    /// Default coalesce policy for missed firings.
    pub coalesce: bool,
}

impl SchedulerSettings {
    fn from_env() -> Self {
        Self {
            tick_interval_ms: env_u64("SCHEDULER_TICK_MS", 500),
            worker_threads: env_usize("SCHEDULER_WORKER_THREADS", 0),
            max_instances: env_usize("SCHEDULER_MAX_INSTANCES", 3),
            misfire_grace_secs: env_u64("SCHEDULER_MISFIRE_GRACE_SECS", 60),
            coalesce: env_bool("SCHEDULER_COALESCE", false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_env_defaults_when_unset() {
        assert_eq!(env_u64("CLOCKWORK_TEST_UNSET_TICK", 500), 500);
        assert_eq!(env_usize("CLOCKWORK_TEST_UNSET_WORKERS", 0), 0);
    }

    #[test]
    fn env_bool_parses_truthy_values() {
        std::env::set_var("CLOCKWORK_TEST_BOOL", "1");
        assert!(env_bool("CLOCKWORK_TEST_BOOL", false));
        std::env::set_var("CLOCKWORK_TEST_BOOL", "true");
        assert!(env_bool("CLOCKWORK_TEST_BOOL", false));
        std::env::set_var("CLOCKWORK_TEST_BOOL", "no");
        assert!(!env_bool("CLOCKWORK_TEST_BOOL", true));
        std::env::remove_var("CLOCKWORK_TEST_BOOL");
    }

    #[test]
    fn db_path_defaults_under_data_dir() {
        let storage = StorageConfig {
            data_dir: PathBuf::from("data"),
            logs_dir: PathBuf::from("logs"),
            db_path: PathBuf::from("data").join("clockwork.db"),
        };
        assert!(storage.db_path.starts_with(&storage.data_dir));
    }
}
