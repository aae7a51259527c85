//! scheduler-worker: runs the background job scheduler as a process.
//!
//! Boot sequence: load config, ensure the task-log store exists, reconcile
//! zombie task records from a previous crash, register the built-in tasks,
//! re-register the standing jobs, start the scheduler, then wait for ctrl-c
//! and drain in-flight firings on the way out.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use clockwork_alerts::LogAlerter;
use clockwork_core::config::{load_dotenv, Config};
use clockwork_exec::{reconcile_zombie_tasks, ExecutionService, FallbackLog};
use clockwork_scheduler::{schedule_default_jobs, JobPolicy, JobRunner, Scheduler, SchedulerConfig};
use clockwork_store::{Persistence, SqliteStore};
use clockwork_tasks::{TaskConfig, TaskRegistry};

// ── CLI ─────────────────────────────────────────────────────────────

/// Background job scheduler worker.
#[derive(Parser, Debug)]
#[command(name = "scheduler-worker", version, about)]
struct Cli {
    /// SQLite database path (overrides DATABASE_PATH).
    #[arg(long)]
    db: Option<PathBuf>,

    /// Task output directory (overrides DATA_DIR).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Fallback log directory (overrides LOGS_DIR).
    #[arg(long)]
    logs_dir: Option<PathBuf>,
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    load_dotenv();
    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.storage.db_path = db;
    }
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(logs_dir) = cli.logs_dir {
        config.storage.logs_dir = logs_dir;
    }
    config.log_summary();

    // Durable store first: the reconciliation sweep runs before anything
    // can fire.
    let store = Arc::new(SqliteStore::new(&config.storage.db_path));
    store.init_schema()?;
    let repaired = reconcile_zombie_tasks(store.as_ref());
    if repaired > 0 {
        info!("Recovered {} interrupted task records", repaired);
    }

    let registry = Arc::new(TaskRegistry::with_builtins(TaskConfig::new(
        &config.storage.data_dir,
    )));
    let service = Arc::new(ExecutionService::new(
        store.clone(),
        registry,
        Arc::new(LogAlerter),
        FallbackLog::in_dir(&config.storage.logs_dir),
    ));

    let exec = Arc::clone(&service);
    let runner: JobRunner =
        Arc::new(move |task_type, task_name| exec.execute_task(task_type, task_name));

    let scheduler_config = SchedulerConfig {
        tick_interval_ms: config.scheduler.tick_interval_ms,
        worker_threads: config.scheduler.worker_threads,
        default_policy: JobPolicy {
            coalesce: config.scheduler.coalesce,
            max_instances: config.scheduler.max_instances,
            misfire_grace_secs: config.scheduler.misfire_grace_secs,
        },
    };
    let scheduler = Arc::new(Scheduler::new(scheduler_config, runner, store));
    scheduler.init()?;
    schedule_default_jobs(&scheduler)?;
    scheduler.start()?;

    for job in scheduler.list_jobs() {
        info!("  job {} ({}) next run: {}", job.id, job.trigger, job.next_run_time);
    }

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;
    info!("scheduler-worker running, press ctrl-c to stop");
    rx.recv()?;

    info!("Shutdown requested, draining in-flight firings");
    scheduler.stop(true);
    info!("scheduler-worker exited cleanly");

    Ok(())
}
