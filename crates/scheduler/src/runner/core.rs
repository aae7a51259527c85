use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use clockwork_store::Persistence;

use crate::error::SchedulerError;
use crate::metrics::SchedulerMetrics;
use crate::trigger::Trigger;
use crate::types::{JobEvent, JobInfo, JobListener, JobPolicy, JobRunner, JobSpec, SchedulerConfig};

/// Top-level scheduler lifecycle. `Stopped` is terminal for this process
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Uninitialized,
    Initialized,
    Started,
    Stopped,
}

/// A scheduled job. The scheduler is the sole owner; all mutation goes
/// through its API.
pub(crate) struct Job {
    pub id: String,
    pub name: String,
    pub task_type: String,
    pub task_name: Option<String>,
    pub trigger: Trigger,
    pub policy: JobPolicy,
    pub next_run_time: Option<DateTime<Utc>>,
    pub paused: bool,
    /// Firings of this job currently in flight (for the max_instances cap).
    pub active: Arc<AtomicUsize>,
}

/// One trigger-driven invocation, ready for dispatch onto the worker pool.
pub(crate) struct Firing {
    pub job_id: String,
    pub task_type: String,
    pub task_name: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub active: Arc<AtomicUsize>,
}

/// State shared between the public handle, the dispatch loop thread, and
/// in-flight firings on the worker pool.
pub(crate) struct SchedulerInner {
    pub(super) config: SchedulerConfig,
    pub(super) runner: JobRunner,
    pub(super) store: Arc<dyn Persistence>,
    pub(super) jobs: Mutex<HashMap<String, Job>>,
    pub(super) listeners: RwLock<Vec<JobListener>>,
    pub(super) metrics: RwLock<SchedulerMetrics>,
    pub(super) shutdown: AtomicBool,
    pub(super) active_workers: AtomicUsize,
    pub(super) pool: Mutex<Option<Arc<rayon::ThreadPool>>>,
}

/// The job scheduler. Constructed once and passed by reference to call
/// sites; there is no global instance.
pub struct Scheduler {
    pub(super) inner: Arc<SchedulerInner>,
    pub(super) state: Mutex<Lifecycle>,
    pub(super) dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create an uninitialized scheduler. `runner` is invoked for every
    /// firing (the worker binary wires it to the execution service); `store`
    /// is only used by [`Scheduler::init`] to ensure the durable task-log
    /// schema exists.
    pub fn new(config: SchedulerConfig, runner: JobRunner, store: Arc<dyn Persistence>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                runner,
                store,
                jobs: Mutex::new(HashMap::new()),
                listeners: RwLock::new(Vec::new()),
                metrics: RwLock::new(SchedulerMetrics::default()),
                shutdown: AtomicBool::new(false),
                active_workers: AtomicUsize::new(0),
                pool: Mutex::new(None),
            }),
            state: Mutex::new(Lifecycle::Uninitialized),
            dispatcher: Mutex::new(None),
        }
    }

    /// Initialize the scheduler: ensure the durable store exists and install
    /// the default firing listeners. Idempotent: re-initializing logs a
    /// warning and changes nothing.
    pub fn init(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().unwrap();
        if *state != Lifecycle::Uninitialized {
            warn!("Scheduler already initialized");
            return Ok(());
        }

        self.inner.store.init_schema()?;

        {
            let mut listeners = self.inner.listeners.write().unwrap();
            listeners.push(Box::new(|event: &JobEvent| {
                if event.error.is_none() {
                    info!("Job {} executed successfully", event.job_id);
                }
            }));
            listeners.push(Box::new(|event: &JobEvent| {
                if let Some(err) = &event.error {
                    error!("Job {} failed: {}", event.job_id, err);
                }
            }));
        }

        *state = Lifecycle::Initialized;
        info!("Scheduler initialized");
        Ok(())
    }

    pub(super) fn ensure_initialized(&self) -> Result<(), SchedulerError> {
        match *self.state.lock().unwrap() {
            Lifecycle::Uninitialized => Err(SchedulerError::NotInitialized),
            _ => Ok(()),
        }
    }

    /// Add a job to the table. Rejects a duplicate id with
    /// [`SchedulerError::JobConflict`] unless `replace_existing` is set.
    pub fn schedule(&self, spec: JobSpec) -> Result<(), SchedulerError> {
        self.ensure_initialized()?;
        spec.trigger.validate()?;

        let now = Utc::now();
        let mut jobs = self.inner.jobs.lock().unwrap();

        let existing_active = match jobs.get(&spec.id) {
            Some(_) if !spec.replace_existing => {
                return Err(SchedulerError::JobConflict(spec.id));
            }
            // Keep the in-flight counter so replacement doesn't reset the
            // concurrency cap under running firings.
            Some(old) => Some(Arc::clone(&old.active)),
            None => None,
        };

        let next_run_time = spec.next_run_time.or_else(|| spec.trigger.first_fire(now));
        let job = Job {
            id: spec.id.clone(),
            name: spec.name,
            task_type: spec.task_type,
            task_name: spec.task_name,
            trigger: spec.trigger,
            policy: spec.policy.unwrap_or(self.inner.config.default_policy),
            next_run_time,
            paused: false,
            active: existing_active.unwrap_or_else(|| Arc::new(AtomicUsize::new(0))),
        };

        info!(
            "Job '{}' scheduled ({}), next run: {}",
            job.id,
            job.trigger,
            job.next_run_time
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "N/A".to_string())
        );
        jobs.insert(spec.id, job);
        Ok(())
    }

    /// Suspend a job's trigger; future firings are skipped until resumed.
    pub fn pause(&self, job_id: &str) -> Result<(), SchedulerError> {
        self.ensure_initialized()?;
        let mut jobs = self.inner.jobs.lock().unwrap();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| SchedulerError::JobNotFound(job_id.to_string()))?;
        job.paused = true;
        job.next_run_time = None;
        info!("Job {} paused", job_id);
        Ok(())
    }

    /// Resume a paused job, recomputing its next fire time from the trigger.
    pub fn resume(&self, job_id: &str) -> Result<(), SchedulerError> {
        self.ensure_initialized()?;
        let mut jobs = self.inner.jobs.lock().unwrap();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| SchedulerError::JobNotFound(job_id.to_string()))?;
        job.paused = false;
        job.next_run_time = job.trigger.next_after(Utc::now());
        info!(
            "Job {} resumed, next run: {}",
            job_id,
            job.next_run_time
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "N/A".to_string())
        );
        Ok(())
    }

    /// Delete a job from the table. Terminal for that job id.
    pub fn remove(&self, job_id: &str) -> Result<(), SchedulerError> {
        self.ensure_initialized()?;
        let mut jobs = self.inner.jobs.lock().unwrap();
        jobs.remove(job_id)
            .ok_or_else(|| SchedulerError::JobNotFound(job_id.to_string()))?;
        info!("Job {} removed", job_id);
        Ok(())
    }

    /// Read-only view of the job table, sorted by id.
    pub fn list_jobs(&self) -> Vec<JobInfo> {
        let jobs = self.inner.jobs.lock().unwrap();
        let mut infos: Vec<JobInfo> = jobs
            .values()
            .map(|job| JobInfo {
                id: job.id.clone(),
                name: job.name.clone(),
                next_run_time: job
                    .next_run_time
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "N/A".to_string()),
                trigger: job.trigger.to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Register an additional firing listener.
    pub fn add_listener(&self, listener: impl Fn(&JobEvent) + Send + Sync + 'static) {
        self.inner.listeners.write().unwrap().push(Box::new(listener));
    }

    /// Snapshot of the current metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.inner.metrics.read().unwrap().clone()
    }

    /// Start firing jobs: builds the worker pool and spawns the dispatch
    /// loop. Starting an already-started (or stopped) scheduler is a warning
    /// no-op.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().unwrap();
        match *state {
            Lifecycle::Uninitialized => return Err(SchedulerError::NotInitialized),
            Lifecycle::Started => {
                warn!("Scheduler already running");
                return Ok(());
            }
            Lifecycle::Stopped => {
                warn!("Scheduler already stopped; construct a new instance to restart");
                return Ok(());
            }
            Lifecycle::Initialized => {}
        }

        let num_workers = self.inner.config.resolved_worker_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .build()
            .expect("Failed to build rayon thread pool");
        *self.inner.pool.lock().unwrap() = Some(Arc::new(pool));

        self.inner.shutdown.store(false, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let handle = std::thread::spawn(move || {
            let tick = inner.config.tick_interval();
            while !inner.shutdown.load(Ordering::SeqCst) {
                SchedulerInner::tick_once(&inner, Utc::now());
                std::thread::sleep(tick);
            }
        });
        *self.dispatcher.lock().unwrap() = Some(handle);

        *state = Lifecycle::Started;
        info!("Scheduler started with {} workers", num_workers);
        Ok(())
    }

    /// Stop the dispatch loop. With `wait`, in-flight firings are drained
    /// before returning; otherwise they finish in the background. Terminal
    /// for this instance.
    pub fn stop(&self, wait: bool) {
        let mut state = self.state.lock().unwrap();
        if *state != Lifecycle::Started {
            warn!("Scheduler not running");
            return;
        }

        self.inner.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.dispatcher.lock().unwrap().take() {
            let _ = handle.join();
        }
        if wait {
            while self.inner.active_workers.load(Ordering::SeqCst) > 0 {
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
        }

        *state = Lifecycle::Stopped;
        info!("Scheduler stopped");
    }

    /// Drive one dispatch pass directly (test hook; the dispatch loop calls
    /// the same path).
    #[cfg(test)]
    pub(crate) fn tick_once(&self, now: DateTime<Utc>) -> usize {
        SchedulerInner::tick_once(&self.inner, now)
    }
}
