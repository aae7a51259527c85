//! Shared scheduler types: configuration, per-job policy, job definitions,
//! and the listener/runner seams.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clockwork_tasks::TaskResult;

use crate::trigger::Trigger;

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Dispatch loop tick interval in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_interval_ms: u64,
    /// Number of worker threads. 0 = num_cpus.
    #[serde(default)]
    pub worker_threads: usize,
    /// Policy applied to jobs scheduled without an explicit one.
    #[serde(default)]
    pub default_policy: JobPolicy,
}

fn default_tick_ms() -> u64 {
    500
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_ms(),
            worker_threads: 0,
            default_policy: JobPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.worker_threads
        }
    }

    pub fn tick_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.tick_interval_ms)
    }
}

/// Per-job firing policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JobPolicy {
    /// Collapse a backlog of missed firings into a single run instead of
    /// running every one of them.
    pub coalesce: bool,
    /// How many overlapping firings of this same job may run concurrently.
    /// Firings beyond the cap are skipped, not queued.
    pub max_instances: usize,
    /// How late (seconds) a missed firing may still start; beyond this it is
    /// dropped rather than run arbitrarily late.
    pub misfire_grace_secs: u64,
}

impl Default for JobPolicy {
    fn default() -> Self {
        Self {
            coalesce: false,
            max_instances: 3,
            misfire_grace_secs: 60,
        }
    }
}

/// Definition of a job handed to [`crate::Scheduler::schedule`].
#[derive(Clone)]
pub struct JobSpec {
    /// Unique job id.
    pub id: String,
    /// Human-readable name (defaults to the id).
    pub name: String,
    /// Task type the firing executes.
    pub task_type: String,
    /// Optional task instance name forwarded to the executor.
    pub task_name: Option<String>,
    pub trigger: Trigger,
    /// None = scheduler default policy.
    pub policy: Option<JobPolicy>,
    /// Explicit first fire time; None = derived from the trigger.
    pub next_run_time: Option<DateTime<Utc>>,
    /// Replace an existing job with the same id instead of rejecting it.
    pub replace_existing: bool,
}

impl JobSpec {
    pub fn new(id: impl Into<String>, task_type: impl Into<String>, trigger: Trigger) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            task_type: task_type.into(),
            task_name: None,
            trigger,
            policy: None,
            next_run_time: None,
            replace_existing: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_task_name(mut self, task_name: impl Into<String>) -> Self {
        self.task_name = Some(task_name.into());
        self
    }

    pub fn with_policy(mut self, policy: JobPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_next_run_time(mut self, at: DateTime<Utc>) -> Self {
        self.next_run_time = Some(at);
        self
    }

    pub fn replace_existing(mut self) -> Self {
        self.replace_existing = true;
        self
    }
}

/// Read-only job row exposed to callers (REST layer, dashboards).
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub id: String,
    pub name: String,
    /// RFC 3339, or "N/A" when unscheduled/paused.
    pub next_run_time: String,
    /// Human description of the trigger.
    pub trigger: String,
}

/// Emitted to listeners after every firing.
#[derive(Debug, Clone)]
pub struct JobEvent {
    pub job_id: String,
    /// `None` for a successful firing, the error text otherwise.
    pub error: Option<String>,
}

/// Callback invoked for each firing; the worker binary wires this to the
/// execution service.
pub type JobRunner = Arc<dyn Fn(&str, Option<&str>) -> TaskResult + Send + Sync>;

/// Listener invoked after each firing completes.
pub type JobListener = Box<dyn Fn(&JobEvent) + Send + Sync>;
