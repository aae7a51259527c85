use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use clockwork_tasks::TaskResult;

use crate::error::SchedulerError;
use crate::types::JobEvent;

use super::core::SchedulerInner;
use super::{Firing, Scheduler};

impl SchedulerInner {
    /// One pass of the dispatch loop: collect due firings and hand them to
    /// the worker pool. Returns the number of firings dispatched.
    ///
    /// Before `start()` there is no pool and firings execute inline, which
    /// keeps the loop logic directly drivable from tests.
    pub(crate) fn tick_once(inner: &Arc<Self>, now: DateTime<Utc>) -> usize {
        let firings = inner.collect_due(now);
        let count = firings.len();
        for firing in firings {
            Self::spawn_firing(inner, firing);
        }
        count
    }

    fn spawn_firing(inner: &Arc<Self>, firing: Firing) {
        firing.active.fetch_add(1, Ordering::SeqCst);
        inner.active_workers.fetch_add(1, Ordering::SeqCst);

        let pool = inner.pool.lock().unwrap().clone();
        let worker = Arc::clone(inner);
        match pool {
            Some(pool) => pool.spawn(move || worker.run_firing(firing)),
            None => worker.run_firing(firing),
        }
    }

    /// Execute one firing: invoke the runner, record metrics, and notify the
    /// firing listeners. Runs on a pool worker thread (or inline before
    /// start).
    fn run_firing(&self, firing: Firing) {
        debug!(
            "Firing job '{}' (scheduled for {})",
            firing.job_id, firing.scheduled_for
        );

        let result = (self.runner)(&firing.task_type, firing.task_name.as_deref());

        let error = if result.is_success() {
            None
        } else {
            Some(
                result
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            )
        };

        if let Ok(mut metrics) = self.metrics.write() {
            metrics.record_firing(&firing.job_id, error.is_some());
        }

        let event = JobEvent {
            job_id: firing.job_id.clone(),
            error,
        };
        if let Ok(listeners) = self.listeners.read() {
            for listener in listeners.iter() {
                listener(&event);
            }
        }

        firing.active.fetch_sub(1, Ordering::SeqCst);
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Scheduler {
    /// Synchronously invoke a job's bound function with its stored
    /// arguments, bypassing the trigger entirely. Blocks the caller until
    /// the task completes.
    pub fn run_now(&self, job_id: &str) -> Result<TaskResult, SchedulerError> {
        self.ensure_initialized()?;

        let (task_type, task_name) = {
            let jobs = self.inner.jobs.lock().unwrap();
            let job = jobs
                .get(job_id)
                .ok_or_else(|| SchedulerError::JobNotFound(job_id.to_string()))?;
            (job.task_type.clone(), job.task_name.clone())
        };

        let result = (self.inner.runner)(&task_type, task_name.as_deref());
        info!("Manually executed job {}", job_id);
        Ok(result)
    }
}
