use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::core::SchedulerInner;
use super::Firing;

impl SchedulerInner {
    /// Collect the firings due at `now`, advancing each job's next run time
    /// and applying the per-job policy:
    ///
    /// - occurrences later than `misfire_grace_secs` are dropped, not run;
    /// - with `coalesce`, a backlog of in-grace occurrences collapses into
    ///   one run;
    /// - occurrences beyond the `max_instances` overlap cap are skipped,
    ///   not queued.
    ///
    /// One-off jobs with no future run are removed from the table.
    pub(crate) fn collect_due(&self, now: DateTime<Utc>) -> Vec<Firing> {
        let mut jobs = self.jobs.lock().unwrap();
        let mut firings = Vec::new();
        let mut exhausted = Vec::new();

        for job in jobs.values_mut() {
            if job.paused {
                continue;
            }
            let grace = Duration::seconds(job.policy.misfire_grace_secs as i64);

            let mut due = Vec::new();
            while let Some(next) = job.next_run_time {
                if next > now {
                    break;
                }
                job.next_run_time = job.trigger.next_after(next);

                if now - next > grace {
                    warn!(
                        "Run time of job '{}' was missed by {}s, dropping it",
                        job.id,
                        (now - next).num_seconds()
                    );
                    if let Ok(mut metrics) = self.metrics.write() {
                        metrics.record_misfire();
                    }
                    continue;
                }
                due.push(next);
            }

            if job.policy.coalesce && due.len() > 1 {
                info!("Coalescing {} pending runs of job '{}' into one", due.len(), job.id);
                due.drain(..due.len() - 1);
            }

            let mut budget = job
                .policy
                .max_instances
                .saturating_sub(job.active.load(Ordering::SeqCst));
            for occurrence in due {
                if budget == 0 {
                    warn!(
                        "Execution of job '{}' skipped: maximum number of running instances reached ({})",
                        job.id, job.policy.max_instances
                    );
                    if let Ok(mut metrics) = self.metrics.write() {
                        metrics.record_skip();
                    }
                    continue;
                }
                budget -= 1;
                firings.push(Firing {
                    job_id: job.id.clone(),
                    task_type: job.task_type.clone(),
                    task_name: job.task_name.clone(),
                    scheduled_for: occurrence,
                    active: Arc::clone(&job.active),
                });
            }

            if job.next_run_time.is_none() {
                exhausted.push(job.id.clone());
            }
        }

        for id in exhausted {
            jobs.remove(&id);
            info!("Job '{}' has no future runs and was removed", id);
        }

        firings
    }
}
