use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scheduler operational metrics exposed to callers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Completed firings by job id.
    pub firings: HashMap<String, u64>,
    /// Failed firings by job id.
    pub failed_firings: HashMap<String, u64>,
    /// Missed firings dropped because they exceeded the grace window.
    pub misfires_dropped: u64,
    /// Firings skipped because the per-job concurrency cap was reached.
    pub concurrency_skips: u64,
    /// Last firing completion time by job id.
    pub last_fired: HashMap<String, DateTime<Utc>>,
}

impl SchedulerMetrics {
    /// Record a completed firing.
    pub fn record_firing(&mut self, job_id: &str, failed: bool) {
        *self.firings.entry(job_id.to_string()).or_default() += 1;
        if failed {
            *self.failed_firings.entry(job_id.to_string()).or_default() += 1;
        }
        self.last_fired.insert(job_id.to_string(), Utc::now());
    }

    pub fn record_misfire(&mut self) {
        self.misfires_dropped += 1;
    }

    pub fn record_skip(&mut self) {
        self.concurrency_skips += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_firing_counts_totals_and_failures() {
        let mut m = SchedulerMetrics::default();
        m.record_firing("backup_job", false);
        m.record_firing("backup_job", true);

        assert_eq!(m.firings["backup_job"], 2);
        assert_eq!(m.failed_firings["backup_job"], 1);
        assert!(m.last_fired.contains_key("backup_job"));
    }

    #[test]
    fn misfires_and_skips_accumulate() {
        let mut m = SchedulerMetrics::default();
        m.record_misfire();
        m.record_misfire();
        m.record_skip();

        assert_eq!(m.misfires_dropped, 2);
        assert_eq!(m.concurrency_skips, 1);
    }
}
