//! Default job registration.
//!
//! Schedules are not persisted, so every process start re-registers the
//! standing jobs here: a daily backup (first run immediately), an hourly
//! cleanup, and a daily 09:00 report.

use chrono::Utc;
use tracing::info;

use crate::error::SchedulerError;
use crate::runner::Scheduler;
use crate::trigger::Trigger;
use crate::types::JobSpec;

pub fn schedule_backup_job(scheduler: &Scheduler) -> Result<(), SchedulerError> {
    scheduler.schedule(
        JobSpec::new("backup_job", "backup", Trigger::interval_hours(24))
            .with_name("Daily Backup Task")
            .with_next_run_time(Utc::now())
            .replace_existing(),
    )?;
    info!("Backup job scheduled");
    Ok(())
}

pub fn schedule_cleanup_job(scheduler: &Scheduler) -> Result<(), SchedulerError> {
    scheduler.schedule(
        JobSpec::new("cleanup_job", "cleanup", Trigger::interval_hours(1))
            .with_name("Hourly Cleanup Task")
            .replace_existing(),
    )?;
    info!("Cleanup job scheduled");
    Ok(())
}

pub fn schedule_report_job(scheduler: &Scheduler) -> Result<(), SchedulerError> {
    scheduler.schedule(
        JobSpec::new("report_job", "report", Trigger::cron("0 9 * * *")?)
            .with_name("Daily Report Task")
            .replace_existing(),
    )?;
    info!("Report job scheduled");
    Ok(())
}

/// Register all standing jobs.
pub fn schedule_default_jobs(scheduler: &Scheduler) -> Result<(), SchedulerError> {
    schedule_backup_job(scheduler)?;
    schedule_cleanup_job(scheduler)?;
    schedule_report_job(scheduler)?;
    info!("All default jobs scheduled");
    Ok(())
}
