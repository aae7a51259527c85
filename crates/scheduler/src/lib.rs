//! Job scheduler: owns the in-memory table of recurring and one-off jobs,
//! their triggers and concurrency policy, and the tick/dispatch loop that
//! fires them onto a worker pool.
//!
//! Schedules are not persisted; jobs are re-registered programmatically at
//! every process start; only execution *history* is durable (see
//! `clockwork-store`).

pub mod defaults;
pub mod error;
pub mod metrics;
pub mod runner;
pub mod trigger;
pub mod types;

pub use defaults::schedule_default_jobs;
pub use error::SchedulerError;
pub use metrics::SchedulerMetrics;
pub use runner::Scheduler;
pub use trigger::Trigger;
pub use types::{JobEvent, JobInfo, JobPolicy, JobRunner, JobSpec, SchedulerConfig};
