//! Task execution service.
//!
//! Wraps every task invocation with durable logging, failure alerting, and a
//! disk fallback for the case where the database itself is unreachable, plus
//! the boot-time sweep that repairs task-log rows left `running` by an
//! unclean shutdown.

pub mod fallback;
pub mod service;
pub mod startup;

pub use fallback::FallbackLog;
pub use service::ExecutionService;
pub use startup::reconcile_zombie_tasks;
