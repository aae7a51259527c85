//! Boot-time reconciliation of zombie task records.
//!
//! Runs once, before the scheduler starts firing. A crash mid-execution
//! leaves TaskLog rows stuck in `running`; this sweep transitions them to
//! `interrupted` so the history stays truthful.

use chrono::Utc;
use tracing::{error, info, warn};

use clockwork_store::{LogStatus, Persistence, Session, StoreError};

/// Fixed explanation written into repaired rows.
pub const INTERRUPTED_MESSAGE: &str = "System shutdown or interruption detected.";

/// Repair all `running` rows left over from a previous process. Returns the
/// number of rows repaired. A sweep failure is logged and swallowed: it is
/// non-fatal to boot and is not retried within the same run.
pub fn reconcile_zombie_tasks(store: &dyn Persistence) -> usize {
    match try_reconcile(store) {
        Ok(count) => count,
        Err(e) => {
            error!("Startup reconciliation failed: {}", e);
            0
        }
    }
}

fn try_reconcile(store: &dyn Persistence) -> Result<usize, StoreError> {
    let mut session = store.open_session()?;

    let zombies = session.find_by_status(LogStatus::Running)?;
    if zombies.is_empty() {
        info!("Startup reconciliation: no zombie tasks found");
        return Ok(0);
    }

    warn!(
        "Startup reconciliation: found {} zombie tasks, marking as interrupted",
        zombies.len()
    );
    let repaired = session.mark_interrupted_all(Utc::now(), INTERRUPTED_MESSAGE)?;
    info!("Startup reconciliation: recovered {} tasks", repaired);
    Ok(repaired)
}
