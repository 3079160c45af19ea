//! The three periodic sweep bodies (PRD-21).
//!
//! Each sweep takes an explicit `now` so tests can drive specific instants;
//! the trigger clock in [`crate::service`] passes `Utc::now()`. Due items
//! are processed sequentially: one schedule finishes (including its
//! execution timeout budget) before the next begins, and a failing schedule
//! never aborts the sweep.

use sqlx::PgPool;
use vendora_core::types::Timestamp;
use vendora_db::repositories::ScheduleRepo;

use crate::audit;
use crate::error::SchedulerError;
use crate::executor::ExecutionEngine;

/// Counters reported by one main or retry sweep run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepOutcome {
    /// How many due rows the sweep selected and handed to the engine.
    pub selected: usize,
}

/// Main sweep: find Scheduled occurrences whose slot window contains `now`
/// and execute each one.
pub async fn main_sweep(
    pool: &PgPool,
    engine: &ExecutionEngine,
    now: Timestamp,
) -> Result<SweepOutcome, SchedulerError> {
    let due = ScheduleRepo::due_for_execution(pool, now).await?;
    let selected = due.len();

    for schedule in &due {
        engine.run(schedule).await;
    }

    Ok(SweepOutcome { selected })
}

/// Retry sweep: find Failed occurrences whose backoff has elapsed, log the
/// retry, and re-enter execution for each one.
pub async fn retry_sweep(
    pool: &PgPool,
    engine: &ExecutionEngine,
    now: Timestamp,
) -> Result<SweepOutcome, SchedulerError> {
    let due = ScheduleRepo::due_for_retry(pool, now).await?;
    let selected = due.len();

    for schedule in &due {
        audit::log_best_effort(pool, audit::retry_entry(schedule)).await;
        engine.run(schedule).await;
    }

    Ok(SweepOutcome { selected })
}

/// Cleanup sweep: delete terminal occurrences older than the retention
/// window. Returns the number of rows removed; running it again immediately
/// deletes nothing.
pub async fn cleanup_sweep(
    pool: &PgPool,
    retention_days: i64,
    now: Timestamp,
) -> Result<u64, SchedulerError> {
    let cutoff = now - chrono::Duration::days(retention_days);
    let deleted = ScheduleRepo::delete_terminal_older_than(pool, cutoff).await?;
    Ok(deleted)
}
