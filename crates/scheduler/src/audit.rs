//! Best-effort appends to the execution log (PRD-22).
//!
//! The log is an audit trail: a logging outage must never abort the
//! operation being logged, so every append here is caught and swallowed.

use serde_json::json;
use sqlx::PgPool;
use vendora_db::models::execution_log::{CreateExecutionLog, LogAction, LogStatus};
use vendora_db::models::schedule::Schedule;
use vendora_db::repositories::ExecutionLogRepo;

use crate::runner::RunMetrics;

/// Append `entry`, swallowing any failure.
pub async fn log_best_effort(pool: &PgPool, entry: CreateExecutionLog) {
    if let Err(e) = ExecutionLogRepo::append(pool, &entry).await {
        tracing::warn!(
            schedule_id = entry.schedule_id,
            action = entry.action.as_str(),
            error = %e,
            "Execution log append failed; entry dropped",
        );
    }
}

// ---------------------------------------------------------------------------
// Entry builders
// ---------------------------------------------------------------------------

/// START/SUCCESS: a schedule entered Running.
pub fn start_entry(schedule: &Schedule) -> CreateExecutionLog {
    CreateExecutionLog {
        schedule_id: Some(schedule.id),
        campaign_id: Some(schedule.campaign_id),
        action: LogAction::Start,
        status: LogStatus::Success,
        message: "Campaign execution started".to_string(),
        error_details: None,
        metrics: None,
    }
}

/// STOP/SUCCESS: a run finished; metrics describe what it delivered.
pub fn stop_entry(schedule: &Schedule, metrics: &RunMetrics) -> CreateExecutionLog {
    CreateExecutionLog {
        schedule_id: Some(schedule.id),
        campaign_id: Some(schedule.campaign_id),
        action: LogAction::Stop,
        status: LogStatus::Success,
        message: "Campaign execution completed".to_string(),
        error_details: None,
        metrics: Some(json!({
            "impressions_delta": metrics.impressions_delta,
            "duration_ms": metrics.duration_ms,
        })),
    }
}

/// STOP/SUCCESS: a schedule was cancelled before (or between) runs.
pub fn cancel_entry(schedule: &Schedule) -> CreateExecutionLog {
    CreateExecutionLog {
        schedule_id: Some(schedule.id),
        campaign_id: Some(schedule.campaign_id),
        action: LogAction::Stop,
        status: LogStatus::Success,
        message: "Schedule cancelled".to_string(),
        error_details: None,
        metrics: None,
    }
}

/// ERROR/FAILED: a run failed. `schedule` is the post-transition row, so its
/// retry count and next-retry fields reflect the policy decision.
pub fn error_entry(schedule: &Schedule, raw_error: &str) -> CreateExecutionLog {
    let reason = schedule
        .failure_reason
        .clone()
        .unwrap_or_else(|| raw_error.to_string());
    CreateExecutionLog {
        schedule_id: Some(schedule.id),
        campaign_id: Some(schedule.campaign_id),
        action: LogAction::Error,
        status: LogStatus::Failed,
        message: reason,
        error_details: Some(json!({
            "error": raw_error,
            "retry_count": schedule.retry_count,
            "max_retries": schedule.max_retries,
            "terminal": schedule.next_retry_at.is_none(),
        })),
        metrics: None,
    }
}

/// RETRY/PENDING: the retry sweep is about to re-enter execution.
pub fn retry_entry(schedule: &Schedule) -> CreateExecutionLog {
    CreateExecutionLog {
        schedule_id: Some(schedule.id),
        campaign_id: Some(schedule.campaign_id),
        action: LogAction::Retry,
        status: LogStatus::Pending,
        message: format!(
            "Retry {} of {} re-entering execution",
            schedule.retry_count, schedule.max_retries
        ),
        error_details: None,
        metrics: None,
    }
}

/// ERROR/FAILED with no schedule: a sweep-level failure (e.g. the store was
/// unreachable while selecting due rows).
pub fn system_error_entry(context: &str, error: &str) -> CreateExecutionLog {
    CreateExecutionLog {
        schedule_id: None,
        campaign_id: None,
        action: LogAction::Error,
        status: LogStatus::Failed,
        message: format!("{context}: {error}"),
        error_details: Some(json!({ "error": error, "context": context })),
        metrics: None,
    }
}
