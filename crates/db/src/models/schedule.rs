//! Schedule entity models and DTOs (PRD-21).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vendora_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `campaign_schedules` table: one concrete, date-bound
/// occurrence of a campaign running in a time slot.
///
/// Invariants maintained by the repository and engine:
/// - `retry_count <= max_retries`
/// - `next_retry_at` is set iff `status_id` is Failed with retry budget left
/// - `scheduled_datetime` is derived once at creation from
///   `scheduled_date` + the slot's start time
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Schedule {
    pub id: DbId,
    pub campaign_id: DbId,
    pub time_slot_id: DbId,
    pub scheduled_date: NaiveDate,
    pub scheduled_datetime: Timestamp,
    pub status_id: StatusId,
    pub retry_count: i16,
    pub max_retries: i16,
    pub next_retry_at: Option<Timestamp>,
    pub failure_reason: Option<String>,
    pub executed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a schedule occurrence.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSchedule {
    pub campaign_id: DbId,
    pub time_slot_id: DbId,
    pub scheduled_date: NaiveDate,
}

/// Query parameters for listing schedules.
#[derive(Debug, Default, Deserialize)]
pub struct ScheduleListQuery {
    /// Filter by status ID (e.g. 1 = scheduled, 4 = failed).
    pub status_id: Option<StatusId>,
    /// Filter by campaign.
    pub campaign_id: Option<DbId>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
