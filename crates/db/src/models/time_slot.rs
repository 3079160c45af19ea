//! Time slot entity models and DTOs (PRD-21).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vendora_core::types::{DbId, Timestamp};

use super::schedule::Schedule;

/// A row from the `campaign_time_slots` table: one recurring weekly
/// availability window for a campaign.
///
/// `start_time`/`end_time` are zero-padded `HH:MM` strings; `weekdays` holds
/// values in `0..=6` with `0 = Sunday`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimeSlot {
    pub id: DbId,
    pub campaign_id: DbId,
    pub start_time: String,
    pub end_time: String,
    pub weekdays: Vec<i16>,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one slot in a replace-all batch.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTimeSlot {
    pub start_time: String,
    pub end_time: String,
    pub weekdays: Vec<i16>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Result of an availability probe (computed, not a DB row).
///
/// `available` is true iff no Scheduled/Running schedule is already bound to
/// an overlapping slot on the queried date.
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub available: bool,
    pub conflicts: Vec<Schedule>,
}

fn default_true() -> bool {
    true
}
