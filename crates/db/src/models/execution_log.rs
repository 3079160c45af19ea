//! Execution log entity models and DTOs (PRD-22).
//!
//! Models for the append-only trail of schedule lifecycle events. Log rows
//! have no `updated_at` field (immutable records). A `NULL` schedule id marks
//! a system-scoped entry (e.g. a sweep that could not reach the store).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vendora_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Action / status vocabularies
// ---------------------------------------------------------------------------

/// What happened: a lifecycle action on a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAction {
    Start,
    Stop,
    Error,
    Retry,
}

impl LogAction {
    /// Uppercase wire form stored in the `action` column.
    pub fn as_str(self) -> &'static str {
        match self {
            LogAction::Start => "START",
            LogAction::Stop => "STOP",
            LogAction::Error => "ERROR",
            LogAction::Retry => "RETRY",
        }
    }
}

/// How it went: the outcome recorded for the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStatus {
    Success,
    Failed,
    Pending,
}

impl LogStatus {
    /// Uppercase wire form stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            LogStatus::Success => "SUCCESS",
            LogStatus::Failed => "FAILED",
            LogStatus::Pending => "PENDING",
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A single execution log entry. Immutable once created (no updated_at).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExecutionLog {
    pub id: DbId,
    pub schedule_id: Option<DbId>,
    pub campaign_id: Option<DbId>,
    pub action: String,
    pub status: String,
    pub message: String,
    pub error_details: Option<serde_json::Value>,
    pub metrics: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// DTO for appending a new execution log entry.
///
/// `error_details` is only meaningful with [`LogStatus::Failed`]; `metrics`
/// only with [`LogStatus::Success`].
#[derive(Debug, Clone)]
pub struct CreateExecutionLog {
    pub schedule_id: Option<DbId>,
    pub campaign_id: Option<DbId>,
    pub action: LogAction,
    pub status: LogStatus,
    pub message: String,
    pub error_details: Option<serde_json::Value>,
    pub metrics: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Filter parameters for querying the execution log.
#[derive(Debug, Default, Deserialize)]
pub struct ExecutionLogQuery {
    pub schedule_id: Option<DbId>,
    pub campaign_id: Option<DbId>,
    pub action: Option<String>,
    pub status: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
