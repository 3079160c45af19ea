//! Campaign entity model.
//!
//! Campaigns are owned by the wider marketplace backend; the scheduling
//! engine reads them (serving status, type) and only touches the impression
//! counter through the default campaign runner.

use serde::Serialize;
use sqlx::FromRow;
use vendora_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `campaigns` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Campaign {
    pub id: DbId,
    pub name: String,
    pub campaign_type: String,
    pub status_id: StatusId,
    pub impressions: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
