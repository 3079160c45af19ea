//! The injectable campaign side effect (PRD-21).
//!
//! Executing a schedule means actually serving the campaign for its slot.
//! That effect is behind a trait so the engine stays deterministic and
//! testable; production wires in [`ImpressionRunner`], tests wire in stubs.

use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use vendora_core::slot_time::parse_hhmm;
use vendora_db::models::campaign::Campaign;
use vendora_db::models::time_slot::TimeSlot;
use vendora_db::repositories::CampaignRepo;

/// Failure of a single campaign run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The delivery itself failed (ad server rejection, upstream outage, ...).
    #[error("Campaign delivery failed: {0}")]
    Delivery(String),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome metrics of one successful run, recorded on the STOP/SUCCESS
/// log entry.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetrics {
    pub impressions_delta: i64,
    pub duration_ms: u64,
}

/// Performs the campaign side effect for one (campaign, slot) pair.
///
/// Implementations must be safe to call repeatedly for the same pair: a
/// retried schedule runs the effect again.
#[async_trait]
pub trait CampaignRunner: Send + Sync {
    async fn execute(
        &self,
        campaign: &Campaign,
        slot: &TimeSlot,
    ) -> Result<RunMetrics, RunnerError>;
}

/// Production runner: serves the campaign by crediting impressions on the
/// campaign row. The credit is derived from the slot window length, so a
/// given (campaign, slot) pair always produces the same delta.
pub struct ImpressionRunner {
    pool: PgPool,
}

impl ImpressionRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignRunner for ImpressionRunner {
    async fn execute(
        &self,
        campaign: &Campaign,
        slot: &TimeSlot,
    ) -> Result<RunMetrics, RunnerError> {
        let started = Instant::now();
        let delta = impressions_for_window(&slot.start_time, &slot.end_time);
        CampaignRepo::add_impressions(&self.pool, campaign.id, delta).await?;
        tracing::debug!(
            campaign_id = campaign.id,
            time_slot_id = slot.id,
            impressions = delta,
            "Campaign impressions credited",
        );
        Ok(RunMetrics {
            impressions_delta: delta,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// One impression per minute of window length, minimum 1. Slot boundaries
/// are validated at insert time; a malformed stored value degrades to the
/// minimum rather than failing the run.
fn impressions_for_window(start: &str, end: &str) -> i64 {
    match (parse_hhmm(start), parse_hhmm(end)) {
        (Ok(start_t), Ok(end_t)) => (end_t - start_t).num_minutes().max(1),
        _ => 1,
    }
}
