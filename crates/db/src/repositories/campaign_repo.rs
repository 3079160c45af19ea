//! Repository for the `campaigns` table.
//!
//! The scheduling engine treats campaigns as read-mostly collaborator rows:
//! it checks serving status before executing and bumps the impression counter
//! through the default campaign runner. Full campaign CRUD belongs to the
//! marketplace API layer.

use sqlx::PgPool;
use vendora_core::types::DbId;

use crate::models::campaign::Campaign;
use crate::models::status::CampaignStatus;

/// Column list for `campaigns` queries.
const COLUMNS: &str = "\
    id, name, campaign_type, status_id, impressions, created_at, updated_at";

/// Read access plus the impression counter update.
pub struct CampaignRepo;

impl CampaignRepo {
    /// Create a campaign. Used by seeding and tests; the marketplace API owns
    /// campaign lifecycle in production.
    pub async fn create(
        pool: &PgPool,
        name: &str,
        campaign_type: &str,
        status: CampaignStatus,
    ) -> Result<Campaign, sqlx::Error> {
        let query = format!(
            "INSERT INTO campaigns (name, campaign_type, status_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(name)
            .bind(campaign_type)
            .bind(status.id())
            .fetch_one(pool)
            .await
    }

    /// Find a campaign by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Campaign>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM campaigns WHERE id = $1");
        sqlx::query_as::<_, Campaign>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Change a campaign's serving status.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: CampaignStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE campaigns SET status_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.id())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Add `delta` to a campaign's impression counter.
    pub async fn add_impressions(pool: &PgPool, id: DbId, delta: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE campaigns SET impressions = impressions + $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(pool)
        .await?;
        Ok(())
    }
}
