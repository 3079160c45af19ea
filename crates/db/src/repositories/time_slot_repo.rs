//! Repository for the `campaign_time_slots` table (PRD-21).
//!
//! The time-slot registry: recurring weekly availability windows plus the
//! overlap/availability queries the scheduler and booking flows run against
//! them. Slot boundaries are zero-padded `HH:MM` text, so SQL string
//! comparison is chronological.

use chrono::NaiveDate;
use sqlx::PgPool;
use vendora_core::slot_time::weekday_of;
use vendora_core::types::DbId;

use crate::models::status::ScheduleStatus;
use crate::models::time_slot::{Availability, CreateTimeSlot, TimeSlot};
use crate::repositories::ScheduleRepo;

/// Column list for `campaign_time_slots` queries.
const COLUMNS: &str = "\
    id, campaign_id, start_time, end_time, weekdays, priority, \
    is_active, created_at, updated_at";

/// Column list qualified with the `ts` alias for JOIN queries.
const TS_COLUMNS: &str = "\
    ts.id, ts.campaign_id, ts.start_time, ts.end_time, ts.weekdays, \
    ts.priority, ts.is_active, ts.created_at, ts.updated_at";

/// Provides CRUD and availability queries for recurring time slots.
pub struct TimeSlotRepo;

impl TimeSlotRepo {
    /// Find a time slot by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TimeSlot>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM campaign_time_slots WHERE id = $1");
        sqlx::query_as::<_, TimeSlot>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all slots for a campaign, active or not.
    pub async fn list_for_campaign(
        pool: &PgPool,
        campaign_id: DbId,
    ) -> Result<Vec<TimeSlot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM campaign_time_slots \
             WHERE campaign_id = $1 \
             ORDER BY priority DESC, start_time ASC"
        );
        sqlx::query_as::<_, TimeSlot>(&query)
            .bind(campaign_id)
            .fetch_all(pool)
            .await
    }

    /// Replace a campaign's entire slot set: delete the old rows and insert
    /// the new batch inside one transaction, so readers never observe a
    /// campaign with zero slots mid-edit.
    pub async fn replace_for_campaign(
        pool: &PgPool,
        campaign_id: DbId,
        slots: &[CreateTimeSlot],
    ) -> Result<Vec<TimeSlot>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM campaign_time_slots WHERE campaign_id = $1")
            .bind(campaign_id)
            .execute(&mut *tx)
            .await?;

        let insert = format!(
            "INSERT INTO campaign_time_slots \
                 (campaign_id, start_time, end_time, weekdays, priority, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );

        let mut created = Vec::with_capacity(slots.len());
        for slot in slots {
            let row = sqlx::query_as::<_, TimeSlot>(&insert)
                .bind(campaign_id)
                .bind(&slot.start_time)
                .bind(&slot.end_time)
                .bind(&slot.weekdays)
                .bind(slot.priority)
                .bind(slot.is_active)
                .fetch_one(&mut *tx)
                .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Find active slots of `campaign_type` campaigns that cover `weekday`
    /// and whose `[start, end)` window overlaps the queried `[start, end)`
    /// window (half-open: touching windows do not overlap).
    pub async fn find_overlapping(
        pool: &PgPool,
        campaign_type: &str,
        weekday: i16,
        start_time: &str,
        end_time: &str,
    ) -> Result<Vec<TimeSlot>, sqlx::Error> {
        let query = format!(
            "SELECT {TS_COLUMNS} FROM campaign_time_slots ts \
             JOIN campaigns c ON c.id = ts.campaign_id \
             WHERE c.campaign_type = $1 \
               AND ts.is_active = TRUE \
               AND $2 = ANY(ts.weekdays) \
               AND ts.start_time < $4 AND ts.end_time > $3 \
             ORDER BY ts.priority DESC, ts.start_time ASC"
        );
        sqlx::query_as::<_, TimeSlot>(&query)
            .bind(campaign_type)
            .bind(weekday)
            .bind(start_time)
            .bind(end_time)
            .fetch_all(pool)
            .await
    }

    /// Probe whether a `[start_time, end_time)` window on `date` is free for
    /// `campaign_type`: overlapping active slots are conflicting only if a
    /// schedule in Scheduled/Running is already bound to them on that date.
    pub async fn check_availability(
        pool: &PgPool,
        campaign_type: &str,
        date: NaiveDate,
        start_time: &str,
        end_time: &str,
    ) -> Result<Availability, sqlx::Error> {
        let weekday = weekday_of(date);
        let overlapping =
            Self::find_overlapping(pool, campaign_type, weekday, start_time, end_time).await?;

        if overlapping.is_empty() {
            return Ok(Availability {
                available: true,
                conflicts: Vec::new(),
            });
        }

        let slot_ids: Vec<DbId> = overlapping.iter().map(|slot| slot.id).collect();
        let conflicts = ScheduleRepo::find_conflicting(pool, &slot_ids, date).await?;

        Ok(Availability {
            available: conflicts.is_empty(),
            conflicts,
        })
    }

    /// List active slots free on `date`: weekday matches, optional
    /// campaign-type filter, and no Scheduled/Running schedule already claims
    /// the slot that day. Ordered by (priority DESC, start_time).
    pub async fn list_free_for_date(
        pool: &PgPool,
        date: NaiveDate,
        campaign_type: Option<&str>,
    ) -> Result<Vec<TimeSlot>, sqlx::Error> {
        let weekday = weekday_of(date);
        let query = format!(
            "SELECT {TS_COLUMNS} FROM campaign_time_slots ts \
             JOIN campaigns c ON c.id = ts.campaign_id \
             WHERE ts.is_active = TRUE \
               AND $1 = ANY(ts.weekdays) \
               AND ($2::TEXT IS NULL OR c.campaign_type = $2) \
               AND NOT EXISTS ( \
                   SELECT 1 FROM campaign_schedules s \
                   WHERE s.time_slot_id = ts.id \
                     AND s.scheduled_date = $3 \
                     AND s.status_id IN ($4, $5) \
               ) \
             ORDER BY ts.priority DESC, ts.start_time ASC"
        );
        sqlx::query_as::<_, TimeSlot>(&query)
            .bind(weekday)
            .bind(campaign_type)
            .bind(date)
            .bind(ScheduleStatus::Scheduled.id())
            .bind(ScheduleStatus::Running.id())
            .fetch_all(pool)
            .await
    }
}
