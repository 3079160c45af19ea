//! Repository for the `campaign_schedules` table (PRD-21).
//!
//! Every status transition is a guarded UPDATE carrying the expected current
//! status in its WHERE clause: a row changed underneath us makes the UPDATE
//! match nothing and the caller sees `None` instead of a lost update. No
//! magic numbers: every status literal goes through `ScheduleStatus`.

use chrono::NaiveDate;
use sqlx::PgPool;
use vendora_core::retry::DEFAULT_MAX_RETRIES;
use vendora_core::slot_time::weekday_of;
use vendora_core::types::{DbId, Timestamp};

use crate::models::schedule::{CreateSchedule, Schedule, ScheduleListQuery};
use crate::models::status::{CampaignStatus, ScheduleStatus, StatusId};

/// Column list for `campaign_schedules` queries.
const COLUMNS: &str = "\
    id, campaign_id, time_slot_id, scheduled_date, scheduled_datetime, \
    status_id, retry_count, max_retries, next_retry_at, failure_reason, \
    executed_at, completed_at, created_at, updated_at";

/// Column list qualified with the `s` alias for JOIN queries.
const S_COLUMNS: &str = "\
    s.id, s.campaign_id, s.time_slot_id, s.scheduled_date, \
    s.scheduled_datetime, s.status_id, s.retry_count, s.max_retries, \
    s.next_retry_at, s.failure_reason, s.executed_at, s.completed_at, \
    s.created_at, s.updated_at";

/// Maximum page size for schedule listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for schedule listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides lifecycle operations for schedule occurrences.
pub struct ScheduleRepo;

impl ScheduleRepo {
    /// Insert a new occurrence in `Scheduled` with a fresh retry budget.
    ///
    /// `scheduled_datetime` is the derived instant (date + slot start); the
    /// caller computes it once, it is never re-derived.
    pub async fn create(
        pool: &PgPool,
        input: &CreateSchedule,
        scheduled_datetime: Timestamp,
    ) -> Result<Schedule, sqlx::Error> {
        let query = format!(
            "INSERT INTO campaign_schedules \
                 (campaign_id, time_slot_id, scheduled_date, scheduled_datetime, \
                  status_id, retry_count, max_retries) \
             VALUES ($1, $2, $3, $4, $5, 0, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(input.campaign_id)
            .bind(input.time_slot_id)
            .bind(input.scheduled_date)
            .bind(scheduled_datetime)
            .bind(ScheduleStatus::Scheduled.id())
            .bind(DEFAULT_MAX_RETRIES)
            .fetch_one(pool)
            .await
    }

    /// Find a schedule by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Schedule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM campaign_schedules WHERE id = $1");
        sqlx::query_as::<_, Schedule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Schedules in Scheduled/Running bound to any of `slot_ids` on `date`.
    /// These are what makes a window unavailable.
    pub async fn find_conflicting(
        pool: &PgPool,
        slot_ids: &[DbId],
        date: NaiveDate,
    ) -> Result<Vec<Schedule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM campaign_schedules \
             WHERE time_slot_id = ANY($1) \
               AND scheduled_date = $2 \
               AND status_id IN ($3, $4) \
             ORDER BY scheduled_datetime ASC"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(slot_ids)
            .bind(date)
            .bind(ScheduleStatus::Scheduled.id())
            .bind(ScheduleStatus::Running.id())
            .fetch_all(pool)
            .await
    }

    /// The main-sweep selection: Scheduled occurrences dated today whose slot
    /// is active, covers today's weekday, and whose `[start, end]` window
    /// contains the current time of day (inclusive on both ends), for
    /// campaigns currently serving.
    pub async fn due_for_execution(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<Schedule>, sqlx::Error> {
        let date = now.date_naive();
        let weekday = weekday_of(date);
        let time_of_day = now.format("%H:%M").to_string();

        let query = format!(
            "SELECT {S_COLUMNS} FROM campaign_schedules s \
             JOIN campaign_time_slots ts ON ts.id = s.time_slot_id \
             JOIN campaigns c ON c.id = s.campaign_id \
             WHERE s.status_id = $1 \
               AND s.scheduled_date = $2 \
               AND ts.is_active = TRUE \
               AND $3 = ANY(ts.weekdays) \
               AND ts.start_time <= $4 AND $4 <= ts.end_time \
               AND c.status_id = $5 \
             ORDER BY ts.priority DESC, ts.start_time ASC, s.id ASC"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(ScheduleStatus::Scheduled.id())
            .bind(date)
            .bind(weekday)
            .bind(time_of_day)
            .bind(CampaignStatus::Active.id())
            .fetch_all(pool)
            .await
    }

    /// The retry-sweep selection: Failed occurrences whose `next_retry_at`
    /// has elapsed and whose retry budget is not spent.
    pub async fn due_for_retry(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<Schedule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM campaign_schedules \
             WHERE status_id = $1 \
               AND next_retry_at IS NOT NULL \
               AND next_retry_at <= $2 \
               AND retry_count < max_retries \
             ORDER BY next_retry_at ASC"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(ScheduleStatus::Failed.id())
            .bind(now)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Guarded status transitions
    // -----------------------------------------------------------------------

    /// Transition `expected` -> Running, stamping `executed_at`. Returns
    /// `None` if the row is no longer in `expected` (lost race or invalid
    /// transition).
    pub async fn mark_running(
        pool: &PgPool,
        id: DbId,
        expected: ScheduleStatus,
        executed_at: Timestamp,
    ) -> Result<Option<Schedule>, sqlx::Error> {
        let query = format!(
            "UPDATE campaign_schedules \
             SET status_id = $3, executed_at = $4, next_retry_at = NULL, \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(id)
            .bind(expected.id())
            .bind(ScheduleStatus::Running.id())
            .bind(executed_at)
            .fetch_optional(pool)
            .await
    }

    /// Transition Running -> Completed, stamping `completed_at`.
    pub async fn mark_completed(
        pool: &PgPool,
        id: DbId,
        completed_at: Timestamp,
    ) -> Result<Option<Schedule>, sqlx::Error> {
        let query = format!(
            "UPDATE campaign_schedules \
             SET status_id = $3, completed_at = $4, updated_at = NOW() \
             WHERE id = $1 AND status_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(id)
            .bind(ScheduleStatus::Running.id())
            .bind(ScheduleStatus::Completed.id())
            .bind(completed_at)
            .fetch_optional(pool)
            .await
    }

    /// Transition Running -> Failed with retry budget left: bump the retry
    /// count and arm `next_retry_at`.
    pub async fn mark_failed_retryable(
        pool: &PgPool,
        id: DbId,
        new_count: i16,
        next_retry_at: Timestamp,
        reason: &str,
    ) -> Result<Option<Schedule>, sqlx::Error> {
        let query = format!(
            "UPDATE campaign_schedules \
             SET status_id = $3, retry_count = $4, next_retry_at = $5, \
                 failure_reason = $6, updated_at = NOW() \
             WHERE id = $1 AND status_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(id)
            .bind(ScheduleStatus::Running.id())
            .bind(ScheduleStatus::Failed.id())
            .bind(new_count)
            .bind(next_retry_at)
            .bind(reason)
            .fetch_optional(pool)
            .await
    }

    /// Transition Running -> Failed with the budget spent: no next retry.
    /// The retry count is left at its current value.
    pub async fn mark_failed_terminal(
        pool: &PgPool,
        id: DbId,
        reason: &str,
    ) -> Result<Option<Schedule>, sqlx::Error> {
        let query = format!(
            "UPDATE campaign_schedules \
             SET status_id = $3, next_retry_at = NULL, failure_reason = $4, \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Schedule>(&query)
            .bind(id)
            .bind(ScheduleStatus::Running.id())
            .bind(ScheduleStatus::Failed.id())
            .bind(reason)
            .fetch_optional(pool)
            .await
    }

    /// Cancel a schedule if it is in Scheduled or Failed.
    ///
    /// Returns `true` if the row was cancelled, `false` if it was Running,
    /// already terminal, or missing. A Running occurrence is never
    /// interrupted.
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE campaign_schedules \
             SET status_id = $2, next_retry_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND status_id IN ($3, $4)",
        )
        .bind(id)
        .bind(ScheduleStatus::Cancelled.id())
        .bind(ScheduleStatus::Scheduled.id())
        .bind(ScheduleStatus::Failed.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Retention & stats
    // -----------------------------------------------------------------------

    /// Delete terminal rows older than `cutoff`: Completed by `completed_at`,
    /// terminally Failed (budget spent) by `updated_at`. Returns the number
    /// of rows removed.
    pub async fn delete_terminal_older_than(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM campaign_schedules \
             WHERE (status_id = $1 AND completed_at IS NOT NULL AND completed_at < $3) \
                OR (status_id = $2 AND retry_count >= max_retries AND updated_at < $3)",
        )
        .bind(ScheduleStatus::Completed.id())
        .bind(ScheduleStatus::Failed.id())
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Row counts grouped by status.
    pub async fn count_by_status(pool: &PgPool) -> Result<Vec<(StatusId, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (StatusId, i64)>(
            "SELECT status_id, COUNT(*)::BIGINT FROM campaign_schedules \
             GROUP BY status_id ORDER BY status_id",
        )
        .fetch_all(pool)
        .await
    }

    /// List schedules with optional status/campaign filters and pagination.
    pub async fn list(
        pool: &PgPool,
        params: &ScheduleListQuery,
    ) -> Result<Vec<Schedule>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if params.status_id.is_some() {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
        }

        if params.campaign_id.is_some() {
            conditions.push(format!("campaign_id = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM campaign_schedules \
             {where_clause} \
             ORDER BY scheduled_datetime DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, Schedule>(&query);

        if let Some(sid) = params.status_id {
            q = q.bind(sid);
        }
        if let Some(cid) = params.campaign_id {
            q = q.bind(cid);
        }

        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }
}
