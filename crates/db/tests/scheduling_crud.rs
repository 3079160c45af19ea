//! Integration tests for the scheduling repositories.
//!
//! Exercises the repository layer against a real database:
//! - Transactional replace-all for time slots
//! - Availability probes and free-slot listing
//! - Schedule lifecycle with guarded status transitions
//! - Retry bookkeeping and cleanup retention
//! - Execution log append and filtered queries

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use vendora_core::slot_time::{parse_hhmm, slot_datetime};
use vendora_db::models::execution_log::{
    CreateExecutionLog, ExecutionLogQuery, LogAction, LogStatus,
};
use vendora_db::models::schedule::{CreateSchedule, Schedule, ScheduleListQuery};
use vendora_db::models::status::{CampaignStatus, ScheduleStatus};
use vendora_db::models::time_slot::CreateTimeSlot;
use vendora_db::repositories::{CampaignRepo, ExecutionLogRepo, ScheduleRepo, TimeSlotRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// 2025-06-02 was a Monday (weekday 1).
const MONDAY: &str = "2025-06-02";

/// 2025-06-03 was a Tuesday (weekday 2).
const TUESDAY: &str = "2025-06-03";

fn date(value: &str) -> NaiveDate {
    value.parse().unwrap()
}

fn slot(start: &str, end: &str, weekdays: &[i16]) -> CreateTimeSlot {
    CreateTimeSlot {
        start_time: start.to_string(),
        end_time: end.to_string(),
        weekdays: weekdays.to_vec(),
        priority: 0,
        is_active: true,
    }
}

async fn seed_campaign(pool: &PgPool, name: &str, status: CampaignStatus) -> i64 {
    CampaignRepo::create(pool, name, "banner", status)
        .await
        .unwrap()
        .id
}

/// Seed one campaign with one slot; returns (campaign_id, slot_id).
async fn seed_campaign_with_slot(
    pool: &PgPool,
    name: &str,
    start: &str,
    end: &str,
    weekdays: &[i16],
) -> (i64, i64) {
    let campaign_id = seed_campaign(pool, name, CampaignStatus::Active).await;
    let slots = TimeSlotRepo::replace_for_campaign(pool, campaign_id, &[slot(start, end, weekdays)])
        .await
        .unwrap();
    (campaign_id, slots[0].id)
}

async fn seed_schedule(
    pool: &PgPool,
    campaign_id: i64,
    time_slot_id: i64,
    day: &str,
    start: &str,
) -> Schedule {
    let input = CreateSchedule {
        campaign_id,
        time_slot_id,
        scheduled_date: date(day),
    };
    let at = slot_datetime(date(day), parse_hhmm(start).unwrap());
    ScheduleRepo::create(pool, &input, at).await.unwrap()
}

fn at(day: &str, time: &str) -> chrono::DateTime<Utc> {
    slot_datetime(date(day), parse_hhmm(time).unwrap())
}

// ---------------------------------------------------------------------------
// Time-slot registry
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn replace_for_campaign_swaps_slot_sets(pool: PgPool) {
    let campaign_id = seed_campaign(&pool, "spring-sale", CampaignStatus::Active).await;

    let first = TimeSlotRepo::replace_for_campaign(
        &pool,
        campaign_id,
        &[slot("09:00", "11:00", &[1]), slot("14:00", "16:00", &[2, 4])],
    )
    .await
    .unwrap();
    assert_eq!(first.len(), 2);

    let second =
        TimeSlotRepo::replace_for_campaign(&pool, campaign_id, &[slot("08:00", "10:00", &[5])])
            .await
            .unwrap();
    assert_eq!(second.len(), 1);

    let listed = TimeSlotRepo::list_for_campaign(&pool, campaign_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].start_time, "08:00");
    assert_eq!(listed[0].weekdays, vec![5]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn availability_reports_conflict_for_overlapping_window(pool: PgPool) {
    let (campaign_id, slot_id) =
        seed_campaign_with_slot(&pool, "spring-sale", "09:00", "11:00", &[1]).await;
    seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;

    // [09:00,11:00) vs [10:00,12:00): overlap, and the slot is claimed.
    let probe = TimeSlotRepo::check_availability(&pool, "banner", date(MONDAY), "10:00", "12:00")
        .await
        .unwrap();
    assert!(!probe.available);
    assert_eq!(probe.conflicts.len(), 1);
    assert_eq!(probe.conflicts[0].time_slot_id, slot_id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn availability_end_exclusive_boundary_is_free(pool: PgPool) {
    let (campaign_id, slot_id) =
        seed_campaign_with_slot(&pool, "spring-sale", "09:00", "11:00", &[1]).await;
    seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;

    // [09:00,11:00) vs [11:00,12:00): touching windows do not overlap.
    let probe = TimeSlotRepo::check_availability(&pool, "banner", date(MONDAY), "11:00", "12:00")
        .await
        .unwrap();
    assert!(probe.available);
    assert!(probe.conflicts.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn availability_free_when_slot_unclaimed(pool: PgPool) {
    seed_campaign_with_slot(&pool, "spring-sale", "09:00", "11:00", &[1]).await;

    // The slot overlaps the window but no schedule claims it on that date.
    let probe = TimeSlotRepo::check_availability(&pool, "banner", date(MONDAY), "10:00", "12:00")
        .await
        .unwrap();
    assert!(probe.available);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn free_slots_exclude_claimed_ones(pool: PgPool) {
    let campaign_id = seed_campaign(&pool, "spring-sale", CampaignStatus::Active).await;
    let slots = TimeSlotRepo::replace_for_campaign(
        &pool,
        campaign_id,
        &[slot("09:00", "11:00", &[1]), slot("14:00", "16:00", &[1])],
    )
    .await
    .unwrap();
    seed_schedule(&pool, campaign_id, slots[0].id, MONDAY, "09:00").await;

    let free = TimeSlotRepo::list_free_for_date(&pool, date(MONDAY), None)
        .await
        .unwrap();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].id, slots[1].id);

    // Another weekday: nothing matches at all.
    let free_tuesday = TimeSlotRepo::list_free_for_date(&pool, date(TUESDAY), None)
        .await
        .unwrap();
    assert!(free_tuesday.is_empty());

    // Campaign-type filter.
    let free_other = TimeSlotRepo::list_free_for_date(&pool, date(MONDAY), Some("video"))
        .await
        .unwrap();
    assert!(free_other.is_empty());
}

// ---------------------------------------------------------------------------
// Main-sweep selection
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn due_selection_respects_weekday_containment(pool: PgPool) {
    // Slot active Mon/Wed/Fri; the schedule is (mistakenly) dated a Tuesday.
    let (campaign_id, slot_id) =
        seed_campaign_with_slot(&pool, "spring-sale", "09:00", "11:00", &[1, 3, 5]).await;
    seed_schedule(&pool, campaign_id, slot_id, TUESDAY, "09:00").await;

    let due = ScheduleRepo::due_for_execution(&pool, at(TUESDAY, "10:00"))
        .await
        .unwrap();
    assert!(due.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn due_selection_window_is_inclusive(pool: PgPool) {
    let (campaign_id, slot_id) =
        seed_campaign_with_slot(&pool, "spring-sale", "09:00", "11:00", &[1]).await;
    let schedule = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;

    let before = ScheduleRepo::due_for_execution(&pool, at(MONDAY, "08:59")).await.unwrap();
    assert!(before.is_empty());

    let at_start = ScheduleRepo::due_for_execution(&pool, at(MONDAY, "09:00")).await.unwrap();
    assert_eq!(at_start.len(), 1);
    assert_eq!(at_start[0].id, schedule.id);

    let at_end = ScheduleRepo::due_for_execution(&pool, at(MONDAY, "11:00")).await.unwrap();
    assert_eq!(at_end.len(), 1);

    let after = ScheduleRepo::due_for_execution(&pool, at(MONDAY, "11:01")).await.unwrap();
    assert!(after.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn due_selection_skips_non_serving_campaigns(pool: PgPool) {
    let campaign_id = seed_campaign(&pool, "paused-sale", CampaignStatus::Paused).await;
    let slots =
        TimeSlotRepo::replace_for_campaign(&pool, campaign_id, &[slot("09:00", "11:00", &[1])])
            .await
            .unwrap();
    seed_schedule(&pool, campaign_id, slots[0].id, MONDAY, "09:00").await;

    let due = ScheduleRepo::due_for_execution(&pool, at(MONDAY, "10:00")).await.unwrap();
    assert!(due.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn due_selection_skips_inactive_slots(pool: PgPool) {
    let campaign_id = seed_campaign(&pool, "spring-sale", CampaignStatus::Active).await;
    let mut inactive = slot("09:00", "11:00", &[1]);
    inactive.is_active = false;
    let slots = TimeSlotRepo::replace_for_campaign(&pool, campaign_id, &[inactive])
        .await
        .unwrap();
    seed_schedule(&pool, campaign_id, slots[0].id, MONDAY, "09:00").await;

    let due = ScheduleRepo::due_for_execution(&pool, at(MONDAY, "10:00")).await.unwrap();
    assert!(due.is_empty());
}

// ---------------------------------------------------------------------------
// Guarded lifecycle transitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn guarded_transitions_reject_wrong_source_state(pool: PgPool) {
    let (campaign_id, slot_id) =
        seed_campaign_with_slot(&pool, "spring-sale", "09:00", "11:00", &[1]).await;
    let schedule = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    let now = Utc::now();

    // Completing a Scheduled row matches nothing.
    assert!(ScheduleRepo::mark_completed(&pool, schedule.id, now)
        .await
        .unwrap()
        .is_none());

    // Scheduled -> Running stamps executed_at.
    let running = ScheduleRepo::mark_running(&pool, schedule.id, ScheduleStatus::Scheduled, now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(running.status_id, ScheduleStatus::Running.id());
    assert!(running.executed_at.is_some());

    // A second Scheduled -> Running loses the guard.
    assert!(
        ScheduleRepo::mark_running(&pool, schedule.id, ScheduleStatus::Scheduled, now)
            .await
            .unwrap()
            .is_none()
    );

    // Running -> Completed stamps completed_at; the row is then terminal.
    let completed = ScheduleRepo::mark_completed(&pool, schedule.id, now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completed.status_id, ScheduleStatus::Completed.id());
    assert!(completed.completed_at.is_some());

    assert!(!ScheduleRepo::cancel(&pool, schedule.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_allowed_from_scheduled_and_failed_only(pool: PgPool) {
    let (campaign_id, slot_id) =
        seed_campaign_with_slot(&pool, "spring-sale", "09:00", "11:00", &[1]).await;
    let now = Utc::now();

    // Scheduled: cancellable.
    let scheduled = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    assert!(ScheduleRepo::cancel(&pool, scheduled.id).await.unwrap());

    // Running: not cancellable.
    let running = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    ScheduleRepo::mark_running(&pool, running.id, ScheduleStatus::Scheduled, now)
        .await
        .unwrap()
        .unwrap();
    assert!(!ScheduleRepo::cancel(&pool, running.id).await.unwrap());

    // Failed (retryable): cancellable, and the pending retry is disarmed.
    let failed = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    ScheduleRepo::mark_running(&pool, failed.id, ScheduleStatus::Scheduled, now)
        .await
        .unwrap()
        .unwrap();
    ScheduleRepo::mark_failed_retryable(&pool, failed.id, 1, now, "boom")
        .await
        .unwrap()
        .unwrap();
    assert!(ScheduleRepo::cancel(&pool, failed.id).await.unwrap());

    let row = ScheduleRepo::find_by_id(&pool, failed.id).await.unwrap().unwrap();
    assert_eq!(row.status_id, ScheduleStatus::Cancelled.id());
    assert!(row.next_retry_at.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_schedules_allowed(pool: PgPool) {
    // No uniqueness over (campaign, slot, date): both creates succeed.
    let (campaign_id, slot_id) =
        seed_campaign_with_slot(&pool, "spring-sale", "09:00", "11:00", &[1]).await;

    let first = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    let second = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    assert_ne!(first.id, second.id);

    let due = ScheduleRepo::due_for_execution(&pool, at(MONDAY, "10:00")).await.unwrap();
    assert_eq!(due.len(), 2);
}

// ---------------------------------------------------------------------------
// Retry bookkeeping
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn retry_fields_follow_the_failure_path(pool: PgPool) {
    let (campaign_id, slot_id) =
        seed_campaign_with_slot(&pool, "spring-sale", "09:00", "11:00", &[1]).await;
    let schedule = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    let now = Utc::now();

    ScheduleRepo::mark_running(&pool, schedule.id, ScheduleStatus::Scheduled, now)
        .await
        .unwrap()
        .unwrap();

    let retry_at = now + chrono::Duration::minutes(5);
    let failed =
        ScheduleRepo::mark_failed_retryable(&pool, schedule.id, 1, retry_at, "upstream 503")
            .await
            .unwrap()
            .unwrap();
    assert_eq!(failed.status_id, ScheduleStatus::Failed.id());
    assert_eq!(failed.retry_count, 1);
    assert_eq!(failed.failure_reason.as_deref(), Some("upstream 503"));
    assert!(failed.next_retry_at.is_some());

    // Not due until the backoff elapses.
    let early = ScheduleRepo::due_for_retry(&pool, now).await.unwrap();
    assert!(early.is_empty());

    let due = ScheduleRepo::due_for_retry(&pool, retry_at).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, schedule.id);

    // Re-entering execution clears the armed retry.
    let rerun = ScheduleRepo::mark_running(&pool, schedule.id, ScheduleStatus::Failed, now)
        .await
        .unwrap()
        .unwrap();
    assert!(rerun.next_retry_at.is_none());

    // Terminal failure: no next retry, budget untouched.
    let terminal = ScheduleRepo::mark_failed_terminal(&pool, schedule.id, "max retries reached")
        .await
        .unwrap()
        .unwrap();
    assert!(terminal.next_retry_at.is_none());

    // A terminally failed row is never selected by the retry sweep.
    let far_future = now + chrono::Duration::days(1);
    assert!(ScheduleRepo::due_for_retry(&pool, far_future).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Cleanup retention
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn cleanup_deletes_only_old_terminal_rows_and_is_idempotent(pool: PgPool) {
    let (campaign_id, slot_id) =
        seed_campaign_with_slot(&pool, "spring-sale", "09:00", "11:00", &[1]).await;
    let now = Utc::now();

    // Old completed row (completed 40 days ago).
    let old_completed = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    ScheduleRepo::mark_running(&pool, old_completed.id, ScheduleStatus::Scheduled, now)
        .await
        .unwrap()
        .unwrap();
    ScheduleRepo::mark_completed(&pool, old_completed.id, now - chrono::Duration::days(40))
        .await
        .unwrap()
        .unwrap();

    // Fresh completed row.
    let fresh_completed = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    ScheduleRepo::mark_running(&pool, fresh_completed.id, ScheduleStatus::Scheduled, now)
        .await
        .unwrap()
        .unwrap();
    ScheduleRepo::mark_completed(&pool, fresh_completed.id, now).await.unwrap().unwrap();

    // Old terminally failed row: exhaust the budget, then age updated_at.
    let old_failed = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    ScheduleRepo::mark_running(&pool, old_failed.id, ScheduleStatus::Scheduled, now)
        .await
        .unwrap()
        .unwrap();
    sqlx::query(
        "UPDATE campaign_schedules \
         SET status_id = $2, retry_count = max_retries, \
             updated_at = NOW() - INTERVAL '40 days' \
         WHERE id = $1",
    )
    .bind(old_failed.id)
    .bind(ScheduleStatus::Failed.id())
    .execute(&pool)
    .await
    .unwrap();

    // Failed row with budget left must survive cleanup regardless of age.
    let retryable_failed = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    ScheduleRepo::mark_running(&pool, retryable_failed.id, ScheduleStatus::Scheduled, now)
        .await
        .unwrap()
        .unwrap();
    ScheduleRepo::mark_failed_retryable(&pool, retryable_failed.id, 1, now, "boom")
        .await
        .unwrap()
        .unwrap();
    sqlx::query(
        "UPDATE campaign_schedules SET updated_at = NOW() - INTERVAL '40 days' WHERE id = $1",
    )
    .bind(retryable_failed.id)
    .execute(&pool)
    .await
    .unwrap();

    let cutoff = now - chrono::Duration::days(30);
    let deleted = ScheduleRepo::delete_terminal_older_than(&pool, cutoff).await.unwrap();
    assert_eq!(deleted, 2);

    // Idempotent: nothing left to delete.
    let second_pass = ScheduleRepo::delete_terminal_older_than(&pool, cutoff).await.unwrap();
    assert_eq!(second_pass, 0);

    assert!(ScheduleRepo::find_by_id(&pool, fresh_completed.id).await.unwrap().is_some());
    assert!(ScheduleRepo::find_by_id(&pool, retryable_failed.id).await.unwrap().is_some());
    assert!(ScheduleRepo::find_by_id(&pool, old_completed.id).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Stats & listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn count_by_status_and_filtered_listing(pool: PgPool) {
    let (campaign_id, slot_id) =
        seed_campaign_with_slot(&pool, "spring-sale", "09:00", "11:00", &[1]).await;
    let now = Utc::now();

    seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    let cancelled = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    ScheduleRepo::cancel(&pool, cancelled.id).await.unwrap();
    let completed = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;
    ScheduleRepo::mark_running(&pool, completed.id, ScheduleStatus::Scheduled, now)
        .await
        .unwrap()
        .unwrap();
    ScheduleRepo::mark_completed(&pool, completed.id, now).await.unwrap().unwrap();

    let counts = ScheduleRepo::count_by_status(&pool).await.unwrap();
    let get = |status: ScheduleStatus| {
        counts
            .iter()
            .find(|(id, _)| *id == status.id())
            .map(|(_, count)| *count)
            .unwrap_or(0)
    };
    assert_eq!(get(ScheduleStatus::Scheduled), 2);
    assert_eq!(get(ScheduleStatus::Completed), 1);
    assert_eq!(get(ScheduleStatus::Cancelled), 1);

    let scheduled_only = ScheduleRepo::list(
        &pool,
        &ScheduleListQuery {
            status_id: Some(ScheduleStatus::Scheduled.id()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(scheduled_only.len(), 2);

    let paged = ScheduleRepo::list(
        &pool,
        &ScheduleListQuery {
            limit: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(paged.len(), 1);
}

// ---------------------------------------------------------------------------
// Execution log
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn log_append_and_filtered_query(pool: PgPool) {
    let (campaign_id, slot_id) =
        seed_campaign_with_slot(&pool, "spring-sale", "09:00", "11:00", &[1]).await;
    let schedule = seed_schedule(&pool, campaign_id, slot_id, MONDAY, "09:00").await;

    let start = CreateExecutionLog {
        schedule_id: Some(schedule.id),
        campaign_id: Some(campaign_id),
        action: LogAction::Start,
        status: LogStatus::Success,
        message: "Campaign execution started".to_string(),
        error_details: None,
        metrics: None,
    };
    ExecutionLogRepo::append(&pool, &start).await.unwrap();

    let error = CreateExecutionLog {
        action: LogAction::Error,
        status: LogStatus::Failed,
        message: "upstream 503".to_string(),
        error_details: Some(serde_json::json!({ "error": "upstream 503" })),
        ..start.clone()
    };
    ExecutionLogRepo::append(&pool, &error).await.unwrap();

    // System-scoped entry with no schedule.
    let system = CreateExecutionLog {
        schedule_id: None,
        campaign_id: None,
        action: LogAction::Error,
        status: LogStatus::Failed,
        message: "main sweep: store unreachable".to_string(),
        error_details: Some(serde_json::json!({ "context": "main sweep" })),
        metrics: None,
    };
    ExecutionLogRepo::append(&pool, &system).await.unwrap();

    let by_schedule = ExecutionLogRepo::list_by_schedule(&pool, schedule.id).await.unwrap();
    assert_eq!(by_schedule.len(), 2);
    assert_eq!(by_schedule[0].action, "START");
    assert_eq!(by_schedule[1].action, "ERROR");

    let failed_only = ExecutionLogRepo::query(
        &pool,
        &ExecutionLogQuery {
            status: Some("FAILED".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(failed_only.len(), 2);

    let failed_for_schedule = ExecutionLogRepo::count(
        &pool,
        &ExecutionLogQuery {
            schedule_id: Some(schedule.id),
            status: Some("FAILED".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(failed_for_schedule, 1);
}
