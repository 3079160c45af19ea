//! Repository for the `schedule_execution_logs` table (PRD-22).
//!
//! Append-only: nothing here updates or deletes rows. Inserts must stay
//! cheap; they run on every lifecycle transition.

use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};
use vendora_core::types::{DbId, Timestamp};

use crate::models::execution_log::{CreateExecutionLog, ExecutionLog, ExecutionLogQuery};

/// Column list for `schedule_execution_logs` SELECT queries.
const COLUMNS: &str = "\
    id, schedule_id, campaign_id, action, status, message, \
    error_details, metrics, created_at";

/// Provides append and query operations for the execution log.
pub struct ExecutionLogRepo;

impl ExecutionLogRepo {
    /// Append one log entry.
    pub async fn append(
        pool: &PgPool,
        entry: &CreateExecutionLog,
    ) -> Result<ExecutionLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO schedule_execution_logs \
                 (schedule_id, campaign_id, action, status, message, \
                  error_details, metrics) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ExecutionLog>(&query)
            .bind(entry.schedule_id)
            .bind(entry.campaign_id)
            .bind(entry.action.as_str())
            .bind(entry.status.as_str())
            .bind(&entry.message)
            .bind(&entry.error_details)
            .bind(&entry.metrics)
            .fetch_one(pool)
            .await
    }

    /// All entries for one schedule, oldest first.
    pub async fn list_by_schedule(
        pool: &PgPool,
        schedule_id: DbId,
    ) -> Result<Vec<ExecutionLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM schedule_execution_logs \
             WHERE schedule_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ExecutionLog>(&query)
            .bind(schedule_id)
            .fetch_all(pool)
            .await
    }

    /// Query log entries with filtering and pagination, newest first.
    pub async fn query(
        pool: &PgPool,
        params: &ExecutionLogQuery,
    ) -> Result<Vec<ExecutionLog>, sqlx::Error> {
        let limit = params.limit.unwrap_or(50).min(500);
        let offset = params.offset.unwrap_or(0);

        let (where_clause, bind_values, bind_idx) = build_log_filter(params);

        let query = format!(
            "SELECT {COLUMNS} FROM schedule_execution_logs {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );

        let q = bind_log_values(sqlx::query_as::<_, ExecutionLog>(&query), &bind_values);
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Count log entries matching the given filter (for pagination metadata).
    pub async fn count(pool: &PgPool, params: &ExecutionLogQuery) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_log_filter(params);

        let query =
            format!("SELECT COUNT(*)::BIGINT FROM schedule_execution_logs {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for value in &bind_values {
            q = match value {
                LogBindValue::Id(v) => q.bind(*v),
                LogBindValue::Text(v) => q.bind(v.clone()),
                LogBindValue::Ts(v) => q.bind(*v),
            };
        }
        q.fetch_one(pool).await
    }
}

// ---------------------------------------------------------------------------
// Filter assembly
// ---------------------------------------------------------------------------

/// A deferred bind value for the dynamic filter.
enum LogBindValue {
    Id(DbId),
    Text(String),
    Ts(Timestamp),
}

/// Build the WHERE clause for a log query. Returns the clause, the values to
/// bind in order, and the next free bind index (for LIMIT/OFFSET).
fn build_log_filter(params: &ExecutionLogQuery) -> (String, Vec<LogBindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_values: Vec<LogBindValue> = Vec::new();
    let mut bind_idx: u32 = 1;

    if let Some(id) = params.schedule_id {
        conditions.push(format!("schedule_id = ${bind_idx}"));
        bind_values.push(LogBindValue::Id(id));
        bind_idx += 1;
    }
    if let Some(id) = params.campaign_id {
        conditions.push(format!("campaign_id = ${bind_idx}"));
        bind_values.push(LogBindValue::Id(id));
        bind_idx += 1;
    }
    if let Some(ref action) = params.action {
        conditions.push(format!("action = ${bind_idx}"));
        bind_values.push(LogBindValue::Text(action.clone()));
        bind_idx += 1;
    }
    if let Some(ref status) = params.status {
        conditions.push(format!("status = ${bind_idx}"));
        bind_values.push(LogBindValue::Text(status.clone()));
        bind_idx += 1;
    }
    if let Some(from) = params.from {
        conditions.push(format!("created_at >= ${bind_idx}"));
        bind_values.push(LogBindValue::Ts(from));
        bind_idx += 1;
    }
    if let Some(to) = params.to {
        conditions.push(format!("created_at <= ${bind_idx}"));
        bind_values.push(LogBindValue::Ts(to));
        bind_idx += 1;
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}

/// Apply the deferred bind values to a query in order.
fn bind_log_values<'q>(
    mut q: QueryAs<'q, Postgres, ExecutionLog, PgArguments>,
    values: &'q [LogBindValue],
) -> QueryAs<'q, Postgres, ExecutionLog, PgArguments> {
    for value in values {
        q = match value {
            LogBindValue::Id(v) => q.bind(*v),
            LogBindValue::Text(v) => q.bind(v.as_str()),
            LogBindValue::Ts(v) => q.bind(*v),
        };
    }
    q
}
