//! The execution engine (PRD-21): drives one schedule occurrence through
//! Running to Completed or Failed.
//!
//! Fire-and-forget per schedule: [`ExecutionEngine::run`] returns nothing
//! and never propagates an error. A failing schedule is captured in the
//! store and the log, so one bad occurrence cannot abort a sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use vendora_core::retry::{self, RetryDecision};
use vendora_core::scheduling::state_machine;
use vendora_db::models::schedule::Schedule;
use vendora_db::models::status::ScheduleStatus;
use vendora_db::repositories::{CampaignRepo, ScheduleRepo, TimeSlotRepo};

use crate::audit;
use crate::runner::{CampaignRunner, RunMetrics};

pub struct ExecutionEngine {
    pool: PgPool,
    runner: Arc<dyn CampaignRunner>,
    execution_timeout: Duration,
}

impl ExecutionEngine {
    pub fn new(pool: PgPool, runner: Arc<dyn CampaignRunner>, execution_timeout: Duration) -> Self {
        Self {
            pool,
            runner,
            execution_timeout,
        }
    }

    /// Execute one schedule: transition to Running, invoke the campaign
    /// side effect, and persist the outcome.
    ///
    /// `schedule` is the row as the sweep selected it; the Running
    /// transition re-checks the status in its WHERE clause, so a row that
    /// changed in between is skipped, not clobbered.
    pub async fn run(&self, schedule: &Schedule) {
        let running_id = ScheduleStatus::Running.id();
        if let Err(reason) = state_machine::validate_transition(schedule.status_id, running_id) {
            tracing::warn!(
                schedule_id = schedule.id,
                reason = %reason,
                "Refusing to execute schedule",
            );
            return;
        }

        let expected = if schedule.status_id == ScheduleStatus::Failed.id() {
            ScheduleStatus::Failed
        } else {
            ScheduleStatus::Scheduled
        };

        let running =
            match ScheduleRepo::mark_running(&self.pool, schedule.id, expected, Utc::now()).await
            {
                Ok(Some(row)) => row,
                Ok(None) => {
                    tracing::warn!(
                        schedule_id = schedule.id,
                        "Schedule changed underneath the sweep; skipping",
                    );
                    return;
                }
                Err(e) => {
                    tracing::error!(
                        schedule_id = schedule.id,
                        error = %e,
                        "Failed to transition schedule to Running",
                    );
                    return;
                }
            };

        tracing::info!(
            schedule_id = running.id,
            campaign_id = running.campaign_id,
            retry_count = running.retry_count,
            "Schedule execution started",
        );
        audit::log_best_effort(&self.pool, audit::start_entry(&running)).await;

        match self.invoke_runner(&running).await {
            Ok(metrics) => self.complete(&running, metrics).await,
            Err(message) => self.fail(&running, &message).await,
        }
    }

    /// Resolve the campaign and slot, then run the side effect under the
    /// execution timeout. Every failure collapses to a message string for
    /// the retry policy.
    async fn invoke_runner(&self, schedule: &Schedule) -> Result<RunMetrics, String> {
        let campaign = match CampaignRepo::find_by_id(&self.pool, schedule.campaign_id).await {
            Ok(Some(campaign)) => campaign,
            Ok(None) => {
                return Err(format!("campaign {} no longer exists", schedule.campaign_id));
            }
            Err(e) => return Err(format!("campaign lookup failed: {e}")),
        };

        let slot = match TimeSlotRepo::find_by_id(&self.pool, schedule.time_slot_id).await {
            Ok(Some(slot)) => slot,
            Ok(None) => {
                return Err(format!("time slot {} no longer exists", schedule.time_slot_id));
            }
            Err(e) => return Err(format!("time slot lookup failed: {e}")),
        };

        match tokio::time::timeout(
            self.execution_timeout,
            self.runner.execute(&campaign, &slot),
        )
        .await
        {
            Ok(Ok(metrics)) => Ok(metrics),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "execution timed out after {}s",
                self.execution_timeout.as_secs()
            )),
        }
    }

    async fn complete(&self, schedule: &Schedule, metrics: RunMetrics) {
        match ScheduleRepo::mark_completed(&self.pool, schedule.id, Utc::now()).await {
            Ok(Some(row)) => {
                tracing::info!(
                    schedule_id = row.id,
                    campaign_id = row.campaign_id,
                    impressions = metrics.impressions_delta,
                    "Schedule completed",
                );
                audit::log_best_effort(&self.pool, audit::stop_entry(&row, &metrics)).await;
            }
            Ok(None) => {
                tracing::warn!(
                    schedule_id = schedule.id,
                    "Completion lost a status race; row left as-is",
                );
            }
            Err(e) => {
                tracing::error!(
                    schedule_id = schedule.id,
                    error = %e,
                    "Failed to persist completion",
                );
            }
        }
    }

    /// Route a failed run through the retry policy and persist the result.
    async fn fail(&self, schedule: &Schedule, message: &str) {
        let decision = retry::decide(schedule.retry_count, schedule.max_retries, message);

        let persisted = match &decision {
            RetryDecision::Retry {
                new_count,
                delay,
                reason,
            } => {
                ScheduleRepo::mark_failed_retryable(
                    &self.pool,
                    schedule.id,
                    *new_count,
                    Utc::now() + *delay,
                    reason,
                )
                .await
            }
            RetryDecision::Exhausted { reason } => {
                ScheduleRepo::mark_failed_terminal(&self.pool, schedule.id, reason).await
            }
        };

        match persisted {
            Ok(Some(row)) => {
                tracing::warn!(
                    schedule_id = row.id,
                    campaign_id = row.campaign_id,
                    retry_count = row.retry_count,
                    terminal = row.next_retry_at.is_none(),
                    error = message,
                    "Schedule execution failed",
                );
                audit::log_best_effort(&self.pool, audit::error_entry(&row, message)).await;
            }
            Ok(None) => {
                tracing::warn!(
                    schedule_id = schedule.id,
                    "Failure transition lost a status race; row left as-is",
                );
            }
            Err(e) => {
                tracing::error!(
                    schedule_id = schedule.id,
                    error = %e,
                    "Failed to persist execution failure",
                );
            }
        }
    }
}
