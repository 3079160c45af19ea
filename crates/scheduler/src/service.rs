//! The trigger clock and in-process control surface (PRD-21).
//!
//! [`SchedulerService`] owns the three named periodic tasks (main sweep,
//! retry sweep, cleanup sweep) and exposes the operations the marketplace
//! API layer calls: start/stop, schedule creation and cancellation, slot
//! registry updates and availability probes, status and stats.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use vendora_core::error::CoreError;
use vendora_core::slot_time;
use vendora_core::types::{DbId, Timestamp};
use vendora_db::models::schedule::{CreateSchedule, Schedule};
use vendora_db::models::status::ScheduleStatus;
use vendora_db::models::time_slot::{Availability, CreateTimeSlot, TimeSlot};
use vendora_db::repositories::{CampaignRepo, ScheduleRepo, TimeSlotRepo};

use crate::audit;
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::executor::ExecutionEngine;
use crate::runner::CampaignRunner;
use crate::sweeps;

/// Task names reported by [`SchedulerService::get_status`].
pub const MAIN_SWEEP: &str = "main";
pub const RETRY_SWEEP: &str = "retry";
pub const CLEANUP_SWEEP: &str = "cleanup";

/// Result of a start/stop request. `changed` is false when the clock was
/// already in the requested state.
#[derive(Debug, Clone)]
pub struct ControlOutcome {
    pub changed: bool,
    pub message: String,
}

/// Snapshot of the trigger clock.
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub running: bool,
    pub active_tasks: Vec<&'static str>,
    pub uptime: Option<Duration>,
}

/// One armed periodic task.
struct SweepHandle {
    name: &'static str,
    handle: JoinHandle<()>,
}

/// The fixed set of named periodic tasks. Armed and disarmed as a unit.
struct SweepTasks {
    main: SweepHandle,
    retry: SweepHandle,
    cleanup: SweepHandle,
}

impl SweepTasks {
    fn names(&self) -> Vec<&'static str> {
        vec![self.main.name, self.retry.name, self.cleanup.name]
    }

    fn into_handles(self) -> [SweepHandle; 3] {
        [self.main, self.retry, self.cleanup]
    }
}

/// Live clock state while the scheduler is running.
struct ClockState {
    cancel: CancellationToken,
    tasks: SweepTasks,
    started_at: Timestamp,
}

pub struct SchedulerService {
    pool: PgPool,
    engine: Arc<ExecutionEngine>,
    config: SchedulerConfig,
    state: Mutex<Option<ClockState>>,
}

impl SchedulerService {
    pub fn new(pool: PgPool, runner: Arc<dyn CampaignRunner>, config: SchedulerConfig) -> Self {
        let engine = Arc::new(ExecutionEngine::new(
            pool.clone(),
            runner,
            config.execution_timeout,
        ));
        Self {
            pool,
            engine,
            config,
            state: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Trigger clock
    // -----------------------------------------------------------------------

    /// Arm all three periodic tasks. Idempotent: starting a running
    /// scheduler is a no-op.
    pub async fn start(&self) -> ControlOutcome {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return ControlOutcome {
                changed: false,
                message: "Scheduler already running".to_string(),
            };
        }

        let cancel = CancellationToken::new();

        let main = {
            let pool = self.pool.clone();
            let engine = Arc::clone(&self.engine);
            spawn_sweep(
                MAIN_SWEEP,
                self.config.main_sweep_interval,
                cancel.clone(),
                move || {
                    let pool = pool.clone();
                    let engine = Arc::clone(&engine);
                    async move {
                        match sweeps::main_sweep(&pool, &engine, Utc::now()).await {
                            Ok(outcome) if outcome.selected > 0 => {
                                tracing::info!(
                                    selected = outcome.selected,
                                    "Main sweep dispatched due schedules",
                                );
                            }
                            Ok(_) => tracing::debug!("Main sweep found no due schedules"),
                            Err(e) => {
                                tracing::error!(error = %e, "Main sweep failed");
                                audit::log_best_effort(
                                    &pool,
                                    audit::system_error_entry("main sweep", &e.to_string()),
                                )
                                .await;
                            }
                        }
                    }
                },
            )
        };

        let retry = {
            let pool = self.pool.clone();
            let engine = Arc::clone(&self.engine);
            spawn_sweep(
                RETRY_SWEEP,
                self.config.retry_sweep_interval,
                cancel.clone(),
                move || {
                    let pool = pool.clone();
                    let engine = Arc::clone(&engine);
                    async move {
                        match sweeps::retry_sweep(&pool, &engine, Utc::now()).await {
                            Ok(outcome) if outcome.selected > 0 => {
                                tracing::info!(
                                    selected = outcome.selected,
                                    "Retry sweep re-dispatched failed schedules",
                                );
                            }
                            Ok(_) => tracing::debug!("Retry sweep found nothing due"),
                            Err(e) => {
                                tracing::error!(error = %e, "Retry sweep failed");
                                audit::log_best_effort(
                                    &pool,
                                    audit::system_error_entry("retry sweep", &e.to_string()),
                                )
                                .await;
                            }
                        }
                    }
                },
            )
        };

        let cleanup = {
            let pool = self.pool.clone();
            let retention_days = self.config.retention_days;
            spawn_sweep(
                CLEANUP_SWEEP,
                self.config.cleanup_sweep_interval,
                cancel.clone(),
                move || {
                    let pool = pool.clone();
                    async move {
                        match sweeps::cleanup_sweep(&pool, retention_days, Utc::now()).await {
                            Ok(deleted) if deleted > 0 => {
                                tracing::info!(deleted, "Cleanup sweep purged terminal schedules");
                            }
                            Ok(_) => tracing::debug!("Cleanup sweep found nothing to purge"),
                            Err(e) => {
                                tracing::error!(error = %e, "Cleanup sweep failed");
                                audit::log_best_effort(
                                    &pool,
                                    audit::system_error_entry("cleanup sweep", &e.to_string()),
                                )
                                .await;
                            }
                        }
                    }
                },
            )
        };

        *state = Some(ClockState {
            cancel,
            tasks: SweepTasks {
                main,
                retry,
                cleanup,
            },
            started_at: Utc::now(),
        });

        tracing::info!("Scheduler started");
        ControlOutcome {
            changed: true,
            message: "Scheduler started".to_string(),
        }
    }

    /// Disarm all three periodic tasks, waiting for any in-flight sweep to
    /// finish. Idempotent: stopping a stopped scheduler is a no-op.
    pub async fn stop(&self) -> ControlOutcome {
        let mut state = self.state.lock().await;
        let Some(clock) = state.take() else {
            return ControlOutcome {
                changed: false,
                message: "Scheduler already stopped".to_string(),
            };
        };

        clock.cancel.cancel();
        for sweep in clock.tasks.into_handles() {
            if let Err(e) = sweep.handle.await {
                if e.is_panic() {
                    tracing::error!(task = sweep.name, "Sweep task panicked during shutdown");
                }
            }
        }

        tracing::info!("Scheduler stopped");
        ControlOutcome {
            changed: true,
            message: "Scheduler stopped".to_string(),
        }
    }

    /// Current clock state: whether the tasks are armed, their names, and
    /// how long the clock has been running.
    pub async fn get_status(&self) -> SchedulerStatus {
        let state = self.state.lock().await;
        match state.as_ref() {
            Some(clock) => SchedulerStatus {
                running: true,
                active_tasks: clock.tasks.names(),
                uptime: Some((Utc::now() - clock.started_at).to_std().unwrap_or_default()),
            },
            None => SchedulerStatus {
                running: false,
                active_tasks: Vec::new(),
                uptime: None,
            },
        }
    }

    // -----------------------------------------------------------------------
    // Schedule operations
    // -----------------------------------------------------------------------

    /// Create a schedule occurrence. The time slot and campaign must exist;
    /// this is the one path that fails loudly. The concrete fire instant is
    /// derived here from the date and the slot's start time, once.
    pub async fn create_schedule(
        &self,
        input: &CreateSchedule,
    ) -> Result<Schedule, SchedulerError> {
        let slot = TimeSlotRepo::find_by_id(&self.pool, input.time_slot_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "time slot",
                id: input.time_slot_id,
            })?;

        CampaignRepo::find_by_id(&self.pool, input.campaign_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "campaign",
                id: input.campaign_id,
            })?;

        let start = slot_time::parse_hhmm(&slot.start_time)?;
        let scheduled_datetime = slot_time::slot_datetime(input.scheduled_date, start);

        let schedule = ScheduleRepo::create(&self.pool, input, scheduled_datetime).await?;
        tracing::info!(
            schedule_id = schedule.id,
            campaign_id = schedule.campaign_id,
            time_slot_id = schedule.time_slot_id,
            date = %schedule.scheduled_date,
            "Schedule created",
        );
        Ok(schedule)
    }

    /// Cancel a schedule in Scheduled or Failed.
    ///
    /// A Running occurrence is not cancellable: cancellation is a state
    /// write, and an in-flight execution is never interrupted.
    pub async fn cancel_schedule(&self, id: DbId) -> Result<(), SchedulerError> {
        let schedule = ScheduleRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "schedule",
                id,
            })?;

        let cancelled = ScheduleRepo::cancel(&self.pool, id).await?;
        if !cancelled {
            return Err(CoreError::Conflict(format!(
                "Schedule {id} is not cancellable from its current state"
            ))
            .into());
        }

        tracing::info!(schedule_id = id, "Schedule cancelled");
        audit::log_best_effort(&self.pool, audit::cancel_entry(&schedule)).await;
        Ok(())
    }

    /// Row counts per status name.
    pub async fn get_schedule_stats(&self) -> Result<HashMap<&'static str, i64>, SchedulerError> {
        let mut stats: HashMap<&'static str, i64> = [
            ScheduleStatus::Scheduled,
            ScheduleStatus::Running,
            ScheduleStatus::Completed,
            ScheduleStatus::Failed,
            ScheduleStatus::Cancelled,
        ]
        .into_iter()
        .map(|status| (status.name(), 0))
        .collect();

        for (status_id, count) in ScheduleRepo::count_by_status(&self.pool).await? {
            if let Some(status) = ScheduleStatus::from_id(status_id) {
                stats.insert(status.name(), count);
            }
        }
        Ok(stats)
    }

    // -----------------------------------------------------------------------
    // Time-slot registry
    // -----------------------------------------------------------------------

    /// Replace a campaign's entire slot set (validated, transactional).
    pub async fn replace_time_slots(
        &self,
        campaign_id: DbId,
        slots: &[CreateTimeSlot],
    ) -> Result<Vec<TimeSlot>, SchedulerError> {
        for slot in slots {
            slot_time::validate_time_range(&slot.start_time, &slot.end_time)?;
            slot_time::validate_weekdays(&slot.weekdays)?;
        }

        CampaignRepo::find_by_id(&self.pool, campaign_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "campaign",
                id: campaign_id,
            })?;

        let created = TimeSlotRepo::replace_for_campaign(&self.pool, campaign_id, slots).await?;
        tracing::info!(
            campaign_id,
            slots = created.len(),
            "Time slots replaced for campaign",
        );
        Ok(created)
    }

    /// Probe whether a window on `date` is free for `campaign_type`.
    pub async fn check_availability(
        &self,
        campaign_type: &str,
        date: NaiveDate,
        start_time: &str,
        end_time: &str,
    ) -> Result<Availability, SchedulerError> {
        slot_time::validate_time_range(start_time, end_time)?;
        Ok(
            TimeSlotRepo::check_availability(&self.pool, campaign_type, date, start_time, end_time)
                .await?,
        )
    }

    /// Active slots free on `date`, optionally filtered by campaign type.
    pub async fn list_free_slots(
        &self,
        date: NaiveDate,
        campaign_type: Option<&str>,
    ) -> Result<Vec<TimeSlot>, SchedulerError> {
        Ok(TimeSlotRepo::list_free_for_date(&self.pool, date, campaign_type).await?)
    }
}

// ---------------------------------------------------------------------------
// Sweep loop plumbing
// ---------------------------------------------------------------------------

/// Spawn one named sweep loop: tick on `period`, run `tick` to completion,
/// exit when `cancel` fires.
///
/// The `AtomicBool` guard makes ticks non-reentrant: the loop body is
/// awaited inline so overlap cannot happen here, but the guard also covers
/// any future out-of-band invocation and documents the invariant.
fn spawn_sweep<F, Fut>(
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    tick: F,
) -> SweepHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let guard = AtomicBool::new(false);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(task = name, period_secs = period.as_secs(), "Sweep task armed");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(task = name, "Sweep task disarmed");
                    break;
                }
                _ = ticker.tick() => {
                    if guard.swap(true, Ordering::Acquire) {
                        tracing::warn!(task = name, "Previous sweep still in flight; skipping tick");
                        continue;
                    }
                    tick().await;
                    guard.store(false, Ordering::Release);
                }
            }
        }
    });

    SweepHandle { name, handle }
}
