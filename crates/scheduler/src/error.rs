use vendora_core::error::CoreError;

/// Scheduler-level error type.
///
/// Wraps [`CoreError`] for domain errors and `sqlx::Error` for store
/// failures. Creation-time validation surfaces as `Core`; everything the
/// sweeps hit is `Database`.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A domain-level error from `vendora_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for scheduler return values.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
