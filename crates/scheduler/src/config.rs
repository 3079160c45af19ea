use std::time::Duration;

/// Scheduler configuration loaded from environment variables.
///
/// All fields have defaults suitable for production; override via
/// environment variables for tests or unusual deployments.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Main sweep cadence (default: 60 s).
    pub main_sweep_interval: Duration,
    /// Retry sweep cadence (default: 300 s).
    pub retry_sweep_interval: Duration,
    /// Cleanup sweep cadence (default: 86 400 s, once a day).
    pub cleanup_sweep_interval: Duration,
    /// How long terminal schedules are retained before cleanup (default: 30).
    pub retention_days: i64,
    /// Upper bound on a single schedule's execution (default: 60 s).
    pub execution_timeout: Duration,
}

impl SchedulerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `MAIN_SWEEP_INTERVAL_SECS`    | `60`    |
    /// | `RETRY_SWEEP_INTERVAL_SECS`   | `300`   |
    /// | `CLEANUP_SWEEP_INTERVAL_SECS` | `86400` |
    /// | `SCHEDULE_RETENTION_DAYS`     | `30`    |
    /// | `EXECUTION_TIMEOUT_SECS`      | `60`    |
    pub fn from_env() -> Self {
        Self {
            main_sweep_interval: Duration::from_secs(u64_var("MAIN_SWEEP_INTERVAL_SECS", 60)),
            retry_sweep_interval: Duration::from_secs(u64_var("RETRY_SWEEP_INTERVAL_SECS", 300)),
            cleanup_sweep_interval: Duration::from_secs(u64_var(
                "CLEANUP_SWEEP_INTERVAL_SECS",
                86_400,
            )),
            retention_days: u64_var("SCHEDULE_RETENTION_DAYS", 30) as i64,
            execution_timeout: Duration::from_secs(u64_var("EXECUTION_TIMEOUT_SECS", 60)),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            main_sweep_interval: Duration::from_secs(60),
            retry_sweep_interval: Duration::from_secs(300),
            cleanup_sweep_interval: Duration::from_secs(86_400),
            retention_days: 30,
            execution_timeout: Duration::from_secs(60),
        }
    }
}

/// Read a u64 env var, falling back to `default` when unset.
fn u64_var(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid u64")),
        Err(_) => default,
    }
}
