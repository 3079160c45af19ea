//! Retry/backoff policy for failed schedule executions (PRD-21).
//!
//! A pure decision function: given a schedule's retry history and the error
//! that just occurred, decide whether to retry and how long to wait. The
//! caller applies `now + delay`; nothing here reads the clock.

use chrono::Duration;

/// Every schedule is created with this retry budget.
pub const DEFAULT_MAX_RETRIES: i16 = 3;

/// Linear backoff step: the Nth retry waits `N * 5` minutes.
pub const BACKOFF_STEP_MINUTES: i64 = 5;

/// Outcome of a failure: retry later, or give up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule another attempt after `delay`.
    Retry {
        /// The retry count after this failure (`previous + 1`).
        new_count: i16,
        /// How long to wait before the next attempt.
        delay: Duration,
        /// Failure reason to persist (the raw error message).
        reason: String,
    },
    /// The retry budget is spent; the schedule is terminally failed.
    Exhausted {
        /// Failure reason to persist.
        reason: String,
    },
}

/// Decide what to do after a failed execution.
///
/// `retry_count` is the number of retries already consumed. The backoff is
/// linear: the first retry waits 5 minutes, the second 10, the third 15.
pub fn decide(retry_count: i16, max_retries: i16, error: &str) -> RetryDecision {
    let new_count = retry_count + 1;
    if new_count > max_retries {
        return RetryDecision::Exhausted {
            reason: format!("max retries reached, last error: {error}"),
        };
    }
    RetryDecision::Retry {
        new_count,
        delay: Duration::minutes(new_count as i64 * BACKOFF_STEP_MINUTES),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- backoff progression --------------------------------------------------

    #[test]
    fn first_retry_waits_five_minutes() {
        match decide(0, DEFAULT_MAX_RETRIES, "boom") {
            RetryDecision::Retry {
                new_count, delay, ..
            } => {
                assert_eq!(new_count, 1);
                assert_eq!(delay, Duration::minutes(5));
            }
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn backoff_grows_linearly() {
        let delays: Vec<Duration> = (0..3)
            .map(|count| match decide(count, DEFAULT_MAX_RETRIES, "boom") {
                RetryDecision::Retry { delay, .. } => delay,
                other => panic!("expected retry, got {other:?}"),
            })
            .collect();
        assert_eq!(
            delays,
            vec![
                Duration::minutes(5),
                Duration::minutes(10),
                Duration::minutes(15),
            ]
        );
    }

    #[test]
    fn delays_are_strictly_increasing() {
        let mut previous = Duration::zero();
        for count in 0..DEFAULT_MAX_RETRIES {
            match decide(count, DEFAULT_MAX_RETRIES, "boom") {
                RetryDecision::Retry { delay, .. } => {
                    assert!(delay > previous);
                    previous = delay;
                }
                other => panic!("expected retry, got {other:?}"),
            }
        }
    }

    // -- exhaustion -----------------------------------------------------------

    #[test]
    fn fourth_failure_is_terminal() {
        // retry_count = 3 means three retries already consumed.
        match decide(3, DEFAULT_MAX_RETRIES, "boom") {
            RetryDecision::Exhausted { reason } => {
                assert_eq!(reason, "max retries reached, last error: boom");
            }
            other => panic!("expected exhausted, got {other:?}"),
        }
    }

    #[test]
    fn last_budgeted_retry_still_allowed() {
        match decide(2, DEFAULT_MAX_RETRIES, "boom") {
            RetryDecision::Retry { new_count, .. } => assert_eq!(new_count, 3),
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn zero_budget_fails_immediately() {
        assert!(matches!(
            decide(0, 0, "boom"),
            RetryDecision::Exhausted { .. }
        ));
    }

    // -- reason text ----------------------------------------------------------

    #[test]
    fn retry_reason_is_raw_error() {
        match decide(0, DEFAULT_MAX_RETRIES, "connection refused") {
            RetryDecision::Retry { reason, .. } => {
                assert_eq!(reason, "connection refused");
            }
            other => panic!("expected retry, got {other:?}"),
        }
    }
}
