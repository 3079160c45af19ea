//! Schedule lifecycle state machine (PRD-21).
//!
//! This module lives in `core` (zero internal deps) so it can be used by both
//! the repository layer and the scheduler without pulling in sqlx.

/// Schedule status IDs matching `schedule_statuses` seed data (1-based
/// SMALLSERIAL).
///
/// Intentionally duplicated from the `db` crate's `ScheduleStatus` enum
/// because `core` must have zero internal deps.
pub mod state_machine {
    /// Returns the set of valid target status IDs reachable from `from_status`.
    ///
    /// `Completed` (3) and `Cancelled` (5) are terminal and return an empty
    /// slice. `Failed` (4) keeps its outgoing edges here; whether a retry is
    /// actually allowed depends on the retry budget, which the retry policy
    /// enforces, not this table.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // Scheduled -> Running, Cancelled
            1 => &[2, 5],
            // Running -> Completed, Failed
            2 => &[3, 4],
            // Failed -> Running (retry), Cancelled
            4 => &[2, 5],
            // Terminal states: Completed, Cancelled
            3 | 5 => &[],
            // Unknown status: no transitions allowed
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            let from_name = status_name(from);
            let to_name = status_name(to);
            Err(format!(
                "Invalid transition: {from_name} ({from}) -> {to_name} ({to})"
            ))
        }
    }

    /// Human-readable name for a status ID (for error messages).
    fn status_name(id: i16) -> &'static str {
        match id {
            1 => "Scheduled",
            2 => "Running",
            3 => "Completed",
            4 => "Failed",
            5 => "Cancelled",
            _ => "Unknown",
        }
    }
}
