//! Time-of-day and weekday arithmetic for recurring time slots (PRD-21).
//!
//! Slot boundaries travel as zero-padded `HH:MM` strings so that the database
//! can compare them lexicographically; this module is the single place that
//! parses and validates them. Weekdays are `0 = Sunday .. 6 = Saturday`,
//! matching both PostgreSQL's `EXTRACT(DOW)` and
//! `chrono::Weekday::num_days_from_sunday`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

use crate::error::CoreError;

/// Lowest valid weekday value (Sunday).
pub const WEEKDAY_MIN: i16 = 0;

/// Highest valid weekday value (Saturday).
pub const WEEKDAY_MAX: i16 = 6;

// ---------------------------------------------------------------------------
// Parsing & validation
// ---------------------------------------------------------------------------

/// Parse a zero-padded `HH:MM` string into a [`NaiveTime`].
///
/// Rejects anything that is not exactly five characters with a `:` separator,
/// so `9:30`, `09:30:00`, and `09.30` all fail. Zero-padding is required
/// because slot boundaries are compared as text in SQL.
pub fn parse_hhmm(value: &str) -> Result<NaiveTime, CoreError> {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(CoreError::Validation(format!(
            "Time must be zero-padded HH:MM, got \"{value}\""
        )));
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| CoreError::Validation(format!("Invalid time of day: \"{value}\"")))
}

/// Validate a slot window: both boundaries parse and `start < end`.
pub fn validate_time_range(start: &str, end: &str) -> Result<(), CoreError> {
    let start_t = parse_hhmm(start)?;
    let end_t = parse_hhmm(end)?;
    if start_t >= end_t {
        return Err(CoreError::Validation(format!(
            "Slot start {start} must be before end {end}"
        )));
    }
    Ok(())
}

/// Validate a weekday set: non-empty, every value in `0..=6`, no duplicates.
pub fn validate_weekdays(weekdays: &[i16]) -> Result<(), CoreError> {
    if weekdays.is_empty() {
        return Err(CoreError::Validation(
            "A time slot must cover at least one weekday".to_string(),
        ));
    }
    let mut seen = [false; 7];
    for &day in weekdays {
        if !(WEEKDAY_MIN..=WEEKDAY_MAX).contains(&day) {
            return Err(CoreError::Validation(format!(
                "Weekday {day} is outside 0..=6"
            )));
        }
        if seen[day as usize] {
            return Err(CoreError::Validation(format!("Duplicate weekday {day}")));
        }
        seen[day as usize] = true;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Calendar helpers
// ---------------------------------------------------------------------------

/// Weekday of a calendar date, `0 = Sunday`.
pub fn weekday_of(date: NaiveDate) -> i16 {
    date.weekday().num_days_from_sunday() as i16
}

/// Derive the concrete UTC instant a schedule fires at: the scheduled date
/// combined with the slot's start time. Computed once at schedule creation
/// and persisted, never re-derived.
pub fn slot_datetime(date: NaiveDate, start: NaiveTime) -> DateTime<Utc> {
    date.and_time(start).and_utc()
}

// ---------------------------------------------------------------------------
// Interval predicates
// ---------------------------------------------------------------------------

/// Half-open interval overlap: `[a_start, a_end)` intersects `[b_start, b_end)`.
///
/// Touching intervals (one ends exactly where the other starts) do NOT
/// overlap.
pub fn ranges_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Inclusive sweep-window test: is `t` within `[start, end]`?
///
/// The main sweep deliberately includes both boundaries so a schedule whose
/// slot ends at 11:00 is still picked up by the 11:00 tick.
pub fn window_contains(start: NaiveTime, end: NaiveTime, t: NaiveTime) -> bool {
    start <= t && t <= end
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn t(value: &str) -> NaiveTime {
        parse_hhmm(value).unwrap()
    }

    // -- parse_hhmm -----------------------------------------------------------

    #[test]
    fn parses_zero_padded_time() {
        assert_eq!(t("09:30"), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    }

    #[test]
    fn parses_midnight_and_late_evening() {
        assert_eq!(t("00:00"), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert_eq!(t("23:59"), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
    }

    #[test]
    fn rejects_unpadded_time() {
        assert!(parse_hhmm("9:30").is_err());
    }

    #[test]
    fn rejects_seconds_suffix() {
        assert!(parse_hhmm("09:30:00").is_err());
    }

    #[test]
    fn rejects_out_of_range_hour() {
        assert!(parse_hhmm("24:00").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_hhmm("banana").is_err());
        assert!(parse_hhmm("").is_err());
    }

    // -- validate_time_range --------------------------------------------------

    #[test]
    fn valid_range_accepted() {
        assert!(validate_time_range("09:00", "11:00").is_ok());
    }

    #[test]
    fn empty_range_rejected() {
        assert!(validate_time_range("09:00", "09:00").is_err());
    }

    #[test]
    fn inverted_range_rejected() {
        assert!(validate_time_range("11:00", "09:00").is_err());
    }

    // -- validate_weekdays ----------------------------------------------------

    #[test]
    fn valid_weekday_set() {
        assert!(validate_weekdays(&[1, 3, 5]).is_ok());
    }

    #[test]
    fn full_week_accepted() {
        assert!(validate_weekdays(&[0, 1, 2, 3, 4, 5, 6]).is_ok());
    }

    #[test]
    fn empty_weekday_set_rejected() {
        assert!(validate_weekdays(&[]).is_err());
    }

    #[test]
    fn out_of_range_weekday_rejected() {
        assert!(validate_weekdays(&[7]).is_err());
        assert!(validate_weekdays(&[-1]).is_err());
    }

    #[test]
    fn duplicate_weekday_rejected() {
        assert!(validate_weekdays(&[1, 1]).is_err());
    }

    // -- weekday_of / slot_datetime -------------------------------------------

    #[test]
    fn weekday_of_known_dates() {
        // 2025-06-01 was a Sunday, 2025-06-02 a Monday.
        assert_eq!(weekday_of(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()), 0);
        assert_eq!(weekday_of(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()), 1);
        assert_eq!(weekday_of(NaiveDate::from_ymd_opt(2025, 6, 7).unwrap()), 6);
    }

    #[test]
    fn slot_datetime_combines_date_and_start() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let dt = slot_datetime(date, t("09:00"));
        assert_eq!(dt.to_rfc3339(), "2025-06-02T09:00:00+00:00");
    }

    // -- ranges_overlap -------------------------------------------------------

    #[test]
    fn overlapping_ranges_detected() {
        // [09:00,11:00) vs [10:00,12:00) overlap.
        assert!(ranges_overlap(t("09:00"), t("11:00"), t("10:00"), t("12:00")));
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        // [09:00,11:00) vs [11:00,12:00): end-exclusive, no overlap.
        assert!(!ranges_overlap(t("09:00"), t("11:00"), t("11:00"), t("12:00")));
    }

    #[test]
    fn contained_range_overlaps() {
        assert!(ranges_overlap(t("09:00"), t("17:00"), t("10:00"), t("11:00")));
    }

    #[test]
    fn disjoint_ranges_do_not_overlap() {
        assert!(!ranges_overlap(t("09:00"), t("10:00"), t("14:00"), t("15:00")));
    }

    #[test]
    fn overlap_is_symmetric() {
        assert!(ranges_overlap(t("10:00"), t("12:00"), t("09:00"), t("11:00")));
    }

    // -- window_contains ------------------------------------------------------

    #[test]
    fn window_includes_both_boundaries() {
        assert!(window_contains(t("09:00"), t("11:00"), t("09:00")));
        assert!(window_contains(t("09:00"), t("11:00"), t("11:00")));
    }

    #[test]
    fn window_includes_interior() {
        assert!(window_contains(t("09:00"), t("11:00"), t("10:00")));
    }

    #[test]
    fn window_excludes_outside() {
        assert!(!window_contains(t("09:00"), t("11:00"), t("08:59")));
        assert!(!window_contains(t("09:00"), t("11:00"), t("11:01")));
    }
}
