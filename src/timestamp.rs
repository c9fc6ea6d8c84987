//! Time normalization for provider timestamps and GTFS clock times.
//!
//! Both sources may encode post-midnight service with an hour field in
//! `[24, 48)`. Everything handed to the store is folded back onto the 24-hour
//! clock, with the date carried forward where there is one.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike};

use crate::error::CollectError;

/// Format of a normalized provider timestamp (offset without colon).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Normalizes and parses a provider timestamp such as
/// `2024-01-01T25:10:00-06:00`.
///
/// The hour is read from its fixed two-character field (bytes 11..13). An hour
/// of 24 or more is reduced by 24 and the date advanced by one day. A `±HH:MM`
/// offset is rewritten as `±HHMM` before parsing.
pub fn normalize_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, CollectError> {
    let bad = || CollectError::Timestamp(raw.to_string());

    let date_part = raw.get(0..10).ok_or_else(bad)?;
    if raw.get(10..11) != Some("T") {
        return Err(bad());
    }
    let hour_part = raw.get(11..13).ok_or_else(bad)?;
    if !hour_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let rest = raw.get(13..).ok_or_else(bad)?;

    let mut date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| bad())?;
    let mut hour: u32 = hour_part.parse().map_err(|_| bad())?;
    if hour >= 48 {
        return Err(bad());
    }
    if hour >= 24 {
        hour -= 24;
        date = date.succ_opt().ok_or_else(bad)?;
    }

    let rebuilt = format!("{}T{:02}{}", date.format("%Y-%m-%d"), hour, rest);
    let cleaned = strip_offset_colon(&rebuilt);

    DateTime::parse_from_str(&cleaned, TIMESTAMP_FORMAT).map_err(|_| bad())
}

/// Removes the colon from a trailing `±HH:MM` offset. Anything else is
/// returned untouched.
pub fn strip_offset_colon(ts: &str) -> String {
    let bytes = ts.as_bytes();
    let len = bytes.len();
    if len >= 6 && bytes[len - 3] == b':' && matches!(bytes[len - 6], b'+' | b'-') {
        format!("{}{}", &ts[..len - 3], &ts[len - 2..])
    } else {
        ts.to_string()
    }
}

/// Signed delay in whole seconds, rounded; positive means late.
pub fn delay_seconds(scheduled: &DateTime<FixedOffset>, expected: &DateTime<FixedOffset>) -> i64 {
    let millis = (*expected - *scheduled).num_milliseconds();
    (millis as f64 / 1000.0).round() as i64
}

/// Parses a GTFS `H:MM:SS` clock time and folds hours `>= 24` onto the
/// 24-hour clock. Returns `None` for malformed input or hours `>= 48`.
pub fn fold_gtfs_time(time_str: &str) -> Option<NaiveTime> {
    let parts: Vec<&str> = time_str.trim().split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let mut hours: u32 = parts[0].parse().ok()?;
    let minutes: u32 = parts[1].parse().ok()?;
    let seconds: u32 = parts[2].parse().ok()?;
    if hours >= 48 {
        return None;
    }
    if hours >= 24 {
        hours -= 24;
    }
    NaiveTime::from_hms_opt(hours, minutes, seconds)
}

/// `fold_gtfs_time` rendered back as `HH:MM:SS`, the form stored as a key.
pub fn normalize_gtfs_time(time_str: &str) -> Option<String> {
    fold_gtfs_time(time_str).map(|t| format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_in_range_hour_is_unchanged() {
        let ts = normalize_timestamp("2024-01-01T23:55:00-0600").unwrap();
        assert_eq!(ts.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(ts.time(), NaiveTime::from_hms_opt(23, 55, 0).unwrap());
        assert_eq!(ts.offset().local_minus_utc(), -6 * 3600);
    }

    #[test]
    fn test_overflow_hour_rolls_date_forward() {
        let ts = normalize_timestamp("2024-01-01T25:10:00-0600").unwrap();
        assert_eq!(ts.format("%Y-%m-%d").to_string(), "2024-01-02");
        assert_eq!(ts.format("%H:%M:%S").to_string(), "01:10:00");
    }

    #[test]
    fn test_every_overflow_hour_maps_to_next_day() {
        for h in 24..48u32 {
            let raw = format!("2024-02-28T{h:02}:17:42-06:00");
            let ts = normalize_timestamp(&raw).unwrap();
            assert_eq!(ts.hour(), h - 24);
            assert_eq!(ts.minute(), 17);
            assert_eq!(ts.second(), 42);
            assert_eq!(ts.date_naive(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        }
    }

    #[test]
    fn test_overflow_across_year_end() {
        let ts = normalize_timestamp("2023-12-31T24:05:00-06:00").unwrap();
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.month(), 1);
        assert_eq!(ts.day(), 1);
        assert_eq!(ts.hour(), 0);
    }

    #[test]
    fn test_colon_offset_is_accepted() {
        let a = normalize_timestamp("2024-01-01T08:00:00-06:00").unwrap();
        let b = normalize_timestamp("2024-01-01T08:00:00-0600").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_two_digit_hour_field_is_used() {
        // 34 must become 10, not be read from a single character.
        let ts = normalize_timestamp("2024-01-01T34:00:00-06:00").unwrap();
        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.day(), 2);
    }

    #[test]
    fn test_malformed_timestamps() {
        assert!(normalize_timestamp("").is_err());
        assert!(normalize_timestamp("2024-01-01").is_err());
        assert!(normalize_timestamp("2024-01-01 08:00:00-0600").is_err());
        assert!(normalize_timestamp("2024-01-01TXX:00:00-0600").is_err());
        assert!(normalize_timestamp("2024-01-01T48:00:00-0600").is_err());
    }

    #[test]
    fn test_signed_or_short_hour_field_is_rejected() {
        assert!(normalize_timestamp("2024-01-01T+1:00:00-0600").is_err());
        assert!(normalize_timestamp("2024-01-01T-1:00:00-0600").is_err());
        assert!(normalize_timestamp("2024-01-01T 1:00:00-0600").is_err());
    }

    #[test]
    fn test_strip_offset_colon() {
        assert_eq!(strip_offset_colon("2024-01-01T08:00:00+05:30"), "2024-01-01T08:00:00+0530");
        assert_eq!(strip_offset_colon("2024-01-01T08:00:00-0600"), "2024-01-01T08:00:00-0600");
        // No offset: the seconds separator must not be touched.
        assert_eq!(strip_offset_colon("2024-01-01T08:00:00"), "2024-01-01T08:00:00");
    }

    #[test]
    fn test_delay_of_identical_timestamps_is_zero() {
        let t = normalize_timestamp("2024-06-15T12:34:56-05:00").unwrap();
        assert_eq!(delay_seconds(&t, &t), 0);
    }

    #[test]
    fn test_delay_across_midnight() {
        let scheduled = normalize_timestamp("2024-01-01T23:55:00-0600").unwrap();
        let expected = normalize_timestamp("2024-01-02T00:01:10-0600").unwrap();
        assert_eq!(delay_seconds(&scheduled, &expected), 370);
    }

    #[test]
    fn test_early_arrival_is_negative() {
        let scheduled = normalize_timestamp("2024-01-01T10:00:00-0600").unwrap();
        let expected = normalize_timestamp("2024-01-01T09:58:30-0600").unwrap();
        assert_eq!(delay_seconds(&scheduled, &expected), -90);
    }

    #[test]
    fn test_both_timestamps_overflow_independently() {
        let scheduled = normalize_timestamp("2024-01-01T24:50:00-06:00").unwrap();
        let expected = normalize_timestamp("2024-01-01T25:02:00-06:00").unwrap();
        assert_eq!(delay_seconds(&scheduled, &expected), 12 * 60);
    }

    #[test]
    fn test_fold_gtfs_time() {
        assert_eq!(fold_gtfs_time("23:55:00"), NaiveTime::from_hms_opt(23, 55, 0));
        assert_eq!(fold_gtfs_time("25:10:00"), NaiveTime::from_hms_opt(1, 10, 0));
        assert_eq!(fold_gtfs_time(" 7:05:00"), NaiveTime::from_hms_opt(7, 5, 0));
        assert_eq!(fold_gtfs_time("48:00:00"), None);
        assert_eq!(fold_gtfs_time("12:00"), None);
        assert_eq!(fold_gtfs_time("ab:00:00"), None);
    }

    #[test]
    fn test_normalize_gtfs_time_pads() {
        assert_eq!(normalize_gtfs_time("7:05:00").as_deref(), Some("07:05:00"));
        assert_eq!(normalize_gtfs_time("26:00:09").as_deref(), Some("02:00:09"));
    }
}
