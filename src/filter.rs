//! Stop filter: skip stops with no scheduled arrival in the lookahead window.

use chrono::{NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::schedule::{StaticSchedule, base_stop_id};

/// Source of the provider-local wall-clock time of day.
pub trait Clock {
    fn time_of_day(&self) -> NaiveTime;
}

/// Reads the system clock in the provider's time zone.
pub struct ProviderClock {
    pub tz: Tz,
}

impl Clock for ProviderClock {
    fn time_of_day(&self) -> NaiveTime {
        Utc::now().with_timezone(&self.tz).time()
    }
}

/// Decides whether a stop has an imminent scheduled arrival.
pub struct StopFilter<'a> {
    schedule: &'a StaticSchedule,
}

impl<'a> StopFilter<'a> {
    pub fn new(schedule: &'a StaticSchedule) -> Self {
        Self { schedule }
    }

    /// `true` iff some arrival at `stop_id` (or any `stop_id:N`) falls strictly
    /// between `now` and `now + window_minutes`.
    ///
    /// The window wraps past midnight, so an arrival at `00:10` is seen from
    /// `23:55`.
    pub fn is_available(&self, stop_id: &str, window_minutes: u32, now: NaiveTime) -> bool {
        let window = TimeDelta::minutes(i64::from(window_minutes));
        let available = self
            .schedule
            .arrivals_at(base_stop_id(stop_id))
            .iter()
            .any(|arrival| {
                let ahead = time_until(now, *arrival);
                ahead > TimeDelta::zero() && ahead < window
            });

        if available {
            debug!(stop_id, window_minutes, "Stop has an arrival within the window");
        } else {
            debug!(stop_id, window_minutes, "Stop has no arrival within the window");
        }
        available
    }

    /// Keeps the stops passing [`is_available`](Self::is_available), in input order.
    pub fn collect_available<S: AsRef<str>>(
        &self,
        stop_ids: &[S],
        window_minutes: u32,
        now: NaiveTime,
    ) -> Vec<String> {
        stop_ids
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| self.is_available(id, window_minutes, now))
            .map(str::to_string)
            .collect()
    }
}

/// Time from `now` forward to the next occurrence of `target`, in `[0, 24h)`.
fn time_until(now: NaiveTime, target: NaiveTime) -> TimeDelta {
    let diff = target.signed_duration_since(now);
    if diff < TimeDelta::zero() {
        diff + TimeDelta::days(1)
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{StopTime, Trip};

    fn schedule_with(arrivals: &[(&str, &str)]) -> StaticSchedule {
        let stop_times = arrivals
            .iter()
            .enumerate()
            .map(|(i, (stop, time))| StopTime {
                trip_id: "T1".into(),
                arrival_time: time.to_string(),
                stop_id: stop.to_string(),
                stop_sequence: i as i64 + 1,
            })
            .collect();
        StaticSchedule::new(
            vec![Trip {
                trip_id: "T1".into(),
                route_id: "R1".into(),
            }],
            stop_times,
        )
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_arrival_thirty_minutes_out() {
        let schedule = schedule_with(&[("S1", "10:30:00")]);
        let filter = StopFilter::new(&schedule);

        assert!(filter.is_available("S1", 60, at(10, 0)));
        assert!(!filter.is_available("S1", 20, at(10, 0)));
    }

    #[test]
    fn test_window_bounds_are_exclusive() {
        let schedule = schedule_with(&[("S1", "10:30:00")]);
        let filter = StopFilter::new(&schedule);

        // Arriving right now is not "ahead".
        assert!(!filter.is_available("S1", 60, at(10, 30)));
        // Exactly at the window edge is excluded.
        assert!(!filter.is_available("S1", 30, at(10, 0)));
        assert!(filter.is_available("S1", 31, at(10, 0)));
    }

    #[test]
    fn test_past_arrival_is_not_available() {
        let schedule = schedule_with(&[("S1", "09:45:00")]);
        let filter = StopFilter::new(&schedule);
        assert!(!filter.is_available("S1", 60, at(10, 0)));
    }

    #[test]
    fn test_specific_stop_points_count_for_base_stop() {
        let schedule = schedule_with(&[("S1:2", "10:10:00")]);
        let filter = StopFilter::new(&schedule);

        assert!(filter.is_available("S1", 60, at(10, 0)));
        assert!(filter.is_available("S1:1", 60, at(10, 0)));
        assert!(!filter.is_available("S2", 60, at(10, 0)));
    }

    #[test]
    fn test_overflow_hours_fold_onto_clock() {
        let schedule = schedule_with(&[("S1", "24:20:00")]);
        let filter = StopFilter::new(&schedule);
        assert!(filter.is_available("S1", 60, at(0, 5)));
    }

    #[test]
    fn test_window_wraps_past_midnight() {
        let schedule = schedule_with(&[("S1", "00:10:00")]);
        let filter = StopFilter::new(&schedule);
        assert!(filter.is_available("S1", 60, at(23, 55)));
    }

    #[test]
    fn test_collect_available_preserves_order() {
        let schedule = schedule_with(&[
            ("C", "10:05:00"),
            ("A", "10:15:00"),
            ("B", "13:00:00"),
        ]);
        let filter = StopFilter::new(&schedule);

        let eligible = filter.collect_available(&["C", "B", "A"], 60, at(10, 0));
        assert_eq!(eligible, vec!["C".to_string(), "A".to_string()]);
    }
}
