use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::poller::PollTotals;

/// Aggregate result of one collection run, also the row format of the
/// optional run-summary CSV.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,
    pub candidate_stops: usize,
    pub eligible_stops: usize,
    pub stops_queried: usize,
    pub departures_logged: usize,
    pub elapsed_secs: f64,
    pub quota_exhausted: bool,
}

impl RunSummary {
    pub fn new(
        candidate_stops: usize,
        eligible_stops: usize,
        totals: &PollTotals,
        elapsed: std::time::Duration,
    ) -> Self {
        RunSummary {
            timestamp: Utc::now(),
            candidate_stops,
            eligible_stops,
            stops_queried: totals.stops_queried,
            departures_logged: totals.departures_logged,
            elapsed_secs: elapsed.as_secs_f64(),
            quota_exhausted: totals.quota_exhausted,
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of eligible stops that were actually queried.
    pub fn queried_pct(&self) -> f64 {
        Self::pct(self.stops_queried, self.eligible_stops)
    }

    /// Share of all stops that passed the filter.
    pub fn eligible_pct(&self) -> f64 {
        Self::pct(self.eligible_stops, self.candidate_stops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(RunSummary::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(RunSummary::pct(50, 100), 50.0);
        assert_eq!(RunSummary::pct(1, 4), 25.0);
    }

    #[test]
    fn test_new_copies_totals() {
        let totals = PollTotals {
            stops_queried: 3,
            departures_logged: 17,
            quota_exhausted: true,
        };
        let summary = RunSummary::new(100, 4, &totals, Duration::from_millis(1500));

        assert_eq!(summary.candidate_stops, 100);
        assert_eq!(summary.eligible_stops, 4);
        assert_eq!(summary.stops_queried, 3);
        assert_eq!(summary.departures_logged, 17);
        assert!(summary.quota_exhausted);
        assert_eq!(summary.elapsed_secs, 1.5);
        assert_eq!(summary.queried_pct(), 75.0);
        assert_eq!(summary.eligible_pct(), 4.0);
    }
}
