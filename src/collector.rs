//! One collection run: filter stops, poll them, persist, summarize.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::error::CollectError;
use crate::filter::{Clock, StopFilter};
use crate::gate::RateGate;
use crate::poller::Poller;
use crate::schedule::StaticSchedule;
use crate::services::transit_api::TransitApi;
use crate::stats::RunSummary;
use crate::store::DelayStore;

/// Loads the static schedule and prepares the store.
///
/// # Errors
///
/// [`CollectError::Configuration`] if the GTFS directory or its files cannot
/// be read, [`CollectError::Store`] if the store cannot be created or seeded.
#[tracing::instrument(skip_all, fields(gtfs_dir = %gtfs_dir.display(), database = %database.display()))]
pub async fn bootstrap(
    gtfs_dir: &Path,
    database: &Path,
) -> Result<(StaticSchedule, DelayStore), CollectError> {
    let schedule = StaticSchedule::load(gtfs_dir)?;

    let store = DelayStore::new(database);
    store.ensure_schema().await?;
    store.seed_stop_times(&schedule).await?;

    Ok((schedule, store))
}

/// Immutable context shared by every run of a process.
pub struct Collector<'a> {
    schedule: &'a StaticSchedule,
    store: &'a DelayStore,
    window_minutes: u32,
}

impl<'a> Collector<'a> {
    pub fn new(schedule: &'a StaticSchedule, store: &'a DelayStore, window_minutes: u32) -> Self {
        Self {
            schedule,
            store,
            window_minutes,
        }
    }

    /// Runs one batch. Quota exhaustion ends the batch early but is reported in
    /// the summary rather than as an error.
    #[tracing::instrument(skip_all, fields(window_minutes = self.window_minutes))]
    pub async fn run<A, G, K>(&self, api: &A, gate: G, clock: &K) -> RunSummary
    where
        A: TransitApi,
        G: RateGate,
        K: Clock,
    {
        let start = Instant::now();
        info!("Starting data collection");

        let candidates = self.schedule.candidate_stop_ids();
        let now = clock.time_of_day();
        let eligible =
            StopFilter::new(self.schedule).collect_available(&candidates, self.window_minutes, now);
        info!(
            eligible = eligible.len(),
            candidates = candidates.len(),
            window_minutes = self.window_minutes,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Stops with a departure in the window"
        );

        let mut poller = Poller::new(api, self.store, gate, self.window_minutes);
        let totals = poller.poll_all(&eligible).await;

        let summary = RunSummary::new(candidates.len(), eligible.len(), &totals, start.elapsed());
        if summary.quota_exhausted {
            info!(
                stops_queried = summary.stops_queried,
                "Collection halted by request quota"
            );
        }
        info!(
            stops_queried = summary.stops_queried,
            departures_logged = summary.departures_logged,
            eligible_pct = summary.eligible_pct(),
            queried_pct = summary.queried_pct(),
            elapsed_secs = summary.elapsed_secs,
            "Finished collecting data"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap_without_gtfs_is_configuration_error() {
        let db = std::env::temp_dir().join(format!(
            "stop_delay_collector_bootstrap_{}.db",
            std::process::id()
        ));
        let result = bootstrap(Path::new("/nonexistent/google_transit"), &db).await;

        assert!(matches!(result, Err(CollectError::Configuration(_))));
        // Nothing is created when the schedule is missing.
        assert!(!db.exists());
    }
}
