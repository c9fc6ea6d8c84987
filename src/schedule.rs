//! Static GTFS schedule, loaded once per process and read-only afterwards.
//!
//! Only `trips.txt` (trip → route) and `stop_times.txt` are needed. The
//! resulting [`StaticSchedule`] is passed by reference to the stop filter and
//! the store bootstrap.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveTime;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ScheduleError;
use crate::timestamp::fold_gtfs_time;

/// One row of `trips.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct Trip {
    pub trip_id: String,
    pub route_id: String,
}

/// One row of `stop_times.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct StopTime {
    pub trip_id: String,
    pub arrival_time: String,
    pub stop_id: String,
    pub stop_sequence: i64,
}

/// A stop time joined with its trip's route.
///
/// `arrival_time` is kept exactly as published, so hours may exceed 23.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledStopTime {
    pub trip_id: String,
    pub arrival_time: String,
    pub stop_id: String,
    pub stop_sequence: i64,
    pub route_id: String,
}

#[derive(Debug, Default)]
pub struct StaticSchedule {
    stop_times: Vec<ScheduledStopTime>,
    /// base stop id -> folded arrival times, sorted
    arrivals_by_stop: HashMap<String, Vec<NaiveTime>>,
}

impl StaticSchedule {
    /// Reads `trips.txt` and `stop_times.txt` from a GTFS directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::MissingDirectory`] if `dir` does not exist, and
    /// IO/CSV errors if either file is missing or malformed.
    #[tracing::instrument(skip(dir), fields(dir = %dir.display()))]
    pub fn load(dir: &Path) -> Result<Self, ScheduleError> {
        if !dir.is_dir() {
            return Err(ScheduleError::MissingDirectory(dir.display().to_string()));
        }

        let trips: Vec<Trip> = read_table(&dir.join("trips.txt"))?;
        let stop_times: Vec<StopTime> = read_table(&dir.join("stop_times.txt"))?;
        info!(trips = trips.len(), stop_times = stop_times.len(), "Static schedule read");

        Ok(Self::new(trips, stop_times))
    }

    /// Joins stop times to their trips' routes and indexes arrivals by stop.
    /// Stop times referencing an unknown trip are dropped.
    pub fn new(trips: Vec<Trip>, stop_times: Vec<StopTime>) -> Self {
        let routes_by_trip: HashMap<String, String> = trips
            .into_iter()
            .map(|t| (t.trip_id, t.route_id))
            .collect();

        let mut joined = Vec::with_capacity(stop_times.len());
        let mut arrivals_by_stop: HashMap<String, Vec<NaiveTime>> = HashMap::new();
        let mut orphaned = 0usize;

        for st in stop_times {
            let Some(route_id) = routes_by_trip.get(&st.trip_id) else {
                orphaned += 1;
                continue;
            };
            if let Some(time) = fold_gtfs_time(&st.arrival_time) {
                arrivals_by_stop
                    .entry(base_stop_id(&st.stop_id).to_string())
                    .or_default()
                    .push(time);
            }
            joined.push(ScheduledStopTime {
                route_id: route_id.clone(),
                trip_id: st.trip_id,
                arrival_time: st.arrival_time,
                stop_id: st.stop_id,
                stop_sequence: st.stop_sequence,
            });
        }
        if orphaned > 0 {
            warn!(orphaned, "Skipped stop_times.txt rows with unknown trip_id");
        }

        for times in arrivals_by_stop.values_mut() {
            times.sort();
        }

        Self {
            stop_times: joined,
            arrivals_by_stop,
        }
    }

    pub fn stop_times(&self) -> &[ScheduledStopTime] {
        &self.stop_times
    }

    /// Folded arrival times at a base stop id and all of its `:N` points.
    pub fn arrivals_at(&self, base_stop: &str) -> &[NaiveTime] {
        self.arrivals_by_stop
            .get(base_stop)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct base stop ids, sorted.
    pub fn candidate_stop_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.arrivals_by_stop.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Strips a specific-stop suffix: `IT:1` becomes `IT`. Ids without an
/// all-digit suffix are returned unchanged.
pub fn base_stop_id(stop_id: &str) -> &str {
    match stop_id.rsplit_once(':') {
        Some((base, suffix))
            if !base.is_empty() && !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => stop_id,
    }
}

fn read_table<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, ScheduleError> {
    let file = File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}
