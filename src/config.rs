//! Collector settings.
//!
//! Defaults can be overridden by an optional JSON file and then by CLI flags.
//! The API key is never stored here; it comes from `CUMTD_API_KEY`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::CollectError;
use crate::infra::cumtd::DEFAULT_BASE_URL;

pub const API_KEY_VAR: &str = "CUMTD_API_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Directory holding `trips.txt` and `stop_times.txt`.
    pub gtfs_dir: PathBuf,
    /// SQLite database file.
    pub database: PathBuf,
    /// Lookahead for the stop filter and the `pt` request parameter.
    pub window_minutes: u32,
    /// Pause after each successful request.
    pub delay_secs: u64,
    /// Provider time zone, used for the stop filter's wall clock.
    pub timezone: String,
    pub base_url: String,
    /// Runs per invocation; 0 repeats forever.
    pub num_runs: usize,
    /// Wait between runs.
    pub run_interval_secs: u64,
    /// Append each run's summary to this CSV when set.
    pub summary_csv: Option<PathBuf>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            gtfs_dir: PathBuf::from("google_transit"),
            database: PathBuf::from("stop_times.db"),
            window_minutes: 60,
            delay_secs: 3,
            timezone: "America/Chicago".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            num_runs: 1,
            run_interval_secs: 600,
            summary_csv: None,
        }
    }
}

impl CollectorConfig {
    /// Reads a JSON config file; missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, CollectError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CollectError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            CollectError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn tz(&self) -> Result<Tz, CollectError> {
        self.timezone
            .parse()
            .map_err(|_| CollectError::Configuration(format!("unknown time zone '{}'", self.timezone)))
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn run_interval(&self) -> Duration {
        Duration::from_secs(self.run_interval_secs)
    }
}

/// Reads the API key from the environment (after `.env` has been loaded).
pub fn api_key_from_env() -> Result<String, CollectError> {
    match std::env::var(API_KEY_VAR) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(CollectError::Configuration(format!("{API_KEY_VAR} must be set"))),
    }
}
