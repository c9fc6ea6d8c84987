//! Error taxonomy for a collection run.
//!
//! Only [`CollectError::QuotaExceeded`] and [`CollectError::Configuration`]
//! escape a single stop; everything else is logged and the run moves on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    /// Static schedule data is missing or unreadable. Fatal before any request.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The provider reported its hourly request limit as reached.
    #[error("Hourly request limit reached")]
    QuotaExceeded,
    /// The provider has no service at the queried stop right now.
    #[error("Stop '{0}' not found")]
    NotFound(String),
    /// Connectivity or decode failure for one request.
    #[error("Network error: {0}")]
    Network(String),
    #[error("Provider returned status {code}: {msg}")]
    Provider { code: u16, msg: String },
    #[error("Malformed timestamp '{0}'")]
    Timestamp(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Creating a table the write depends on failed.
    #[error("Schema error: {0}")]
    Schema(#[source] sqlx::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("cannot find GTFS directory '{0}'")]
    MissingDirectory(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<ScheduleError> for CollectError {
    fn from(err: ScheduleError) -> Self {
        CollectError::Configuration(err.to_string())
    }
}

impl CollectError {
    /// Returns `true` for errors that must end the whole batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CollectError::QuotaExceeded | CollectError::Configuration(_))
    }
}
