//! Turns one `getdeparturesbystop` response into delay measurements.

use tracing::{debug, error, warn};

use crate::error::CollectError;
use crate::services::transit_api::{Departure, DeparturesResponse};
use crate::timestamp::{delay_seconds, normalize_timestamp};

const STATUS_QUOTA_EXCEEDED: u16 = 403;
const STATUS_NOT_FOUND: u16 = 404;

/// What a measured delay is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelaySubject {
    /// A published trip; the measurement updates its stop time.
    Scheduled { trip_id: String },
    /// Extra service with no published trip; the measurement is appended.
    Unscheduled { route_id: String },
}

/// A single delay measurement, in provider-local time on the 24-hour clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayRecord {
    /// `YYYY-MM-DD`
    pub arrival_date: String,
    /// `HH:MM:SS`
    pub arrival_time: String,
    /// Positive is late.
    pub delay_seconds: i64,
    pub subject: DelaySubject,
}

/// Records parsed from one response. `skipped` counts entries that could not
/// be turned into a record.
#[derive(Debug, Default)]
pub struct ParsedDepartures {
    pub records: Vec<DelayRecord>,
    pub skipped: usize,
}

/// Classifies the response and parses every departure in it.
///
/// # Errors
///
/// * [`CollectError::QuotaExceeded`] for status 403 without departures.
/// * [`CollectError::NotFound`] for status 404 without departures.
/// * [`CollectError::Provider`] for any other status without departures.
pub fn parse_departures(
    stop_id: &str,
    response: &DeparturesResponse,
) -> Result<ParsedDepartures, CollectError> {
    let Some(departures) = &response.departures else {
        return Err(classify_status(stop_id, response));
    };

    let mut parsed = ParsedDepartures::default();
    for departure in departures {
        match parse_departure(departure, response) {
            Ok(record) => {
                debug!(
                    stop_id,
                    arrival_date = %record.arrival_date,
                    arrival_time = %record.arrival_time,
                    delay = record.delay_seconds,
                    "Departure parsed"
                );
                parsed.records.push(record);
            }
            Err(e) => {
                warn!(stop_id, error = %e, "Skipping departure");
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}

fn classify_status(stop_id: &str, response: &DeparturesResponse) -> CollectError {
    match response.status.code {
        STATUS_QUOTA_EXCEEDED => {
            error!(stop_id, "Request limit per hour reached, halting collection");
            CollectError::QuotaExceeded
        }
        STATUS_NOT_FOUND => {
            warn!(stop_id, "Stop not found");
            CollectError::NotFound(stop_id.to_string())
        }
        code => {
            error!(stop_id, code, msg = %response.status.msg, "Unexpected provider status");
            CollectError::Provider {
                code,
                msg: response.status.msg.clone(),
            }
        }
    }
}

/// Normalizes both timestamps and measures the delay of one departure.
pub fn parse_departure(
    departure: &Departure,
    response: &DeparturesResponse,
) -> Result<DelayRecord, CollectError> {
    let subject = if departure.is_scheduled {
        let trip = departure
            .trip
            .as_ref()
            .ok_or_else(|| CollectError::Provider {
                code: response.status.code,
                msg: "scheduled departure without trip".into(),
            })?;
        DelaySubject::Scheduled {
            trip_id: trip.trip_id.clone(),
        }
    } else {
        let route = departure
            .route
            .as_ref()
            .or(response.route.as_ref())
            .ok_or_else(|| CollectError::Provider {
                code: response.status.code,
                msg: "unscheduled departure without route".into(),
            })?;
        DelaySubject::Unscheduled {
            route_id: route.route_id.clone(),
        }
    };

    let scheduled = normalize_timestamp(&departure.scheduled)?;
    let expected = normalize_timestamp(&departure.expected)?;

    Ok(DelayRecord {
        arrival_date: scheduled.format("%Y-%m-%d").to_string(),
        arrival_time: scheduled.format("%H:%M:%S").to_string(),
        delay_seconds: delay_seconds(&scheduled, &expected),
        subject,
    })
}
