//! Sequential, rate-governed polling of eligible stops.

use tracing::{error, info, warn};

use crate::error::CollectError;
use crate::gate::RateGate;
use crate::parser::parse_departures;
use crate::services::transit_api::TransitApi;
use crate::store::DelayStore;

/// Running totals for one pass over the eligible stops.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollTotals {
    /// Stops whose response carried a departures list.
    pub stops_queried: usize,
    pub departures_logged: usize,
    /// Set when the provider's hourly quota ended the pass early.
    pub quota_exhausted: bool,
}

pub struct Poller<'a, A, G> {
    api: &'a A,
    store: &'a DelayStore,
    gate: G,
    lookahead_minutes: u32,
}

impl<'a, A: TransitApi, G: RateGate> Poller<'a, A, G> {
    pub fn new(api: &'a A, store: &'a DelayStore, gate: G, lookahead_minutes: u32) -> Self {
        Self {
            api,
            store,
            gate,
            lookahead_minutes,
        }
    }

    /// Requests, parses and persists departures for one stop.
    ///
    /// Returns the number of departures logged. A record that fails to persist
    /// is logged and not counted; it does not fail the stop.
    #[tracing::instrument(skip(self))]
    pub async fn poll_stop(&self, stop_id: &str) -> Result<usize, CollectError> {
        let response = self
            .api
            .departures_by_stop(stop_id, self.lookahead_minutes)
            .await
            .map_err(|e| CollectError::Network(format!("{e:#}")))?;

        let parsed = parse_departures(stop_id, &response)?;

        let mut logged = 0usize;
        for record in &parsed.records {
            match self.store.write_delay(record).await {
                Ok(_) => logged += 1,
                Err(e) => error!(
                    stop_id,
                    arrival_date = %record.arrival_date,
                    arrival_time = %record.arrival_time,
                    error = %e,
                    "Failed to persist delay"
                ),
            }
        }

        let echoed = response.requested_stop_id().unwrap_or(stop_id).to_uppercase();
        info!(stop = %echoed, departures_logged = logged, skipped = parsed.skipped, "Finished logging stop");
        Ok(logged)
    }

    /// Polls `stop_ids` in order, one request at a time.
    ///
    /// The gate is paused after each successful stop. A quota error stops the
    /// pass immediately; every other failure is logged and the next stop is
    /// tried without pausing.
    pub async fn poll_all(&mut self, stop_ids: &[String]) -> PollTotals {
        let mut totals = PollTotals::default();

        for stop_id in stop_ids {
            match self.poll_stop(stop_id).await {
                Ok(logged) => {
                    totals.stops_queried += 1;
                    totals.departures_logged += logged;
                    self.gate.pause().await;
                }
                Err(e) if e.is_fatal() => {
                    totals.quota_exhausted = matches!(e, CollectError::QuotaExceeded);
                    warn!(stop_id = %stop_id, error = %e, "Ending pass early");
                    break;
                }
                Err(CollectError::NotFound(_)) => {}
                Err(e @ CollectError::Network(_)) => {
                    error!(stop_id = %stop_id, error = %e, "Request failed");
                }
                Err(e) => {
                    warn!(stop_id = %stop_id, error = %e, "Stop skipped");
                }
            }
        }

        totals
    }
}
