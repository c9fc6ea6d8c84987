//! Trait and payload types for the real-time transit API.

use anyhow::Result;
use serde::Deserialize;

/// `status` block present on every response.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub code: u16,
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripRef {
    pub trip_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteRef {
    pub route_id: String,
}

/// One entry of a `getdeparturesbystop` response.
///
/// `scheduled` and `expected` are kept raw: their hour field may run past 23.
#[derive(Debug, Clone, Deserialize)]
pub struct Departure {
    pub is_scheduled: bool,
    pub scheduled: String,
    pub expected: String,
    #[serde(default)]
    pub trip: Option<TripRef>,
    #[serde(default)]
    pub route: Option<RouteRef>,
    #[serde(default)]
    pub stop_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestParams {
    #[serde(default)]
    pub stop_id: Option<String>,
}

/// Echo of the request, `rqst` in the payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestEcho {
    #[serde(default)]
    pub params: RequestParams,
}

/// A `getdeparturesbystop` response. `departures` is absent when the provider
/// reports an error in `status`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeparturesResponse {
    pub status: Status,
    #[serde(default)]
    pub departures: Option<Vec<Departure>>,
    #[serde(default)]
    pub rqst: Option<RequestEcho>,
    #[serde(default)]
    pub route: Option<RouteRef>,
}

impl DeparturesResponse {
    /// Stop id echoed back by the provider, if any.
    pub fn requested_stop_id(&self) -> Option<&str> {
        self.rqst.as_ref()?.params.stop_id.as_deref()
    }
}

/// A boarding point of a stop, `stop_points` in `getstops`.
#[derive(Debug, Clone, Deserialize)]
pub struct StopPoint {
    pub stop_id: String,
    #[serde(default)]
    pub stop_name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub stop_lat: Option<f64>,
    #[serde(default)]
    pub stop_lon: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stop {
    pub stop_id: String,
    #[serde(default)]
    pub stop_name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub stop_points: Vec<StopPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopsResponse {
    pub status: Status,
    #[serde(default)]
    pub stops: Vec<Stop>,
}

/// Abstraction over the real-time provider.
///
/// Errors are transport or decode failures only; provider-level failures
/// (quota, unknown stop) arrive as a successful response carrying `status`.
#[async_trait::async_trait]
pub trait TransitApi: Send + Sync {
    /// Departures at `stop_id` within the next `lookahead_minutes`.
    async fn departures_by_stop(
        &self,
        stop_id: &str,
        lookahead_minutes: u32,
    ) -> Result<DeparturesResponse>;

    /// Every stop the provider knows about, with its boarding points.
    async fn all_stops(&self) -> Result<StopsResponse>;
}
