use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;

use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_json};
use crate::services::transit_api::{DeparturesResponse, StopsResponse, TransitApi};

pub const DEFAULT_BASE_URL: &str = "https://developer.cumtd.com/api/v2.2/json";

/// CUMTD developer API client. The API key travels as the `key` query parameter.
pub struct CumtdClient<C = BasicClient> {
    http: UrlParam<C>,
    base_url: String,
}

impl CumtdClient<BasicClient> {
    pub fn new(api_key: String, base_url: &str) -> Self {
        Self::with_http(BasicClient::new(), api_key, base_url)
    }
}

impl<C: HttpClient> CumtdClient<C> {
    pub fn with_http(inner: C, api_key: String, base_url: &str) -> Self {
        Self {
            http: UrlParam::new(inner, "key", api_key),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `<base>/<method>?<params>`; the key is appended by the transport.
    pub fn method_url(&self, method: &str, params: &[(&str, String)]) -> Result<Url> {
        let url = format!("{}/{}", self.base_url, method);
        Url::parse_with_params(&url, params).with_context(|| format!("invalid API URL '{url}'"))
    }
}

#[async_trait]
impl<C: HttpClient> TransitApi for CumtdClient<C> {
    async fn departures_by_stop(
        &self,
        stop_id: &str,
        lookahead_minutes: u32,
    ) -> Result<DeparturesResponse> {
        let url = self.method_url(
            "getdeparturesbystop",
            &[
                ("stop_id", stop_id.to_string()),
                ("pt", lookahead_minutes.to_string()),
            ],
        )?;

        fetch_json(&self.http, url)
            .await
            .map_err(|e| anyhow::anyhow!("getdeparturesbystop failed for '{}': {}", stop_id, e))
    }

    async fn all_stops(&self) -> Result<StopsResponse> {
        let url = self.method_url("getstops", &[])?;

        fetch_json(&self.http, url)
            .await
            .map_err(|e| anyhow::anyhow!("getstops failed: {}", e))
    }
}
