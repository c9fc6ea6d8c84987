use super::client::HttpClient;
use async_trait::async_trait;

/// Plain `reqwest` client. No request timeout is set; a hung connection
/// surfaces as an ordinary transport error from `reqwest`.
#[derive(Default)]
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        tracing::debug!(url = %req.url().path(), "GET");
        self.0.execute(req).await
    }
}
