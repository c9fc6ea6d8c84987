use async_trait::async_trait;
use reqwest::{Method, Request, Response, Url};

/// Transport seam for provider requests; wrappers such as
/// [`UrlParam`](super::auth::UrlParam) decorate an inner client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;

    /// Bodyless GET. Goes through [`execute`](Self::execute) so wrappers still
    /// see the request.
    async fn get(&self, url: Url) -> reqwest::Result<Response> {
        self.execute(Request::new(Method::GET, url)).await
    }
}
