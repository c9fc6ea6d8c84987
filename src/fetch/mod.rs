mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use serde::de::DeserializeOwned;

/// Issues a GET for `url` and decodes the body as JSON.
///
/// The HTTP status is not checked: the provider reports failures such as an
/// exhausted quota inside the JSON body, which the caller must still see.
///
/// Errors have their URL removed, since auth wrappers may have put a key in
/// the query string.
pub async fn fetch_json<C: HttpClient, T: DeserializeOwned>(
    client: &C,
    url: reqwest::Url,
) -> reqwest::Result<T> {
    let resp = client.get(url).await.map_err(reqwest::Error::without_url)?;
    resp.json::<T>().await.map_err(reqwest::Error::without_url)
}
