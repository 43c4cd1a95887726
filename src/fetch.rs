//! HTTP Fetcher (component C) — a single GET with timeout, UA, no retries.

use std::time::Duration;

use reqwest::Client;

use crate::error::FetchError;

/// Result of one successful fetch: the final status and the decoded body.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

/// Builds the shared [`reqwest::Client`] used by the Fetcher and the Robots
/// Gate. A single client is reused so connection pooling and DNS caching
/// work across the whole crawl.
pub fn build_client(user_agent: &str) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(10))
        .build()
}

/// Performs one GET. Non-200 responses are reported back to the caller as
/// `FetchError::BadStatus` rather than stored (§4.C) — the body is not read
/// in that case.
pub async fn fetch(client: &Client, url: &str) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::BadStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

    Ok(FetchedPage {
        status: status.as_u16(),
        body,
    })
}
