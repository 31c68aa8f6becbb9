//! Connection layer: HTTP GET with bounded retry
//!
//! One persistent [`reqwest::Client`] is shared by the crawler and the
//! catalog query client. Fetches retry immediately on non-2xx status or
//! transport error up to a caller-supplied bound; exhausting the bound
//! degrades to `None` rather than an error, so callers treat the resource
//! as currently unavailable and move on.

use reqwest::Client;
use std::time::Duration;

/// Builds the shared HTTP client
///
/// The connection pool is what makes the retry loops viable against a server
/// that intermittently drops requests; reconnecting per attempt makes the
/// failure rate worse.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("survey-harvest/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(15))
        .build()
}

/// Fetches a URL and returns the response body as text
///
/// Retries up to `retries` times on any non-success status or transport
/// error. Retries are immediate: the archive's observed failure mode is
/// flapping 5xx, not sustained outage. Each failed attempt logs a warning
/// with the status observed; exhaustion logs an error and returns `None`.
pub async fn fetch_text(client: &Client, url: &str, retries: u32) -> Option<String> {
    let mut attempts = 0;
    while attempts < retries {
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => return Some(body),
                Err(e) => {
                    tracing::warn!("Retrying {}, failed reading body: {}", url, e);
                }
            },
            Ok(resp) => {
                tracing::warn!("Retrying {}, received status code {}", url, resp.status());
            }
            Err(e) => {
                tracing::warn!("Retrying {}, connection error: {}", url, e);
            }
        }
        attempts += 1;
    }
    tracing::error!(
        "Unable to connect to {}, tried {} times without success",
        url,
        attempts
    );
    None
}

/// Fetches a URL and returns the raw response bytes
///
/// Same retry contract as [`fetch_text`]. Used for file downloads, where the
/// body is a single-member gzip stream served as content (not transport
/// encoding).
pub async fn fetch_bytes(client: &Client, url: &str, retries: u32) -> Option<Vec<u8>> {
    let mut attempts = 0;
    while attempts < retries {
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                Ok(body) => return Some(body.to_vec()),
                Err(e) => {
                    tracing::warn!("Retrying {}, failed reading body: {}", url, e);
                }
            },
            Ok(resp) => {
                tracing::warn!("Retrying {}, received status code {}", url, resp.status());
            }
            Err(e) => {
                tracing::warn!("Retrying {}, connection error: {}", url, e);
            }
        }
        attempts += 1;
    }
    tracing::error!(
        "Unable to download {}, tried {} times without success",
        url,
        attempts
    );
    None
}
