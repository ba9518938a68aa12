//! The seam to the remote world.
//!
//! The controller only ever talks to a [`Fetch`] implementation: give it an
//! identifier, get back a payload or a [`FetchFailure`]. For HTML harvesting
//! that is an HTTP GET ([`HttpFetcher`]); for OCR it would be "render page
//! then recognize text"; for video it would be a stream download. The
//! controller does not care which.
//!
//! Implementations classify their failures: [`FetchFailure::Transient`] for
//! anything worth retrying (timeouts, resets, 5xx, 429), and
//! [`FetchFailure::Permanent`] for dead ends (unparseable URL, 404) that the
//! retry budget should not be wasted on.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::{instrument, warn};
use url::Url;

use crate::error::FetchFailure;

/// Async capability to retrieve the payload behind an identifier.
pub trait Fetch {
    /// Fetch the resource named by `identifier`.
    async fn fetch(&self, identifier: &str) -> Result<Vec<u8>, FetchFailure>;
}

/// Plain HTTP GET fetcher over a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with a sensible request timeout.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// Wrap an existing client, keeping whatever defaults the caller set up.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%identifier))]
    async fn fetch(&self, identifier: &str) -> Result<Vec<u8>, FetchFailure> {
        let url = Url::parse(identifier)
            .map_err(|e| FetchFailure::Permanent(format!("invalid URL: {e}")))?;

        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchFailure::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let dt = t0.elapsed();
            warn!(%status, elapsed_ms = dt.as_millis() as u64, "Remote returned error status");
            return Err(classify_status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchFailure::Transient(format!("body read failed: {e}")))?;
        Ok(body.to_vec())
    }
}

/// Server-side trouble and throttling are transient; every other client error
/// is permanent.
fn classify_status(status: StatusCode) -> FetchFailure {
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        FetchFailure::Transient(format!("status {status}"))
    } else {
        FetchFailure::Permanent(format!("status {status}"))
    }
}
