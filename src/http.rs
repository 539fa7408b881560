//! JSON-over-HTTP producer
//!
//! A small wrapper around `reqwest` used as the producer behind the cache.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when fetching a JSON document
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { status: StatusCode, url: String },

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Client for fetching JSON documents
#[derive(Debug, Clone)]
pub struct JsonClient {
    client: Client,
}

impl JsonClient {
    /// Creates a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// GETs `url` and parses the body as JSON
    ///
    /// # Returns
    /// * `Ok(Value)` - The parsed document
    /// * `Err(FetchError)` - On transport failure, non-2xx status or invalid JSON
    pub async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        debug!(url, "fetching");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
