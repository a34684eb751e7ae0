//! Upstream wait-times API client
//!
//! Invoked only on cache miss. A single attempt per call: retry/backoff is
//! deliberately left to the upstream's own availability story, and the cache
//! absorbs the request volume in front of it.

use reqwest::Client;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::models::WaitTimesResponse;
use crate::{Error, Result};

/// Client for the upstream `/wait-times` endpoint.
pub struct UpstreamClient {
    client: Client,
    base_url: String,
}

impl UpstreamClient {
    /// Build a client from the upstream configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The configured upstream base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the current wait-times payload, optionally restricted to one ride.
    pub async fn fetch_wait_times(&self, ride_id: Option<i64>) -> Result<WaitTimesResponse> {
        let url = format!("{}/wait-times", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(id) = ride_id {
            request = request.query(&[("ride_id", id)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "{url} returned {status}"
            )));
        }

        let payload = response.json::<WaitTimesResponse>().await?;
        debug!(
            rides = payload.all_rides.len(),
            history = payload.flat_rides_history.len(),
            "fetched wait times from upstream"
        );
        Ok(payload)
    }
}
