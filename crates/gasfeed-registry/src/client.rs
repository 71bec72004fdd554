//! HTTP client for the native token rates endpoint.
//!
//! The endpoint returns a JSON object keyed by chain id strings:
//! `{ "1": { "USD": 3000.0 }, "137": { "USD": 0.71 } }`.

use crate::error::{RegistryError, RegistryResult};
use gasfeed_core::{ChainId, TokenRate, TokenRateSnapshot};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for rate requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of rate snapshots.
///
/// Implemented by `RateClient` for the live endpoint and by in-memory
/// sources in tests.
pub trait RateSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = RegistryResult<TokenRateSnapshot>> + Send;
}

/// Raw per-chain entry from the rates endpoint.
#[derive(Debug, Deserialize)]
struct RawRate {
    #[serde(rename = "USD")]
    usd: f64,
}

/// Client for fetching native token USD rates.
pub struct RateClient {
    /// HTTP client.
    client: Client,
    /// Rates endpoint URL.
    url: String,
}

impl RateClient {
    /// Create a new rate client.
    ///
    /// # Arguments
    /// * `url` - rates endpoint URL
    /// * `timeout` - per-request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> RegistryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Rates endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the current rate snapshot.
    pub async fn fetch_snapshot(&self) -> RegistryResult<TokenRateSnapshot> {
        debug!(url = %self.url, "Fetching native token rates");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::HttpClient(format!("HTTP {status}: {body}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("Failed to parse response: {e}")))?;

        parse_rate_snapshot(&body)
    }
}

impl RateSource for RateClient {
    fn fetch(&self) -> impl Future<Output = RegistryResult<TokenRateSnapshot>> + Send {
        self.fetch_snapshot()
    }
}

/// Parse a rates response body into a snapshot.
///
/// Entries whose key is not a chain id or whose value has no numeric `USD`
/// field are skipped. A body that is not an object is an error.
pub fn parse_rate_snapshot(body: &serde_json::Value) -> RegistryResult<TokenRateSnapshot> {
    let object = body
        .as_object()
        .ok_or_else(|| RegistryError::ParseError("rates response is not an object".to_string()))?;

    let mut rates = BTreeMap::new();
    for (key, value) in object {
        let chain_id: ChainId = match key.parse() {
            Ok(id) => id,
            Err(e) => {
                warn!(key = %key, error = %e, "Skipping rate with invalid chain id");
                continue;
            }
        };

        match serde_json::from_value::<RawRate>(value.clone()) {
            Ok(raw) => {
                rates.insert(chain_id, TokenRate::new(raw.usd));
            }
            Err(e) => {
                warn!(%chain_id, error = %e, "Skipping malformed rate entry");
            }
        }
    }

    Ok(TokenRateSnapshot::new(rates))
}
