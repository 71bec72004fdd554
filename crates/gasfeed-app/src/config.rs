//! Application configuration.

use crate::error::{AppError, AppResult};
use gasfeed_core::ChainId;
use gasfeed_ws::FeedConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "GASFEED_CONFIG";

/// Config file used when neither `--config` nor `GASFEED_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Rate snapshot endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesConfig {
    /// Rates endpoint URL.
    pub url: String,
    /// Poll cadence (ms). Default: 60,000.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-request timeout (ms). Default: 10,000.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    60_000
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl RatesConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Message history settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Oldest entries are evicted beyond this. None keeps everything, and
    /// every reconciled frame then costs time linear in the session length.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chain subscribed at startup. None starts idle.
    #[serde(default)]
    pub chain_id: Option<u64>,
    pub rates: RatesConfig,
    pub stream: FeedConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl AppConfig {
    /// Load from `GASFEED_CONFIG`, or the default path.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        tracing::info!(config_path = %config_path, "Loading configuration");
        Self::from_file(config_path)
    }

    /// Load and validate a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.rates.url.is_empty() {
            return Err(AppError::Config("rates.url must be set".to_string()));
        }
        if self.rates.poll_interval_ms == 0 || self.rates.timeout_ms == 0 {
            return Err(AppError::Config(
                "rates.poll_interval_ms and rates.timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.history.max_entries == Some(0) {
            return Err(AppError::Config(
                "history.max_entries must be non-zero when set".to_string(),
            ));
        }
        self.stream
            .validate()
            .map_err(|e| AppError::Config(format!("stream: {e}")))
    }

    pub fn initial_chain(&self) -> Option<ChainId> {
        self.chain_id.map(ChainId::new)
    }
}
