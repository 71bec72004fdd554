//! Rate snapshot and published gas-price types.

use crate::ChainId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// USD price of a chain's native gas token.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenRate {
    pub usd: f64,
}

impl TokenRate {
    pub fn new(usd: f64) -> Self {
        Self { usd }
    }
}

/// Point-in-time USD rates for every chain the rate endpoint knows about.
///
/// A snapshot is always replaced as a whole. Chains missing from the latest
/// fetch are gone; there is no per-chain lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRateSnapshot {
    rates: BTreeMap<ChainId, TokenRate>,
    /// When the snapshot was fetched.
    pub fetched_at: DateTime<Utc>,
}

impl TokenRateSnapshot {
    /// Create a snapshot stamped with the current time.
    pub fn new(rates: BTreeMap<ChainId, TokenRate>) -> Self {
        Self {
            rates,
            fetched_at: Utc::now(),
        }
    }

    /// Build a snapshot from `(chain, usd)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (ChainId, f64)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(chain, usd)| (chain, TokenRate::new(usd)))
                .collect(),
        )
    }

    /// Rate for a single chain.
    pub fn get(&self, chain_id: ChainId) -> Option<&TokenRate> {
        self.rates.get(&chain_id)
    }

    /// Iterate rates in ascending chain id order.
    pub fn iter(&self) -> impl Iterator<Item = (ChainId, &TokenRate)> {
        self.rates.iter().map(|(chain, rate)| (*chain, rate))
    }

    pub fn chain_ids(&self) -> Vec<ChainId> {
        self.rates.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// A named gas-price tier, e.g. `fast: 2.0 gwei`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasPrice {
    pub label: String,
    pub gwei: f64,
}

impl GasPrice {
    pub fn new(label: impl Into<String>, gwei: f64) -> Self {
        Self {
            label: label.into(),
            gwei,
        }
    }
}

/// Published per-chain view joining the USD rate with the latest tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainGasPrice {
    pub chain_id: ChainId,
    pub gas_token_price_usd: f64,
    /// Tiers in the order the feed sent them. Empty when the chain has no
    /// reconciled stream message.
    pub gas_prices: Vec<GasPrice>,
}
