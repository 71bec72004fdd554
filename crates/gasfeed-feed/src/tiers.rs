//! Tier derivation: stream `result` payload -> ordered `GasPrice` list.
//!
//! The feed sends one of two shapes per tier:
//! - flat: `{"fast": "2000000000"}`
//! - EIP-1559: `{"high": {"maxFeePerGas": "...", "maxPriorityFeePerGas": "..."}}`
//!
//! Only `maxFeePerGas` is surfaced for EIP-1559 tiers. `baseFee` is not a
//! tier and is always excluded. Output order is wire order.

use crate::error::{FeedError, FeedResult};
use gasfeed_core::{GasPrice, WeiAmount};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Reserved label that is never a tier.
pub const BASE_FEE_LABEL: &str = "baseFee";

/// EIP-1559 fee pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eip1559Fees {
    #[serde(rename = "maxFeePerGas")]
    pub max_fee_per_gas: WeiAmount,
    #[serde(rename = "maxPriorityFeePerGas", default)]
    pub max_priority_fee_per_gas: Option<WeiAmount>,
}

/// A single tier value, discriminated by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TierValue {
    Eip1559(Eip1559Fees),
    Flat(WeiAmount),
}

impl TierValue {
    /// Displayed price in gwei.
    pub fn gwei(&self) -> gasfeed_core::Result<f64> {
        match self {
            Self::Flat(amount) => amount.to_gwei(),
            Self::Eip1559(fees) => fees.max_fee_per_gas.to_gwei(),
        }
    }
}

/// Derive one tier, or explain why it is unusable.
pub fn derive_tier(label: &str, value: &serde_json::Value) -> FeedResult<GasPrice> {
    let tier = TierValue::deserialize(value).map_err(|e| FeedError::InvalidTier {
        label: label.to_string(),
        reason: e.to_string(),
    })?;
    let gwei = tier.gwei().map_err(|e| FeedError::InvalidTier {
        label: label.to_string(),
        reason: e.to_string(),
    })?;
    Ok(GasPrice::new(label, gwei))
}

/// Derive the tier list from a message `result`.
///
/// Non-object payloads yield no tiers; unusable entries are skipped so a
/// partial payload still produces the tiers it does carry.
pub fn derive_gas_prices(result: &serde_json::Value) -> Vec<GasPrice> {
    let Some(tiers) = result.as_object() else {
        return Vec::new();
    };

    tiers
        .iter()
        .filter(|(label, _)| label.as_str() != BASE_FEE_LABEL)
        .filter_map(|(label, value)| match derive_tier(label, value) {
            Ok(price) => Some(price),
            Err(e) => {
                trace!(error = %e, "Skipping tier");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_tier() {
        let prices = derive_gas_prices(&json!({ "fast": "2000000000" }));
        assert_eq!(prices, vec![GasPrice::new("fast", 2.0)]);
    }

    #[test]
    fn test_eip1559_tier_uses_max_fee_only() {
        let prices = derive_gas_prices(&json!({
            "high": {
                "maxFeePerGas": "50000000000",
                "maxPriorityFeePerGas": "1000000000"
            }
        }));
        assert_eq!(prices, vec![GasPrice::new("high", 50.0)]);
    }

    #[test]
    fn test_base_fee_excluded() {
        let prices = derive_gas_prices(&json!({
            "baseFee": "30000000000",
            "low": "31000000000",
            "high": "35000000000"
        }));

        assert!(prices.iter().all(|p| p.label != BASE_FEE_LABEL));
        assert_eq!(prices.len(), 2);
    }

    #[test]
    fn test_base_fee_excluded_in_eip1559_shape() {
        let prices = derive_gas_prices(&json!({
            "baseFee": { "maxFeePerGas": "1", "maxPriorityFeePerGas": "1" },
            "instant": { "maxFeePerGas": "3000000000", "maxPriorityFeePerGas": "2000000000" }
        }));
        assert_eq!(prices, vec![GasPrice::new("instant", 3.0)]);
    }

    #[test]
    fn test_wire_order_preserved() {
        let result: serde_json::Value = serde_json::from_str(
            r#"{"instant":"3000000000","low":"1000000000","high":"2000000000"}"#,
        )
        .unwrap();

        let labels: Vec<String> = derive_gas_prices(&result)
            .into_iter()
            .map(|p| p.label)
            .collect();
        assert_eq!(labels, vec!["instant", "low", "high"]);
    }

    #[test]
    fn test_partial_payload_keeps_valid_tiers() {
        let prices = derive_gas_prices(&json!({
            "low": "1000000000",
            "broken": { "maxPriorityFeePerGas": "1" },
            "garbage": "fast",
            "high": 4000000000u64
        }));
        assert_eq!(
            prices,
            vec![GasPrice::new("low", 1.0), GasPrice::new("high", 4.0)]
        );
    }

    #[test]
    fn test_non_object_result() {
        assert!(derive_gas_prices(&json!("ok")).is_empty());
        assert!(derive_gas_prices(&json!(null)).is_empty());
        assert!(derive_gas_prices(&json!([1, 2])).is_empty());
    }
}
