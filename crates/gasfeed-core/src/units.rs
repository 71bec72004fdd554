//! Base-unit amounts and gwei conversion.
//!
//! The gas feed quotes prices in the chain's base unit (wei). Values arrive
//! either as decimal strings, hex strings or bare JSON numbers; all of them
//! are converted through `Decimal` so large wei values keep their precision
//! until the final division.

use crate::error::{CoreError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of wei in one gwei.
pub const WEI_PER_GWEI: u64 = 1_000_000_000;

/// A base-unit amount as received on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeiAmount {
    /// Decimal (`"2000000000"`) or hex (`"0x77359400"`) string.
    Text(String),
    /// Bare JSON number.
    Number(serde_json::Number),
}

impl WeiAmount {
    /// Parse the amount into a `Decimal` number of wei.
    pub fn to_decimal(&self) -> Result<Decimal> {
        match self {
            Self::Text(s) => parse_wei_str(s),
            Self::Number(n) => parse_wei_str(&n.to_string()),
        }
    }

    /// Convert the amount to gwei.
    pub fn to_gwei(&self) -> Result<f64> {
        wei_to_gwei(self.to_decimal()?)
    }
}

fn parse_wei_str(raw: &str) -> Result<Decimal> {
    let s = raw.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        let value = u128::from_str_radix(hex, 16)
            .map_err(|e| CoreError::InvalidAmount(format!("{raw:?}: {e}")))?;
        return Decimal::from_str(&value.to_string()).map_err(CoreError::from);
    }

    match Decimal::from_str(s) {
        Ok(d) => Ok(d),
        // serde_json renders large floats in exponent form
        Err(_) => Decimal::from_scientific(s)
            .map_err(|e| CoreError::InvalidAmount(format!("{raw:?}: {e}"))),
    }
}

/// Convert a wei amount to gwei.
pub fn wei_to_gwei(wei: Decimal) -> Result<f64> {
    if wei.is_sign_negative() {
        return Err(CoreError::InvalidAmount(format!("negative amount: {wei}")));
    }
    (wei / Decimal::from(WEI_PER_GWEI))
        .to_f64()
        .ok_or_else(|| CoreError::InvalidAmount(format!("out of range: {wei}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_string_to_gwei() {
        let amount = WeiAmount::Text("2000000000".to_string());
        assert_eq!(amount.to_gwei().unwrap(), 2.0);
    }

    #[test]
    fn test_fractional_gwei() {
        let amount = WeiAmount::Text("1500000000".to_string());
        assert_eq!(amount.to_gwei().unwrap(), 1.5);
    }

    #[test]
    fn test_hex_string_to_gwei() {
        // 0x77359400 = 2_000_000_000
        let amount = WeiAmount::Text("0x77359400".to_string());
        assert_eq!(amount.to_gwei().unwrap(), 2.0);
    }

    #[test]
    fn test_json_number_to_gwei() {
        let amount: WeiAmount = serde_json::from_str("50000000000").unwrap();
        assert_eq!(amount.to_gwei().unwrap(), 50.0);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let amount = WeiAmount::Text("fast".to_string());
        assert!(amount.to_gwei().is_err());
    }

    #[test]
    fn test_negative_is_rejected() {
        assert!(wei_to_gwei(dec!(-1)).is_err());
    }
}
