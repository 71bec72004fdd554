//! Chain identification.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Blockchain network identifier (EIP-155 chain id).
///
/// Used as the join key between the USD rate snapshot and the gas-price
/// stream. Rate endpoints key their JSON objects by the decimal string
/// form, so `FromStr` and `Display` round-trip that representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Ethereum mainnet.
    pub const MAINNET: Self = Self(1);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| CoreError::InvalidChainId(format!("{s:?}: {e}")))
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain_id() {
        assert_eq!("1".parse::<ChainId>().unwrap(), ChainId::MAINNET);
        assert_eq!(" 137 ".parse::<ChainId>().unwrap(), ChainId::new(137));
    }

    #[test]
    fn test_parse_chain_id_rejects_garbage() {
        assert!("eth".parse::<ChainId>().is_err());
        assert!("-1".parse::<ChainId>().is_err());
        assert!("".parse::<ChainId>().is_err());
    }

    #[test]
    fn test_chain_id_serde_transparent() {
        let json = serde_json::to_string(&ChainId::new(10)).unwrap();
        assert_eq!(json, "10");
        let back: ChainId = serde_json::from_str("10").unwrap();
        assert_eq!(back, ChainId::new(10));
    }
}
