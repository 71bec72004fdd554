//! In-memory rate source.

use gasfeed_core::{ChainId, TokenRateSnapshot};
use gasfeed_registry::{RateSource, RegistryResult};
use std::future::Future;

/// Always returns the same rates.
pub struct StaticRates {
    pairs: Vec<(u64, f64)>,
}

impl StaticRates {
    pub fn new(pairs: &[(u64, f64)]) -> Self {
        Self {
            pairs: pairs.to_vec(),
        }
    }
}

impl RateSource for StaticRates {
    fn fetch(&self) -> impl Future<Output = RegistryResult<TokenRateSnapshot>> + Send {
        let snapshot = TokenRateSnapshot::from_pairs(
            self.pairs
                .iter()
                .map(|&(chain, usd)| (ChainId::new(chain), usd)),
        );
        async move { Ok(snapshot) }
    }
}
