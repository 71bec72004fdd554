//! Inbound frame envelope.

use gasfeed_core::ChainId;

/// A raw text frame received from the gas feed.
///
/// Frames are not decoded here; the reconciler owns decoding so malformed
/// payloads are dropped at a single point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    /// Subscription generation the frame was received under.
    pub epoch: u64,
    /// Chain the connection was opened for.
    pub chain_id: ChainId,
    /// Raw frame text.
    pub text: String,
}

impl StreamFrame {
    pub fn new(epoch: u64, chain_id: ChainId, text: impl Into<String>) -> Self {
        Self {
            epoch,
            chain_id,
            text: text.into(),
        }
    }
}
