//! Stream message decoding and classification.
//!
//! The feed mixes two conventions on one socket:
//! 1. Request/response: `{"method": "getGasPriceChain1", "result": {...}}`
//! 2. Push: `{"event": "updateGasPriceChain1", "result": {...}}`
//!
//! Both carry the chain id as a `Chain<id>` suffix of the identifier.

use crate::error::FeedResult;
use gasfeed_core::ChainId;
use serde::{Deserialize, Serialize};

/// Marker of one-shot gas price requests.
pub const REQUEST_MARKER: &str = "getGasPriceChain";
/// Marker of ongoing gas price pushes.
pub const UPDATE_MARKER: &str = "updateGasPriceChain";

/// One inbound unit from the push feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Tier payload; shape is resolved lazily by `tiers::derive_gas_prices`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

/// How a message enters the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Request acknowledgement, stored under the update id namespace.
    Request { normalized_id: String },
    /// Ongoing push update.
    Update { id: String },
    /// Anything else with an identifier; eligible for in-place replacement.
    Other { id: String },
    /// Neither `method` nor `event`.
    Unclassifiable,
}

impl StreamMessage {
    /// Decode a raw text frame.
    pub fn decode(text: &str) -> FeedResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// `method` if present, else `event`.
    pub fn working_id(&self) -> Option<&str> {
        self.method.as_deref().or(self.event.as_deref())
    }

    pub fn classify(&self) -> MessageKind {
        let Some(id) = self.working_id() else {
            return MessageKind::Unclassifiable;
        };

        if id.contains(REQUEST_MARKER) {
            MessageKind::Request {
                normalized_id: id.replace(REQUEST_MARKER, UPDATE_MARKER),
            }
        } else if id.contains(UPDATE_MARKER) {
            MessageKind::Update { id: id.to_string() }
        } else {
            MessageKind::Other { id: id.to_string() }
        }
    }
}

/// Chain an identifier belongs to, by its `...Chain<id>` suffix.
pub fn chain_of_id(id: &str) -> Option<ChainId> {
    let (_, suffix) = id.rsplit_once("Chain")?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}
