//! Gas-price stream reconciliation for gasfeed.
//!
//! Decodes push-feed frames into `StreamMessage`s, reconciles them into an
//! ordered `MessageHistory`, derives named gas-price tiers and joins them
//! with the USD rate snapshot into per-chain `ChainGasPrice` views.

pub mod error;
pub mod history;
pub mod message;
pub mod reconciler;
pub mod tiers;
pub mod view;

pub use error::{FeedError, FeedResult};
pub use history::{HistoryEntry, MessageHistory, ReconcileOutcome};
pub use message::{MessageKind, StreamMessage};
pub use reconciler::{FrameOutcome, Reconciler};
pub use tiers::{derive_gas_prices, Eip1559Fees, TierValue, BASE_FEE_LABEL};
pub use view::{compose_chain_gas_prices, ViewComposer};
