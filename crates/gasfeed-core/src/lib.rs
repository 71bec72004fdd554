//! Core domain types for the gasfeed gas-price client.
//!
//! This crate provides the types shared by the transport, reconciliation
//! and rate-polling crates:
//! - `ChainId`: join key between the rate snapshot and the gas stream
//! - `TokenRateSnapshot`: all-or-nothing USD rates per chain
//! - `GasPrice`, `ChainGasPrice`: the published per-chain view
//! - `WeiAmount`: base-unit amounts as they arrive on the wire

pub mod chain;
pub mod error;
pub mod types;
pub mod units;

pub use chain::ChainId;
pub use error::{CoreError, Result};
pub use types::{ChainGasPrice, GasPrice, TokenRate, TokenRateSnapshot};
pub use units::{wei_to_gwei, WeiAmount, WEI_PER_GWEI};
