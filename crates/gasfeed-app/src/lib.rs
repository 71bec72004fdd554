//! Native token gas-price view.
//!
//! Joins two independent sources into per-chain gas prices:
//! - USD rate snapshots polled over REST
//! - Gas price updates pushed over a per-chain WebSocket feed

pub mod config;
pub mod error;
pub mod service;

pub use config::{AppConfig, HistoryConfig, RatesConfig};
pub use error::{AppError, AppResult};
pub use service::NativeTokenRates;
