//! Native token rate snapshots.
//!
//! Fetches the chain id -> USD price mapping from the rates endpoint and
//! republishes it on a fixed cadence. A failed fetch keeps the previous
//! snapshot.

pub mod client;
pub mod error;
pub mod poller;

pub use client::{parse_rate_snapshot, RateClient, RateSource};
pub use error::{RegistryError, RegistryResult};
pub use poller::{RatePoller, RateReceivers};
