//! Per-chain WebSocket transport for the gas-price push feed.
//!
//! Provides:
//! - One connection per subscribed chain, addressed by a URL template
//! - Automatic reconnection with exponential backoff
//! - Heartbeat monitoring (WebSocket ping, pong timeout detection)
//! - Epoch-tagged inbound frames so a consumer can discard frames from a
//!   superseded subscription
//! - A cloneable writer for outbound control frames

pub mod connection;
pub mod error;
pub mod frame;
pub mod heartbeat;
pub mod stream;
pub mod writer;

pub use connection::{ConnectionState, FeedConfig, FeedConnection};
pub use error::{WsError, WsResult};
pub use frame::StreamFrame;
pub use stream::{GasStream, StreamHandle};
pub use writer::StreamWriter;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
