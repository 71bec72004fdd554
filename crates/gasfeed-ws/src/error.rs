//! WebSocket error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("Not connected")]
    NotConnected,

    #[error("Outbound channel closed")]
    ChannelClosed,

    #[error("Heartbeat timeout")]
    HeartbeatTimeout,

    #[error("Invalid feed configuration: {0}")]
    InvalidConfig(String),

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
}

pub type WsResult<T> = Result<T, WsError>;
