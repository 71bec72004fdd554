//! Outbound writer for control frames.
//!
//! The feed accepts request frames (e.g. subscribe or one-shot gas price
//! requests) on the same socket it pushes updates on. The writer queues
//! them for the connection task; it does not interpret them.

use crate::connection::ConnectionState;
use crate::error::{WsError, WsResult};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Cloneable handle for sending text frames to the current connection.
#[derive(Debug, Clone)]
pub struct StreamWriter {
    tx: mpsc::Sender<String>,
    state: Arc<RwLock<ConnectionState>>,
}

impl StreamWriter {
    pub fn new(tx: mpsc::Sender<String>, state: Arc<RwLock<ConnectionState>>) -> Self {
        Self { tx, state }
    }

    /// Queue a text frame for sending.
    ///
    /// # Errors
    ///
    /// - `WsError::NotConnected`: the socket is not currently open
    /// - `WsError::ChannelClosed`: the connection task has exited
    pub async fn send_text(&self, text: impl Into<String>) -> WsResult<()> {
        if !self.is_connected() {
            return Err(WsError::NotConnected);
        }

        self.tx
            .send(text.into())
            .await
            .map_err(|_| WsError::ChannelClosed)?;

        debug!("Outbound frame queued");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        *self.state.read() == ConnectionState::Connected && !self.tx.is_closed()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.read()
    }
}
