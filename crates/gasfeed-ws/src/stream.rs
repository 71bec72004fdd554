//! Stream handles: one open (or idle) subscription per chain.
//!
//! `GasStream` opens connections; each `StreamHandle` owns exactly one.
//! Closing or dropping a handle cancels its connection task immediately,
//! so replacing the handle is synchronous from the caller's side. Frames
//! that were already queued keep the old epoch and can be discarded by the
//! consumer.

use crate::connection::{ConnectionState, FeedConfig, FeedConnection};
use crate::error::WsResult;
use crate::frame::StreamFrame;
use crate::writer::StreamWriter;
use gasfeed_core::ChainId;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Outbound queue depth per connection.
const OUTBOUND_BUFFER: usize = 32;

/// Opens per-chain feed connections that all deliver into one frame queue.
#[derive(Debug, Clone)]
pub struct GasStream {
    config: FeedConfig,
    frame_tx: mpsc::Sender<StreamFrame>,
}

impl GasStream {
    pub fn new(config: FeedConfig, frame_tx: mpsc::Sender<StreamFrame>) -> WsResult<Self> {
        config.validate()?;
        Ok(Self { config, frame_tx })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Open a connection for `chain_id` under `epoch`.
    ///
    /// `None` yields an idle handle: no connection, no frames.
    /// Must be called from within a tokio runtime.
    pub fn open(&self, chain_id: Option<ChainId>, epoch: u64) -> StreamHandle {
        let Some(chain_id) = chain_id else {
            return StreamHandle::idle(epoch);
        };

        let state = Arc::new(RwLock::new(ConnectionState::Connecting));
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let shutdown = CancellationToken::new();

        let connection = FeedConnection::new(
            self.config.clone(),
            chain_id,
            epoch,
            state.clone(),
            self.frame_tx.clone(),
            outbound_rx,
            shutdown.clone(),
        );

        let task = tokio::spawn(async move {
            if let Err(e) = connection.run().await {
                error!(%chain_id, epoch, error = %e, "Gas feed connection gave up");
            }
        });

        info!(%chain_id, epoch, "Gas stream opened");

        StreamHandle {
            chain_id: Some(chain_id),
            epoch,
            writer: Some(StreamWriter::new(outbound_tx, state.clone())),
            state,
            shutdown,
            task: Some(task),
        }
    }
}

/// Owner of one subscription's connection.
#[derive(Debug)]
pub struct StreamHandle {
    chain_id: Option<ChainId>,
    epoch: u64,
    writer: Option<StreamWriter>,
    state: Arc<RwLock<ConnectionState>>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Handle representing "no connection".
    pub fn idle(epoch: u64) -> Self {
        Self {
            chain_id: None,
            epoch,
            writer: None,
            state: Arc::new(RwLock::new(ConnectionState::Idle)),
            shutdown: CancellationToken::new(),
            task: None,
        }
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        self.chain_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Writer for outbound control frames. None for idle handles.
    pub fn writer(&self) -> Option<StreamWriter> {
        self.writer.clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Cancel the connection. Idempotent.
    pub fn close(&mut self) {
        if !self.shutdown.is_cancelled() {
            self.shutdown.cancel();
            if let Some(chain_id) = self.chain_id {
                info!(%chain_id, epoch = self.epoch, "Gas stream closed");
            }
        }
    }

    /// Close and wait for the connection task to finish.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> (GasStream, mpsc::Receiver<StreamFrame>) {
        let (tx, rx) = mpsc::channel(16);
        let config = FeedConfig {
            url_template: "ws://127.0.0.1:9/{chain_id}".to_string(),
            ..Default::default()
        };
        (GasStream::new(config, tx).unwrap(), rx)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let (tx, _rx) = mpsc::channel(1);
        let config = FeedConfig {
            url_template: "ws://127.0.0.1:9/gas".to_string(),
            ..Default::default()
        };
        assert!(GasStream::new(config, tx).is_err());
    }

    #[tokio::test]
    async fn test_open_without_chain_is_idle() {
        let (stream, _rx) = stream();
        let handle = stream.open(None, 3);

        assert_eq!(handle.chain_id(), None);
        assert_eq!(handle.epoch(), 3);
        assert_eq!(handle.state(), ConnectionState::Idle);
        assert!(handle.writer().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let (stream, _rx) = stream();
        let handle = stream.open(Some(ChainId::MAINNET), 1);
        assert_eq!(handle.chain_id(), Some(ChainId::MAINNET));

        tokio::time::timeout(std::time::Duration::from_secs(5), handle.shutdown())
            .await
            .expect("connection task should exit after close");
    }
}
