//! Per-chain feed connection.
//!
//! Handles the connection lifecycle for one subscription epoch: connect,
//! optional subscribe request, read loop, heartbeat, and reconnection with
//! exponential backoff. The task exits as soon as its cancellation token
//! fires, which is how a chain switch tears the connection down.

use crate::error::{WsError, WsResult};
use crate::frame::StreamFrame;
use crate::heartbeat::HeartbeatMonitor;
use futures_util::{SinkExt, StreamExt};
use gasfeed_core::ChainId;
use gasfeed_telemetry::Metrics;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Placeholder substituted with the chain id in URL and request templates.
pub const CHAIN_ID_PLACEHOLDER: &str = "{chain_id}";

/// Feed connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed URL template, e.g. `wss://feed.example/gas/{chain_id}`.
    pub url_template: String,
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Send a ping after this much inbound silence.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Pong must arrive within this.
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    /// Request sent right after every (re)connect, with `{chain_id}`
    /// substituted. None sends nothing.
    #[serde(default)]
    pub subscribe_template: Option<String>,
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url_template: String::new(),
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            subscribe_template: None,
        }
    }
}

impl FeedConfig {
    /// Check the template and timings.
    pub fn validate(&self) -> WsResult<()> {
        if !self.url_template.contains(CHAIN_ID_PLACEHOLDER) {
            return Err(WsError::InvalidConfig(format!(
                "url_template must contain {CHAIN_ID_PLACEHOLDER}: {}",
                self.url_template
            )));
        }
        if self.heartbeat_interval_ms == 0 || self.heartbeat_timeout_ms == 0 {
            return Err(WsError::InvalidConfig(
                "heartbeat interval and timeout must be non-zero".to_string(),
            ));
        }
        if self.reconnect_base_delay_ms > self.reconnect_max_delay_ms {
            return Err(WsError::InvalidConfig(
                "reconnect_base_delay_ms exceeds reconnect_max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Feed address for a chain.
    pub fn feed_url(&self, chain_id: ChainId) -> String {
        self.url_template
            .replace(CHAIN_ID_PLACEHOLDER, &chain_id.to_string())
    }

    /// Subscribe request for a chain, if configured.
    pub fn subscribe_request(&self, chain_id: ChainId) -> Option<String> {
        self.subscribe_template
            .as_ref()
            .map(|t| t.replace(CHAIN_ID_PLACEHOLDER, &chain_id.to_string()))
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No chain subscribed.
    Idle,
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle | Self::Disconnected => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

/// Connection task for one chain and one subscription epoch.
pub struct FeedConnection {
    config: FeedConfig,
    chain_id: ChainId,
    epoch: u64,
    state: Arc<RwLock<ConnectionState>>,
    heartbeat: HeartbeatMonitor,
    frame_tx: mpsc::Sender<StreamFrame>,
    outbound_rx: mpsc::Receiver<String>,
    shutdown: CancellationToken,
}

/// Why the read loop ended.
enum LoopExit {
    /// Shutdown requested or the frame consumer is gone.
    Stop,
    /// Transport ended; reconnect.
    Disconnected,
}

impl FeedConnection {
    pub fn new(
        config: FeedConfig,
        chain_id: ChainId,
        epoch: u64,
        state: Arc<RwLock<ConnectionState>>,
        frame_tx: mpsc::Sender<StreamFrame>,
        outbound_rx: mpsc::Receiver<String>,
        shutdown: CancellationToken,
    ) -> Self {
        let heartbeat =
            HeartbeatMonitor::new(config.heartbeat_interval_ms, config.heartbeat_timeout_ms);
        Self {
            config,
            chain_id,
            epoch,
            state,
            heartbeat,
            frame_tx,
            outbound_rx,
            shutdown,
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        Metrics::ws_state_set(state.as_str());
    }

    /// Connect and keep the connection alive until cancelled.
    pub async fn run(mut self) -> WsResult<()> {
        let mut attempt = 0u32;

        let result = loop {
            if self.shutdown.is_cancelled() {
                break Ok(());
            }

            self.set_state(ConnectionState::Connecting);

            match self.try_connect().await {
                Ok(LoopExit::Stop) => break Ok(()),
                Ok(LoopExit::Disconnected) => {
                    // A session that got as far as reading resets the backoff
                    attempt = 0;
                    info!(chain_id = %self.chain_id, "Feed connection closed");
                    Metrics::ws_reconnect("closed");
                }
                Err(e) => {
                    error!(chain_id = %self.chain_id, error = %e, "Feed connection error");
                    Metrics::ws_reconnect(reconnect_reason(&e));
                }
            }
            Metrics::ws_disconnected();

            if self.shutdown.is_cancelled() {
                break Ok(());
            }

            attempt += 1;
            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(chain_id = %self.chain_id, attempt, "Max reconnection attempts reached");
                break Err(WsError::ConnectionFailed(
                    "Max reconnection attempts reached".to_string(),
                ));
            }

            self.set_state(ConnectionState::Reconnecting);
            let delay = self.calculate_backoff_delay(attempt);
            warn!(chain_id = %self.chain_id, attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown.cancelled() => break Ok(()),
            }
        };

        self.set_state(ConnectionState::Disconnected);
        Metrics::ws_disconnected();
        debug!(chain_id = %self.chain_id, epoch = self.epoch, "Feed connection task exiting");
        result
    }

    async fn try_connect(&mut self) -> WsResult<LoopExit> {
        let url = self.config.feed_url(self.chain_id);
        info!(chain_id = %self.chain_id, epoch = self.epoch, url = %url, "Connecting to gas feed");

        let (ws_stream, _response) = tokio::select! {
            res = connect_async_tls_with_config(url.as_str(), None, true, None) => res?,
            () = self.shutdown.cancelled() => return Ok(LoopExit::Stop),
        };
        let (mut write, mut read) = ws_stream.split();

        self.set_state(ConnectionState::Connected);
        Metrics::ws_connected();
        self.heartbeat.reset();
        info!(chain_id = %self.chain_id, "Gas feed connected");

        if let Some(request) = self.config.subscribe_request(self.chain_id) {
            write.send(Message::Text(request)).await?;
            debug!(chain_id = %self.chain_id, "Subscribe request sent");
        }

        let mut outbound_open = true;

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => {
                    debug!(chain_id = %self.chain_id, "Shutdown signal received in read loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(LoopExit::Stop);
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if !self.forward(text).await {
                                return Ok(LoopExit::Stop);
                            }
                        }
                        Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                            Ok(text) => {
                                if !self.forward(text).await {
                                    return Ok(LoopExit::Stop);
                                }
                            }
                            Err(_) => debug!("Dropping non-UTF-8 binary frame"),
                        },
                        Some(Ok(Message::Ping(data))) => {
                            self.heartbeat.record_message();
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.heartbeat.record_message();
                            self.heartbeat.record_pong();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Gas feed closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Gas feed read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("Gas feed stream ended");
                            return Ok(LoopExit::Disconnected);
                        }
                        _ => {}
                    }
                }

                outbound = self.outbound_rx.recv(), if outbound_open => {
                    match outbound {
                        Some(text) => write.send(Message::Text(text)).await?,
                        None => outbound_open = false,
                    }
                }

                () = tokio::time::sleep(self.heartbeat.check_interval()) => {
                    if self.heartbeat.is_timed_out() {
                        error!(chain_id = %self.chain_id, "Heartbeat timeout");
                        return Err(WsError::HeartbeatTimeout);
                    }
                    if self.heartbeat.should_send_ping() {
                        write.send(Message::Ping(Vec::new())).await?;
                        self.heartbeat.record_ping();
                        debug!("Sent heartbeat ping");
                    }
                }
            }
        }
    }

    /// Hand a frame to the consumer. Returns false when the consumer is gone.
    async fn forward(&mut self, text: String) -> bool {
        self.heartbeat.record_message();
        let frame = StreamFrame::new(self.epoch, self.chain_id, text);
        if self.frame_tx.send(frame).await.is_err() {
            warn!("Frame receiver dropped");
            return false;
        }
        true
    }

    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        backoff_delay(
            self.config.reconnect_base_delay_ms,
            self.config.reconnect_max_delay_ms,
            attempt,
        ) + Duration::from_millis(rand_jitter())
    }
}

/// Exponential backoff: base * 2^(attempt-1), capped at max.
fn backoff_delay(base_ms: u64, max_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let delay = base_ms.saturating_mul(1u64 << exponent).min(max_ms);
    Duration::from_millis(delay)
}

/// Generate random jitter (0-1000ms).
fn rand_jitter() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as u64
}

fn reconnect_reason(e: &WsError) -> &'static str {
    match e {
        WsError::ConnectionClosed { .. } => "closed",
        WsError::HeartbeatTimeout => "heartbeat_timeout",
        _ => "error",
    }
}
