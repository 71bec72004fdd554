//! Native token gas-price service.
//!
//! `NativeTokenRates` runs three tasks:
//! - the rate poller, publishing token USD snapshots
//! - the frame pump, reconciling feed frames into the message history
//! - the composer, republishing the joined per-chain view whenever either
//!   input changes
//!
//! The stream handle and the reconciler sit behind one lock. A chain switch
//! closes the old connection, clears the history and opens the new
//! connection while holding it, so the pump can never reconcile a frame
//! between those steps.

use crate::config::AppConfig;
use crate::error::AppResult;
use gasfeed_core::{ChainGasPrice, ChainId, TokenRateSnapshot};
use gasfeed_feed::{MessageHistory, Reconciler, ViewComposer};
use gasfeed_registry::{RateClient, RatePoller, RateReceivers, RateSource};
use gasfeed_ws::{GasStream, StreamFrame, StreamHandle, WsError, WsResult};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Inbound frame queue depth shared by all connections.
const FRAME_BUFFER: usize = 1024;

/// Published per-chain view. `None` until a snapshot and at least one
/// reconciled message exist.
pub type GasPriceView = Option<Arc<Vec<ChainGasPrice>>>;

struct Subscription {
    handle: StreamHandle,
    reconciler: Reconciler,
}

pub struct NativeTokenRates {
    stream: GasStream,
    subscription: Arc<Mutex<Subscription>>,
    rates: RateReceivers,
    history: watch::Receiver<Arc<MessageHistory>>,
    composer: Arc<Mutex<ViewComposer>>,
    output: watch::Receiver<GasPriceView>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl NativeTokenRates {
    /// Start against the configured rates endpoint.
    pub async fn start(config: AppConfig) -> AppResult<Self> {
        let client = RateClient::new(config.rates.url.clone(), config.rates.timeout())?;
        Self::start_with_source(config, Arc::new(client)).await
    }

    /// Start with a caller-provided rate source.
    pub async fn start_with_source<S: RateSource>(
        config: AppConfig,
        source: Arc<S>,
    ) -> AppResult<Self> {
        config.validate()?;

        let shutdown = CancellationToken::new();
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER);
        let stream = GasStream::new(config.stream.clone(), frame_tx)?;

        let (reconciler, history) = Reconciler::new(config.history.max_entries);
        let subscription = Arc::new(Mutex::new(Subscription {
            handle: StreamHandle::idle(reconciler.epoch()),
            reconciler,
        }));

        let (poller, rates) = RatePoller::new(source, config.rates.poll_interval());
        let composer = Arc::new(Mutex::new(ViewComposer::new()));
        let (output_tx, output) = watch::channel(None);

        let tasks = vec![
            tokio::spawn(poller.run(shutdown.child_token())),
            tokio::spawn(run_frame_pump(
                frame_rx,
                subscription.clone(),
                shutdown.child_token(),
            )),
            tokio::spawn(run_composer(
                rates.clone(),
                history.clone(),
                composer.clone(),
                output_tx,
                shutdown.child_token(),
            )),
        ];

        let service = Self {
            stream,
            subscription,
            rates,
            history,
            composer,
            output,
            shutdown,
            tasks,
        };

        if let Some(chain_id) = config.initial_chain() {
            service.set_chain(Some(chain_id));
        }

        info!(chain_id = ?config.chain_id, "NativeTokenRates started");
        Ok(service)
    }

    /// Current per-chain view, computed from whatever is currently held.
    pub fn data(&self) -> GasPriceView {
        let rates = self.rates.snapshot.borrow().clone();
        let history = self.history.borrow().clone();
        self.composer.lock().data(rates.as_ref(), &history)
    }

    /// True while a rate snapshot fetch is in flight.
    pub fn loading(&self) -> bool {
        *self.rates.loading.borrow()
    }

    /// True when the feed connection for the current chain is up.
    pub fn connected(&self) -> bool {
        self.subscription.lock().handle.is_connected()
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        self.subscription.lock().reconciler.chain_id()
    }

    /// Latest rate snapshot, if any fetch has succeeded.
    pub fn rate_snapshot(&self) -> Option<Arc<TokenRateSnapshot>> {
        self.rates.snapshot.borrow().clone()
    }

    /// Latest reconciled message history for the current chain.
    pub fn history(&self) -> Arc<MessageHistory> {
        self.history.borrow().clone()
    }

    /// Receiver of every republished view.
    pub fn subscribe(&self) -> watch::Receiver<GasPriceView> {
        self.output.clone()
    }

    /// Switch the subscription target.
    ///
    /// On return the old connection is cancelled, the history is empty and
    /// the new connection (if any) is opening. Re-selecting the current
    /// chain is a no-op. Must be called from within a tokio runtime.
    pub fn set_chain(&self, chain_id: Option<ChainId>) {
        let mut subscription = self.subscription.lock();
        if subscription.reconciler.chain_id() == chain_id {
            debug!(chain_id = ?chain_id.map(|c| c.value()), "Chain unchanged, keeping subscription");
            return;
        }
        subscription.handle.close();
        let epoch = subscription.reconciler.switch_chain(chain_id);
        subscription.handle = self.stream.open(chain_id, epoch);
    }

    /// Send an outbound control frame on the current connection.
    pub async fn send_message(&self, text: impl Into<String>) -> WsResult<()> {
        let writer = self.subscription.lock().handle.writer();
        match writer {
            Some(writer) => writer.send_text(text).await,
            None => Err(WsError::NotConnected),
        }
    }

    /// Stop all tasks and close the connection.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        self.subscription.lock().handle.close();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        info!("NativeTokenRates stopped");
    }
}

impl Drop for NativeTokenRates {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_frame_pump(
    mut frame_rx: mpsc::Receiver<StreamFrame>,
    subscription: Arc<Mutex<Subscription>>,
    shutdown: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = frame_rx.recv() => frame,
        };
        let Some(frame) = frame else {
            break;
        };

        let outcome = subscription.lock().reconciler.apply_frame(&frame);
        debug!(
            chain_id = %frame.chain_id,
            epoch = frame.epoch,
            outcome = outcome.as_str(),
            "Frame applied"
        );
    }
    debug!("Frame pump stopped");
}

async fn run_composer(
    mut rates: RateReceivers,
    mut history: watch::Receiver<Arc<MessageHistory>>,
    composer: Arc<Mutex<ViewComposer>>,
    output_tx: watch::Sender<GasPriceView>,
    shutdown: CancellationToken,
) {
    loop {
        let snapshot = rates.snapshot.borrow_and_update().clone();
        let current = history.borrow_and_update().clone();
        let next = composer.lock().data(snapshot.as_ref(), &current);

        output_tx.send_if_modified(|published| {
            let same = match (published.as_ref(), next.as_ref()) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            };
            if !same {
                *published = next;
            }
            !same
        });

        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = rates.snapshot.changed() => if changed.is_err() { break },
            changed = history.changed() => if changed.is_err() { break },
        }
    }
    debug!("Composer stopped");
}
