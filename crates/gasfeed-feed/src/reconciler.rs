//! Subscription-aware reconciler.
//!
//! Owns the message history for the current chain and publishes an
//! immutable `Arc<MessageHistory>` after every change. A chain switch bumps
//! the epoch and clears the history in one step; frames carrying an older
//! epoch are rejected, so a frame from the previous chain can never land
//! in the new chain's history even if it was already queued.

use crate::history::{MessageHistory, ReconcileOutcome};
use crate::message::StreamMessage;
use gasfeed_core::ChainId;
use gasfeed_telemetry::Metrics;
use gasfeed_ws::StreamFrame;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Outcome of applying one raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Reconciled(ReconcileOutcome),
    /// Frame belongs to a superseded subscription.
    Stale,
    /// Frame was not valid JSON of the expected shape.
    Undecodable,
}

impl FrameOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reconciled(outcome) => outcome.as_str(),
            Self::Stale => "stale",
            Self::Undecodable => "undecodable",
        }
    }
}

pub struct Reconciler {
    chain_id: Option<ChainId>,
    epoch: u64,
    current: Arc<MessageHistory>,
    /// Template for fresh histories (carries the bound).
    empty: MessageHistory,
    tx: watch::Sender<Arc<MessageHistory>>,
}

impl Reconciler {
    /// Create an unsubscribed reconciler.
    ///
    /// Returns the reconciler and a receiver of published histories.
    pub fn new(max_entries: Option<usize>) -> (Self, watch::Receiver<Arc<MessageHistory>>) {
        let empty = match max_entries {
            Some(max) => MessageHistory::bounded(max),
            None => MessageHistory::new(),
        };
        let current = Arc::new(empty.clone());
        let (tx, rx) = watch::channel(current.clone());

        (
            Self {
                chain_id: None,
                epoch: 0,
                current,
                empty,
                tx,
            },
            rx,
        )
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        self.chain_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Latest published history.
    pub fn history(&self) -> Arc<MessageHistory> {
        self.current.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<MessageHistory>> {
        self.tx.subscribe()
    }

    /// Switch the subscription target.
    ///
    /// Clears the history and publishes the empty history before returning.
    /// Returns the new epoch, which the caller tags the new connection with.
    pub fn switch_chain(&mut self, chain_id: Option<ChainId>) -> u64 {
        self.epoch += 1;
        self.chain_id = chain_id;
        self.publish(Arc::new(self.empty.clone()));

        Metrics::chain_switched();
        info!(
            chain_id = ?chain_id.map(|c| c.value()),
            epoch = self.epoch,
            "Subscription target changed, history cleared"
        );
        self.epoch
    }

    /// Decode and reconcile one raw frame.
    pub fn apply_frame(&mut self, frame: &StreamFrame) -> FrameOutcome {
        let outcome = if frame.epoch != self.epoch || Some(frame.chain_id) != self.chain_id {
            trace!(
                frame_epoch = frame.epoch,
                epoch = self.epoch,
                "Discarding frame from superseded subscription"
            );
            FrameOutcome::Stale
        } else {
            match StreamMessage::decode(&frame.text) {
                Ok(message) => FrameOutcome::Reconciled(self.apply_message(message)),
                Err(e) => {
                    debug!(error = %e, "Dropping undecodable frame");
                    FrameOutcome::Undecodable
                }
            }
        };

        Metrics::feed_frame(outcome.as_str());
        outcome
    }

    /// Reconcile an already decoded message into the current history.
    pub fn apply_message(&mut self, message: StreamMessage) -> ReconcileOutcome {
        let mut next = MessageHistory::clone(&self.current);
        let outcome = next.reconcile(message);
        if outcome.changed() {
            self.publish(Arc::new(next));
        }
        outcome
    }

    fn publish(&mut self, history: Arc<MessageHistory>) {
        Metrics::history_entries(history.len());
        self.current = history.clone();
        self.tx.send_replace(history);
    }
}
