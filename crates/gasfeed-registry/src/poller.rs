//! Periodic rate snapshot polling.
//!
//! `RatePoller` fetches from a `RateSource` on a fixed interval and
//! publishes each successful snapshot wholesale. Failures are logged and
//! counted; the previously published snapshot stays in place.

use crate::client::RateSource;
use gasfeed_core::TokenRateSnapshot;
use gasfeed_telemetry::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Receiving side of a poller's published values.
#[derive(Debug, Clone)]
pub struct RateReceivers {
    /// Latest successful snapshot, `None` until the first one lands.
    pub snapshot: watch::Receiver<Option<Arc<TokenRateSnapshot>>>,
    /// True while a fetch is in flight.
    pub loading: watch::Receiver<bool>,
}

/// Poll loop for rate snapshots.
pub struct RatePoller<S: RateSource> {
    source: Arc<S>,
    interval: Duration,
    snapshot_tx: watch::Sender<Option<Arc<TokenRateSnapshot>>>,
    loading_tx: watch::Sender<bool>,
}

impl<S: RateSource> RatePoller<S> {
    pub fn new(source: Arc<S>, interval: Duration) -> (Self, RateReceivers) {
        let (snapshot_tx, snapshot) = watch::channel(None);
        let (loading_tx, loading) = watch::channel(false);

        let poller = Self {
            source,
            interval,
            snapshot_tx,
            loading_tx,
        };
        (poller, RateReceivers { snapshot, loading })
    }

    /// Run one fetch and publish the result.
    ///
    /// Returns `true` if a new snapshot was published.
    pub async fn poll_once(&self) -> bool {
        self.loading_tx.send_replace(true);
        let result = self.source.fetch().await;
        self.loading_tx.send_replace(false);

        match result {
            Ok(snapshot) => {
                let chains = snapshot.len();
                debug!(chains, "Rate snapshot fetched");
                Metrics::rate_poll_ok(chains);
                self.snapshot_tx.send_replace(Some(Arc::new(snapshot)));
                true
            }
            Err(e) => {
                warn!(error = %e, "Rate snapshot fetch failed, keeping previous snapshot");
                Metrics::rate_poll_failed();
                false
            }
        }
    }

    /// Poll until `shutdown` is cancelled. The first fetch happens
    /// immediately.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "Rate poller started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.poll_once() => {}
            }
        }

        self.loading_tx.send_replace(false);
        info!("Rate poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RegistryError, RegistryResult};
    use gasfeed_core::ChainId;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex;

    /// Returns scripted results in order, then errors.
    struct ScriptedSource {
        script: Mutex<VecDeque<RegistryResult<TokenRateSnapshot>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedSource {
        fn new(script: Vec<RegistryResult<TokenRateSnapshot>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }
    }

    impl RateSource for ScriptedSource {
        fn fetch(&self) -> impl Future<Output = RegistryResult<TokenRateSnapshot>> + Send {
            *self.calls.lock().unwrap() += 1;
            let next = self.script.lock().unwrap().pop_front();
            async move {
                next.unwrap_or_else(|| Err(RegistryError::HttpClient("script exhausted".to_string())))
            }
        }
    }

    fn snapshot(usd: f64) -> TokenRateSnapshot {
        TokenRateSnapshot::from_pairs([(ChainId::new(1), usd)])
    }

    #[tokio::test]
    async fn test_success_replaces_snapshot() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(snapshot(3000.0)), Ok(snapshot(3100.0))]));
        let (poller, rx) = RatePoller::new(source, Duration::from_secs(60));

        assert!(rx.snapshot.borrow().is_none());

        assert!(poller.poll_once().await);
        assert_eq!(
            rx.snapshot.borrow().as_ref().unwrap().get(ChainId::new(1)).unwrap().usd,
            3000.0
        );

        assert!(poller.poll_once().await);
        assert_eq!(
            rx.snapshot.borrow().as_ref().unwrap().get(ChainId::new(1)).unwrap().usd,
            3100.0
        );
        assert!(!*rx.loading.borrow());
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_snapshot() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(snapshot(3000.0)),
            Err(RegistryError::HttpClient("boom".to_string())),
        ]));
        let (poller, rx) = RatePoller::new(source, Duration::from_secs(60));

        assert!(poller.poll_once().await);
        let first = rx.snapshot.borrow().clone().unwrap();

        assert!(!poller.poll_once().await);
        let after = rx.snapshot.borrow().clone().unwrap();
        assert!(Arc::ptr_eq(&first, &after));
        assert!(!*rx.loading.borrow());
    }

    #[tokio::test]
    async fn test_snapshot_is_replaced_wholesale() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(TokenRateSnapshot::from_pairs([
                (ChainId::new(1), 3000.0),
                (ChainId::new(137), 0.7),
            ])),
            Ok(snapshot(3000.0)),
        ]));
        let (poller, rx) = RatePoller::new(source, Duration::from_secs(60));

        poller.poll_once().await;
        poller.poll_once().await;

        let current = rx.snapshot.borrow().clone().unwrap();
        assert!(current.get(ChainId::new(137)).is_none());
        assert_eq!(current.len(), 1);
    }

    #[tokio::test]
    async fn test_run_polls_immediately_and_stops_on_cancel() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(snapshot(3000.0))]));
        let (poller, mut rx) = RatePoller::new(source.clone(), Duration::from_secs(3600));
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(poller.run(shutdown.clone()));

        tokio::time::timeout(Duration::from_secs(5), rx.snapshot.changed())
            .await
            .expect("first poll")
            .unwrap();
        assert!(rx.snapshot.borrow().is_some());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("poller stops")
            .unwrap();
        assert_eq!(*source.calls.lock().unwrap(), 1);
    }
}
