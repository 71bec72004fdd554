//! Prometheus metrics for gasfeed.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`: a registration failure means a
//! duplicate metric name, which is a programming error caught at first use.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_int_counter,
    register_int_gauge, CounterVec, Gauge, GaugeVec, IntCounter, IntGauge,
};

/// Stream connection state (1 = connected, 0 = disconnected).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "gasfeed_ws_connected",
        "Gas stream connection state (1=connected)"
    )
    .unwrap()
});

/// Stream state machine current state.
/// Labels: state (idle/connecting/connected/reconnecting)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "gasfeed_ws_state",
        "Gas stream state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Total stream reconnection attempts.
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gasfeed_ws_reconnect_total",
        "Total gas stream reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Stream frames by reconciliation outcome.
/// Labels: outcome (appended/replaced/unchanged/dropped/stale/undecodable)
pub static FEED_FRAMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gasfeed_feed_frames_total",
        "Gas stream frames by reconciliation outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Entries currently held in the message history.
pub static HISTORY_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "gasfeed_history_entries",
        "Entries in the reconciled message history"
    )
    .unwrap()
});

/// Total subscription target changes.
pub static CHAIN_SWITCH_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "gasfeed_chain_switch_total",
        "Total gas stream chain switches"
    )
    .unwrap()
});

/// Rate snapshot polls by result.
/// Labels: result (ok/error)
pub static RATE_POLL_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gasfeed_rate_poll_total",
        "Rate snapshot polls by result",
        &["result"]
    )
    .unwrap()
});

/// Chains present in the latest rate snapshot.
pub static RATE_SNAPSHOT_CHAINS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "gasfeed_rate_snapshot_chains",
        "Chains present in the latest rate snapshot"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record stream connected.
    pub fn ws_connected() {
        WS_CONNECTED.set(1.0);
    }

    /// Record stream disconnected.
    pub fn ws_disconnected() {
        WS_CONNECTED.set(0.0);
    }

    /// Set stream state machine state.
    /// Only the active state is set to 1.
    pub fn ws_state_set(state: &str) {
        for s in &["idle", "connecting", "connected", "reconnecting"] {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
    }

    /// Record stream reconnection.
    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a reconciled (or rejected) stream frame.
    pub fn feed_frame(outcome: &str) {
        FEED_FRAMES_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Set current history size.
    pub fn history_entries(count: usize) {
        HISTORY_ENTRIES.set(count as i64);
    }

    /// Record a subscription target change.
    pub fn chain_switched() {
        CHAIN_SWITCH_TOTAL.inc();
    }

    /// Record a successful rate poll.
    pub fn rate_poll_ok(chains: usize) {
        RATE_POLL_TOTAL.with_label_values(&["ok"]).inc();
        RATE_SNAPSHOT_CHAINS.set(chains as i64);
    }

    /// Record a failed rate poll.
    pub fn rate_poll_failed() {
        RATE_POLL_TOTAL.with_label_values(&["error"]).inc();
    }
}
