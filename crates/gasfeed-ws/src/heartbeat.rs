//! Heartbeat tracking for a feed connection.
//!
//! A ping is only sent after `interval` of inbound silence, and the
//! connection is considered dead when its pong does not arrive within
//! `timeout`. Owned by the connection task, so no interior locking.

use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    timeout: Duration,
    last_ping: Option<Instant>,
    last_message: Instant,
    waiting_for_pong: bool,
}

impl HeartbeatMonitor {
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
            last_ping: None,
            last_message: Instant::now(),
            waiting_for_pong: false,
        }
    }

    /// Reset state after (re)connecting.
    pub fn reset(&mut self) {
        self.last_ping = None;
        self.last_message = Instant::now();
        self.waiting_for_pong = false;
    }

    pub fn record_ping(&mut self) {
        self.last_ping = Some(Instant::now());
        self.waiting_for_pong = true;
    }

    pub fn record_pong(&mut self) {
        self.waiting_for_pong = false;
        if let Some(sent) = self.last_ping {
            debug!(rtt_ms = sent.elapsed().as_millis() as u64, "Received pong");
        }
    }

    /// Any inbound traffic proves the connection is alive.
    pub fn record_message(&mut self) {
        self.last_message = Instant::now();
    }

    pub fn is_waiting_for_pong(&self) -> bool {
        self.waiting_for_pong
    }

    pub fn is_timed_out(&self) -> bool {
        match (self.waiting_for_pong, self.last_ping) {
            (true, Some(sent)) => sent.elapsed() > self.timeout,
            _ => false,
        }
    }

    pub fn should_send_ping(&self) -> bool {
        !self.waiting_for_pong && self.last_message.elapsed() >= self.interval
    }

    /// How often the connection loop should evaluate the heartbeat.
    pub fn check_interval(&self) -> Duration {
        (self.interval / 2).max(Duration::from_millis(10))
    }
}
