//! Prometheus metrics and structured logging for gasfeed.
//!
//! - Structured logging with tracing (JSON in production)
//! - Prometheus counters for stream frames, chain switches and rate polls

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
