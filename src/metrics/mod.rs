//! Metrics collection and exposition for Prometheus.
//!
//! Counts requests, token refreshes and sign-outs performed by the client.

mod recorder;

pub use recorder::{Metrics, MetricsRecorder};
