//! Metrics recording implementation using Prometheus.

use prometheus::{
    register_counter_vec_with_registry, register_histogram_vec_with_registry, CounterVec,
    Encoder, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Trait for recording client metrics.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Records a finished request with its final outcome.
    fn record_request(&self, method: &str, outcome: &str);

    /// Records the wall time of a request, replays included.
    fn record_request_duration(&self, method: &str, duration_secs: f64);

    /// Records a token refresh call and how it ended.
    fn record_refresh(&self, result: &str);

    /// Records a sign-out and what triggered it.
    fn record_sign_out(&self, reason: &str);
}

/// Prometheus metrics collector.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    requests_total: CounterVec,
    request_duration_seconds: HistogramVec,

    refresh_total: CounterVec,
    sign_outs_total: CounterVec,
}

impl Metrics {
    /// Creates a new metrics instance with its own Prometheus registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Arc::new(Registry::new());

        let requests_total = register_counter_vec_with_registry!(
            Opts::new("client_requests_total", "Total API requests by final outcome"),
            &["method", "outcome"],
            registry.clone()
        )?;

        let request_duration_seconds = register_histogram_vec_with_registry!(
            "client_request_duration_seconds",
            "API request duration in seconds, including refresh and replay",
            &["method"],
            vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
            registry.clone()
        )?;

        let refresh_total = register_counter_vec_with_registry!(
            Opts::new("client_refresh_total", "Token refresh calls by result"),
            &["result"],
            registry.clone()
        )?;

        let sign_outs_total = register_counter_vec_with_registry!(
            Opts::new("client_sign_outs_total", "Sign-outs by reason"),
            &["reason"],
            registry.clone()
        )?;

        Ok(Metrics {
            registry,
            requests_total,
            request_duration_seconds,
            refresh_total,
            sign_outs_total,
        })
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Current value of `client_refresh_total{result}`.
    pub fn refresh_count(&self, result: &str) -> u64 {
        self.refresh_total.with_label_values(&[result]).get() as u64
    }

    /// Current value of `client_sign_outs_total{reason}`.
    pub fn sign_out_count(&self, reason: &str) -> u64 {
        self.sign_outs_total.with_label_values(&[reason]).get() as u64
    }
}

impl MetricsRecorder for Metrics {
    fn record_request(&self, method: &str, outcome: &str) {
        self.requests_total
            .with_label_values(&[method, outcome])
            .inc();
    }

    fn record_request_duration(&self, method: &str, duration_secs: f64) {
        self.request_duration_seconds
            .with_label_values(&[method])
            .observe(duration_secs);
    }

    fn record_refresh(&self, result: &str) {
        self.refresh_total.with_label_values(&[result]).inc();
    }

    fn record_sign_out(&self, reason: &str) {
        self.sign_outs_total.with_label_values(&[reason]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_rendered() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("GET", "ok");
        metrics.record_refresh("success");
        metrics.record_sign_out("forbidden");
        metrics.record_request_duration("GET", 0.02);

        assert_eq!(metrics.refresh_count("success"), 1);
        assert_eq!(metrics.sign_out_count("forbidden"), 1);

        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("client_requests_total"));
        assert!(rendered.contains("client_sign_outs_total{reason=\"forbidden\"} 1"));
    }
}
