//! Metrics recording implementation using Prometheus.

use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry, Counter, CounterVec,
    Encoder, Histogram, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Trait for recording client metrics.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Records a completed API call with its outcome ("ok", "http_error", "transport_error", ...).
    fn record_request(&self, method: &str, outcome: &str);

    /// Records the end-to-end duration of an API call, including any refresh and replay.
    fn record_request_duration(&self, method: &str, duration_secs: f64);

    /// Records a settled refresh call ("success", "failure", "timeout").
    fn record_refresh(&self, result: &str);

    /// Records the duration of a refresh call.
    fn record_refresh_duration(&self, duration_secs: f64);

    /// Records a request parked behind an in-flight refresh.
    fn record_queued(&self);

    /// Records a replay of an original request after refresh.
    fn record_replay(&self, result: &str);
}

/// Prometheus metrics collector, one registry per client.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    // Request metrics
    requests_total: CounterVec,
    request_duration_seconds: HistogramVec,

    // Refresh metrics
    refresh_total: CounterVec,
    refresh_duration_seconds: Histogram,
    refresh_queued_total: Counter,
    replays_total: CounterVec,
}

impl Metrics {
    /// Creates a new metrics instance with a Prometheus registry.
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        let requests_total = register_counter_vec_with_registry!(
            Opts::new("api_requests_total", "Total number of API calls by outcome"),
            &["method", "outcome"],
            registry.clone()
        )
        .expect("Failed to register api_requests_total");

        let request_duration_seconds = register_histogram_vec_with_registry!(
            "api_request_duration_seconds",
            "API call duration in seconds, including refresh and replay",
            &["method"],
            vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
            registry.clone()
        )
        .expect("Failed to register api_request_duration_seconds");

        let refresh_total = register_counter_vec_with_registry!(
            Opts::new("session_refresh_total", "Total number of session refresh calls"),
            &["result"],
            registry.clone()
        )
        .expect("Failed to register session_refresh_total");

        let refresh_duration_seconds = register_histogram_with_registry!(
            "session_refresh_duration_seconds",
            "Session refresh duration in seconds",
            vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            registry.clone()
        )
        .expect("Failed to register session_refresh_duration_seconds");

        let refresh_queued_total = register_counter_with_registry!(
            Opts::new(
                "session_refresh_queued_total",
                "Requests that waited on an in-flight refresh"
            ),
            registry.clone()
        )
        .expect("Failed to register session_refresh_queued_total");

        let replays_total = register_counter_vec_with_registry!(
            Opts::new("request_replays_total", "Replays of requests after a refresh"),
            &["result"],
            registry.clone()
        )
        .expect("Failed to register request_replays_total");

        Metrics {
            registry,
            requests_total,
            request_duration_seconds,
            refresh_total,
            refresh_duration_seconds,
            refresh_queued_total,
            replays_total,
        }
    }

    /// Renders all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .expect("Failed to encode metrics");
        String::from_utf8(buffer).expect("Metrics encoding produced invalid UTF-8")
    }

    /// Current value of `session_refresh_total{result}`.
    pub fn refresh_count(&self, result: &str) -> u64 {
        self.refresh_total.with_label_values(&[result]).get() as u64
    }

    /// Current value of `session_refresh_queued_total`.
    pub fn queued_count(&self) -> u64 {
        self.refresh_queued_total.get() as u64
    }

    /// Current value of `request_replays_total{result}`.
    pub fn replay_count(&self, result: &str) -> u64 {
        self.replays_total.with_label_values(&[result]).get() as u64
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
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

    fn record_refresh_duration(&self, duration_secs: f64) {
        self.refresh_duration_seconds.observe(duration_secs);
    }

    fn record_queued(&self) {
        self.refresh_queued_total.inc();
    }

    fn record_replay(&self, result: &str) {
        self.replays_total.with_label_values(&[result]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_series() {
        let metrics = Metrics::new();
        metrics.record_request("GET", "ok");
        metrics.record_refresh("success");
        metrics.record_refresh_duration(0.2);
        metrics.record_queued();
        metrics.record_replay("ok");

        let rendered = metrics.render();
        assert!(rendered.contains("api_requests_total{method=\"GET\",outcome=\"ok\"} 1"));
        assert!(rendered.contains("session_refresh_total{result=\"success\"} 1"));
        assert!(rendered.contains("session_refresh_queued_total 1"));
        assert_eq!(metrics.refresh_count("success"), 1);
        assert_eq!(metrics.queued_count(), 1);
        assert_eq!(metrics.replay_count("ok"), 1);
    }

    #[test]
    fn test_registries_are_independent() {
        let first = Metrics::new();
        let second = Metrics::new();
        first.record_refresh("failure");
        assert_eq!(first.refresh_count("failure"), 1);
        assert_eq!(second.refresh_count("failure"), 0);
    }
}
