//! Prometheus metrics for devforward.
//!
//! Tracks dispatch decisions and remote forwarding latency.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use tracing::error;

lazy_static! {
    /// Dispatch decisions, by mode and outcome
    pub static ref DISPATCH_TOTAL: CounterVec = register_counter_vec!(
        "devforward_dispatch_total",
        "Total number of requests dispatched by the forwarding middleware",
        &["mode", "outcome"]
    )
    .expect("devforward_dispatch_total registers once");

    /// Remote request duration
    pub static ref UPSTREAM_DURATION_MS: HistogramVec = register_histogram_vec!(
        "devforward_upstream_duration_ms",
        "Duration of requests forwarded to the remote server",
        &["status"],  // status: numeric code, or "error" on transport failure
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .expect("devforward_upstream_duration_ms registers once");
}

/// What the middleware did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    PassThrough,
    Rewrite,
    MockHit,
    MockMiss,
    MockError,
    Forwarded,
    ForwardError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::PassThrough => "pass_through",
            Outcome::Rewrite => "rewrite",
            Outcome::MockHit => "mock_hit",
            Outcome::MockMiss => "mock_miss",
            Outcome::MockError => "mock_error",
            Outcome::Forwarded => "forwarded",
            Outcome::ForwardError => "forward_error",
        }
    }
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn record_dispatch(mode: &str, outcome: Outcome) {
    DISPATCH_TOTAL
        .with_label_values(&[mode, outcome.as_str()])
        .inc();
}

pub fn record_upstream_duration(status: &str, duration_ms: f64) {
    UPSTREAM_DURATION_MS
        .with_label_values(&[status])
        .observe(duration_ms);
}
