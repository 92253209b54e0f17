//! Metrics collection and exposition.
//!
//! # Metrics
//! - `intercept_requests_total` (counter): requests by method, status, outcome
//!   (`local`, `forward`, `forward_error`, `fallback`)
//! - `intercept_request_duration_seconds` (histogram): latency by outcome
//! - `intercept_handler_failures_total` (counter): failed handlers by kind
//!   (`error`, `panic`, `timeout`)

use std::net::SocketAddr;
use std::time::Instant;
use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter, serving scrapes on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one resolved request event. `status` is 0 when no response exists.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    counter!(
        "intercept_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("intercept_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_handler_failure(kind: &'static str) {
    counter!("intercept_handler_failures_total", "kind" => kind).increment(1);
}
