//! Metrics collection and exposition.
//!
//! # Metrics
//! - `carddav_requests_total` (counter): requests by method, status
//! - `carddav_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Prometheus exposition on a dedicated listener, separate from the
//!   protocol port
//! - Label cardinality is bounded: method and status only, never paths

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "carddav_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "carddav_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}
