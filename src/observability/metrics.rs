//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): proxied requests by method, status
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `backend_up` (gauge): 1 when a backend process is running
//! - `health_probes_total` (counter): probe outcomes by result
//!
//! # Design Decisions
//! - Metric updates are cheap (atomic operations); recording without an
//!   installed exporter is a no-op
//! - Exposition is Prometheus-compatible on its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::HealthStatus;
use crate::supervisor::BackendState;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "failed to install metrics exporter"),
    }
}

/// Record one proxied request.
pub fn record_proxy_request(method: &str, status: u16, start_time: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

/// Record a lifecycle state transition.
pub fn record_backend_state(state: BackendState) {
    let up = if state == BackendState::Running { 1.0 } else { 0.0 };
    gauge!("backend_up").set(up);
}

/// Record one health probe outcome.
pub fn record_probe(status: HealthStatus) {
    counter!("health_probes_total", "result" => status.as_str()).increment(1);
}
