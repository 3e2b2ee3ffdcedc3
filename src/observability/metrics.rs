//! Metrics collection and exposition.
//!
//! # Metrics
//! - `web_requests_total` (counter): requests by mount kind and status
//! - `web_request_duration_seconds` (histogram): latency by mount kind
//! - `web_registrations_total` (counter): committed registrations by kind
//! - `web_registration_conflicts_total` (counter): rejected registrations
//! - `web_server_running` (gauge): 1 while started, 0 otherwise

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(kind: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "web_requests_total",
        "kind" => kind,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("web_request_duration_seconds", "kind" => kind)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_registration(kind: &'static str) {
    metrics::counter!("web_registrations_total", "kind" => kind).increment(1);
}

pub fn record_conflict() {
    metrics::counter!("web_registration_conflicts_total").increment(1);
}

pub fn record_running(running: bool) {
    metrics::gauge!("web_server_running").set(if running { 1.0 } else { 0.0 });
}
