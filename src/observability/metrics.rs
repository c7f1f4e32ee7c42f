//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rpc_endpoint_attempts_total` (counter): attempts by endpoint, outcome
//! - `rpc_endpoint_latency_ms` (histogram): successful attempt latency by endpoint
//! - `rpc_endpoint_healthy` (gauge): 1=healthy, 0=unhealthy
//! - `rpc_errors_total` (counter): tracked errors by kind
//! - `cache_lookups_total` (counter): cache lookups by outcome
//! - `cache_entries` (gauge): keys currently held
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an exporter is installed
//! - Prometheus exporter is opt-in via configuration

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::tracker::types::ErrorKind;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus exporter"),
    }
}

/// Record one resolved endpoint attempt.
pub fn record_endpoint_attempt(endpoint: &str, outcome: &'static str, latency_ms: Option<f64>) {
    counter!(
        "rpc_endpoint_attempts_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    if let Some(latency) = latency_ms {
        histogram!("rpc_endpoint_latency_ms", "endpoint" => endpoint.to_string()).record(latency);
    }
}

/// Record the current health judgement for an endpoint.
pub fn record_endpoint_health(endpoint: &str, healthy: bool) {
    gauge!("rpc_endpoint_healthy", "endpoint" => endpoint.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

/// Record a tracked error.
pub fn record_error(kind: ErrorKind) {
    counter!("rpc_errors_total", "kind" => kind.as_str()).increment(1);
}

/// Record a cache lookup outcome (`fresh`, `stale`, `miss`, `joined`).
pub fn record_cache_lookup(outcome: &'static str) {
    counter!("cache_lookups_total", "outcome" => outcome).increment(1);
}

/// Record how many keys the cache holds.
pub fn record_cache_size(size: usize) {
    gauge!("cache_entries").set(size as f64);
}
