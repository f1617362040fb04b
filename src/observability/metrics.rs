//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define client metrics (calls, latency, retries, breaker state)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `client_requests_total` (counter): finished calls by method, outcome
//! - `client_request_duration_seconds` (histogram): end-to-end call latency
//! - `client_retries_total` (counter): retries by method
//! - `client_breaker_rejections_total` (counter): fail-fast rejections by breaker
//! - `client_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels for method, outcome kind, breaker name

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished call. `outcome` is "success" or an error kind label.
pub fn record_call(method: &str, outcome: &str, start: Instant) {
    counter!(
        "client_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!("client_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(method: &str) {
    counter!("client_retries_total", "method" => method.to_string()).increment(1);
}

pub fn record_breaker_rejection(breaker: &str) {
    counter!("client_breaker_rejections_total", "breaker" => breaker.to_string()).increment(1);
}

pub fn record_breaker_state(breaker: &str, state: CircuitState) {
    gauge!("client_breaker_state", "breaker" => breaker.to_string()).set(state as u8 as f64);
}
