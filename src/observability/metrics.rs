//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_tracker_inflight_requests` (gauge): requests currently registered,
//!   summed over every tracker in the process
//!
//! The gauge moves by deltas so that independent trackers add up and
//! concurrent updates commute.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const INFLIGHT_REQUESTS: &str = "http_tracker_inflight_requests";

/// A request entered a registry.
pub fn request_registered() {
    metrics::gauge!(INFLIGHT_REQUESTS).increment(1.0);
}

/// A request left a registry.
pub fn request_released() {
    metrics::gauge!(INFLIGHT_REQUESTS).decrement(1.0);
}

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    metrics::describe_gauge!(INFLIGHT_REQUESTS, "HTTP client requests currently in flight");
    tracing::info!(address = %addr, "Metrics endpoint installed");
    Ok(())
}
