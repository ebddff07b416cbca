//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define compiler metrics (builds, durations, table sizes)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `route_compiler_builds_total` (counter): builds by outcome
//! - `route_compiler_build_duration_seconds` (histogram): build latency
//! - `route_compiler_virtual_hosts` (gauge): virtual hosts in the last good build
//! - `route_compiler_routes` (gauge): routes in the last good build
//! - `route_compiler_publishes_total` (counter): publish attempts by outcome
//! - `route_compiler_config_version` (gauge): currently published version

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::builder::CompiledConfig;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, address = %addr, "Failed to install metrics exporter"),
    }
}

fn outcome_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

/// Record one build attempt.
pub fn record_build(success: bool, started: Instant) {
    let outcome = outcome_label(success);
    metrics::counter!("route_compiler_builds_total", "outcome" => outcome).increment(1);
    metrics::histogram!("route_compiler_build_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}

/// Record the size of a successful build.
pub fn record_compiled(compiled: &CompiledConfig) {
    let routes = &compiled.route_configuration;
    metrics::gauge!("route_compiler_virtual_hosts").set(routes.virtual_hosts.len() as f64);
    metrics::gauge!("route_compiler_routes").set(routes.route_count() as f64);
}

/// Record one publish attempt and, on success, the live version.
pub fn record_publish(success: bool, version: u64) {
    metrics::counter!("route_compiler_publishes_total", "outcome" => outcome_label(success)).increment(1);
    if success {
        metrics::gauge!("route_compiler_config_version").set(version as f64);
    }
}
