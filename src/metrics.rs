//! Prometheus metrics for storage latency and API activity.
//!
//! This module provides metrics for:
//! - Storage adapter operation latency
//! - Remote store (JSONBin) request latency
//! - Campaign and dedication mutations
//! - Validation and storage failures

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Storage adapter operation latency metric name.
pub const METRIC_STORAGE_OP_LATENCY: &str = "storage_op_latency_ms";
/// Remote store request latency metric name.
pub const METRIC_REMOTE_REQUEST_LATENCY: &str = "remote_request_latency_ms";
/// Campaign updates counter metric name.
pub const METRIC_CAMPAIGN_UPDATES: &str = "campaign_updates_total";
/// Dedications added counter metric name.
pub const METRIC_DEDICATIONS_ADDED: &str = "dedications_added_total";
/// Dedications updated counter metric name.
pub const METRIC_DEDICATIONS_UPDATED: &str = "dedications_updated_total";
/// Validation failures counter metric name.
pub const METRIC_VALIDATION_FAILURES: &str = "validation_failures_total";
/// Storage errors counter metric name.
pub const METRIC_STORAGE_ERRORS: &str = "storage_errors_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_STORAGE_OP_LATENCY,
        "Storage adapter operation latency in milliseconds"
    );
    describe_histogram!(
        METRIC_REMOTE_REQUEST_LATENCY,
        "Remote store HTTP request latency in milliseconds"
    );

    describe_counter!(METRIC_CAMPAIGN_UPDATES, "Total number of campaign updates");
    describe_counter!(METRIC_DEDICATIONS_ADDED, "Total number of dedications added");
    describe_counter!(
        METRIC_DEDICATIONS_UPDATED,
        "Total number of dedications updated"
    );
    describe_counter!(
        METRIC_VALIDATION_FAILURES,
        "Total number of requests rejected by validation"
    );
    describe_counter!(
        METRIC_STORAGE_ERRORS,
        "Total number of storage errors returned to clients"
    );

    debug!("Metrics initialized");
}

/// Install the Prometheus recorder and return a handle for rendering.
pub fn install_recorder() -> Result<PrometheusHandle, String> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| e.to_string())?;
    init_metrics();
    Ok(handle)
}

/// Record storage adapter operation latency.
pub fn record_storage_latency(start: Instant, op: &'static str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_STORAGE_OP_LATENCY, "op" => op).record(latency_ms);
}

/// Record remote store request latency.
pub fn record_remote_latency(start: Instant, method: &'static str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_REMOTE_REQUEST_LATENCY, "method" => method).record(latency_ms);
}

/// Increment campaign updates counter.
pub fn inc_campaign_updates() {
    counter!(METRIC_CAMPAIGN_UPDATES).increment(1);
}

/// Increment dedications added counter.
pub fn inc_dedications_added() {
    counter!(METRIC_DEDICATIONS_ADDED).increment(1);
}

/// Increment dedications updated counter.
pub fn inc_dedications_updated() {
    counter!(METRIC_DEDICATIONS_UPDATED).increment(1);
}

/// Increment validation failures counter.
pub fn inc_validation_failures(endpoint: &'static str) {
    counter!(METRIC_VALIDATION_FAILURES, "endpoint" => endpoint).increment(1);
}

/// Increment storage errors counter.
pub fn inc_storage_errors() {
    counter!(METRIC_STORAGE_ERRORS).increment(1);
}
