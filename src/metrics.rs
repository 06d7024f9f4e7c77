// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for kube-phpipam.
//!
//! All metrics carry the `kube_phpipam_` prefix and are registered in
//! [`METRICS_REGISTRY`], served on `GET /metrics`.
//!
//! # Metrics Categories
//!
//! - **Event Metrics** - Service events handled and their duration
//! - **Registry Metrics** - phpIPAM calls by operation and outcome, token renewals
//! - **Error Metrics** - Errors by resource and category
//! - **Ownership Metrics** - Addresses currently tracked by the ownership cache
//!
//! # Example
//!
//! ```rust,no_run
//! use kube_phpipam::metrics::{gather_metrics, record_registry_operation};
//!
//! record_registry_operation("create", "success");
//! let text = gather_metrics().unwrap();
//! ```

use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all metrics
const METRICS_NAMESPACE: &str = "kube_phpipam";

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Event Metrics
// ============================================================================

/// Total number of Service events handled
///
/// Labels:
/// - `kind`: `upserted` or `removed`
pub static EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_events_total"),
        "Total number of Service events handled by kind",
    );
    let counter = CounterVec::new(opts, &["kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Time spent handling one Service event, registry calls included
pub static EVENT_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_event_duration_seconds"),
        "Duration of Service event handling in seconds by kind",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]);
    let histogram = HistogramVec::new(opts, &["kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Registry Metrics
// ============================================================================

/// Total number of phpIPAM operations
///
/// Labels:
/// - `operation`: `lookup_subnet`, `lookup`, `create`, `update`, `delete`
/// - `outcome`: `success` or `error`
pub static REGISTRY_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_registry_operations_total"),
        "Total number of phpIPAM operations by operation and outcome",
    );
    let counter = CounterVec::new(opts, &["operation", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of phpIPAM token renewals
///
/// Labels:
/// - `outcome`: `success` or `error`
pub static TOKEN_RENEWALS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_token_renewals_total"),
        "Total number of phpIPAM token renewals by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors
///
/// Labels:
/// - `resource`: where the error surfaced (`config`, `subnet`, `reservation`, `watch`)
/// - `category`: `configuration`, `transport`, `auth`, `application`, `consistency`, `not_found`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by resource and category",
    );
    let counter = CounterVec::new(opts, &["resource", "category"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Ownership Metrics
// ============================================================================

/// Number of addresses currently held in the ownership cache
pub static OWNED_ADDRESSES: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_owned_addresses"),
        "Number of addresses currently tracked in the ownership cache",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a handled Service event
///
/// # Arguments
/// * `kind` - `upserted` or `removed`
pub fn record_event(kind: &str) {
    EVENTS_TOTAL.with_label_values(&[kind]).inc();
}

/// Record how long a Service event took to handle
pub fn record_event_duration(kind: &str, duration: Duration) {
    EVENT_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(duration.as_secs_f64());
}

/// Record a phpIPAM call
///
/// # Arguments
/// * `operation` - Registry operation (e.g., `create`, `delete`)
/// * `outcome` - `success` or `error`
pub fn record_registry_operation(operation: &str, outcome: &str) {
    REGISTRY_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Record a token renewal attempt
pub fn record_token_renewal(outcome: &str) {
    TOKEN_RENEWALS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record an error
///
/// # Arguments
/// * `resource` - Where the error surfaced
/// * `category` - Error category, as returned by the error's `category()`
pub fn record_error(resource: &str, category: &str) {
    ERRORS_TOTAL.with_label_values(&[resource, category]).inc();
}

/// Publish the current ownership cache size
#[allow(clippy::cast_precision_loss)]
pub fn set_owned_addresses(count: usize) {
    OWNED_ADDRESSES.set(count as f64);
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
