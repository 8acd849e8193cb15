// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Route53 DNS operator.
//!
//! All metrics carry the namespace prefix `route53_dns_operator_` and are
//! registered in [`METRICS_REGISTRY`], which the `/metrics` endpoint encodes.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - reconciliations by operation and outcome, and their duration
//! - **Provider Metrics** - Route53 requests by operation and outcome, and their latency
//! - **Cache Metrics** - entries, bytes, hits and misses of the shared cache
//!
//! # Example
//!
//! ```rust,no_run
//! use route53_dns_operator::metrics::record_reconciliation;
//!
//! record_reconciliation("reconcile", "success", std::time::Duration::from_millis(120));
//! ```

use crate::cache::CacheStats;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "route53_dns_operator";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by operation and outcome
///
/// Labels:
/// - `operation`: `reconcile` or `delete`
/// - `outcome`: `success`, `not_ready`, `throttled` or `error`
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by operation and outcome",
    );
    let counter = CounterVec::new(opts, &["operation", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `operation`: `reconcile` or `delete`
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by operation",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Provider Metrics
// ============================================================================

/// Total number of Route53 requests by operation and outcome
///
/// Labels:
/// - `operation`: provider operation (e.g., `ChangeResourceRecordSets`)
/// - `outcome`: `success`, a service error code, or a client failure kind
pub static PROVIDER_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_provider_requests_total"),
        "Total number of Route53 requests by operation and outcome",
    );
    let counter = CounterVec::new(opts, &["operation", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Latency of Route53 requests in seconds
///
/// Labels:
/// - `operation`: provider operation
pub static PROVIDER_REQUEST_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_provider_request_duration_seconds"),
        "Latency of Route53 requests in seconds by operation",
    )
    .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]);
    let histogram = HistogramVec::new(opts, &["operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Cache Metrics
// ============================================================================

fn register_int_gauge(name: &str, help: &str) -> IntGauge {
    let gauge = IntGauge::new(format!("{METRICS_NAMESPACE}_{name}"), help).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
}

/// Number of entries in the shared cache
pub static CACHE_ENTRIES: LazyLock<IntGauge> =
    LazyLock::new(|| register_int_gauge("cache_entries", "Number of entries in the cache"));

/// Bytes accounted against the cache budget
pub static CACHE_BYTES: LazyLock<IntGauge> =
    LazyLock::new(|| register_int_gauge("cache_bytes", "Bytes held by the cache"));

/// Cache reads that returned a value, since start
pub static CACHE_HITS: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_cache_hits"),
        "Cache reads that returned a value since start",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Cache reads that found nothing usable, since start
pub static CACHE_MISSES: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_cache_misses"),
        "Cache reads that found nothing usable since start",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a finished reconciliation
///
/// # Arguments
/// * `operation` - `reconcile` or `delete`
/// * `outcome` - `success`, `not_ready`, `throttled` or `error`
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation(operation: &str, outcome: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Record a Route53 request
///
/// # Arguments
/// * `operation` - Provider operation name
/// * `outcome` - `success` or the failure code
/// * `duration` - Request latency
pub fn record_provider_request(operation: &str, outcome: &str, duration: Duration) {
    PROVIDER_REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    PROVIDER_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Publish a cache counter snapshot
#[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
pub fn update_cache_stats(stats: &CacheStats) {
    CACHE_ENTRIES.set(stats.entries as i64);
    CACHE_BYTES.set(stats.bytes as i64);
    CACHE_HITS.set(stats.hits as f64);
    CACHE_MISSES.set(stats.misses as f64);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation() {
        record_reconciliation("test-reconcile", "success", Duration::from_millis(500));

        let counter = RECONCILIATION_TOTAL.with_label_values(&["test-reconcile", "success"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&["test-reconcile"]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_provider_request() {
        record_provider_request("TestOperation", "Throttling", Duration::from_millis(20));

        let counter = PROVIDER_REQUESTS_TOTAL.with_label_values(&["TestOperation", "Throttling"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_update_cache_stats() {
        update_cache_stats(&CacheStats {
            entries: 3,
            bytes: 128,
            hits: 7,
            misses: 2,
        });
        assert_eq!(CACHE_ENTRIES.get(), 3);
        assert_eq!(CACHE_BYTES.get(), 128);
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation("gather-test", "success", Duration::from_millis(100));

        let metrics_text = gather_metrics().unwrap();
        assert!(
            metrics_text.contains("route53_dns_operator"),
            "Metrics should contain namespace prefix"
        );
        assert!(
            metrics_text.contains("reconciliations_total"),
            "Metrics should contain reconciliation counter"
        );
    }
}
