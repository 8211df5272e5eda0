// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for stac-search.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding server is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `stac_search_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `entity`: collection, item, asset
//! - `operation`: search, count, get, aggregate, create, put, delete, delete_by_query
//! - `status`: success, not_found, error
//! - `catalog`: registered catalog name

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

use crate::error::ErrorKind;

/// Record one backend call
pub fn record_backend_query(entity: &str, operation: &str, status: &str) {
    counter!(
        "stac_search_backend_queries_total",
        "entity" => entity.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record backend call latency
pub fn record_query_latency(entity: &str, operation: &str, duration: Duration) {
    histogram!(
        "stac_search_query_seconds",
        "entity" => entity.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record how many catalogs one fan-out search actually queried
pub fn record_fanout_catalogs(entity: &str, visited: usize) {
    histogram!(
        "stac_search_fanout_catalogs",
        "entity" => entity.to_string()
    )
    .record(visited as f64);
}

/// Record result count of one page
pub fn record_results_returned(entity: &str, count: usize) {
    histogram!(
        "stac_search_results_returned",
        "entity" => entity.to_string()
    )
    .record(count as f64);
}

/// Record a filter that failed to parse or lower
pub fn record_filter_failure(dialect: &str, kind: ErrorKind) {
    counter!(
        "stac_search_filter_failures_total",
        "dialect" => dialect.to_string(),
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record a per-catalog miss swallowed while probing for a document
pub fn record_probe_miss(catalog: &str) {
    counter!(
        "stac_search_probe_misses_total",
        "catalog" => catalog.to_string()
    )
    .increment(1);
}

/// Set number of registered catalogs per entity
pub fn set_registered_catalogs(entity: &str, count: usize) {
    gauge!(
        "stac_search_registered_catalogs",
        "entity" => entity.to_string()
    )
    .set(count as f64);
}

/// Record a transaction write
pub fn record_transaction(entity: &str, operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        "stac_search_transactions_total",
        "entity" => entity.to_string(),
        "operation" => operation.to_string(),
        "status" => status
    )
    .increment(1);
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    entity: &'static str,
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(entity: &'static str, operation: &'static str) -> Self {
        Self {
            entity,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_query_latency(self.entity, self.operation, self.start.elapsed());
    }
}

/// Convenience macro for timing operations
#[macro_export]
macro_rules! time_operation {
    ($entity:expr, $op:expr) => {
        $crate::metrics::LatencyTimer::new($entity, $op)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    // These only verify the calls don't panic without an installed recorder.

    #[test]
    fn test_record_backend_query() {
        record_backend_query("item", "search", "success");
        record_backend_query("collection", "get", "not_found");
        record_backend_query("asset", "count", "error");
    }

    #[test]
    fn test_record_latency_and_fanout() {
        record_query_latency("item", "search", Duration::from_millis(5));
        record_fanout_catalogs("item", 2);
        record_results_returned("item", 10);
    }

    #[test]
    fn test_failure_counters() {
        record_filter_failure("cql2-json", ErrorKind::InvalidFilterExpression);
        record_probe_miss("landsat");
        record_transaction("collection", "delete", false);
    }

    #[test]
    fn test_gauges() {
        set_registered_catalogs("item", 3);
    }

    #[test]
    fn test_latency_timer() {
        {
            let _timer = time_operation!("item", "get");
            std::thread::sleep(Duration::from_micros(10));
        }
    }
}
