//! Lightweight metrics via the `metrics` facade.
//!
//! This crate is a library, not a deployed service, so no exporter is
//! installed here — an embedding application installs whatever
//! `metrics::Recorder` it wants (Prometheus, statsd, a test recorder, or
//! none at all, in which case these calls are no-ops). We only emit into
//! the facade at the points that matter for cache health: cache hit/miss,
//! eviction, queue depth, and provider-fetch outcome.

use metrics::{counter, gauge};

/// A provider (or weather) fetch completed, successfully or not.
pub fn record_fetch_outcome(source: &str, success: bool) {
    let result = if success { "ok" } else { "error" };
    counter!("chart_cache.fetch.outcome", "source" => source.to_string(), "result" => result)
        .increment(1);
}

/// A `get_chart_surface` call found (or didn't find) a ready surface
/// without needing to enqueue a load.
pub fn record_surface_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("chart_cache.surface.lookup", "result" => result).increment(1);
}

/// Snapshot the depth of both loader queues, taken right after a worker
/// dequeue so the gauge reflects backlog rather than momentary churn.
pub fn record_queue_depth(chart_queue_len: usize, airport_queue_len: usize) {
    gauge!("chart_cache.queue.chart_depth").set(chart_queue_len as f64);
    gauge!("chart_cache.queue.airport_depth").set(airport_queue_len as f64);
}
