//! Engine metrics, recorded through the `metrics` facade.
//!
//! Nothing is exported unless the host process installs a recorder.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const INDEX_BUILDS_TOTAL: &str = "vsearch_index_builds_total";
    pub const INDEX_BUILD_DURATION_SECONDS: &str = "vsearch_index_build_duration_seconds";
    pub const INDEX_LOADS_TOTAL: &str = "vsearch_index_loads_total";
    pub const QUERIES_TOTAL: &str = "vsearch_queries_total";
    pub const QUERY_DURATION_SECONDS: &str = "vsearch_query_duration_seconds";
    pub const INDEXED_FRAMES: &str = "vsearch_indexed_frames";
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failure"
    }
}

/// Record a finished build attempt.
pub fn record_build(ok: bool, duration_secs: f64) {
    let labels = [("outcome", outcome(ok))];
    counter!(names::INDEX_BUILDS_TOTAL, &labels).increment(1);
    histogram!(names::INDEX_BUILD_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a finished load attempt.
pub fn record_load(ok: bool) {
    counter!(names::INDEX_LOADS_TOTAL, "outcome" => outcome(ok)).increment(1);
}

/// Record a finished query.
pub fn record_query(ok: bool, duration_secs: f64) {
    let labels = [("outcome", outcome(ok))];
    counter!(names::QUERIES_TOTAL, &labels).increment(1);
    histogram!(names::QUERY_DURATION_SECONDS).record(duration_secs);
}

/// Frames in the currently served snapshot.
pub fn set_indexed_frames(count: usize) {
    gauge!(names::INDEXED_FRAMES).set(count as f64);
}
