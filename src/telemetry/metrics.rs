//! Metric names and recording helpers.
//!
//! Consumers install their own `metrics` recorder; without one, every call
//! here is a no-op.
//!
//! All metrics are prefixed with `pyfunc_`. Counters end in `_total`,
//! histograms carry their unit.

use std::time::Duration;

/// Artifacts written by the packager.
pub const SAVES_TOTAL: &str = "pyfunc_saves_total";

/// Loads attempted. Labels: `module`, `status` ("ok" | "error").
pub const LOADS_TOTAL: &str = "pyfunc_loads_total";

/// Load duration. Labels: `module`.
pub const LOAD_DURATION_SECONDS: &str = "pyfunc_load_duration_seconds";

/// Worker cache lookups served from memory.
pub const CACHE_HITS_TOTAL: &str = "pyfunc_cache_hits_total";

/// Worker cache lookups that triggered a load.
pub const CACHE_MISSES_TOTAL: &str = "pyfunc_cache_misses_total";

/// Advisory compatibility warnings. Labels: `kind`.
pub const COMPAT_WARNINGS_TOTAL: &str = "pyfunc_compat_warnings_total";

/// Rows passed to `predict`.
pub const PREDICT_ROWS_TOTAL: &str = "pyfunc_predict_rows_total";

/// Artifacts published for workers.
pub const PUBLISHES_TOTAL: &str = "pyfunc_publishes_total";

pub fn record_save() {
    ::metrics::counter!(SAVES_TOTAL).increment(1);
}

pub fn record_load(module: &str, ok: bool, elapsed: Duration) {
    let status = if ok { "ok" } else { "error" };
    ::metrics::counter!(LOADS_TOTAL, "module" => module.to_string(), "status" => status).increment(1);
    if ok {
        ::metrics::histogram!(LOAD_DURATION_SECONDS, "module" => module.to_string())
            .record(elapsed.as_secs_f64());
    }
}

pub fn record_cache_hit() {
    ::metrics::counter!(CACHE_HITS_TOTAL).increment(1);
}

pub fn record_cache_miss() {
    ::metrics::counter!(CACHE_MISSES_TOTAL).increment(1);
}

pub fn record_compat_warning(kind: &'static str) {
    ::metrics::counter!(COMPAT_WARNINGS_TOTAL, "kind" => kind).increment(1);
}

pub fn record_predict_rows(rows: usize) {
    ::metrics::counter!(PREDICT_ROWS_TOTAL).increment(rows as u64);
}

pub fn record_publish() {
    ::metrics::counter!(PUBLISHES_TOTAL).increment(1);
}
