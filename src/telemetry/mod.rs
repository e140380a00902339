//! Telemetry: structured logging, spans and metrics.
//!
//! All output goes through `tracing` and the `metrics` facade; nothing here
//! opens network connections.

mod logging;
pub mod metrics;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use metrics::{
    record_cache_hit, record_cache_miss, record_compat_warning, record_load,
    record_predict_rows, record_publish, record_save,
};
pub use spans::{OperationSpan, SpanExt};
