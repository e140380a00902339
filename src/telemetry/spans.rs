//! Span utilities and extension traits.

use std::path::Path;

use tracing::{info_span, Span};

/// Extension trait for adding context to spans.
pub trait SpanExt {
    /// Record the result of an operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Factory for artifact operation spans (save, load, publish, materialize).
pub struct OperationSpan;

impl OperationSpan {
    /// Fields: `operation`, `artifact`, and `status` / `error.message`
    /// filled in by [`SpanExt::record_result`].
    pub fn new(operation: &'static str, artifact: &Path) -> Span {
        info_span!(
            "artifact_operation",
            operation,
            artifact = %artifact.display(),
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    }
}
