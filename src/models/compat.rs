//! Runtime compatibility tags and advisory warnings.
//!
//! Artifacts record the toolchain version of the process that saved them.
//! A mismatch in major.minor at load time is reported, never enforced.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::telemetry;

/// Fallback when the build script could not query the toolchain.
const FALLBACK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compatibility tag of a running environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeVersion(String);

impl RuntimeVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// Tag of the current process: the toolchain this binary was built with.
    pub fn current() -> Self {
        Self(option_env!("PYFUNC_TOOLCHAIN_VERSION").unwrap_or(FALLBACK_VERSION).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn major_minor(&self) -> String {
        major_minor(&self.0)
    }
}

impl Default for RuntimeVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First two dot-separated components of a version string.
pub fn major_minor(version: &str) -> String {
    version.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// Non-fatal warning raised while loading an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompatibilityWarning {
    /// The artifact does not record a runtime version.
    UnknownVersion { running: String },
    /// The artifact was saved by a different major.minor runtime.
    VersionMismatch { model: String, running: String },
}

impl CompatibilityWarning {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownVersion { .. } => "unknown_version",
            Self::VersionMismatch { .. } => "version_mismatch",
        }
    }
}

impl fmt::Display for CompatibilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownVersion { running } => write!(
                f,
                "The specified model does not have a specified runtime version. It may be \
                 incompatible with the runtime that is currently running: {}",
                running
            ),
            Self::VersionMismatch { model, running } => write!(
                f,
                "The runtime version that the model was saved in, {}, differs from the runtime \
                 version that is currently running, {}, and may be incompatible",
                model, running
            ),
        }
    }
}

/// Compare a recorded tag with the running one.
pub fn check_runtime_version(
    model_version: Option<&str>,
    running: &RuntimeVersion,
) -> Option<CompatibilityWarning> {
    match model_version {
        None => Some(CompatibilityWarning::UnknownVersion {
            running: running.to_string(),
        }),
        Some(model) if major_minor(model) != running.major_minor() => {
            Some(CompatibilityWarning::VersionMismatch {
                model: model.to_string(),
                running: running.to_string(),
            })
        }
        Some(_) => None,
    }
}

/// Side channel for advisory diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn warn(&self, warning: &CompatibilityWarning);
}

/// Emits warnings as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn warn(&self, warning: &CompatibilityWarning) {
        telemetry::record_compat_warning(warning.kind());
        tracing::warn!(kind = warning.kind(), "{}", warning);
    }
}

/// Keeps every warning in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingDiagnostics {
    warnings: Arc<Mutex<Vec<CompatibilityWarning>>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<CompatibilityWarning> {
        self.warnings.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.warnings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.lock().is_empty()
    }
}

impl DiagnosticSink for RecordingDiagnostics {
    fn warn(&self, warning: &CompatibilityWarning) {
        self.warnings.lock().push(warning.clone());
    }
}
