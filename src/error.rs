//! Error types for pyfunc-core.
//!
//! Every fatal condition propagates to the immediate caller. Compatibility
//! warnings are not errors; see [`crate::models::CompatibilityWarning`].

use std::path::PathBuf;
use thiserror::Error;

use crate::frame::FrameError;
use crate::models::manifest::ManifestError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PyfuncError>;

/// Errors raised while resolving a loader module identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid loader module identifier: '{0}'")]
    InvalidModuleId(String),

    #[error("Loader module '{module}' is not registered (known: {})", known.join(", "))]
    UnknownModule { module: String, known: Vec<String> },

    #[error("Loader module '{0}' is already registered")]
    AlreadyRegistered(String),
}

/// Errors that can occur while packaging, loading or invoking models.
#[derive(Debug, Error)]
pub enum PyfuncError {
    #[error("Path '{0}' already exists")]
    AlreadyExists(PathBuf),

    #[error("Format '{flavor}' not found in {path}")]
    FlavorNotFound { flavor: String, path: PathBuf },

    #[error("Module resolution failed: {0}")]
    ModuleResolution(#[from] ResolveError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Path not allowed for '{field}': {path} is outside the artifact root")]
    PathNotAllowed { field: String, path: PathBuf },

    #[error("Artifact path not found: {0}")]
    NotFound(PathBuf),

    #[error("Loader '{module}' failed: {message}")]
    LoaderFailed { module: String, message: String },

    #[error("Prediction failed: {0}")]
    Predict(String),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Archive '{0}' is not available to this worker")]
    ArchiveNotFound(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PyfuncError {
    /// Shorthand for a loader implementation failure.
    pub fn loader(module: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::LoaderFailed {
            module: module.into(),
            message: message.to_string(),
        }
    }
}
