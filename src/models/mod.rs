//! Artifact format, packaging and loading.
//!
//! Handles the `python_function` flavor: manifest schema, packaging, code
//! path resolution, loader resolution and deployment loader emission.

pub mod manifest;

mod code_paths;
mod compat;
mod emitter;
mod flavor;
mod loader;
mod packager;
mod registry;
mod search_path;

pub use code_paths::{resolve_code_dirs, CodePathFilter, DEFAULT_EXCLUDE_PATTERNS};
pub use compat::{
    check_runtime_version, major_minor, CompatibilityWarning, DiagnosticSink, RecordingDiagnostics,
    RuntimeVersion, TracingDiagnostics,
};
pub use emitter::{emit_loader_source, LoaderSourceEmitter, SEARCH_PATH_ENV};
pub use flavor::{
    add_to_model, load_model_conf, load_model_env, FlavorSpec, PyfuncFlavor, CODE_DIR, DATA_DIR,
    ENV_FILE_NAME, FLAVOR_NAME,
};
pub use loader::{resolve_within, LoadedModel, ModelLoader};
pub use manifest::{ManifestError, Model, MLMODEL_FILE_NAME};
pub use packager::{save_model, SaveRequest};
pub use registry::{is_valid_module_id, LoadContext, LoaderRegistry, PyfuncLoader, PyfuncModel};
pub use search_path::SearchPath;
