//! Artifact loading: manifest → search path → registered loader → handle.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::code_paths::CodePathFilter;
use super::compat::{check_runtime_version, DiagnosticSink, RuntimeVersion, TracingDiagnostics};
use super::flavor::{load_model_conf, PyfuncFlavor};
use super::registry::{LoadContext, LoaderRegistry, PyfuncModel};
use super::search_path::SearchPath;
use crate::error::{PyfuncError, Result};
use crate::frame::{DataFrame, PredictOutput};
use crate::telemetry::{self, OperationSpan, SpanExt};

/// Resolve a manifest-relative path, refusing anything outside `root`.
///
/// Absolute paths and `..` components are rejected before touching the
/// filesystem; existing targets are also checked after symlink resolution.
pub fn resolve_within(root: &Path, field: &str, relative: &str) -> Result<PathBuf> {
    let rel = Path::new(relative);
    let escapes = rel.is_absolute()
        || rel
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir));
    if escapes {
        return Err(PyfuncError::PathNotAllowed {
            field: field.to_string(),
            path: rel.to_path_buf(),
        });
    }

    let full_path = root.join(rel);
    if let (Ok(canonical), Ok(root_canonical)) = (full_path.canonicalize(), root.canonicalize()) {
        if !canonical.starts_with(&root_canonical) {
            return Err(PyfuncError::PathNotAllowed {
                field: field.to_string(),
                path: canonical,
            });
        }
    }
    Ok(full_path)
}

/// A model returned by [`ModelLoader::load`].
pub struct LoadedModel {
    model: Arc<dyn PyfuncModel>,
    flavor: PyfuncFlavor,
    artifact_root: PathBuf,
    data_path: PathBuf,
    search_path: SearchPath,
}

impl LoadedModel {
    pub fn predict(&self, input: &DataFrame) -> Result<PredictOutput> {
        telemetry::record_predict_rows(input.num_rows());
        self.model.predict(input)
    }

    pub fn flavor(&self) -> &PyfuncFlavor {
        &self.flavor
    }

    pub fn loader_module(&self) -> &str {
        &self.flavor.loader_module
    }

    pub fn artifact_root(&self) -> &Path {
        &self.artifact_root
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Search path the loader was invoked with.
    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// The underlying handle produced by the loader.
    pub fn inner(&self) -> &Arc<dyn PyfuncModel> {
        &self.model
    }
}

impl PyfuncModel for LoadedModel {
    fn predict(&self, input: &DataFrame) -> Result<PredictOutput> {
        LoadedModel::predict(self, input)
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("loader_module", &self.flavor.loader_module)
            .field("artifact_root", &self.artifact_root)
            .field("data_path", &self.data_path)
            .finish()
    }
}

/// Loads artifacts through a [`LoaderRegistry`].
pub struct ModelLoader {
    registry: Arc<LoaderRegistry>,
    runtime: RuntimeVersion,
    base_search_path: SearchPath,
    code_filter: CodePathFilter,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl ModelLoader {
    pub fn new(registry: Arc<LoaderRegistry>) -> Self {
        Self {
            registry,
            runtime: RuntimeVersion::current(),
            base_search_path: SearchPath::default(),
            code_filter: CodePathFilter::default(),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Override the running environment's compatibility tag.
    pub fn with_runtime_version(mut self, runtime: RuntimeVersion) -> Self {
        self.runtime = runtime;
        self
    }

    /// Entries searched after packaged code.
    pub fn with_search_path(mut self, search_path: SearchPath) -> Self {
        self.base_search_path = search_path;
        self
    }

    pub fn with_code_filter(mut self, filter: CodePathFilter) -> Self {
        self.code_filter = filter;
        self
    }

    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn registry(&self) -> &Arc<LoaderRegistry> {
        &self.registry
    }

    pub fn runtime_version(&self) -> &RuntimeVersion {
        &self.runtime
    }

    pub fn code_filter(&self) -> &CodePathFilter {
        &self.code_filter
    }

    /// Load the artifact at `path`.
    ///
    /// Compatibility warnings go to the configured diagnostic sink unless
    /// `suppress_warnings` is set; they never fail the load.
    pub fn load(&self, path: &Path, suppress_warnings: bool) -> Result<LoadedModel> {
        let span = OperationSpan::new("load", path);
        let _entered = span.enter();
        let started = Instant::now();

        let result = self.load_inner(path, suppress_warnings);

        span.record_result(&result);
        match &result {
            Ok(loaded) => {
                telemetry::record_load(loaded.loader_module(), true, started.elapsed());
                tracing::info!(
                    module = %loaded.loader_module(),
                    data_path = %loaded.data_path.display(),
                    "model loaded"
                );
            }
            Err(_) => telemetry::record_load("unknown", false, started.elapsed()),
        }
        result
    }

    fn load_inner(&self, path: &Path, suppress_warnings: bool) -> Result<LoadedModel> {
        if !path.is_dir() {
            return Err(PyfuncError::NotFound(path.to_path_buf()));
        }
        let conf = load_model_conf(path)?;

        if !suppress_warnings {
            if let Some(warning) = check_runtime_version(conf.runtime_version.as_deref(), &self.runtime) {
                self.diagnostics.warn(&warning);
            }
        }

        let search_path = self.search_path_for(path, &conf)?;
        let data_path = match conf.data.as_deref() {
            Some(data) => resolve_within(path, "data", data)?,
            None => path.to_path_buf(),
        };

        let loader = self.registry.resolve(&conf.loader_module)?;
        let ctx = LoadContext {
            artifact_root: path,
            search_path: &search_path,
            flavor: &conf,
        };
        let model = loader.load_pyfunc(&data_path, &ctx)?;

        Ok(LoadedModel {
            model,
            flavor: conf,
            artifact_root: path.to_path_buf(),
            data_path,
            search_path,
        })
    }

    /// `[code_dir] + code_dir entries + base search path` when code was packaged.
    fn search_path_for(&self, path: &Path, conf: &PyfuncFlavor) -> Result<SearchPath> {
        match conf.code_dir() {
            Some(code) => {
                let code_path = resolve_within(path, "code", code)?;
                let mut prepend = vec![code_path.clone()];
                prepend.extend(self.code_filter.resolve(&code_path, None)?);
                Ok(self.base_search_path.prepended(prepend))
            }
            None => Ok(self.base_search_path.clone()),
        }
    }
}
