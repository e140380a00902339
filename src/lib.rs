//! pyfunc-core
//!
//! Self-describing model artifacts with a uniform predict contract.
//!
//! An artifact is a directory with an `MLmodel` manifest whose
//! `python_function` entry names a registered loader. Any artifact can be
//! loaded into a handle exposing `predict(&DataFrame)`, whichever framework
//! produced it.
//!
//! # Layout
//!
//! - [`models`]: manifest schema, packager, loader, deployment loader emitter
//! - [`distributed`]: artifact broadcast, per-worker cache, batch prediction
//! - [`builtin`]: loaders shipped with the crate
//! - [`frame`]: tabular input and output types

pub mod builtin;
pub mod cli;
pub mod config;
pub mod distributed;
pub mod error;
pub mod frame;
pub mod fsutil;
pub mod models;
pub mod telemetry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use distributed::{BatchExecutor, ExecutorConfig, ModelCache, PredictUdf, ResultType, SharedDirBroadcast};
use error::Result;
use frame::Value;
use models::{CodePathFilter, LoadedModel, LoaderRegistry, Model, ModelLoader, RuntimeVersion, SaveRequest, SearchPath};

pub use error::{PyfuncError, ResolveError};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub search_path: SearchPath,
    pub runtime_version: RuntimeVersion,
    pub suppress_warnings: bool,
    pub code_filter: CodePathFilter,
    pub broadcast_dir: PathBuf,
    pub worker_dir: PathBuf,
    pub executor: ExecutorConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let tmp = std::env::temp_dir();
        Self {
            search_path: SearchPath::default(),
            runtime_version: RuntimeVersion::current(),
            suppress_warnings: false,
            code_filter: CodePathFilter::default(),
            broadcast_dir: tmp.join("pyfunc-broadcast"),
            worker_dir: tmp.join(format!("pyfunc-worker-{}", std::process::id())),
            executor: ExecutorConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Configuration from `PYFUNC_*` environment variables.
    pub fn from_env() -> Self {
        Self::from(config::load())
    }
}

impl From<config::EnvConfig> for RuntimeConfig {
    fn from(env: config::EnvConfig) -> Self {
        Self {
            code_filter: env.code_filter(),
            search_path: env.search_path,
            runtime_version: env.runtime_version,
            suppress_warnings: env.suppress_warnings,
            broadcast_dir: env.broadcast_dir,
            worker_dir: env.worker_dir,
            executor: env.executor,
        }
    }
}

/// The pyfunc runtime instance: one per process.
pub struct PyfuncRuntime {
    pub config: RuntimeConfig,
    pub registry: Arc<LoaderRegistry>,
    pub loader: Arc<ModelLoader>,
    pub cache: Arc<ModelCache>,
    pub executor: BatchExecutor,
}

impl PyfuncRuntime {
    /// Create a runtime with the built-in loaders registered.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_registry(config, Arc::new(LoaderRegistry::with_builtins()))
    }

    /// Create a runtime around an existing registry.
    pub fn with_registry(config: RuntimeConfig, registry: Arc<LoaderRegistry>) -> Self {
        let loader = Arc::new(
            ModelLoader::new(Arc::clone(&registry))
                .with_runtime_version(config.runtime_version.clone())
                .with_search_path(config.search_path.clone())
                .with_code_filter(config.code_filter.clone()),
        );
        let broadcast = SharedDirBroadcast::new(&config.broadcast_dir, &config.worker_dir);
        let cache = Arc::new(
            ModelCache::new(Arc::new(broadcast), Arc::clone(&loader))
                .with_suppressed_warnings(config.suppress_warnings),
        );
        let executor = BatchExecutor::new(config.executor);

        Self {
            config,
            registry,
            loader,
            cache,
            executor,
        }
    }

    /// Package a new artifact at `dst`.
    pub fn save(&self, dst: &Path, request: &SaveRequest) -> Result<Model> {
        models::save_model(dst, request, Model::new(), &self.config.runtime_version)
    }

    /// Load the artifact at `path`.
    pub fn load(&self, path: &Path) -> Result<LoadedModel> {
        self.loader.load(path, self.config.suppress_warnings)
    }

    /// Loader source for the artifact at `src` once deployed at `deploy`.
    pub fn emit_loader_source(&self, src: &Path, deploy: &Path) -> Result<String> {
        models::LoaderSourceEmitter::new()?
            .with_code_filter(self.config.code_filter.clone())
            .emit(src, deploy)
    }

    /// Publish the artifact at `path` and return a prediction function
    /// for it.
    pub fn udf(&self, path: &Path, result_type: ResultType) -> Result<Arc<PredictUdf>> {
        let archive = self.cache.add_local_model(path)?;
        Ok(Arc::new(PredictUdf::new(Arc::clone(&self.cache), archive, result_type)))
    }

    /// Predict every row of `columns` through `udf`.
    pub async fn predict_batch(&self, udf: Arc<PredictUdf>, columns: Vec<Vec<Value>>) -> Result<Vec<Value>> {
        self.executor.run(udf, columns).await
    }
}

impl Default for PyfuncRuntime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}
