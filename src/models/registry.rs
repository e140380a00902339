//! Loader registry: maps `loader_module` identifiers to loader
//! implementations.
//!
//! Registration happens at process start (or whenever a host discovers new
//! loaders). Resolution is a plain lookup by identifier.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;

use super::flavor::PyfuncFlavor;
use super::search_path::SearchPath;
use crate::error::{ResolveError, Result};
use crate::frame::{DataFrame, PredictOutput};

/// Dotted identifier, e.g. `acme.sklearn` or `pyfunc_core.builtin.linear`.
static MODULE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("module id pattern is valid")
});

/// Returns true if `id` is a well-formed loader module identifier.
pub fn is_valid_module_id(id: &str) -> bool {
    MODULE_ID.is_match(id)
}

/// A loaded, prediction-capable model.
pub trait PyfuncModel: Send + Sync {
    fn predict(&self, input: &DataFrame) -> Result<PredictOutput>;
}

/// Everything a loader may consult besides the data path.
#[derive(Debug, Clone, Copy)]
pub struct LoadContext<'a> {
    /// Root directory of the artifact being loaded.
    pub artifact_root: &'a Path,
    /// Search path for this load only, packaged code first.
    pub search_path: &'a SearchPath,
    /// The flavor entry that selected this loader.
    pub flavor: &'a PyfuncFlavor,
}

/// Builds a model from a data path.
pub trait PyfuncLoader: Send + Sync {
    fn load_pyfunc(&self, data_path: &Path, ctx: &LoadContext<'_>) -> Result<Arc<dyn PyfuncModel>>;
}

impl<F> PyfuncLoader for F
where
    F: Fn(&Path, &LoadContext<'_>) -> Result<Arc<dyn PyfuncModel>> + Send + Sync,
{
    fn load_pyfunc(&self, data_path: &Path, ctx: &LoadContext<'_>) -> Result<Arc<dyn PyfuncModel>> {
        self(data_path, ctx)
    }
}

/// Thread-safe registry of loader implementations.
pub struct LoaderRegistry {
    loaders: RwLock<HashMap<String, Arc<dyn PyfuncLoader>>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self {
            loaders: RwLock::new(HashMap::new()),
        }
    }

    /// Registry pre-populated with the crate's built-in loaders.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        crate::builtin::register_all(&registry);
        registry
    }

    /// Register a loader under `module`. Identifiers are unique.
    pub fn register(&self, module: &str, loader: Arc<dyn PyfuncLoader>) -> std::result::Result<(), ResolveError> {
        if !is_valid_module_id(module) {
            return Err(ResolveError::InvalidModuleId(module.to_string()));
        }
        let mut loaders = self.loaders.write();
        if loaders.contains_key(module) {
            return Err(ResolveError::AlreadyRegistered(module.to_string()));
        }
        loaders.insert(module.to_string(), loader);
        tracing::debug!(module, "loader registered");
        Ok(())
    }

    /// Register or replace a loader.
    pub fn replace(&self, module: &str, loader: Arc<dyn PyfuncLoader>) -> std::result::Result<(), ResolveError> {
        if !is_valid_module_id(module) {
            return Err(ResolveError::InvalidModuleId(module.to_string()));
        }
        self.loaders.write().insert(module.to_string(), loader);
        Ok(())
    }

    /// Look up the loader for `module`.
    pub fn resolve(&self, module: &str) -> std::result::Result<Arc<dyn PyfuncLoader>, ResolveError> {
        if !is_valid_module_id(module) {
            return Err(ResolveError::InvalidModuleId(module.to_string()));
        }
        let found = self.loaders.read().get(module).cloned();
        found.ok_or_else(|| ResolveError::UnknownModule {
            module: module.to_string(),
            known: self.module_ids(),
        })
    }

    pub fn contains(&self, module: &str) -> bool {
        self.loaders.read().contains_key(module)
    }

    /// Registered identifiers, sorted.
    pub fn module_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.loaders.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.loaders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.read().is_empty()
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
