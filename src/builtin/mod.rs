//! Loaders shipped with the crate.

mod linear;

pub use linear::{LinearLoader, LinearModel, LinearParams, MappedFile, LINEAR_LOADER, LINEAR_MODEL_FILE};

use std::sync::Arc;

use crate::models::LoaderRegistry;

/// Register every built-in loader. Already-registered ids are left alone.
pub fn register_all(registry: &LoaderRegistry) {
    if !registry.contains(LINEAR_LOADER) {
        if let Err(e) = registry.register(LINEAR_LOADER, Arc::new(LinearLoader)) {
            tracing::warn!(module = LINEAR_LOADER, error = %e, "built-in loader not registered");
        }
    }
}
