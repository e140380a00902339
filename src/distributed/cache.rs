//! Per-worker model cache.
//!
//! Uses DashMap for lock-free concurrent access. Each key holds a `OnceCell`
//! so concurrent callers for the same archive share one load; callers for
//! other archives only contend on the shard lookup.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use super::broadcast::{ArchiveRef, ArtifactBroadcast};
use crate::error::Result;
use crate::models::{LoadedModel, ModelLoader};
use crate::telemetry;

type Slot = Arc<OnceCell<Arc<LoadedModel>>>;

/// Memoizes loaded models by archive. Entries live as long as the cache.
pub struct ModelCache {
    broadcast: Arc<dyn ArtifactBroadcast>,
    loader: Arc<ModelLoader>,
    entries: DashMap<ArchiveRef, Slot>,
    suppress_warnings: bool,
    loads: AtomicU64,
}

impl ModelCache {
    pub fn new(broadcast: Arc<dyn ArtifactBroadcast>, loader: Arc<ModelLoader>) -> Self {
        Self {
            broadcast,
            loader,
            entries: DashMap::new(),
            suppress_warnings: false,
            loads: AtomicU64::new(0),
        }
    }

    pub fn with_suppressed_warnings(mut self, suppress: bool) -> Self {
        self.suppress_warnings = suppress;
        self
    }

    /// Driver side: publish a local artifact for workers.
    pub fn add_local_model(&self, artifact: &Path) -> Result<ArchiveRef> {
        let archive = self.broadcast.publish(artifact)?;
        telemetry::record_publish();
        Ok(archive)
    }

    /// Worker side: the loaded model for `archive`, loading it on first use.
    ///
    /// A failed load leaves the slot empty; the next call retries.
    pub fn get_or_load(&self, archive: &ArchiveRef) -> Result<Arc<LoadedModel>> {
        let slot: Slot = self
            .entries
            .entry(archive.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        if let Some(model) = slot.get() {
            telemetry::record_cache_hit();
            tracing::debug!(archive = %archive, "model cache hit");
            return Ok(Arc::clone(model));
        }

        let model = slot.get_or_try_init(|| {
            telemetry::record_cache_miss();
            self.loads.fetch_add(1, Ordering::Relaxed);
            let local = self.broadcast.materialize(archive)?;
            self.loader.load(&local, self.suppress_warnings).map(Arc::new)
        })?;
        Ok(Arc::clone(model))
    }

    /// Whether `archive` has a loaded model.
    pub fn is_loaded(&self, archive: &ArchiveRef) -> bool {
        self.entries
            .get(archive)
            .map(|slot| slot.get().is_some())
            .unwrap_or(false)
    }

    /// Number of load attempts made.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Number of archives with a loaded model.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn loader(&self) -> &Arc<ModelLoader> {
        &self.loader
    }
}
