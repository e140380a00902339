// Copyright 2024-2026 pyfunc-core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Artifact shipping between a driver and its workers.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PyfuncError, Result};
use crate::fsutil;
use crate::models::load_model_conf;
use crate::telemetry::{OperationSpan, SpanExt};

/// Content reference to a published artifact (hex SHA-256 of its tree).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveRef(String);

impl ArchiveRef {
    /// Wrap a digest. Only lowercase hex digests of 64 characters are
    /// accepted, so a reference is always a safe single path component.
    pub fn parse(digest: &str) -> Result<Self> {
        let valid = digest.len() == 64 && digest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if valid {
            Ok(Self(digest.to_string()))
        } else {
            Err(PyfuncError::ArchiveNotFound(digest.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Moves artifacts from the driver to workers.
pub trait ArtifactBroadcast: Send + Sync {
    /// Make the artifact at `artifact` available to workers.
    fn publish(&self, artifact: &Path) -> Result<ArchiveRef>;

    /// Worker-local directory holding the published artifact.
    fn materialize(&self, archive: &ArchiveRef) -> Result<PathBuf>;
}

/// Broadcast through a directory every worker can read.
///
/// Published artifacts live at `<shared_dir>/<digest>`; workers copy them to
/// `<worker_dir>/<digest>` before loading.
#[derive(Debug, Clone)]
pub struct SharedDirBroadcast {
    shared_dir: PathBuf,
    worker_dir: PathBuf,
}

impl SharedDirBroadcast {
    pub fn new(shared_dir: impl Into<PathBuf>, worker_dir: impl Into<PathBuf>) -> Self {
        Self {
            shared_dir: shared_dir.into(),
            worker_dir: worker_dir.into(),
        }
    }

    pub fn shared_dir(&self) -> &Path {
        &self.shared_dir
    }

    pub fn worker_dir(&self) -> &Path {
        &self.worker_dir
    }

    fn publish_inner(&self, artifact: &Path) -> Result<ArchiveRef> {
        load_model_conf(artifact)?;
        let archive = ArchiveRef::parse(&fsutil::digest_tree(artifact)?)?;
        copy_into_place(artifact, &self.shared_dir, archive.as_str())?;
        Ok(archive)
    }
}

impl ArtifactBroadcast for SharedDirBroadcast {
    fn publish(&self, artifact: &Path) -> Result<ArchiveRef> {
        let span = OperationSpan::new("publish", artifact);
        let _entered = span.enter();

        let result = self.publish_inner(artifact);

        span.record_result(&result);
        if let Ok(archive) = &result {
            tracing::info!(archive = %archive, "artifact published");
        }
        result
    }

    fn materialize(&self, archive: &ArchiveRef) -> Result<PathBuf> {
        let source = self.shared_dir.join(archive.as_str());
        if !source.is_dir() {
            return Err(PyfuncError::ArchiveNotFound(archive.to_string()));
        }
        let local = copy_into_place(&source, &self.worker_dir, archive.as_str())?;
        tracing::debug!(archive = %archive, path = %local.display(), "artifact materialized");
        Ok(local)
    }
}

/// Copy `src` to `dir/name` through a staging directory. An existing target
/// holds the same content and is reused.
fn copy_into_place(src: &Path, dir: &Path, name: &str) -> Result<PathBuf> {
    let target = dir.join(name);
    if target.is_dir() {
        return Ok(target);
    }

    fs::create_dir_all(dir)?;
    let staging = tempfile::Builder::new().prefix(".pyfunc-incoming-").tempdir_in(dir)?;
    let staged = staging.path().join(name);
    fsutil::copy_dir_all(src, &staged)?;

    match fs::rename(&staged, &target) {
        Ok(()) => Ok(target),
        Err(_) if target.is_dir() => Ok(target),
        Err(e) => Err(PyfuncError::Io(e)),
    }
}
