//! Packager: writes a new artifact directory.
//!
//! The artifact is assembled in a staging directory beside the destination
//! and renamed into place once complete. Artifacts are write-once.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::compat::RuntimeVersion;
use super::flavor::{add_to_model, FlavorSpec, CODE_DIR, DATA_DIR, ENV_FILE_NAME};
use super::manifest::{Model, MLMODEL_FILE_NAME};
use crate::error::{PyfuncError, Result};
use crate::fsutil;
use crate::telemetry::{self, OperationSpan, SpanExt};

/// Inputs to [`save_model`].
#[derive(Debug, Clone, Default)]
pub struct SaveRequest {
    /// Identifier of the loader that will re-hydrate the artifact.
    pub loader_module: String,
    /// File or directory copied under `data/`.
    pub data_path: Option<PathBuf>,
    /// Files or directories copied under `code/`.
    pub code_paths: Vec<PathBuf>,
    /// Environment definition copied to `mlflow_env.yml`.
    pub env_path: Option<PathBuf>,
}

impl SaveRequest {
    pub fn new(loader_module: impl Into<String>) -> Self {
        Self {
            loader_module: loader_module.into(),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    pub fn with_code(mut self, path: impl Into<PathBuf>) -> Self {
        self.code_paths.push(path.into());
        self
    }

    pub fn with_env(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_path = Some(path.into());
        self
    }
}

/// Save a model artifact to `dst` and return the manifest that was written.
///
/// Fails with [`PyfuncError::AlreadyExists`] before writing anything if
/// `dst` exists in any form.
pub fn save_model(dst: &Path, request: &SaveRequest, model: Model, runtime: &RuntimeVersion) -> Result<Model> {
    let span = OperationSpan::new("save", dst);
    let _entered = span.enter();

    let result = save_inner(dst, request, model, runtime);
    span.record_result(&result);
    if result.is_ok() {
        telemetry::record_save();
        tracing::info!(
            module = %request.loader_module,
            code_paths = request.code_paths.len(),
            "artifact saved"
        );
    }
    result
}

fn save_inner(dst: &Path, request: &SaveRequest, mut model: Model, runtime: &RuntimeVersion) -> Result<Model> {
    if fs::symlink_metadata(dst).is_ok() {
        return Err(PyfuncError::AlreadyExists(dst.to_path_buf()));
    }

    let parent = match dst.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    // Dropped (and removed) on any early return.
    let staging = tempfile::Builder::new()
        .prefix(".pyfunc-staging-")
        .tempdir_in(&parent)?;
    let root = staging.path();

    let mut spec = FlavorSpec::new(request.loader_module.clone());

    if let Some(data_path) = &request.data_path {
        let data_dir = root.join(DATA_DIR);
        fs::create_dir_all(&data_dir)?;
        let name = fsutil::base_name(data_path)?;
        fsutil::copy_file_or_tree(data_path, &data_dir.join(&name))?;
        spec.data = Some(format!("{}/{}", DATA_DIR, name));
    }

    if !request.code_paths.is_empty() {
        let code_dir = root.join(CODE_DIR);
        fs::create_dir_all(&code_dir)?;
        for path in &request.code_paths {
            let name = fsutil::base_name(path)?;
            fsutil::copy_file_or_tree(path, &code_dir.join(name))?;
        }
        spec.code = Some(CODE_DIR.to_string());
    }

    if let Some(env_path) = &request.env_path {
        fs::copy(env_path, root.join(ENV_FILE_NAME))?;
        spec.env = Some(ENV_FILE_NAME.to_string());
    }

    add_to_model(&mut model, spec, runtime)?;
    model.save(&root.join(MLMODEL_FILE_NAME))?;

    claim_destination(dst)?;
    let staged = staging.keep();
    // Windows cannot rename onto a directory, even an empty one.
    #[cfg(windows)]
    let _ = fs::remove_dir(dst);
    if let Err(e) = fs::rename(&staged, dst) {
        let _ = fs::remove_dir_all(&staged);
        let _ = fs::remove_dir(dst);
        return Err(PyfuncError::Io(e));
    }

    Ok(model)
}

/// Atomically create `dst` as an empty directory owned by this save.
///
/// A directory created by anyone else between the existence check and the
/// rename fails here instead of being replaced.
fn claim_destination(dst: &Path) -> Result<()> {
    match fs::create_dir(dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(PyfuncError::AlreadyExists(dst.to_path_buf())),
        Err(e) => Err(PyfuncError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::flavor::{load_model_conf, FLAVOR_NAME};

    fn runtime() -> RuntimeVersion {
        RuntimeVersion::new("1.78.0")
    }

    #[test]
    fn test_save_minimal_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("model");

        let model = save_model(&dst, &SaveRequest::new("acme.model"), Model::new(), &runtime()).unwrap();
        assert!(model.has_flavor(FLAVOR_NAME));
        assert!(dst.join(MLMODEL_FILE_NAME).is_file());
        assert!(!dst.join(DATA_DIR).exists());
        assert!(!dst.join(CODE_DIR).exists());

        let conf = load_model_conf(&dst).unwrap();
        assert_eq!(conf.loader_module, "acme.model");
        assert_eq!(conf.runtime_version.as_deref(), Some("1.78.0"));
        assert_eq!(conf.data, None);
    }

    #[test]
    fn test_save_copies_data_code_and_env() {
        let src = tempfile::tempdir().unwrap();
        fs::write(src.path().join("weights.json"), "{}").unwrap();
        fs::create_dir_all(src.path().join("mypkg")).unwrap();
        fs::write(src.path().join("mypkg/lib.rs"), "// code").unwrap();
        fs::write(src.path().join("helper.rs"), "// helper").unwrap();
        fs::write(src.path().join("env.yml"), "name: test").unwrap();

        let out = tempfile::tempdir().unwrap();
        let dst = out.path().join("artifact");
        let request = SaveRequest::new("acme.model")
            .with_data(src.path().join("weights.json"))
            .with_code(src.path().join("mypkg"))
            .with_code(src.path().join("helper.rs"))
            .with_env(src.path().join("env.yml"));
        save_model(&dst, &request, Model::new(), &runtime()).unwrap();

        let conf = load_model_conf(&dst).unwrap();
        assert_eq!(conf.data.as_deref(), Some("data/weights.json"));
        assert_eq!(conf.code.as_deref(), Some("code"));
        assert_eq!(conf.env.as_deref(), Some(ENV_FILE_NAME));
        assert!(dst.join("data/weights.json").is_file());
        assert!(dst.join("code/mypkg/lib.rs").is_file());
        assert!(dst.join("code/helper.rs").is_file());
        assert_eq!(fs::read_to_string(dst.join(ENV_FILE_NAME)).unwrap(), "name: test");
    }

    #[test]
    fn test_existing_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("model");
        fs::create_dir(&dst).unwrap();
        fs::write(dst.join("keep.txt"), "mine").unwrap();

        let err = save_model(&dst, &SaveRequest::new("acme.model"), Model::new(), &runtime()).unwrap_err();
        assert!(matches!(err, PyfuncError::AlreadyExists(_)));
        assert!(!dst.join(MLMODEL_FILE_NAME).exists());
        assert_eq!(fs::read_dir(&dst).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_save_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("model");
        let request = SaveRequest::new("acme.model").with_data(dir.path().join("missing.bin"));

        assert!(save_model(&dst, &request, Model::new(), &runtime()).is_err());
        assert!(!dst.exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_claim_creates_empty_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("model");
        claim_destination(&dst).unwrap();
        assert!(dst.is_dir());
        assert_eq!(fs::read_dir(&dst).unwrap().count(), 0);
    }

    #[test]
    fn test_claim_refuses_directory_created_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("model");
        // Another writer got there after the existence check.
        fs::create_dir(&dst).unwrap();

        let err = claim_destination(&dst).unwrap_err();
        assert!(matches!(err, PyfuncError::AlreadyExists(_)), "{:?}", err);
        assert!(dst.is_dir());
        assert_eq!(fs::read_dir(&dst).unwrap().count(), 0);
    }
}
