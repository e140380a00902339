//! The generic `python_function` flavor.
//!
//! ```text
//! ./dst-path/
//!         ./MLmodel         manifest with a `python_function` entry
//!         ./code/           code packaged with the model (optional)
//!         ./data/<name>     data passed to the loader (optional)
//!         ./mlflow_env.yml  environment definition (optional)
//! ```
//!
//! All paths inside the flavor entry are relative to the artifact root.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::compat::RuntimeVersion;
use super::manifest::{ManifestError, Model, MLMODEL_FILE_NAME};
use crate::error::{PyfuncError, Result};

/// Flavor key in the manifest.
pub const FLAVOR_NAME: &str = "python_function";
/// Subdirectory holding packaged code.
pub const CODE_DIR: &str = "code";
/// Subdirectory holding packaged data.
pub const DATA_DIR: &str = "data";
/// Environment file name written by the packager.
pub const ENV_FILE_NAME: &str = "mlflow_env.yml";

/// Configuration of the `python_function` flavor entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PyfuncFlavor {
    /// Identifier of the loader registered for this artifact.
    pub loader_module: String,
    /// Runtime version the artifact was saved with.
    #[serde(
        rename = "python_version",
        default,
        deserialize_with = "version_tag",
        skip_serializing_if = "Option::is_none"
    )]
    pub runtime_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// Keys this crate does not interpret (e.g. `main`).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl PyfuncFlavor {
    /// Recorded code directory, ignoring empty values.
    pub fn code_dir(&self) -> Option<&str> {
        self.code.as_deref().filter(|c| !c.is_empty())
    }
}

/// Accept tags written as YAML numbers (`3.6`) as well as strings.
fn version_tag<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Relative paths to record in a new flavor entry.
#[derive(Debug, Clone, Default)]
pub struct FlavorSpec {
    pub loader_module: String,
    pub data: Option<String>,
    pub code: Option<String>,
    pub env: Option<String>,
}

impl FlavorSpec {
    pub fn new(loader_module: impl Into<String>) -> Self {
        Self {
            loader_module: loader_module.into(),
            ..Self::default()
        }
    }
}

/// Add a `python_function` entry to an existing manifest.
///
/// Other flavors use this to make their own output loadable through the
/// generic predict contract.
pub fn add_to_model<'a>(
    model: &'a mut Model,
    spec: FlavorSpec,
    runtime: &RuntimeVersion,
) -> std::result::Result<&'a mut Model, ManifestError> {
    let flavor = PyfuncFlavor {
        loader_module: spec.loader_module,
        runtime_version: Some(runtime.to_string()),
        code: spec.code.filter(|c| !c.is_empty()),
        data: spec.data.filter(|d| !d.is_empty()),
        env: spec.env.filter(|e| !e.is_empty()),
        extra: BTreeMap::new(),
    };
    model.add_flavor(FLAVOR_NAME, &flavor)
}

/// Read the `python_function` entry of the artifact at `path`.
pub fn load_model_conf(path: &Path) -> Result<PyfuncFlavor> {
    let conf_path = path.join(MLMODEL_FILE_NAME);
    let model = Model::load(&conf_path)?;
    model
        .flavor::<PyfuncFlavor>(FLAVOR_NAME)?
        .ok_or_else(|| PyfuncError::FlavorNotFound {
            flavor: FLAVOR_NAME.to_string(),
            path: conf_path,
        })
}

/// Artifact-relative environment file recorded at save time, if any.
pub fn load_model_env(path: &Path) -> Result<Option<String>> {
    Ok(load_model_conf(path)?.env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_to_model_records_runtime_version() {
        let mut model = Model::new();
        let mut spec = FlavorSpec::new("acme.forest");
        spec.data = Some("data/model.bin".into());
        add_to_model(&mut model, spec, &RuntimeVersion::new("1.78.0")).unwrap();

        let flavor: PyfuncFlavor = model.flavor(FLAVOR_NAME).unwrap().unwrap();
        assert_eq!(flavor.loader_module, "acme.forest");
        assert_eq!(flavor.runtime_version.as_deref(), Some("1.78.0"));
        assert_eq!(flavor.data.as_deref(), Some("data/model.bin"));
        assert_eq!(flavor.code, None);
        assert_eq!(flavor.env, None);
    }

    #[test]
    fn test_manifest_yaml_uses_wire_names() {
        let mut model = Model::default();
        add_to_model(&mut model, FlavorSpec::new("acme.forest"), &RuntimeVersion::new("1.78.0"))
            .unwrap();
        let yaml = model.to_yaml().unwrap();
        assert!(yaml.contains("python_function:"));
        assert!(yaml.contains("loader_module: acme.forest"));
        assert!(yaml.contains("python_version:"));
        assert!(yaml.contains("1.78.0"));
        assert!(!yaml.contains("code:"));
    }

    #[test]
    fn test_extra_keys_survive() {
        let model = Model::from_yaml(
            "flavors:\n  python_function:\n    loader_module: a.b\n    main: sklearn_iris\n",
        )
        .unwrap();
        let flavor: PyfuncFlavor = model.flavor(FLAVOR_NAME).unwrap().unwrap();
        assert_eq!(flavor.runtime_version, None);
        assert_eq!(
            flavor.extra.get("main"),
            Some(&serde_yaml::Value::String("sklearn_iris".into()))
        );
    }

    #[test]
    fn test_numeric_version_tag_is_read_as_text() {
        let model = Model::from_yaml(
            "flavors:\n  python_function:\n    loader_module: a.b\n    python_version: 3.6\n",
        )
        .unwrap();
        let flavor: PyfuncFlavor = model.flavor(FLAVOR_NAME).unwrap().unwrap();
        assert_eq!(flavor.runtime_version.as_deref(), Some("3.6"));
    }

    #[test]
    fn test_missing_loader_module_is_invalid() {
        let model = Model::from_yaml("flavors:\n  python_function:\n    data: data/x\n").unwrap();
        let err = model.flavor::<PyfuncFlavor>(FLAVOR_NAME).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidFlavor { .. }));
    }

    #[test]
    fn test_empty_code_is_ignored() {
        let model = Model::from_yaml(
            "flavors:\n  python_function:\n    loader_module: a.b\n    code: ''\n",
        )
        .unwrap();
        let flavor: PyfuncFlavor = model.flavor(FLAVOR_NAME).unwrap().unwrap();
        assert_eq!(flavor.code_dir(), None);
    }

    #[test]
    fn test_load_model_env() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("MLmodel"),
            "flavors:\n  python_function:\n    loader_module: a.b\n    env: mlflow_env.yml\n",
        )
        .unwrap();
        assert_eq!(load_model_env(dir.path()).unwrap().as_deref(), Some("mlflow_env.yml"));

        let bare = tempfile::tempdir().unwrap();
        std::fs::write(bare.path().join("MLmodel"), "flavors:\n  python_function:\n    loader_module: a.b\n").unwrap();
        assert_eq!(load_model_env(bare.path()).unwrap(), None);
    }
}
