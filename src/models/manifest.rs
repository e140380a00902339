// Copyright 2024-2026 pyfunc-core Contributors
// SPDX-License-Identifier: Apache-2.0

//! `MLmodel` manifest persistence.
//!
//! A manifest maps flavor names to flavor configurations. Entries owned by
//! other flavors are kept as raw YAML so they survive a load/save cycle.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the manifest at the artifact root.
pub const MLMODEL_FILE_NAME: &str = "MLmodel";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid manifest YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration for flavor '{flavor}': {reason}")]
    InvalidFlavor { flavor: String, reason: String },
}

/// Model configuration stored in an `MLmodel` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_time_created: Option<String>,
    #[serde(default)]
    pub flavors: BTreeMap<String, serde_yaml::Value>,
}

impl Model {
    /// New manifest stamped with the current UTC time.
    pub fn new() -> Self {
        Self {
            utc_time_created: Some(chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
            ..Self::default()
        }
    }

    /// New manifest tied to a run's artifact location.
    pub fn for_run(artifact_path: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            artifact_path: Some(artifact_path.into()),
            run_id: Some(run_id.into()),
            ..Self::new()
        }
    }

    /// Load a manifest from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.is_file() {
            return Err(ManifestError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Write the manifest as YAML.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let content = self.to_yaml()?;
        std::fs::write(path, content).map_err(|source| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Insert or replace a flavor entry.
    pub fn add_flavor<T: Serialize>(&mut self, name: &str, conf: &T) -> Result<&mut Self, ManifestError> {
        let value = serde_yaml::to_value(conf)?;
        self.flavors.insert(name.to_string(), value);
        Ok(self)
    }

    pub fn has_flavor(&self, name: &str) -> bool {
        self.flavors.contains_key(name)
    }

    /// Typed view of a flavor entry, `None` if the flavor is absent.
    pub fn flavor<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ManifestError> {
        match self.flavors.get(name) {
            None => Ok(None),
            Some(value) => serde_yaml::from_value(value.clone()).map(Some).map_err(|e| {
                ManifestError::InvalidFlavor {
                    flavor: name.to_string(),
                    reason: e.to_string(),
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
artifact_path: linear-lr
run_id: 4f2a
utc_time_created: '2018-06-01 12:00:00.000000'
flavors:
  sklearn:
    pickled_model: model.pkl
  python_function:
    loader_module: mlflow.sklearn
    data: data/model.pkl
"#;

    #[test]
    fn test_parse_keeps_foreign_flavors() {
        let model = Model::from_yaml(SAMPLE).unwrap();
        assert_eq!(model.artifact_path.as_deref(), Some("linear-lr"));
        assert!(model.has_flavor("sklearn"));
        assert!(model.has_flavor("python_function"));

        let reparsed = Model::from_yaml(&model.to_yaml().unwrap()).unwrap();
        assert_eq!(reparsed, model);
    }

    #[test]
    fn test_new_stamps_creation_time() {
        let model = Model::new();
        assert!(model.utc_time_created.is_some());
        assert!(model.flavors.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Model::load(&dir.path().join(MLMODEL_FILE_NAME)).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = Model::from_yaml("flavors: [unterminated").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }
}
