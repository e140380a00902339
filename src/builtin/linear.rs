// Copyright 2024-2026 pyfunc-core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Affine model over numeric columns.
//!
//! Data is a JSON document (or a directory holding `model.json`):
//!
//! ```json
//! {"coefficients": [0.5, -1.0], "intercept": 2.0, "features": ["x", "y"]}
//! ```
//!
//! With `features`, input columns are selected by label; without, the first
//! `coefficients.len()` columns are used positionally.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::error::{PyfuncError, Result};
use crate::frame::{DataFrame, PredictOutput, Value};
use crate::models::{LoadContext, PyfuncLoader, PyfuncModel};

/// Registry identifier of the linear loader.
pub const LINEAR_LOADER: &str = "pyfunc_core.builtin.linear";

/// File looked up when the data path is a directory.
pub const LINEAR_MODEL_FILE: &str = "model.json";

/// Read-only memory map of a data file.
pub struct MappedFile {
    mmap: Mmap,
}

impl MappedFile {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        // SAFETY: opened read-only; artifacts are immutable once saved.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearParams {
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct LinearModel {
    params: LinearParams,
}

impl LinearModel {
    pub fn new(params: LinearParams) -> Result<Self> {
        if let Some(features) = &params.features {
            if features.len() != params.coefficients.len() {
                return Err(PyfuncError::loader(
                    LINEAR_LOADER,
                    format!(
                        "{} features but {} coefficients",
                        features.len(),
                        params.coefficients.len()
                    ),
                ));
            }
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &LinearParams {
        &self.params
    }

    fn column_indices(&self, input: &DataFrame) -> Result<Vec<usize>> {
        match &self.params.features {
            Some(features) => features
                .iter()
                .map(|f| {
                    input
                        .column_index(f)
                        .ok_or_else(|| PyfuncError::Predict(format!("missing input column '{}'", f)))
                })
                .collect(),
            None => {
                let needed = self.params.coefficients.len();
                if input.num_columns() < needed {
                    return Err(PyfuncError::Predict(format!(
                        "expected at least {} columns, got {}",
                        needed,
                        input.num_columns()
                    )));
                }
                Ok((0..needed).collect())
            }
        }
    }
}

impl PyfuncModel for LinearModel {
    fn predict(&self, input: &DataFrame) -> Result<PredictOutput> {
        let indices = self.column_indices(input)?;
        let mut out = Vec::with_capacity(input.num_rows());

        for (row_no, row) in input.rows().iter().enumerate() {
            let mut acc = self.params.intercept;
            for (coef, &idx) in self.params.coefficients.iter().zip(&indices) {
                let x = row[idx].as_f64().ok_or_else(|| {
                    PyfuncError::Predict(format!(
                        "row {}: column '{}' is not numeric",
                        row_no,
                        input.columns()[idx]
                    ))
                })?;
                acc += coef * x;
            }
            out.push(Value::Float(acc));
        }

        Ok(PredictOutput::Series(out))
    }
}

/// Loader for [`LinearModel`] artifacts.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearLoader;

impl PyfuncLoader for LinearLoader {
    fn load_pyfunc(&self, data_path: &Path, _ctx: &LoadContext<'_>) -> Result<Arc<dyn PyfuncModel>> {
        let file = if data_path.is_dir() {
            data_path.join(LINEAR_MODEL_FILE)
        } else {
            data_path.to_path_buf()
        };
        if !file.is_file() {
            return Err(PyfuncError::NotFound(file));
        }

        let mapped = MappedFile::open(&file)?;
        let params: LinearParams = serde_json::from_slice(mapped.as_bytes())
            .map_err(|e| PyfuncError::loader(LINEAR_LOADER, e))?;
        tracing::debug!(
            path = %file.display(),
            bytes = mapped.len(),
            coefficients = params.coefficients.len(),
            "linear model mapped"
        );

        Ok(Arc::new(LinearModel::new(params)?))
    }
}
