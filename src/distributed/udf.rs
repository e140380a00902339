// Copyright 2024-2026 pyfunc-core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Batched prediction function for column-oriented engines.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::broadcast::ArchiveRef;
use super::cache::ModelCache;
use crate::error::{PyfuncError, Result};
use crate::frame::{DataFrame, FrameError, Value};

/// Type every prediction is coerced to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultType {
    #[default]
    Double,
    Float,
    Long,
    Integer,
    String,
    Boolean,
}

impl FromStr for ResultType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "double" => Ok(ResultType::Double),
            "float" => Ok(ResultType::Float),
            "long" | "bigint" => Ok(ResultType::Long),
            "int" | "integer" => Ok(ResultType::Integer),
            "string" => Ok(ResultType::String),
            "boolean" | "bool" => Ok(ResultType::Boolean),
            other => Err(format!("unknown result type: {}", other)),
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultType::Double => "double",
            ResultType::Float => "float",
            ResultType::Long => "long",
            ResultType::Integer => "integer",
            ResultType::String => "string",
            ResultType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

impl ResultType {
    /// Coerce one prediction. Nulls stay null.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let coerced = match self {
            ResultType::Double | ResultType::Float => numeric(&value).map(|v| {
                if *self == ResultType::Float {
                    Value::Float(v as f32 as f64)
                } else {
                    Value::Float(v)
                }
            }),
            ResultType::Long => numeric(&value).map(|v| Value::Int(v.trunc() as i64)),
            ResultType::Integer => numeric(&value)
                .filter(|v| v.trunc() >= i32::MIN as f64 && v.trunc() <= i32::MAX as f64)
                .map(|v| Value::Int(v.trunc() as i64)),
            ResultType::String => {
                return Ok(match value {
                    Value::Str(s) => Value::Str(s),
                    other => Value::Str(other.to_string()),
                })
            }
            ResultType::Boolean => match &value {
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::Int(i) => Some(Value::Bool(*i != 0)),
                Value::Float(f) => Some(Value::Bool(*f != 0.0)),
                Value::Str(s) => s.parse::<bool>().ok().map(Value::Bool),
                Value::Null => None,
            },
        };
        coerced.ok_or_else(|| PyfuncError::Predict(format!("cannot convert {} to {}", value, self)))
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Str(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    }
}

/// Frame with columns labelled `"0".."n-1"` in argument order.
///
/// Labels are attached explicitly so that `"10"` follows `"9"`.
pub fn positional_frame(columns: Vec<Vec<Value>>) -> std::result::Result<DataFrame, FrameError> {
    let labels = (0..columns.len()).map(|i| i.to_string()).collect();
    DataFrame::from_columns(labels, columns)
}

/// Prediction function bound to one published archive.
pub struct PredictUdf {
    cache: Arc<ModelCache>,
    archive: ArchiveRef,
    result_type: ResultType,
}

impl PredictUdf {
    pub fn new(cache: Arc<ModelCache>, archive: ArchiveRef, result_type: ResultType) -> Self {
        Self {
            cache,
            archive,
            result_type,
        }
    }

    pub fn archive(&self) -> &ArchiveRef {
        &self.archive
    }

    pub fn result_type(&self) -> ResultType {
        self.result_type
    }

    /// Predict over positional columns; one value per input row.
    pub fn call(&self, columns: Vec<Vec<Value>>) -> Result<Vec<Value>> {
        let model = self.cache.get_or_load(&self.archive)?;
        let frame = positional_frame(columns)?;
        let rows = frame.num_rows();

        let output = model.predict(&frame)?.into_series()?;
        if output.len() != rows {
            return Err(PyfuncError::Predict(format!(
                "model returned {} values for {} rows",
                output.len(),
                rows
            )));
        }

        output.into_iter().map(|v| self.result_type.coerce(v)).collect()
    }
}
