//! Tabular input and columnar output for the predict contract.
//!
//! A [`DataFrame`] keeps an explicit, ordered list of column labels next to
//! row-major records. Column order is never derived from the labels.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Row {row} has {actual} values, expected {expected}")]
    RaggedRow { row: usize, expected: usize, actual: usize },

    #[error("Column '{label}' has {actual} values, expected {expected}")]
    RaggedColumn { label: String, expected: usize, actual: usize },

    #[error("Duplicate column label: {0}")]
    DuplicateColumn(String),

    #[error("Label count {labels} does not match column count {columns}")]
    LabelMismatch { labels: usize, columns: usize },

    #[error("Expected a single output column, got {0}")]
    NotASeries(usize),
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Numeric view of the value. Booleans count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Null | Value::Str(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// Wire form: `{"columns": [...], "data": [[...], ...]}`.
#[derive(Deserialize)]
struct RawFrame {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

/// Row-oriented table with named, explicitly ordered columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame")]
pub struct DataFrame {
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

impl TryFrom<RawFrame> for DataFrame {
    type Error = FrameError;

    fn try_from(raw: RawFrame) -> Result<Self, Self::Error> {
        DataFrame::new(raw.columns, raw.data)
    }
}

impl DataFrame {
    /// Build a frame from labels and row-major records.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, FrameError> {
        check_unique(&columns)?;
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(FrameError::RaggedRow {
                    row: i,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Self { columns, data: rows })
    }

    /// Build a frame from column vectors. `labels[i]` names `columns[i]`;
    /// the label order is kept as given.
    pub fn from_columns(labels: Vec<String>, columns: Vec<Vec<Value>>) -> Result<Self, FrameError> {
        if labels.len() != columns.len() {
            return Err(FrameError::LabelMismatch {
                labels: labels.len(),
                columns: columns.len(),
            });
        }
        check_unique(&labels)?;

        let num_rows = columns.first().map(Vec::len).unwrap_or(0);
        for (label, column) in labels.iter().zip(&columns) {
            if column.len() != num_rows {
                return Err(FrameError::RaggedColumn {
                    label: label.clone(),
                    expected: num_rows,
                    actual: column.len(),
                });
            }
        }

        let mut iters: Vec<_> = columns.into_iter().map(Vec::into_iter).collect();
        let rows = (0..num_rows)
            .map(|_| iters.iter_mut().filter_map(Iterator::next).collect())
            .collect();

        Ok(Self { columns: labels, data: rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.data
    }

    pub fn num_rows(&self) -> usize {
        self.data.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Position of a column label.
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// Values of a single column, in row order.
    pub fn column(&self, label: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(label)?;
        Some(self.data.iter().map(|row| &row[idx]).collect())
    }
}

fn check_unique(labels: &[String]) -> Result<(), FrameError> {
    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(FrameError::DuplicateColumn(label.clone()));
        }
    }
    Ok(())
}

/// Result of a `predict` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictOutput {
    Series(Vec<Value>),
    Frame(DataFrame),
}

impl PredictOutput {
    pub fn len(&self) -> usize {
        match self {
            PredictOutput::Series(values) => values.len(),
            PredictOutput::Frame(frame) => frame.num_rows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into a one-dimensional sequence. Frames must have exactly one
    /// column.
    pub fn into_series(self) -> Result<Vec<Value>, FrameError> {
        match self {
            PredictOutput::Series(values) => Ok(values),
            PredictOutput::Frame(frame) => {
                if frame.num_columns() != 1 {
                    return Err(FrameError::NotASeries(frame.num_columns()));
                }
                Ok(frame.data.into_iter().filter_map(|row| row.into_iter().next()).collect())
            }
        }
    }
}

impl From<Vec<Value>> for PredictOutput {
    fn from(values: Vec<Value>) -> Self {
        PredictOutput::Series(values)
    }
}
