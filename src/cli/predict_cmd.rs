// Copyright 2024-2026 pyfunc-core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Prediction CLI subcommands: predict, predict-batch.
//!
//! Input is a JSON frame in split orientation:
//! `{"columns": ["a", "b"], "data": [[1, 2], [3, 4]]}`, read from `--input`
//! or stdin.

use std::io::Read;
use std::path::Path;

use super::models_cmd::usage_error;
use super::{parse_args, EXIT_FAILURE, EXIT_OK};
use crate::distributed::ResultType;
use crate::error::{PyfuncError, Result};
use crate::frame::{DataFrame, Value};
use crate::{PyfuncRuntime, RuntimeConfig};

/// `predict <ARTIFACT> [--input FILE]`: load the model and print its output
/// as JSON.
pub fn run_predict(args: &[String]) -> i32 {
    let parsed = match parse_args(args, &["--input"]) {
        Ok(p) => p,
        Err(e) => return usage_error(&e, "predict"),
    };
    let Some(artifact) = parsed.positional.first() else {
        return usage_error("predict needs <ARTIFACT>", "predict");
    };

    let result = read_frame(parsed.value("--input")).and_then(|frame| {
        let runtime = PyfuncRuntime::new(RuntimeConfig::from_env());
        let model = runtime.load(Path::new(artifact))?;
        let output = model.predict(&frame)?;
        serde_json::to_string(&output).map_err(|e| PyfuncError::Predict(e.to_string()))
    });
    finish(result)
}

/// `predict-batch <ARTIFACT> [--input FILE] [--result-type T]`: publish the
/// artifact, run the frame's columns positionally through the batch
/// executor and print one value per row.
pub async fn run_predict_batch(args: &[String]) -> i32 {
    let parsed = match parse_args(args, &["--input", "--result-type"]) {
        Ok(p) => p,
        Err(e) => return usage_error(&e, "predict-batch"),
    };
    let Some(artifact) = parsed.positional.first() else {
        return usage_error("predict-batch needs <ARTIFACT>", "predict-batch");
    };
    let result_type = match parsed.value("--result-type").map(str::parse::<ResultType>) {
        None => ResultType::default(),
        Some(Ok(t)) => t,
        Some(Err(e)) => return usage_error(&e, "predict-batch"),
    };

    let frame = match read_frame(parsed.value("--input")) {
        Ok(f) => f,
        Err(e) => return finish(Err(e)),
    };

    let runtime = PyfuncRuntime::new(RuntimeConfig::from_env());
    let udf = match runtime.udf(Path::new(artifact), result_type) {
        Ok(u) => u,
        Err(e) => return finish(Err(e)),
    };
    let result = runtime
        .predict_batch(udf, frame_columns(&frame))
        .await
        .and_then(|values| serde_json::to_string(&values).map_err(|e| PyfuncError::Predict(e.to_string())));
    finish(result)
}

/// Column vectors of `frame`, in column order.
pub fn frame_columns(frame: &DataFrame) -> Vec<Vec<Value>> {
    (0..frame.num_columns())
        .map(|i| frame.rows().iter().map(|row| row[i].clone()).collect())
        .collect()
}

fn read_frame(input: Option<&str>) -> Result<DataFrame> {
    let text = match input {
        Some(path) if path != "-" => std::fs::read_to_string(path)?,
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    serde_json::from_str(&text).map_err(|e| PyfuncError::Predict(format!("invalid input frame: {}", e)))
}

fn finish(result: Result<String>) -> i32 {
    match result {
        Ok(json) => {
            println!("{}", json);
            EXIT_OK
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        }
    }
}
