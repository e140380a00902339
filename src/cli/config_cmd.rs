// Copyright 2024-2026 pyfunc-core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Config CLI subcommands: show, defaults, validate.
//!
//! These commands read configuration directly from environment variables.

use std::path::Path;

use crate::config::{self, EffectiveConfig, DEFAULT_BATCH_SIZE};
use crate::models::{CodePathFilter, RuntimeVersion};

/// Print effective config as key-value pairs to stdout.
pub fn run_show(json: bool) -> i32 {
    let cfg = config::load().effective_config();
    if json {
        match serde_json::to_string_pretty(&cfg) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    } else {
        print_config(&cfg);
    }
    0
}

/// Print default config values (no env overrides) to stdout.
pub fn run_defaults() {
    // Platform-dependent defaults are resolved for this host.
    let tmp = std::env::temp_dir();
    println!("PYFUNC_SEARCH_PATH=");
    println!("PYFUNC_RUNTIME_VERSION={}", RuntimeVersion::current());
    println!("PYFUNC_SUPPRESS_WARNINGS=false");
    println!("PYFUNC_CODE_EXCLUDE=");
    println!("PYFUNC_BROADCAST_DIR={}", tmp.join("pyfunc-broadcast").display());
    println!("PYFUNC_WORKER_DIR={}", tmp.join("pyfunc-worker-<pid>").display());
    println!("PYFUNC_BATCH_WORKERS={}", num_cpus::get());
    println!("PYFUNC_BATCH_SIZE={}", DEFAULT_BATCH_SIZE);
    println!("PYFUNC_LOG_FORMAT=json");
    println!("PYFUNC_LOG_LEVEL=info");
    println!("PYFUNC_LOG_FILE=");
}

/// Validate configuration for obvious misconfigurations.
///
/// Returns 0 if valid, 1 if any warnings are found.
pub fn run_validate() -> i32 {
    let cfg = config::load().effective_config();
    let warnings = validate(&cfg);
    for w in &warnings {
        eprintln!("WARNING: {}", w);
    }

    if warnings.is_empty() {
        println!("Configuration is valid.");
        0
    } else {
        1
    }
}

/// Human-readable problems with `cfg`.
pub fn validate(cfg: &EffectiveConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    for dir in &cfg.search_path {
        if !dir.is_dir() {
            warnings.push(format!("PYFUNC_SEARCH_PATH entry {} is not a directory", dir.display()));
        }
    }

    if cfg.broadcast_dir == cfg.worker_dir {
        warnings.push(format!(
            "PYFUNC_BROADCAST_DIR and PYFUNC_WORKER_DIR are both {}",
            cfg.broadcast_dir.display()
        ));
    }

    if exists_as_file(&cfg.broadcast_dir) {
        warnings.push(format!("PYFUNC_BROADCAST_DIR {} is a file", cfg.broadcast_dir.display()));
    }

    if CodePathFilter::with_extra(&cfg.code_exclude).is_err() {
        warnings.push("PYFUNC_CODE_EXCLUDE contains an invalid pattern".to_string());
    }

    if tracing_subscriber::EnvFilter::try_new(&cfg.log_level).is_err() {
        warnings.push(format!("PYFUNC_LOG_LEVEL '{}' is not a valid filter", cfg.log_level));
    }

    if let Some(parent) = cfg.log_file.as_ref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            warnings.push(format!("PYFUNC_LOG_FILE directory {} does not exist", parent.display()));
        }
    }

    warnings
}

fn exists_as_file(path: &Path) -> bool {
    path.exists() && !path.is_dir()
}

fn print_config(cfg: &EffectiveConfig) {
    let search_path: Vec<String> = cfg.search_path.iter().map(|p| p.display().to_string()).collect();
    println!("PYFUNC_SEARCH_PATH={}", search_path.join(","));
    println!("PYFUNC_RUNTIME_VERSION={}", cfg.runtime_version);
    println!("PYFUNC_SUPPRESS_WARNINGS={}", cfg.suppress_warnings);
    println!("PYFUNC_CODE_EXCLUDE={}", cfg.code_exclude.join(","));
    println!("PYFUNC_BROADCAST_DIR={}", cfg.broadcast_dir.display());
    println!("PYFUNC_WORKER_DIR={}", cfg.worker_dir.display());
    println!("PYFUNC_BATCH_WORKERS={}", cfg.batch_workers);
    println!("PYFUNC_BATCH_SIZE={}", cfg.batch_size);
    println!("PYFUNC_LOG_FORMAT={}", cfg.log_format);
    println!("PYFUNC_LOG_LEVEL={}", cfg.log_level);
    let log_file = cfg.log_file.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
    println!("PYFUNC_LOG_FILE={}", log_file);
}
