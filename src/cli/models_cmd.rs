// Copyright 2024-2026 pyfunc-core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Artifact CLI subcommands: save, inspect, env, emit-loader.

use std::path::{Path, PathBuf};

use super::{parse_args, EXIT_FAILURE, EXIT_OK, EXIT_USAGE};
use crate::models::{check_runtime_version, load_model_conf, load_model_env, SaveRequest};
use crate::{PyfuncRuntime, RuntimeConfig};

/// `save <DST> --loader <MODULE> [--data PATH] [--code PATH]... [--env PATH]`
///
/// Prints the written manifest on success.
pub fn run_save(args: &[String]) -> i32 {
    let parsed = match parse_args(args, &["--loader", "--data", "--code", "--env"]) {
        Ok(p) => p,
        Err(e) => return usage_error(&e, "save"),
    };
    let (dst, loader) = match (parsed.positional.first(), parsed.value("--loader")) {
        (Some(dst), Some(loader)) => (PathBuf::from(dst), loader.to_string()),
        _ => return usage_error("save needs <DST> and --loader <MODULE>", "save"),
    };

    let mut request = SaveRequest::new(loader);
    request.data_path = parsed.value("--data").map(PathBuf::from);
    request.code_paths = parsed.values("--code").into_iter().map(PathBuf::from).collect();
    request.env_path = parsed.value("--env").map(PathBuf::from);

    let runtime = PyfuncRuntime::new(RuntimeConfig::from_env());
    let result = runtime
        .save(&dst, &request)
        .and_then(|model| model.to_yaml().map_err(Into::into));
    match result {
        Ok(yaml) => {
            print!("{}", yaml);
            EXIT_OK
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        }
    }
}

/// `inspect <ARTIFACT>`: print the flavor entry and compatibility status.
pub fn run_inspect(args: &[String]) -> i32 {
    let Some(path) = args.first() else {
        return usage_error("inspect needs <ARTIFACT>", "inspect");
    };
    let path = Path::new(path);

    let conf = match load_model_conf(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    };
    let runtime = RuntimeConfig::from_env().runtime_version;

    println!("loader_module:   {}", conf.loader_module);
    println!("runtime_version: {}", conf.runtime_version.as_deref().unwrap_or("(unknown)"));
    println!("code:            {}", conf.code.as_deref().unwrap_or("-"));
    println!("data:            {}", conf.data.as_deref().unwrap_or("-"));
    println!("env:             {}", conf.env.as_deref().unwrap_or("-"));
    for key in conf.extra.keys() {
        println!("extra:           {}", key);
    }
    match check_runtime_version(conf.runtime_version.as_deref(), &runtime) {
        Some(warning) => println!("compatibility:   {}", warning),
        None => println!("compatibility:   ok (running {})", runtime),
    }
    EXIT_OK
}

/// `env <ARTIFACT>`: print the recorded environment file path, if any.
pub fn run_env(args: &[String]) -> i32 {
    let Some(path) = args.first() else {
        return usage_error("env needs <ARTIFACT>", "env");
    };
    match load_model_env(Path::new(path)) {
        Ok(Some(env)) => {
            println!("{}", Path::new(path).join(env).display());
            EXIT_OK
        }
        Ok(None) => EXIT_OK,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        }
    }
}

/// `emit-loader <ARTIFACT> <DEPLOY_PATH> [--out FILE]`
pub fn run_emit_loader(args: &[String]) -> i32 {
    let parsed = match parse_args(args, &["--out"]) {
        Ok(p) => p,
        Err(e) => return usage_error(&e, "emit-loader"),
    };
    let (src, deploy) = match parsed.positional.as_slice() {
        [src, deploy] => (Path::new(src), Path::new(deploy)),
        _ => return usage_error("emit-loader needs <ARTIFACT> <DEPLOY_PATH>", "emit-loader"),
    };

    let runtime = PyfuncRuntime::new(RuntimeConfig::from_env());
    let source = match runtime.emit_loader_source(src, deploy) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    };

    match parsed.value("--out") {
        Some(out) => match std::fs::write(out, source) {
            Ok(()) => EXIT_OK,
            Err(e) => {
                eprintln!("Error writing {}: {}", out, e);
                EXIT_FAILURE
            }
        },
        None => {
            print!("{}", source);
            EXIT_OK
        }
    }
}

pub(crate) fn usage_error(message: &str, command: &str) -> i32 {
    eprintln!("{}", message);
    eprintln!("Run 'pyfunc-cli help {}' for usage.", command);
    EXIT_USAGE
}
