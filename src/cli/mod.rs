// Copyright 2024-2026 pyfunc-core Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI module for pyfunc-cli commands.
//!
//! Every command works on local artifact directories and reads runtime
//! settings from `PYFUNC_*` environment variables.
//!
//! ## Usage
//!
//! ```bash
//! pyfunc-cli save ./model --loader pyfunc_core.builtin.linear --data weights.json
//! pyfunc-cli inspect ./model
//! pyfunc-cli predict ./model --input frame.json
//! ```

pub mod config_cmd;
pub mod models_cmd;
pub mod predict_cmd;

/// Exit code for success.
pub const EXIT_OK: i32 = 0;
/// Exit code for a failed operation.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for invalid arguments.
pub const EXIT_USAGE: i32 = 2;

/// Flags and positional arguments of one command invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    pub options: Vec<(String, String)>,
    pub switches: Vec<String>,
}

impl ParsedArgs {
    /// Last value given for `--name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value given for a repeatable `--name`.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.options
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn has_switch(&self, name: &str) -> bool {
        self.switches.iter().any(|s| s == name)
    }
}

/// Split `args` into positionals, `--flag value` options and bare switches.
///
/// `with_value` lists the flags that consume the next argument.
pub fn parse_args(args: &[String], with_value: &[&str]) -> Result<ParsedArgs, String> {
    let mut parsed = ParsedArgs::default();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if with_value.contains(&arg) {
            match args.get(i + 1) {
                Some(value) => {
                    parsed.options.push((arg.to_string(), value.clone()));
                    i += 2;
                }
                None => return Err(format!("Missing value for {}", arg)),
            }
        } else if arg.starts_with("--") && arg.len() > 2 {
            parsed.switches.push(arg.to_string());
            i += 1;
        } else {
            parsed.positional.push(arg.to_string());
            i += 1;
        }
    }
    Ok(parsed)
}
