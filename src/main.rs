//! pyfunc-cli entry point.
//!
//! ## CLI Subcommands
//!
//! - `pyfunc-cli save` - Package a new artifact
//! - `pyfunc-cli inspect` - Show an artifact's flavor entry
//! - `pyfunc-cli predict` - Load an artifact and predict a JSON frame
//! - `pyfunc-cli config` - Show or validate configuration

use std::process::ExitCode;

use pyfunc_core::cli::{config_cmd, models_cmd, predict_cmd, EXIT_USAGE};
use pyfunc_core::config as pyfunc_config;
use pyfunc_core::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");
    let rest = args.get(2..).unwrap_or(&[]);

    init_logging();

    let code = match command {
        "save" => models_cmd::run_save(rest),
        "inspect" => models_cmd::run_inspect(rest),
        "env" => models_cmd::run_env(rest),
        "emit-loader" => models_cmd::run_emit_loader(rest),
        "predict" => predict_cmd::run_predict(rest),
        "predict-batch" => predict_cmd::run_predict_batch(rest).await,
        "config" => {
            let subcommand = rest.first().map(|s| s.as_str()).unwrap_or("show");
            match subcommand {
                "show" => config_cmd::run_show(rest.iter().any(|a| a == "--json")),
                "defaults" => {
                    config_cmd::run_defaults();
                    0
                }
                "validate" => config_cmd::run_validate(),
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_command_help("config");
                    EXIT_USAGE
                }
            }
        }
        "help" | "--help" | "-h" => {
            // Check if help is requested for a specific command
            if let Some(subcommand) = rest.first() {
                print_command_help(subcommand);
            } else {
                print_usage();
            }
            0
        }
        "version" | "--version" | "-V" => {
            println!("pyfunc-cli {}", env!("CARGO_PKG_VERSION"));
            0
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            EXIT_USAGE
        }
    };

    ExitCode::from(code as u8)
}

/// Logging goes to stderr so stdout stays machine-readable.
fn init_logging() {
    let log = pyfunc_config::load().log;
    if let Err(e) = telemetry::init_logging(&log) {
        eprintln!("Logging disabled: {}", e);
    }
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "pyfunc-cli - self-describing model artifacts v{}

USAGE:
    pyfunc-cli <COMMAND> [OPTIONS]

COMMANDS:
    save           Package a new artifact
    inspect        Show an artifact's flavor entry and compatibility
    env            Print the artifact's environment file, if any
    emit-loader    Generate standalone loader source for a deployed artifact
    predict        Load an artifact and predict a JSON frame
    predict-batch  Predict a JSON frame through the batch executor
    config         Manage configuration (show, defaults, validate)
    version        Show version information
    help           Show this help message

ENVIRONMENT:
    PYFUNC_SEARCH_PATH        Extra search path entries
    PYFUNC_RUNTIME_VERSION    Override the runtime compatibility tag
    PYFUNC_SUPPRESS_WARNINGS  Silence compatibility warnings
    PYFUNC_LOG_FORMAT         json (default) or pretty
    PYFUNC_LOG_LEVEL          Log filter (default: info)
    PYFUNC_LOG_FILE           Append logs to this file instead of stderr

EXIT CODES:
    0  Success
    1  Failure
    2  Usage error
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "save" => {
            eprintln!(
                "pyfunc-cli save - Package a new artifact

USAGE:
    pyfunc-cli save <DST> --loader <MODULE> [OPTIONS]

OPTIONS:
    --loader <MODULE>  Registered loader module (required)
    --data <PATH>      File or directory copied under data/
    --code <PATH>      File or directory copied under code/ (repeatable)
    --env <PATH>       Environment file copied to mlflow_env.yml

DESCRIPTION:
    Writes a new artifact directory and prints its MLmodel manifest.
    Fails if <DST> already exists.

EXAMPLES:
    pyfunc-cli save ./model --loader pyfunc_core.builtin.linear --data weights.json
"
            );
        }
        "inspect" | "env" => {
            eprintln!(
                "pyfunc-cli {} - Read an artifact's manifest

USAGE:
    pyfunc-cli {} <ARTIFACT>
",
                command, command
            );
        }
        "emit-loader" => {
            eprintln!(
                "pyfunc-cli emit-loader - Generate loader source

USAGE:
    pyfunc-cli emit-loader <ARTIFACT> <DEPLOY_PATH> [--out FILE]

DESCRIPTION:
    Reads the artifact at <ARTIFACT> and prints a standalone Rust source file
    whose load_pyfunc() loads the artifact once deployed at <DEPLOY_PATH>.
"
            );
        }
        "predict" | "predict-batch" => {
            eprintln!(
                "pyfunc-cli {} - Predict a JSON frame

USAGE:
    pyfunc-cli {} <ARTIFACT> [--input FILE] [--result-type TYPE]

OPTIONS:
    --input FILE        JSON frame {{\"columns\": [...], \"data\": [[...]]}} (default: stdin)
    --result-type TYPE  predict-batch only: double, float, long, integer, string, boolean

EXAMPLES:
    pyfunc-cli predict ./model --input frame.json
    cat frame.json | pyfunc-cli predict-batch ./model --result-type long
",
                command, command
            );
        }
        "config" => {
            eprintln!(
                "pyfunc-cli config - Manage configuration

USAGE:
    pyfunc-cli config <SUBCOMMAND> [--json]

SUBCOMMANDS:
    show           Show current configuration
    validate       Validate configuration
    defaults       Show default configuration
"
            );
        }
        _ => {
            eprintln!(
                "No detailed help available for '{}'. Use 'pyfunc-cli help' for general usage.",
                command
            );
        }
    }
}
