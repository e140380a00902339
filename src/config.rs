//! Runtime configuration loading from environment variables.
//!
//! All configuration values are loaded from `PYFUNC_*` environment variables
//! with sensible defaults. Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `PYFUNC_SEARCH_PATH` | (empty) | Extra search path entries (OS path list) |
//! | `PYFUNC_RUNTIME_VERSION` | build toolchain | Compatibility tag of this runtime |
//! | `PYFUNC_SUPPRESS_WARNINGS` | false | Silence compatibility warnings |
//! | `PYFUNC_CODE_EXCLUDE` | (empty) | Extra code entry exclusions (comma-separated regexes) |
//! | `PYFUNC_BROADCAST_DIR` | `<tmp>/pyfunc-broadcast` | Shared directory for published artifacts |
//! | `PYFUNC_WORKER_DIR` | `<tmp>/pyfunc-worker-<pid>` | Worker-local artifact copies |
//! | `PYFUNC_BATCH_WORKERS` | CPU count | Concurrent batch partitions |
//! | `PYFUNC_BATCH_SIZE` | 1024 | Rows per batch partition |
//! | `PYFUNC_LOG_FORMAT` | json | `json` or `pretty` |
//! | `PYFUNC_LOG_LEVEL` | info | Log filter directive |

use std::path::PathBuf;

use serde::Serialize;

use crate::distributed::ExecutorConfig;
use crate::models::{CodePathFilter, RuntimeVersion, SearchPath};
use crate::telemetry::{LogConfig, LogFormat};

pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Effective runtime configuration summary (serializable).
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub search_path: Vec<PathBuf>,
    pub runtime_version: String,
    pub suppress_warnings: bool,
    pub code_exclude: Vec<String>,
    pub broadcast_dir: PathBuf,
    pub worker_dir: PathBuf,
    pub batch_workers: usize,
    pub batch_size: usize,
    pub log_format: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

/// All runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub search_path: SearchPath,
    pub runtime_version: RuntimeVersion,
    pub suppress_warnings: bool,
    /// Exclusion patterns beyond the built-in ones.
    pub code_exclude: Vec<String>,
    pub broadcast_dir: PathBuf,
    pub worker_dir: PathBuf,
    pub executor: ExecutorConfig,
    pub log: LogConfig,
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a boolean env var (`1`/`true`/`yes`/`on`, case-insensitive).
fn parse_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn load_search_path() -> SearchPath {
    match std::env::var_os("PYFUNC_SEARCH_PATH") {
        Some(list) => SearchPath::from_os_list(&list),
        None => SearchPath::default(),
    }
}

/// Extra exclusion patterns. Patterns that fail to compile are dropped.
fn load_code_exclude() -> Vec<String> {
    let raw = non_empty_var("PYFUNC_CODE_EXCLUDE").unwrap_or_default();
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter(|p| regex::Regex::new(p).is_ok())
        .map(str::to_string)
        .collect()
}

fn load_executor_config() -> ExecutorConfig {
    let workers = parse_usize("PYFUNC_BATCH_WORKERS", num_cpus::get());
    let batch_size = parse_usize("PYFUNC_BATCH_SIZE", DEFAULT_BATCH_SIZE);
    ExecutorConfig {
        workers: workers.max(1),
        batch_size: batch_size.max(1), // floor: 1 row
    }
}

fn load_log_config() -> LogConfig {
    let format = non_empty_var("PYFUNC_LOG_FORMAT")
        .and_then(|f| f.parse::<LogFormat>().ok())
        .unwrap_or_default();
    let level = non_empty_var("PYFUNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
    LogConfig {
        format,
        level,
        output_path: non_empty_var("PYFUNC_LOG_FILE").map(PathBuf::from),
    }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    let tmp = std::env::temp_dir();
    let runtime_version = non_empty_var("PYFUNC_RUNTIME_VERSION")
        .map(RuntimeVersion::new)
        .unwrap_or_else(RuntimeVersion::current);

    EnvConfig {
        search_path: load_search_path(),
        runtime_version,
        suppress_warnings: parse_bool("PYFUNC_SUPPRESS_WARNINGS", false),
        code_exclude: load_code_exclude(),
        broadcast_dir: non_empty_var("PYFUNC_BROADCAST_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| tmp.join("pyfunc-broadcast")),
        worker_dir: non_empty_var("PYFUNC_WORKER_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| tmp.join(format!("pyfunc-worker-{}", std::process::id()))),
        executor: load_executor_config(),
        log: load_log_config(),
    }
}

impl EnvConfig {
    /// Code filter with the configured extra exclusions.
    pub fn code_filter(&self) -> CodePathFilter {
        CodePathFilter::with_extra(&self.code_exclude).unwrap_or_default()
    }

    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            search_path: self.search_path.dirs().to_vec(),
            runtime_version: self.runtime_version.to_string(),
            suppress_warnings: self.suppress_warnings,
            code_exclude: self.code_exclude.clone(),
            broadcast_dir: self.broadcast_dir.clone(),
            worker_dir: self.worker_dir.clone(),
            batch_workers: self.executor.workers,
            batch_size: self.executor.batch_size,
            log_format: match self.log.format {
                LogFormat::Json => "json".to_string(),
                LogFormat::Pretty => "pretty".to_string(),
            },
            log_level: self.log.level.clone(),
            log_file: self.log.output_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serialize env-mutating tests to avoid cross-test pollution.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "PYFUNC_SEARCH_PATH",
        "PYFUNC_RUNTIME_VERSION",
        "PYFUNC_SUPPRESS_WARNINGS",
        "PYFUNC_CODE_EXCLUDE",
        "PYFUNC_BROADCAST_DIR",
        "PYFUNC_WORKER_DIR",
        "PYFUNC_BATCH_WORKERS",
        "PYFUNC_BATCH_SIZE",
        "PYFUNC_LOG_FORMAT",
        "PYFUNC_LOG_LEVEL",
        "PYFUNC_LOG_FILE",
    ];

    fn clear_env_vars() {
        for k in ENV_KEYS {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn test_defaults_are_sensible() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        let cfg = load();
        assert!(cfg.search_path.is_empty());
        assert_eq!(cfg.runtime_version, RuntimeVersion::current());
        assert!(!cfg.suppress_warnings);
        assert!(cfg.code_exclude.is_empty());
        assert_eq!(cfg.broadcast_dir, std::env::temp_dir().join("pyfunc-broadcast"));
        assert!(cfg.worker_dir.to_string_lossy().contains("pyfunc-worker-"));
        assert_eq!(cfg.executor.workers, num_cpus::get().max(1));
        assert_eq!(cfg.executor.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn test_env_vars_override_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        let joined = std::env::join_paths(["/opt/a", "/opt/b"]).unwrap();
        std::env::set_var("PYFUNC_SEARCH_PATH", &joined);
        std::env::set_var("PYFUNC_RUNTIME_VERSION", "1.70.0");
        std::env::set_var("PYFUNC_SUPPRESS_WARNINGS", "TRUE");
        std::env::set_var("PYFUNC_BATCH_WORKERS", "3");
        std::env::set_var("PYFUNC_BATCH_SIZE", "64");
        std::env::set_var("PYFUNC_LOG_FORMAT", "pretty");
        let cfg = load();
        assert_eq!(cfg.search_path.dirs(), &[PathBuf::from("/opt/a"), PathBuf::from("/opt/b")]);
        assert_eq!(cfg.runtime_version.as_str(), "1.70.0");
        assert!(cfg.suppress_warnings);
        assert_eq!(cfg.executor.workers, 3);
        assert_eq!(cfg.executor.batch_size, 64);
        assert_eq!(cfg.log.format, LogFormat::Pretty);
        clear_env_vars();
    }

    #[test]
    fn test_invalid_env_falls_back_to_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("PYFUNC_BATCH_SIZE", "lots");
        std::env::set_var("PYFUNC_SUPPRESS_WARNINGS", "maybe");
        std::env::set_var("PYFUNC_LOG_FORMAT", "xml");
        let cfg = load();
        assert_eq!(cfg.executor.batch_size, DEFAULT_BATCH_SIZE);
        assert!(!cfg.suppress_warnings);
        assert_eq!(cfg.log.format, LogFormat::Json);
        clear_env_vars();
    }

    #[test]
    fn test_batch_size_floor() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("PYFUNC_BATCH_SIZE", "0");
        std::env::set_var("PYFUNC_BATCH_WORKERS", "0");
        let cfg = load();
        assert_eq!(cfg.executor.batch_size, 1);
        assert_eq!(cfg.executor.workers, 1);
        clear_env_vars();
    }

    #[test]
    fn test_code_exclude_drops_invalid_patterns() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("PYFUNC_CODE_EXCLUDE", r"\.md$, [unclosed ,^target$");
        let cfg = load();
        assert_eq!(cfg.code_exclude, vec![r"\.md$".to_string(), "^target$".to_string()]);
        let filter = cfg.code_filter();
        assert!(filter.is_excluded("README.md"));
        assert!(filter.is_excluded("target"));
        assert!(filter.is_excluded("module.pyc"));
        assert!(!filter.is_excluded("mypkg"));
        clear_env_vars();
    }

    #[test]
    fn test_effective_config_mirrors_values() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        let cfg = load();
        let eff = cfg.effective_config();
        assert_eq!(eff.batch_size, cfg.executor.batch_size);
        assert_eq!(eff.runtime_version, cfg.runtime_version.to_string());
        assert_eq!(eff.log_format, "json");
        assert_eq!(eff.log_file, None);
        assert!(serde_json::to_string(&eff).is_ok());
    }

    #[test]
    fn test_log_file_from_env() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("PYFUNC_LOG_FILE", "/var/log/pyfunc.log");
        let cfg = load();
        clear_env_vars();
        assert_eq!(cfg.log.output_path, Some(PathBuf::from("/var/log/pyfunc.log")));
    }
}
