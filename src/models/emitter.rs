//! Deployment loader source emitter.
//!
//! Produces a standalone Rust source file for hosts that receive only the
//! raw artifact. The generated file depends on nothing but the loader crate
//! it names and `std`.

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde_json::json;

use super::code_paths::CodePathFilter;
use super::flavor::load_model_conf;
use super::loader::resolve_within;
use super::registry::is_valid_module_id;
use crate::error::{PyfuncError, ResolveError, Result};

/// Environment variable consulted by generated loaders for extra search
/// path entries.
pub const SEARCH_PATH_ENV: &str = "PYFUNC_SEARCH_PATH";

const TEMPLATE_NAME: &str = "loader";

const LOADER_TEMPLATE: &str = r#"// Generated by pyfunc-core. Do not edit.
//
// Loads the model deployed at {{deploy_root}}.

use std::path::{Path, PathBuf};

/// Loader module recorded in the artifact manifest.
pub const LOADER_MODULE: &str = {{loader_module}};

/// Packaged code directories, searched before `{{search_path_env}}`.
const CODE_DIRS: &[&str] = &[{{#each code_dirs}}
    {{this}},{{/each}}
];

const DATA_PATH: &str = {{data_path}};

/// Packaged code first, then entries from `{{search_path_env}}`.
pub fn search_path() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = CODE_DIRS.iter().map(PathBuf::from).collect();
    if let Some(extra) = std::env::var_os("{{search_path_env}}") {
        dirs.extend(std::env::split_paths(&extra));
    }
    dirs
}

/// Load the deployed model.
pub fn load_pyfunc() -> {{loader_path}}::Pyfunc {
    {{loader_path}}::load_pyfunc(Path::new(DATA_PATH), &search_path())
}
"#;

/// Renders loader sources for deployed artifacts.
pub struct LoaderSourceEmitter {
    handlebars: Handlebars<'static>,
    code_filter: CodePathFilter,
}

impl LoaderSourceEmitter {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // Values are pre-quoted Rust literals.
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string(TEMPLATE_NAME, LOADER_TEMPLATE)
            .map_err(|e| PyfuncError::Template(e.to_string()))?;
        Ok(Self {
            handlebars,
            code_filter: CodePathFilter::default(),
        })
    }

    pub fn with_code_filter(mut self, filter: CodePathFilter) -> Self {
        self.code_filter = filter;
        self
    }

    /// Emit loader source for the artifact at `src`, to be deployed at
    /// `deploy`.
    ///
    /// Paths embedded in the output are absolute and rooted at `deploy`.
    pub fn emit(&self, src: &Path, deploy: &Path) -> Result<String> {
        let conf = load_model_conf(src)?;
        // The identifier is spliced into the output as a Rust path.
        if !is_valid_module_id(&conf.loader_module) {
            return Err(ResolveError::InvalidModuleId(conf.loader_module).into());
        }
        let deploy = absolute(deploy)?;

        let mut code_dirs = Vec::new();
        if let Some(code) = conf.code_dir() {
            let src_code = resolve_within(src, "code", code)?;
            let deploy_code = deploy.join(code);
            code_dirs.push(rust_literal(&deploy_code));
            for dir in self.code_filter.resolve(&src_code, Some(&deploy_code))? {
                code_dirs.push(rust_literal(&dir));
            }
        }

        let data_path = match conf.data.as_deref() {
            Some(data) => {
                resolve_within(src, "data", data)?;
                deploy.join(data)
            }
            None => deploy.clone(),
        };

        let data = json!({
            "deploy_root": deploy.display().to_string(),
            "loader_module": format!("{:?}", conf.loader_module),
            "loader_path": conf.loader_module.replace('.', "::"),
            "code_dirs": code_dirs,
            "data_path": rust_literal(&data_path),
            "search_path_env": SEARCH_PATH_ENV,
        });

        let source = self
            .handlebars
            .render(TEMPLATE_NAME, &data)
            .map_err(|e| PyfuncError::Template(e.to_string()))?;
        tracing::debug!(module = %conf.loader_module, bytes = source.len(), "loader source emitted");
        Ok(source)
    }
}

/// Emit loader source with the default code filter.
pub fn emit_loader_source(src: &Path, deploy: &Path) -> Result<String> {
    LoaderSourceEmitter::new()?.emit(src, deploy)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn rust_literal(path: &Path) -> String {
    format!("{:?}", path.to_string_lossy())
}
