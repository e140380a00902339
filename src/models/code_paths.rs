//! Computes the directories packaged code contributes to a search path.
//!
//! Loose source-module files and compiled or cache entries are never added:
//! the code directory itself already covers loose modules, and compiled
//! output may be stale or built for another platform.

use std::path::{Path, PathBuf};

use regex::RegexSet;

use crate::error::Result;

/// Entry names excluded by default.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[r"\.py$", r"\.pyc$", r"^__pycache__$"];

/// Name-based filter over code directory entries.
#[derive(Debug, Clone)]
pub struct CodePathFilter {
    excluded: RegexSet,
}

impl CodePathFilter {
    /// Default patterns plus `extra` ones. Invalid extra patterns are an error.
    pub fn with_extra<I, S>(extra: I) -> std::result::Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<String> =
            DEFAULT_EXCLUDE_PATTERNS.iter().map(|p| p.to_string()).collect();
        patterns.extend(extra.into_iter().map(|p| p.as_ref().to_string()));
        Ok(Self {
            excluded: RegexSet::new(&patterns)?,
        })
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.is_match(name)
    }

    /// Entries of `src_code_dir` rewritten under `dst_code_dir`
    /// (`src_code_dir` when `None`), sorted by name.
    pub fn resolve(&self, src_code_dir: &Path, dst_code_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
        let dst = dst_code_dir.unwrap_or(src_code_dir);

        let mut names: Vec<_> = std::fs::read_dir(src_code_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name())
            .filter(|name| !self.is_excluded(&name.to_string_lossy()))
            .collect();
        names.sort();

        Ok(names.into_iter().map(|name| dst.join(name)).collect())
    }
}

impl Default for CodePathFilter {
    fn default() -> Self {
        let patterns = DEFAULT_EXCLUDE_PATTERNS;
        Self {
            // Built-in patterns are known to compile.
            excluded: RegexSet::new(patterns).unwrap_or_else(|_| RegexSet::empty()),
        }
    }
}

/// [`CodePathFilter::resolve`] with the default exclusions.
pub fn resolve_code_dirs(src_code_dir: &Path, dst_code_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    CodePathFilter::default().resolve(src_code_dir, dst_code_dir)
}
