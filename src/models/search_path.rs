//! Ordered lookup locations handed to a loader for a single load.
//!
//! The path is a value, never process-global state, so concurrent loads
//! cannot observe each other's prepends.

use std::ffi::OsStr;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Parse an OS path list (`a:b:c` on unix, `a;b;c` on windows).
    pub fn from_os_list(list: &OsStr) -> Self {
        Self {
            dirs: std::env::split_paths(list)
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
        }
    }

    /// New path with `dirs` ahead of the current entries.
    pub fn prepended<I>(&self, dirs: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut combined: Vec<PathBuf> = dirs.into_iter().collect();
        combined.extend(self.dirs.iter().cloned());
        Self { dirs: combined }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.dirs.iter()
    }
}

impl<'a> IntoIterator for &'a SearchPath {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.dirs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepend_keeps_existing_entries_last() {
        let base = SearchPath::new(vec![PathBuf::from("/usr/lib/models")]);
        let path = base.prepended(vec![PathBuf::from("/a/code"), PathBuf::from("/a/code/pkg")]);
        assert_eq!(
            path.dirs(),
            &[
                PathBuf::from("/a/code"),
                PathBuf::from("/a/code/pkg"),
                PathBuf::from("/usr/lib/models"),
            ]
        );
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_from_os_list_skips_empty_segments() {
        let joined = std::env::join_paths([PathBuf::from("/x"), PathBuf::from("/y")]).unwrap();
        let path = SearchPath::from_os_list(&joined);
        assert_eq!(path.len(), 2);
        assert!(SearchPath::from_os_list(OsStr::new("")).is_empty());
    }
}
