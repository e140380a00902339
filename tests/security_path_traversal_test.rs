//! Path traversal tests for manifest-relative paths.
//!
//! A manifest must never direct the loader or the emitter outside the
//! artifact directory.

use std::path::Path;
use std::sync::Arc;

use pyfunc_core::models::{emit_loader_source, resolve_within, LoaderRegistry, ModelLoader, MLMODEL_FILE_NAME};
use pyfunc_core::PyfuncError;

fn write_manifest(dir: &Path, data: Option<&str>, code: Option<&str>) {
    let mut yaml = String::from("flavors:\n  python_function:\n    loader_module: pyfunc_core.builtin.linear\n");
    if let Some(data) = data {
        yaml.push_str(&format!("    data: '{}'\n", data));
    }
    if let Some(code) = code {
        yaml.push_str(&format!("    code: '{}'\n", code));
    }
    std::fs::write(dir.join(MLMODEL_FILE_NAME), yaml).unwrap();
}

fn assert_not_allowed(err: PyfuncError) {
    assert!(matches!(err, PyfuncError::PathNotAllowed { .. }), "{:?}", err);
}

#[test]
fn test_parent_traversal_rejected() {
    let dir = tempfile::tempdir().unwrap();
    for path in ["../etc/passwd", "data/../../secret", "..", "a/b/../../../c"] {
        assert_not_allowed(resolve_within(dir.path(), "data", path).unwrap_err());
    }
}

#[test]
fn test_absolute_path_rejected() {
    let dir = tempfile::tempdir().unwrap();
    assert_not_allowed(resolve_within(dir.path(), "data", "/etc/passwd").unwrap_err());
}

#[test]
fn test_nested_relative_path_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let resolved = resolve_within(dir.path(), "data", "data/model.json").unwrap();
    assert_eq!(resolved, dir.path().join("data/model.json"));
}

#[cfg(unix)]
#[test]
fn test_symlink_escape_rejected() {
    let outside = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("data")).unwrap();
    assert_not_allowed(resolve_within(dir.path(), "data", "data").unwrap_err());
}

#[test]
fn test_load_rejects_escaping_data() {
    let loader = ModelLoader::new(Arc::new(LoaderRegistry::with_builtins()));
    for data in ["../weights.json", "/tmp/weights.json"] {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), Some(data), None);
        assert_not_allowed(loader.load(dir.path(), true).unwrap_err());
    }
}

#[test]
fn test_load_rejects_escaping_code() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), None, Some("../code"));
    let loader = ModelLoader::new(Arc::new(LoaderRegistry::with_builtins()));
    assert_not_allowed(loader.load(dir.path(), true).unwrap_err());
}

#[test]
fn test_emit_rejects_escaping_data() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), Some("../weights.json"), None);
    assert_not_allowed(emit_loader_source(dir.path(), Path::new("/srv/model")).unwrap_err());
}
