//! Filesystem helpers for artifact trees.
//!
//! Trees are walked explicitly; symlinks are followed and their targets
//! copied.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Copy a file or a directory tree to `dst`. `dst` must not exist.
pub fn copy_file_or_tree(src: &Path, dst: &Path) -> io::Result<()> {
    if fs::metadata(src)?.is_dir() {
        copy_dir_all(src, dst)
    } else {
        fs::copy(src, dst).map(|_| ())
    }
}

/// Recursive directory copy.
pub fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if fs::metadata(&from)?.is_dir() {
            copy_dir_all(&from, &to)?;
        } else {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

/// Final path component of `src` after resolving `.`/`..` and symlinks.
pub fn base_name(src: &Path) -> io::Result<String> {
    let canonical = src.canonicalize()?;
    canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path has no file name: {}", src.display()),
            )
        })
}

/// Relative paths of every file below `root`, `/`-separated and sorted.
pub fn list_files(root: &Path) -> io::Result<Vec<String>> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if fs::metadata(&path)?.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            let rel: PathBuf = path.strip_prefix(root).map(Path::to_path_buf).unwrap_or(path.clone());
            let parts: Vec<_> = rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
            out.push(parts.join("/"));
        }
    }
    Ok(())
}

/// SHA-256 over the sorted relative file names and contents of a tree.
///
/// Two trees with the same files and bytes hash identically regardless of
/// where they live or in which order the OS lists them.
pub fn digest_tree(root: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];

    for rel in list_files(root)? {
        hasher.update((rel.len() as u64).to_le_bytes());
        hasher.update(rel.as_bytes());

        let mut file = fs::File::open(root.join(&rel))?;
        hasher.update(file.metadata()?.len().to_le_bytes());
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree(root: &Path) {
        fs::create_dir_all(root.join("pkg/sub")).unwrap();
        fs::write(root.join("a.txt"), "alpha").unwrap();
        fs::write(root.join("pkg/b.txt"), "beta").unwrap();
        fs::write(root.join("pkg/sub/c.txt"), "gamma").unwrap();
    }

    #[test]
    fn test_copy_tree_preserves_layout() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        sample_tree(src.path());

        let target = dst.path().join("copy");
        copy_file_or_tree(src.path(), &target).unwrap();
        assert_eq!(list_files(&target).unwrap(), vec!["a.txt", "pkg/b.txt", "pkg/sub/c.txt"]);
        assert_eq!(fs::read_to_string(target.join("pkg/sub/c.txt")).unwrap(), "gamma");
    }

    #[test]
    fn test_copy_single_file() {
        let src = tempfile::tempdir().unwrap();
        fs::write(src.path().join("model.bin"), [1u8, 2, 3]).unwrap();
        let target = src.path().join("model-copy.bin");
        copy_file_or_tree(&src.path().join("model.bin"), &target).unwrap();
        assert_eq!(fs::read(target).unwrap(), vec![1u8, 2, 3]);
    }

    #[test]
    fn test_digest_is_location_independent() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        sample_tree(a.path());
        sample_tree(b.path());
        assert_eq!(digest_tree(a.path()).unwrap(), digest_tree(b.path()).unwrap());

        fs::write(b.path().join("pkg/b.txt"), "BETA").unwrap();
        assert_ne!(digest_tree(a.path()).unwrap(), digest_tree(b.path()).unwrap());
    }

    #[test]
    fn test_digest_distinguishes_file_boundaries() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::write(a.path().join("ab"), "c").unwrap();
        fs::write(b.path().join("a"), "bc").unwrap();
        assert_ne!(digest_tree(a.path()).unwrap(), digest_tree(b.path()).unwrap());
    }

    #[test]
    fn test_base_name_resolves_dot() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("model_dir");
        fs::create_dir(&nested).unwrap();
        assert_eq!(base_name(&nested.join(".")).unwrap(), "model_dir");
    }
}
