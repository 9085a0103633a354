//! Per-driver local fixture directories.

use std::path::{Path, PathBuf};

use crate::filesystem::{Filesystem, FsError};

/// Directory created under the system temp dir when no root is given.
pub const DEFAULT_FIXTURE_ROOT: &str = "files_for_testing_iocheck";

/// Root under which per-driver fixture directories are created.
pub fn fixture_root(override_root: Option<&Path>) -> PathBuf {
    match override_root {
        Some(root) => root.to_path_buf(),
        None => std::env::temp_dir().join(DEFAULT_FIXTURE_ROOT),
    }
}

/// Create (or reuse) the fixture directory for a driver and return it.
///
/// The path is deterministic: `<root>/<name>`, so repeated calls within one
/// run land in the same directory.
pub fn ensure_local_dir<F: Filesystem + ?Sized>(
    fs: &F,
    name: &str,
    override_root: Option<&Path>,
) -> Result<PathBuf, FsError> {
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(FsError::Path(format!("invalid fixture directory name: {name:?}")));
    }
    let dir = fixture_root(override_root).join(name);
    if !fs.exists(&dir) {
        fs.create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Create the parent directories needed by nested fixture names such as
/// `session1/data.bin`.
pub fn make_all_directories<F: Filesystem + ?Sized>(
    fs: &F,
    names: &[String],
    dir: &Path,
) -> Result<(), FsError> {
    for name in names {
        let target = dir.join(name);
        if let Some(parent) = target.parent() {
            if parent != dir && !fs.exists(parent) {
                fs.create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}

/// Remove a fixture file or directory, refusing paths outside `dir`.
pub fn cleanup_fixture<F: Filesystem + ?Sized>(fs: &F, path: &Path, dir: &Path) -> Result<(), FsError> {
    if !path.starts_with(dir) || path == dir {
        return Err(FsError::Path(format!(
            "refusing to remove {} outside fixture directory {}",
            path.display(),
            dir.display()
        )));
    }
    fs.remove_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{MockFilesystem, RealFilesystem};
    use tempfile::tempdir;

    #[test]
    fn test_fixture_root_default_under_temp() {
        let root = fixture_root(None);
        assert!(root.starts_with(std::env::temp_dir()));
        assert!(root.ends_with(DEFAULT_FIXTURE_ROOT));
    }

    #[test]
    fn test_ensure_local_dir_with_override() {
        let fs = MockFilesystem::new();
        let dir = ensure_local_dir(&fs, "json", Some(Path::new("/data"))).unwrap();
        assert_eq!(dir, PathBuf::from("/data/json"));
        assert!(fs.exists(&dir));
    }

    #[test]
    fn test_ensure_local_dir_is_reused() {
        let temp = tempdir().unwrap();
        let first = ensure_local_dir(&RealFilesystem, "json", Some(temp.path())).unwrap();
        std::fs::write(first.join("keep.txt"), "x").unwrap();

        let second = ensure_local_dir(&RealFilesystem, "json", Some(temp.path())).unwrap();

        assert_eq!(first, second);
        assert!(second.join("keep.txt").exists());
    }

    #[test]
    fn test_ensure_local_dir_rejects_separators() {
        let fs = MockFilesystem::new();
        assert!(ensure_local_dir(&fs, "a/b", None).is_err());
        assert!(ensure_local_dir(&fs, "", None).is_err());
    }

    #[test]
    fn test_make_all_directories_nested_only() {
        let fs = MockFilesystem::new();
        let names = vec!["flat.bin".to_string(), "session1/run/data.bin".to_string()];
        make_all_directories(&fs, &names, Path::new("/fx")).unwrap();
        assert!(fs.exists(Path::new("/fx/session1/run")));
        assert!(!fs.exists(Path::new("/fx/flat.bin")));
    }

    #[test]
    fn test_cleanup_fixture_inside_dir() {
        let fs = MockFilesystem::new();
        fs.add_file(PathBuf::from("/fx/a.json"), vec![]);
        cleanup_fixture(&fs, Path::new("/fx/a.json"), Path::new("/fx")).unwrap();
        assert!(!fs.exists(Path::new("/fx/a.json")));
    }

    #[test]
    fn test_cleanup_fixture_refuses_outside_dir() {
        let fs = MockFilesystem::new();
        fs.add_file(PathBuf::from("/elsewhere/a.json"), vec![]);
        assert!(cleanup_fixture(&fs, Path::new("/elsewhere/a.json"), Path::new("/fx")).is_err());
        assert!(cleanup_fixture(&fs, Path::new("/fx"), Path::new("/fx")).is_err());
        assert!(fs.exists(Path::new("/elsewhere/a.json")));
    }
}
