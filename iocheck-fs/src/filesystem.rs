//! Filesystem trait with real and in-memory implementations.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

/// Errors from filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path error: {0}")]
    Path(String),
}

impl FsError {
    fn io(path: &Path, source: io::Error) -> Self {
        FsError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Filesystem operations needed to stage and clean fixtures.
/// Abstracted for testing with mock implementations.
pub trait Filesystem: Send + Sync {
    /// Write data atomically to a path (write to temp, then rename).
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;

    /// Read a whole file.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Check if a file or directory exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and parents if needed.
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;

    /// Remove a file, or a directory with its contents.
    /// Removing a missing path is not an error.
    fn remove_path(&self, path: &Path) -> Result<(), FsError>;
}

/// Real filesystem implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

impl Filesystem for RealFilesystem {
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| FsError::io(parent, e))?;
            }
        }

        let mut temp_name = path
            .file_name()
            .ok_or_else(|| FsError::Path(format!("no file name in {}", path.display())))?
            .to_os_string();
        temp_name.push(".part");
        let temp_path = path.with_file_name(temp_name);

        fs::write(&temp_path, data).map_err(|e| FsError::io(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| FsError::io(path, e))?;
        Ok(())
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        fs::read(path).map_err(|e| FsError::io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path).map_err(|e| FsError::io(path, e))
    }

    fn remove_path(&self, path: &Path) -> Result<(), FsError> {
        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::io(path, e)),
        }
    }
}

/// Mock filesystem for testing.
/// Cloning creates a new handle to the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MockFilesystem {
    files: Arc<RwLock<BTreeMap<PathBuf, Vec<u8>>>>,
    dirs: Arc<RwLock<BTreeSet<PathBuf>>>,
}

impl MockFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of all files, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.files
            .read()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Content of a specific file.
    pub fn get_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().ok()?.get(path).cloned()
    }

    /// Add a file directly (for test setup).
    pub fn add_file(&self, path: PathBuf, data: Vec<u8>) {
        if let Ok(mut files) = self.files.write() {
            files.insert(path, data);
        }
    }

    fn poisoned(path: &Path) -> FsError {
        FsError::Path(format!("mock filesystem lock poisoned at {}", path.display()))
    }
}

impl Filesystem for MockFilesystem {
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let mut files = self.files.write().map_err(|_| Self::poisoned(path))?;
        files.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let files = self.files.read().map_err(|_| Self::poisoned(path))?;
        files.get(path).cloned().ok_or_else(|| {
            FsError::io(
                path,
                io::Error::new(io::ErrorKind::NotFound, "file not found"),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        let in_files = self
            .files
            .read()
            .map(|files| files.contains_key(path))
            .unwrap_or(false);
        let in_dirs = self
            .dirs
            .read()
            .map(|dirs| dirs.contains(path))
            .unwrap_or(false);
        in_files || in_dirs
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let mut dirs = self.dirs.write().map_err(|_| Self::poisoned(path))?;
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                dirs.insert(ancestor.to_path_buf());
            }
        }
        Ok(())
    }

    fn remove_path(&self, path: &Path) -> Result<(), FsError> {
        let mut files = self.files.write().map_err(|_| Self::poisoned(path))?;
        files.retain(|p, _| !p.starts_with(path));
        drop(files);
        let mut dirs = self.dirs.write().map_err(|_| Self::poisoned(path))?;
        dirs.retain(|p| !p.starts_with(path));
        Ok(())
    }
}
