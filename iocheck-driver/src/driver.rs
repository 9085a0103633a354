//! Driver plugin contract.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::descriptor::DriverDescriptor;
use crate::entry::EntryTable;

/// Errors raised by driver operations.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Fs(#[from] iocheck_fs::FsError),

    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("failed to encode object: {0}")]
    Encode(String),

    #[error("{kind} objects cannot be handled by {operation}")]
    UnsupportedKind { kind: String, operation: String },

    #[error("{0} contains no object to read")]
    Empty(PathBuf),

    #[error("lazy object cannot be loaded: {0}")]
    LazyLoad(String),

    #[error("driver instance is already closed")]
    Closed,
}

/// An open driver instance bound to one file or directory.
pub trait Driver {
    /// Path the instance reads from and writes to.
    fn path(&self) -> &Path;

    /// Release the underlying resource, flushing pending writes.
    fn close(&mut self) -> Result<(), DriverError>;
}

/// A driver class: its capability descriptor, its registered operations
/// and a constructor for instances.
pub trait DriverClass {
    type Instance: Driver;

    fn descriptor(&self) -> &DriverDescriptor;

    fn entry_points(&self) -> &EntryTable<Self::Instance>;

    /// Open an instance on `path`. `Ok(None)` means the class cannot build a
    /// usable instance for this path.
    fn open(&self, path: &Path) -> Result<Option<Self::Instance>, DriverError>;
}

/// Scoped handle to an open instance.
///
/// [`OpenDriver::close`] releases the instance and reports errors; dropping
/// the handle without closing still releases it, so early returns and
/// panics do not leak open files.
pub struct OpenDriver<D: Driver> {
    inner: D,
    closed: bool,
}

impl<D: Driver> OpenDriver<D> {
    /// Open an instance of `class` on `path`.
    pub fn open<C>(class: &C, path: &Path) -> Result<Option<Self>, DriverError>
    where
        C: DriverClass<Instance = D>,
    {
        Ok(class.open(path)?.map(Self::new))
    }

    pub fn new(inner: D) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    /// Close the instance, surfacing any flush error.
    pub fn close(mut self) -> Result<(), DriverError> {
        self.closed = true;
        self.inner.close()
    }
}

impl<D: Driver> Deref for OpenDriver<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.inner
    }
}

impl<D: Driver> DerefMut for OpenDriver<D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.inner
    }
}

impl<D: Driver> Drop for OpenDriver<D> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.inner.close();
        }
    }
}
