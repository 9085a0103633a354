//! Filesystem abstraction for iocheck.
//!
//! This crate provides:
//! - Filesystem trait for atomic writes, reads and removal
//! - Real and in-memory implementations
//! - Per-driver local fixture directories and cleanup

pub mod filesystem;
pub mod local;

pub use filesystem::{Filesystem, FsError, MockFilesystem, RealFilesystem};
pub use local::{cleanup_fixture, ensure_local_dir, fixture_root, make_all_directories, DEFAULT_FIXTURE_ROOT};
