//! Driver plugin contract for iocheck.
//!
//! A driver class exposes:
//! - a [`DriverDescriptor`] declaring which kinds it reads, writes and
//!   lazily materializes
//! - an [`EntryTable`] registering its read/write operations
//! - a constructor for instances bound to one path
//!
//! [`JsonDriverClass`] is a reference implementation used to exercise the
//! conformance harness.

pub mod descriptor;
pub mod driver;
pub mod entry;
pub mod json;

pub use descriptor::{DriverDescriptor, FileMode, ParamSpec};
pub use driver::{Driver, DriverClass, DriverError, OpenDriver};
pub use entry::{EntryPoint, EntryTable, LoadLazyFn, ReadFn, WriteFn};
pub use json::{JsonDriver, JsonDriverClass};
