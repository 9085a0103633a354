//! Resolve generic read/write requests to a driver's registered operations.

use std::fmt;
use std::path::Path;

use iocheck_driver::{DriverClass, DriverError, EntryPoint, OpenDriver, ReadFn, WriteFn};
use iocheck_schema::DomainObject;
use thiserror::Error;

use crate::types::FailureCause;

/// What to read or write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Target {
    /// The driver's highest supported kind.
    #[default]
    Highest,
    /// The untyped `read()` / `write(obj)` operations.
    Untyped,
    Kind(iocheck_schema::Kind),
    /// A driver-specific operation name.
    Named(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Highest => f.write_str("highest"),
            Target::Untyped => f.write_str("untyped"),
            Target::Kind(kind) => write!(f, "{kind}"),
            Target::Named(name) => f.write_str(name),
        }
    }
}

/// Errors resolving an entry point.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("{driver} has no {operation} operation")]
    MissingEntryPoint { driver: String, operation: String },

    #[error("{driver} declares no supported kinds")]
    NoSupportedKinds { driver: String },
}

/// Map a target to an entry point of `class`.
pub fn resolve_entry<C: DriverClass>(class: &C, target: &Target) -> Result<EntryPoint, DispatchError> {
    let descriptor = class.descriptor();
    match target {
        Target::Highest => descriptor
            .supported_kinds()
            .first()
            .map(|kind| EntryPoint::Kind(*kind))
            .ok_or_else(|| DispatchError::NoSupportedKinds {
                driver: descriptor.name().to_string(),
            }),
        Target::Untyped => Ok(EntryPoint::Untyped),
        Target::Kind(kind) => Ok(EntryPoint::Kind(*kind)),
        Target::Named(name) => Ok(EntryPoint::Named(name.clone())),
    }
}

/// A read operation bound to its flags.
pub struct ResolvedReader<D> {
    f: ReadFn<D>,
    operation: String,
    lazy: bool,
}

impl<D> ResolvedReader<D> {
    pub fn call(&self, instance: &mut D) -> Result<Vec<DomainObject>, DriverError> {
        (self.f)(instance, self.lazy)
    }

    /// Operation name, e.g. `read_all_segments`.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn lazy(&self) -> bool {
        self.lazy
    }
}

impl<D> fmt::Debug for ResolvedReader<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedReader")
            .field("operation", &self.operation)
            .field("lazy", &self.lazy)
            .finish()
    }
}

/// A write operation.
pub struct ResolvedWriter<D> {
    f: WriteFn<D>,
    operation: String,
}

impl<D> ResolvedWriter<D> {
    /// Write `obj` and return the object that was written.
    pub fn call(&self, instance: &mut D, obj: &DomainObject) -> Result<DomainObject, DriverError> {
        (self.f)(instance, obj)?;
        Ok(obj.clone())
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl<D> fmt::Debug for ResolvedWriter<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedWriter")
            .field("operation", &self.operation)
            .finish()
    }
}

/// Resolve a read operation. The untyped entry point ignores `read_all`
/// since it already returns every top-level object.
pub fn resolve_reader<C: DriverClass>(
    class: &C,
    target: &Target,
    lazy: bool,
    read_all: bool,
) -> Result<ResolvedReader<C::Instance>, DispatchError> {
    let entry = resolve_entry(class, target)?;
    let read_all = read_all && entry != EntryPoint::Untyped;
    let operation = entry.read_name(read_all);
    let f = class
        .entry_points()
        .find_reader(&entry, read_all)
        .ok_or_else(|| DispatchError::MissingEntryPoint {
            driver: class.descriptor().name().to_string(),
            operation: operation.clone(),
        })?;
    Ok(ResolvedReader { f, operation, lazy })
}

pub fn resolve_writer<C: DriverClass>(
    class: &C,
    target: &Target,
) -> Result<ResolvedWriter<C::Instance>, DispatchError> {
    let entry = resolve_entry(class, target)?;
    let operation = entry.write_name();
    let f = class
        .entry_points()
        .find_writer(&entry)
        .ok_or_else(|| DispatchError::MissingEntryPoint {
            driver: class.descriptor().name().to_string(),
            operation: operation.clone(),
        })?;
    Ok(ResolvedWriter { f, operation })
}

/// Open `path`, read it through `reader` and close the instance.
///
/// A class that yields no instance for a path it is asked to read is a
/// contract failure.
pub fn read_path<C: DriverClass>(
    class: &C,
    reader: &ResolvedReader<C::Instance>,
    path: &Path,
) -> Result<Vec<DomainObject>, FailureCause> {
    let mut instance = OpenDriver::open(class, path)?.ok_or_else(|| {
        FailureCause::Contract(format!(
            "{} produced no instance for {}",
            class.descriptor().name(),
            path.display()
        ))
    })?;
    let objects = reader.call(&mut instance)?;
    instance.close()?;
    Ok(objects)
}
