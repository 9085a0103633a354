//! Entry-point registration table.
//!
//! Each driver class registers its read/write operations here once, keyed by
//! [`EntryPoint`]. The harness resolves operations through the table instead
//! of looking them up by name at run time.

use std::collections::BTreeMap;
use std::fmt;

use iocheck_schema::{DomainObject, Kind};

use crate::driver::DriverError;

/// Key of a registered operation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryPoint {
    /// The driver's untyped `read()` / `write(obj)`.
    Untyped,
    /// A kind-specific operation such as `read_block`.
    Kind(Kind),
    /// A driver-specific operation, `read_<name>` / `write_<name>`.
    Named(String),
}

impl EntryPoint {
    /// Operation name as it appears in diagnostics.
    pub fn read_name(&self, read_all: bool) -> String {
        match (self, read_all) {
            (EntryPoint::Untyped, _) => "read".to_string(),
            (EntryPoint::Kind(kind), false) => format!("read_{}", kind.as_str()),
            (EntryPoint::Kind(kind), true) => format!("read_all_{}", kind.plural()),
            (EntryPoint::Named(name), false) => format!("read_{name}"),
            (EntryPoint::Named(name), true) => format!("read_all_{name}"),
        }
    }

    pub fn write_name(&self) -> String {
        match self {
            EntryPoint::Untyped => "write".to_string(),
            EntryPoint::Kind(kind) => format!("write_{}", kind.as_str()),
            EntryPoint::Named(name) => format!("write_{name}"),
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPoint::Untyped => f.write_str("untyped"),
            EntryPoint::Kind(kind) => write!(f, "{kind}"),
            EntryPoint::Named(name) => f.write_str(name),
        }
    }
}

/// Read operation. The flag requests a lazy read.
pub type ReadFn<D> = fn(&mut D, bool) -> Result<Vec<DomainObject>, DriverError>;

/// Write operation.
pub type WriteFn<D> = fn(&mut D, &DomainObject) -> Result<(), DriverError>;

/// Materialize every lazy payload of an object.
pub type LoadLazyFn<D> = fn(&mut D, &DomainObject) -> Result<DomainObject, DriverError>;

/// Registered operations of one driver class.
pub struct EntryTable<D> {
    readers: BTreeMap<EntryPoint, ReadFn<D>>,
    all_readers: BTreeMap<EntryPoint, ReadFn<D>>,
    writers: BTreeMap<EntryPoint, WriteFn<D>>,
    lazy_loader: Option<LoadLazyFn<D>>,
}

impl<D> EntryTable<D> {
    pub fn new() -> Self {
        Self {
            readers: BTreeMap::new(),
            all_readers: BTreeMap::new(),
            writers: BTreeMap::new(),
            lazy_loader: None,
        }
    }

    /// Builder: register a "read first/primary object" operation.
    pub fn reader(mut self, entry: EntryPoint, f: ReadFn<D>) -> Self {
        self.readers.insert(entry, f);
        self
    }

    /// Builder: register a "read all objects" operation.
    pub fn all_reader(mut self, entry: EntryPoint, f: ReadFn<D>) -> Self {
        self.all_readers.insert(entry, f);
        self
    }

    /// Builder: register a write operation.
    pub fn writer(mut self, entry: EntryPoint, f: WriteFn<D>) -> Self {
        self.writers.insert(entry, f);
        self
    }

    /// Builder: register the explicit lazy-load operation.
    pub fn lazy_loader(mut self, f: LoadLazyFn<D>) -> Self {
        self.lazy_loader = Some(f);
        self
    }

    pub fn find_reader(&self, entry: &EntryPoint, read_all: bool) -> Option<ReadFn<D>> {
        if read_all {
            self.all_readers.get(entry).copied()
        } else {
            self.readers.get(entry).copied()
        }
    }

    pub fn find_writer(&self, entry: &EntryPoint) -> Option<WriteFn<D>> {
        self.writers.get(entry).copied()
    }

    pub fn find_lazy_loader(&self) -> Option<LoadLazyFn<D>> {
        self.lazy_loader
    }

    /// Names of every registered operation, sorted.
    pub fn operation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .readers
            .keys()
            .map(|e| e.read_name(false))
            .chain(self.all_readers.keys().map(|e| e.read_name(true)))
            .chain(self.writers.keys().map(EntryPoint::write_name))
            .collect();
        if self.lazy_loader.is_some() {
            names.push("load_lazy_object".to_string());
        }
        names.sort();
        names
    }
}

impl<D> Default for EntryTable<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for EntryTable<D> {
    fn clone(&self) -> Self {
        Self {
            readers: self.readers.clone(),
            all_readers: self.all_readers.clone(),
            writers: self.writers.clone(),
            lazy_loader: self.lazy_loader,
        }
    }
}

impl<D> fmt::Debug for EntryTable<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryTable")
            .field("operations", &self.operation_names())
            .finish()
    }
}
