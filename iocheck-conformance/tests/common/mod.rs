//! Hand-written drivers exercising the harness's edge cases.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use iocheck_driver::{
    Driver, DriverClass, DriverDescriptor, DriverError, EntryPoint, EntryTable, ParamSpec,
};
use iocheck_schema::{DomainObject, Kind};

/// Stores a JSON array of top-level objects, written on close.
#[derive(Debug)]
pub struct ListDriver {
    path: PathBuf,
    pending: Vec<DomainObject>,
}

impl Driver for ListDriver {
    fn path(&self) -> &Path {
        &self.path
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let json = serde_json::to_vec(&self.pending).map_err(|e| DriverError::Encode(e.to_string()))?;
        self.pending.clear();
        std::fs::write(&self.path, json).map_err(|e| DriverError::Io {
            path: self.path.clone(),
            source: e,
        })
    }
}

fn load(path: &Path) -> Result<Vec<DomainObject>, DriverError> {
    let bytes = std::fs::read(path).map_err(|e| DriverError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| DriverError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub fn read_list(driver: &mut ListDriver, _lazy: bool) -> Result<Vec<DomainObject>, DriverError> {
    load(&driver.path)
}

pub fn write_list(driver: &mut ListDriver, obj: &DomainObject) -> Result<(), DriverError> {
    driver.pending.push(obj.clone());
    Ok(())
}

/// Shifts the first signal sample before writing.
pub fn write_shifted(driver: &mut ListDriver, obj: &DomainObject) -> Result<(), DriverError> {
    let mut shifted = obj.clone();
    if let Some(payload) = shifted
        .children
        .get_mut(0)
        .and_then(|segment| segment.children.get_mut(0))
        .and_then(|signal| signal.payload.as_mut())
    {
        if let Some(first) = payload.values.first_mut() {
            *first += 0.5;
        }
    }
    driver.pending.push(shifted);
    Ok(())
}

/// Returns a signal without its required attributes.
pub fn read_incomplete_signal(_driver: &mut ListDriver, _lazy: bool) -> Result<Vec<DomainObject>, DriverError> {
    Ok(vec![broken_block()])
}

/// Compliant when eager, non-compliant when lazy.
pub fn read_broken_when_lazy(driver: &mut ListDriver, lazy: bool) -> Result<Vec<DomainObject>, DriverError> {
    if lazy {
        read_incomplete_signal(driver, lazy)
    } else {
        Ok(vec![DomainObject::new(Kind::Block).with_child(DomainObject::new(Kind::Segment))])
    }
}

fn broken_block() -> DomainObject {
    DomainObject::new(Kind::Block).with_child(
        DomainObject::new(Kind::Segment).with_child(
            DomainObject::new(Kind::AnalogSignal)
                .with_payload(iocheck_schema::Payload::vector(vec![1.0], "mV")),
        ),
    )
}

#[derive(Debug, Clone)]
pub struct ListDriverClass {
    descriptor: DriverDescriptor,
    table: EntryTable<ListDriver>,
}

impl ListDriverClass {
    pub fn new(descriptor: DriverDescriptor, table: EntryTable<ListDriver>) -> Self {
        Self { descriptor, table }
    }

    fn block_descriptor(name: &str) -> DriverDescriptor {
        DriverDescriptor::new(name)
            .readable(&[Kind::Block])
            .writeable(&[Kind::Block])
            .supported(&Kind::ALL)
            .extensions(&["list"])
    }

    fn round_trip_table(writer: iocheck_driver::WriteFn<ListDriver>) -> EntryTable<ListDriver> {
        EntryTable::new()
            .reader(EntryPoint::Untyped, read_list)
            .reader(EntryPoint::Kind(Kind::Block), read_list)
            .writer(EntryPoint::Kind(Kind::Block), writer)
    }

    /// Faithful block round trip.
    pub fn faithful() -> Self {
        Self::new(Self::block_descriptor("ListIO"), Self::round_trip_table(write_list))
    }

    /// Blocks cannot be read without a sampling rate.
    pub fn needs_sampling_rate() -> Self {
        let descriptor = Self::block_descriptor("RateListIO").read_param(
            Kind::Block,
            "sampling_rate",
            ParamSpec::required("samples per second"),
        );
        Self::new(descriptor, Self::round_trip_table(write_list))
    }

    /// Writes change a signal value.
    pub fn lossy() -> Self {
        Self::new(Self::block_descriptor("LossyListIO"), Self::round_trip_table(write_shifted))
    }

    /// Read-only class returning non-compliant objects.
    pub fn incomplete_reader() -> Self {
        let descriptor = DriverDescriptor::new("IncompleteIO")
            .readable(&[Kind::Block])
            .supported(&Kind::ALL)
            .lazy(true);
        let table = EntryTable::new().reader(EntryPoint::Kind(Kind::Block), read_incomplete_signal);
        Self::new(descriptor, table)
    }

    /// Read-only class whose lazy reads are non-compliant.
    pub fn broken_when_lazy() -> Self {
        let descriptor = DriverDescriptor::new("LazyBrokenIO")
            .readable(&[Kind::Block])
            .supported(&Kind::ALL)
            .lazy(true);
        let table = EntryTable::new().reader(EntryPoint::Kind(Kind::Block), read_broken_when_lazy);
        Self::new(descriptor, table)
    }
}

impl DriverClass for ListDriverClass {
    type Instance = ListDriver;

    fn descriptor(&self) -> &DriverDescriptor {
        &self.descriptor
    }

    fn entry_points(&self) -> &EntryTable<ListDriver> {
        &self.table
    }

    fn open(&self, path: &Path) -> Result<Option<ListDriver>, DriverError> {
        Ok(Some(ListDriver {
            path: path.to_path_buf(),
            pending: Vec::new(),
        }))
    }
}

/// Class whose constructor never yields an instance.
#[derive(Debug, Clone)]
pub struct RefusingClass {
    inner: ListDriverClass,
}

impl RefusingClass {
    pub fn new() -> Self {
        Self {
            inner: ListDriverClass::new(
                ListDriverClass::block_descriptor("RefusingIO"),
                ListDriverClass::round_trip_table(write_list),
            ),
        }
    }
}

impl DriverClass for RefusingClass {
    type Instance = ListDriver;

    fn descriptor(&self) -> &DriverDescriptor {
        self.inner.descriptor()
    }

    fn entry_points(&self) -> &EntryTable<ListDriver> {
        self.inner.entry_points()
    }

    fn open(&self, _path: &Path) -> Result<Option<ListDriver>, DriverError> {
        Ok(None)
    }
}
