//! Reference driver storing object trees as a JSON document.
//!
//! Two classes are provided: [`JsonDriverClass::block_rooted`] heads files
//! with blocks and supports explicit lazy loading, and
//! [`JsonDriverClass::segment_rooted`] writes segments (wrapped in a block on
//! disk) and reads lazily without a loader.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use iocheck_fs::{Filesystem, RealFilesystem};
use iocheck_schema::{DomainObject, Kind};
use serde::{Deserialize, Serialize};

use crate::descriptor::DriverDescriptor;
use crate::driver::{Driver, DriverClass, DriverError};
use crate::entry::{EntryPoint, EntryTable};

/// Format tag stored in every document.
pub const FORMAT_TAG: &str = "iocheck-json";

/// Document layout version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct JsonDocument {
    format: String,
    version: u32,
    blocks: Vec<DomainObject>,
}

impl JsonDocument {
    fn empty() -> Self {
        Self {
            format: FORMAT_TAG.to_string(),
            version: FORMAT_VERSION,
            blocks: Vec::new(),
        }
    }
}

/// Open JSON file. Pending writes are flushed atomically on close.
pub struct JsonDriver {
    path: PathBuf,
    fs: Arc<dyn Filesystem>,
    pending: Option<JsonDocument>,
    cache: Option<JsonDocument>,
    closed: bool,
}

impl JsonDriver {
    /// Driver on the real filesystem.
    pub fn new(path: &Path) -> Self {
        Self::with_filesystem(path, Arc::new(RealFilesystem))
    }

    pub fn with_filesystem(path: &Path, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            path: path.to_path_buf(),
            fs,
            pending: None,
            cache: None,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }

    fn document(&mut self) -> Result<&JsonDocument, DriverError> {
        self.ensure_open()?;
        if self.cache.is_none() {
            self.cache = Some(load_document(self.fs.as_ref(), &self.path)?);
        }
        self.cache
            .as_ref()
            .ok_or_else(|| DriverError::Empty(self.path.clone()))
    }

    /// Blocks in the file, converted to lazy placeholders when requested.
    fn blocks(&mut self, lazy: bool) -> Result<Vec<DomainObject>, DriverError> {
        let blocks = self.document()?.blocks.clone();
        if !lazy {
            return Ok(blocks);
        }
        Ok(blocks
            .into_iter()
            .enumerate()
            .map(|(i, block)| make_lazy(block, vec![i]))
            .collect())
    }

    fn push_block(&mut self, block: DomainObject) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.pending
            .get_or_insert_with(JsonDocument::empty)
            .blocks
            .push(block);
        Ok(())
    }

    fn push_segment(&mut self, segment: DomainObject) -> Result<(), DriverError> {
        self.ensure_open()?;
        let document = self.pending.get_or_insert_with(JsonDocument::empty);
        if document.blocks.is_empty() {
            document.blocks.push(DomainObject::new(Kind::Block));
        }
        if let Some(block) = document.blocks.last_mut() {
            block.children.push(segment);
        }
        Ok(())
    }
}

impl Driver for JsonDriver {
    fn path(&self) -> &Path {
        &self.path
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.cache = None;
        if let Some(document) = self.pending.take() {
            let json = serde_json::to_vec_pretty(&document)
                .map_err(|e| DriverError::Encode(e.to_string()))?;
            self.fs.write_atomic(&self.path, &json)?;
        }
        Ok(())
    }
}

impl fmt::Debug for JsonDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDriver")
            .field("path", &self.path)
            .field("pending", &self.pending.is_some())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

fn load_document(fs: &dyn Filesystem, path: &Path) -> Result<JsonDocument, DriverError> {
    let bytes = fs.read_bytes(path)?;
    let document: JsonDocument = serde_json::from_slice(&bytes).map_err(|e| DriverError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if document.format != FORMAT_TAG || document.version != FORMAT_VERSION {
        return Err(DriverError::Decode {
            path: path.to_path_buf(),
            message: format!(
                "unsupported format {} v{}",
                document.format, document.version
            ),
        });
    }
    Ok(document)
}

/// Replace every payload under `node` with a lazy placeholder whose origin
/// is its absolute path in the document.
fn make_lazy(mut node: DomainObject, origin: Vec<usize>) -> DomainObject {
    if let Some(payload) = &node.payload {
        node.payload = Some(payload.to_lazy(origin.clone()));
    }
    node.children = node
        .children
        .into_iter()
        .enumerate()
        .map(|(i, child)| {
            let mut child_origin = origin.clone();
            child_origin.push(i);
            make_lazy(child, child_origin)
        })
        .collect();
    node
}

fn check_kind(obj: &DomainObject, expected: Kind, operation: &str) -> Result<(), DriverError> {
    if obj.kind == expected {
        Ok(())
    } else {
        Err(DriverError::UnsupportedKind {
            kind: obj.kind.to_string(),
            operation: operation.to_string(),
        })
    }
}

fn read(driver: &mut JsonDriver, lazy: bool) -> Result<Vec<DomainObject>, DriverError> {
    driver.blocks(lazy)
}

fn read_block(driver: &mut JsonDriver, lazy: bool) -> Result<Vec<DomainObject>, DriverError> {
    let first = driver.blocks(lazy)?.into_iter().next();
    first
        .map(|block| vec![block])
        .ok_or_else(|| DriverError::Empty(driver.path.clone()))
}

fn read_all_segments(driver: &mut JsonDriver, lazy: bool) -> Result<Vec<DomainObject>, DriverError> {
    Ok(driver
        .blocks(lazy)?
        .into_iter()
        .flat_map(|block| block.children)
        .filter(|child| child.kind == Kind::Segment)
        .collect())
}

fn read_segment(driver: &mut JsonDriver, lazy: bool) -> Result<Vec<DomainObject>, DriverError> {
    let first = read_all_segments(driver, lazy)?.into_iter().next();
    first
        .map(|segment| vec![segment])
        .ok_or_else(|| DriverError::Empty(driver.path.clone()))
}

fn write(driver: &mut JsonDriver, obj: &DomainObject) -> Result<(), DriverError> {
    match obj.kind {
        Kind::Block => driver.push_block(obj.clone()),
        Kind::Segment => driver.push_segment(obj.clone()),
        other => Err(DriverError::UnsupportedKind {
            kind: other.to_string(),
            operation: "write".to_string(),
        }),
    }
}

fn write_block(driver: &mut JsonDriver, obj: &DomainObject) -> Result<(), DriverError> {
    check_kind(obj, Kind::Block, "write_block")?;
    driver.push_block(obj.clone())
}

fn write_segment(driver: &mut JsonDriver, obj: &DomainObject) -> Result<(), DriverError> {
    check_kind(obj, Kind::Segment, "write_segment")?;
    driver.push_segment(obj.clone())
}

/// Materialize every lazy payload in `obj` from the document.
fn load_lazy_object(driver: &mut JsonDriver, obj: &DomainObject) -> Result<DomainObject, DriverError> {
    let document = driver.document()?.clone();
    let mut loaded = obj.clone();
    load_node(&document, &mut loaded)?;
    Ok(loaded)
}

fn load_node(document: &JsonDocument, node: &mut DomainObject) -> Result<(), DriverError> {
    if let Some(payload) = &node.payload {
        if payload.is_lazy() {
            let origin = payload
                .origin
                .clone()
                .ok_or_else(|| DriverError::LazyLoad("payload has no origin".to_string()))?;
            let eager = origin
                .split_first()
                .and_then(|(block, rest)| document.blocks.get(*block)?.node_at(rest))
                .and_then(|source| source.payload.clone())
                .ok_or_else(|| DriverError::LazyLoad(format!("no payload at origin {:?}", origin)))?;
            node.payload = Some(eager);
        }
    }
    for child in &mut node.children {
        load_node(document, child)?;
    }
    Ok(())
}

/// JSON driver class. Instances read and write through the class's
/// filesystem, the real one unless replaced with [`JsonDriverClass::with_filesystem`].
#[derive(Clone)]
pub struct JsonDriverClass {
    descriptor: DriverDescriptor,
    table: EntryTable<JsonDriver>,
    fs: Arc<dyn Filesystem>,
}

impl JsonDriverClass {
    /// Block-headed files with lazy reads and an explicit lazy loader.
    pub fn block_rooted() -> Self {
        let descriptor = DriverDescriptor::new("JsonIO")
            .readable(&[Kind::Block, Kind::Segment])
            .writeable(&[Kind::Block, Kind::Segment])
            .supported(&Kind::ALL)
            .lazy(true)
            .extensions(&["json"]);

        let table = EntryTable::new()
            .reader(EntryPoint::Untyped, read)
            .reader(EntryPoint::Kind(Kind::Block), read_block)
            .all_reader(EntryPoint::Kind(Kind::Block), read)
            .reader(EntryPoint::Kind(Kind::Segment), read_segment)
            .all_reader(EntryPoint::Kind(Kind::Segment), read_all_segments)
            .writer(EntryPoint::Untyped, write)
            .writer(EntryPoint::Kind(Kind::Block), write_block)
            .writer(EntryPoint::Kind(Kind::Segment), write_segment)
            .lazy_loader(load_lazy_object);

        Self {
            descriptor,
            table,
            fs: Arc::new(RealFilesystem),
        }
    }

    /// Segment-headed files; lazy reads without an explicit loader.
    pub fn segment_rooted() -> Self {
        let descriptor = DriverDescriptor::new("JsonSegmentIO")
            .readable(&[Kind::Segment])
            .writeable(&[Kind::Segment])
            .supported(&[Kind::Segment, Kind::AnalogSignal, Kind::SpikeTrain, Kind::Event])
            .lazy(true)
            .extensions(&["seg.json"]);

        let table = EntryTable::new()
            .reader(EntryPoint::Untyped, read)
            .reader(EntryPoint::Kind(Kind::Segment), read_segment)
            .all_reader(EntryPoint::Kind(Kind::Segment), read_all_segments)
            .writer(EntryPoint::Untyped, write)
            .writer(EntryPoint::Kind(Kind::Segment), write_segment);

        Self {
            descriptor,
            table,
            fs: Arc::new(RealFilesystem),
        }
    }

    /// Builder: set the filesystem instances use.
    pub fn with_filesystem(mut self, fs: impl Filesystem + 'static) -> Self {
        self.fs = Arc::new(fs);
        self
    }
}

impl fmt::Debug for JsonDriverClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDriverClass")
            .field("descriptor", &self.descriptor)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl DriverClass for JsonDriverClass {
    type Instance = JsonDriver;

    fn descriptor(&self) -> &DriverDescriptor {
        &self.descriptor
    }

    fn entry_points(&self) -> &EntryTable<JsonDriver> {
        &self.table
    }

    fn open(&self, path: &Path) -> Result<Option<JsonDriver>, DriverError> {
        Ok(Some(JsonDriver::with_filesystem(path, Arc::clone(&self.fs))))
    }
}
