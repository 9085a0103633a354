//! Domain object tree types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Node type in the domain hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Block,
    Segment,
    AnalogSignal,
    SpikeTrain,
    Event,
}

/// Expected type of a required attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Float,
    Int,
    Text,
}

impl Kind {
    /// All kinds, containers first.
    pub const ALL: [Kind; 5] = [
        Kind::Block,
        Kind::Segment,
        Kind::AnalogSignal,
        Kind::SpikeTrain,
        Kind::Event,
    ];

    /// Lowercase name used in entry-point names (`read_block`).
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Block => "block",
            Kind::Segment => "segment",
            Kind::AnalogSignal => "analogsignal",
            Kind::SpikeTrain => "spiketrain",
            Kind::Event => "event",
        }
    }

    /// Plural name used by "read all" entry points (`read_all_blocks`).
    pub fn plural(self) -> &'static str {
        match self {
            Kind::Block => "blocks",
            Kind::Segment => "segments",
            Kind::AnalogSignal => "analogsignals",
            Kind::SpikeTrain => "spiketrains",
            Kind::Event => "events",
        }
    }

    /// True for the two container kinds that may head a file.
    pub fn is_container_root(self) -> bool {
        matches!(self, Kind::Block | Kind::Segment)
    }

    /// True if nodes of this kind carry a numeric payload.
    pub fn has_payload(self) -> bool {
        matches!(self, Kind::AnalogSignal | Kind::SpikeTrain | Kind::Event)
    }

    /// Kinds allowed as direct children.
    pub fn child_kinds(self) -> &'static [Kind] {
        match self {
            Kind::Block => &[Kind::Segment],
            Kind::Segment => &[Kind::AnalogSignal, Kind::SpikeTrain, Kind::Event],
            Kind::AnalogSignal | Kind::SpikeTrain | Kind::Event => &[],
        }
    }

    /// Attributes every node of this kind must carry.
    pub fn required_attrs(self) -> &'static [(&'static str, AttrType)] {
        match self {
            Kind::AnalogSignal => &[("sampling_rate", AttrType::Float), ("t_start", AttrType::Float)],
            Kind::SpikeTrain => &[("t_start", AttrType::Float), ("t_stop", AttrType::Float)],
            Kind::Block | Kind::Segment | Kind::Event => &[],
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute value attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    pub fn attr_type(&self) -> AttrType {
        match self {
            AttrValue::Int(_) => AttrType::Int,
            AttrValue::Float(_) => AttrType::Float,
            AttrValue::Text(_) => AttrType::Text,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Text(_) => None,
        }
    }
}

/// Numeric payload of a leaf node.
///
/// An eager payload holds `product(shape)` values. A lazy payload holds no
/// values and records the shape it would have in `lazy_shape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub values: Vec<f64>,
    pub shape: Vec<usize>,
    pub units: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lazy_shape: Option<Vec<usize>>,
    /// Child-index path from the read root, recorded by drivers on lazy reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Vec<usize>>,
}

impl Payload {
    /// Create a one-dimensional eager payload.
    pub fn vector(values: Vec<f64>, units: &str) -> Self {
        let shape = vec![values.len()];
        Self {
            values,
            shape,
            units: units.to_string(),
            lazy_shape: None,
            origin: None,
        }
    }

    /// Replace the values with a zero-length placeholder that remembers the
    /// eager shape and where the node sits in the tree.
    pub fn to_lazy(&self, origin: Vec<usize>) -> Self {
        Self {
            values: Vec::new(),
            shape: vec![0],
            units: self.units.clone(),
            lazy_shape: Some(self.shape.clone()),
            origin: Some(origin),
        }
    }

    pub fn is_lazy(&self) -> bool {
        self.values.is_empty() && self.lazy_shape.is_some()
    }

    /// Number of elements the shape describes, `None` if it overflows.
    pub fn element_count(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |count, &dim| count.checked_mul(dim))
    }
}

/// One node of a domain object tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainObject {
    pub kind: Kind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(default)]
    pub children: Vec<DomainObject>,
}

impl DomainObject {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            name: None,
            attrs: BTreeMap::new(),
            payload: None,
            children: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_attr(mut self, key: &str, value: AttrValue) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_child(mut self, child: DomainObject) -> Self {
        self.children.push(child);
        self
    }

    /// Children of the given kind, in order.
    pub fn children_of(&self, kind: Kind) -> impl Iterator<Item = &DomainObject> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// Node at a child-index path, if it exists.
    pub fn node_at(&self, path: &[usize]) -> Option<&DomainObject> {
        let mut node = self;
        for &index in path {
            node = node.children.get(index)?;
        }
        Some(node)
    }

    /// Visit every node depth-first with its child-index path.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&[usize], &'a DomainObject)) {
        fn go<'a>(
            node: &'a DomainObject,
            path: &mut Vec<usize>,
            visit: &mut dyn FnMut(&[usize], &'a DomainObject),
        ) {
            visit(path, node);
            for (i, child) in node.children.iter().enumerate() {
                path.push(i);
                go(child, path, visit);
                path.pop();
            }
        }
        go(self, &mut Vec::new(), visit);
    }
}

/// Human-readable tree position, e.g. `block/segment[1]/analogsignal[0]`.
pub fn describe_path(root: &DomainObject, path: &[usize]) -> String {
    let mut parts = vec![root.kind.as_str().to_string()];
    let mut node = root;
    for &index in path {
        match node.children.get(index) {
            Some(child) => {
                let position = node.children[..index]
                    .iter()
                    .filter(|c| c.kind == child.kind)
                    .count();
                parts.push(format!("{}[{}]", child.kind, position));
                node = child;
            }
            None => {
                parts.push(format!("?[{}]", index));
                break;
            }
        }
    }
    parts.join("/")
}
