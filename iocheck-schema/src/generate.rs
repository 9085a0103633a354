//! Deterministic synthetic trees used as write fixtures.

use crate::object::{AttrValue, DomainObject, Kind, Payload};

/// Number of segments placed under a generated block.
pub const SEGMENTS_PER_BLOCK: usize = 2;

/// Build a minimal compliant tree headed by the first kind in `kinds`.
///
/// Only kinds listed in `kinds` are instantiated below the head. Returns
/// `None` when `kinds` is empty.
pub fn generate_from_supported(kinds: &[Kind]) -> Option<DomainObject> {
    let head = *kinds.first()?;
    Some(generate_node(head, kinds, 0))
}

fn generate_node(kind: Kind, kinds: &[Kind], index: usize) -> DomainObject {
    let mut node = match kind {
        Kind::Block => DomainObject::new(Kind::Block).with_name("block 0"),
        Kind::Segment => DomainObject::new(Kind::Segment)
            .with_name(&format!("segment {index}"))
            .with_attr("index", AttrValue::Int(index as i64)),
        Kind::AnalogSignal => DomainObject::new(Kind::AnalogSignal)
            .with_name("signal 0")
            .with_attr("sampling_rate", AttrValue::Float(1000.0))
            .with_attr("t_start", AttrValue::Float(0.0))
            .with_payload(Payload::vector(vec![1.0, 2.0, 3.0], "mV")),
        Kind::SpikeTrain => DomainObject::new(Kind::SpikeTrain)
            .with_name("unit 0")
            .with_attr("t_start", AttrValue::Float(0.0))
            .with_attr("t_stop", AttrValue::Float(1.0))
            .with_payload(Payload::vector(vec![0.1, 0.5, 0.9], "s")),
        Kind::Event => DomainObject::new(Kind::Event)
            .with_name("trigger")
            .with_payload(Payload::vector(vec![0.25, 0.75], "s")),
    };

    for &child in kind.child_kinds() {
        if !kinds.contains(&child) {
            continue;
        }
        let count = if child == Kind::Segment { SEGMENTS_PER_BLOCK } else { 1 };
        for i in 0..count {
            node.children.push(generate_node(child, kinds, i));
        }
    }

    node
}
