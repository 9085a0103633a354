//! Structural equivalence of two object trees under a numeric tolerance.

use crate::object::{AttrValue, DomainObject, Payload};

/// Default absolute tolerance for numeric comparisons.
pub const DEFAULT_TOLERANCE: f64 = 1e-8;

/// First difference found between two trees.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("trees differ at {path} (tolerance {tolerance:e}): {detail}")]
pub struct StructureMismatch {
    pub path: String,
    pub tolerance: f64,
    pub detail: String,
}

/// Assert that `a` and `b` have the same structure.
///
/// Kinds, names, attribute keys, child order, payload shape and units must
/// match exactly; floating attributes and payload values must agree within
/// `tolerance` (absolute).
pub fn assert_same_structure(
    a: &DomainObject,
    b: &DomainObject,
    tolerance: f64,
) -> Result<(), StructureMismatch> {
    compare_node(a, b, tolerance, a.kind.as_str().to_string())
}

fn compare_node(
    a: &DomainObject,
    b: &DomainObject,
    tolerance: f64,
    path: String,
) -> Result<(), StructureMismatch> {
    let fail = |detail: String| StructureMismatch {
        path: path.clone(),
        tolerance,
        detail,
    };

    if a.kind != b.kind {
        return Err(fail(format!("kind {} vs {}", a.kind, b.kind)));
    }
    if a.name != b.name {
        return Err(fail(format!("name {:?} vs {:?}", a.name, b.name)));
    }

    let keys_a: Vec<_> = a.attrs.keys().collect();
    let keys_b: Vec<_> = b.attrs.keys().collect();
    if keys_a != keys_b {
        return Err(fail(format!("attribute keys {:?} vs {:?}", keys_a, keys_b)));
    }
    for (key, va) in &a.attrs {
        if let Some(vb) = b.attrs.get(key) {
            if !attr_close(va, vb, tolerance) {
                return Err(fail(format!("attribute {key}: {:?} vs {:?}", va, vb)));
            }
        }
    }

    match (&a.payload, &b.payload) {
        (None, None) => {}
        (Some(pa), Some(pb)) => compare_payload(pa, pb, tolerance).map_err(fail)?,
        (Some(_), None) => return Err(fail("payload present only on the left".to_string())),
        (None, Some(_)) => return Err(fail("payload present only on the right".to_string())),
    }

    if a.children.len() != b.children.len() {
        return Err(fail(format!(
            "{} children vs {}",
            a.children.len(),
            b.children.len()
        )));
    }

    let mut per_kind = std::collections::BTreeMap::new();
    for (ca, cb) in a.children.iter().zip(&b.children) {
        let position = per_kind.entry(ca.kind).or_insert(0usize);
        let child_path = format!("{}/{}[{}]", path, ca.kind, position);
        *position += 1;
        compare_node(ca, cb, tolerance, child_path)?;
    }

    Ok(())
}

fn compare_payload(a: &Payload, b: &Payload, tolerance: f64) -> Result<(), String> {
    if a.units != b.units {
        return Err(format!("units {:?} vs {:?}", a.units, b.units));
    }
    if a.shape != b.shape {
        return Err(format!("shape {:?} vs {:?}", a.shape, b.shape));
    }
    if a.lazy_shape != b.lazy_shape {
        return Err(format!("lazy shape {:?} vs {:?}", a.lazy_shape, b.lazy_shape));
    }
    if a.values.len() != b.values.len() {
        return Err(format!("{} values vs {}", a.values.len(), b.values.len()));
    }
    for (i, (x, y)) in a.values.iter().zip(&b.values).enumerate() {
        if !float_close(*x, *y, tolerance) {
            return Err(format!("value[{i}] {x} vs {y}"));
        }
    }
    Ok(())
}

fn attr_close(a: &AttrValue, b: &AttrValue, tolerance: f64) -> bool {
    match (a, b) {
        (AttrValue::Text(x), AttrValue::Text(y)) => x == y,
        (AttrValue::Int(x), AttrValue::Int(y)) => x == y,
        (AttrValue::Float(x), AttrValue::Float(y)) => float_close(*x, *y, tolerance),
        _ => false,
    }
}

fn float_close(a: f64, b: f64, tolerance: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    a == b || (a - b).abs() <= tolerance
}
