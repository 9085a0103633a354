//! Structural well-formedness checks for object trees.

use crate::object::{describe_path, AttrType, DomainObject};

/// A compliance violation at one node.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComplianceError {
    #[error("{path}: {child} is not allowed under {parent}")]
    UnexpectedChild {
        path: String,
        parent: String,
        child: String,
    },

    #[error("{path}: payload-bearing node has no payload")]
    MissingPayload { path: String },

    #[error("{path}: container node carries a payload")]
    UnexpectedPayload { path: String },

    #[error("{path}: required attribute '{attr}' is missing")]
    MissingAttribute { path: String, attr: String },

    #[error("{path}: attribute '{attr}' has type {found:?}, expected {expected:?}")]
    AttributeType {
        path: String,
        attr: String,
        expected: AttrType,
        found: AttrType,
    },

    #[error("{path}: shape {shape:?} describes {expected} values but payload has {found}")]
    ShapeMismatch {
        path: String,
        shape: Vec<usize>,
        expected: usize,
        found: usize,
    },

    #[error("{path}: shape {shape:?} describes more values than fit in memory")]
    ShapeOverflow { path: String, shape: Vec<usize> },

    #[error("{path}: lazy payload holds {found} materialized values")]
    LazyNotEmpty { path: String, found: usize },

    #[error("{path}: value {value} lies outside [{t_start}, {t_stop}]")]
    OutOfRange {
        path: String,
        value: f64,
        t_start: f64,
        t_stop: f64,
    },
}

/// Check every node reachable from `root`.
///
/// Works on both eager and lazily read trees: a lazy payload must simply be
/// empty, an eager one must hold as many values as its shape describes.
pub fn check_compliance(root: &DomainObject) -> Result<(), ComplianceError> {
    let mut result = Ok(());
    root.walk(&mut |path, node| {
        if result.is_ok() {
            result = check_node(root, path, node);
        }
    });
    result
}

fn check_node(root: &DomainObject, path: &[usize], node: &DomainObject) -> Result<(), ComplianceError> {
    let here = || describe_path(root, path);

    for child in &node.children {
        if !node.kind.child_kinds().contains(&child.kind) {
            return Err(ComplianceError::UnexpectedChild {
                path: here(),
                parent: node.kind.to_string(),
                child: child.kind.to_string(),
            });
        }
    }

    for (attr, expected) in node.kind.required_attrs() {
        match node.attrs.get(*attr) {
            None => {
                return Err(ComplianceError::MissingAttribute {
                    path: here(),
                    attr: attr.to_string(),
                })
            }
            Some(value) if value.attr_type() != *expected => {
                return Err(ComplianceError::AttributeType {
                    path: here(),
                    attr: attr.to_string(),
                    expected: *expected,
                    found: value.attr_type(),
                })
            }
            Some(_) => {}
        }
    }

    match (&node.payload, node.kind.has_payload()) {
        (None, true) => return Err(ComplianceError::MissingPayload { path: here() }),
        (Some(_), false) => return Err(ComplianceError::UnexpectedPayload { path: here() }),
        (None, false) => {}
        (Some(payload), true) => {
            if payload.lazy_shape.is_some() {
                if !payload.values.is_empty() {
                    return Err(ComplianceError::LazyNotEmpty {
                        path: here(),
                        found: payload.values.len(),
                    });
                }
            } else {
                match payload.element_count() {
                    None => {
                        return Err(ComplianceError::ShapeOverflow {
                            path: here(),
                            shape: payload.shape.clone(),
                        })
                    }
                    Some(expected) if expected != payload.values.len() => {
                        return Err(ComplianceError::ShapeMismatch {
                            path: here(),
                            shape: payload.shape.clone(),
                            expected,
                            found: payload.values.len(),
                        });
                    }
                    Some(_) => {}
                }
            }

            if node.kind == crate::object::Kind::SpikeTrain {
                let t_start = node.attrs.get("t_start").and_then(|v| v.as_f64());
                let t_stop = node.attrs.get("t_stop").and_then(|v| v.as_f64());
                if let (Some(t_start), Some(t_stop)) = (t_start, t_stop) {
                    if let Some(&value) = payload.values.iter().find(|v| **v < t_start || **v > t_stop) {
                        return Err(ComplianceError::OutOfRange {
                            path: here(),
                            value,
                            t_start,
                            t_stop,
                        });
                    }
                }
            }
        }
    }

    Ok(())
}
