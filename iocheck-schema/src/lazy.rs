//! Lazy-placeholder checks.

use crate::object::{describe_path, DomainObject};

/// A payload node that does not look lazily loaded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LazyViolation {
    #[error("{path}: lazy payload holds {found} values, expected none")]
    Materialized { path: String, found: usize },

    #[error("{path}: lazy payload has no recorded shape")]
    MissingShape { path: String },

    #[error("{path}: payload-bearing node has no payload")]
    MissingPayload { path: String },
}

/// Assert that every payload-bearing node of `root` is a zero-length
/// placeholder carrying its intended shape.
pub fn check_lazy_loaded(root: &DomainObject) -> Result<(), LazyViolation> {
    let mut result = Ok(());
    root.walk(&mut |path, node| {
        if result.is_err() || !node.kind.has_payload() {
            return;
        }
        result = match &node.payload {
            None => Err(LazyViolation::MissingPayload {
                path: describe_path(root, path),
            }),
            Some(p) if !p.values.is_empty() => Err(LazyViolation::Materialized {
                path: describe_path(root, path),
                found: p.values.len(),
            }),
            Some(p) if p.lazy_shape.is_none() => Err(LazyViolation::MissingShape {
                path: describe_path(root, path),
            }),
            Some(_) => Ok(()),
        };
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Kind, Payload};

    fn segment(payload: Payload) -> DomainObject {
        DomainObject::new(Kind::Segment)
            .with_child(DomainObject::new(Kind::Event).with_payload(payload))
    }

    #[test]
    fn test_lazy_segment_passes() {
        let seg = segment(Payload::vector(vec![1.0, 2.0], "s").to_lazy(vec![0]));
        assert!(check_lazy_loaded(&seg).is_ok());
    }

    #[test]
    fn test_eager_segment_fails() {
        let seg = segment(Payload::vector(vec![1.0, 2.0], "s"));
        let err = check_lazy_loaded(&seg).unwrap_err();
        assert_eq!(
            err,
            LazyViolation::Materialized {
                path: "segment/event[0]".to_string(),
                found: 2,
            }
        );
    }

    #[test]
    fn test_empty_payload_without_shape_fails() {
        let seg = segment(Payload::vector(vec![], "s"));
        assert!(matches!(
            check_lazy_loaded(&seg),
            Err(LazyViolation::MissingShape { .. })
        ));
    }

    #[test]
    fn test_containers_without_payload_pass() {
        let block = DomainObject::new(Kind::Block).with_child(DomainObject::new(Kind::Segment));
        assert!(check_lazy_loaded(&block).is_ok());
    }
}
