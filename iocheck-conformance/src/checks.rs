//! Object predicates used by the validators.
//!
//! The harness treats equality and compliance as black boxes behind
//! [`ObjectChecks`]; [`SchemaChecks`] wires in the `iocheck-schema` checks.

use iocheck_schema::{
    assert_same_structure, check_compliance, check_lazy_loaded, ComplianceError, DomainObject,
    LazyViolation, StructureMismatch,
};

/// Error returned by an [`ObjectChecks`] predicate.
#[derive(Debug, thiserror::Error)]
pub enum CheckFailure {
    #[error(transparent)]
    Structure(#[from] StructureMismatch),

    #[error(transparent)]
    Compliance(#[from] ComplianceError),

    #[error(transparent)]
    Lazy(#[from] LazyViolation),
}

/// Equality and compliance predicates over domain objects.
pub trait ObjectChecks: Send + Sync {
    /// Same kinds, names, attributes, payloads and child structure, with
    /// floats compared within `tolerance`.
    fn structurally_equal(
        &self,
        a: &DomainObject,
        b: &DomainObject,
        tolerance: f64,
    ) -> Result<(), CheckFailure>;

    fn is_compliant(&self, obj: &DomainObject) -> Result<(), CheckFailure>;

    /// Every payload below `obj` is an unmaterialized placeholder.
    fn is_lazy_compliant(&self, obj: &DomainObject) -> Result<(), CheckFailure>;
}

/// Checks backed by the schema crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaChecks;

impl ObjectChecks for SchemaChecks {
    fn structurally_equal(
        &self,
        a: &DomainObject,
        b: &DomainObject,
        tolerance: f64,
    ) -> Result<(), CheckFailure> {
        Ok(assert_same_structure(a, b, tolerance)?)
    }

    fn is_compliant(&self, obj: &DomainObject) -> Result<(), CheckFailure> {
        Ok(check_compliance(obj)?)
    }

    fn is_lazy_compliant(&self, obj: &DomainObject) -> Result<(), CheckFailure> {
        Ok(check_lazy_loaded(obj)?)
    }
}
