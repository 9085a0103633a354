//! iocheck domain schema
//!
//! Defines the hierarchical object model shared by every driver and the
//! predicates the conformance harness applies to it:
//! - structural equivalence under a numeric tolerance
//! - compliance (well-formedness) of a tree
//! - the lazy-placeholder contract
//! - deterministic synthetic trees for write fixtures

mod compare;
mod compliance;
mod generate;
mod lazy;
mod object;

pub use compare::{assert_same_structure, StructureMismatch, DEFAULT_TOLERANCE};
pub use compliance::{check_compliance, ComplianceError};
pub use generate::{generate_from_supported, SEGMENTS_PER_BLOCK};
pub use lazy::{check_lazy_loaded, LazyViolation};
pub use object::{describe_path, AttrType, AttrValue, DomainObject, Kind, Payload};
