//! Write-then-read and read-then-write scenarios.

use iocheck_driver::{DriverClass, OpenDriver};
use iocheck_schema::{generate_from_supported, DomainObject, Kind};

use crate::capability::Direction;
use crate::context::ScenarioContext;
use crate::dispatch::{resolve_reader, resolve_writer, Target};
use crate::types::{FailureCause, FailureContext, Outcome, Scenario, ScenarioFailure, SkipReason};

/// Prefix of the file written by [`write_then_read`], next to the generated
/// fixture in the local directory.
pub const ROUND_TRIP_PREFIX: &str = "RoundTrip_";

/// Write a synthetic tree with the highest-kind writer, read it back through
/// the untyped reader and compare.
///
/// The round-trip file is removed when the scenario passes and left in
/// place for inspection when it fails.
pub fn write_then_read<C: DriverClass>(cx: &ScenarioContext<'_, C>) -> Result<Outcome, ScenarioFailure> {
    let mut failure = FailureContext::new(Scenario::WriteThenRead);
    let highest = match cx.caps.able_to_write_or_read(
        cx.profile.read_and_write_is_bijective,
        cx.profile.hash_conserved_when_write_read,
        Direction::WriteThenRead,
    ) {
        Ok(kind) => kind,
        Err(reason) => return Ok(Outcome::Skipped(reason)),
    };

    let descriptor = cx.class.descriptor();
    let sample = match generate_from_supported(descriptor.supported_kinds()) {
        Some(sample) => sample,
        None => return Ok(Outcome::Skipped(SkipReason::NotRoundTripEligible { highest: None })),
    };

    let path = cx
        .local_dir
        .join(format!("{ROUND_TRIP_PREFIX}{}", descriptor.generated_file_name()));
    failure = failure.on(&path, false, false);
    cx.fs
        .remove_path(&path)
        .map_err(|e| failure.fail(FailureCause::Contract(format!("cannot clean {}: {e}", path.display()))))?;

    let writer = resolve_writer(cx.class, &Target::Kind(highest)).map_err(|e| failure.fail(e))?;
    let mut instance = match OpenDriver::open(cx.class, &path).map_err(|e| failure.fail(e))? {
        Some(instance) => instance,
        None => return Ok(Outcome::Skipped(SkipReason::NoInstance)),
    };
    cx.logger.debug(&format!("{} {}", writer.operation(), path.display()));
    let written = writer.call(&mut instance, &sample).map_err(|e| failure.fail(e))?;
    instance.close().map_err(|e| failure.fail(e))?;

    let reader = resolve_reader(cx.class, &Target::Untyped, false, false).map_err(|e| failure.fail(e))?;
    let mut instance = match OpenDriver::open(cx.class, &path).map_err(|e| failure.fail(e))? {
        Some(instance) => instance,
        None => return Ok(Outcome::Skipped(SkipReason::NoInstance)),
    };
    let objects = reader.call(&mut instance).map_err(|e| failure.fail(e))?;
    instance.close().map_err(|e| failure.fail(e))?;

    let read = first_comparable(objects, highest).map_err(|e| failure.fail(e))?;

    cx.checks
        .structurally_equal(&written, &read, cx.config.tolerance)
        .map_err(|e| failure.fail(FailureCause::check("written and read objects differ", e)))?;
    cx.checks
        .is_compliant(&written)
        .map_err(|e| failure.fail(FailureCause::check("written object", e)))?;
    cx.checks
        .is_compliant(&read)
        .map_err(|e| failure.fail(FailureCause::check("read object", e)))?;

    if let Err(e) = cx.fs.remove_path(&path) {
        cx.logger.warn(&format!("cannot remove {}: {e}", path.display()));
    }
    Ok(Outcome::Passed { checked: 1 })
}

/// Pick the object to compare with what was written. Segment-rooted
/// drivers may return the segment wrapped in a block.
fn first_comparable(objects: Vec<DomainObject>, highest: Kind) -> Result<DomainObject, FailureCause> {
    let first = objects
        .into_iter()
        .next()
        .ok_or_else(|| FailureCause::Contract("untyped read returned no object".to_string()))?;
    if highest == Kind::Segment && first.kind == Kind::Block {
        return first
            .children_of(Kind::Segment)
            .next()
            .cloned()
            .ok_or_else(|| FailureCause::Contract("read block holds no segment".to_string()));
    }
    Ok(first)
}

/// Gate for byte-identical rewrites.
///
/// The comparison itself is not implemented: an applicable driver reports
/// [`SkipReason::HashComparisonUnavailable`] rather than passing.
pub fn read_then_write<C: DriverClass>(cx: &ScenarioContext<'_, C>) -> Result<Outcome, ScenarioFailure> {
    let reason = match cx.caps.able_to_write_or_read(
        cx.profile.read_and_write_is_bijective,
        cx.profile.hash_conserved_when_write_read,
        Direction::ReadThenWrite,
    ) {
        Ok(_) => SkipReason::HashComparisonUnavailable,
        Err(reason) => reason,
    };
    Ok(Outcome::Skipped(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use iocheck_schema::AttrValue;

    fn sample_block() -> DomainObject {
        generate_from_supported(&Kind::ALL).unwrap()
    }

    #[test]
    fn test_first_comparable_takes_first_object() {
        let block = sample_block();
        let picked = first_comparable(vec![block.clone(), DomainObject::new(Kind::Block)], Kind::Block).unwrap();
        assert_eq!(picked, block);
    }

    #[test]
    fn test_first_comparable_descends_to_segment() {
        let block = sample_block();
        let picked = first_comparable(vec![block.clone()], Kind::Segment).unwrap();
        assert_eq!(picked.kind, Kind::Segment);
        assert_eq!(picked.attrs.get("index"), Some(&AttrValue::Int(0)));
    }

    #[test]
    fn test_first_comparable_keeps_bare_segment() {
        let segment = generate_from_supported(&[Kind::Segment, Kind::Event]).unwrap();
        let picked = first_comparable(vec![segment.clone()], Kind::Segment).unwrap();
        assert_eq!(picked, segment);
    }

    #[test]
    fn test_first_comparable_empty_read() {
        assert!(matches!(
            first_comparable(vec![], Kind::Block),
            Err(FailureCause::Contract(_))
        ));
        assert!(matches!(
            first_comparable(vec![DomainObject::new(Kind::Block)], Kind::Segment),
            Err(FailureCause::Contract(_))
        ));
    }
}
