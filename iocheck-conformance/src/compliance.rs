//! Every object read from every fixture must be compliant.

use iocheck_driver::DriverClass;

use crate::context::ScenarioContext;
use crate::types::{FailureCause, FailureContext, Outcome, Scenario, ScenarioFailure, SkipReason};

/// Read each fixture eagerly, then lazily when supported, and check every
/// returned object.
pub fn read_objects_are_compliant<C: DriverClass>(
    cx: &ScenarioContext<'_, C>,
) -> Result<Outcome, ScenarioFailure> {
    if cx.fixtures.is_empty() {
        return Ok(Outcome::Skipped(SkipReason::NoFixtures));
    }
    let base = FailureContext::new(Scenario::ReadObjectsAreCompliant);
    let mut checked = 0;

    for lazy in cx.lazy_flags() {
        for fixture in cx.fixtures.iter() {
            let failure = base.on(&fixture.path, lazy, cx.config.read_all);
            let objects = cx
                .read_fixture(&fixture.path, lazy)
                .map_err(|e| failure.fail(e))?;
            for obj in &objects {
                cx.checks
                    .is_compliant(obj)
                    .map_err(|e| failure.fail(FailureCause::check(obj.kind.as_str(), e)))?;
                checked += 1;
            }
        }
    }
    Ok(Outcome::Passed { checked })
}
