//! Reading a fixture twice gives the same objects.

use iocheck_driver::DriverClass;

use crate::context::ScenarioContext;
use crate::types::{FailureCause, FailureContext, Outcome, Scenario, ScenarioFailure, SkipReason};

pub fn read_is_idempotent<C: DriverClass>(cx: &ScenarioContext<'_, C>) -> Result<Outcome, ScenarioFailure> {
    if cx.fixtures.is_empty() {
        return Ok(Outcome::Skipped(SkipReason::NoFixtures));
    }
    let base = FailureContext::new(Scenario::ReadIsIdempotent);
    let mut checked = 0;

    for lazy in cx.lazy_flags() {
        for fixture in cx.fixtures.iter() {
            let failure = base.on(&fixture.path, lazy, cx.config.read_all);
            let first = cx.read_fixture(&fixture.path, lazy).map_err(|e| failure.fail(e))?;
            let second = cx.read_fixture(&fixture.path, lazy).map_err(|e| failure.fail(e))?;
            if first.len() != second.len() {
                return Err(failure.fail(FailureCause::Contract(format!(
                    "first read returned {} objects, second {}",
                    first.len(),
                    second.len()
                ))));
            }
            for (a, b) in first.iter().zip(&second) {
                cx.checks
                    .structurally_equal(a, b, cx.config.tolerance)
                    .map_err(|e| failure.fail(FailureCause::check("second read differs", e)))?;
                checked += 1;
            }
        }
    }
    Ok(Outcome::Passed { checked })
}
