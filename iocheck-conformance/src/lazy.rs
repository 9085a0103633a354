//! Lazy-read contract: placeholders mirror the eager tree and load back to it.

use iocheck_driver::{DriverClass, OpenDriver};
use iocheck_schema::{describe_path, DomainObject};

use crate::context::ScenarioContext;
use crate::dispatch::resolve_reader;
use crate::types::{FailureCause, FailureContext, Outcome, Scenario, ScenarioFailure, SkipReason};

/// Lazy reads hold no values, and every placeholder advertises the shape of
/// the eager payload at the same position.
pub fn lazy_read_is_compliant<C: DriverClass>(
    cx: &ScenarioContext<'_, C>,
) -> Result<Outcome, ScenarioFailure> {
    if !cx.caps.supports_lazy {
        return Ok(Outcome::Skipped(SkipReason::LazyUnsupported));
    }
    if cx.fixtures.is_empty() {
        return Ok(Outcome::Skipped(SkipReason::NoFixtures));
    }
    let base = FailureContext::new(Scenario::LazyReadIsCompliant);
    let mut checked = 0;

    for fixture in cx.fixtures.iter() {
        let failure = base.on(&fixture.path, true, cx.config.read_all);
        let lazy = cx.read_fixture(&fixture.path, true).map_err(|e| failure.fail(e))?;
        let eager = cx.read_fixture(&fixture.path, false).map_err(|e| failure.fail(e))?;
        check_same_count(&lazy, &eager).map_err(|e| failure.fail(e))?;

        for (lazy_obj, eager_obj) in lazy.iter().zip(&eager) {
            cx.checks
                .is_lazy_compliant(lazy_obj)
                .map_err(|e| failure.fail(FailureCause::check("lazy object", e)))?;
            check_lazy_shapes(lazy_obj, eager_obj).map_err(|e| failure.fail(e))?;
            checked += 1;
        }
    }
    Ok(Outcome::Passed { checked })
}

/// Loading a lazy object through the driver's loader yields the eagerly
/// read object.
pub fn load_lazy_objects<C: DriverClass>(cx: &ScenarioContext<'_, C>) -> Result<Outcome, ScenarioFailure> {
    if !cx.caps.supports_lazy {
        return Ok(Outcome::Skipped(SkipReason::LazyUnsupported));
    }
    let loader = match cx.class.entry_points().find_lazy_loader() {
        Some(loader) => loader,
        None => return Ok(Outcome::Skipped(SkipReason::NoLazyLoader)),
    };
    if cx.fixtures.is_empty() {
        return Ok(Outcome::Skipped(SkipReason::NoFixtures));
    }
    let base = FailureContext::new(Scenario::LoadLazyObjects);
    let mut checked = 0;

    for fixture in cx.fixtures.iter() {
        let failure = base.on(&fixture.path, true, cx.config.read_all);
        let eager = cx.read_fixture(&fixture.path, false).map_err(|e| failure.fail(e))?;

        let reader = resolve_reader(cx.class, &cx.config.target, true, cx.config.read_all)
            .map_err(|e| failure.fail(e))?;
        let mut instance = OpenDriver::open(cx.class, &fixture.path)
            .map_err(|e| failure.fail(e))?
            .ok_or_else(|| {
                failure.fail(FailureCause::Contract(format!(
                    "no instance for {}",
                    fixture.path.display()
                )))
            })?;
        let lazy = reader.call(&mut instance).map_err(|e| failure.fail(e))?;
        check_same_count(&lazy, &eager).map_err(|e| failure.fail(e))?;

        for (lazy_obj, eager_obj) in lazy.iter().zip(&eager) {
            let loaded = loader(&mut instance, lazy_obj).map_err(|e| failure.fail(e))?;
            cx.checks
                .structurally_equal(&loaded, eager_obj, cx.config.tolerance)
                .map_err(|e| failure.fail(FailureCause::check("loaded object differs from eager read", e)))?;
            checked += 1;
        }
        instance.close().map_err(|e| failure.fail(e))?;
    }
    Ok(Outcome::Passed { checked })
}

fn check_same_count(lazy: &[DomainObject], eager: &[DomainObject]) -> Result<(), FailureCause> {
    if lazy.len() == eager.len() {
        Ok(())
    } else {
        Err(FailureCause::Contract(format!(
            "lazy read returned {} objects, eager read {}",
            lazy.len(),
            eager.len()
        )))
    }
}

/// Same node layout, and each lazy placeholder's shape equals the eager
/// payload's shape at the same path.
pub fn check_lazy_shapes(lazy: &DomainObject, eager: &DomainObject) -> Result<(), FailureCause> {
    let mut lazy_nodes = Vec::new();
    lazy.walk(&mut |path, node| lazy_nodes.push((path.to_vec(), node)));
    let mut eager_nodes = Vec::new();
    eager.walk(&mut |path, node| eager_nodes.push((path.to_vec(), node)));

    if lazy_nodes.len() != eager_nodes.len() {
        return Err(FailureCause::Contract(format!(
            "lazy tree has {} nodes, eager tree {}",
            lazy_nodes.len(),
            eager_nodes.len()
        )));
    }

    for ((path, lazy_node), (eager_path, eager_node)) in lazy_nodes.iter().zip(&eager_nodes) {
        let at = describe_path(lazy, path);
        if path != eager_path || lazy_node.kind != eager_node.kind {
            return Err(FailureCause::Contract(format!(
                "layout differs at {at}: lazy {}, eager {}",
                lazy_node.kind, eager_node.kind
            )));
        }
        match (&lazy_node.payload, &eager_node.payload) {
            (None, None) => {}
            (Some(lazy_payload), Some(eager_payload)) => {
                if lazy_payload.lazy_shape.as_ref() != Some(&eager_payload.shape) {
                    return Err(FailureCause::Contract(format!(
                        "lazy shape {:?} at {at} does not match eager shape {:?}",
                        lazy_payload.lazy_shape, eager_payload.shape
                    )));
                }
            }
            _ => {
                return Err(FailureCause::Contract(format!(
                    "payload present on only one side at {at}"
                )))
            }
        }
    }
    Ok(())
}
