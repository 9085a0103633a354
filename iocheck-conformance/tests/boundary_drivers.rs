mod common;

use std::path::Path;

use common::{ListDriverClass, RefusingClass};
use iocheck_conformance::{
    CheckFailure, ConformanceSuite, DriverProfile, FailureCause, FixtureOrigin, HarnessConfig,
    MockLogger, Outcome, Scenario, ScenarioStatus, SkipReason,
};
use iocheck_driver::DriverClass;
use iocheck_schema::{ComplianceError, Kind};
use tempfile::tempdir;

fn suite<C: DriverClass>(root: &Path, class: C, profile: DriverProfile) -> ConformanceSuite<C> {
    ConformanceSuite::new(class, profile, HarnessConfig::default().with_local_root(root))
        .with_logger(MockLogger::capture_all())
}

/// Create an empty local fixture for a driver and return the profile naming it.
fn local_fixture(root: &Path, short_name: &str, file: &str) -> DriverProfile {
    let dir = root.join(short_name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(file), b"[]").unwrap();
    DriverProfile::new().with_files_to_test(&[file])
}

// ===========================================
// Round-trip gating
// ===========================================

#[test]
fn test_faithful_driver_round_trips() {
    let root = tempdir().unwrap();
    let suite = suite(root.path(), ListDriverClass::faithful(), DriverProfile::default());
    let prepared = suite.setup().unwrap();

    assert_eq!(prepared.write_then_read().unwrap(), Outcome::Passed { checked: 1 });
    assert!(!prepared
        .local_dir()
        .join("RoundTrip_Generated0_ListIO.list")
        .exists());
}

#[test]
fn test_read_params_skip_write_then_read() {
    let root = tempdir().unwrap();
    let suite = suite(
        root.path(),
        ListDriverClass::needs_sampling_rate(),
        DriverProfile::default(),
    );
    let prepared = suite.setup().unwrap();

    assert!(prepared.fixtures().is_empty());
    assert_eq!(
        prepared.write_then_read().unwrap(),
        Outcome::Skipped(SkipReason::NotRoundTripEligible {
            highest: Some(Kind::Block)
        })
    );
    assert!(!prepared.capabilities().eligible_for_generic_round_trip(Kind::Block));
}

#[test]
fn test_non_bijective_profile_skips() {
    let root = tempdir().unwrap();
    let suite = suite(
        root.path(),
        ListDriverClass::faithful(),
        DriverProfile::new().with_bijective(false),
    );
    let prepared = suite.setup().unwrap();

    assert_eq!(
        prepared.write_then_read().unwrap(),
        Outcome::Skipped(SkipReason::NotBijective)
    );
}

#[test]
fn test_hash_conserving_profile_reports_missing_comparison() {
    let root = tempdir().unwrap();
    let suite = suite(
        root.path(),
        ListDriverClass::faithful(),
        DriverProfile::new().with_hash_conserved(true),
    );
    let prepared = suite.setup().unwrap();

    assert_eq!(
        prepared.read_then_write().unwrap(),
        Outcome::Skipped(SkipReason::HashComparisonUnavailable)
    );
}

#[test]
fn test_lossy_writer_fails_round_trip() {
    let root = tempdir().unwrap();
    let suite = suite(root.path(), ListDriverClass::lossy(), DriverProfile::default());
    let prepared = suite.setup().unwrap();

    let failure = prepared.write_then_read().unwrap_err();
    assert_eq!(failure.scenario, Scenario::WriteThenRead);
    assert!(failure
        .fixture
        .as_ref()
        .unwrap()
        .ends_with("RoundTrip_Generated0_LossyListIO.list"));
    match &failure.cause {
        FailureCause::Check {
            source: CheckFailure::Structure(mismatch),
            ..
        } => {
            assert!(mismatch.path.contains("analogsignal[0]"), "{}", mismatch.path);
            assert_eq!(mismatch.tolerance, 1e-8);
        }
        other => panic!("expected structure mismatch, got {other:?}"),
    }
    // Left in place for inspection.
    assert!(failure.fixture.unwrap().exists());
}

#[test]
fn test_tolerance_is_configurable() {
    let root = tempdir().unwrap();
    let suite = ConformanceSuite::new(
        ListDriverClass::lossy(),
        DriverProfile::default(),
        HarnessConfig::default()
            .with_local_root(root.path())
            .with_tolerance(1.0),
    )
    .with_logger(MockLogger::capture_all());
    let prepared = suite.setup().unwrap();

    assert_eq!(prepared.write_then_read().unwrap(), Outcome::Passed { checked: 1 });
}

#[test]
fn test_class_without_instance() {
    let root = tempdir().unwrap();
    let suite = suite(root.path(), RefusingClass::new(), DriverProfile::default());
    let prepared = suite.setup().unwrap();

    assert!(prepared.fixtures().is_empty());
    assert_eq!(
        prepared.write_then_read().unwrap(),
        Outcome::Skipped(SkipReason::NoInstance)
    );
    assert_eq!(
        prepared.read_objects_are_compliant().unwrap(),
        Outcome::Skipped(SkipReason::NoFixtures)
    );
}

// ===========================================
// Compliance failures
// ===========================================

#[test]
fn test_non_compliant_read_names_fixture() {
    let root = tempdir().unwrap();
    let profile = local_fixture(root.path(), "incomplete", "session.list");
    let suite = suite(root.path(), ListDriverClass::incomplete_reader(), profile);
    let prepared = suite.setup().unwrap();
    assert_eq!(prepared.fixtures().count(FixtureOrigin::Local), 1);

    let failure = prepared.read_objects_are_compliant().unwrap_err();
    assert_eq!(failure.fixture, Some(root.path().join("incomplete/session.list")));
    assert!(!failure.lazy);
    assert!(!failure.read_all);
    assert!(matches!(
        failure.cause,
        FailureCause::Check {
            source: CheckFailure::Compliance(ComplianceError::MissingAttribute { .. }),
            ..
        }
    ));
    assert!(failure.to_string().contains("session.list"));
}

#[test]
fn test_lazy_only_violation_reports_lazy_flag() {
    let root = tempdir().unwrap();
    let profile = local_fixture(root.path(), "lazybroken", "session.list");
    let suite = suite(root.path(), ListDriverClass::broken_when_lazy(), profile);
    let prepared = suite.setup().unwrap();

    let failure = prepared.read_objects_are_compliant().unwrap_err();
    assert!(failure.lazy);
    assert!(failure.to_string().contains("lazy=true"));
}

#[test]
fn test_missing_local_fixture_is_fatal() {
    let root = tempdir().unwrap();
    let suite = suite(
        root.path(),
        ListDriverClass::faithful(),
        DriverProfile::new().with_files_to_test(&["absent.list"]),
    );

    let report = suite.run_all();
    assert!(report.scenarios.is_empty());
    assert!(report.fatal.unwrap().contains("absent.list"));
}

#[test]
fn test_report_for_read_only_driver() {
    let root = tempdir().unwrap();
    let profile = local_fixture(root.path(), "incomplete", "session.list");
    let suite = suite(root.path(), ListDriverClass::incomplete_reader(), profile);

    let report = suite.run_all();
    assert!(!report.is_success());
    assert_eq!(
        report.status_of(Scenario::WriteThenRead),
        Some(&ScenarioStatus::Skipped {
            reason: SkipReason::NotRoundTripEligible {
                highest: Some(Kind::Block)
            }
        })
    );
    assert_eq!(
        report.status_of(Scenario::LoadLazyObjects),
        Some(&ScenarioStatus::Skipped {
            reason: SkipReason::NoLazyLoader
        })
    );
    match report.status_of(Scenario::ReadObjectsAreCompliant) {
        Some(ScenarioStatus::Failed { fixture, lazy, .. }) => {
            assert!(fixture.as_ref().unwrap().ends_with("session.list"));
            assert!(!lazy);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    // The local fixture survives teardown.
    assert!(root.path().join("incomplete/session.list").exists());
}
