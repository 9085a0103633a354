//! Conformance harness for iocheck drivers.
//!
//! Given a driver class, the harness works out what it can read and write,
//! gathers fixtures (local, downloaded, generated) and runs:
//! - write-then-read round trips
//! - compliance of every object read, eagerly and lazily
//! - the lazy-read contract and explicit lazy loading
//! - read idempotence
//!
//! Use [`conformance_suite!`] to expand a driver's suite into `#[test]`
//! functions, or [`ConformanceSuite::run_all`] for a JSON report.

#[macro_use]
mod macros;

pub mod capability;
pub mod checks;
pub mod compliance;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod fixture;
pub mod idempotence;
pub mod lazy;
pub mod logger;
pub mod roundtrip;
pub mod suite;
pub mod types;

pub use capability::{Capabilities, Direction};
pub use checks::{CheckFailure, ObjectChecks, SchemaChecks};
pub use config::{
    DriverProfile, HarnessConfig, DEFAULT_BASE_URL, ENV_FIXTURE_URL, ENV_NO_NETWORK,
    ENV_TEST_FILE_DIR, ENV_VERBOSE,
};
pub use context::ScenarioContext;
pub use dispatch::{
    read_path, resolve_entry, resolve_reader, resolve_writer, DispatchError, ResolvedReader,
    ResolvedWriter, Target,
};
pub use fixture::{
    acquire_downloaded, acquire_local, fixture_url, generate_if_writable, FetchError,
    FileUrlFetcher, Fixture, FixtureFetcher, FixtureOrigin, FixtureSet, HttpFetcher, MockFetcher,
    SchemeFetcher, DEFAULT_FETCH_TIMEOUT,
};
pub use lazy::check_lazy_shapes;
pub use logger::{LogEntry, Logger, MockLogger, StderrLogger, Verbosity};
pub use roundtrip::ROUND_TRIP_PREFIX;
pub use suite::{run_scenario_or_panic, ConformanceSuite, PreparedSuite};
pub use types::{
    FailureCause, FailureContext, HarnessError, Outcome, Scenario, ScenarioFailure,
    ScenarioResult, ScenarioStatus, SetupError, SkipReason, SuiteReport,
};
