//! Scenario outcomes, failures and suite reports.

use std::fmt;
use std::path::{Path, PathBuf};

use iocheck_driver::DriverError;
use iocheck_fs::FsError;
use iocheck_schema::Kind;
use serde::{Deserialize, Serialize};

use crate::checks::CheckFailure;
use crate::dispatch::DispatchError;
use crate::fixture::{FetchError, Fixture};

/// Scenarios run once per driver class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    WriteThenRead,
    ReadThenWrite,
    ReadObjectsAreCompliant,
    LazyReadIsCompliant,
    LoadLazyObjects,
    ReadIsIdempotent,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::WriteThenRead,
        Scenario::ReadThenWrite,
        Scenario::ReadObjectsAreCompliant,
        Scenario::LazyReadIsCompliant,
        Scenario::LoadLazyObjects,
        Scenario::ReadIsIdempotent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::WriteThenRead => "write_then_read",
            Scenario::ReadThenWrite => "read_then_write",
            Scenario::ReadObjectsAreCompliant => "read_objects_are_compliant",
            Scenario::LazyReadIsCompliant => "lazy_read_is_compliant",
            Scenario::LoadLazyObjects => "load_lazy_objects",
            Scenario::ReadIsIdempotent => "read_is_idempotent",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a scenario (or a whole suite) did not apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Fixtures must be downloaded but network use is disabled.
    NetworkDisabled,
    /// The highest kind cannot be written then read generically.
    NotRoundTripEligible { highest: Option<Kind> },
    /// The driver declares that write then read is not an identity.
    NotBijective,
    /// The driver does not declare hash conservation.
    HashConservationNotDeclared,
    /// Hash conservation is declared but byte comparison is not available.
    HashComparisonUnavailable,
    LazyUnsupported,
    NoLazyLoader,
    /// The class returned no instance for the path.
    NoInstance,
    NoFixtures,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NetworkDisabled => f.write_str("requires download of fixtures and network use is disabled"),
            SkipReason::NotRoundTripEligible { highest: Some(kind) } => {
                write!(f, "{kind} cannot be written then read generically")
            }
            SkipReason::NotRoundTripEligible { highest: None } => f.write_str("driver declares no supported kinds"),
            SkipReason::NotBijective => f.write_str("write then read is not bijective for this driver"),
            SkipReason::HashConservationNotDeclared => f.write_str("driver does not declare hash conservation"),
            SkipReason::HashComparisonUnavailable => f.write_str("byte-identity comparison is not implemented"),
            SkipReason::LazyUnsupported => f.write_str("driver does not support lazy reads"),
            SkipReason::NoLazyLoader => f.write_str("driver exposes no lazy-load operation"),
            SkipReason::NoInstance => f.write_str("driver class produced no instance"),
            SkipReason::NoFixtures => f.write_str("no fixtures to read"),
        }
    }
}

/// Result of a scenario that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Passed after checking `checked` objects.
    Passed { checked: usize },
    Skipped(SkipReason),
}

/// What went wrong inside a failing scenario.
#[derive(Debug, thiserror::Error)]
pub enum FailureCause {
    #[error("{subject}: {source}")]
    Check {
        subject: String,
        #[source]
        source: CheckFailure,
    },

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("{0}")]
    Contract(String),
}

impl FailureCause {
    pub fn check(subject: &str, source: CheckFailure) -> Self {
        FailureCause::Check {
            subject: subject.to_string(),
            source,
        }
    }
}

/// A failed scenario with the context active when it failed.
#[derive(Debug, thiserror::Error)]
#[error(
    "{scenario} failed for {} (lazy={lazy}, read_all={read_all}): {cause}",
    fixture_label(.fixture)
)]
pub struct ScenarioFailure {
    pub scenario: Scenario,
    pub fixture: Option<PathBuf>,
    pub lazy: bool,
    pub read_all: bool,
    #[source]
    pub cause: FailureCause,
}

fn fixture_label(fixture: &Option<PathBuf>) -> String {
    match fixture {
        Some(path) => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        None => "<no fixture>".to_string(),
    }
}

/// Context attached to failures raised inside a scenario.
#[derive(Debug, Clone)]
pub struct FailureContext {
    pub scenario: Scenario,
    pub fixture: Option<PathBuf>,
    pub lazy: bool,
    pub read_all: bool,
}

impl FailureContext {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            fixture: None,
            lazy: false,
            read_all: false,
        }
    }

    pub fn on(&self, fixture: &Path, lazy: bool, read_all: bool) -> Self {
        Self {
            scenario: self.scenario,
            fixture: Some(fixture.to_path_buf()),
            lazy,
            read_all,
        }
    }

    pub fn fail(&self, cause: impl Into<FailureCause>) -> ScenarioFailure {
        ScenarioFailure {
            scenario: self.scenario,
            fixture: self.fixture.clone(),
            lazy: self.lazy,
            read_all: self.read_all,
            cause: cause.into(),
        }
    }
}

/// Setup errors that abort a whole suite.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to prepare fixture directory: {0}")]
    LocalDir(#[source] FsError),

    #[error("local fixture {0} does not exist")]
    MissingLocal(PathBuf),

    #[error("failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to store fixture {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("failed to generate fixture {path}: {cause}")]
    Generate {
        path: PathBuf,
        #[source]
        cause: FailureCause,
    },
}

/// Errors raised while preparing a suite.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("skipped: {0}")]
    Skip(SkipReason),

    #[error(transparent)]
    Fatal(#[from] SetupError),
}

/// Serializable status of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed {
        checked: usize,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        message: String,
        fixture: Option<PathBuf>,
        lazy: bool,
        read_all: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    #[serde(flatten)]
    pub status: ScenarioStatus,
}

impl ScenarioResult {
    pub fn from_run(scenario: Scenario, run: &Result<Outcome, ScenarioFailure>) -> Self {
        let status = match run {
            Ok(Outcome::Passed { checked }) => ScenarioStatus::Passed { checked: *checked },
            Ok(Outcome::Skipped(reason)) => ScenarioStatus::Skipped {
                reason: reason.clone(),
            },
            Err(failure) => ScenarioStatus::Failed {
                message: failure.to_string(),
                fixture: failure.fixture.clone(),
                lazy: failure.lazy,
                read_all: failure.read_all,
            },
        };
        Self { scenario, status }
    }
}

/// Report of a full suite run for one driver class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub driver: String,
    pub fixtures: Vec<Fixture>,
    pub scenarios: Vec<ScenarioResult>,
    /// Setup error that prevented any scenario from running.
    pub fatal: Option<String>,
}

impl SuiteReport {
    pub fn new(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            fixtures: Vec::new(),
            scenarios: Vec::new(),
            fatal: None,
        }
    }

    /// True if setup succeeded (or skipped) and no scenario failed.
    pub fn is_success(&self) -> bool {
        self.fatal.is_none() && self.failed_count() == 0
    }

    pub fn passed_count(&self) -> usize {
        self.count(|s| matches!(s, ScenarioStatus::Passed { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|s| matches!(s, ScenarioStatus::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, ScenarioStatus::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&ScenarioStatus) -> bool) -> usize {
        self.scenarios.iter().filter(|r| pred(&r.status)).count()
    }

    pub fn status_of(&self, scenario: Scenario) -> Option<&ScenarioStatus> {
        self.scenarios
            .iter()
            .find(|r| r.scenario == scenario)
            .map(|r| &r.status)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
