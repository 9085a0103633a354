//! Per-driver suite: setup, scenario execution, teardown and reporting.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use iocheck_driver::DriverClass;
use iocheck_fs::{ensure_local_dir, fixture_root, Filesystem, FsError, RealFilesystem};

use crate::capability::Capabilities;
use crate::checks::{ObjectChecks, SchemaChecks};
use crate::compliance::read_objects_are_compliant;
use crate::config::{DriverProfile, HarnessConfig};
use crate::context::ScenarioContext;
use crate::fixture::{
    acquire_downloaded, acquire_local, generate_if_writable, FixtureFetcher, FixtureOrigin,
    FixtureSet, SchemeFetcher,
};
use crate::idempotence::read_is_idempotent;
use crate::lazy::{lazy_read_is_compliant, load_lazy_objects};
use crate::logger::{Logger, StderrLogger};
use crate::roundtrip::{read_then_write, write_then_read};
use crate::types::{
    HarnessError, Outcome, Scenario, ScenarioFailure, ScenarioResult, SetupError, SuiteReport,
};

/// Conformance suite for one driver class.
pub struct ConformanceSuite<C: DriverClass> {
    class: C,
    profile: DriverProfile,
    config: HarnessConfig,
    fs: Box<dyn Filesystem>,
    fetcher: Box<dyn FixtureFetcher>,
    checks: Box<dyn ObjectChecks>,
    logger: Box<dyn Logger>,
}

impl<C: DriverClass> ConformanceSuite<C> {
    /// Suite on the real filesystem, fetching over HTTP(S) or from `file://`
    /// mirrors, checking with the schema predicates and logging to stderr.
    pub fn new(class: C, profile: DriverProfile, config: HarnessConfig) -> Self {
        let logger = StderrLogger::new(config.verbosity);
        Self {
            class,
            profile,
            config,
            fs: Box::new(RealFilesystem),
            fetcher: Box::new(SchemeFetcher::new()),
            checks: Box::new(SchemaChecks),
            logger: Box::new(logger),
        }
    }

    /// Builder: set the filesystem.
    pub fn with_filesystem(mut self, fs: impl Filesystem + 'static) -> Self {
        self.fs = Box::new(fs);
        self
    }

    /// Builder: set the fixture fetcher.
    pub fn with_fetcher(mut self, fetcher: impl FixtureFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// Builder: set the object checks.
    pub fn with_checks(mut self, checks: impl ObjectChecks + 'static) -> Self {
        self.checks = Box::new(checks);
        self
    }

    /// Builder: set the logger.
    pub fn with_logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    pub fn class(&self) -> &C {
        &self.class
    }

    pub fn profile(&self) -> &DriverProfile {
        &self.profile
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    fn name(&self) -> &str {
        self.class.descriptor().name()
    }

    /// Directory holding this driver's fixtures: `<root>/<short name>`.
    pub fn local_dir(&self) -> PathBuf {
        fixture_root(self.config.local_root.as_deref()).join(self.class.descriptor().short_name())
    }

    /// Resolve capabilities, prepare the local directory and acquire
    /// fixtures: local, then downloaded, then generated.
    pub fn setup(&self) -> Result<PreparedSuite<'_, C>, HarnessError> {
        let descriptor = self.class.descriptor();
        let short_name = descriptor.short_name();
        let caps = Capabilities::resolve(descriptor);
        let fs = self.fs.as_ref();

        let local_dir = ensure_local_dir(fs, &short_name, self.config.local_root.as_deref())
            .map_err(SetupError::LocalDir)?;

        let mut fixtures = FixtureSet::new();
        fixtures.extend(acquire_local(fs, &local_dir, &self.profile.files_to_test)?);
        fixtures.extend(acquire_downloaded(
            fs,
            self.fetcher.as_ref(),
            &self.config,
            &short_name,
            &local_dir,
            &self.profile.files_to_download,
            self.logger.as_ref(),
        )?);
        if let Some(generated) = generate_if_writable(&self.class, &caps, fs, &local_dir)? {
            fixtures.push(generated);
        }

        self.logger.verbose(&format!(
            "{}: {} fixtures ({} local, {} downloaded, {} generated) in {}",
            self.name(),
            fixtures.len(),
            fixtures.count(FixtureOrigin::Local),
            fixtures.count(FixtureOrigin::Downloaded),
            fixtures.count(FixtureOrigin::Generated),
            local_dir.display()
        ));

        Ok(PreparedSuite {
            suite: self,
            caps,
            local_dir,
            fixtures,
        })
    }

    /// Run every scenario in order. A setup skip marks every scenario
    /// skipped; a fatal setup error aborts the suite and is recorded.
    pub fn run_all(&self) -> SuiteReport {
        let mut report = SuiteReport::new(self.name());
        let prepared = match self.setup() {
            Ok(prepared) => prepared,
            Err(HarnessError::Skip(reason)) => {
                self.logger.info(&format!("{}: skipped: {reason}", self.name()));
                report.scenarios = Scenario::ALL
                    .iter()
                    .map(|s| ScenarioResult::from_run(*s, &Ok(Outcome::Skipped(reason.clone()))))
                    .collect();
                return report;
            }
            Err(HarnessError::Fatal(e)) => {
                self.logger.info(&format!("{}: setup failed: {e}", self.name()));
                report.fatal = Some(e.to_string());
                return report;
            }
        };

        report.fixtures = prepared.fixtures().as_slice().to_vec();
        for scenario in Scenario::ALL {
            let run = prepared.run(scenario);
            report.scenarios.push(ScenarioResult::from_run(scenario, &run));
        }
        drop(prepared);

        self.logger.info(&format!(
            "{}: {} passed, {} skipped, {} failed",
            report.driver,
            report.passed_count(),
            report.skipped_count(),
            report.failed_count()
        ));
        report
    }
}

/// A suite whose fixtures are in place.
///
/// Generated fixtures are removed by [`PreparedSuite::teardown`], or on drop
/// if teardown was not called.
pub struct PreparedSuite<'s, C: DriverClass> {
    suite: &'s ConformanceSuite<C>,
    caps: Capabilities,
    local_dir: PathBuf,
    fixtures: FixtureSet,
}

impl<'s, C: DriverClass> PreparedSuite<'s, C> {
    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    pub fn fixtures(&self) -> &FixtureSet {
        &self.fixtures
    }

    fn context(&self) -> ScenarioContext<'_, C> {
        ScenarioContext {
            class: &self.suite.class,
            caps: &self.caps,
            profile: &self.suite.profile,
            config: &self.suite.config,
            checks: self.suite.checks.as_ref(),
            fs: self.suite.fs.as_ref(),
            logger: self.suite.logger.as_ref(),
            local_dir: &self.local_dir,
            fixtures: &self.fixtures,
        }
    }

    pub fn write_then_read(&self) -> Result<Outcome, ScenarioFailure> {
        write_then_read(&self.context())
    }

    pub fn read_then_write(&self) -> Result<Outcome, ScenarioFailure> {
        read_then_write(&self.context())
    }

    pub fn read_objects_are_compliant(&self) -> Result<Outcome, ScenarioFailure> {
        read_objects_are_compliant(&self.context())
    }

    pub fn lazy_read_is_compliant(&self) -> Result<Outcome, ScenarioFailure> {
        lazy_read_is_compliant(&self.context())
    }

    pub fn load_lazy_objects(&self) -> Result<Outcome, ScenarioFailure> {
        load_lazy_objects(&self.context())
    }

    pub fn read_is_idempotent(&self) -> Result<Outcome, ScenarioFailure> {
        read_is_idempotent(&self.context())
    }

    /// Run one scenario and log its outcome.
    pub fn run(&self, scenario: Scenario) -> Result<Outcome, ScenarioFailure> {
        let run = match scenario {
            Scenario::WriteThenRead => self.write_then_read(),
            Scenario::ReadThenWrite => self.read_then_write(),
            Scenario::ReadObjectsAreCompliant => self.read_objects_are_compliant(),
            Scenario::LazyReadIsCompliant => self.lazy_read_is_compliant(),
            Scenario::LoadLazyObjects => self.load_lazy_objects(),
            Scenario::ReadIsIdempotent => self.read_is_idempotent(),
        };

        let logger = self.suite.logger.as_ref();
        let name = self.suite.name();
        match &run {
            Ok(Outcome::Passed { checked }) => {
                logger.verbose(&format!("{name}::{scenario} passed ({checked} checked)"));
            }
            Ok(Outcome::Skipped(reason)) => {
                logger.info(&format!("{name}::{scenario} skipped: {reason}"));
            }
            Err(failure) => {
                logger.info(&format!("{name}::{scenario} FAILED: {failure}"));
            }
        }
        run
    }

    /// Remove generated fixtures. Returns how many were removed.
    pub fn teardown(mut self) -> Result<usize, FsError> {
        self.cleanup()
    }

    fn cleanup(&mut self) -> Result<usize, FsError> {
        self.fixtures
            .cleanup_generated(self.suite.fs.as_ref(), &self.local_dir)
    }
}

impl<'s, C: DriverClass> Drop for PreparedSuite<'s, C> {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            self.suite.logger.warn(&format!(
                "{}: cannot remove generated fixtures in {}: {e}",
                self.suite.name(),
                self.local_dir.display()
            ));
        }
    }
}

/// One lock per local fixture directory. Scenarios of one driver share its
/// directory and must not overlap; other drivers run freely.
static DIRECTORY_LOCKS: Mutex<BTreeMap<PathBuf, Arc<Mutex<()>>>> = Mutex::new(BTreeMap::new());

fn directory_lock(dir: &Path) -> Arc<Mutex<()>> {
    let mut locks = DIRECTORY_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(dir.to_path_buf()).or_default())
}

/// Set up `suite`, run one scenario and tear down.
///
/// Skips are logged and return normally. Failures and fatal setup errors
/// panic with their full context.
pub fn run_scenario_or_panic<C: DriverClass>(suite: &ConformanceSuite<C>, scenario: Scenario) {
    let lock = directory_lock(&suite.local_dir());
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
    let name = suite.name();

    let prepared = match suite.setup() {
        Ok(prepared) => prepared,
        Err(HarnessError::Skip(reason)) => {
            suite.logger().info(&format!("{name}::{scenario} skipped: {reason}"));
            return;
        }
        Err(HarnessError::Fatal(e)) => panic!("{name}: setup failed: {e}"),
    };

    if let Err(failure) = prepared.run(scenario) {
        panic!("{name}: {failure}");
    }
}
