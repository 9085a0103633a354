//! Everything a scenario needs from its prepared suite.

use std::path::Path;

use iocheck_driver::DriverClass;
use iocheck_fs::Filesystem;
use iocheck_schema::DomainObject;

use crate::capability::Capabilities;
use crate::checks::ObjectChecks;
use crate::config::{DriverProfile, HarnessConfig};
use crate::dispatch::{read_path, resolve_reader};
use crate::fixture::FixtureSet;
use crate::logger::Logger;
use crate::types::FailureCause;

pub struct ScenarioContext<'a, C: DriverClass> {
    pub class: &'a C,
    pub caps: &'a Capabilities,
    pub profile: &'a DriverProfile,
    pub config: &'a HarnessConfig,
    pub checks: &'a dyn ObjectChecks,
    pub fs: &'a dyn Filesystem,
    pub logger: &'a dyn Logger,
    pub local_dir: &'a Path,
    pub fixtures: &'a FixtureSet,
}

impl<'a, C: DriverClass> ScenarioContext<'a, C> {
    /// Eager first, then lazy if the driver supports it.
    pub fn lazy_flags(&self) -> Vec<bool> {
        if self.caps.supports_lazy {
            vec![false, true]
        } else {
            vec![false]
        }
    }

    /// Read a fixture with the configured target and `read_all` flag.
    pub fn read_fixture(&self, path: &Path, lazy: bool) -> Result<Vec<DomainObject>, FailureCause> {
        let reader = resolve_reader(self.class, &self.config.target, lazy, self.config.read_all)?;
        self.logger.debug(&format!(
            "{} {} (lazy={lazy})",
            reader.operation(),
            path.display()
        ));
        read_path(self.class, &reader, path)
    }
}
