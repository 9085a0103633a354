//! Harness configuration and per-driver test profiles.

use std::path::PathBuf;

use iocheck_schema::DEFAULT_TOLERANCE;

use crate::dispatch::Target;
use crate::logger::Verbosity;

/// Default remote fixture repository. Fixture URLs are
/// `<base_url><driver short name>/<remote name>`.
pub const DEFAULT_BASE_URL: &str =
    "https://web.gin.g-node.org/NeuralEnsemble/ephy_testing_data/raw/master/";

/// Overrides the fixture root directory.
pub const ENV_TEST_FILE_DIR: &str = "IOCHECK_TEST_FILE_DIR";

/// Any value other than empty, `0`, `false` or `no` disables downloads.
pub const ENV_NO_NETWORK: &str = "IOCHECK_NO_NETWORK";

/// Overrides the fixture base URL.
pub const ENV_FIXTURE_URL: &str = "IOCHECK_FIXTURE_URL";

/// Log verbosity, see [`Verbosity::from_env_value`].
pub const ENV_VERBOSE: &str = "IOCHECK_VERBOSE";

/// Harness-wide settings shared by every suite in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    /// Absolute tolerance for float comparison.
    pub tolerance: f64,
    pub base_url: String,
    /// Root of per-driver fixture directories; system temp dir when `None`.
    pub local_root: Option<PathBuf>,
    pub use_network: bool,
    /// Target used when reading fixtures.
    pub target: Target,
    /// Use the "read all" entry points when reading fixtures.
    pub read_all: bool,
    pub verbosity: Verbosity,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            base_url: DEFAULT_BASE_URL.to_string(),
            local_root: None,
            use_network: true,
            target: Target::Highest,
            read_all: false,
            verbosity: Verbosity::Normal,
        }
    }
}

impl HarnessConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, which maps variable names to values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(dir) = lookup(ENV_TEST_FILE_DIR).filter(|v| !v.is_empty()) {
            config.local_root = Some(PathBuf::from(dir));
        }
        if let Some(value) = lookup(ENV_NO_NETWORK) {
            config.use_network = !is_truthy(&value);
        }
        if let Some(url) = lookup(ENV_FIXTURE_URL).filter(|v| !v.is_empty()) {
            config.base_url = url;
        }
        if let Some(value) = lookup(ENV_VERBOSE) {
            config.verbosity = Verbosity::from_env_value(&value);
        }
        config
    }

    /// Builder: set tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder: set base_url.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Builder: set local_root.
    pub fn with_local_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.local_root = Some(root.into());
        self
    }

    /// Builder: set use_network.
    pub fn with_network(mut self, use_network: bool) -> Self {
        self.use_network = use_network;
        self
    }

    /// Builder: set target.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Builder: set read_all.
    pub fn with_read_all(mut self, read_all: bool) -> Self {
        self.read_all = read_all;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no"
    )
}

/// What a driver's test suite declares about itself.
///
/// Each suite owns its profile; nothing is shared between driver classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverProfile {
    /// Files expected to already exist in the local fixture directory.
    pub files_to_test: Vec<String>,
    /// Files fetched from the remote repository, relative to the driver's
    /// remote directory. May contain `/` for nested layouts.
    pub files_to_download: Vec<String>,
    pub read_and_write_is_bijective: bool,
    pub hash_conserved_when_write_read: bool,
}

impl Default for DriverProfile {
    fn default() -> Self {
        Self {
            files_to_test: Vec::new(),
            files_to_download: Vec::new(),
            read_and_write_is_bijective: true,
            hash_conserved_when_write_read: false,
        }
    }
}

impl DriverProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set files_to_test.
    pub fn with_files_to_test(mut self, names: &[&str]) -> Self {
        self.files_to_test = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Builder: set files_to_download.
    pub fn with_files_to_download(mut self, names: &[&str]) -> Self {
        self.files_to_download = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Builder: set read_and_write_is_bijective.
    pub fn with_bijective(mut self, bijective: bool) -> Self {
        self.read_and_write_is_bijective = bijective;
        self
    }

    /// Builder: set hash_conserved_when_write_read.
    pub fn with_hash_conserved(mut self, conserved: bool) -> Self {
        self.hash_conserved_when_write_read = conserved;
        self
    }
}
