//! Static capability metadata declared by a driver class.

use std::collections::{BTreeMap, BTreeSet};

use iocheck_schema::Kind;
use serde::{Deserialize, Serialize};

/// Whether a driver reads a single file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileMode {
    #[default]
    File,
    Directory,
}

/// A parameter a driver needs from the caller to read a kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(description: &str) -> Self {
        Self {
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(description: &str) -> Self {
        Self {
            required: false,
            description: description.to_string(),
        }
    }
}

/// Capability descriptor of a driver class.
///
/// Built once when the driver is registered and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverDescriptor {
    name: String,
    readable_kinds: BTreeSet<Kind>,
    writeable_kinds: BTreeSet<Kind>,
    supported_kinds: Vec<Kind>,
    read_params: BTreeMap<Kind, BTreeMap<String, ParamSpec>>,
    supports_lazy: bool,
    extensions: Vec<String>,
    mode: FileMode,
}

impl DriverDescriptor {
    /// Create an empty descriptor for the named driver.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            readable_kinds: BTreeSet::new(),
            writeable_kinds: BTreeSet::new(),
            supported_kinds: Vec::new(),
            read_params: BTreeMap::new(),
            supports_lazy: false,
            extensions: Vec::new(),
            mode: FileMode::File,
        }
    }

    /// Builder: kinds the driver can read.
    pub fn readable(mut self, kinds: &[Kind]) -> Self {
        self.readable_kinds.extend(kinds.iter().copied());
        self
    }

    /// Builder: kinds the driver can write.
    pub fn writeable(mut self, kinds: &[Kind]) -> Self {
        self.writeable_kinds.extend(kinds.iter().copied());
        self
    }

    /// Builder: supported kinds, highest first.
    pub fn supported(mut self, kinds: &[Kind]) -> Self {
        self.supported_kinds = kinds.to_vec();
        self
    }

    /// Builder: declare a parameter needed to read `kind`.
    pub fn read_param(mut self, kind: Kind, name: &str, param: ParamSpec) -> Self {
        self.read_params
            .entry(kind)
            .or_default()
            .insert(name.to_string(), param);
        self
    }

    /// Builder: lazy reads are supported.
    pub fn lazy(mut self, supports_lazy: bool) -> Self {
        self.supports_lazy = supports_lazy;
        self
    }

    /// Builder: file extensions, preferred first.
    pub fn extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    /// Builder: file or directory mode.
    pub fn mode(mut self, mode: FileMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn readable_kinds(&self) -> &BTreeSet<Kind> {
        &self.readable_kinds
    }

    pub fn writeable_kinds(&self) -> &BTreeSet<Kind> {
        &self.writeable_kinds
    }

    pub fn supported_kinds(&self) -> &[Kind] {
        &self.supported_kinds
    }

    /// Parameters required to read `kind`; empty when none are declared.
    pub fn read_params_for(&self, kind: Kind) -> Option<&BTreeMap<String, ParamSpec>> {
        self.read_params.get(&kind)
    }

    pub fn supports_lazy(&self) -> bool {
        self.supports_lazy
    }

    pub fn file_mode(&self) -> FileMode {
        self.mode
    }

    /// Short name used for fixture directories and download URLs:
    /// lowercased, with a trailing `io` removed.
    pub fn short_name(&self) -> String {
        let lower = self.name.to_lowercase();
        match lower.strip_suffix("io") {
            Some(stripped) if !stripped.is_empty() => stripped.to_string(),
            _ => lower,
        }
    }

    /// File name used for fixtures this driver writes itself.
    pub fn generated_file_name(&self) -> String {
        match (self.mode, self.extensions.first()) {
            (FileMode::File, Some(ext)) => format!("Generated0_{}.{}", self.name, ext),
            _ => format!("Generated0_{}", self.name),
        }
    }
}
