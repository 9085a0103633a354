//! Harness log output.
//!
//! Suites report fixture acquisition, skips and failures through a
//! [`Logger`] so tests can assert on what was said without capturing stderr.

use std::io::Write;
use std::sync::{Arc, PoisonError, RwLock};

/// Verbosity level for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Skips, failures and suite summaries
    Normal,
    /// Fixture acquisition and per-scenario results
    Verbose,
    /// Every dispatched read and write
    Debug,
}

impl Verbosity {
    /// Parse a level from `IOCHECK_VERBOSE`: a count (`0`, `1`, `2`) or a
    /// name (`normal`, `verbose`, `debug`). Unknown values fall back to normal.
    pub fn from_env_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "verbose" => Verbosity::Verbose,
            "debug" => Verbosity::Debug,
            other => match other.parse::<u8>() {
                Ok(0) | Err(_) => Verbosity::Normal,
                Ok(1) => Verbosity::Verbose,
                Ok(_) => Verbosity::Debug,
            },
        }
    }
}

/// Sink for harness messages.
pub trait Logger: Send + Sync {
    fn log(&self, level: Verbosity, message: &str);

    fn info(&self, message: &str) {
        self.log(Verbosity::Normal, message);
    }

    /// Problem the harness works around, e.g. a file it could not remove.
    fn warn(&self, message: &str) {
        self.log(Verbosity::Normal, &format!("warning: {message}"));
    }

    fn verbose(&self, message: &str) {
        self.log(Verbosity::Verbose, message);
    }

    fn debug(&self, message: &str) {
        self.log(Verbosity::Debug, message);
    }
}

/// Logger that writes to stderr.
#[derive(Debug)]
pub struct StderrLogger {
    level: Verbosity,
}

impl StderrLogger {
    pub fn new(level: Verbosity) -> Self {
        Self { level }
    }
}

impl Logger for StderrLogger {
    fn log(&self, level: Verbosity, message: &str) {
        if level <= self.level {
            let _ = writeln!(std::io::stderr(), "[iocheck] {}", message);
        }
    }
}

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Verbosity,
    pub message: String,
}

/// Logger capturing entries for assertions. Clones share the same buffer.
#[derive(Debug, Clone)]
pub struct MockLogger {
    level: Verbosity,
    entries: Arc<RwLock<Vec<LogEntry>>>,
}

impl MockLogger {
    pub fn new(level: Verbosity) -> Self {
        Self {
            level,
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Capture every level.
    pub fn capture_all() -> Self {
        Self::new(Verbosity::Debug)
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    pub fn messages_at_level(&self, level: Verbosity) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    pub fn contains(&self, substring: &str) -> bool {
        self.messages().iter().any(|m| m.contains(substring))
    }

    pub fn count(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for MockLogger {
    fn default() -> Self {
        Self::capture_all()
    }
}

impl Logger for MockLogger {
    fn log(&self, level: Verbosity, message: &str) {
        if level <= self.level {
            self.entries
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(LogEntry {
                    level,
                    message: message.to_string(),
                });
        }
    }
}
