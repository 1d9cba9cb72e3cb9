//! Error types for the stack domain

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole run.
///
/// Anything that only concerns a single stack is captured into that stack's
/// result record instead and never surfaces as a `StackError`.
#[derive(Error, Debug)]
pub enum StackError {
    /// The stack registry could not be enumerated
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The settings file could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A required external tool is missing or not working
    #[error("External tool unavailable: {tool}: {reason}")]
    ToolUnavailable {
        /// Command line of the tool that was probed.
        tool: String,
        /// Why the probe failed.
        reason: String,
    },

    /// IO error occurred
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Stack enumeration failures
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A stack directory could not be read
    #[error("Cannot enumerate stacks in {path}: {source}")]
    Enumerate {
        /// Directory that failed to enumerate.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A stack name cannot be mapped to a directory
    #[error("Invalid stack name: '{0}'")]
    InvalidName(String),
}

/// Settings file failures
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Settings file could not be read
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        /// Settings file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid YAML for [`crate::Config`]
    #[error("Failed to parse settings file {path}: {reason}")]
    Parse {
        /// Settings file path.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A setting has an unusable value
    #[error("Invalid setting '{key}': {reason}")]
    Invalid {
        /// Setting name.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// External command failures that prevent getting any exit status at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The program could not be started
    #[error("Failed to start '{program}': {reason}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// OS error message.
        reason: String,
        /// True when the program was not found on the PATH.
        not_found: bool,
    },

    /// Waiting on the child process failed
    #[error("Failed to wait for '{program}': {reason}")]
    Wait {
        /// Program being waited on.
        program: String,
        /// OS error message.
        reason: String,
    },
}

impl ExecError {
    pub(crate) fn spawn(program: &str, err: &std::io::Error) -> Self {
        Self::Spawn {
            program: program.to_string(),
            reason: err.to_string(),
            not_found: err.kind() == std::io::ErrorKind::NotFound,
        }
    }

    /// Returns true if the program is not installed
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Spawn { not_found: true, .. })
    }
}
