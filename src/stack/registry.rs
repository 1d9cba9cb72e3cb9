//! Stack registry
//!
//! A stack is a directory name that appears under the config directory, the
//! compose directory, or both. The registry holds no state of its own: every
//! call to [`StackRegistry::list_stacks`] reads the filesystem again.

use super::errors::RegistryError;
use super::types::ValidationResult;
use crate::infrastructure::Config;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A named deployment target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDescriptor {
    /// Unique stack name, e.g. `basic-stack`
    pub name: String,
    /// Declarative config describing the intended services
    pub config_path: PathBuf,
    /// Compose descriptor handed to the container CLI
    pub compose_path: PathBuf,
}

impl StackDescriptor {
    /// Creates a descriptor
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        config_path: impl Into<PathBuf>,
        compose_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            config_path: config_path.into(),
            compose_path: compose_path.into(),
        }
    }

    /// Compose project name used for every command on this stack
    ///
    /// Compose only accepts lowercase letters, digits, `-` and `_`, starting
    /// with a letter or digit.
    #[must_use]
    pub fn project_name(&self) -> String {
        static INVALID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_-]").unwrap());

        let lowered = self.name.to_lowercase();
        let project = INVALID.replace_all(&lowered, "-");
        if project
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
        {
            project.into_owned()
        } else {
            format!("stack-{project}")
        }
    }

    /// Paths that do not exist on disk
    #[must_use]
    pub fn missing_paths(&self) -> Vec<&Path> {
        [self.config_path.as_path(), self.compose_path.as_path()]
            .into_iter()
            .filter(|path| !path.is_file())
            .collect()
    }

    /// Returns the `ConfigMissing` result when either file is absent
    #[must_use]
    pub fn check_presence(&self) -> Option<ValidationResult> {
        let missing = self.missing_paths();
        if missing.is_empty() {
            None
        } else {
            Some(ValidationResult::config_missing(&self.name, &missing))
        }
    }
}

/// Enumerates the stacks under a config and a compose directory
#[derive(Debug, Clone)]
pub struct StackRegistry {
    config_dir: PathBuf,
    compose_dir: PathBuf,
    config_file_name: String,
    compose_file_name: String,
    explicit: Vec<String>,
}

impl StackRegistry {
    /// Creates a registry over the given directories with default file names
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>, compose_dir: impl Into<PathBuf>) -> Self {
        let defaults = Config::default();
        Self {
            config_dir: config_dir.into(),
            compose_dir: compose_dir.into(),
            config_file_name: defaults.config_file_name,
            compose_file_name: defaults.compose_file_name,
            explicit: Vec::new(),
        }
    }

    /// Creates a registry from the application settings
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            config_dir: config.resolve(&config.config_dir),
            compose_dir: config.resolve(&config.compose_dir),
            config_file_name: config.config_file_name.clone(),
            compose_file_name: config.compose_file_name.clone(),
            explicit: config.stacks.clone(),
        }
    }

    /// Restricts the registry to the given names, in the given order
    #[must_use]
    pub fn with_stacks(mut self, names: Vec<String>) -> Self {
        self.explicit = names;
        self
    }

    /// Builds the descriptor for a stack name
    pub fn descriptor(&self, name: &str) -> Result<StackDescriptor, RegistryError> {
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed.contains(['/', '\\'])
            || trimmed == "."
            || trimmed == ".."
        {
            return Err(RegistryError::InvalidName(name.to_string()));
        }

        Ok(StackDescriptor::new(
            trimmed,
            self.config_dir.join(trimmed).join(&self.config_file_name),
            self.compose_dir.join(trimmed).join(&self.compose_file_name),
        ))
    }

    /// Lists every registered stack
    ///
    /// Explicitly configured names keep their order. Discovered names are
    /// the union of both directories' sub-directories, sorted.
    pub fn list_stacks(&self) -> Result<Vec<StackDescriptor>, RegistryError> {
        let names: Vec<String> = if self.explicit.is_empty() {
            let mut discovered = subdirectory_names(&self.config_dir)?;
            discovered.extend(subdirectory_names(&self.compose_dir)?);
            discovered.into_iter().collect()
        } else {
            let mut seen = BTreeSet::new();
            self.explicit
                .iter()
                .filter(|name| seen.insert(name.trim().to_string()))
                .cloned()
                .collect()
        };

        let stacks = names
            .iter()
            .map(|name| self.descriptor(name))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = stacks.len(), "Enumerated stacks");
        Ok(stacks)
    }
}

fn subdirectory_names(dir: &Path) -> Result<BTreeSet<String>, RegistryError> {
    let entries = std::fs::read_dir(dir).map_err(|source| RegistryError::Enumerate {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|source| RegistryError::Enumerate {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            names.insert(name);
        }
    }
    Ok(names)
}
