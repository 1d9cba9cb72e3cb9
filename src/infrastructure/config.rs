//! Configuration management
//!
//! Settings come from an optional YAML file (`stackcheck.yml` in the base
//! directory unless another file is named) and are then overridden by
//! command-line flags. Relative paths are resolved against `base_dir`.

use crate::report::ReportFormat;
use crate::stack::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file looked up in the base directory when none is given
pub const DEFAULT_SETTINGS_FILE: &str = "stackcheck.yml";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root every relative path is resolved against
    pub base_dir: PathBuf,
    /// Directory holding `{stack}/config.yml`
    pub config_dir: PathBuf,
    /// Directory holding `{stack}/docker-compose.yml`
    pub compose_dir: PathBuf,
    /// Directory report files are written to
    pub reports_dir: PathBuf,
    /// File name of the declarative config inside a stack directory
    pub config_file_name: String,
    /// File name of the compose descriptor inside a stack directory
    pub compose_file_name: String,
    /// Explicit stack list; discovered from the directories when empty
    pub stacks: Vec<String>,
    /// Container CLI used for version probes and pruning
    pub container_command: String,
    /// Compose invocation prefix, e.g. `["docker", "compose"]`
    pub compose_command: Vec<String>,
    /// Wait between `up` and sampling, in seconds
    pub grace_period_secs: u64,
    /// Sample every N seconds during the grace period and stop early once
    /// every service runs
    pub readiness_poll_secs: Option<u64>,
    /// Timeout for `up`, in seconds
    pub start_timeout_secs: u64,
    /// Timeout for `down`, in seconds
    pub teardown_timeout_secs: u64,
    /// Timeout for `config` and `ps` queries, in seconds
    pub query_timeout_secs: u64,
    /// Cache directories purged by `cleanup`
    pub cache_dirs: Vec<PathBuf>,
    /// Run docker system/volume/image prune during `cleanup`
    pub prune: bool,
    /// Format of the written report file
    pub report_format: ReportFormat,
    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            config_dir: PathBuf::from(".config"),
            compose_dir: PathBuf::from(".compose"),
            reports_dir: PathBuf::from("reports"),
            config_file_name: "config.yml".to_string(),
            compose_file_name: "docker-compose.yml".to_string(),
            stacks: Vec::new(),
            container_command: "docker".to_string(),
            compose_command: vec!["docker".to_string(), "compose".to_string()],
            grace_period_secs: 15,
            readiness_poll_secs: None,
            start_timeout_secs: 120,
            teardown_timeout_secs: 120,
            query_timeout_secs: 30,
            cache_dirs: [
                ".pytest_cache",
                ".mypy_cache",
                ".ruff_cache",
                "__pycache__",
                ".cache/buildx",
            ]
            .iter()
            .map(PathBuf::from)
            .collect(),
            prune: false,
            report_format: ReportFormat::Markdown,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Loads a settings file
    ///
    /// A relative `base_dir` inside the file is taken relative to the file's
    /// own directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Self =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if config.base_dir.is_relative()
            && let Some(parent) = path.parent()
        {
            config.base_dir = parent.join(&config.base_dir);
        }

        config.check()?;
        tracing::debug!(path = %path.display(), "Loaded settings file");
        Ok(config)
    }

    /// Loads `path` if given, else `stackcheck.yml` under `base_dir` when it
    /// exists, else the defaults rooted at `base_dir`
    pub fn discover(path: Option<&Path>, base_dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let candidate = base_dir.join(DEFAULT_SETTINGS_FILE);
        if candidate.is_file() {
            return Self::load(&candidate);
        }

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            ..Self::default()
        })
    }

    /// Rejects settings no run can work with
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.compose_command.iter().all(|part| part.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                key: "compose_command",
                reason: "must name a program".to_string(),
            });
        }
        if self.container_command.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "container_command",
                reason: "must name a program".to_string(),
            });
        }
        if self.readiness_poll_secs == Some(0) {
            return Err(ConfigError::Invalid {
                key: "readiness_poll_secs",
                reason: "must be positive".to_string(),
            });
        }
        for (key, value) in [
            ("start_timeout_secs", self.start_timeout_secs),
            ("teardown_timeout_secs", self.teardown_timeout_secs),
            ("query_timeout_secs", self.query_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be positive".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resolves a path against `base_dir`
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Grace period between `up` and sampling
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    /// Readiness poll interval, if polling is enabled
    #[must_use]
    pub fn readiness_poll(&self) -> Option<Duration> {
        self.readiness_poll_secs.map(Duration::from_secs)
    }

    /// Timeout for `up`
    #[must_use]
    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    /// Timeout for `down`
    #[must_use]
    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_secs(self.teardown_timeout_secs)
    }

    /// Timeout for read-only compose queries
    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}
