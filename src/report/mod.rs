//! Report aggregation
//!
//! A [`Report`] is a snapshot of the validation and deployment results of one
//! run. The summary is always computed from the entries, never stored.

mod render;

pub use render::render;

use crate::infrastructure::ToolVersions;
use crate::stack::{DeploymentTestResult, StackError, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Output format of a rendered report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Symbol lines for a terminal
    Console,
    /// Markdown document, the default file format
    #[default]
    Markdown,
    /// JSON document including the computed summary
    Json,
}

impl ReportFormat {
    /// File extension used when writing this format
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Console => "txt",
            Self::Markdown => "md",
            Self::Json => "json",
        }
    }
}

/// Pass/fail counts over every result entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Validation entries plus test entries
    pub total: usize,
    /// Passed validations plus successful tests
    pub passed: usize,
    /// Everything else
    pub failed: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checks, {} passed, {} failed",
            self.total, self.passed, self.failed
        )
    }
}

/// Aggregated results of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Creation time
    pub generated_at: DateTime<Utc>,
    /// One entry per validated stack
    pub validation_results: Vec<ValidationResult>,
    /// One entry per deployment-tested stack
    pub test_results: Vec<DeploymentTestResult>,
    /// Container tooling versions, when probed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_versions: Option<ToolVersions>,
}

impl Report {
    /// Recomputes the summary from the entries
    #[must_use]
    pub fn summary(&self) -> Summary {
        let passed = self.validation_results.iter().filter(|r| r.passed).count()
            + self
                .test_results
                .iter()
                .filter(|r| r.status.is_success())
                .count();
        let total = self.validation_results.len() + self.test_results.len();

        Summary {
            total,
            passed,
            failed: total - passed,
        }
    }

    /// Returns true if nothing failed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.summary().failed == 0
    }

    /// Attaches tool versions for the system information section
    #[must_use]
    pub fn with_tool_versions(mut self, versions: ToolVersions) -> Self {
        self.tool_versions = Some(versions);
        self
    }
}

/// Builds a report stamped with the current time
#[must_use]
pub fn aggregate(
    validation_results: &[ValidationResult],
    test_results: &[DeploymentTestResult],
) -> Report {
    aggregate_at(validation_results, test_results, Utc::now())
}

/// Builds a report with an explicit timestamp
#[must_use]
pub fn aggregate_at(
    validation_results: &[ValidationResult],
    test_results: &[DeploymentTestResult],
    generated_at: DateTime<Utc>,
) -> Report {
    Report {
        generated_at,
        validation_results: validation_results.to_vec(),
        test_results: test_results.to_vec(),
        tool_versions: None,
    }
}

/// File name of a report written at the report's timestamp
#[must_use]
pub fn file_name(report: &Report, format: ReportFormat) -> String {
    format!(
        "stack-report-{}.{}",
        report.generated_at.format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}

/// Renders and writes the report into `dir`, creating it if needed
///
/// # Errors
///
/// Returns `StackError::Io` if the directory or file cannot be written.
pub fn write_report(
    report: &Report,
    dir: &Path,
    format: ReportFormat,
) -> Result<PathBuf, StackError> {
    std::fs::create_dir_all(dir).map_err(|source| StackError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(file_name(report, format));
    std::fs::write(&path, render(report, format)).map_err(|source| StackError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::info!(path = %path.display(), "Report written");
    Ok(path)
}
