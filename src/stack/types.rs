//! Result records produced by the validation and deployment stages
//!
//! Records are created once per stack per run and never mutated afterwards;
//! the orchestrator owns the lists and hands them to the report aggregator.

#![allow(clippy::must_use_candidate)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Validation stage reached for a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    /// Compose descriptor syntax check
    SyntaxCheck,
    /// Config/compose service cross-reference
    ServiceConsistency,
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyntaxCheck => write!(f, "syntax check"),
            Self::ServiceConsistency => write!(f, "service consistency"),
        }
    }
}

/// Why a stack failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackIssue {
    /// Config or compose file is missing
    ConfigMissing,
    /// The container CLI rejected the compose descriptor
    ComposeSyntaxInvalid,
    /// One side of the service cross-reference declared nothing
    ServiceConsistencyWarning,
}

impl StackIssue {
    /// Returns true if the stack must be excluded from deployment testing
    pub fn blocks_deployment(self) -> bool {
        matches!(self, Self::ConfigMissing | Self::ComposeSyntaxInvalid)
    }

    /// Returns true if the issue is advisory
    pub fn is_warning(self) -> bool {
        matches!(self, Self::ServiceConsistencyWarning)
    }
}

impl fmt::Display for StackIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigMissing => write!(f, "config missing"),
            Self::ComposeSyntaxInvalid => write!(f, "compose syntax invalid"),
            Self::ServiceConsistencyWarning => write!(f, "service consistency warning"),
        }
    }
}

/// Outcome of validating one stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Stack name
    pub stack: String,
    /// Last stage reached
    pub stage: ValidationStage,
    /// Whether the stage passed
    pub passed: bool,
    /// Diagnostic lines, in the order they were produced
    pub messages: Vec<String>,
    /// Failure classification, `None` when passed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub issue: Option<StackIssue>,
}

impl ValidationResult {
    /// Creates a passing result
    pub fn pass(stack: impl Into<String>, stage: ValidationStage, messages: Vec<String>) -> Self {
        Self {
            stack: stack.into(),
            stage,
            passed: true,
            messages,
            issue: None,
        }
    }

    /// Creates a failing result
    pub fn fail(
        stack: impl Into<String>,
        stage: ValidationStage,
        issue: StackIssue,
        messages: Vec<String>,
    ) -> Self {
        Self {
            stack: stack.into(),
            stage,
            passed: false,
            messages,
            issue: Some(issue),
        }
    }

    /// Creates the result recorded for a stack whose files are absent
    pub fn config_missing(stack: impl Into<String>, missing: &[&Path]) -> Self {
        let messages = missing
            .iter()
            .map(|path| format!("File not found: {}", path.display()))
            .collect();
        Self::fail(
            stack,
            ValidationStage::SyntaxCheck,
            StackIssue::ConfigMissing,
            messages,
        )
    }

    /// Returns true if the stack may proceed to deployment testing
    pub fn allows_deployment(&self) -> bool {
        !self.issue.is_some_and(StackIssue::blocks_deployment)
    }
}

/// Outcome of a deployment smoke test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Every declared service was running
    Success,
    /// Some, but not all, declared services were running
    PartialFailure,
    /// The stack could not be started or nothing was running
    DeploymentFailed,
    /// Deployment succeeded but teardown failed
    CleanupFailed,
}

impl DeploymentStatus {
    /// Classifies a running-service sample
    pub fn classify(services_expected: u32, services_up: u32) -> Self {
        if services_expected == 0 || services_up == 0 {
            Self::DeploymentFailed
        } else if services_up >= services_expected {
            Self::Success
        } else {
            Self::PartialFailure
        }
    }

    /// Folds the teardown outcome into the status
    ///
    /// A failed teardown only replaces `Success`; a failed deployment stays
    /// the more severe condition.
    #[must_use]
    pub fn after_teardown(self, teardown_succeeded: bool) -> Self {
        match self {
            Self::Success if !teardown_succeeded => Self::CleanupFailed,
            other => other,
        }
    }

    /// Returns true if status is `Success`
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::PartialFailure => write!(f, "PARTIAL_FAILURE"),
            Self::DeploymentFailed => write!(f, "DEPLOYMENT_FAILED"),
            Self::CleanupFailed => write!(f, "CLEANUP_FAILED"),
        }
    }
}

/// Outcome of bringing one stack up and down
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTestResult {
    /// Stack name
    pub stack: String,
    /// Services declared by the compose descriptor
    pub services_expected: u32,
    /// Services found running after the grace period
    pub services_up: u32,
    /// Final status
    pub status: DeploymentStatus,
    /// Wall time from start to end of teardown
    pub duration_ms: u64,
    /// Whether `down` succeeded
    pub teardown_succeeded: bool,
    /// Diagnostic lines
    #[serde(default)]
    pub messages: Vec<String>,
}
