//! Config validator
//!
//! Per stack: a compose syntax check through the container CLI, then the
//! service cross-reference against the stack's declarative config. A syntax
//! failure ends validation for that stack and keeps it out of deployment
//! testing; a cross-reference failure is advisory.

pub mod consistency;

use crate::executor::Termination;
use crate::infrastructure::ComposeCli;
use crate::stack::{StackDescriptor, StackIssue, ValidationResult, ValidationStage};
use serde_yaml::Value;

/// Outcome of `compose config`
enum Syntax {
    /// Resolved document on stdout
    Valid(String),
    Invalid(ValidationResult),
    /// Killed by an interrupt, so nothing is known about the descriptor
    Interrupted,
}

/// Validates stacks against the container CLI
///
/// Every check returns `None` when the run was interrupted while the
/// compose CLI was still working, so no verdict is recorded for the stack.
pub struct ConfigValidator<'a> {
    compose: &'a ComposeCli<'a>,
}

impl<'a> ConfigValidator<'a> {
    /// Creates a validator
    #[must_use]
    pub fn new(compose: &'a ComposeCli<'a>) -> Self {
        Self { compose }
    }

    /// Runs `compose config` against the stack's descriptor
    #[must_use]
    pub fn check_syntax(&self, stack: &StackDescriptor) -> Option<ValidationResult> {
        match self.syntax(stack) {
            Syntax::Valid(_) => Some(ValidationResult::pass(
                &stack.name,
                ValidationStage::SyntaxCheck,
                vec![],
            )),
            Syntax::Invalid(result) => Some(result),
            Syntax::Interrupted => None,
        }
    }

    /// Cross-references declared services
    ///
    /// Resolves the compose file itself; a descriptor the CLI rejects
    /// counts as declaring no services.
    #[must_use]
    pub fn check_service_consistency(&self, stack: &StackDescriptor) -> Option<ValidationResult> {
        match self.syntax(stack) {
            Syntax::Valid(resolved) => Some(self.consistency(stack, &resolved)),
            Syntax::Invalid(_) => Some(self.consistency(stack, "")),
            Syntax::Interrupted => None,
        }
    }

    /// Full validation of one stack, producing at most one result
    #[must_use]
    pub fn validate_stack(&self, stack: &StackDescriptor) -> Option<ValidationResult> {
        if let Some(missing) = stack.check_presence() {
            tracing::warn!(stack = %stack.name, "Stack files missing");
            return Some(missing);
        }

        match self.syntax(stack) {
            Syntax::Valid(resolved) => Some(self.consistency(stack, &resolved)),
            Syntax::Invalid(result) => Some(result),
            Syntax::Interrupted => None,
        }
    }

    fn syntax(&self, stack: &StackDescriptor) -> Syntax {
        let output = self.compose.config(stack);

        if output.is_success() {
            tracing::debug!(stack = %stack.name, "Compose syntax valid");
            return Syntax::Valid(output.stdout);
        }
        if output.termination == Termination::Interrupted {
            tracing::info!(stack = %stack.name, "Syntax check interrupted");
            return Syntax::Interrupted;
        }

        let mut messages: Vec<String> = output.stderr_lines().map(str::to_string).collect();
        if messages.is_empty() {
            messages.push(format!("compose config failed: {}", output.failure_reason()));
        }
        tracing::warn!(
            stack = %stack.name,
            reason = %output.failure_reason(),
            "Compose syntax invalid"
        );

        Syntax::Invalid(ValidationResult::fail(
            &stack.name,
            ValidationStage::SyntaxCheck,
            StackIssue::ComposeSyntaxInvalid,
            messages,
        ))
    }

    fn consistency(&self, stack: &StackDescriptor, resolved: &str) -> ValidationResult {
        let stage = ValidationStage::ServiceConsistency;
        let warning = |messages| {
            ValidationResult::fail(
                &stack.name,
                stage,
                StackIssue::ServiceConsistencyWarning,
                messages,
            )
        };

        let config_doc = match std::fs::read_to_string(&stack.config_path) {
            Ok(text) => match serde_yaml::from_str::<Value>(&text) {
                Ok(doc) => doc,
                Err(e) => return warning(vec![format!("Config file is not valid YAML: {e}")]),
            },
            Err(e) => {
                return warning(vec![format!(
                    "Cannot read {}: {e}",
                    stack.config_path.display()
                )]);
            }
        };

        let compose_doc = if resolved.trim().is_empty() {
            Value::Null
        } else {
            match serde_yaml::from_str::<Value>(resolved) {
                Ok(doc) => doc,
                Err(e) => {
                    return warning(vec![format!("Resolved compose output is not YAML: {e}")]);
                }
            }
        };

        let verdict = consistency::cross_reference(&config_doc, &compose_doc);
        if verdict.passed {
            tracing::debug!(stack = %stack.name, "Service consistency passed");
            ValidationResult::pass(&stack.name, stage, verdict.messages)
        } else {
            tracing::warn!(stack = %stack.name, "Service consistency failed");
            warning(verdict.messages)
        }
    }
}
