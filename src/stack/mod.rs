//! Stack domain types
//!
//! Descriptors, the registry that discovers them, the result records every
//! stage produces, and the error types.

pub mod errors;
pub mod registry;
pub mod types;

#[cfg(test)]
mod types_tests;

pub use errors::{ConfigError, ExecError, RegistryError, StackError};
pub use registry::{StackDescriptor, StackRegistry};
pub use types::{
    DeploymentStatus, DeploymentTestResult, StackIssue, ValidationResult, ValidationStage,
};
