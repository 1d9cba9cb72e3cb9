//! # stackcheck - compose stack validation and deployment smoke tests
//!
//! Walks a directory of stacks, each made of a declarative config
//! (`.config/<stack>/config.yml`) and a compose descriptor
//! (`.compose/<stack>/docker-compose.yml`), and for each one:
//!
//! 1. checks the compose syntax with `docker compose config`,
//! 2. cross-references the services both files declare,
//! 3. brings the stack up, counts running services and tears it down,
//! 4. aggregates everything into a console, Markdown or JSON report.
//!
//! Every external command goes through [`executor::CommandRunner`], so the
//! whole flow runs against [`executor::ScriptedRunner`] in tests.
//!
//! ## License
//!
//! Licensed under either of
//! - Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <https://www.apache.org/licenses/LICENSE-2.0>)
//! - MIT license ([LICENSE-MIT](LICENSE-MIT) or <https://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod deployment;
pub mod executor;
pub mod infrastructure;
pub mod orchestrator;
pub mod report;
pub mod stack;
pub mod validation;

pub use deployment::{DeploymentTester, Phase};
pub use executor::{CommandOutput, CommandRunner, CommandSpec, Interrupt, ProcessRunner};
pub use infrastructure::{ComposeCli, Config, ConsoleOutput, UserOutput};
pub use orchestrator::{Command, Orchestrator, RunOutcome};
pub use report::{Report, ReportFormat, Summary, aggregate, render, write_report};
pub use stack::{
    DeploymentStatus, DeploymentTestResult, StackDescriptor, StackError, StackIssue,
    StackRegistry, ValidationResult, ValidationStage,
};
pub use validation::ConfigValidator;

/// Version of the stackcheck crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
