//! stackcheck - validate and smoke-test a directory of compose stacks
//!
//! ## Commands
//!
//! - `stackcheck validate` - Check compose syntax and service consistency
//! - `stackcheck test` - Bring each stack up, count running services, tear down
//! - `stackcheck cleanup` - Tear down every stack and purge caches
//! - `stackcheck report` - Validate, test and write a report
//! - `stackcheck all` - Cleanup, then report
//! - `stackcheck completions` - Generate shell completions
//!
//! ## Layout
//!
//! ```text
//! .config/<stack>/config.yml
//! .compose/<stack>/docker-compose.yml
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Check every stack
//! stackcheck validate
//!
//! # Smoke-test two stacks with a longer grace period
//! stackcheck test --stack basic-stack --stack mcp --grace-period 30
//!
//! # Full run with a JSON report
//! stackcheck all --format json
//! ```
//!
//! Exit status is 0 when every check passed, 1 when any failed and 130 when
//! interrupted.

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
