//! Command execution layer
//!
//! This module contains the runner trait and its implementations.

mod interrupt;
mod process;
mod scripted;
mod traits;

pub use interrupt::Interrupt;
pub use process::ProcessRunner;
pub use scripted::{Reply, ScriptedRunner};
pub use traits::{CommandOutput, CommandRunner, CommandSpec, Termination};
