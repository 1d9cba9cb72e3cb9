//! Infrastructure layer
//!
//! This module contains external integrations and adapters.

pub mod compose;
mod config;
mod logging;
pub mod output;

pub use compose::{ComposeCli, ToolVersions};
pub use config::{Config, DEFAULT_SETTINGS_FILE};
pub use logging::{effective_level, init_logging};
pub use output::{CapturedOutput, ConsoleOutput, QuietOutput, UserOutput};
