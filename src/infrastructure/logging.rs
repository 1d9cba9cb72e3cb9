//! Logging configuration
//!
//! Initializes tracing for the application. Logs go to stderr; stdout is
//! reserved for stage results and rendered reports.

/// Initializes logging with the specified level
///
/// `RUST_LOG` takes precedence when set. Calling this more than once is a
/// no-op.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .try_init();
}

/// Log level for the given verbosity flag and configured default
#[must_use]
pub fn effective_level(verbose: bool, configured: &str) -> &str {
    if verbose { "debug" } else { configured }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging() {
        // Just verify it doesn't panic, twice
        init_logging("debug");
        init_logging("info");
    }

    #[test]
    fn test_effective_level() {
        assert_eq!(effective_level(true, "warn"), "debug");
        assert_eq!(effective_level(false, "warn"), "warn");
    }
}
