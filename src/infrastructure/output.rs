//! User-facing output
//!
//! Stage results are printed through [`UserOutput`] rather than `println!`
//! so tests can capture them and logs (stderr) stay separate from the
//! symbol lines (stdout).

use parking_lot::Mutex;

/// Pass symbol
pub const PASS: &str = "✓";
/// Failure symbol
pub const FAIL: &str = "✗";
/// Warning symbol
pub const WARN: &str = "⚠";

/// Abstraction over user-facing output
pub trait UserOutput: Send + Sync {
    /// Section heading or plain informational line
    fn status(&self, message: &str);

    /// Passed check, prefixed with ✓
    fn success(&self, message: &str);

    /// Advisory problem, prefixed with ⚠
    fn warning(&self, message: &str);

    /// Failed check, prefixed with ✗
    fn failure(&self, message: &str);

    /// Indented diagnostic under the previous line
    fn detail(&self, message: &str);

    /// A blank line separator
    fn blank(&self);
}

/// Standard CLI output on stdout
pub struct ConsoleOutput;

impl UserOutput for ConsoleOutput {
    fn status(&self, message: &str) {
        println!("{message}");
    }

    fn success(&self, message: &str) {
        println!("{PASS} {message}");
    }

    fn warning(&self, message: &str) {
        println!("{WARN} {message}");
    }

    fn failure(&self, message: &str) {
        println!("{FAIL} {message}");
    }

    fn detail(&self, message: &str) {
        println!("    {message}");
    }

    fn blank(&self) {
        println!();
    }
}

/// Suppresses all output
pub struct QuietOutput;

impl UserOutput for QuietOutput {
    fn status(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn failure(&self, _message: &str) {}
    fn detail(&self, _message: &str) {}
    fn blank(&self) {}
}

/// Keeps every line in memory, formatted as [`ConsoleOutput`] would print it
#[derive(Default)]
pub struct CapturedOutput {
    lines: Mutex<Vec<String>>,
}

impl CapturedOutput {
    /// Creates an empty capture
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured lines
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Returns true if any captured line contains `needle`
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }

    fn push(&self, line: String) {
        self.lines.lock().push(line);
    }
}

impl UserOutput for CapturedOutput {
    fn status(&self, message: &str) {
        self.push(message.to_string());
    }

    fn success(&self, message: &str) {
        self.push(format!("{PASS} {message}"));
    }

    fn warning(&self, message: &str) {
        self.push(format!("{WARN} {message}"));
    }

    fn failure(&self, message: &str) {
        self.push(format!("{FAIL} {message}"));
    }

    fn detail(&self, message: &str) {
        self.push(format!("    {message}"));
    }

    fn blank(&self) {
        self.push(String::new());
    }
}
