//! Command execution traits
//!
//! Every external program the engine drives goes through [`CommandRunner`],
//! so the whole validate/test/cleanup pipeline can run against a scripted
//! runner in tests.

use crate::stack::ExecError;
use std::path::PathBuf;
use std::time::Duration;

/// Trait for running external commands
#[allow(clippy::missing_errors_doc)]
pub trait CommandRunner: Send + Sync {
    /// Runs a command to completion, timeout or interruption
    ///
    /// Returns `Err` only when no exit status could be obtained at all, e.g.
    /// the program is not installed.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError>;
}

/// An external command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory (inherited when `None`)
    pub cwd: Option<PathBuf>,
    /// Maximum run time (None = no timeout)
    pub timeout: Option<Duration>,
    /// Whether an interrupt may kill the command
    pub interruptible: bool,
}

impl CommandSpec {
    /// Creates a new interruptible command without timeout
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout: None,
            interruptible: true,
        }
    }

    /// Appends an argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Sets the timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Marks the command as one that must run to completion even after an
    /// interrupt (teardown)
    #[must_use]
    pub fn uninterruptible(mut self) -> Self {
        self.interruptible = false;
        self
    }

    /// Returns true if the program or any argument equals `token`
    #[must_use]
    pub fn has_token(&self, token: &str) -> bool {
        self.program == token || self.args.iter().any(|arg| arg == token)
    }

    /// Shell-quoted command line, for logs and diagnostics
    #[must_use]
    pub fn display(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(self.args.iter()))
    }
}

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The process exited by itself
    Exited,
    /// The process was killed after exceeding its timeout
    TimedOut,
    /// The process was killed because the run was interrupted
    Interrupted,
    /// The process could not be started
    NotStarted,
}

/// Result of a command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Exit code (-1 when the process did not exit by itself)
    pub exit_code: i32,

    /// Duration of execution
    pub duration: Duration,

    /// How the process ended
    pub termination: Termination,
}

impl CommandOutput {
    /// Creates the output of a process that exited by itself
    #[must_use]
    pub fn exited(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            duration: Duration::ZERO,
            termination: Termination::Exited,
        }
    }

    /// Creates the output of a killed process
    #[must_use]
    pub fn killed(termination: Termination, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: -1,
            duration: Duration::ZERO,
            termination,
        }
    }

    /// Folds a start failure into an output so callers can treat it like any
    /// other failed command
    #[must_use]
    pub fn from_error(err: &ExecError) -> Self {
        Self::killed(Termination::NotStarted, err.to_string())
    }

    /// Returns true if command succeeded (exit code 0)
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.termination == Termination::Exited && self.exit_code == 0
    }

    /// Returns true if command failed
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// Non-empty stdout lines, trimmed
    pub fn stdout_lines(&self) -> impl Iterator<Item = &str> {
        non_empty_lines(&self.stdout)
    }

    /// Non-empty stderr lines, verbatim apart from the line terminator
    pub fn stderr_lines(&self) -> impl Iterator<Item = &str> {
        self.stderr.lines().filter(|line| !line.trim().is_empty())
    }

    /// One-line description of why the command failed
    #[must_use]
    pub fn failure_reason(&self) -> String {
        match self.termination {
            Termination::Exited => format!("exit code {}", self.exit_code),
            Termination::TimedOut => "timed out".to_string(),
            Termination::Interrupted => "interrupted".to_string(),
            Termination::NotStarted => "could not be started".to_string(),
        }
    }
}

fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}
