//! Scripted command runner
//!
//! Answers commands from a list of token rules instead of spawning processes,
//! and records every call. Used by the test suites to drive the validate,
//! test and cleanup flows without a container runtime.

use super::traits::{CommandOutput, CommandRunner, CommandSpec, Termination};
use crate::stack::ExecError;
use parking_lot::Mutex;

/// Canned answer for a matched command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The process exits with the given code and output
    Exit {
        /// Exit code
        code: i32,
        /// Standard output
        stdout: String,
        /// Standard error
        stderr: String,
    },
    /// The process exceeds its timeout
    Timeout,
    /// The process is killed by an interrupt
    Interrupted,
    /// The program is not installed
    NotFound,
}

impl Reply {
    /// Exit code 0 with the given stdout
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self::Exit {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Non-zero exit with the given stderr
    #[must_use]
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self::Exit {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Rule {
    tokens: Vec<String>,
    reply: Reply,
}

/// A [`CommandRunner`] answering from rules
///
/// A rule matches when every one of its tokens equals the program or one of
/// the arguments. Rules are tried in insertion order; unmatched commands get
/// the fallback reply (success with empty output unless changed).
#[derive(Debug)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    fallback: Reply,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    /// Creates a runner where every command succeeds silently
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Reply::success(""),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Adds a rule
    #[must_use]
    pub fn on(mut self, tokens: &[&str], reply: Reply) -> Self {
        self.rules.push(Rule {
            tokens: tokens.iter().map(ToString::to_string).collect(),
            reply,
        });
        self
    }

    /// Sets the reply for commands no rule matches
    #[must_use]
    pub fn fallback(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    /// Every command run so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }

    /// Number of recorded commands containing all of `tokens`
    #[must_use]
    pub fn count(&self, tokens: &[&str]) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|spec| tokens.iter().all(|token| spec.has_token(token)))
            .count()
    }

    /// Forgets recorded calls
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn reply_for(&self, spec: &CommandSpec) -> &Reply {
        self.rules
            .iter()
            .find(|rule| rule.tokens.iter().all(|token| spec.has_token(token)))
            .map_or(&self.fallback, |rule| &rule.reply)
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        self.calls.lock().push(spec.clone());
        tracing::trace!(command = %spec.display(), "Scripted command");

        match self.reply_for(spec) {
            Reply::Exit {
                code,
                stdout,
                stderr,
            } => Ok(CommandOutput::exited(*code, stdout.clone(), stderr.clone())),
            Reply::Timeout => Ok(CommandOutput::killed(
                Termination::TimedOut,
                format!(
                    "Command timed out after {}s",
                    spec.timeout.unwrap_or_default().as_secs()
                ),
            )),
            Reply::Interrupted => Ok(CommandOutput::killed(
                Termination::Interrupted,
                "Command interrupted",
            )),
            Reply::NotFound => Err(ExecError::Spawn {
                program: spec.program.clone(),
                reason: "No such file or directory (os error 2)".to_string(),
                not_found: true,
            }),
        }
    }
}
