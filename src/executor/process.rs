//! Process execution
//!
//! Runs external programs with captured output, an optional timeout, and
//! cooperative interruption. Output is read on helper threads so a chatty
//! child cannot block on a full pipe while we poll for its exit.

use super::interrupt::Interrupt;
use super::traits::{CommandOutput, CommandRunner, CommandSpec, Termination};
use crate::stack::ExecError;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// How long to wait for pipe readers after killing a child. Grandchildren
/// (e.g. the compose plugin behind `docker`) can keep the pipes open.
const READER_GRACE: Duration = Duration::from_secs(2);

/// Runs commands as child processes of this one
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    interrupt: Interrupt,
    poll_interval: Duration,
}

impl ProcessRunner {
    /// Creates a runner observing the given interrupt flag
    #[must_use]
    pub fn new(interrupt: Interrupt) -> Self {
        Self {
            interrupt,
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Sets how often the child is polled for exit
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn wait(
        &self,
        child: &mut Child,
        spec: &CommandSpec,
        start: Instant,
    ) -> Result<(Termination, i32), ExecError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok((Termination::Exited, status.code().unwrap_or(-1))),
                Ok(None) => {}
                Err(e) => {
                    return Err(ExecError::Wait {
                        program: spec.program.clone(),
                        reason: e.to_string(),
                    });
                }
            }

            let killed = if spec.timeout.is_some_and(|timeout| start.elapsed() >= timeout) {
                Some(Termination::TimedOut)
            } else if spec.interruptible && self.interrupt.is_raised() {
                Some(Termination::Interrupted)
            } else {
                None
            };

            if let Some(termination) = killed {
                let _ = child.kill();
                let _ = child.wait();
                return Ok((termination, -1));
            }

            std::thread::sleep(self.poll_interval);
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Interrupt::new())
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(command = %spec.display(), "Executing command");

        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| ExecError::spawn(&spec.program, &e))?;

        let stdout_rx = spawn_reader(child.stdout.take());
        let stderr_rx = spawn_reader(child.stderr.take());

        let (termination, exit_code) = self.wait(&mut child, spec, start)?;

        let reader_wait = if termination == Termination::Exited {
            None
        } else {
            Some(READER_GRACE)
        };
        let stdout = collect(&stdout_rx, reader_wait);
        let mut stderr = collect(&stderr_rx, reader_wait);

        match termination {
            Termination::TimedOut => {
                let timeout = spec.timeout.unwrap_or_default();
                tracing::warn!(command = %spec.display(), "Command timed out after {:?}", timeout);
                stderr.push_str(&format!("Command timed out after {}s\n", timeout.as_secs()));
            }
            Termination::Interrupted => {
                tracing::warn!(command = %spec.display(), "Command interrupted");
                stderr.push_str("Command interrupted\n");
            }
            Termination::Exited | Termination::NotStarted => {}
        }

        let duration = start.elapsed();
        tracing::debug!(
            command = %spec.display(),
            exit_code,
            duration_ms = duration.as_millis(),
            "Command finished"
        );

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
            duration,
            termination,
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

fn collect(rx: &mpsc::Receiver<String>, wait: Option<Duration>) -> String {
    match wait {
        None => rx.recv().unwrap_or_default(),
        Some(timeout) => rx.recv_timeout(timeout).unwrap_or_default(),
    }
}
