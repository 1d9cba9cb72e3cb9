//! Deployment test runner
//!
//! Brings one stack up, waits for it to settle, counts the running services
//! and tears it down again. Teardown is issued exactly once on every path,
//! including start failures and interruption.

use crate::executor::{CommandOutput, Interrupt};
use crate::infrastructure::compose::count_lines;
use crate::infrastructure::{ComposeCli, Config};
use crate::stack::{DeploymentStatus, DeploymentTestResult, StackDescriptor};
use std::fmt;
use std::time::{Duration, Instant};

/// Lifecycle of a single stack test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing issued yet
    NotStarted,
    /// `up -d` in flight
    Starting,
    /// Waiting for containers to settle
    GracePeriod,
    /// Counting declared and running services
    Evaluating,
    /// `down` in flight
    TearingDown,
    /// Torn down after a completed evaluation
    Done,
    /// Torn down after a start failure or interruption
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Starting => "starting",
            Self::GracePeriod => "grace period",
            Self::Evaluating => "evaluating",
            Self::TearingDown => "tearing down",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs the up/sample/down cycle for stacks
pub struct DeploymentTester<'a> {
    compose: &'a ComposeCli<'a>,
    interrupt: &'a Interrupt,
    grace_period: Duration,
    poll_interval: Option<Duration>,
}

impl<'a> DeploymentTester<'a> {
    /// Creates a tester with a fixed grace period and no readiness polling
    #[must_use]
    pub fn new(
        compose: &'a ComposeCli<'a>,
        interrupt: &'a Interrupt,
        grace_period: Duration,
    ) -> Self {
        Self {
            compose,
            interrupt,
            grace_period,
            poll_interval: None,
        }
    }

    /// Creates a tester from the settings' grace period and poll interval
    #[must_use]
    pub fn from_config(
        compose: &'a ComposeCli<'a>,
        interrupt: &'a Interrupt,
        config: &Config,
    ) -> Self {
        Self::new(compose, interrupt, config.grace_period())
            .with_poll_interval(config.readiness_poll())
    }

    /// Samples running services every `interval` during the grace period
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval.filter(|i| !i.is_zero());
        self
    }

    /// Tests one stack
    pub fn test_stack(&self, stack: &StackDescriptor) -> DeploymentTestResult {
        let started = Instant::now();
        let mut run = Run::new(stack);

        run.enter(Phase::Starting);
        let up = self.compose.up(stack);
        let evaluated = if up.is_success() {
            run.enter(Phase::GracePeriod);
            if self.settle(stack) {
                run.enter(Phase::Evaluating);
                self.evaluate(stack, &mut run);
                true
            } else {
                run.note("Interrupted during grace period");
                false
            }
        } else {
            run.command_failed("up", &up);
            false
        };

        run.enter(Phase::TearingDown);
        let down = self.compose.down(stack);
        let teardown_succeeded = down.is_success();
        if !teardown_succeeded {
            tracing::warn!(
                stack = %stack.name,
                reason = %down.failure_reason(),
                "Teardown failed"
            );
            run.command_failed("down", &down);
        }

        run.enter(if evaluated { Phase::Done } else { Phase::Failed });
        let status = run.status.after_teardown(teardown_succeeded);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            stack = %stack.name,
            status = %status,
            expected = run.expected,
            up = run.up,
            duration_ms,
            "Deployment test finished"
        );

        DeploymentTestResult {
            stack: stack.name.clone(),
            services_expected: run.expected,
            services_up: run.up,
            status,
            duration_ms,
            teardown_succeeded,
            messages: run.messages,
        }
    }

    /// Waits out the grace period; returns false if interrupted
    fn settle(&self, stack: &StackDescriptor) -> bool {
        let Some(interval) = self.poll_interval else {
            return self.interrupt.sleep(self.grace_period);
        };

        let expected = self.compose.services(stack);
        if expected.is_failure() || count_lines(&expected) == 0 {
            return self.interrupt.sleep(self.grace_period);
        }
        let expected = count_lines(&expected);

        let deadline = Instant::now() + self.grace_period;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            if !self.interrupt.sleep(interval.min(remaining)) {
                return false;
            }
            let running = self.compose.running_services(stack);
            if running.is_success() && count_lines(&running) >= expected {
                tracing::debug!(stack = %stack.name, expected, "All services running early");
                return true;
            }
        }
    }

    fn evaluate(&self, stack: &StackDescriptor, run: &mut Run) {
        let declared = self.compose.services(stack);
        if declared.is_failure() {
            run.command_failed("config --services", &declared);
            return;
        }
        run.expected = count_lines(&declared);

        let running = self.compose.running_services(stack);
        if running.is_failure() {
            run.command_failed("ps", &running);
            return;
        }
        run.up = count_lines(&running);
        run.status = DeploymentStatus::classify(run.expected, run.up);

        if run.expected == 0 {
            run.note("Compose file declares no services");
        } else if run.up < run.expected {
            run.note(format!("{}/{} services running", run.up, run.expected));
        }
    }
}

/// Mutable state of one test in progress
struct Run<'s> {
    stack: &'s str,
    phase: Phase,
    status: DeploymentStatus,
    expected: u32,
    up: u32,
    messages: Vec<String>,
}

impl<'s> Run<'s> {
    fn new(stack: &'s StackDescriptor) -> Self {
        Self {
            stack: &stack.name,
            phase: Phase::NotStarted,
            status: DeploymentStatus::DeploymentFailed,
            expected: 0,
            up: 0,
            messages: Vec::new(),
        }
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!(stack = %self.stack, from = %self.phase, to = %phase, "Phase change");
        self.phase = phase;
    }

    fn note(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    fn command_failed(&mut self, what: &str, output: &CommandOutput) {
        self.note(format!("{what} failed: {}", output.failure_reason()));
        self.messages
            .extend(output.stderr_lines().map(str::to_string));
    }
}
