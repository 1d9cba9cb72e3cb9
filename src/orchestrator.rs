//! Orchestrator
//!
//! Sequences registry, validator, deployment tester and report aggregator
//! for each top-level command. Stacks are processed one at a time in
//! registry order; every stack is evaluated before the exit code is decided.

use crate::deployment::DeploymentTester;
use crate::executor::{CommandRunner, Interrupt};
use crate::infrastructure::{ComposeCli, Config, UserOutput};
use crate::report::{self, Report, ReportFormat};
use crate::stack::{
    DeploymentStatus, DeploymentTestResult, StackDescriptor, StackError, StackRegistry,
    ValidationResult,
};
use crate::validation::ConfigValidator;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Top-level commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Syntax and consistency checks
    Validate,
    /// Deployment smoke tests
    Test,
    /// Teardown and cache purge
    Cleanup,
    /// Validate, test and write a report
    Report,
    /// Cleanup followed by report
    All,
}

/// Everything a run collected
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Validation entries in registry order
    pub validation_results: Vec<ValidationResult>,
    /// Deployment entries in registry order
    pub test_results: Vec<DeploymentTestResult>,
    /// Aggregated report, for `report` and `all`
    pub report: Option<Report>,
    /// Where the report was written, if writing succeeded
    pub report_path: Option<PathBuf>,
    /// Whether the run stopped early on a signal
    pub interrupted: bool,
}

impl RunOutcome {
    /// Returns true if any validation failed or any test was not a success
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.validation_results.iter().any(|r| !r.passed)
            || self.test_results.iter().any(|r| !r.status.is_success())
    }

    /// Process exit code: 130 when interrupted, 1 on any failure, else 0
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        if self.interrupted {
            130
        } else if self.has_failures() {
            1
        } else {
            0
        }
    }
}

/// Drives the stages for one invocation
pub struct Orchestrator<'a> {
    config: &'a Config,
    compose: ComposeCli<'a>,
    registry: StackRegistry,
    output: &'a dyn UserOutput,
    interrupt: &'a Interrupt,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator over the given runner and output
    #[must_use]
    pub fn new(
        config: &'a Config,
        runner: &'a dyn CommandRunner,
        output: &'a dyn UserOutput,
        interrupt: &'a Interrupt,
    ) -> Self {
        Self {
            config,
            compose: ComposeCli::new(runner, config),
            registry: StackRegistry::from_config(config),
            output,
            interrupt,
        }
    }

    /// Runs a command
    ///
    /// # Errors
    ///
    /// Returns an error if the stacks cannot be enumerated or the compose
    /// tool is unavailable. `cleanup` never fails.
    pub fn run(&self, command: Command) -> Result<RunOutcome, StackError> {
        tracing::info!(command = ?command, "Starting run");
        match command {
            Command::Validate => self.validate(),
            Command::Test => self.test(),
            Command::Cleanup => Ok(self.cleanup()),
            Command::Report => self.report(),
            Command::All => self.all(),
        }
    }

    /// Validates every stack
    pub fn validate(&self) -> Result<RunOutcome, StackError> {
        self.probe()?;
        let stacks = self.registry.list_stacks()?;

        let mut outcome = RunOutcome::default();
        self.validate_stacks(&stacks, &mut outcome);
        self.print_summary(&outcome);
        Ok(outcome)
    }

    /// Deployment-tests every stack whose files exist
    pub fn test(&self) -> Result<RunOutcome, StackError> {
        self.probe()?;
        let stacks = self.registry.list_stacks()?;

        let mut outcome = RunOutcome::default();
        let mut present = Vec::with_capacity(stacks.len());
        for stack in &stacks {
            match stack.check_presence() {
                Some(missing) => {
                    self.show_validation(&missing);
                    outcome.validation_results.push(missing);
                }
                None => present.push(stack),
            }
        }
        self.test_stacks(&present, &mut outcome);
        self.print_summary(&outcome);
        Ok(outcome)
    }

    /// Best-effort teardown of every stack, cache purge and optional prune
    pub fn cleanup(&self) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        self.output.status("Cleanup");

        if let Err(e) = self.compose.probe() {
            tracing::warn!(error = %e, "Compose tool unavailable during cleanup");
            self.output.warning(&e.to_string());
        }

        match self.registry.list_stacks() {
            Ok(stacks) => {
                for stack in stacks.iter().filter(|s| s.compose_path.is_file()) {
                    if self.interrupt.is_raised() {
                        outcome.interrupted = true;
                        return outcome;
                    }
                    let down = self.compose.down(stack);
                    if down.is_success() {
                        self.output.success(&format!("{}: torn down", stack.name));
                    } else {
                        let reason = down.failure_reason();
                        tracing::warn!(stack = %stack.name, reason = %reason, "Teardown failed");
                        self.output
                            .warning(&format!("{}: teardown failed ({reason})", stack.name));
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot enumerate stacks for cleanup");
                self.output.warning(&e.to_string());
            }
        }

        self.purge_caches();
        if self.config.prune {
            self.prune();
        }

        outcome.interrupted = self.interrupt.is_raised();
        self.output.success("Cleanup completed");
        outcome
    }

    /// Validates, tests the deployable stacks and writes the report
    pub fn report(&self) -> Result<RunOutcome, StackError> {
        self.probe()?;
        let stacks = self.registry.list_stacks()?;

        let mut outcome = RunOutcome::default();
        self.validate_stacks(&stacks, &mut outcome);

        if !outcome.interrupted {
            let blocked: BTreeSet<&str> = outcome
                .validation_results
                .iter()
                .filter(|r| !r.allows_deployment())
                .map(|r| r.stack.as_str())
                .collect();
            let deployable: Vec<&StackDescriptor> = stacks
                .iter()
                .filter(|s| !blocked.contains(s.name.as_str()))
                .collect();
            self.test_stacks(&deployable, &mut outcome);
        }

        let report = report::aggregate(&outcome.validation_results, &outcome.test_results)
            .with_tool_versions(self.compose.versions());

        self.output.blank();
        for line in report::render(&report, ReportFormat::Console).lines() {
            self.output.status(line);
        }

        let dir = self.config.resolve(&self.config.reports_dir);
        match report::write_report(&report, &dir, self.config.report_format) {
            Ok(path) => {
                self.output.status(&format!("Report saved to: {}", path.display()));
                outcome.report_path = Some(path);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Report not written");
                self.output.warning(&format!("Report not written: {e}"));
            }
        }

        outcome.report = Some(report);
        Ok(outcome)
    }

    /// Cleanup, then report
    pub fn all(&self) -> Result<RunOutcome, StackError> {
        let cleaned = self.cleanup();
        if cleaned.interrupted {
            return Ok(cleaned);
        }
        self.output.blank();
        self.report()
    }

    fn probe(&self) -> Result<(), StackError> {
        let version = self.compose.probe()?;
        tracing::debug!(version = %version, "Compose tool available");
        Ok(())
    }

    fn validate_stacks(&self, stacks: &[StackDescriptor], outcome: &mut RunOutcome) {
        let validator = ConfigValidator::new(&self.compose);
        self.output.status(&format!("Validating {} stacks", stacks.len()));

        for stack in stacks {
            if self.interrupt.is_raised() {
                outcome.interrupted = true;
                return;
            }
            let Some(result) = validator.validate_stack(stack) else {
                outcome.interrupted = true;
                return;
            };
            self.show_validation(&result);
            outcome.validation_results.push(result);
        }
        outcome.interrupted |= self.interrupt.is_raised();
    }

    fn test_stacks(&self, stacks: &[&StackDescriptor], outcome: &mut RunOutcome) {
        let tester = DeploymentTester::from_config(&self.compose, self.interrupt, self.config);
        self.output.status(&format!("Testing {} deployments", stacks.len()));

        for stack in stacks {
            if self.interrupt.is_raised() {
                outcome.interrupted = true;
                return;
            }
            let result = tester.test_stack(stack);
            self.show_test(&result);
            outcome.test_results.push(result);
        }
        outcome.interrupted |= self.interrupt.is_raised();
    }

    fn show_validation(&self, result: &ValidationResult) {
        let line = match result.issue {
            None => format!("{}: {} passed", result.stack, result.stage),
            Some(issue) => format!("{}: {issue}", result.stack),
        };
        match result.issue {
            None => self.output.success(&line),
            Some(issue) if issue.is_warning() => self.output.warning(&line),
            Some(_) => self.output.failure(&line),
        }
        for message in &result.messages {
            self.output.detail(message);
        }
    }

    fn show_test(&self, result: &DeploymentTestResult) {
        let line = format!(
            "{}: {} ({}/{} services)",
            result.stack, result.status, result.services_up, result.services_expected
        );
        match result.status {
            DeploymentStatus::Success => self.output.success(&line),
            DeploymentStatus::DeploymentFailed => self.output.failure(&line),
            DeploymentStatus::PartialFailure | DeploymentStatus::CleanupFailed => {
                self.output.warning(&line);
            }
        }
        for message in &result.messages {
            self.output.detail(message);
        }
    }

    fn print_summary(&self, outcome: &RunOutcome) {
        let summary =
            report::aggregate(&outcome.validation_results, &outcome.test_results).summary();
        self.output.blank();
        self.output.status(&format!("Summary: {summary}"));
        if outcome.interrupted {
            self.output.warning("Interrupted; remaining stacks were skipped");
        }
    }

    fn purge_caches(&self) {
        for dir in &self.config.cache_dirs {
            let path = self.config.resolve(dir);
            if !path.exists() {
                continue;
            }
            match std::fs::remove_dir_all(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "Removed cache directory");
                    self.output.success(&format!("Removed {}", path.display()));
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Cannot remove cache directory"
                    );
                    self.output
                        .warning(&format!("Cannot remove {}: {e}", path.display()));
                }
            }
        }
    }

    fn prune(&self) {
        for target in ["system", "volume", "image"] {
            let output = self.compose.container(&[target, "prune", "-f"]);
            if output.is_failure() {
                let detail = output
                    .stderr_lines()
                    .next()
                    .map_or_else(|| output.failure_reason(), str::to_string);
                self.output
                    .warning(&format!("{target} prune failed: {detail}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{CommandOutput, CommandSpec, Reply, ScriptedRunner};
    use crate::infrastructure::{CapturedOutput, QuietOutput};
    use crate::stack::{ExecError, StackIssue};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const COMPOSE: &str = concat!(
        "services:\n",
        "  web:\n    image: nginx\n",
        "  db:\n    image: postgres\n",
        "  cache:\n    image: redis\n",
    );

    fn write_stack(root: &Path, name: &str) {
        let config = root.join(".config").join(name);
        let compose = root.join(".compose").join(name);
        fs::create_dir_all(&config).unwrap();
        fs::create_dir_all(&compose).unwrap();
        fs::write(
            config.join("config.yml"),
            "services:\n  web: {}\n  db: {}\n  cache: {}\n",
        )
        .unwrap();
        fs::write(compose.join("docker-compose.yml"), COMPOSE).unwrap();
    }

    fn config_for(root: &Path) -> Config {
        Config {
            base_dir: root.to_path_buf(),
            grace_period_secs: 0,
            ..Config::default()
        }
    }

    fn scenario_runner() -> ScriptedRunner {
        ScriptedRunner::new()
            .on(
                &["cluster-example", "config"],
                Reply::failure(15, "yaml: line 4: did not find expected key"),
            )
            .on(&["--services", "config"], Reply::success("web\ndb\ncache\n"))
            .on(&["config"], Reply::success(COMPOSE))
            .on(&["ps"], Reply::success("web\ndb\ncache\n"))
    }

    #[test]
    fn test_report_scenario() {
        let temp_dir = TempDir::new().unwrap();
        write_stack(temp_dir.path(), "basic-stack");
        write_stack(temp_dir.path(), "cluster-example");
        let config = config_for(temp_dir.path());
        let runner = scenario_runner();
        let output = CapturedOutput::new();
        let interrupt = Interrupt::new();

        let outcome = Orchestrator::new(&config, &runner, &output, &interrupt)
            .run(Command::Report)
            .unwrap();

        assert_eq!(outcome.validation_results.len(), 2);
        assert_eq!(outcome.test_results.len(), 1);
        assert_eq!(outcome.test_results[0].stack, "basic-stack");
        assert_eq!(outcome.test_results[0].status, DeploymentStatus::Success);
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(runner.count(&["down"]), 1);

        let path = outcome.report_path.unwrap();
        assert!(path.starts_with(temp_dir.path().join("reports")));
        assert!(path.to_string_lossy().ends_with(".md"));
        assert!(output.contains("✗ cluster-example: compose syntax invalid"));
        assert!(output.contains("Report saved to:"));
    }

    #[test]
    fn test_validate_twice_identical() {
        let temp_dir = TempDir::new().unwrap();
        write_stack(temp_dir.path(), "basic-stack");
        write_stack(temp_dir.path(), "cluster-example");
        let config = config_for(temp_dir.path());
        let runner = scenario_runner();
        let interrupt = Interrupt::new();
        let orchestrator = Orchestrator::new(&config, &runner, &QuietOutput, &interrupt);

        let first = orchestrator.validate().unwrap();
        let second = orchestrator.validate().unwrap();
        assert_eq!(first.validation_results, second.validation_results);
        assert_eq!(runner.count(&["up"]), 0);
    }

    #[test]
    fn test_test_mode_records_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        write_stack(temp_dir.path(), "basic-stack");
        fs::create_dir_all(temp_dir.path().join(".config").join("swarm-stack")).unwrap();
        let config = config_for(temp_dir.path());
        let runner = scenario_runner();
        let interrupt = Interrupt::new();

        let outcome = Orchestrator::new(&config, &runner, &QuietOutput, &interrupt)
            .test()
            .unwrap();

        assert_eq!(outcome.validation_results.len(), 1);
        assert_eq!(
            outcome.validation_results[0].issue,
            Some(StackIssue::ConfigMissing)
        );
        assert_eq!(outcome.test_results.len(), 1);
        assert_eq!(runner.count(&["swarm-stack"]), 0);
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    fn test_teardown_once_per_attempted_stack() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["alpha", "beta", "gamma"] {
            write_stack(temp_dir.path(), name);
        }
        let config = config_for(temp_dir.path());
        let runner = ScriptedRunner::new()
            .on(&["beta", "up"], Reply::failure(1, "pull access denied"))
            .on(&["--services"], Reply::success("web\n"))
            .on(&["ps"], Reply::success("web\n"));
        let interrupt = Interrupt::new();

        let outcome = Orchestrator::new(&config, &runner, &QuietOutput, &interrupt)
            .test()
            .unwrap();

        assert_eq!(outcome.test_results.len(), 3);
        assert_eq!(runner.count(&["down"]), 3);
        for name in ["alpha", "beta", "gamma"] {
            assert_eq!(runner.count(&[name, "down"]), 1);
        }
        assert_eq!(outcome.test_results[1].status, DeploymentStatus::DeploymentFailed);
    }

    #[test]
    fn test_all_pass_exit_zero() {
        let temp_dir = TempDir::new().unwrap();
        write_stack(temp_dir.path(), "basic-stack");
        let config = config_for(temp_dir.path());
        let runner = scenario_runner();
        let interrupt = Interrupt::new();

        let outcome = Orchestrator::new(&config, &runner, &QuietOutput, &interrupt)
            .run(Command::Validate)
            .unwrap();
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn test_missing_tool_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        write_stack(temp_dir.path(), "basic-stack");
        let config = config_for(temp_dir.path());
        let runner = ScriptedRunner::new().fallback(Reply::NotFound);
        let interrupt = Interrupt::new();

        let err = Orchestrator::new(&config, &runner, &QuietOutput, &interrupt)
            .run(Command::Test)
            .unwrap_err();
        assert!(matches!(err, StackError::ToolUnavailable { .. }));
    }

    #[test]
    fn test_unreadable_registry_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_for(temp_dir.path());
        let runner = ScriptedRunner::new();
        let interrupt = Interrupt::new();

        let err = Orchestrator::new(&config, &runner, &QuietOutput, &interrupt)
            .validate()
            .unwrap_err();
        assert!(matches!(err, StackError::Registry(_)));
    }

    #[test]
    fn test_cleanup_is_best_effort() {
        let temp_dir = TempDir::new().unwrap();
        write_stack(temp_dir.path(), "basic-stack");
        let cache = temp_dir.path().join(".pytest_cache");
        fs::create_dir_all(cache.join("v")).unwrap();
        let config = Config {
            prune: true,
            ..config_for(temp_dir.path())
        };
        let runner = ScriptedRunner::new()
            .on(&["down"], Reply::failure(1, "daemon not running"))
            .on(&["prune"], Reply::failure(1, "daemon not running"));
        let output = CapturedOutput::new();
        let interrupt = Interrupt::new();

        let outcome = Orchestrator::new(&config, &runner, &output, &interrupt)
            .run(Command::Cleanup)
            .unwrap();

        assert_eq!(outcome.exit_code(), 0);
        assert!(!cache.exists());
        assert_eq!(runner.count(&["prune", "-f"]), 3);
        assert!(output.contains("⚠ basic-stack: teardown failed"));
    }

    #[test]
    fn test_cleanup_without_prune_leaves_docker_alone() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_for(temp_dir.path());
        let runner = ScriptedRunner::new();
        let interrupt = Interrupt::new();

        let outcome = Orchestrator::new(&config, &runner, &QuietOutput, &interrupt).cleanup();
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(runner.count(&["prune"]), 0);
    }

    #[test]
    fn test_interrupt_stops_before_next_stack() {
        let temp_dir = TempDir::new().unwrap();
        write_stack(temp_dir.path(), "basic-stack");
        write_stack(temp_dir.path(), "mcp");
        let config = config_for(temp_dir.path());
        let runner = scenario_runner();
        let interrupt = Interrupt::new();
        interrupt.raise();

        let outcome = Orchestrator::new(&config, &runner, &QuietOutput, &interrupt)
            .validate()
            .unwrap();
        assert!(outcome.validation_results.is_empty());
        assert_eq!(outcome.exit_code(), 130);
    }

    #[test]
    fn test_json_report_format() {
        let temp_dir = TempDir::new().unwrap();
        write_stack(temp_dir.path(), "basic-stack");
        let config = Config {
            report_format: ReportFormat::Json,
            ..config_for(temp_dir.path())
        };
        let runner = scenario_runner();
        let interrupt = Interrupt::new();

        let outcome = Orchestrator::new(&config, &runner, &QuietOutput, &interrupt)
            .run(Command::All)
            .unwrap();

        assert_eq!(outcome.exit_code(), 0);
        let path = outcome.report_path.clone().unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["summary"]["failed"], 0);
        // one teardown from cleanup, one from the deployment test
        assert_eq!(runner.count(&["down"]), 2);
    }

    /// Raises the interrupt while a matching command is running
    struct InterruptingRunner {
        inner: ScriptedRunner,
        token: &'static str,
        interrupt: Interrupt,
    }

    impl CommandRunner for InterruptingRunner {
        fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
            if spec.has_token(self.token) {
                self.interrupt.raise();
            }
            self.inner.run(spec)
        }
    }

    #[test]
    fn test_interrupt_during_last_syntax_check() {
        let temp_dir = TempDir::new().unwrap();
        write_stack(temp_dir.path(), "basic-stack");
        let config = config_for(temp_dir.path());
        let interrupt = Interrupt::new();
        let runner = InterruptingRunner {
            inner: ScriptedRunner::new().on(&["config"], Reply::Interrupted),
            token: "config",
            interrupt: interrupt.clone(),
        };

        let outcome = Orchestrator::new(&config, &runner, &QuietOutput, &interrupt)
            .validate()
            .unwrap();

        assert!(outcome.interrupted);
        assert!(outcome.validation_results.is_empty());
        assert_eq!(outcome.exit_code(), 130);
    }

    #[test]
    fn test_interrupt_during_report_validation_skips_testing() {
        let temp_dir = TempDir::new().unwrap();
        write_stack(temp_dir.path(), "basic-stack");
        write_stack(temp_dir.path(), "mcp");
        let config = config_for(temp_dir.path());
        let interrupt = Interrupt::new();
        let runner = InterruptingRunner {
            inner: ScriptedRunner::new()
                .on(&["mcp", "config"], Reply::Interrupted)
                .on(&["config"], Reply::success(COMPOSE)),
            token: "mcp",
            interrupt: interrupt.clone(),
        };

        let outcome = Orchestrator::new(&config, &runner, &QuietOutput, &interrupt)
            .report()
            .unwrap();

        assert_eq!(outcome.exit_code(), 130);
        assert_eq!(outcome.validation_results.len(), 1);
        assert_eq!(outcome.validation_results[0].stack, "basic-stack");
        assert!(outcome.test_results.is_empty());
        let report = outcome.report.unwrap();
        assert!(
            report
                .validation_results
                .iter()
                .all(|r| r.issue != Some(StackIssue::ComposeSyntaxInvalid))
        );
    }
}
