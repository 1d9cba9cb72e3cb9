//! Compose CLI adapter
//!
//! Builds the `docker compose` invocations for a stack. Every per-stack
//! command pins the compose file and the project name so `up`, `ps` and
//! `down` all address the same project.

use super::config::Config;
use crate::executor::{CommandOutput, CommandRunner, CommandSpec};
use crate::stack::{StackDescriptor, StackError};
use std::time::Duration;

/// Versions reported by the container tooling
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ToolVersions {
    /// `docker --version` (or the configured container CLI)
    pub container_cli: Option<String>,
    /// `docker compose version` (or the configured compose command)
    pub compose: Option<String>,
}

/// Adapter over the compose command line
pub struct ComposeCli<'a> {
    runner: &'a dyn CommandRunner,
    compose_command: Vec<String>,
    container_command: String,
    start_timeout: Duration,
    teardown_timeout: Duration,
    query_timeout: Duration,
}

impl<'a> ComposeCli<'a> {
    /// Creates an adapter using the settings' commands and timeouts
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, config: &Config) -> Self {
        Self {
            runner,
            compose_command: config
                .compose_command
                .iter()
                .filter(|part| !part.trim().is_empty())
                .cloned()
                .collect(),
            container_command: config.container_command.clone(),
            start_timeout: config.start_timeout(),
            teardown_timeout: config.teardown_timeout(),
            query_timeout: config.query_timeout(),
        }
    }

    /// The compose command prefix as typed on a shell
    #[must_use]
    pub fn command_line(&self) -> String {
        shell_words::join(&self.compose_command)
    }

    fn base(&self) -> CommandSpec {
        let (program, rest) = self
            .compose_command
            .split_first()
            .map_or(("docker", &[][..]), |(p, r)| (p.as_str(), r));
        CommandSpec::new(program).args(rest.iter().cloned())
    }

    fn for_stack(&self, stack: &StackDescriptor, args: &[&str]) -> CommandSpec {
        let mut spec = self
            .base()
            .arg("-f")
            .arg(stack.compose_path.to_string_lossy())
            .arg("-p")
            .arg(stack.project_name())
            .args(args.iter().copied());
        if let Some(dir) = stack.compose_path.parent() {
            spec = spec.cwd(dir);
        }
        spec
    }

    fn execute(&self, spec: &CommandSpec) -> CommandOutput {
        self.runner
            .run(spec)
            .unwrap_or_else(|e| CommandOutput::from_error(&e))
    }

    /// `config`: validates the descriptor and prints the resolved document
    #[must_use]
    pub fn config(&self, stack: &StackDescriptor) -> CommandOutput {
        self.execute(&self.for_stack(stack, &["config"]).timeout(self.query_timeout))
    }

    /// `config --services`: one declared service per line
    #[must_use]
    pub fn services(&self, stack: &StackDescriptor) -> CommandOutput {
        self.execute(
            &self
                .for_stack(stack, &["config", "--services"])
                .timeout(self.query_timeout),
        )
    }

    /// `up -d`
    #[must_use]
    pub fn up(&self, stack: &StackDescriptor) -> CommandOutput {
        self.execute(&self.for_stack(stack, &["up", "-d"]).timeout(self.start_timeout))
    }

    /// `ps --services --status running`: one running service per line
    #[must_use]
    pub fn running_services(&self, stack: &StackDescriptor) -> CommandOutput {
        self.execute(
            &self
                .for_stack(stack, &["ps", "--services", "--status", "running"])
                .timeout(self.query_timeout),
        )
    }

    /// `down -v --remove-orphans`, never cut short by an interrupt
    #[must_use]
    pub fn down(&self, stack: &StackDescriptor) -> CommandOutput {
        self.execute(
            &self
                .for_stack(stack, &["down", "-v", "--remove-orphans"])
                .timeout(self.teardown_timeout)
                .uninterruptible(),
        )
    }

    /// Runs `<container cli> <args..>` for housekeeping such as pruning
    #[must_use]
    pub fn container(&self, args: &[&str]) -> CommandOutput {
        self.execute(
            &CommandSpec::new(&self.container_command)
                .args(args.iter().copied())
                .timeout(self.teardown_timeout)
                .uninterruptible(),
        )
    }

    /// Checks that the compose command works
    ///
    /// Returns the first line of `compose version`.
    pub fn probe(&self) -> Result<String, StackError> {
        let spec = self.base().arg("version").timeout(self.query_timeout);
        let output = self
            .runner
            .run(&spec)
            .map_err(|e| StackError::ToolUnavailable {
                tool: self.command_line(),
                reason: e.to_string(),
            })?;

        if output.is_failure() {
            let detail = output
                .stderr_lines()
                .next()
                .map(str::to_string)
                .unwrap_or_else(|| output.failure_reason());
            return Err(StackError::ToolUnavailable {
                tool: self.command_line(),
                reason: detail,
            });
        }

        Ok(output.stdout_lines().next().unwrap_or_default().to_string())
    }

    /// Collects tool versions for the report; unavailable tools stay `None`
    #[must_use]
    pub fn versions(&self) -> ToolVersions {
        let first_line = |output: CommandOutput| {
            output
                .is_success()
                .then(|| output.stdout_lines().next().map(str::to_string))
                .flatten()
        };

        ToolVersions {
            container_cli: first_line(self.execute(
                &CommandSpec::new(&self.container_command)
                    .arg("--version")
                    .timeout(self.query_timeout),
            )),
            compose: first_line(
                self.execute(&self.base().arg("version").timeout(self.query_timeout)),
            ),
        }
    }
}

/// Counts the non-empty lines of a listing command
#[must_use]
pub fn count_lines(output: &CommandOutput) -> u32 {
    u32::try_from(output.stdout_lines().count()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Reply, ScriptedRunner, Termination};
    use pretty_assertions::assert_eq;

    fn stack() -> StackDescriptor {
        StackDescriptor::new(
            "basic-stack",
            "/srv/.config/basic-stack/config.yml",
            "/srv/.compose/basic-stack/docker-compose.yml",
        )
    }

    #[test]
    fn test_up_pins_file_and_project() {
        let runner = ScriptedRunner::new();
        let compose = ComposeCli::new(&runner, &Config::default());
        let _ = compose.up(&stack());

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "docker");
        assert_eq!(
            calls[0].args,
            vec![
                "compose",
                "-f",
                "/srv/.compose/basic-stack/docker-compose.yml",
                "-p",
                "basic-stack",
                "up",
                "-d"
            ]
        );
        assert_eq!(calls[0].timeout, Some(Duration::from_secs(120)));
        assert!(calls[0].interruptible);
    }

    #[test]
    fn test_down_is_uninterruptible() {
        let runner = ScriptedRunner::new();
        let compose = ComposeCli::new(&runner, &Config::default());
        let _ = compose.down(&stack());

        let call = &runner.calls()[0];
        assert!(call.has_token("--remove-orphans"));
        assert!(call.has_token("-v"));
        assert!(!call.interruptible);
    }

    #[test]
    fn test_legacy_compose_binary() {
        let runner = ScriptedRunner::new();
        let config = Config {
            compose_command: vec!["docker-compose".to_string()],
            ..Config::default()
        };
        let compose = ComposeCli::new(&runner, &config);
        let _ = compose.config(&stack());

        let call = &runner.calls()[0];
        assert_eq!(call.program, "docker-compose");
        assert_eq!(call.args[0], "-f");
    }

    #[test]
    fn test_spawn_error_becomes_failed_output() {
        let runner = ScriptedRunner::new().fallback(Reply::NotFound);
        let compose = ComposeCli::new(&runner, &Config::default());

        let output = compose.up(&stack());
        assert!(output.is_failure());
        assert_eq!(output.termination, Termination::NotStarted);
        assert!(output.stderr.contains("docker"));
    }

    #[test]
    fn test_probe_missing_tool() {
        let runner = ScriptedRunner::new().on(&["version"], Reply::NotFound);
        let compose = ComposeCli::new(&runner, &Config::default());

        let err = compose.probe().unwrap_err();
        assert!(matches!(err, StackError::ToolUnavailable { .. }));
        assert!(err.to_string().contains("docker compose"));
    }

    #[test]
    fn test_probe_broken_plugin() {
        let runner = ScriptedRunner::new().on(
            &["compose", "version"],
            Reply::failure(1, "docker: 'compose' is not a docker command."),
        );
        let compose = ComposeCli::new(&runner, &Config::default());

        let err = compose.probe().unwrap_err();
        assert!(err.to_string().contains("not a docker command"));
    }

    #[test]
    fn test_versions() {
        let runner = ScriptedRunner::new()
            .on(&["--version"], Reply::success("Docker version 27.3.1\n"))
            .on(&["compose", "version"], Reply::NotFound);
        let compose = ComposeCli::new(&runner, &Config::default());

        let versions = compose.versions();
        assert_eq!(
            versions.container_cli.as_deref(),
            Some("Docker version 27.3.1")
        );
        assert_eq!(versions.compose, None);
    }

    #[test]
    fn test_count_lines() {
        let output = CommandOutput::exited(0, "web\ndb\n\ncache\n", "");
        assert_eq!(count_lines(&output), 3);
    }
}
