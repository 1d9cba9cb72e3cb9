//! Command-line interface for stackcheck
//!
//! Subcommands:
//! - `validate`: compose syntax and service consistency checks
//! - `test`: bring each stack up, count running services, tear it down
//! - `cleanup`: teardown of every stack and cache purge
//! - `report`: validate + test + written report
//! - `all`: cleanup followed by report
//! - `completions`: generate shell completions

pub mod completions;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use stackcheck::executor::{Interrupt, ProcessRunner};
use stackcheck::infrastructure::{Config, ConsoleOutput, effective_level, init_logging};
use stackcheck::orchestrator::{self, Orchestrator};
use stackcheck::report::ReportFormat;
use std::path::PathBuf;
use std::process::ExitCode;

/// CLI arguments for stackcheck
#[derive(Parser, Debug)]
#[command(name = "stackcheck")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every subcommand
#[derive(ClapArgs, Debug, Default)]
struct GlobalArgs {
    /// Settings file (defaults to stackcheck.yml in the base directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory the stack layout is resolved against
    #[arg(long, global = true, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Directory holding {stack}/config.yml
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Directory holding {stack}/docker-compose.yml
    #[arg(long, global = true, value_name = "DIR")]
    compose_dir: Option<PathBuf>,

    /// Directory report files are written to
    #[arg(long, global = true, value_name = "DIR")]
    reports_dir: Option<PathBuf>,

    /// Only process the named stack (repeatable)
    #[arg(long = "stack", global = true, value_name = "NAME")]
    stacks: Vec<String>,

    /// Seconds to wait between `up` and counting running services
    #[arg(long, global = true, value_name = "SECS")]
    grace_period: Option<u64>,

    /// Format of the written report
    #[arg(long, global = true, value_enum)]
    format: Option<FormatArg>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate compose syntax and service consistency of every stack
    Validate,

    /// Smoke-test the deployment of every stack
    Test,

    /// Tear down every stack and purge cache directories
    Cleanup {
        /// Also prune unused docker resources
        #[arg(long)]
        prune: bool,
    },

    /// Validate, test and write a report
    Report,

    /// Cleanup, then validate, test and write a report
    All {
        /// Also prune unused docker resources during cleanup
        #[arg(long)]
        prune: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: ShellArg,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Markdown,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Markdown => ReportFormat::Markdown,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShellArg {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

impl From<ShellArg> for clap_complete::Shell {
    fn from(arg: ShellArg) -> Self {
        match arg {
            ShellArg::Bash => Self::Bash,
            ShellArg::Zsh => Self::Zsh,
            ShellArg::Fish => Self::Fish,
            ShellArg::PowerShell => Self::PowerShell,
            ShellArg::Elvish => Self::Elvish,
        }
    }
}

impl GlobalArgs {
    /// Loads settings and applies the command-line overrides on top
    fn settings(&self) -> Result<Config> {
        let base_dir = self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let mut config = Config::discover(self.config.as_deref(), &base_dir)
            .context("Failed to load settings")?;

        if let Some(dir) = &self.base_dir {
            config.base_dir.clone_from(dir);
        }
        if let Some(dir) = &self.config_dir {
            config.config_dir.clone_from(dir);
        }
        if let Some(dir) = &self.compose_dir {
            config.compose_dir.clone_from(dir);
        }
        if let Some(dir) = &self.reports_dir {
            config.reports_dir.clone_from(dir);
        }
        if !self.stacks.is_empty() {
            config.stacks.clone_from(&self.stacks);
        }
        if let Some(secs) = self.grace_period {
            config.grace_period_secs = secs;
        }
        if let Some(format) = self.format {
            config.report_format = format.into();
        }
        Ok(config)
    }
}

/// Parse and execute CLI arguments
pub fn run() -> Result<ExitCode> {
    let args = Args::parse();

    let (command, prune) = match args.command {
        Command::Completions { shell, output } => {
            let script = completions::generate_completions(shell.into())?;
            if let Some(output_path) = output {
                completions::save_completions(&script, &output_path)?;
                println!("Completions written to: {}", output_path.display());
            } else {
                print!("{script}");
            }
            return Ok(ExitCode::SUCCESS);
        }
        Command::Validate => (orchestrator::Command::Validate, false),
        Command::Test => (orchestrator::Command::Test, false),
        Command::Cleanup { prune } => (orchestrator::Command::Cleanup, prune),
        Command::Report => (orchestrator::Command::Report, false),
        Command::All { prune } => (orchestrator::Command::All, prune),
    };

    let mut config = args.global.settings()?;
    config.prune |= prune;
    init_logging(effective_level(args.global.verbose, &config.log_level));
    tracing::debug!(base_dir = %config.base_dir.display(), "Settings resolved");

    let interrupt = Interrupt::new();
    if let Err(e) = interrupt.watch_signals() {
        tracing::warn!(error = %e, "Signal handling unavailable");
    }
    let runner = ProcessRunner::new(interrupt.clone());

    let outcome = Orchestrator::new(&config, &runner, &ConsoleOutput, &interrupt)
        .run(command)
        .with_context(|| format!("{command:?} failed"))?;

    Ok(ExitCode::from(outcome.exit_code()))
}
