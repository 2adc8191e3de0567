//! Command-line interface module for dirsweep.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing (`clap` derive)
//! - Logging setup
//! - One-off organization runs
//! - Scheduled runs with Ctrl+C handling

use crate::config::{ExcludeFilter, LogLevel};
use crate::file_category::CategoryTable;
use crate::file_organizer::{OrganizeResult, OrganizeRun, Organizer};
use crate::logging::init_tracing;
use crate::output::OutputFormatter;
use crate::scheduler::{ScheduleSpec, Scheduler, SystemClock, TIMESTAMP_FORMAT};
use crate::shutdown::Shutdown;
use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueHint};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Sort the files of a directory into category folders, once or on a schedule.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// Diagnostic log level (written to stderr).
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Normal)]
    pub log_level: LogLevel,

    /// Shorthand for `--log-level debug`.
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Also append diagnostics to this file.
    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: OrganizeCommand,
}

/// Represents a CLI command to execute.
#[derive(Subcommand, Debug, Clone)]
pub enum OrganizeCommand {
    /// Organize a directory once.
    Organize {
        /// Directory whose files are sorted.
        #[arg(value_name = "DIR", value_hint = ValueHint::DirPath)]
        directory: PathBuf,

        /// Leave files whose name matches this glob in place (repeatable).
        #[arg(long, value_name = "GLOB")]
        exclude: Vec<String>,

        /// Print the run summary as JSON instead of progress lines.
        #[arg(long)]
        json: bool,
    },
    /// Organize a directory repeatedly until interrupted.
    ///
    /// FREQUENCY is one of: `daily HH:MM`, `hourly MINUTES`,
    /// `weekly DAY HH:MM`.
    Schedule {
        /// Directory whose files are sorted.
        #[arg(value_name = "DIR", value_hint = ValueHint::DirPath)]
        directory: PathBuf,

        /// daily, hourly or weekly.
        #[arg(value_name = "FREQUENCY")]
        frequency: String,

        /// Frequency parameters: a time, a number of minutes, or a weekday and a time.
        #[arg(value_name = "PARAMS")]
        params: Vec<String>,

        /// Leave files whose name matches this glob in place (repeatable).
        #[arg(long, value_name = "GLOB")]
        exclude: Vec<String>,
    },
}

impl Cli {
    /// Effective log level: `--debug` wins over `--log-level`.
    pub fn effective_log_level(&self) -> LogLevel {
        if self.debug {
            LogLevel::Debug
        } else {
            self.log_level
        }
    }
}

/// Parses the process arguments.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Runs the CLI application.
///
/// Configuration errors and top-level organizer errors are returned; per-file
/// failures are reported in the summary and do not make this fail.
pub fn run_cli(cli: Cli) -> Result<()> {
    let _guard = init_tracing(cli.effective_log_level(), cli.log_file.as_deref())
        .context("failed to initialize logging")?;
    debug!(?cli, "starting dirsweep");

    match cli.command {
        OrganizeCommand::Organize {
            directory,
            exclude,
            json,
        } => {
            let organizer = build_organizer(&exclude)?;
            if json {
                let run = organizer
                    .organize(&directory)
                    .with_context(|| format!("cannot organize {}", directory.display()))?;
                OutputFormatter::json(&run).context("failed to write JSON summary")?;
            } else {
                organize_directory(&organizer, &directory)
                    .with_context(|| format!("cannot organize {}", directory.display()))?;
            }
            Ok(())
        }
        OrganizeCommand::Schedule {
            directory,
            frequency,
            params,
            exclude,
        } => {
            let spec = ScheduleSpec::from_args(&frequency, &params)
                .context("invalid schedule")?;
            let organizer = build_organizer(&exclude)?;
            schedule_directory(&organizer, directory, spec)
        }
    }
}

fn build_organizer(exclude: &[String]) -> Result<Organizer> {
    let exclude = ExcludeFilter::from_patterns(exclude)?;
    Ok(Organizer::new(CategoryTable::builtin()).with_exclude(exclude))
}

/// Organizes `directory` once, printing progress and the summary.
pub fn organize_directory(organizer: &Organizer, directory: &Path) -> OrganizeResult<OrganizeRun> {
    OutputFormatter::header(&format!("Organizing: {}", directory.display()));
    let run = organizer.organize_with(directory, |event| OutputFormatter::event(event))?;
    OutputFormatter::summary(&run);
    Ok(run)
}

/// Runs `organizer` on `directory` per `spec` until Ctrl+C.
fn schedule_directory(organizer: &Organizer, directory: PathBuf, spec: ScheduleSpec) -> Result<()> {
    if !directory.is_dir() {
        warn!(dir = %directory.display(), "directory is not available yet; runs will fail until it is");
    }

    let shutdown = Shutdown::new();
    shutdown
        .install_ctrlc_handler()
        .context("failed to install signal handler")?;

    let mut scheduler = Scheduler::new(spec, directory, SystemClock);

    OutputFormatter::header("dirsweep scheduler");
    OutputFormatter::info(&format!("Directory: {}", scheduler.target().display()));
    OutputFormatter::success(&format!("Scheduled to run {}", scheduler.spec()));
    OutputFormatter::info("Scheduler is running. Press Ctrl+C to stop.");

    scheduler.run(&shutdown, |dir| {
        OutputFormatter::info(&format!(
            "[{}] Running organizer for: {}",
            Local::now().format(TIMESTAMP_FORMAT),
            dir.display()
        ));
        organize_directory(organizer, dir)
    });

    OutputFormatter::warning(&format!(
        "[{}] Scheduler stopped by user",
        Local::now().format(TIMESTAMP_FORMAT)
    ));
    Ok(())
}
