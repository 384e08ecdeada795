//! `roster` command-line entry point.
//!
//! # Responsibility
//! - Map subcommands onto the core entry points.
//! - Print JSON results, or validation findings as `ERROR:`/`WARNING:` lines.
//!
//! Exit status is 0 on success and 1 on any failure, including validation
//! errors.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::debug;
use roster_core::repo::layout::write_atomic;
use roster_core::{
    build_dashboard, default_log_level, init_logging, reconcile_week, update_project_metadata,
    validate_dataset, AllocationInput, PlanningLayout,
};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "roster", version, about = "Weekly allocation planning tools")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Dataset root containing `planning/` and `identity/`.
    #[arg(long, global = true, env = "ROSTER_DATA_DIR", default_value = "tst-data")]
    data_dir: PathBuf,
    /// Planning root; defaults to `<data-dir>/planning`.
    #[arg(long, global = true)]
    planning_dir: Option<PathBuf>,
    /// Identity root; defaults to `<data-dir>/identity`.
    #[arg(long, global = true)]
    identity_dir: Option<PathBuf>,
    /// Write rolling log files into this directory.
    #[arg(long, global = true, env = "ROSTER_LOG_DIR")]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true, env = "ROSTER_LOG_LEVEL")]
    log_level: Option<String>,
}

impl GlobalArgs {
    fn layout(&self) -> PlanningLayout {
        PlanningLayout::resolve(&self.data_dir, self.planning_dir.as_deref())
    }

    fn identity_root(&self) -> PathBuf {
        self.identity_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("identity"))
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check the dataset and report errors and warnings.
    Validate,
    /// Print the aggregated dashboard as JSON.
    Dashboard {
        /// Leave real names out of the output.
        #[arg(long)]
        no_pii: bool,
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replace one person's allocations for one ISO week.
    Reconcile {
        #[arg(long)]
        alias: String,
        #[arg(long)]
        week: String,
        /// JSON list of `{project, state?, capacity_hours?, load? | planned_hours?}`.
        #[arg(long)]
        allocations: String,
    },
    /// Patch project metadata.
    ProjectUpdate {
        #[arg(long)]
        project: String,
        /// JSON object with any of `hourly_rate`, `milestones`,
        /// `start_week_override`, `end_week_override`.
        #[arg(long)]
        updates: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    if let Some(log_dir) = &cli.global.log_dir {
        let level = cli.global.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)
            .map_err(|err| anyhow!("failed to initialize logging: {err}"))?;
    }
    let layout = cli.global.layout();
    debug!(
        "event=cli_start module=cli status=ok planning_root={}",
        layout.root().display()
    );

    match &cli.command {
        Command::Validate => validate(&layout, &cli.global.identity_root()),
        Command::Dashboard { no_pii, output } => {
            let dashboard = build_dashboard(layout.root(), &cli.global.identity_root(), !no_pii)?;
            let json = serde_json::to_string_pretty(&dashboard)?;
            match output {
                Some(path) => {
                    write_atomic(path, format!("{json}\n").as_bytes())?;
                    println!("wrote {}", path.display());
                }
                None => println!("{json}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Reconcile {
            alias,
            week,
            allocations,
        } => {
            let payload = parse_json("--allocations", allocations)?;
            let inputs = AllocationInput::list_from_json(&payload)?;
            let summary = reconcile_week(layout.root(), alias, week, &inputs)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::ProjectUpdate { project, updates } => {
            let payload = parse_json("--updates", updates)?;
            let result = update_project_metadata(layout.root(), project, &payload)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn validate(layout: &PlanningLayout, identity_root: &Path) -> Result<ExitCode> {
    let report = validate_dataset(layout.root(), identity_root)?;
    for error in &report.errors {
        println!("ERROR: {error}");
    }
    for warning in &report.warnings {
        println!("WARNING: {warning}");
    }
    let counts = report.counts;
    println!(
        "checked {} people, {} projects, {} roles, {} identities: {} error(s), {} warning(s)",
        counts.people_files,
        counts.project_files,
        counts.role_files,
        counts.identity_files,
        report.errors.len(),
        report.warnings.len()
    );
    Ok(if report.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn parse_json(flag: &str, raw: &str) -> Result<JsonValue> {
    if raw.trim().is_empty() {
        bail!("{flag} must not be empty");
    }
    serde_json::from_str(raw).with_context(|| format!("{flag} is not valid JSON"))
}
