//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::RunConfig;

/// Statefix - Terraform state corrections checked against a plan.
#[derive(Parser, Debug)]
#[command(name = "statefix")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply a change file to a state and show what the plan still does.
    Plan(PlanArgs),
}

/// Arguments of the `plan` command.
#[derive(Args, Debug, Clone, Default)]
pub struct PlanArgs {
    /// Current plan JSON file.
    #[arg(long, env = "STATEFIX_PLAN")]
    pub plan: Option<PathBuf>,

    /// Current state file.
    #[arg(long, env = "STATEFIX_STATE")]
    pub state: Option<PathBuf>,

    /// Change definition file.
    #[arg(long, env = "STATEFIX_CHANGE")]
    pub change: Option<PathBuf>,

    /// Output state file.
    #[arg(long, env = "STATEFIX_OUT")]
    pub out: Option<PathBuf>,

    /// Hide update output.
    #[arg(long, env = "STATEFIX_HIDE_UPDATES")]
    pub hide_updates: bool,

    /// Disable color coded output.
    #[arg(long)]
    pub no_color: bool,

    /// Show a table of the applied change operations.
    #[arg(long)]
    pub show_operations: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl PlanArgs {
    /// Builds the run configuration these arguments describe.
    #[must_use]
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            plan: self.plan.clone(),
            state: self.state.clone(),
            change: self.change.clone(),
            out: self.out.clone(),
            hide_updates: self.hide_updates,
        }
    }
}
