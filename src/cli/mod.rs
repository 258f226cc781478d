//! CLI module for statefix.
//!
//! This module provides the command-line interface for correcting
//! Terraform states and diffing them against plans.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, PlanArgs};
pub use output::OutputFormatter;
