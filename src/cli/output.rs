//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::change::{ChangeReport, ValidationWarning};
use crate::error::{InputError, Result};
use crate::planner::{DiffType, ResourceDiff};
use crate::runner::RunReport;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
    /// Leave update lines out.
    hide_updates: bool,
    /// Include the applied operations table.
    show_operations: bool,
}

/// Change operation row for table display.
#[derive(Tabled)]
struct OperationRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Operation")]
    operation: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self {
            format,
            hide_updates: false,
            show_operations: false,
        }
    }

    /// Sets whether update lines are hidden.
    #[must_use]
    pub const fn with_hide_updates(mut self, hide_updates: bool) -> Self {
        self.hide_updates = hide_updates;
        self
    }

    /// Sets whether the applied operations table is shown.
    #[must_use]
    pub const fn with_show_operations(mut self, show_operations: bool) -> Self {
        self.show_operations = show_operations;
        self
    }

    /// Formats a run report for display.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the JSON report cannot be encoded.
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json = ReportJson::new(report, self.hide_updates);
                let output = serde_json::to_string_pretty(&json).map_err(|e| {
                    InputError::SerializationError {
                        message: e.to_string(),
                    }
                })?;
                Ok(output)
            }
            OutputFormat::Text => Ok(self.format_report_text(report)),
        }
    }

    /// Formats a report as text.
    fn format_report_text(&self, report: &RunReport) -> String {
        let mut output = String::new();

        if self.show_operations {
            if let Some(change) = &report.change {
                output.push_str(&Self::format_operations(change));
            }
        }

        for warning in report.warnings() {
            let _ = writeln!(output, "{}", Self::format_warning(warning));
        }

        for diff in report.diff.visible(self.hide_updates) {
            let _ = writeln!(output, "{}", Self::format_diff(diff));
        }

        output
    }

    /// Formats the applied operations as a table.
    fn format_operations(change: &ChangeReport) -> String {
        let rows: Vec<OperationRow> = change
            .operations
            .iter()
            .map(|op| OperationRow {
                index: op.index,
                operation: op.kind.to_string(),
                target: Self::truncate(&op.target, 50),
                result: op.summary.clone(),
            })
            .collect();

        let mut output = String::new();
        if !rows.is_empty() {
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }
        if change.skipped > 0 {
            let _ = writeln!(
                output,
                "{} {} unknown operation(s) skipped",
                "!".yellow(),
                change.skipped
            );
        }
        output
    }

    /// Formats one classified address with color.
    fn format_diff(diff: &ResourceDiff) -> String {
        let line = diff.to_string();
        match diff.diff_type {
            DiffType::Addition => line.green().to_string(),
            DiffType::Removal => line.red().to_string(),
            DiffType::AlreadyAbsent | DiffType::AlreadyPresent => line.blue().to_string(),
        }
    }

    /// Formats a validation warning with color.
    fn format_warning(warning: &ValidationWarning) -> String {
        format!("! {} failed validation", warning.address)
            .yellow()
            .to_string()
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct ReportJson<'a> {
    changes: Vec<ChangeJson<'a>>,
    replacements: &'a [String],
    warnings: &'a [ValidationWarning],
    serial: u64,
    state_written: bool,
}

#[derive(Serialize)]
struct ChangeJson<'a> {
    action: &'static str,
    address: &'a str,
}

impl<'a> ReportJson<'a> {
    fn new(report: &'a RunReport, hide_updates: bool) -> Self {
        Self {
            changes: report
                .diff
                .visible(hide_updates)
                .into_iter()
                .map(|d| ChangeJson {
                    action: d.diff_type.action(),
                    address: &d.address,
                })
                .collect(),
            replacements: &report.diff.replacements,
            warnings: report.warnings(),
            serial: report.serial,
            state_written: report.state_written,
        }
    }
}
