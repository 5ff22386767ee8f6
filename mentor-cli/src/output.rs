//! Output formatting utilities

use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use serde::Serialize;
use serde_json::json;

use mentor_core::{OperationResult, PhaseStatus, Route};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Print a dimmed follow-up suggestion
pub fn hint(msg: &str) {
    println!("{}", msg.dimmed());
}

/// Print a section heading
pub fn heading(title: &str, subtitle: &str) {
    println!("{}", title.bold());
    if !subtitle.is_empty() {
        println!("{}", subtitle.dimmed());
    }
    println!();
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Colored label for a phase status
pub fn phase_status(status: PhaseStatus) -> String {
    let label = status.as_str();
    match status {
        PhaseStatus::Completed => label.green().to_string(),
        PhaseStatus::Active => label.cyan().bold().to_string(),
        PhaseStatus::Locked => label.dimmed().to_string(),
    }
}

/// Text progress bar, e.g. `[######----] 67%`
pub fn progress_bar(percent: u8) -> String {
    const WIDTH: usize = 20;
    let filled = (percent.min(100) as usize * WIDTH) / 100;
    format!(
        "[{}{}] {}%",
        "#".repeat(filled).green(),
        "-".repeat(WIDTH - filled).dimmed(),
        percent
    )
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Print a successful `--json` result
pub fn json_ok<T: Serialize>(data: T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&OperationResult::ok(data))?);
    Ok(())
}

/// Print a failed `--json` result, optionally naming where to go instead
pub fn json_failure(message: impl Into<String>, redirect: Option<&Route>) -> Result<()> {
    let mut result = OperationResult::<()>::fail(message);
    if let Some(route) = redirect {
        result = result.with_context("redirect", json!(route.path()));
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Error already shown to the user; only the exit code is left to set
#[derive(Debug)]
pub struct Reported;

impl std::fmt::Display for Reported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("error already reported")
    }
}

impl std::error::Error for Reported {}
