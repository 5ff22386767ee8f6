//! Logs command - inspect the event log

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use serde_json::json;

use super::{get_mentor_dir, interactive};
use crate::output;
use mentor_core::services::LogEntry;
use mentor_core::{EntryPoint, LoggingService};

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only failures
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete old events
    Clear {
        /// Delete events older than N days
        #[arg(long, default_value = "30")]
        older_than_days: u32,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show event counts and the log database location
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_logs() -> Result<LoggingService> {
    let mentor_dir = get_mentor_dir()?;
    std::fs::create_dir_all(&mentor_dir)?;
    Ok(LoggingService::new(
        &mentor_dir,
        EntryPoint::Cli,
        env!("CARGO_PKG_VERSION"),
    )?)
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn location(entry: &LogEntry) -> String {
    match (entry.command.as_deref(), entry.page.as_deref()) {
        (Some(command), Some(page)) => format!("{} {}", command, page),
        (Some(command), None) => command.to_string(),
        (None, Some(page)) => page.to_string(),
        (None, None) => String::new(),
    }
}

pub fn run(command: LogsCommands) -> Result<()> {
    match command {
        LogsCommands::List {
            limit,
            errors,
            json,
        } => list(limit, errors, json),
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => clear(older_than_days, force, json),
        LogsCommands::Stats { json } => stats(json),
    }
}

fn list(limit: usize, only_errors: bool, json: bool) -> Result<()> {
    let service = open_logs()?;
    let entries = if only_errors {
        service.get_errors(limit)?
    } else {
        service.get_recent(limit)?
    };

    if json {
        return output::json_ok(entries);
    }

    if entries.is_empty() {
        println!("No log entries found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Backend", "Event", "Where", ""]);
    for entry in &entries {
        let flag = if entry.error_message.is_some() {
            "!".red().to_string()
        } else {
            String::new()
        };
        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.backend.clone().unwrap_or_default(),
            entry.event.clone(),
            location(entry),
            flag,
        ]);
    }
    println!("{}", table);

    if only_errors {
        return Ok(());
    }

    let recent_errors = service.get_errors(3)?;
    if !recent_errors.is_empty() {
        println!();
        println!("{}", "Recent Errors:".red().bold());
        for err in &recent_errors {
            println!(
                "  {} [{}]: {}",
                format_timestamp(err.timestamp).dimmed(),
                err.event,
                err.error_message.as_deref().unwrap_or("Unknown error")
            );
        }
    }
    Ok(())
}

fn clear(older_than_days: u32, force: bool, json: bool) -> Result<()> {
    let service = open_logs()?;
    let cutoff_ms = (Utc::now() - Duration::days(i64::from(older_than_days))).timestamp_millis();

    if !force && !json && interactive() {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete events older than {} days?", older_than_days))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deleted = service.delete_before(cutoff_ms)?;
    if json {
        output::json_ok(json!({ "deleted": deleted }))
    } else {
        output::success(&format!("Deleted {} log entries", deleted));
        Ok(())
    }
}

fn stats(json: bool) -> Result<()> {
    let service = open_logs()?;
    let total = service.count()?;
    let error_count = service.get_errors(1000)?.len();
    let db_path = service.db_path().to_path_buf();
    let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        return output::json_ok(json!({
            "totalEntries": total,
            "errorCount": error_count,
            "databasePath": db_path.to_string_lossy(),
            "databaseSizeBytes": size_bytes,
        }));
    }

    println!("{}", "Log Statistics".bold());
    println!("  Total entries: {}", total);
    println!("  Errors: {}", error_count);
    println!("  Database: {}", db_path.display());
    println!("  Size: {}", output::format_size(size_bytes));
    Ok(())
}
