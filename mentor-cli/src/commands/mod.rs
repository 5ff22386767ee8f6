//! CLI command implementations

pub mod account;
pub mod assess;
pub mod auth;
pub mod dashboard;
pub mod learning_path;
pub mod logs;
pub mod open;
pub mod results;
pub mod status;
pub mod upgrade;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use mentor_core::services::GuardDecision;
use mentor_core::{EntryPoint, LogEvent, LoggingService, MentorContext, Route};

use crate::output;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<Arc<LoggingService>> {
    let mentor_dir = get_mentor_dir().ok()?;
    std::fs::create_dir_all(&mentor_dir).ok()?;
    LoggingService::new(&mentor_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
        .ok()
        .map(Arc::new)
}

/// Log an event, ignoring any errors
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the mentor directory from environment or default
pub fn get_mentor_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("MENTOR_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory; set MENTOR_DIR")?;
    Ok(home.join(".mentor"))
}

/// Build the mentor context and resolve the startup session check
///
/// Shows a spinner while the identity provider is being asked for the
/// current session.
pub async fn get_context(command: &str) -> Result<MentorContext> {
    let mentor_dir = get_mentor_dir()?;
    std::fs::create_dir_all(&mentor_dir)
        .with_context(|| format!("Failed to create mentor directory: {:?}", mentor_dir))?;

    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_run").with_command(command));

    let ctx = MentorContext::new(&mentor_dir, logger)
        .context("Failed to initialize mentor context")?;

    let spinner = loading_spinner();
    let result = ctx.initialize().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    result?;

    Ok(ctx)
}

fn loading_spinner() -> Option<ProgressBar> {
    if !atty::is(atty::Stream::Stderr) {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Checking session...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    Some(spinner)
}

/// Guarded navigation; prints the redirect and returns false when the
/// view must not render
pub fn enter(ctx: &MentorContext, route: &Route, json: bool) -> Result<bool> {
    match ctx.navigate(route)? {
        GuardDecision::Render(_) => Ok(true),
        GuardDecision::Redirect(to) => {
            if json {
                output::json_failure(format!("Login required, redirected to {}", to), Some(&to))?;
            } else {
                output::warning(&format!("Please log in to continue. Redirecting to {}", to));
                output::hint(&format!("Run `mentor login` or `mentor signup`, then `mentor open {}`", route));
            }
            Ok(false)
        }
        GuardDecision::Loading => {
            output::warning("Still checking your session, try again in a moment.");
            Ok(false)
        }
    }
}

/// True when prompts can be shown
pub fn interactive() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// Report a failed operation and turn it into a non-zero exit
///
/// With `--json` the failure is printed as an `OperationResult`; otherwise
/// `main` prints the message.
pub fn fail(message: impl Into<String>, json: bool) -> Result<()> {
    let message = message.into();
    if json {
        output::json_failure(message, None)?;
        return Err(output::Reported.into());
    }
    bail!(message)
}
