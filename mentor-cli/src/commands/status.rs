//! Status command - who is signed in and where they are in the journey

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use super::get_context;
use crate::output;
use mentor_core::services::{compute_phase_status, overall_progress};
use mentor_core::Phase;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context("status").await?;
    let snapshot = ctx.session.snapshot()?;
    let backend = ctx.session.backend().to_string();

    if json {
        let progress = snapshot
            .user
            .as_ref()
            .map(|user| overall_progress(user, Phase::COUNT));
        return output::json_ok(json!({
            "backend": backend,
            "dataDir": ctx.mentor_dir,
            "loading": snapshot.loading,
            "user": snapshot.user,
            "progress": progress,
        }));
    }

    println!("{}", "MentorAI Status".bold());
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Auth backend".to_string(), backend]);
    table.add_row(vec!["Data directory".to_string(), ctx.mentor_dir.display().to_string()]);

    let Some(user) = snapshot.user else {
        table.add_row(vec!["Signed in".to_string(), "no".to_string()]);
        println!("{}", table);
        println!();
        output::hint("Run `mentor signup` or `mentor login` to get started");
        return Ok(());
    };

    table.add_row(vec!["Signed in as".to_string(), format!("{} <{}>", user.name, user.email)]);
    table.add_row(vec![
        "Plan".to_string(),
        if user.is_premium { "Premium" } else { "Free" }.to_string(),
    ]);
    table.add_row(vec![
        "Current phase".to_string(),
        Phase::from_id(user.current_phase)
            .map(|p| format!("{}. {}", p.id(), p.title()))
            .unwrap_or_else(|| user.current_phase.to_string()),
    ]);
    println!("{}", table);
    println!();

    for phase in Phase::ALL {
        println!(
            "  {}. {:<28} {}",
            phase.id(),
            phase.title(),
            output::phase_status(compute_phase_status(&user, phase))
        );
    }
    println!();
    println!(
        "Progress  {}",
        output::progress_bar(overall_progress(&user, Phase::COUNT))
    );
    Ok(())
}
