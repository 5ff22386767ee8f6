//! Dashboard view - journey overview and phase cards

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;

use super::{enter, fail, get_context, open};
use crate::output;
use mentor_core::services::{click_phase, overall_progress, phase_views, PhaseClick};
use mentor_core::{MentorContext, Phase, Route};

pub async fn run(select: Option<u32>, json: bool) -> Result<()> {
    let ctx = get_context("dashboard").await?;
    if !enter(&ctx, &Route::Dashboard, json)? {
        return Ok(());
    }

    match select {
        Some(id) => select_phase(&ctx, id, json),
        None => render(&ctx, json),
    }
}

pub fn render(ctx: &MentorContext, json: bool) -> Result<()> {
    let user = ctx.session.user()?.context("No user signed in")?;
    let views = phase_views(&user);
    let progress = overall_progress(&user, Phase::COUNT);

    if json {
        return output::json_ok(json!({
            "user": user,
            "progress": progress,
            "phases": views,
        }));
    }

    output::heading(
        &format!("Welcome back, {}!", user.name),
        "Continue your professional development journey",
    );
    println!("Overall progress  {}", output::progress_bar(progress));
    println!(
        "Plan              {}",
        if user.is_premium { "Premium".green() } else { "Free".normal() }
    );
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["#", "Phase", "Status", ""]);
    for view in &views {
        let marker = if view.shows_upgrade_prompt {
            "Premium - upgrade to unlock".yellow().to_string()
        } else if view.shows_lock {
            "locked".dimmed().to_string()
        } else if view.premium {
            "Premium".green().to_string()
        } else {
            String::new()
        };
        table.add_row(vec![
            view.id.to_string(),
            format!("{}\n{}", view.title.bold(), view.description.dimmed()),
            output::phase_status(view.status),
            marker,
        ]);
    }
    println!("{}", table);
    println!();
    output::hint("Open a phase with `mentor dashboard --select <#>`");
    Ok(())
}

fn select_phase(ctx: &MentorContext, id: u32, json: bool) -> Result<()> {
    let Some(phase) = Phase::from_id(id) else {
        return fail(format!("Unknown phase {} (expected 1-{})", id, Phase::COUNT), json);
    };
    let user = ctx.session.user()?.context("No user signed in")?;
    let click = click_phase(&user, phase);

    if json {
        return output::json_ok(json!({ "phase": phase.id(), "click": click }));
    }

    match click {
        PhaseClick::Navigate(route) => open::render_route(ctx, &route, false),
        PhaseClick::UpgradePrompt => {
            output::warning(&format!("{} is a Premium feature.", phase.title()));
            output::hint("Run `mentor upgrade` to unlock your personalized learning path.");
            Ok(())
        }
        PhaseClick::Ignored => {
            output::info(&format!(
                "{} is locked. Complete the previous phase first.",
                phase.title()
            ));
            Ok(())
        }
    }
}
