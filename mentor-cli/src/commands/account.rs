//! Account view - profile and subscription

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;

use super::{enter, get_context};
use crate::output;
use mentor_core::services::overall_progress;
use mentor_core::{MentorContext, Phase, Route};

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context("account").await?;
    if !enter(&ctx, &Route::Account, json)? {
        return Ok(());
    }
    render(&ctx, json)
}

pub fn render(ctx: &MentorContext, json: bool) -> Result<()> {
    let user = ctx.session.user()?.context("No user signed in")?;
    let progress = overall_progress(&user, Phase::COUNT);
    let assessments = ctx.progress.count_assessments(&user.id)?;

    let plan = if user.is_premium { "premium" } else { "free" };

    if json {
        return output::json_ok(json!({
            "user": user,
            "plan": plan,
            "progress": progress,
            "assessments": assessments,
            "backend": ctx.session.backend(),
        }));
    }

    output::heading("Account Settings", "Manage your profile and subscription");

    let mut table = output::create_table();
    table.add_row(vec!["Full Name", user.name.as_str()]);
    table.add_row(vec!["Email Address", user.email.as_str()]);
    table.add_row(vec!["Sign-in", ctx.session.backend()]);
    println!("{}", table);
    println!();

    if user.is_premium {
        println!("{} {}", "Current plan:".bold(), "Premium".green());
        println!("You have access to all premium features including personalized learning paths.");
    } else {
        println!("{} Free", "Current plan:".bold());
        println!("Upgrade to Premium for personalized learning paths.");
        output::hint("Run `mentor upgrade`");
    }
    println!();
    println!("Journey progress  {}", output::progress_bar(progress));
    println!("Assessments taken {}", assessments);
    Ok(())
}
