//! Results view - the submitted assessment and the way on to phase 3

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use super::{enter, fail, get_context, open};
use crate::output;
use mentor_core::services::{NextStep, ResultsView};
use mentor_core::{MentorContext, Route};

const EXCERPT_CHARS: usize = 280;

pub async fn run(continue_on: bool, json: bool) -> Result<()> {
    let ctx = get_context("results").await?;
    if !enter(&ctx, &Route::Results, json)? {
        return Ok(());
    }

    if continue_on {
        continue_to_learning_path(&ctx, json)
    } else {
        render(&ctx, json)
    }
}

pub fn render(ctx: &MentorContext, json: bool) -> Result<()> {
    let view = match ctx.assessment_service.results(&ctx.session) {
        Ok(view) => view,
        Err(e) => return fail(e.to_string(), json),
    };

    if json {
        return output::json_ok(view);
    }

    match view {
        ResultsView::Redirect { route } => {
            output::info("No assessment yet. Let's start with one.");
            println!();
            open::render_route(ctx, &route, false)
        }
        ResultsView::Ready { assessment } => {
            output::heading("Assessment Results", "Phase 2: Your analysis is ready");

            let mut table = output::create_table();
            table.add_row(vec!["Skill", assessment.skill.label()]);
            table.add_row(vec![
                "Submitted".to_string(),
                assessment
                    .submitted_at
                    .format("%Y-%m-%d %H:%M UTC")
                    .to_string(),
            ]);
            table.add_row(vec!["Response".to_string(), excerpt(&assessment.response)]);
            println!("{}", table);
            println!();
            output::hint("Continue with `mentor results --continue`");
            Ok(())
        }
    }
}

fn continue_to_learning_path(ctx: &MentorContext, json: bool) -> Result<()> {
    let next = match ctx.assessment_service.continue_to_learning_path(&ctx.session) {
        Ok(next) => next,
        Err(e) => return fail(e.to_string(), json),
    };

    if json {
        return output::json_ok(json!({ "next": next }));
    }

    match next {
        NextStep::Navigate(route) => open::render_route(ctx, &route, false),
        NextStep::UpgradePrompt => {
            output::warning("Upgrade to Premium to access your personalized learning path!");
            output::hint("Run `mentor upgrade`");
            Ok(())
        }
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    format!("{}{}", cut.trim_end(), "...".dimmed())
}
