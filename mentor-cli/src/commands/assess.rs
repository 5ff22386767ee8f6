//! Assessment view - pick a skill and answer its situational question

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Input, Select};
use serde_json::json;

use super::{enter, fail, get_context, interactive, open};
use crate::output;
use mentor_core::services::NextStep;
use mentor_core::{Route, Skill};

pub async fn run(skill: Option<String>, response: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context("assess").await?;
    if !enter(&ctx, &Route::Assessment, json)? {
        return Ok(());
    }

    let skill = match skill {
        Some(raw) => match raw.parse::<Skill>() {
            Ok(skill) => Some(skill),
            Err(e) => return fail(e.to_string(), json),
        },
        None if interactive() && !json => Some(pick_skill()?),
        None => None,
    };

    let response = match response {
        Some(text) => text,
        None if interactive() && !json => {
            if let Some(skill) = skill {
                println!();
                println!("{}", skill.question());
                println!();
            }
            Input::<String>::new()
                .with_prompt("Your response")
                .allow_empty(true)
                .interact_text()?
        }
        None => String::new(),
    };

    let submitted = match ctx.assessment_service.submit(&ctx.session, skill, &response) {
        Ok(submitted) => submitted,
        Err(e) => return fail(e.to_string(), json),
    };

    if json {
        return output::json_ok(submitted);
    }

    output::success("Assessment completed! Analyzing your response...");
    println!();
    match submitted.next {
        NextStep::Navigate(route) => open::render_route(&ctx, &route, false),
        NextStep::UpgradePrompt => Ok(()),
    }
}

fn pick_skill() -> Result<Skill> {
    let labels: Vec<&str> = Skill::ALL.iter().map(|s| s.label()).collect();
    let index = Select::new()
        .with_prompt("Which skill would you like to develop?")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(Skill::ALL[index])
}

/// Show the skill catalog
pub fn render(json: bool) -> Result<()> {
    if json {
        let skills: Vec<_> = Skill::ALL
            .iter()
            .map(|s| json!({ "skill": s, "label": s.label(), "question": s.question() }))
            .collect();
        return output::json_ok(json!({ "skills": skills }));
    }

    output::heading(
        "Skills Assessment",
        "Phase 1: Tell us about a real situation you handled",
    );
    let mut table = output::create_table();
    table.set_header(vec!["Skill", "Question"]);
    for skill in Skill::ALL {
        table.add_row(vec![
            format!("{}\n{}", skill.label().bold(), skill.key().dimmed()),
            skill.question().to_string(),
        ]);
    }
    println!("{}", table);
    println!();
    output::hint("Answer with `mentor assess --skill <skill> --response \"...\"`");
    Ok(())
}
