//! Learning path view - premium content for phase 3

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use serde_json::json;

use super::{enter, get_context};
use crate::output;
use mentor_core::services::learning_path_unlocked;
use mentor_core::{MentorContext, Route};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LearningModule {
    id: u32,
    title: &'static str,
    description: &'static str,
    duration: &'static str,
    kind: &'static str,
    available: bool,
}

const MODULES: [LearningModule; 4] = [
    LearningModule {
        id: 1,
        title: "Strategic Thinking Fundamentals",
        description: "Develop your ability to think strategically and see the bigger picture in your decisions.",
        duration: "45 min",
        kind: "Interactive Module",
        available: true,
    },
    LearningModule {
        id: 2,
        title: "Effective Delegation Techniques",
        description: "Learn how to delegate effectively while maintaining quality and team motivation.",
        duration: "30 min",
        kind: "Video + Exercise",
        available: true,
    },
    LearningModule {
        id: 3,
        title: "Long-term Planning & Goal Setting",
        description: "Master the art of creating and executing long-term strategic plans.",
        duration: "60 min",
        kind: "Workshop",
        available: false,
    },
    LearningModule {
        id: 4,
        title: "Advanced Problem-Solving Frameworks",
        description: "Apply sophisticated problem-solving methodologies to complex challenges.",
        duration: "40 min",
        kind: "Case Study",
        available: false,
    },
];

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context("learning-path").await?;
    if !enter(&ctx, &Route::LearningPath, json)? {
        return Ok(());
    }
    render(&ctx, json)
}

pub fn render(ctx: &MentorContext, json: bool) -> Result<()> {
    let user = ctx.session.user()?.context("No user signed in")?;
    let unlocked = learning_path_unlocked(&user);

    if json {
        let modules: &[LearningModule] = if unlocked { &MODULES } else { &[] };
        return output::json_ok(json!({ "unlocked": unlocked, "modules": modules }));
    }

    if !unlocked {
        output::heading("Premium Feature", "");
        println!("Upgrade to Premium to access your personalized learning path.");
        println!();
        output::hint("Run `mentor upgrade`");
        return Ok(());
    }

    output::heading(
        "Personalized Learning Path",
        "Phase 3: Your customized development journey",
    );
    let mut table = output::create_table();
    table.set_header(vec!["#", "Module", "Type", "Duration", ""]);
    for module in &MODULES {
        let state = if module.available {
            "available".green().to_string()
        } else {
            "locked".dimmed().to_string()
        };
        table.add_row(vec![
            module.id.to_string(),
            format!("{}\n{}", module.title.bold(), module.description.dimmed()),
            module.kind.to_string(),
            module.duration.to_string(),
            state,
        ]);
    }
    println!("{}", table);
    Ok(())
}
