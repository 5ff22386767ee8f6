//! Open command - guarded navigation to any route

use anyhow::Result;
use serde_json::json;

use super::{account, assess, dashboard, enter, fail, get_context, learning_path, results};
use crate::output;
use mentor_core::{MentorContext, Route};

pub async fn run(path: &str, json: bool) -> Result<()> {
    let ctx = get_context("open").await?;
    let route = Route::parse(path);
    if !enter(&ctx, &route, json)? {
        return Ok(());
    }
    render_route(&ctx, &route, json)
}

/// Render the view behind a route the guard already let through
pub fn render_route(ctx: &MentorContext, route: &Route, json: bool) -> Result<()> {
    match route {
        Route::Landing => landing(ctx, json),
        Route::Login | Route::SignUp => auth_page(ctx, route, json),
        Route::Dashboard => dashboard::render(ctx, json),
        Route::Assessment => assess::render(json),
        Route::Results => results::render(ctx, json),
        Route::LearningPath => learning_path::render(ctx, json),
        Route::Account => account::render(ctx, json),
        Route::NotFound(path) => fail(format!("404: page not found ({})", path), json),
    }
}

fn landing(ctx: &MentorContext, json: bool) -> Result<()> {
    let signed_in = ctx.session.user()?.is_some();
    if json {
        return output::json_ok(json!({ "route": Route::Landing.path(), "signedIn": signed_in }));
    }

    output::heading(
        "MentorAI",
        "Professional development coaching, one phase at a time",
    );
    println!("  1. Take a self-assessment of one of your skills");
    println!("  2. Review your results");
    println!("  3. Follow a personalized learning path (Premium)");
    println!();
    if signed_in {
        output::hint("Continue with `mentor dashboard`");
    } else {
        output::hint("Get started with `mentor signup` or `mentor login`");
    }
    Ok(())
}

fn auth_page(ctx: &MentorContext, route: &Route, json: bool) -> Result<()> {
    let user = ctx.session.user()?;
    if json {
        return output::json_ok(json!({ "route": route.path(), "user": user }));
    }

    match user {
        Some(user) => output::info(&format!("Already signed in as {}", user.email)),
        None if *route == Route::SignUp => output::hint("Create an account with `mentor signup`"),
        None => output::hint("Sign in with `mentor login` or `mentor oauth <provider>`"),
    }
    Ok(())
}
