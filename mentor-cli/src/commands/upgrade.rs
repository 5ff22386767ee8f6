//! Upgrade command - unlock premium phases

use anyhow::Result;
use dialoguer::Confirm;
use serde_json::json;

use super::{enter, fail, get_context, interactive};
use crate::output;
use mentor_core::Route;

pub async fn run(yes: bool, json: bool) -> Result<()> {
    let ctx = get_context("upgrade").await?;
    if !enter(&ctx, &Route::Account, json)? {
        return Ok(());
    }

    if ctx.session.user()?.is_some_and(|u| u.is_premium) {
        if json {
            return output::json_ok(json!({ "user": ctx.session.user()?, "upgraded": false }));
        }
        output::info("You are already on the Premium plan.");
        return Ok(());
    }

    if !yes && !json && interactive() {
        let confirmed = Confirm::new()
            .with_prompt("Upgrade to Premium?")
            .default(true)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let user = match ctx.session.upgrade_to_premium() {
        Ok(Some(user)) => user,
        Ok(None) => return fail("You need to log in first", json),
        Err(e) => return fail(e.to_string(), json),
    };

    if json {
        return output::json_ok(json!({ "user": user, "upgraded": true }));
    }
    output::success("Welcome to Premium! Your learning path is unlocked.");
    output::hint("Continue with `mentor learning-path`");
    Ok(())
}
