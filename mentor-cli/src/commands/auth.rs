//! Account commands - signup, login, federated login and logout

use anyhow::{bail, Result};
use dialoguer::{Input, Password};
use serde_json::json;

use super::{fail, get_context, interactive};
use crate::output;
use mentor_core::{OAuthProvider, Route, User};

fn prompt_text(label: &str, given: Option<String>) -> Result<String> {
    if let Some(value) = given {
        return Ok(value);
    }
    if !interactive() {
        bail!("{} is required", label);
    }
    Ok(Input::<String>::new().with_prompt(label).interact_text()?)
}

fn prompt_password(given: Option<String>, confirm: bool) -> Result<String> {
    if let Some(value) = given {
        return Ok(value);
    }
    if !interactive() {
        bail!("Password is required (use --password or MENTOR_PASSWORD)");
    }
    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}

fn report_signed_in(user: &User, json: bool, verb: &str) -> Result<()> {
    if json {
        return output::json_ok(json!({ "user": user, "next": Route::Dashboard.path() }));
    }
    output::success(&format!("{} as {} ({})", verb, user.name, user.email));
    output::hint("Next: `mentor dashboard`");
    Ok(())
}

pub async fn signup(
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context("signup").await?;
    let name = prompt_text("Full name", name)?;
    let email = prompt_text("Email", email)?;
    let password = prompt_password(password, true)?;

    match ctx.session.signup(&email, &password, &name).await {
        Ok(user) => report_signed_in(&user, json, "Account created. Signed in"),
        Err(e) => fail(e.to_string(), json),
    }
}

pub async fn login(email: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context("login").await?;
    let email = prompt_text("Email", email)?;
    let password = prompt_password(password, false)?;

    match ctx.session.login(&email, &password).await {
        Ok(user) => report_signed_in(&user, json, "Signed in"),
        Err(e) => fail(e.to_string(), json),
    }
}

/// Federated login
///
/// Backends that finish on their own sign in immediately. Otherwise the
/// authorize URL is printed and the URL the browser lands on afterwards is
/// read back, from `--callback` or a prompt.
pub async fn oauth(provider: &str, callback: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context("oauth").await?;
    let provider: OAuthProvider = match provider.parse() {
        Ok(p) => p,
        Err(e) => return fail(e.to_string(), json),
    };

    let redirect = match ctx.session.federated_login(provider).await {
        Ok(redirect) => redirect,
        Err(e) => return fail(e.to_string(), json),
    };

    if redirect.completed {
        return match ctx.session.user()? {
            Some(user) => report_signed_in(&user, json, "Signed in"),
            None => fail(format!("{} login failed: no session", provider), json),
        };
    }

    let callback = match callback {
        Some(url) => url,
        None if interactive() && !json => {
            output::info(&format!("Open this URL to continue with {}:", provider));
            println!("  {}", redirect.url);
            println!();
            Input::<String>::new()
                .with_prompt("Paste the URL you were redirected to")
                .interact_text()?
        }
        None => {
            if json {
                return output::json_ok(json!({ "redirect": redirect }));
            }
            println!("{}", redirect.url);
            output::hint(&format!(
                "Then run `mentor oauth {} --callback <redirected-url>`",
                provider
            ));
            return Ok(());
        }
    };

    match ctx.session.complete_federated_login(provider, &callback).await {
        Ok(user) => report_signed_in(&user, json, "Signed in"),
        Err(e) => fail(e.to_string(), json),
    }
}

pub async fn logout(json: bool) -> Result<()> {
    let ctx = get_context("logout").await?;
    let was_signed_in = ctx.session.user()?.is_some();

    match ctx.session.logout().await {
        Ok(()) => {
            if json {
                output::json_ok(json!({ "signedOut": was_signed_in, "next": Route::Landing.path() }))
            } else {
                if was_signed_in {
                    output::success("Signed out");
                } else {
                    output::info("Not signed in");
                }
                Ok(())
            }
        }
        Err(e) => fail(e.to_string(), json),
    }
}
