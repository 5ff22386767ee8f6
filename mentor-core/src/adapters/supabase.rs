//! Supabase auth client
//!
//! Talks to the GoTrue REST API exposed under `<project>/auth/v1`.
//! The current session (tokens plus user) is persisted in `session.json`
//! so a later process can pick it up; expired access tokens are refreshed
//! on the next session lookup.
//!
//! API Documentation: https://supabase.com/docs/reference/self-hosting-auth/introduction

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use url::Url;

use crate::config::SupabaseSettings;
use crate::domain::result::{Error, Result};
use crate::domain::{AuthChangeEvent, OAuthProvider, Session, SessionChange, SessionUser};
use crate::ports::{IdentityProvider, OAuthRedirect, SessionHandler, SessionListeners, Subscription};

const REQUEST_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// API Response Models (GoTrue)
// =============================================================================

/// Token grant response (password, refresh_token, signup with autoconfirm)
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Unix seconds
    #[serde(default)]
    expires_at: Option<i64>,
    user: GoTrueUser,
}

#[derive(Debug, Clone, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: HashMap<String, JsonValue>,
}

/// Signup answers with a session when autoconfirm is on, and with the bare
/// user when email confirmation is required
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignupResponse {
    Session(TokenResponse),
    PendingConfirmation(GoTrueUser),
}

/// GoTrue reports errors under several different keys depending on the endpoint
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

impl GoTrueUser {
    fn into_session_user(self) -> SessionUser {
        let full_name = ["full_name", "name"]
            .iter()
            .filter_map(|key| self.user_metadata.get(*key))
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .find(|s| !s.trim().is_empty());

        SessionUser {
            id: self.id,
            email: self.email.unwrap_or_default(),
            full_name,
        }
    }
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => Utc.timestamp_opt(at, 0).single(),
            (None, Some(secs)) => Some(Utc::now() + chrono::Duration::seconds(secs)),
            (None, None) => None,
        };

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into_session_user(),
        }
    }
}

/// Tokens handed back on the OAuth redirect (implicit flow)
#[derive(Debug, Clone, PartialEq, Eq)]
struct CallbackTokens {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// Read tokens from the fragment (or query) of the URL the provider redirected to
fn parse_callback(callback_url: &str) -> Result<CallbackTokens> {
    let url = Url::parse(callback_url.trim())
        .map_err(|e| Error::auth(format!("Invalid callback URL: {}", e)))?;

    let mut params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    if let Some(fragment) = url.fragment() {
        params.extend(url::form_urlencoded::parse(fragment.as_bytes()).into_owned());
    }

    if let Some(description) = params.get("error_description").or_else(|| params.get("error")) {
        return Err(Error::auth(description.clone()));
    }

    let access_token = params
        .remove("access_token")
        .ok_or_else(|| Error::auth("Callback URL does not contain an access token"))?;

    Ok(CallbackTokens {
        access_token,
        refresh_token: params.remove("refresh_token"),
        expires_in: params.get("expires_in").and_then(|v| v.parse().ok()),
    })
}

// =============================================================================
// Supabase identity provider
// =============================================================================

/// Identity provider backed by Supabase auth
pub struct SupabaseIdentityProvider {
    client: Client,
    base_url: String,
    anon_key: String,
    redirect_url: Option<String>,
    session_file: PathBuf,
    listeners: SessionListeners,
}

impl SupabaseIdentityProvider {
    pub fn new(settings: &SupabaseSettings, data_dir: &Path) -> Result<Self> {
        if settings.anon_key.trim().is_empty() {
            return Err(Error::config("Supabase anon key cannot be empty"));
        }
        Url::parse(&settings.url)
            .map_err(|e| Error::config(format!("Invalid Supabase URL '{}': {}", settings.url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        fs::create_dir_all(data_dir)?;

        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            anon_key: settings.anon_key.clone(),
            redirect_url: settings.redirect_url.clone(),
            session_file: data_dir.join("session.json"),
            listeners: SessionListeners::new(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// URL the user opens in a browser to start a federated login
    pub fn authorize_url(&self, provider: OAuthProvider) -> Result<String> {
        let mut params = vec![("provider", provider.as_str().to_string())];
        if let Some(redirect) = &self.redirect_url {
            params.push(("redirect_to", redirect.clone()));
        }
        let url = Url::parse_with_params(&self.endpoint("authorize"), &params)
            .map_err(|e| Error::auth(format!("Unable to build authorize URL: {}", e)))?;
        Ok(url.to_string())
    }

    // -------------------------------------------------------------------------
    // Session persistence
    // -------------------------------------------------------------------------

    fn load_session(&self) -> Result<Option<Session>> {
        if !self.session_file.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.session_file)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn store_session(&self, session: &Session) -> Result<()> {
        let content = serde_json::to_string_pretty(session)?;
        fs::write(&self.session_file, content)?;
        Ok(())
    }

    fn clear_session(&self) -> Result<()> {
        if self.session_file.exists() {
            fs::remove_file(&self.session_file)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // HTTP helpers
    // -------------------------------------------------------------------------

    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Other(format!(
                "Connection timed out after {} seconds",
                REQUEST_TIMEOUT_SECS
            ))
        } else if error.is_connect() {
            Error::Other("Unable to connect to the authentication server".to_string())
        } else {
            Error::Other(format!("Auth request failed: {}", error))
        }
    }

    /// Turn a non-success response into an auth error carrying GoTrue's message
    async fn check_response(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| match status.as_u16() {
                429 => "Too many requests. Please wait a moment and try again.".to_string(),
                code => format!("Auth service error: HTTP {}", code),
            });
        Err(Error::auth(message))
    }

    async fn token_grant(&self, grant_type: &str, body: JsonValue) -> Result<Session> {
        let response = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let response = self.check_response(response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Other(format!("Failed to parse token response: {}", e)))?;
        Ok(token.into_session())
    }

    async fn fetch_user(&self, access_token: &str) -> Result<SessionUser> {
        let response = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let response = self.check_response(response).await?;
        let user: GoTrueUser = response
            .json()
            .await
            .map_err(|e| Error::Other(format!("Failed to parse user response: {}", e)))?;
        Ok(user.into_session_user())
    }

    fn start_session(&self, session: Session, event: AuthChangeEvent) -> Result<Session> {
        self.store_session(&session)?;
        self.listeners.emit(&SessionChange {
            event,
            session: Some(session.clone()),
        });
        Ok(session)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn get_session(&self) -> Result<Option<Session>> {
        let Some(session) = self.load_session()? else {
            return Ok(None);
        };

        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            self.clear_session()?;
            return Ok(None);
        };

        match self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(refreshed) => Ok(Some(
                self.start_session(refreshed, AuthChangeEvent::TokenRefreshed)?,
            )),
            // Rejected refresh token: the session is gone for good
            Err(Error::Auth(_)) => {
                self.clear_session()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let session = self
            .token_grant(
                "password",
                json!({ "email": email.trim(), "password": password }),
            )
            .await?;
        self.start_session(session, AuthChangeEvent::SignedIn)
    }

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Session> {
        let response = self
            .client
            .post(self.endpoint("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": email.trim(),
                "password": password,
                "data": { "full_name": full_name.trim() },
            }))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let response = self.check_response(response).await?;
        let signup: SignupResponse = response
            .json()
            .await
            .map_err(|e| Error::Other(format!("Failed to parse signup response: {}", e)))?;

        match signup {
            SignupResponse::Session(token) => {
                self.start_session(token.into_session(), AuthChangeEvent::SignedIn)
            }
            SignupResponse::PendingConfirmation(_) => Err(Error::auth(
                "Check your email to confirm your account, then log in",
            )),
        }
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<OAuthRedirect> {
        Ok(OAuthRedirect {
            provider,
            url: self.authorize_url(provider)?,
            completed: false,
        })
    }

    async fn complete_oauth(&self, callback_url: &str) -> Result<Session> {
        let tokens = parse_callback(callback_url)?;
        let user = self.fetch_user(&tokens.access_token).await?;

        let session = Session {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
            user,
        };
        self.start_session(session, AuthChangeEvent::SignedIn)
    }

    async fn sign_out(&self) -> Result<()> {
        let session = self.load_session().ok().flatten();

        let outcome = match session {
            Some(session) => match self
                .client
                .post(self.endpoint("logout"))
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await
            {
                Ok(response) => self.check_response(response).await.map(|_| ()),
                Err(e) => Err(self.map_request_error(e)),
            },
            None => Ok(()),
        };

        // The local copy goes away even when the server call failed
        self.clear_session()?;
        self.listeners.emit(&SessionChange::signed_out());
        outcome
    }

    fn on_session_change(&self, handler: SessionHandler) -> Subscription {
        self.listeners.subscribe(handler)
    }
}
