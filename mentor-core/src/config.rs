//! Configuration management
//!
//! Settings live in `settings.json` inside the mentor directory:
//! ```json
//! {
//!   "auth": {
//!     "backend": "supabase",
//!     "supabaseUrl": "https://xyzcompany.supabase.co",
//!     "supabaseAnonKey": "public-anon-key",
//!     "redirectUrl": "http://localhost:3000/dashboard"
//!   }
//! }
//! ```
//! Keys this crate doesn't know about are preserved on save.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Which identity backend a deployment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthBackend {
    /// Simulated accounts stored in the mentor directory
    #[default]
    Local,
    /// Supabase GoTrue auth service
    Supabase,
}

impl AuthBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthBackend::Local => "local",
            AuthBackend::Supabase => "supabase",
        }
    }
}

impl fmt::Display for AuthBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "demo" => Ok(AuthBackend::Local),
            "supabase" => Ok(AuthBackend::Supabase),
            other => bail!("Unknown auth backend '{}' (expected local or supabase)", other),
        }
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    auth: AuthSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSettings {
    #[serde(default)]
    backend: AuthBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    supabase_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    supabase_anon_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    redirect_url: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Connection settings for the Supabase backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseSettings {
    pub url: String,
    pub anon_key: String,
    pub redirect_url: Option<String>,
}

/// Mentor configuration (simplified view of settings)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub auth_backend: AuthBackend,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub redirect_url: Option<String>,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the mentor directory
    ///
    /// Environment overrides (for CI and deployments):
    /// `MENTOR_AUTH_BACKEND`, `SUPABASE_URL`, `SUPABASE_ANON_KEY`.
    pub fn load(mentor_dir: &Path) -> Result<Self> {
        Self::load_with_env(mentor_dir, |key| std::env::var(key).ok())
    }

    fn load_with_env(mentor_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let settings_path = mentor_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let auth_backend = match env("MENTOR_AUTH_BACKEND") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => raw.auth.backend,
        };

        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Ok(Self {
            auth_backend,
            supabase_url: non_empty(env("SUPABASE_URL")).or_else(|| raw.auth.supabase_url.clone()),
            supabase_anon_key: non_empty(env("SUPABASE_ANON_KEY"))
                .or_else(|| raw.auth.supabase_anon_key.clone()),
            redirect_url: raw.auth.redirect_url.clone(),
            _raw_settings: raw,
        })
    }

    /// Save config to the mentor directory
    /// Preserves other settings that the CLI doesn't manage
    pub fn save(&self, mentor_dir: &Path) -> Result<()> {
        let settings_path = mentor_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        settings.auth.backend = self.auth_backend;
        settings.auth.supabase_url = self.supabase_url.clone();
        settings.auth.supabase_anon_key = self.supabase_anon_key.clone();
        settings.auth.redirect_url = self.redirect_url.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Settings for the Supabase backend
    ///
    /// Fails if the URL or anon key is missing.
    pub fn supabase_settings(&self) -> Result<SupabaseSettings> {
        match (&self.supabase_url, &self.supabase_anon_key) {
            (Some(url), Some(anon_key)) => Ok(SupabaseSettings {
                url: url.clone(),
                anon_key: anon_key.clone(),
                redirect_url: self.redirect_url.clone(),
            }),
            _ => bail!(
                "Supabase backend selected but supabaseUrl/supabaseAnonKey are not configured \
                 (set them in settings.json or via SUPABASE_URL and SUPABASE_ANON_KEY)"
            ),
        }
    }
}
