//! Local simulated identity provider
//!
//! Keeps everything in the mentor directory:
//! - `accounts.json` - credential registry (Argon2id hashes, never plaintext)
//! - `user.json` - the signed-in user; absence means anonymous
//!
//! Federated logins complete immediately with a synthetic account.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use base64::Engine;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{OAuthProvider, Session, SessionChange, SessionUser, User};
use crate::ports::{IdentityProvider, OAuthRedirect, SessionHandler, SessionListeners, Subscription};

/// Argon2id parameters for stored credentials
const HASH_MEMORY_COST: u32 = 19456; // 19 MiB
const HASH_TIME_COST: u32 = 2;
const HASH_PARALLELISM: u32 = 1;
const HASH_LEN: usize = 32;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AccountRegistry {
    #[serde(default)]
    accounts: Vec<LocalAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalAccount {
    id: String,
    email: String,
    #[serde(default)]
    full_name: Option<String>,
    /// Base64 salt; absent for accounts created through federated login
    #[serde(default)]
    salt: Option<String>,
    /// Hex-encoded Argon2id hash
    #[serde(default)]
    password_hash: Option<String>,
}

impl LocalAccount {
    fn session_user(&self) -> SessionUser {
        SessionUser {
            id: self.id.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// Identity provider backed by JSON files in the mentor directory
pub struct LocalIdentityProvider {
    dir: PathBuf,
    listeners: SessionListeners,
    email_pattern: Regex,
    // Serializes registry read-modify-write cycles
    write_lock: Mutex<()>,
}

impl LocalIdentityProvider {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let email_pattern = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
            .map_err(|e| Error::Other(format!("Invalid email pattern: {}", e)))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            listeners: SessionListeners::new(),
            email_pattern,
            write_lock: Mutex::new(()),
        })
    }

    fn registry_file(&self) -> PathBuf {
        self.dir.join("accounts.json")
    }

    fn user_file(&self) -> PathBuf {
        self.dir.join("user.json")
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn load_registry(&self) -> Result<AccountRegistry> {
        let path = self.registry_file();
        if !path.exists() {
            return Ok(AccountRegistry::default());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save_registry(&self, registry: &AccountRegistry) -> Result<()> {
        let content = serde_json::to_string_pretty(registry)?;
        fs::write(self.registry_file(), content)?;
        Ok(())
    }

    /// The persisted user record, if someone is signed in
    pub fn stored_user(&self) -> Result<Option<User>> {
        let path = self.user_file();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let user: User = serde_json::from_str(&content)?;
        Ok(Some(user.normalized()))
    }

    fn store_user(&self, user: &User) -> Result<()> {
        let content = serde_json::to_string_pretty(user)?;
        fs::write(self.user_file(), content)?;
        Ok(())
    }

    fn clear_user(&self) -> Result<()> {
        let path = self.user_file();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Record `account` as signed in and notify subscribers
    fn start_session(&self, account: &LocalAccount) -> Result<Session> {
        let session_user = account.session_user();
        self.store_user(&User::from_session(&session_user))?;

        let session = local_session(session_user);
        self.listeners.emit(&SessionChange::signed_in(session.clone()));
        Ok(session)
    }

    fn validate_email(&self, email: &str) -> Result<String> {
        let email = email.trim().to_lowercase();
        if !self.email_pattern.is_match(&email) {
            return Err(Error::auth("Unable to validate email address: invalid format"));
        }
        Ok(email)
    }
}

fn local_session(user: SessionUser) -> Session {
    Session {
        access_token: format!("local-{}", user.id),
        refresh_token: None,
        expires_at: None,
        user,
    }
}

/// Derive a credential hash using Argon2id
fn hash_password(password: &str, salt: &[u8]) -> Result<String> {
    let params = argon2::Params::new(
        HASH_MEMORY_COST,
        HASH_TIME_COST,
        HASH_PARALLELISM,
        Some(HASH_LEN),
    )
    .map_err(|e| Error::Other(format!("Failed to create argon2 params: {:?}", e)))?;

    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut hash = vec![0u8; HASH_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut hash)
        .map_err(|e| Error::Other(format!("Failed to hash password: {:?}", e)))?;

    Ok(hex::encode(hash))
}

fn verify_password(account: &LocalAccount, password: &str) -> Result<bool> {
    let (Some(salt), Some(expected)) = (&account.salt, &account.password_hash) else {
        return Ok(false);
    };
    let salt = base64::engine::general_purpose::STANDARD
        .decode(salt)
        .map_err(|e| Error::Other(format!("Invalid salt in account registry: {}", e)))?;
    Ok(hash_password(password, &salt)? == *expected)
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn get_session(&self) -> Result<Option<Session>> {
        Ok(self.stored_user()?.map(|user| {
            local_session(SessionUser {
                id: user.id,
                email: user.email,
                full_name: Some(user.name),
            })
        }))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim().to_lowercase();
        let account = {
            let _guard = self.lock();
            self.load_registry()?
                .accounts
                .into_iter()
                .find(|a| a.email == email)
        };

        match account {
            Some(account) if verify_password(&account, password)? => self.start_session(&account),
            _ => Err(Error::auth("Invalid login credentials")),
        }
    }

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Session> {
        let email = self.validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::auth(format!(
                "Password should be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }

        let account = {
            let _guard = self.lock();
            let mut registry = self.load_registry()?;
            if registry.accounts.iter().any(|a| a.email == email) {
                return Err(Error::auth("User already registered"));
            }

            let salt: [u8; 16] = rand::thread_rng().gen();
            let full_name = full_name.trim();
            let account = LocalAccount {
                id: Uuid::new_v4().to_string(),
                email,
                full_name: (!full_name.is_empty()).then(|| full_name.to_string()),
                salt: Some(base64::engine::general_purpose::STANDARD.encode(salt)),
                password_hash: Some(hash_password(password, &salt)?),
            };
            registry.accounts.push(account.clone());
            self.save_registry(&registry)?;
            account
        };

        self.start_session(&account)
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<OAuthRedirect> {
        let email = format!("user@{}.com", provider.as_str());

        let account = {
            let _guard = self.lock();
            let mut registry = self.load_registry()?;
            match registry.accounts.iter().find(|a| a.email == email) {
                Some(existing) => existing.clone(),
                None => {
                    let account = LocalAccount {
                        id: Uuid::new_v4().to_string(),
                        email,
                        full_name: Some(format!("User from {}", provider.as_str())),
                        salt: None,
                        password_hash: None,
                    };
                    registry.accounts.push(account.clone());
                    self.save_registry(&registry)?;
                    account
                }
            }
        };

        self.start_session(&account)?;

        Ok(OAuthRedirect {
            provider,
            url: format!("local://oauth/{}", provider.as_str()),
            completed: true,
        })
    }

    async fn complete_oauth(&self, _callback_url: &str) -> Result<Session> {
        // Federated logins finish inside sign_in_with_oauth
        self.get_session()
            .await?
            .ok_or_else(|| Error::auth("No federated login in progress"))
    }

    async fn sign_out(&self) -> Result<()> {
        self.clear_user()?;
        self.listeners.emit(&SessionChange::signed_out());
        Ok(())
    }

    fn on_session_change(&self, handler: SessionHandler) -> Subscription {
        self.listeners.subscribe(handler)
    }

    fn persist_user(&self, user: &User) -> Result<()> {
        let _guard = self.lock();
        // Only refresh the record of whoever is signed in
        match self.stored_user()? {
            Some(current) if current.id == user.id => self.store_user(user),
            _ => Ok(()),
        }
    }
}
