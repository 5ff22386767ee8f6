//! Identity provider port
//!
//! Defines the capability interface every authentication backend offers
//! (local simulated accounts, Supabase, ...), plus the subscription
//! plumbing used to push session changes to interested parties.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{OAuthProvider, Session, SessionChange, User};

/// Callback invoked with every session change
pub type SessionHandler = Arc<dyn Fn(&SessionChange) + Send + Sync>;

/// Outcome of starting a federated login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OAuthRedirect {
    pub provider: OAuthProvider,
    /// URL the user has to visit to continue the flow
    pub url: String,
    /// True when the backend finished the flow on its own and a
    /// `SignedIn` notification has already been pushed
    pub completed: bool,
}

/// Identity provider trait
///
/// Implementations wrap an external authentication service. Errors are
/// returned as `Error::Auth` carrying the provider's own message; callers
/// add the operation prefix.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Backend name (e.g., "local", "supabase")
    fn name(&self) -> &str;

    /// Query the provider for the current session
    ///
    /// Transport failures are returned as errors so they can be recorded;
    /// the session store treats any error as "no session".
    async fn get_session(&self) -> Result<Option<Session>>;

    /// Sign in with email and password
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    /// Register a new account, storing `full_name` as profile metadata
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Session>;

    /// Start a redirect-based federated login
    ///
    /// Does not return a session; it arrives later through
    /// `on_session_change`.
    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<OAuthRedirect>;

    /// Finish a federated login from the URL the provider redirected to
    async fn complete_oauth(&self, callback_url: &str) -> Result<Session>;

    /// Terminate the external session
    async fn sign_out(&self) -> Result<()>;

    /// Register for session-change notifications
    ///
    /// The handler stays registered until the returned `Subscription` is
    /// dropped or unsubscribed.
    fn on_session_change(&self, handler: SessionHandler) -> Subscription;

    /// Mirror the derived user record into provider-side storage
    ///
    /// Only backends that keep their own copy of the user need this.
    fn persist_user(&self, _user: &User) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    handlers: BTreeMap<u64, SessionHandler>,
}

/// Registry of session-change handlers
///
/// Adapters own one of these and call `emit` whenever the session changes.
/// Handlers are invoked in registration order, outside the registry lock,
/// so a handler may safely unsubscribe itself.
#[derive(Clone, Default)]
pub struct SessionListeners {
    table: Arc<Mutex<ListenerTable>>,
}

impl SessionListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: SessionHandler) -> Subscription {
        let mut table = match self.table.lock() {
            Ok(t) => t,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = table.next_id;
        table.next_id += 1;
        table.handlers.insert(id, handler);

        Subscription {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    /// Push a change to every registered handler
    pub fn emit(&self, change: &SessionChange) {
        let handlers: Vec<SessionHandler> = match self.table.lock() {
            Ok(t) => t.handlers.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().handlers.values().cloned().collect(),
        };

        for handler in handlers {
            handler(change);
        }
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.handlers.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Disposer for a session-change registration
///
/// Dropping it unsubscribes; `unsubscribe` does the same explicitly.
#[must_use = "dropping a Subscription immediately unsubscribes the handler"]
pub struct Subscription {
    id: u64,
    table: Weak<Mutex<ListenerTable>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }

    fn detach(&self) {
        if let Some(table) = self.table.upgrade() {
            let mut table = match table.lock() {
                Ok(t) => t,
                Err(poisoned) => poisoned.into_inner(),
            };
            table.handlers.remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
