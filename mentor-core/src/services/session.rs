//! Session store - the single holder of the current user
//!
//! Lives as long as the application context. It tracks `{user, loading}`,
//! follows identity provider notifications, and is the only writer of the
//! journey fields on `User` (persisted through the progress store).
//!
//! After `dispose()` the provider subscription is gone, late notifications
//! and in-flight completions are dropped, and reads fail with
//! `Error::ContextMisuse`.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{OAuthProvider, Phase, SessionChange, SessionUser, User};
use crate::ports::{IdentityProvider, OAuthRedirect, ProgressStore, SessionHandler, Subscription};
use crate::services::journey;
use crate::services::logging::{LogEvent, LoggingService};

/// Point-in-time view of the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub loading: bool,
}

struct StoreState {
    user: Option<User>,
    loading: bool,
    /// Explicit operations currently running
    in_flight: u32,
    disposed: bool,
}

struct StoreInner {
    state: Mutex<StoreState>,
    provider: Arc<dyn IdentityProvider>,
    progress: Arc<dyn ProgressStore>,
    logger: Option<Arc<LoggingService>>,
}

impl StoreInner {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record an event; logging problems never surface to callers
    fn record(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event.with_backend(self.provider.name()));
        }
    }

    /// Build the user for a session, overlaying stored journey progress
    fn derive_user(&self, session_user: &SessionUser) -> User {
        let user = User::from_session(session_user);
        match self.progress.get_progress(&user.id) {
            Ok(Some(progress)) => user.with_progress(&progress),
            Ok(None) => user,
            Err(e) => {
                self.record(LogEvent::new("progress_lookup_failed").with_error(e.to_string()));
                user
            }
        }
    }

    /// Replace the user record; dropped once disposed
    fn set_user(&self, user: Option<User>) -> bool {
        let mut state = self.state();
        if state.disposed {
            return false;
        }
        state.user = user;
        true
    }

    /// Loading stays on until every started operation has finished
    fn begin(&self) {
        let mut state = self.state();
        if !state.disposed {
            state.in_flight += 1;
            state.loading = true;
        }
    }

    fn finish(&self) {
        let mut state = self.state();
        if !state.disposed {
            state.in_flight = state.in_flight.saturating_sub(1);
            state.loading = state.in_flight > 0;
        }
    }

    fn apply_change(&self, change: &SessionChange) {
        let user = change
            .session
            .as_ref()
            .map(|session| self.derive_user(&session.user));

        let mut state = self.state();
        if state.disposed {
            return;
        }
        state.user = user;
        if state.in_flight == 0 {
            state.loading = false;
        }
    }

    /// Adopt a freshly derived user and mirror it to the provider
    fn commit_user(&self, user: User) -> User {
        if self.set_user(Some(user.clone())) {
            if let Err(e) = self.provider.persist_user(&user) {
                self.record(LogEvent::new("user_persist_failed").with_error(e.to_string()));
            }
        }
        user
    }
}

fn disposed_error() -> Error {
    Error::ContextMisuse(
        "session state used after the application context was shut down".to_string(),
    )
}

/// Application-scoped session/user state
pub struct SessionStore {
    inner: Arc<StoreInner>,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionStore {
    /// Create the store and subscribe to provider notifications
    ///
    /// Starts out loading with no user; call `initialize` to look up an
    /// existing session.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        progress: Arc<dyn ProgressStore>,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        let inner = Arc::new(StoreInner {
            state: Mutex::new(StoreState {
                user: None,
                loading: true,
                in_flight: 0,
                disposed: false,
            }),
            provider,
            progress,
            logger,
        });

        let weak: Weak<StoreInner> = Arc::downgrade(&inner);
        let handler: SessionHandler = Arc::new(move |change: &SessionChange| {
            if let Some(inner) = weak.upgrade() {
                inner.apply_change(change);
            }
        });
        let subscription = inner.provider.on_session_change(handler);

        Self {
            inner,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.inner.state().disposed {
            return Err(disposed_error());
        }
        Ok(())
    }

    /// Name of the identity backend in use
    pub fn backend(&self) -> &str {
        self.inner.provider.name()
    }

    /// Look up an existing session
    ///
    /// Lookup failures are logged and treated as "no session". Loading is
    /// cleared whatever the outcome.
    pub async fn initialize(&self) -> Result<SessionSnapshot> {
        self.ensure_live()?;
        self.inner.begin();

        let user = match self.inner.provider.get_session().await {
            Ok(Some(session)) => Some(self.inner.derive_user(&session.user)),
            Ok(None) => None,
            Err(e) => {
                let lookup = Error::SessionLookup(e.to_string());
                self.inner
                    .record(LogEvent::new("session_lookup_failed").with_error(lookup.to_string()));
                None
            }
        };

        match user {
            Some(user) => {
                self.inner.commit_user(user);
            }
            None => {
                self.inner.set_user(None);
            }
        }
        self.inner.finish();
        self.snapshot()
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        let state = self.inner.state();
        if state.disposed {
            return Err(disposed_error());
        }
        Ok(SessionSnapshot {
            user: state.user.clone(),
            loading: state.loading,
        })
    }

    pub fn user(&self) -> Result<Option<User>> {
        Ok(self.snapshot()?.user)
    }

    pub fn is_loading(&self) -> Result<bool> {
        Ok(self.snapshot()?.loading)
    }

    /// Credential login
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        self.ensure_live()?;
        self.inner.begin();

        let outcome = match self.inner.provider.sign_in_with_password(email, password).await {
            Ok(session) => {
                let user = self.inner.derive_user(&session.user);
                self.inner.record(LogEvent::new("login_succeeded"));
                Ok(self.inner.commit_user(user))
            }
            Err(e) => {
                self.inner
                    .record(LogEvent::new("login_failed").with_error(e.to_string()));
                Err(Error::auth(format!("Login failed: {}", e)))
            }
        };

        self.inner.finish();
        outcome
    }

    /// Account registration
    pub async fn signup(&self, email: &str, password: &str, name: &str) -> Result<User> {
        self.ensure_live()?;
        self.inner.begin();

        let outcome = match self.inner.provider.sign_up(email, password, name).await {
            Ok(session) => {
                let user = self.inner.derive_user(&session.user);
                self.inner.record(LogEvent::new("signup_succeeded"));
                Ok(self.inner.commit_user(user))
            }
            Err(e) => {
                self.inner
                    .record(LogEvent::new("signup_failed").with_error(e.to_string()));
                Err(Error::auth(format!("Signup failed: {}", e)))
            }
        };

        self.inner.finish();
        outcome
    }

    /// Start a federated login
    ///
    /// The session arrives through the provider notification; when the
    /// backend could not finish on its own the caller continues with
    /// `complete_federated_login`.
    pub async fn federated_login(&self, provider: OAuthProvider) -> Result<OAuthRedirect> {
        self.ensure_live()?;
        self.inner.begin();

        let outcome = match self.inner.provider.sign_in_with_oauth(provider).await {
            Ok(redirect) => {
                self.inner.record(LogEvent::new("oauth_started"));
                if redirect.completed {
                    if let Ok(Some(user)) = self.user() {
                        self.inner.commit_user(user);
                    }
                }
                Ok(redirect)
            }
            Err(e) => {
                self.inner.record(
                    LogEvent::new("oauth_failed")
                        .with_error(e.to_string())
                        .with_error_details(format!("provider: {}", provider)),
                );
                Err(Error::auth(format!("{} login failed: {}", provider, e)))
            }
        };

        self.inner.finish();
        outcome
    }

    /// Finish a federated login from the provider's redirect URL
    pub async fn complete_federated_login(
        &self,
        provider: OAuthProvider,
        callback_url: &str,
    ) -> Result<User> {
        self.ensure_live()?;
        self.inner.begin();

        let outcome = match self.inner.provider.complete_oauth(callback_url).await {
            Ok(session) => {
                let user = self.inner.derive_user(&session.user);
                self.inner.record(LogEvent::new("oauth_succeeded"));
                Ok(self.inner.commit_user(user))
            }
            Err(e) => {
                self.inner.record(
                    LogEvent::new("oauth_failed")
                        .with_error(e.to_string())
                        .with_error_details(format!("provider: {}", provider)),
                );
                Err(Error::auth(format!("{} login failed: {}", provider, e)))
            }
        };

        self.inner.finish();
        outcome
    }

    /// Sign out
    ///
    /// The local user is cleared even when the provider call fails; the
    /// failure is still reported.
    pub async fn logout(&self) -> Result<()> {
        self.ensure_live()?;

        self.inner.begin();
        let result = self.inner.provider.sign_out().await;
        self.inner.set_user(None);
        self.inner.finish();

        match result {
            Ok(()) => {
                self.inner.record(LogEvent::new("logout"));
                Ok(())
            }
            Err(e) => {
                self.inner
                    .record(LogEvent::new("logout_failed").with_error(e.to_string()));
                Err(Error::auth(format!("Logout failed: {}", e)))
            }
        }
    }

    /// Move the current user to `new_phase` and persist it
    ///
    /// Returns `None` (and changes nothing) when nobody is signed in.
    pub fn advance_phase(&self, new_phase: u32) -> Result<Option<User>> {
        let current = self.user()?;
        let Some(next) = journey::advance_phase(current.as_ref(), new_phase) else {
            return Ok(None);
        };
        if Some(&next) == current.as_ref() {
            return Ok(Some(next));
        }

        self.inner.progress.save_progress(&next.progress())?;
        let mut event = LogEvent::new("phase_advanced");
        if let Some(phase) = Phase::from_id(new_phase) {
            event = event.with_page(phase.route().path());
        }
        self.inner.record(event);
        Ok(Some(self.inner.commit_user(next)))
    }

    /// Grant premium to the current user and persist it
    pub fn upgrade_to_premium(&self) -> Result<Option<User>> {
        let Some(mut user) = self.user()? else {
            return Ok(None);
        };
        if user.is_premium {
            return Ok(Some(user));
        }

        user.is_premium = true;
        self.inner.progress.save_progress(&user.progress())?;
        self.inner.record(LogEvent::new("premium_upgraded"));
        Ok(Some(self.inner.commit_user(user)))
    }

    /// Tear the store down
    ///
    /// Idempotent. Unsubscribes from the provider; anything arriving later
    /// is ignored.
    pub fn dispose(&self) {
        self.inner.state().disposed = true;
        let subscription = match self.subscription.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state().disposed
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbProgressStore;
    use crate::domain::{JourneyProgress, Session};
    use crate::ports::SessionListeners;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Scriptable in-process provider
    #[derive(Default)]
    struct FakeProvider {
        listeners: SessionListeners,
        session: Mutex<Option<Session>>,
        fail_lookup: AtomicBool,
        fail_sign_in: AtomicBool,
        fail_sign_out: AtomicBool,
        // When set, sign in waits for the test to flip it back
        gate: Mutex<Option<tokio::sync::oneshot::Receiver<()>>>,
    }

    impl FakeProvider {
        fn session_for(id: &str, email: &str) -> Session {
            Session {
                access_token: format!("token-{}", id),
                refresh_token: None,
                expires_at: None,
                user: SessionUser {
                    id: id.to_string(),
                    email: email.to_string(),
                    full_name: None,
                },
            }
        }

        fn push(&self, change: SessionChange) {
            self.listeners.emit(&change);
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn get_session(&self) -> Result<Option<Session>> {
            if self.fail_lookup.load(Ordering::SeqCst) {
                return Err(Error::Other("network unreachable".to_string()));
            }
            Ok(self.session.lock().unwrap().clone())
        }

        async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<Session> {
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            if self.fail_sign_in.load(Ordering::SeqCst) {
                return Err(Error::auth("Invalid login credentials"));
            }
            let session = Self::session_for("u1", email);
            *self.session.lock().unwrap() = Some(session.clone());
            Ok(session)
        }

        async fn sign_up(&self, email: &str, _password: &str, full_name: &str) -> Result<Session> {
            if self.fail_sign_in.load(Ordering::SeqCst) {
                return Err(Error::auth("User already registered"));
            }
            let mut session = Self::session_for("u2", email);
            session.user.full_name = Some(full_name.to_string());
            *self.session.lock().unwrap() = Some(session.clone());
            Ok(session)
        }

        async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<OAuthRedirect> {
            if self.fail_sign_in.load(Ordering::SeqCst) {
                return Err(Error::auth("redirect blocked"));
            }
            let session = Self::session_for("u3", &format!("user@{}.com", provider));
            *self.session.lock().unwrap() = Some(session.clone());
            self.listeners.emit(&SessionChange::signed_in(session));
            Ok(OAuthRedirect {
                provider,
                url: "fake://oauth".to_string(),
                completed: true,
            })
        }

        async fn complete_oauth(&self, _callback_url: &str) -> Result<Session> {
            Err(Error::auth("no flow"))
        }

        async fn sign_out(&self) -> Result<()> {
            *self.session.lock().unwrap() = None;
            if self.fail_sign_out.load(Ordering::SeqCst) {
                return Err(Error::Other("network unreachable".to_string()));
            }
            Ok(())
        }

        fn on_session_change(&self, handler: SessionHandler) -> Subscription {
            self.listeners.subscribe(handler)
        }
    }

    fn store_with(provider: &Arc<FakeProvider>) -> (SessionStore, Arc<DuckDbProgressStore>) {
        let progress = Arc::new(DuckDbProgressStore::in_memory().unwrap());
        progress.ensure_schema().unwrap();
        let store = SessionStore::new(
            Arc::clone(provider) as Arc<dyn IdentityProvider>,
            Arc::clone(&progress) as Arc<dyn ProgressStore>,
            None,
        );
        (store, progress)
    }

    #[tokio::test]
    async fn test_starts_loading_then_resolves_anonymous() {
        let provider = Arc::new(FakeProvider::default());
        let (store, _) = store_with(&provider);

        assert!(store.is_loading().unwrap());
        let snapshot = store.initialize().await.unwrap();
        assert!(!snapshot.loading);
        assert!(snapshot.user.is_none());
    }

    #[tokio::test]
    async fn test_initialize_restores_session_with_progress() {
        let provider = Arc::new(FakeProvider::default());
        *provider.session.lock().unwrap() = Some(FakeProvider::session_for("u1", "ana@example.com"));
        let (store, progress) = store_with(&provider);
        progress
            .save_progress(&JourneyProgress::new("u1", true, 2, BTreeSet::from([1])))
            .unwrap();

        let user = store.initialize().await.unwrap().user.unwrap();
        assert_eq!(user.name, "ana");
        assert!(user.is_premium);
        assert_eq!(user.current_phase, 2);
        assert_eq!(user.completed_phases, BTreeSet::from([1]));
    }

    #[tokio::test]
    async fn test_session_lookup_failure_is_anonymous() {
        let provider = Arc::new(FakeProvider::default());
        provider.fail_lookup.store(true, Ordering::SeqCst);
        let (store, _) = store_with(&provider);

        let snapshot = store.initialize().await.unwrap();
        assert!(snapshot.user.is_none());
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_login_failure_is_prefixed() {
        let provider = Arc::new(FakeProvider::default());
        provider.fail_sign_in.store(true, Ordering::SeqCst);
        let (store, _) = store_with(&provider);
        store.initialize().await.unwrap();

        let err = store.login("ana@example.com", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed: Invalid login credentials");
        assert!(!store.is_loading().unwrap());

        let err = store.signup("ana@example.com", "nope", "Ana").await.unwrap_err();
        assert_eq!(err.to_string(), "Signup failed: User already registered");

        let err = store.federated_login(OAuthProvider::Github).await.unwrap_err();
        assert_eq!(err.to_string(), "github login failed: redirect blocked");
    }

    #[tokio::test]
    async fn test_login_sets_user_and_toggles_loading() {
        let provider = Arc::new(FakeProvider::default());
        let (tx, rx) = tokio::sync::oneshot::channel();
        *provider.gate.lock().unwrap() = Some(rx);
        let (store, _) = store_with(&provider);
        store.initialize().await.unwrap();
        let store = Arc::new(store);

        let pending = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.login("ana@example.com", "pw").await })
        };
        tokio::task::yield_now().await;
        while !store.is_loading().unwrap() {
            tokio::task::yield_now().await;
        }

        tx.send(()).unwrap();
        let user = pending.await.unwrap().unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert!(!store.is_loading().unwrap());
        assert_eq!(store.user().unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_signup_uses_full_name() {
        let provider = Arc::new(FakeProvider::default());
        let (store, _) = store_with(&provider);
        store.initialize().await.unwrap();

        let user = store.signup("ana@example.com", "pw", "Ana Lopez").await.unwrap();
        assert_eq!(user.name, "Ana Lopez");
        assert_eq!(user.current_phase, 1);
        assert!(!user.is_premium);
    }

    #[tokio::test]
    async fn test_notifications_replace_user() {
        let provider = Arc::new(FakeProvider::default());
        let (store, _) = store_with(&provider);
        store.initialize().await.unwrap();

        provider.push(SessionChange::signed_in(FakeProvider::session_for("u9", "bo@example.com")));
        assert_eq!(store.user().unwrap().unwrap().id, "u9");

        provider.push(SessionChange::signed_out());
        assert!(store.user().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_federated_login_arrives_via_notification() {
        let provider = Arc::new(FakeProvider::default());
        let (store, _) = store_with(&provider);
        store.initialize().await.unwrap();

        let redirect = store.federated_login(OAuthProvider::Google).await.unwrap();
        assert!(redirect.completed);
        assert_eq!(store.user().unwrap().unwrap().email, "user@google.com");
    }

    #[tokio::test]
    async fn test_logout_clears_user_even_when_provider_fails() {
        let provider = Arc::new(FakeProvider::default());
        let (store, _) = store_with(&provider);
        store.initialize().await.unwrap();
        store.login("ana@example.com", "pw").await.unwrap();

        provider.fail_sign_out.store(true, Ordering::SeqCst);
        assert!(store.logout().await.is_err());
        assert!(store.user().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_advance_and_upgrade_persist() {
        let provider = Arc::new(FakeProvider::default());
        let (store, progress) = store_with(&provider);
        store.initialize().await.unwrap();
        store.login("ana@example.com", "pw").await.unwrap();

        let user = store.advance_phase(2).unwrap().unwrap();
        assert_eq!(user.completed_phases, BTreeSet::from([1]));
        let user = store.upgrade_to_premium().unwrap().unwrap();
        assert!(user.is_premium);

        let stored = progress.get_progress("u1").unwrap().unwrap();
        assert!(stored.is_premium);
        assert_eq!(stored.current_phase, 2);
        assert_eq!(stored.completed_phases, BTreeSet::from([1]));

        // A new login picks the stored journey back up
        store.logout().await.unwrap();
        let again = store.login("ana@example.com", "pw").await.unwrap();
        assert!(again.is_premium);
        assert_eq!(again.current_phase, 2);
    }

    #[tokio::test]
    async fn test_writers_are_noops_without_user() {
        let provider = Arc::new(FakeProvider::default());
        let (store, progress) = store_with(&provider);
        store.initialize().await.unwrap();

        assert!(store.advance_phase(2).unwrap().is_none());
        assert!(store.upgrade_to_premium().unwrap().is_none());
        assert!(progress.get_progress("u1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dispose_drops_late_notifications_and_blocks_reads() {
        let provider = Arc::new(FakeProvider::default());
        let (store, _) = store_with(&provider);
        store.initialize().await.unwrap();
        assert_eq!(provider.listeners.len(), 1);

        store.dispose();
        assert!(provider.listeners.is_empty());
        provider.push(SessionChange::signed_in(FakeProvider::session_for("u9", "bo@example.com")));

        assert!(matches!(store.snapshot(), Err(Error::ContextMisuse(_))));
        assert!(matches!(store.user(), Err(Error::ContextMisuse(_))));
        assert!(store.login("ana@example.com", "pw").await.is_err());

        // Idempotent
        store.dispose();
        assert!(store.is_disposed());
    }

    #[tokio::test]
    async fn test_in_flight_login_completing_after_dispose_is_dropped() {
        let provider = Arc::new(FakeProvider::default());
        let (tx, rx) = tokio::sync::oneshot::channel();
        *provider.gate.lock().unwrap() = Some(rx);
        let (store, _) = store_with(&provider);
        store.initialize().await.unwrap();
        let store = Arc::new(store);

        let pending = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.login("ana@example.com", "pw").await })
        };
        while !store.is_loading().unwrap() {
            tokio::task::yield_now().await;
        }

        store.dispose();
        tx.send(()).unwrap();
        let _ = pending.await.unwrap();

        assert!(store.inner.state().user.is_none());
    }

    #[tokio::test]
    async fn test_loading_stays_on_while_local_sign_in_notifies() {
        use crate::adapters::local::LocalIdentityProvider;

        let dir = tempfile::TempDir::new().unwrap();
        let provider = Arc::new(LocalIdentityProvider::new(dir.path()).unwrap());
        let progress = Arc::new(DuckDbProgressStore::in_memory().unwrap());
        progress.ensure_schema().unwrap();
        let store = Arc::new(SessionStore::new(
            Arc::clone(&provider) as Arc<dyn IdentityProvider>,
            progress as Arc<dyn ProgressStore>,
            None,
        ));
        store.initialize().await.unwrap();

        // Observes the store from inside each provider notification
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let weak = Arc::downgrade(&store);
        let _sub = provider.on_session_change(Arc::new(move |_: &SessionChange| {
            if let Some(store) = weak.upgrade() {
                sink.lock().unwrap().push(store.is_loading().unwrap());
            }
        }));

        store.signup("ana@example.com", "secret-pass", "Ana").await.unwrap();
        store.logout().await.unwrap();
        store.login("ana@example.com", "secret-pass").await.unwrap();

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|loading| *loading), "{:?}", seen);
        assert!(!store.is_loading().unwrap());
        assert!(store.user().unwrap().is_some());
    }
}
