//! Mentor Core - journey and progression logic for the MentorAI coaching app
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (User, Phase, Route, Session, ...)
//! - **ports**: Trait definitions for external dependencies (IdentityProvider, ProgressStore)
//! - **services**: Business rules (session store, journey, guard, gating, assessment)
//! - **adapters**: Concrete implementations (local accounts, Supabase, DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbProgressStore;
use adapters::local::LocalIdentityProvider;
use adapters::supabase::SupabaseIdentityProvider;
use config::{AuthBackend, Config};
use ports::{IdentityProvider, ProgressStore};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{OAuthProvider, Phase, PhaseStatus, Route, Skill, User};
pub use services::{EntryPoint, LogEvent, LoggingService};

/// Main context for Mentor operations
///
/// Owns the session store for the lifetime of the application. Create it
/// at startup, call `initialize`, and `shutdown` when done (dropping it
/// does the same).
pub struct MentorContext {
    pub config: Config,
    pub mentor_dir: PathBuf,
    pub progress: Arc<DuckDbProgressStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub logger: Option<Arc<LoggingService>>,
    pub session: SessionStore,
    pub assessment_service: AssessmentService,
}

impl MentorContext {
    /// Create a new Mentor context
    ///
    /// The identity backend comes from configuration; exactly one is used.
    pub fn new(mentor_dir: &Path, logger: Option<Arc<LoggingService>>) -> Result<Self> {
        let config = Config::load(mentor_dir)?;

        let identity: Arc<dyn IdentityProvider> = match config.auth_backend {
            AuthBackend::Local => Arc::new(LocalIdentityProvider::new(mentor_dir)?),
            AuthBackend::Supabase => {
                let settings = config.supabase_settings()?;
                Arc::new(SupabaseIdentityProvider::new(&settings, mentor_dir)?)
            }
        };

        Self::with_provider(mentor_dir, config, identity, logger)
    }

    /// Create a context around an already constructed identity provider
    pub fn with_provider(
        mentor_dir: &Path,
        config: Config,
        identity: Arc<dyn IdentityProvider>,
        logger: Option<Arc<LoggingService>>,
    ) -> Result<Self> {
        let progress = Arc::new(DuckDbProgressStore::new(&mentor_dir.join("mentor.duckdb"))?);
        progress.ensure_schema()?;

        let session = SessionStore::new(
            Arc::clone(&identity),
            Arc::clone(&progress) as Arc<dyn ProgressStore>,
            logger.clone(),
        );
        let assessment_service =
            AssessmentService::new(Arc::clone(&progress) as Arc<dyn ProgressStore>);

        Ok(Self {
            config,
            mentor_dir: mentor_dir.to_path_buf(),
            progress,
            identity,
            logger,
            session,
            assessment_service,
        })
    }

    /// Resolve the startup session check
    pub async fn initialize(&self) -> Result<SessionSnapshot> {
        Ok(self.session.initialize().await?)
    }

    /// Guarded navigation to `route`
    pub fn navigate(&self, route: &Route) -> Result<GuardDecision> {
        let snapshot = self.session.snapshot()?;
        let state = AuthState::from_snapshot(snapshot.loading, snapshot.user.is_some());
        let decision = check_access(state, route);

        if let (Some(logger), GuardDecision::Redirect(_)) = (&self.logger, &decision) {
            let _ = logger.log(LogEvent::new("route_redirected").with_page(route.path()));
        }
        Ok(decision)
    }

    /// Tear down the session store
    pub fn shutdown(&self) {
        self.session.dispose();
    }
}
