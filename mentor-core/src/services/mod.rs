//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod assessment;
pub mod gating;
pub mod guard;
pub mod journey;
pub mod logging;
pub mod migration;
pub mod session;

pub use assessment::{learning_path_unlocked, AssessmentService, NextStep, ResultsView, SubmitResult};
pub use gating::{click_phase, phase_view, phase_views, PhaseClick, PhaseView};
pub use guard::{check_access, AuthState, GuardDecision};
pub use journey::{advance_phase, compute_phase_status, needs_premium, overall_progress};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use session::{SessionSnapshot, SessionStore};
