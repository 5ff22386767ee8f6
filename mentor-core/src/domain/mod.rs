//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod assessment;
mod phase;
mod progress;
pub mod result;
mod route;
mod session;
mod user;

pub use assessment::{AssessmentRecord, Skill, MIN_RESPONSE_CHARS};
pub use phase::{Phase, PhaseStatus};
pub use progress::JourneyProgress;
pub use route::Route;
pub use session::{AuthChangeEvent, OAuthProvider, Session, SessionChange, SessionUser};
pub use user::User;
