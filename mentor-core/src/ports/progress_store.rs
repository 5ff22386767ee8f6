//! Progress store port - durable journey state keyed by user id

use crate::domain::result::Result;
use crate::domain::{AssessmentRecord, JourneyProgress};

/// Journey persistence abstraction
///
/// The identity provider only knows who the user is; premium status,
/// phase state and submitted assessments live behind this trait.
pub trait ProgressStore: Send + Sync {
    /// Get the stored progress for a user
    fn get_progress(&self, user_id: &str) -> Result<Option<JourneyProgress>>;

    /// Insert or replace the progress for a user
    fn save_progress(&self, progress: &JourneyProgress) -> Result<()>;

    /// Record a submitted assessment
    fn save_assessment(&self, record: &AssessmentRecord) -> Result<()>;

    /// Most recent assessment submitted by a user
    fn get_latest_assessment(&self, user_id: &str) -> Result<Option<AssessmentRecord>>;
}
