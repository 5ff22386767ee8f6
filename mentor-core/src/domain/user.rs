//! User domain model

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::progress::JourneyProgress;
use super::session::SessionUser;

/// The authenticated user together with their journey state
///
/// Serialized with camelCase keys; this is also the on-disk shape used by
/// the local identity backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default = "first_phase")]
    pub current_phase: u32,
    #[serde(default)]
    pub completed_phases: BTreeSet<u32>,
}

fn first_phase() -> u32 {
    1
}

impl User {
    /// Create a user at the start of the journey
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: Option<&str>) -> Self {
        let email = email.into();
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => email_local_part(&email).to_string(),
        };

        Self {
            id: id.into(),
            email,
            name,
            is_premium: false,
            current_phase: first_phase(),
            completed_phases: BTreeSet::new(),
        }
    }

    /// Derive a user from a provider session, with default journey state
    pub fn from_session(user: &SessionUser) -> Self {
        Self::new(&user.id, &user.email, user.full_name.as_deref())
    }

    /// Overlay durable journey state onto this user
    pub fn with_progress(mut self, progress: &JourneyProgress) -> Self {
        self.is_premium = progress.is_premium;
        self.current_phase = progress.current_phase.max(1);
        self.completed_phases = progress
            .completed_phases
            .iter()
            .copied()
            .filter(|p| *p > 0)
            .collect();
        self
    }

    /// Drop completed phases that cannot precede the current one
    pub fn normalized(mut self) -> Self {
        self.current_phase = self.current_phase.max(1);
        let current = self.current_phase;
        self.completed_phases.retain(|p| *p > 0 && *p < current);
        self
    }

    /// Journey state snapshot for persistence
    pub fn progress(&self) -> JourneyProgress {
        JourneyProgress::new(
            &self.id,
            self.is_premium,
            self.current_phase,
            self.completed_phases.clone(),
        )
    }
}

/// The part of an email address before the `@`
fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation_defaults() {
        let user = User::new("user-123", "test@example.com", Some("Test User"));
        assert_eq!(user.id, "user-123");
        assert_eq!(user.name, "Test User");
        assert!(!user.is_premium);
        assert_eq!(user.current_phase, 1);
        assert!(user.completed_phases.is_empty());
    }

    #[test]
    fn test_name_falls_back_to_email_local_part() {
        assert_eq!(User::new("1", "jane.doe@example.com", None).name, "jane.doe");
        assert_eq!(User::new("1", "jane.doe@example.com", Some("  ")).name, "jane.doe");
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut user = User::new("abc", "ada@example.com", Some("Ada"));
        user.is_premium = true;
        user.current_phase = 3;
        user.completed_phases = [2, 1].into_iter().collect();

        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"isPremium\":true"));
        assert!(json.contains("\"currentPhase\":3"));
        assert!(json.contains("\"completedPhases\":[1,2]"));

        let restored: User = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, user);
    }

    #[test]
    fn test_deserialize_collapses_duplicate_phases() {
        let json = r#"{"id":"1","email":"a@b.c","name":"a","isPremium":false,"currentPhase":3,"completedPhases":[2,1,2]}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.completed_phases.len(), 2);
    }

    #[test]
    fn test_normalized_drops_phases_outside_journey() {
        let json = r#"{"id":"1","email":"a@b.c","name":"a","isPremium":false,"currentPhase":2,"completedPhases":[0,1,2,5]}"#;
        let user: User = serde_json::from_str::<User>(json).unwrap().normalized();
        assert_eq!(user.current_phase, 2);
        assert_eq!(user.completed_phases, [1].into_iter().collect());

        let mut zero = User::new("1", "a@b.c", None);
        zero.current_phase = 0;
        assert_eq!(zero.normalized().current_phase, 1);
    }

    #[test]
    fn test_with_progress_drops_non_positive_phases() {
        let user = User::new("1", "a@b.c", None);
        let progress = JourneyProgress::new("1", true, 2, [0, 1].into_iter().collect());
        let user = user.with_progress(&progress);
        assert!(user.is_premium);
        assert_eq!(user.current_phase, 2);
        assert_eq!(user.completed_phases, [1].into_iter().collect());
    }
}
