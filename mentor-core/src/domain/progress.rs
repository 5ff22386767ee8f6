//! Durable journey progress, keyed by user id

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Premium and phase state kept apart from the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyProgress {
    pub user_id: String,
    pub is_premium: bool,
    pub current_phase: u32,
    pub completed_phases: BTreeSet<u32>,
    pub updated_at: DateTime<Utc>,
}

impl JourneyProgress {
    pub fn new(
        user_id: impl Into<String>,
        is_premium: bool,
        current_phase: u32,
        completed_phases: BTreeSet<u32>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            is_premium,
            current_phase,
            completed_phases,
            updated_at: Utc::now(),
        }
    }
}
