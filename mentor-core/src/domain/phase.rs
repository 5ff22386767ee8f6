//! Journey phases

use std::fmt;

use serde::{Deserialize, Serialize};

use super::route::Route;

/// One of the three fixed stages of the guided journey
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Assessment,
    Results,
    LearningPath,
}

impl Phase {
    /// All phases in journey order
    pub const ALL: [Phase; 3] = [Phase::Assessment, Phase::Results, Phase::LearningPath];

    /// Number of phases in the journey
    pub const COUNT: usize = Self::ALL.len();

    /// Phase number, starting at 1
    pub fn id(self) -> u32 {
        match self {
            Phase::Assessment => 1,
            Phase::Results => 2,
            Phase::LearningPath => 3,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    pub fn title(self) -> &'static str {
        match self {
            Phase::Assessment => "AI-Powered Assessment",
            Phase::Results => "Assessment Results",
            Phase::LearningPath => "Personalized Learning Path",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Phase::Assessment => {
                "Take our comprehensive assessment to identify your unique strengths and growth areas."
            }
            Phase::Results => {
                "Review your personalized results and insights from the AI analysis."
            }
            Phase::LearningPath => {
                "Get your customized learning journey tailored to your specific needs and goals."
            }
        }
    }

    /// Whether the phase requires a premium entitlement
    pub fn is_premium(self) -> bool {
        matches!(self, Phase::LearningPath)
    }

    /// Destination a clickable phase navigates to
    pub fn route(self) -> Route {
        match self {
            Phase::Assessment => Route::Assessment,
            Phase::Results => Route::Results,
            Phase::LearningPath => Route::LearningPath,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Phase {}: {}", self.id(), self.title())
    }
}

/// Progress status of a phase for a given user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Completed,
    Active,
    Locked,
}

impl PhaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseStatus::Completed => "completed",
            PhaseStatus::Active => "active",
            PhaseStatus::Locked => "locked",
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
