//! Self-assessment model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::Error;

/// Minimum length of a trimmed assessment response
pub const MIN_RESPONSE_CHARS: usize = 100;

/// Skills a user can choose to develop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Skill {
    Communication,
    Leadership,
    Teamwork,
    ProblemSolving,
    TimeManagement,
    EmotionalIntelligence,
    Adaptability,
    ConflictResolution,
}

impl Skill {
    pub const ALL: [Skill; 8] = [
        Skill::Communication,
        Skill::Leadership,
        Skill::Teamwork,
        Skill::ProblemSolving,
        Skill::TimeManagement,
        Skill::EmotionalIntelligence,
        Skill::Adaptability,
        Skill::ConflictResolution,
    ];

    /// Stable identifier used in storage
    pub fn key(self) -> &'static str {
        match self {
            Skill::Communication => "communication",
            Skill::Leadership => "leadership",
            Skill::Teamwork => "teamwork",
            Skill::ProblemSolving => "problem-solving",
            Skill::TimeManagement => "time-management",
            Skill::EmotionalIntelligence => "emotional-intelligence",
            Skill::Adaptability => "adaptability",
            Skill::ConflictResolution => "conflict-resolution",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Skill::Communication => "Communication",
            Skill::Leadership => "Leadership",
            Skill::Teamwork => "Teamwork",
            Skill::ProblemSolving => "Problem Solving",
            Skill::TimeManagement => "Time Management",
            Skill::EmotionalIntelligence => "Emotional Intelligence",
            Skill::Adaptability => "Adaptability",
            Skill::ConflictResolution => "Conflict Resolution",
        }
    }

    /// The situational question asked for this skill
    pub fn question(self) -> &'static str {
        match self {
            Skill::Communication => "Describe a situation where you had to communicate complex information to a colleague or client who wasn't familiar with the technical details. How did you approach this, and what was the outcome?",
            Skill::Leadership => "Tell me about a time when you had to lead a team through a challenging project or situation. What obstacles did you face, and how did you motivate your team to achieve the goal?",
            Skill::Teamwork => "Describe a situation where you had to work with a difficult team member or in a dysfunctional team environment. How did you handle it, and what did you learn?",
            Skill::ProblemSolving => "Share an example of a complex problem you encountered at work. Walk me through your problem-solving process and explain how you arrived at your solution.",
            Skill::TimeManagement => "Describe a time when you had multiple competing deadlines or priorities. How did you manage your time and ensure all tasks were completed effectively?",
            Skill::EmotionalIntelligence => "Tell me about a situation where you had to manage your emotions or help someone else manage theirs in a professional setting. What was your approach?",
            Skill::Adaptability => "Describe a significant change in your workplace (new system, process, or structure). How did you adapt, and what challenges did you face?",
            Skill::ConflictResolution => "Share an example of a workplace conflict you were involved in or helped resolve. What was your approach, and what was the outcome?",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Skill {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '_'], "-");
        Skill::ALL
            .into_iter()
            .find(|skill| skill.key() == wanted)
            .ok_or_else(|| Error::validation(format!("Unknown skill '{}'", s.trim())))
    }
}

/// A submitted self-assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: Uuid,
    pub user_id: String,
    pub skill: Skill,
    pub response: String,
    pub submitted_at: DateTime<Utc>,
}

impl AssessmentRecord {
    pub fn new(user_id: impl Into<String>, skill: Skill, response: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            skill,
            response: response.into(),
            submitted_at: Utc::now(),
        }
    }
}
