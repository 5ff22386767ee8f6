//! Assessment service - the assessment and results phases
//!
//! Validates and stores a self-assessment, moves the journey along, and
//! decides where the user goes next.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{AssessmentRecord, Phase, Route, Skill, User, MIN_RESPONSE_CHARS};
use crate::ports::ProgressStore;
use crate::services::journey::needs_premium;
use crate::services::session::SessionStore;

/// Where to go after an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "next", content = "route", rename_all = "snake_case")]
pub enum NextStep {
    Navigate(Route),
    /// Stay put and offer the premium upgrade
    UpgradePrompt,
}

/// What the results view shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ResultsView {
    /// Nothing submitted yet
    Redirect { route: Route },
    Ready { assessment: AssessmentRecord },
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResult {
    pub assessment: AssessmentRecord,
    pub user: User,
    pub next: NextStep,
}

pub struct AssessmentService {
    progress: Arc<dyn ProgressStore>,
}

impl AssessmentService {
    pub fn new(progress: Arc<dyn ProgressStore>) -> Self {
        Self { progress }
    }

    /// Check a response before submission
    pub fn validate(skill: Option<Skill>, response: &str) -> Result<(Skill, String)> {
        let trimmed = response.trim();
        let Some(skill) = skill.filter(|_| !trimmed.is_empty()) else {
            return Err(Error::validation(
                "Please select a skill and provide your response.",
            ));
        };

        if trimmed.chars().count() < MIN_RESPONSE_CHARS {
            return Err(Error::validation(format!(
                "Please provide a more detailed response (at least {} characters).",
                MIN_RESPONSE_CHARS
            )));
        }

        Ok((skill, trimmed.to_string()))
    }

    /// Store an assessment and move the user to the results phase
    pub fn submit(
        &self,
        session: &SessionStore,
        skill: Option<Skill>,
        response: &str,
    ) -> Result<SubmitResult> {
        let (skill, response) = Self::validate(skill, response)?;
        let user = signed_in(session)?;

        let assessment = AssessmentRecord::new(&user.id, skill, response);
        self.progress.save_assessment(&assessment)?;

        let user = session
            .advance_phase(Phase::Results.id())?
            .ok_or_else(not_signed_in)?;

        Ok(SubmitResult {
            assessment,
            user,
            next: NextStep::Navigate(Route::Results),
        })
    }

    /// The latest assessment for the current user, or a redirect to take one
    pub fn results(&self, session: &SessionStore) -> Result<ResultsView> {
        let user = signed_in(session)?;
        Ok(match self.progress.get_latest_assessment(&user.id)? {
            Some(assessment) => ResultsView::Ready { assessment },
            None => ResultsView::Redirect {
                route: Route::Assessment,
            },
        })
    }

    /// Leave the results phase for the learning path
    ///
    /// Users without an assessment are sent back to take one. Otherwise the
    /// phase advances either way and only premium users are sent on.
    pub fn continue_to_learning_path(&self, session: &SessionStore) -> Result<NextStep> {
        let user = signed_in(session)?;
        if self.progress.get_latest_assessment(&user.id)?.is_none() {
            return Ok(NextStep::Navigate(Route::Assessment));
        }

        let user = session
            .advance_phase(Phase::LearningPath.id())?
            .ok_or_else(not_signed_in)?;

        Ok(if learning_path_unlocked(&user) {
            NextStep::Navigate(Route::LearningPath)
        } else {
            NextStep::UpgradePrompt
        })
    }
}

/// Whether the learning path content is visible rather than an upgrade prompt
pub fn learning_path_unlocked(user: &User) -> bool {
    !needs_premium(Phase::LearningPath, user)
}

fn not_signed_in() -> Error {
    Error::auth("You need to log in first")
}

fn signed_in(session: &SessionStore) -> Result<User> {
    session.user()?.ok_or_else(not_signed_in)
}
