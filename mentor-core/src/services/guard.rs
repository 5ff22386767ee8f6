//! Route access guard
//!
//! Decides, per navigation, whether the requester may see a destination.
//! There is no return-to memory: an anonymous visitor bounced to `/login`
//! lands on the dashboard after logging in, not on the page they asked for.

use serde::Serialize;

use crate::domain::Route;

/// What the guard knows about the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// Session check still running
    Pending,
    Authenticated,
    Anonymous,
}

impl AuthState {
    /// Derive the guard state from a session store snapshot
    pub fn from_snapshot(loading: bool, has_user: bool) -> Self {
        match (loading, has_user) {
            (true, _) => AuthState::Pending,
            (false, true) => AuthState::Authenticated,
            (false, false) => AuthState::Anonymous,
        }
    }
}

/// Outcome of a guarded navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "route", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Show a loading indicator; don't navigate yet
    Loading,
    Render(Route),
    Redirect(Route),
}

impl GuardDecision {
    /// The route that ends up on screen, if any
    pub fn route(&self) -> Option<&Route> {
        match self {
            GuardDecision::Loading => None,
            GuardDecision::Render(route) | GuardDecision::Redirect(route) => Some(route),
        }
    }
}

/// Decide what happens when navigating to `destination`
pub fn check_access(state: AuthState, destination: &Route) -> GuardDecision {
    if !destination.is_protected() {
        return GuardDecision::Render(destination.clone());
    }

    match state {
        AuthState::Pending => GuardDecision::Loading,
        AuthState::Authenticated => GuardDecision::Render(destination.clone()),
        AuthState::Anonymous => GuardDecision::Redirect(Route::Login),
    }
}
