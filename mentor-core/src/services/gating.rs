//! Phase gating for the dashboard
//!
//! Turns journey status into navigation affordances: whether a phase card
//! is clickable, shows a lock or shows an upgrade prompt, and what a click
//! does.

use serde::Serialize;

use crate::domain::{Phase, PhaseStatus, Route, User};
use crate::services::journey::{compute_phase_status, needs_premium};

/// Presentation state of one phase card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseView {
    pub phase: Phase,
    pub id: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub status: PhaseStatus,
    pub premium: bool,
    pub needs_premium: bool,
    pub clickable: bool,
    pub shows_lock: bool,
    pub shows_upgrade_prompt: bool,
}

/// What clicking a phase card does
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "route", rename_all = "snake_case")]
pub enum PhaseClick {
    Navigate(Route),
    UpgradePrompt,
    Ignored,
}

pub fn phase_view(user: &User, phase: Phase) -> PhaseView {
    let status = compute_phase_status(user, phase);
    let needs_premium = needs_premium(phase, user);
    let locked = status == PhaseStatus::Locked;

    PhaseView {
        phase,
        id: phase.id(),
        title: phase.title(),
        description: phase.description(),
        status,
        premium: phase.is_premium(),
        needs_premium,
        clickable: status == PhaseStatus::Active && !needs_premium,
        shows_lock: locked,
        shows_upgrade_prompt: needs_premium && !locked,
    }
}

/// Views for every phase, in journey order
pub fn phase_views(user: &User) -> Vec<PhaseView> {
    Phase::ALL.iter().map(|phase| phase_view(user, *phase)).collect()
}

pub fn click_phase(user: &User, phase: Phase) -> PhaseClick {
    let view = phase_view(user, phase);

    if view.shows_lock {
        PhaseClick::Ignored
    } else if view.needs_premium {
        PhaseClick::UpgradePrompt
    } else if view.clickable {
        PhaseClick::Navigate(phase.route())
    } else {
        PhaseClick::Ignored
    }
}
