//! Journey progression rules
//!
//! Pure functions over `User`: phase status, premium gating, advancement
//! and the overall progress figure shown on the dashboard.

use crate::domain::{Phase, PhaseStatus, User};

/// Status of `phase` for `user`
///
/// A phase is `Active` only when it is the current phase and every earlier
/// phase it depends on is completed.
pub fn compute_phase_status(user: &User, phase: Phase) -> PhaseStatus {
    let id = phase.id();

    if user.completed_phases.contains(&id) {
        return PhaseStatus::Completed;
    }

    let unlocked = id == 1 || user.completed_phases.contains(&(id - 1));
    if user.current_phase == id && unlocked {
        PhaseStatus::Active
    } else {
        PhaseStatus::Locked
    }
}

/// Whether `phase` is premium-only and `user` hasn't upgraded
pub fn needs_premium(phase: Phase, user: &User) -> bool {
    phase.is_premium() && !user.is_premium
}

/// Move `user` to `new_phase`, marking the preceding phase completed
///
/// Idempotent and never moves the user backwards: an earlier `new_phase`
/// only marks its predecessor completed. `None` in, `None` out.
pub fn advance_phase(user: Option<&User>, new_phase: u32) -> Option<User> {
    let mut next = user?.clone();
    next.current_phase = next.current_phase.max(new_phase).max(1);
    if new_phase > 1 {
        next.completed_phases.insert(new_phase - 1);
    }
    next.completed_phases.retain(|p| *p > 0);
    Some(next)
}

/// Completed share of the journey as a whole percentage (display only)
pub fn overall_progress(user: &User, total_phases: usize) -> u8 {
    if total_phases == 0 {
        return 0;
    }
    let completed = user.completed_phases.len().min(total_phases);
    ((completed as f64 / total_phases as f64) * 100.0).round() as u8
}
