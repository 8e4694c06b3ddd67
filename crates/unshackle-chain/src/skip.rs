//! Fast-forward state for resuming a chain at a named mark.
//!
//! Lifecycle: `Running` until [`SkipState::seek`] names a resume mark, then
//! `Seeking` until a step carrying that mark is appended, then `Reached` for
//! the rest of the run. `Reached` is terminal, so fast-forwarding can never
//! re-activate once the resume point has been passed.

use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Running,
    Seeking(String),
    Reached,
}

#[derive(Debug)]
pub struct SkipState {
    phase: Mutex<Phase>,
}

impl SkipState {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(Phase::Running),
        }
    }

    /// Begin fast-forwarding toward `mark`. `None` or an empty mark runs
    /// every step.
    pub fn seek(&self, mark: Option<String>) {
        let mark = mark.filter(|m| !m.is_empty());
        let mut phase = self.lock();
        if *phase != Phase::Running {
            if mark.is_some() {
                tracing::warn!(?mark, "Ignoring resume point set after the run began");
            }
            return;
        }
        if let Some(mark) = mark {
            tracing::debug!(mark = %mark, "Fast-forwarding to resume point");
            *phase = Phase::Seeking(mark);
        }
    }

    /// The mark currently being sought, if any.
    pub fn target(&self) -> Option<String> {
        match &*self.lock() {
            Phase::Seeking(mark) => Some(mark.clone()),
            Phase::Running | Phase::Reached => None,
        }
    }

    /// Decide whether a step with `mark` is skipped.
    ///
    /// Reaching the sought mark clears the target first, so the marked step
    /// itself always runs. Non-skippable steps run even while seeking.
    pub fn should_skip(&self, mark: Option<&str>, skippable: bool) -> bool {
        let mut phase = self.lock();
        if let Phase::Seeking(ref target) = *phase {
            if mark == Some(target.as_str()) {
                tracing::debug!(mark = %target, "Resume point reached");
                *phase = Phase::Reached;
                return false;
            }
            return skippable;
        }
        false
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SkipState {
    fn default() -> Self {
        Self::new()
    }
}
