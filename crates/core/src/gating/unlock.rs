use serde::Serialize;
use std::fmt;

use crate::model::GatePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnlockBlocker {
    /// Lessons must all be complete while the scenario lock is on.
    LessonsIncomplete,
    BelowThreshold { average: f64, threshold: f64 },
}

impl fmt::Display for UnlockBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlockBlocker::LessonsIncomplete => f.write_str("not every lesson is complete"),
            UnlockBlocker::BelowThreshold { average, threshold } => write!(
                f,
                "quiz average {:.0}% is below the required {:.0}%",
                average * 100.0,
                threshold * 100.0
            ),
        }
    }
}

/// Outcome of the scenario unlock policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnlockCheck {
    pub blockers: Vec<UnlockBlocker>,
}

impl UnlockCheck {
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.blockers.is_empty()
    }
}

/// Evaluate whether the scenario stage may be entered.
///
/// The threshold applies whether or not the lock is on; the lock only adds the
/// all-lessons-complete requirement.
#[must_use]
pub fn evaluate_unlock(
    all_lessons_complete: bool,
    learn_average: f64,
    policy: &GatePolicy,
) -> UnlockCheck {
    let mut blockers = Vec::new();

    if policy.lock_scenarios_until_lessons_done() && !all_lessons_complete {
        blockers.push(UnlockBlocker::LessonsIncomplete);
    }

    let threshold = policy.scenario_unlock_threshold();
    if learn_average.is_nan() || learn_average < threshold {
        blockers.push(UnlockBlocker::BelowThreshold {
            average: learn_average,
            threshold,
        });
    }

    UnlockCheck { blockers }
}

#[must_use]
pub fn can_enter_scenarios(
    all_lessons_complete: bool,
    learn_average: f64,
    policy: &GatePolicy,
) -> bool {
    evaluate_unlock(all_lessons_complete, learn_average, policy).is_unlocked()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
