//! Partial-credit scoring for quick-checks and scenarios.
//!
//! Everything here is a pure function of content plus raw answer state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::model::{
    ActionId, Lesson, OptionId, QuickCheck, QuickCheckId, Scenario, ScenarioAction, ScenarioId,
};

/// Recorded quick-check answers. A missing key means "no answer yet".
pub type Answers = HashMap<QuickCheckId, OptionId>;

/// Quick-checks whose answers have been revealed.
pub type Revealed = HashSet<QuickCheckId>;

/// Selected actions per scenario.
pub type ScenarioAnswers = HashMap<ScenarioId, BTreeSet<ActionId>>;

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub score: u32,
    pub total: u32,
}

impl Score {
    #[must_use]
    pub fn new(score: u32, total: u32) -> Self {
        Self { score, total }
    }

    /// `score / total`, or `0.0` when nothing is scoreable.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        ratio(self.score, self.total)
    }
}

fn ratio(score: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(score) / f64::from(total)
    }
}

/// Aggregate quiz result over every lesson of a course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnTotals {
    pub score: u32,
    pub total: u32,
    pub average: f64,
}

/// Aggregate result over every scenario of a course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTotals {
    pub score: u32,
    pub total: u32,
    /// Number of scenarios the learner has revealed.
    pub revealed: u32,
    pub average: f64,
}

//
// ─── LESSONS ───────────────────────────────────────────────────────────────────
//

/// Score a lesson's quick-checks.
///
/// Only quick-checks with a correct option count towards `total`; a point is
/// earned once the quick-check is revealed and the recorded answer matches.
#[must_use]
pub fn lesson_score(quick_checks: &[QuickCheck], answers: &Answers, revealed: &Revealed) -> Score {
    quick_checks
        .iter()
        .fold(Score::default(), |mut acc, qc| {
            let Some(correct) = qc.correct_option() else {
                return acc;
            };
            acc.total = acc.total.saturating_add(1);
            if revealed.contains(&qc.id) && answers.get(&qc.id) == Some(&correct.id) {
                acc.score = acc.score.saturating_add(1);
            }
            acc
        })
}

/// Sum lesson scores across a course.
#[must_use]
pub fn learn_totals(lessons: &[Lesson], answers: &Answers, revealed: &Revealed) -> LearnTotals {
    let (score, total) = lessons
        .iter()
        .map(|lesson| lesson_score(&lesson.quick_checks, answers, revealed))
        .fold((0_u32, 0_u32), |(score, total), s| {
            (score.saturating_add(s.score), total.saturating_add(s.total))
        });

    LearnTotals {
        score,
        total,
        average: ratio(score, total),
    }
}

//
// ─── SCENARIOS ─────────────────────────────────────────────────────────────────
//

/// Score a scenario selection.
///
/// `total` is the number of correct actions regardless of reveal state. Before
/// reveal, or without a selection, the score is zero. Incorrect selections are
/// not penalized.
#[must_use]
pub fn scenario_score(
    actions: &[ScenarioAction],
    selected: Option<&BTreeSet<ActionId>>,
    revealed: bool,
) -> Score {
    let correct = actions.iter().filter(|action| action.correct);
    let total = u32::try_from(correct.clone().count()).unwrap_or(u32::MAX);

    let score = match selected {
        Some(selected) if revealed => {
            let hits = correct.filter(|action| selected.contains(&action.id)).count();
            u32::try_from(hits).unwrap_or(u32::MAX)
        }
        _ => 0,
    };

    Score { score, total }
}

/// Sum scenario scores across a course.
#[must_use]
pub fn scenario_totals(
    scenarios: &[Scenario],
    answers: &ScenarioAnswers,
    revealed: &HashSet<ScenarioId>,
) -> ScenarioTotals {
    let mut totals = ScenarioTotals::default();
    for scenario in scenarios {
        let is_revealed = revealed.contains(&scenario.id);
        let s = scenario_score(&scenario.actions, answers.get(&scenario.id), is_revealed);
        totals.score = totals.score.saturating_add(s.score);
        totals.total = totals.total.saturating_add(s.total);
        if is_revealed {
            totals.revealed = totals.revealed.saturating_add(1);
        }
    }
    totals.average = ratio(totals.score, totals.total);
    totals
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
