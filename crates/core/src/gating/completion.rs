use serde::Serialize;
use std::fmt;

use crate::model::{CompletionMode, Lesson, LessonId, QuickCheck, QuickCheckId};
use crate::scoring::{Answers, Revealed};

/// Why a single quick-check holds a lesson back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    Unanswered,
    NotRevealed,
    Incorrect,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BlockReason::Unanswered => "not answered yet",
            BlockReason::NotRevealed => "answer not revealed yet",
            BlockReason::Incorrect => "answered incorrectly",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionBlocker {
    pub quick_check: QuickCheckId,
    pub reason: BlockReason,
}

/// Result of evaluating a lesson against a completion mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionCheck {
    pub lesson: LessonId,
    pub mode: CompletionMode,
    pub blockers: Vec<CompletionBlocker>,
}

impl CompletionCheck {
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.blockers.is_empty()
    }
}

impl fmt::Display for CompletionCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_satisfied() {
            return write!(f, "lesson {} can be completed ({})", self.lesson, self.mode);
        }
        write!(f, "lesson {} is blocked ({}):", self.lesson, self.mode)?;
        for blocker in &self.blockers {
            write!(f, " {} {};", blocker.quick_check, blocker.reason)?;
        }
        Ok(())
    }
}

/// Evaluate every quick-check of `lesson` against `mode`.
///
/// A lesson without quick-checks is always satisfied.
#[must_use]
pub fn evaluate_lesson(
    lesson: &Lesson,
    answers: &Answers,
    revealed: &Revealed,
    mode: CompletionMode,
) -> CompletionCheck {
    let blockers = lesson
        .quick_checks
        .iter()
        .filter_map(|qc| {
            blocking_reason(qc, answers, revealed, mode).map(|reason| CompletionBlocker {
                quick_check: qc.id.clone(),
                reason,
            })
        })
        .collect();

    CompletionCheck {
        lesson: lesson.id.clone(),
        mode,
        blockers,
    }
}

/// Whether `lesson` satisfies `mode`.
#[must_use]
pub fn can_complete_lesson(
    lesson: &Lesson,
    answers: &Answers,
    revealed: &Revealed,
    mode: CompletionMode,
) -> bool {
    evaluate_lesson(lesson, answers, revealed, mode).is_satisfied()
}

fn blocking_reason(
    qc: &QuickCheck,
    answers: &Answers,
    revealed: &Revealed,
    mode: CompletionMode,
) -> Option<BlockReason> {
    let answer = answers.get(&qc.id);
    let is_revealed = revealed.contains(&qc.id);

    match mode {
        CompletionMode::Answered => answer.is_none().then_some(BlockReason::Unanswered),
        CompletionMode::Revealed => match (answer, is_revealed) {
            (None, _) => Some(BlockReason::Unanswered),
            (Some(_), false) => Some(BlockReason::NotRevealed),
            (Some(_), true) => None,
        },
        CompletionMode::Correct => match (answer, is_revealed) {
            (None, _) => Some(BlockReason::Unanswered),
            (Some(_), false) => Some(BlockReason::NotRevealed),
            // Quick-checks without a correct option cannot be graded; once
            // answered and revealed they no longer hold the lesson back.
            (Some(answer), true) => match qc.correct_option() {
                Some(correct) if &correct.id != answer => Some(BlockReason::Incorrect),
                _ => None,
            },
        },
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
