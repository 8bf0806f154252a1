use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::gating::{CompletionCheck, UnlockCheck};
use crate::model::{ActionId, OptionId, QuickCheckId, ScenarioId};
use crate::progress::{CourseSession, ProgressError};

/// A discrete learner interaction, as emitted by a UI or a replay script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LearnerEvent {
    #[serde(rename_all = "camelCase")]
    RecordAnswer {
        quick_check: QuickCheckId,
        option: OptionId,
    },
    #[serde(rename_all = "camelCase")]
    Reveal { quick_check: QuickCheckId },
    CompleteLesson,
    GoToLesson { index: usize },
    EnterScenarios,
    SelectActions {
        scenario: ScenarioId,
        actions: BTreeSet<ActionId>,
    },
    ToggleAction {
        scenario: ScenarioId,
        action: ActionId,
    },
    RevealScenario { scenario: ScenarioId },
    GoToScenario { index: usize },
    NextScenario,
    PreviousScenario,
    EnterApproach,
    ReturnToLessons,
}

/// Why an event had no effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    Invalid(ProgressError),
    LessonBlocked(CompletionCheck),
    ScenariosLocked(UnlockCheck),
    OutOfRange { index: usize },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Invalid(err) => write!(f, "{err}"),
            Rejection::LessonBlocked(check) => write!(f, "{check}"),
            Rejection::ScenariosLocked(check) => {
                f.write_str("scenarios locked:")?;
                for blocker in &check.blockers {
                    write!(f, " {blocker};")?;
                }
                Ok(())
            }
            Rejection::OutOfRange { index } => write!(f, "index {index} is out of range"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Applied,
    Rejected(Rejection),
}

impl EventOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, EventOutcome::Applied)
    }
}

impl From<Result<(), ProgressError>> for EventOutcome {
    fn from(result: Result<(), ProgressError>) -> Self {
        match result {
            Ok(()) => EventOutcome::Applied,
            Err(err) => EventOutcome::Rejected(Rejection::Invalid(err)),
        }
    }
}

impl CourseSession {
    /// Apply a learner event, capturing the reason when it is rejected.
    pub fn apply(&mut self, event: &LearnerEvent) -> EventOutcome {
        match event {
            LearnerEvent::RecordAnswer {
                quick_check,
                option,
            } => self.record_answer(quick_check, option.clone()).into(),
            LearnerEvent::Reveal { quick_check } => self.reveal(quick_check).into(),
            LearnerEvent::CompleteLesson => {
                // The check is computed first so the rejection can carry it.
                let check = self.lesson_completion_check();
                if self.complete_current_lesson() {
                    EventOutcome::Applied
                } else {
                    EventOutcome::Rejected(Rejection::LessonBlocked(check))
                }
            }
            LearnerEvent::GoToLesson { index } => bounded(self.go_to_lesson(*index), *index),
            LearnerEvent::EnterScenarios => {
                let check = self.scenario_unlock_check();
                if self.enter_scenarios() {
                    EventOutcome::Applied
                } else {
                    EventOutcome::Rejected(Rejection::ScenariosLocked(check))
                }
            }
            LearnerEvent::SelectActions { scenario, actions } => self
                .record_scenario_selection(scenario, actions.clone())
                .into(),
            LearnerEvent::ToggleAction { scenario, action } => self
                .toggle_scenario_action(scenario, action)
                .map(|_| ())
                .into(),
            LearnerEvent::RevealScenario { scenario } => self.reveal_scenario(scenario).into(),
            LearnerEvent::GoToScenario { index } => bounded(self.go_to_scenario(*index), *index),
            LearnerEvent::NextScenario => {
                let index = self.current_scenario_index() + 1;
                bounded(self.next_scenario(), index)
            }
            LearnerEvent::PreviousScenario => {
                let index = self.current_scenario_index();
                bounded(self.previous_scenario(), index)
            }
            LearnerEvent::EnterApproach => {
                self.enter_approach();
                EventOutcome::Applied
            }
            LearnerEvent::ReturnToLessons => {
                self.return_to_lessons();
                EventOutcome::Applied
            }
        }
    }
}

fn bounded(moved: bool, index: usize) -> EventOutcome {
    if moved {
        EventOutcome::Applied
    } else {
        EventOutcome::Rejected(Rejection::OutOfRange { index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gating::BlockReason;
    use crate::model::{
        AnswerOption, CompletionMode, CourseContent, GateOptions, Lesson, LessonId, QuickCheck,
    };
    use crate::progress::Stage;
    use crate::time::fixed_now;

    fn course() -> CourseContent {
        CourseContent {
            title: "Safety".into(),
            lessons: vec![Lesson {
                id: LessonId::new("l1"),
                title: "Ladders".into(),
                summary: String::new(),
                bullets: Vec::new(),
                quick_checks: vec![QuickCheck {
                    id: QuickCheckId::new("q1"),
                    stem: "Three points of contact?".into(),
                    options: vec![
                        AnswerOption {
                            id: OptionId::new("yes"),
                            label: "Yes".into(),
                            correct: true,
                            why: String::new(),
                        },
                        AnswerOption {
                            id: OptionId::new("no"),
                            label: "No".into(),
                            correct: false,
                            why: String::new(),
                        },
                    ],
                }],
                checklist: Vec::new(),
                hints: Vec::new(),
            }],
            scenarios: Vec::new(),
        }
    }

    #[test]
    fn events_parse_from_tagged_json() {
        let events: Vec<LearnerEvent> = serde_json::from_str(
            r#"[
                {"type": "recordAnswer", "quickCheck": "q1", "option": "yes"},
                {"type": "reveal", "quickCheck": "q1"},
                {"type": "completeLesson"},
                {"type": "selectActions", "scenario": "s1", "actions": ["a", "b"]},
                {"type": "goToLesson", "index": 0}
            ]"#,
        )
        .unwrap();

        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            LearnerEvent::RecordAnswer {
                quick_check: QuickCheckId::new("q1"),
                option: OptionId::new("yes"),
            }
        );
        assert_eq!(events[2], LearnerEvent::CompleteLesson);
    }

    #[test]
    fn rejected_completion_carries_blockers() {
        let options = GateOptions::default().with_mode(CompletionMode::Correct);
        let mut session = CourseSession::new(course(), &options, fixed_now()).unwrap();

        let check = match session.apply(&LearnerEvent::CompleteLesson) {
            EventOutcome::Rejected(Rejection::LessonBlocked(check)) => check,
            other => panic!("expected blocked lesson, got {other:?}"),
        };
        assert_eq!(check.blockers[0].reason, BlockReason::Unanswered);
    }

    #[test]
    fn replaying_a_script_completes_the_lesson() {
        let mut session = CourseSession::new(course(), &GateOptions::default(), fixed_now()).unwrap();
        let script = [
            LearnerEvent::RecordAnswer {
                quick_check: QuickCheckId::new("q1"),
                option: OptionId::new("yes"),
            },
            LearnerEvent::Reveal {
                quick_check: QuickCheckId::new("q1"),
            },
            LearnerEvent::CompleteLesson,
            LearnerEvent::EnterScenarios,
        ];

        let outcomes: Vec<_> = script.iter().map(|event| session.apply(event)).collect();
        assert!(outcomes.iter().all(EventOutcome::is_applied));
        assert_eq!(session.stage(), Stage::Scenarios);
    }

    #[test]
    fn invalid_input_and_navigation_are_rejected() {
        let mut session = CourseSession::new(course(), &GateOptions::default(), fixed_now()).unwrap();

        let outcome = session.apply(&LearnerEvent::RecordAnswer {
            quick_check: QuickCheckId::new("q1"),
            option: OptionId::new("maybe"),
        });
        assert!(matches!(
            outcome,
            EventOutcome::Rejected(Rejection::Invalid(ProgressError::InvalidSelection { .. }))
        ));

        let outcome = session.apply(&LearnerEvent::GoToLesson { index: 3 });
        assert_eq!(outcome, EventOutcome::Rejected(Rejection::OutOfRange { index: 3 }));

        let outcome = session.apply(&LearnerEvent::EnterScenarios);
        let EventOutcome::Rejected(rejection) = outcome else {
            panic!("scenarios should be locked");
        };
        assert!(rejection.to_string().starts_with("scenarios locked:"));
    }
}
