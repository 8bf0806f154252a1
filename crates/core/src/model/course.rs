use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::model::ids::{ActionId, LessonId, OptionId, QuickCheckId, ScenarioId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Structural problems that make course content unusable for a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course has no lessons")]
    NoLessons,

    #[error("duplicate lesson id: {0}")]
    DuplicateLesson(LessonId),

    #[error("duplicate quick-check id: {0}")]
    DuplicateQuickCheck(QuickCheckId),

    #[error("duplicate option id {option} in quick-check {quick_check}")]
    DuplicateOption {
        quick_check: QuickCheckId,
        option: OptionId,
    },

    #[error("duplicate scenario id: {0}")]
    DuplicateScenario(ScenarioId),

    #[error("duplicate action id {action} in scenario {scenario}")]
    DuplicateAction {
        scenario: ScenarioId,
        action: ActionId,
    },
}

/// Data-integrity findings that degrade scoring but never block a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentWarning {
    /// The quick-check cannot be scored; it is left out of every denominator.
    NoCorrectOption {
        lesson: LessonId,
        quick_check: QuickCheckId,
    },
    /// Only the first flagged option counts as correct.
    MultipleCorrectOptions {
        lesson: LessonId,
        quick_check: QuickCheckId,
    },
    /// The scenario always scores `0 / 0`.
    NoCorrectAction { scenario: ScenarioId },
}

impl fmt::Display for ContentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentWarning::NoCorrectOption {
                lesson,
                quick_check,
            } => write!(
                f,
                "quick-check {quick_check} in lesson {lesson} has no correct option"
            ),
            ContentWarning::MultipleCorrectOptions {
                lesson,
                quick_check,
            } => write!(
                f,
                "quick-check {quick_check} in lesson {lesson} has several correct options; the first one counts"
            ),
            ContentWarning::NoCorrectAction { scenario } => {
                write!(f, "scenario {scenario} has no correct action")
            }
        }
    }
}

//
// ─── CONTENT TYPES ─────────────────────────────────────────────────────────────
//

/// A course as delivered by the content source. Immutable for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseContent {
    pub title: String,
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub quick_checks: Vec<QuickCheck>,
    #[serde(default)]
    pub checklist: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
}

/// A single multiple-choice question embedded in a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickCheck {
    pub id: QuickCheckId,
    pub stem: String,
    pub options: Vec<AnswerOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub id: OptionId,
    pub label: String,
    #[serde(default)]
    pub correct: bool,
    #[serde(default)]
    pub why: String,
}

/// A practice exercise with several selectable actions, any number of them correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: ScenarioId,
    pub title: String,
    #[serde(default)]
    pub situation: String,
    pub actions: Vec<ScenarioAction>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioAction {
    pub id: ActionId,
    pub label: String,
    #[serde(default)]
    pub correct: bool,
    #[serde(default)]
    pub why: String,
}

//
// ─── IMPLS ─────────────────────────────────────────────────────────────────────
//

impl QuickCheck {
    /// The option flagged correct. When several are flagged, the first one wins.
    #[must_use]
    pub fn correct_option(&self) -> Option<&AnswerOption> {
        self.options.iter().find(|option| option.correct)
    }

    #[must_use]
    pub fn has_option(&self, id: &OptionId) -> bool {
        self.options.iter().any(|option| &option.id == id)
    }

    /// Whether this quick-check counts towards score denominators.
    #[must_use]
    pub fn is_scoreable(&self) -> bool {
        self.correct_option().is_some()
    }
}

impl Scenario {
    pub fn correct_actions(&self) -> impl Iterator<Item = &ScenarioAction> {
        self.actions.iter().filter(|action| action.correct)
    }

    #[must_use]
    pub fn has_action(&self, id: &ActionId) -> bool {
        self.actions.iter().any(|action| &action.id == id)
    }
}

impl Lesson {
    #[must_use]
    pub fn quick_check(&self, id: &QuickCheckId) -> Option<&QuickCheck> {
        self.quick_checks.iter().find(|qc| &qc.id == id)
    }
}

impl CourseContent {
    /// Check structural integrity and collect non-fatal findings.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` when the course has no lessons or when ids collide
    /// in a scope where they must be unique.
    pub fn validate(&self) -> Result<Vec<ContentWarning>, CourseError> {
        if self.lessons.is_empty() {
            return Err(CourseError::NoLessons);
        }

        let mut warnings = Vec::new();
        let mut lesson_ids = HashSet::new();
        let mut quick_check_ids = HashSet::new();

        for lesson in &self.lessons {
            if !lesson_ids.insert(&lesson.id) {
                return Err(CourseError::DuplicateLesson(lesson.id.clone()));
            }

            for qc in &lesson.quick_checks {
                if !quick_check_ids.insert(&qc.id) {
                    return Err(CourseError::DuplicateQuickCheck(qc.id.clone()));
                }

                let mut option_ids = HashSet::new();
                for option in &qc.options {
                    if !option_ids.insert(&option.id) {
                        return Err(CourseError::DuplicateOption {
                            quick_check: qc.id.clone(),
                            option: option.id.clone(),
                        });
                    }
                }

                match qc.options.iter().filter(|option| option.correct).count() {
                    0 => warnings.push(ContentWarning::NoCorrectOption {
                        lesson: lesson.id.clone(),
                        quick_check: qc.id.clone(),
                    }),
                    1 => {}
                    _ => warnings.push(ContentWarning::MultipleCorrectOptions {
                        lesson: lesson.id.clone(),
                        quick_check: qc.id.clone(),
                    }),
                }
            }
        }

        let mut scenario_ids = HashSet::new();
        for scenario in &self.scenarios {
            if !scenario_ids.insert(&scenario.id) {
                return Err(CourseError::DuplicateScenario(scenario.id.clone()));
            }

            let mut action_ids = HashSet::new();
            for action in &scenario.actions {
                if !action_ids.insert(&action.id) {
                    return Err(CourseError::DuplicateAction {
                        scenario: scenario.id.clone(),
                        action: action.id.clone(),
                    });
                }
            }

            if scenario.correct_actions().next().is_none() {
                warnings.push(ContentWarning::NoCorrectAction {
                    scenario: scenario.id.clone(),
                });
            }
        }

        Ok(warnings)
    }

    #[must_use]
    pub fn scenario(&self, id: &ScenarioId) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| &scenario.id == id)
    }

    /// Locate a quick-check anywhere in the course.
    #[must_use]
    pub fn quick_check(&self, id: &QuickCheckId) -> Option<&QuickCheck> {
        self.lessons.iter().find_map(|lesson| lesson.quick_check(id))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn option(id: &str, correct: bool) -> AnswerOption {
        AnswerOption {
            id: OptionId::new(id),
            label: id.to_uppercase(),
            correct,
            why: String::new(),
        }
    }

    fn lesson(id: &str, quick_checks: Vec<QuickCheck>) -> Lesson {
        Lesson {
            id: LessonId::new(id),
            title: id.into(),
            summary: String::new(),
            bullets: Vec::new(),
            quick_checks,
            checklist: Vec::new(),
            hints: Vec::new(),
        }
    }

    fn quick_check(id: &str, options: Vec<AnswerOption>) -> QuickCheck {
        QuickCheck {
            id: QuickCheckId::new(id),
            stem: "?".into(),
            options,
        }
    }

    #[test]
    fn validate_rejects_empty_course() {
        let course = CourseContent {
            title: "Empty".into(),
            lessons: Vec::new(),
            scenarios: Vec::new(),
        };
        assert_eq!(course.validate().unwrap_err(), CourseError::NoLessons);
    }

    #[test]
    fn validate_rejects_quick_check_ids_shared_across_lessons() {
        let course = CourseContent {
            title: "Dup".into(),
            lessons: vec![
                lesson("l1", vec![quick_check("q", vec![option("a", true)])]),
                lesson("l2", vec![quick_check("q", vec![option("a", true)])]),
            ],
            scenarios: Vec::new(),
        };
        assert_eq!(
            course.validate().unwrap_err(),
            CourseError::DuplicateQuickCheck(QuickCheckId::new("q"))
        );
    }

    #[test]
    fn validate_rejects_duplicate_option_ids() {
        let course = CourseContent {
            title: "Dup".into(),
            lessons: vec![lesson(
                "l1",
                vec![quick_check("q", vec![option("a", true), option("a", false)])],
            )],
            scenarios: Vec::new(),
        };
        assert!(matches!(
            course.validate().unwrap_err(),
            CourseError::DuplicateOption { .. }
        ));
    }

    #[test]
    fn validate_reports_unscoreable_quick_checks() {
        let course = CourseContent {
            title: "Warn".into(),
            lessons: vec![lesson(
                "l1",
                vec![
                    quick_check("none", vec![option("a", false), option("b", false)]),
                    quick_check("many", vec![option("a", true), option("b", true)]),
                ],
            )],
            scenarios: Vec::new(),
        };

        let warnings = course.validate().unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(matches!(warnings[0], ContentWarning::NoCorrectOption { .. }));
        assert!(matches!(
            warnings[1],
            ContentWarning::MultipleCorrectOptions { .. }
        ));
        assert_eq!(
            warnings[0].to_string(),
            "quick-check none in lesson l1 has no correct option"
        );
    }

    #[test]
    fn first_flagged_option_is_the_correct_one() {
        let qc = quick_check("q", vec![option("a", false), option("b", true), option("c", true)]);
        assert_eq!(qc.correct_option().unwrap().id, OptionId::new("b"));
        assert!(qc.has_option(&OptionId::new("c")));
        assert!(!qc.has_option(&OptionId::new("z")));
    }

    #[test]
    fn content_deserializes_from_camel_case_json() {
        let json = r#"{
            "title": "Privacy basics",
            "lessons": [{
                "id": "l1",
                "title": "Intro",
                "quickChecks": [{
                    "id": "q1",
                    "stem": "Pick one",
                    "options": [
                        {"id": "a", "label": "A", "correct": true, "why": "because"},
                        {"id": "b", "label": "B"}
                    ]
                }]
            }]
        }"#;

        let course: CourseContent = serde_json::from_str(json).unwrap();
        assert_eq!(course.lessons[0].quick_checks.len(), 1);
        assert!(course.scenarios.is_empty());
        assert!(!course.lessons[0].quick_checks[0].options[1].correct);
        assert!(course.validate().unwrap().is_empty());
    }
}
