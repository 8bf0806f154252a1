use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::gating::{self, CompletionCheck, UnlockCheck};
use crate::model::{
    ActionId, CompletionMode, ContentWarning, CourseContent, GateOptions, GatePolicy, Lesson,
    LessonId, OptionId, QuickCheckId, Scenario, ScenarioId, SessionId,
};
use crate::scoring::{
    self, Answers, LearnTotals, Revealed, ScenarioAnswers, ScenarioTotals, Score,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Input rejected by a session mutator. Session state is left unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("unknown quick-check: {0}")]
    UnknownQuickCheck(QuickCheckId),

    #[error("option {option} does not belong to quick-check {quick_check}")]
    InvalidSelection {
        quick_check: QuickCheckId,
        option: OptionId,
    },

    #[error("unknown scenario: {0}")]
    UnknownScenario(ScenarioId),

    #[error("action {action} does not belong to scenario {scenario}")]
    InvalidAction {
        scenario: ScenarioId,
        action: ActionId,
    },
}

//
// ─── STAGE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Learn,
    Scenarios,
    /// Informational wrap-up; not gated.
    Approach,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Learn => "learn",
            Stage::Scenarios => "scenarios",
            Stage::Approach => "approach",
        };
        f.write_str(name)
    }
}

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseProgress {
    pub stage: Stage,
    pub lesson_index: usize,
    pub lessons_total: usize,
    pub lessons_completed: usize,
    pub scenario_index: usize,
    pub scenarios_total: usize,
    pub scenarios_revealed: usize,
    pub learn: LearnTotals,
    pub all_lessons_complete: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory progression state for one learner working through one course.
///
/// Queries are pure; every mutation goes through an explicit method. Gated
/// transitions (`complete_current_lesson`, `enter_scenarios`) return `false`
/// and leave state untouched when the policy says no.
pub struct CourseSession {
    id: SessionId,
    content: CourseContent,
    policy: GatePolicy,
    warnings: Vec<ContentWarning>,
    stage: Stage,
    current_lesson: usize,
    current_scenario: usize,
    answers: Answers,
    revealed: Revealed,
    completed_lessons: BTreeSet<LessonId>,
    scenario_answers: ScenarioAnswers,
    scenario_revealed: HashSet<ScenarioId>,
    started_at: DateTime<Utc>,
}

impl CourseSession {
    /// Start a session, resolving `options` into a policy once.
    ///
    /// `started_at` should come from the services layer clock.
    ///
    /// # Errors
    ///
    /// Returns `Error::Options` for an invalid threshold and `Error::Course`
    /// for structurally broken content.
    pub fn new(
        content: CourseContent,
        options: &GateOptions,
        started_at: DateTime<Utc>,
    ) -> Result<Self, Error> {
        let policy = options.resolve()?;
        Self::with_policy(content, policy, started_at)
    }

    /// Start a session with an already validated policy.
    ///
    /// # Errors
    ///
    /// Returns `Error::Course` for structurally broken content.
    pub fn with_policy(
        content: CourseContent,
        policy: GatePolicy,
        started_at: DateTime<Utc>,
    ) -> Result<Self, Error> {
        let warnings = content.validate()?;
        for warning in &warnings {
            warn!(?warning, course = %content.title, "course content warning");
        }

        let id = SessionId::generate();
        debug!(
            session = %id,
            course = %content.title,
            lessons = content.lessons.len(),
            scenarios = content.scenarios.len(),
            mode = %policy.completion_mode(),
            "course session started"
        );

        Ok(Self {
            id,
            content,
            policy,
            warnings,
            stage: Stage::Learn,
            current_lesson: 0,
            current_scenario: 0,
            answers: Answers::new(),
            revealed: Revealed::new(),
            completed_lessons: BTreeSet::new(),
            scenario_answers: ScenarioAnswers::new(),
            scenario_revealed: HashSet::new(),
            started_at,
        })
    }

    // ─── Accessors ────────────────────────────────────────────────────────────

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn content(&self) -> &CourseContent {
        &self.content
    }

    #[must_use]
    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    #[must_use]
    pub fn completion_mode(&self) -> CompletionMode {
        self.policy.completion_mode()
    }

    #[must_use]
    pub fn warnings(&self) -> &[ContentWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn current_lesson_index(&self) -> usize {
        self.current_lesson
    }

    #[must_use]
    pub fn current_scenario_index(&self) -> usize {
        self.current_scenario
    }

    /// The lesson under the cursor. Content validation guarantees one exists.
    #[must_use]
    pub fn current_lesson(&self) -> &Lesson {
        &self.content.lessons[self.current_lesson]
    }

    #[must_use]
    pub fn current_scenario(&self) -> Option<&Scenario> {
        self.content.scenarios.get(self.current_scenario)
    }

    #[must_use]
    pub fn answer_for(&self, quick_check: &QuickCheckId) -> Option<&OptionId> {
        self.answers.get(quick_check)
    }

    #[must_use]
    pub fn is_revealed(&self, quick_check: &QuickCheckId) -> bool {
        self.revealed.contains(quick_check)
    }

    #[must_use]
    pub fn selected_actions(&self, scenario: &ScenarioId) -> Option<&BTreeSet<ActionId>> {
        self.scenario_answers.get(scenario)
    }

    #[must_use]
    pub fn is_scenario_revealed(&self, scenario: &ScenarioId) -> bool {
        self.scenario_revealed.contains(scenario)
    }

    #[must_use]
    pub fn is_lesson_complete(&self, lesson: &LessonId) -> bool {
        self.completed_lessons.contains(lesson)
    }

    #[must_use]
    pub fn completed_lessons(&self) -> &BTreeSet<LessonId> {
        &self.completed_lessons
    }

    #[must_use]
    pub fn all_lessons_complete(&self) -> bool {
        self.completed_lessons.len() == self.content.lessons.len()
    }

    // ─── Scores ───────────────────────────────────────────────────────────────

    #[must_use]
    pub fn lesson_score(&self, index: usize) -> Option<Score> {
        self.content
            .lessons
            .get(index)
            .map(|lesson| scoring::lesson_score(&lesson.quick_checks, &self.answers, &self.revealed))
    }

    #[must_use]
    pub fn current_lesson_score(&self) -> Score {
        scoring::lesson_score(
            &self.current_lesson().quick_checks,
            &self.answers,
            &self.revealed,
        )
    }

    #[must_use]
    pub fn scenario_score(&self, scenario: &ScenarioId) -> Option<Score> {
        self.content.scenario(scenario).map(|s| {
            scoring::scenario_score(
                &s.actions,
                self.scenario_answers.get(&s.id),
                self.scenario_revealed.contains(&s.id),
            )
        })
    }

    #[must_use]
    pub fn learn_totals(&self) -> LearnTotals {
        scoring::learn_totals(&self.content.lessons, &self.answers, &self.revealed)
    }

    #[must_use]
    pub fn scenario_totals(&self) -> ScenarioTotals {
        scoring::scenario_totals(
            &self.content.scenarios,
            &self.scenario_answers,
            &self.scenario_revealed,
        )
    }

    #[must_use]
    pub fn progress(&self) -> CourseProgress {
        CourseProgress {
            stage: self.stage,
            lesson_index: self.current_lesson,
            lessons_total: self.content.lessons.len(),
            lessons_completed: self.completed_lessons.len(),
            scenario_index: self.current_scenario,
            scenarios_total: self.content.scenarios.len(),
            scenarios_revealed: self.scenario_revealed.len(),
            learn: self.learn_totals(),
            all_lessons_complete: self.all_lessons_complete(),
        }
    }

    // ─── Gate checks ──────────────────────────────────────────────────────────

    /// Completion check for the current lesson, with per-quick-check reasons.
    #[must_use]
    pub fn lesson_completion_check(&self) -> CompletionCheck {
        gating::evaluate_lesson(
            self.current_lesson(),
            &self.answers,
            &self.revealed,
            self.policy.completion_mode(),
        )
    }

    /// Unlock check for the scenario stage, evaluated against live state.
    #[must_use]
    pub fn scenario_unlock_check(&self) -> UnlockCheck {
        gating::evaluate_unlock(
            self.all_lessons_complete(),
            self.learn_totals().average,
            &self.policy,
        )
    }

    // ─── Quick-checks ─────────────────────────────────────────────────────────

    /// Record the learner's pick for a quick-check, replacing any earlier pick.
    ///
    /// A revealed quick-check stays revealed, so a changed answer is scored
    /// and gated right away.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownQuickCheck`, or
    /// `ProgressError::InvalidSelection` if the option belongs elsewhere.
    pub fn record_answer(
        &mut self,
        quick_check: &QuickCheckId,
        option: OptionId,
    ) -> Result<(), ProgressError> {
        let qc = self
            .content
            .quick_check(quick_check)
            .ok_or_else(|| ProgressError::UnknownQuickCheck(quick_check.clone()))?;
        if !qc.has_option(&option) {
            return Err(ProgressError::InvalidSelection {
                quick_check: quick_check.clone(),
                option,
            });
        }
        debug!(session = %self.id, %quick_check, %option, "answer recorded");
        self.answers.insert(quick_check.clone(), option);
        Ok(())
    }

    /// Reveal a quick-check. Revealing twice is the same as revealing once.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownQuickCheck` for ids not in the course.
    pub fn reveal(&mut self, quick_check: &QuickCheckId) -> Result<(), ProgressError> {
        if self.content.quick_check(quick_check).is_none() {
            return Err(ProgressError::UnknownQuickCheck(quick_check.clone()));
        }
        if self.revealed.insert(quick_check.clone()) {
            debug!(session = %self.id, %quick_check, "quick-check revealed");
        }
        Ok(())
    }

    // ─── Lessons ──────────────────────────────────────────────────────────────

    /// Mark the current lesson complete if the completion policy allows it.
    ///
    /// On success the cursor moves to the next lesson, except on the last one.
    pub fn complete_current_lesson(&mut self) -> bool {
        let check = self.lesson_completion_check();
        if !check.is_satisfied() {
            debug!(session = %self.id, blockers = check.blockers.len(), "{check}");
            return false;
        }

        let lesson_id = check.lesson;
        if self.completed_lessons.insert(lesson_id.clone()) {
            info!(
                session = %self.id,
                lesson = %lesson_id,
                completed = self.completed_lessons.len(),
                total = self.content.lessons.len(),
                "lesson completed"
            );
        }
        if self.current_lesson + 1 < self.content.lessons.len() {
            self.current_lesson += 1;
        }
        true
    }

    /// Move the lesson cursor. Out-of-range indices are ignored.
    pub fn go_to_lesson(&mut self, index: usize) -> bool {
        if index >= self.content.lessons.len() {
            return false;
        }
        self.current_lesson = index;
        true
    }

    // ─── Stages ───────────────────────────────────────────────────────────────

    /// Enter the scenario stage if the unlock policy allows it right now.
    pub fn enter_scenarios(&mut self) -> bool {
        let check = self.scenario_unlock_check();
        if !check.is_unlocked() {
            debug!(session = %self.id, blockers = ?check.blockers, "scenarios locked");
            return false;
        }
        if self.stage != Stage::Scenarios {
            info!(session = %self.id, from = %self.stage, "entered scenarios");
        }
        self.stage = Stage::Scenarios;
        true
    }

    /// Switch to the approach stage. Always allowed.
    pub fn enter_approach(&mut self) -> bool {
        debug!(session = %self.id, from = %self.stage, "entered approach");
        self.stage = Stage::Approach;
        true
    }

    pub fn return_to_lessons(&mut self) {
        self.stage = Stage::Learn;
    }

    // ─── Scenarios ────────────────────────────────────────────────────────────

    /// Replace the selected actions for a scenario.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownScenario`, or `ProgressError::InvalidAction`
    /// for actions outside the scenario.
    pub fn record_scenario_selection(
        &mut self,
        scenario: &ScenarioId,
        actions: BTreeSet<ActionId>,
    ) -> Result<(), ProgressError> {
        let found = self.find_scenario(scenario)?;
        if let Some(action) = actions.iter().find(|action| !found.has_action(action)) {
            return Err(ProgressError::InvalidAction {
                scenario: scenario.clone(),
                action: action.clone(),
            });
        }

        debug!(session = %self.id, %scenario, selected = actions.len(), "scenario selection recorded");
        self.scenario_answers.insert(scenario.clone(), actions);
        Ok(())
    }

    /// Add or remove a single action from a scenario selection.
    ///
    /// Returns whether the action is selected afterwards.
    ///
    /// # Errors
    ///
    /// Same conditions as [`CourseSession::record_scenario_selection`].
    pub fn toggle_scenario_action(
        &mut self,
        scenario: &ScenarioId,
        action: &ActionId,
    ) -> Result<bool, ProgressError> {
        let found = self.find_scenario(scenario)?;
        if !found.has_action(action) {
            return Err(ProgressError::InvalidAction {
                scenario: scenario.clone(),
                action: action.clone(),
            });
        }

        let selected = self.scenario_answers.entry(scenario.clone()).or_default();
        let now_selected = if selected.remove(action) {
            false
        } else {
            selected.insert(action.clone());
            true
        };
        Ok(now_selected)
    }

    /// Reveal a scenario so its selection is scored. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownScenario` for ids not in the course.
    pub fn reveal_scenario(&mut self, scenario: &ScenarioId) -> Result<(), ProgressError> {
        if self.content.scenario(scenario).is_none() {
            return Err(ProgressError::UnknownScenario(scenario.clone()));
        }
        if self.scenario_revealed.insert(scenario.clone()) {
            debug!(session = %self.id, %scenario, "scenario revealed");
        }
        Ok(())
    }

    pub fn go_to_scenario(&mut self, index: usize) -> bool {
        if index >= self.content.scenarios.len() {
            return false;
        }
        self.current_scenario = index;
        true
    }

    pub fn next_scenario(&mut self) -> bool {
        self.go_to_scenario(self.current_scenario + 1)
    }

    pub fn previous_scenario(&mut self) -> bool {
        match self.current_scenario.checked_sub(1) {
            Some(index) => self.go_to_scenario(index),
            None => false,
        }
    }

    fn find_scenario(&self, scenario: &ScenarioId) -> Result<&Scenario, ProgressError> {
        self.content
            .scenario(scenario)
            .ok_or_else(|| ProgressError::UnknownScenario(scenario.clone()))
    }
}

impl fmt::Debug for CourseSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CourseSession")
            .field("id", &self.id)
            .field("course", &self.content.title)
            .field("stage", &self.stage)
            .field("current_lesson", &self.current_lesson)
            .field("current_scenario", &self.current_scenario)
            .field("completed_lessons", &self.completed_lessons)
            .field("answers_len", &self.answers.len())
            .field("revealed_len", &self.revealed.len())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, QuickCheck, ScenarioAction};
    use crate::time::fixed_now;

    fn quick_check(id: &str, correct: &str) -> QuickCheck {
        QuickCheck {
            id: QuickCheckId::new(id),
            stem: format!("{id}?"),
            options: ["a", "b", "c"]
                .into_iter()
                .map(|opt| AnswerOption {
                    id: OptionId::new(opt),
                    label: opt.to_uppercase(),
                    correct: opt == correct,
                    why: String::new(),
                })
                .collect(),
        }
    }

    fn lesson(id: &str, quick_checks: Vec<QuickCheck>) -> Lesson {
        Lesson {
            id: LessonId::new(id),
            title: id.to_uppercase(),
            summary: String::new(),
            bullets: Vec::new(),
            quick_checks,
            checklist: Vec::new(),
            hints: Vec::new(),
        }
    }

    fn scenario(id: &str, flags: &[(&str, bool)]) -> Scenario {
        Scenario {
            id: ScenarioId::new(id),
            title: id.to_uppercase(),
            situation: String::new(),
            actions: flags
                .iter()
                .map(|(action, correct)| ScenarioAction {
                    id: ActionId::new(*action),
                    label: (*action).into(),
                    correct: *correct,
                    why: String::new(),
                })
                .collect(),
            notes: Vec::new(),
        }
    }

    fn one_lesson_course() -> CourseContent {
        CourseContent {
            title: "Data handling".into(),
            lessons: vec![lesson(
                "l1",
                vec![quick_check("q1", "a"), quick_check("q2", "b")],
            )],
            scenarios: Vec::new(),
        }
    }

    /// Two lessons with five scoreable quick-checks in total.
    fn two_lesson_course() -> CourseContent {
        CourseContent {
            title: "Security".into(),
            lessons: vec![
                lesson("l1", vec![quick_check("q1", "a"), quick_check("q2", "a")]),
                lesson(
                    "l2",
                    vec![
                        quick_check("q3", "a"),
                        quick_check("q4", "a"),
                        quick_check("q5", "a"),
                    ],
                ),
            ],
            scenarios: vec![scenario("s1", &[("x", true), ("y", true), ("z", false)])],
        }
    }

    fn session(content: CourseContent, options: &GateOptions) -> CourseSession {
        CourseSession::new(content, options, fixed_now()).unwrap()
    }

    fn answer_and_reveal(session: &mut CourseSession, qc: &str, option: &str) {
        let id = QuickCheckId::new(qc);
        session.record_answer(&id, OptionId::new(option)).unwrap();
        session.reveal(&id).unwrap();
    }

    #[test]
    fn new_session_starts_in_learn_at_first_lesson() {
        let s = session(one_lesson_course(), &GateOptions::default());
        assert_eq!(s.stage(), Stage::Learn);
        assert_eq!(s.current_lesson_index(), 0);
        assert_eq!(s.current_scenario_index(), 0);
        assert!(s.completed_lessons().is_empty());
        assert_eq!(s.completion_mode(), CompletionMode::Revealed);
    }

    #[test]
    fn new_session_rejects_invalid_options_and_content() {
        let err = CourseSession::new(
            one_lesson_course(),
            &GateOptions::default().with_threshold(2.0),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Options(_)));

        let empty = CourseContent {
            title: "Nothing".into(),
            lessons: Vec::new(),
            scenarios: Vec::new(),
        };
        let err = CourseSession::new(empty, &GateOptions::default(), fixed_now()).unwrap_err();
        assert!(matches!(err, Error::Course(_)));
    }

    #[test]
    fn revealed_mode_completes_after_answers_are_revealed() {
        let options = GateOptions::default().with_mode(CompletionMode::Revealed);
        let mut s = session(one_lesson_course(), &options);
        answer_and_reveal(&mut s, "q1", "a");
        answer_and_reveal(&mut s, "q2", "b");

        assert!(s.complete_current_lesson());
        assert_eq!(
            s.completed_lessons().iter().collect::<Vec<_>>(),
            vec![&LessonId::new("l1")]
        );
        // Single lesson: the cursor stays clamped.
        assert_eq!(s.current_lesson_index(), 0);
    }

    #[test]
    fn correct_mode_rejects_a_wrong_answer_without_changing_state() {
        let options = GateOptions::default().with_mode(CompletionMode::Correct);
        let mut s = session(one_lesson_course(), &options);
        answer_and_reveal(&mut s, "q1", "a");
        answer_and_reveal(&mut s, "q2", "c");

        assert!(!s.complete_current_lesson());
        assert!(s.completed_lessons().is_empty());
        assert_eq!(s.current_lesson_index(), 0);

        let check = s.lesson_completion_check();
        assert_eq!(check.blockers.len(), 1);
        assert_eq!(check.blockers[0].quick_check, QuickCheckId::new("q2"));
    }

    #[test]
    fn legacy_flag_is_resolved_at_construction() {
        let options = GateOptions {
            require_correct_to_complete: Some(true),
            ..GateOptions::default()
        };
        let mut s = session(one_lesson_course(), &options);
        assert_eq!(s.completion_mode(), CompletionMode::Correct);
        answer_and_reveal(&mut s, "q1", "b");
        answer_and_reveal(&mut s, "q2", "b");
        assert!(!s.complete_current_lesson());
    }

    #[test]
    fn completing_advances_until_the_last_lesson() {
        let options = GateOptions::default().with_mode(CompletionMode::Answered);
        let mut s = session(two_lesson_course(), &options);
        for qc in ["q1", "q2"] {
            s.record_answer(&QuickCheckId::new(qc), OptionId::new("a")).unwrap();
        }
        assert!(s.complete_current_lesson());
        assert_eq!(s.current_lesson_index(), 1);

        for qc in ["q3", "q4", "q5"] {
            s.record_answer(&QuickCheckId::new(qc), OptionId::new("b")).unwrap();
        }
        assert!(s.complete_current_lesson());
        assert_eq!(s.current_lesson_index(), 1);
        assert!(s.all_lessons_complete());

        // Completing again is accepted and changes nothing.
        assert!(s.complete_current_lesson());
        assert_eq!(s.completed_lessons().len(), 2);
    }

    #[test]
    fn completed_lessons_never_shrink() {
        let options = GateOptions::default().with_mode(CompletionMode::Answered);
        let mut s = session(two_lesson_course(), &options);
        for qc in ["q1", "q2"] {
            s.record_answer(&QuickCheckId::new(qc), OptionId::new("a")).unwrap();
        }
        assert!(s.complete_current_lesson());

        let before = s.completed_lessons().clone();
        assert!(s.go_to_lesson(0));
        assert!(s.reveal(&QuickCheckId::new("q1")).is_ok());
        s.record_answer(&QuickCheckId::new("q2"), OptionId::new("c")).unwrap();
        let _ = s.complete_current_lesson();
        let _ = s.enter_scenarios();
        s.return_to_lessons();

        assert!(before.is_subset(s.completed_lessons()));
        assert!(s.is_lesson_complete(&LessonId::new("l1")));
    }

    #[test]
    fn reveal_is_idempotent() {
        let mut s = session(one_lesson_course(), &GateOptions::default());
        s.record_answer(&QuickCheckId::new("q1"), OptionId::new("a")).unwrap();
        s.reveal(&QuickCheckId::new("q1")).unwrap();
        let once = (s.learn_totals(), s.lesson_completion_check());

        s.reveal(&QuickCheckId::new("q1")).unwrap();
        assert_eq!((s.learn_totals(), s.lesson_completion_check()), once);
        assert!(s.is_revealed(&QuickCheckId::new("q1")));
    }

    #[test]
    fn record_answer_validates_the_option() {
        let mut s = session(one_lesson_course(), &GateOptions::default());

        let err = s
            .record_answer(&QuickCheckId::new("q1"), OptionId::new("zz"))
            .unwrap_err();
        assert_eq!(
            err,
            ProgressError::InvalidSelection {
                quick_check: QuickCheckId::new("q1"),
                option: OptionId::new("zz"),
            }
        );
        assert!(s.answer_for(&QuickCheckId::new("q1")).is_none());

        let err = s
            .record_answer(&QuickCheckId::new("nope"), OptionId::new("a"))
            .unwrap_err();
        assert!(matches!(err, ProgressError::UnknownQuickCheck(_)));
        assert!(matches!(
            s.reveal(&QuickCheckId::new("nope")),
            Err(ProgressError::UnknownQuickCheck(_))
        ));
    }

    #[test]
    fn wrong_revealed_answer_can_be_corrected_in_correct_mode() {
        let options = GateOptions::default().with_mode(CompletionMode::Correct);
        let mut s = session(one_lesson_course(), &options);
        answer_and_reveal(&mut s, "q1", "b");
        answer_and_reveal(&mut s, "q2", "b");
        assert!(!s.complete_current_lesson());
        assert_eq!(s.current_lesson_score(), Score::new(1, 2));

        s.record_answer(&QuickCheckId::new("q1"), OptionId::new("a"))
            .unwrap();
        assert_eq!(s.answer_for(&QuickCheckId::new("q1")), Some(&OptionId::new("a")));
        assert!(s.is_revealed(&QuickCheckId::new("q1")));
        assert_eq!(s.current_lesson_score(), Score::new(2, 2));
        assert!(s.complete_current_lesson());
    }

    #[test]
    fn reveal_before_answering_does_not_block_the_lesson() {
        let mut s = session(one_lesson_course(), &GateOptions::default());
        for qc in ["q1", "q2"] {
            s.reveal(&QuickCheckId::new(qc)).unwrap();
        }
        assert!(!s.complete_current_lesson());

        s.record_answer(&QuickCheckId::new("q1"), OptionId::new("a"))
            .unwrap();
        s.record_answer(&QuickCheckId::new("q2"), OptionId::new("c"))
            .unwrap();
        assert!(s.complete_current_lesson());
        assert!(s.is_lesson_complete(&LessonId::new("l1")));
    }

    #[test]
    fn enter_scenarios_when_all_lessons_done_and_average_passes() {
        let options = GateOptions::default()
            .with_mode(CompletionMode::Revealed)
            .with_threshold(0.7)
            .with_lock(true);
        let mut s = session(two_lesson_course(), &options);

        answer_and_reveal(&mut s, "q1", "a");
        answer_and_reveal(&mut s, "q2", "a");
        assert!(s.complete_current_lesson());
        answer_and_reveal(&mut s, "q3", "a");
        answer_and_reveal(&mut s, "q4", "a");
        answer_and_reveal(&mut s, "q5", "b");
        assert!(s.complete_current_lesson());

        assert!((s.learn_totals().average - 0.8).abs() < f64::EPSILON);
        assert!(s.enter_scenarios());
        assert_eq!(s.stage(), Stage::Scenarios);
    }

    #[test]
    fn enter_scenarios_requires_every_lesson_when_locked() {
        let options = GateOptions::default()
            .with_mode(CompletionMode::Answered)
            .with_threshold(0.7);
        let mut s = session(two_lesson_course(), &options);

        answer_and_reveal(&mut s, "q1", "a");
        answer_and_reveal(&mut s, "q2", "a");
        answer_and_reveal(&mut s, "q3", "a");
        answer_and_reveal(&mut s, "q4", "a");
        assert!(s.complete_current_lesson());
        assert_eq!(s.completed_lessons().len(), 1);
        assert!((s.learn_totals().average - 0.8).abs() < f64::EPSILON);

        assert!(!s.enter_scenarios());
        assert_eq!(s.stage(), Stage::Learn);
        assert_eq!(
            s.scenario_unlock_check().blockers,
            vec![crate::gating::UnlockBlocker::LessonsIncomplete]
        );
    }

    #[test]
    fn unlock_is_reevaluated_on_every_attempt() {
        let options = GateOptions::default().with_lock(false).with_threshold(0.5);
        let mut s = session(one_lesson_course(), &options);
        assert!(!s.enter_scenarios());

        answer_and_reveal(&mut s, "q1", "a");
        assert!(s.enter_scenarios());
        assert_eq!(s.stage(), Stage::Scenarios);
    }

    #[test]
    fn scenario_selection_scores_after_reveal() {
        let options = GateOptions::default().with_lock(false).with_threshold(0.0);
        let mut s = session(two_lesson_course(), &options);
        assert!(s.enter_scenarios());

        let s1 = ScenarioId::new("s1");
        let picked: BTreeSet<ActionId> = ["x", "y", "z"].into_iter().map(ActionId::new).collect();
        s.record_scenario_selection(&s1, picked).unwrap();
        assert_eq!(s.scenario_score(&s1), Some(Score::new(0, 2)));

        s.reveal_scenario(&s1).unwrap();
        assert_eq!(s.scenario_score(&s1), Some(Score::new(2, 2)));
        assert_eq!(s.scenario_totals().revealed, 1);

        // Selections stay editable after reveal and are rescored at once.
        assert!(!s.toggle_scenario_action(&s1, &ActionId::new("y")).unwrap());
        assert_eq!(s.scenario_score(&s1), Some(Score::new(1, 2)));
        s.record_scenario_selection(&s1, [ActionId::new("x"), ActionId::new("y")].into())
            .unwrap();
        assert_eq!(s.scenario_score(&s1), Some(Score::new(2, 2)));
        assert!(s.is_scenario_revealed(&s1));
    }

    #[test]
    fn scenario_selection_rejects_foreign_actions() {
        let mut s = session(two_lesson_course(), &GateOptions::default());
        let s1 = ScenarioId::new("s1");

        let err = s
            .record_scenario_selection(&s1, [ActionId::new("nope")].into())
            .unwrap_err();
        assert!(matches!(err, ProgressError::InvalidAction { .. }));
        assert!(s.selected_actions(&s1).is_none());

        let err = s
            .record_scenario_selection(&ScenarioId::new("s9"), BTreeSet::new())
            .unwrap_err();
        assert!(matches!(err, ProgressError::UnknownScenario(_)));
    }

    #[test]
    fn toggle_adds_and_removes_actions() {
        let mut s = session(two_lesson_course(), &GateOptions::default());
        let s1 = ScenarioId::new("s1");
        let x = ActionId::new("x");

        assert!(s.toggle_scenario_action(&s1, &x).unwrap());
        assert!(s.selected_actions(&s1).unwrap().contains(&x));
        assert!(!s.toggle_scenario_action(&s1, &x).unwrap());
        assert!(s.selected_actions(&s1).unwrap().is_empty());
    }

    #[test]
    fn navigation_is_bounded() {
        let mut s = session(two_lesson_course(), &GateOptions::default());
        assert!(!s.go_to_lesson(2));
        assert!(s.go_to_lesson(1));
        assert_eq!(s.current_lesson().id, LessonId::new("l2"));

        assert!(!s.previous_scenario());
        assert!(!s.next_scenario());
        assert_eq!(s.current_scenario().unwrap().id, ScenarioId::new("s1"));

        assert!(s.enter_approach());
        assert_eq!(s.stage(), Stage::Approach);
        s.return_to_lessons();
        assert_eq!(s.stage(), Stage::Learn);
    }

    #[test]
    fn progress_snapshot_reflects_state() {
        let options = GateOptions::default().with_mode(CompletionMode::Answered);
        let mut s = session(two_lesson_course(), &options);
        answer_and_reveal(&mut s, "q1", "a");
        answer_and_reveal(&mut s, "q2", "b");
        assert!(s.complete_current_lesson());

        let progress = s.progress();
        assert_eq!(progress.stage, Stage::Learn);
        assert_eq!(progress.lesson_index, 1);
        assert_eq!(progress.lessons_total, 2);
        assert_eq!(progress.lessons_completed, 1);
        assert_eq!(progress.scenarios_total, 1);
        assert_eq!((progress.learn.score, progress.learn.total), (1, 5));
        assert!(!progress.all_lessons_complete);
        assert_eq!(s.lesson_score(0), Some(Score::new(1, 2)));
        assert_eq!(s.lesson_score(7), None);
    }
}
