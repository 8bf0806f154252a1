use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{CompletionMode, CourseId, LessonId, ScenarioId, SessionId};
use crate::progress::{CourseSession, Stage};
use crate::scoring::{LearnTotals, ScenarioTotals};

/// Per-scenario line of a [`SessionReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: ScenarioId,
    pub score: u32,
    pub total: u32,
    pub revealed: bool,
}

/// Snapshot of a finished (or abandoned) session, sent to the progress service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: SessionId,
    pub course_id: CourseId,
    pub course_title: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stage: Stage,
    pub completion_mode: CompletionMode,
    pub completed_lessons: Vec<LessonId>,
    pub lessons_total: usize,
    pub course_complete: bool,
    pub learn: LearnTotals,
    pub scenarios: ScenarioTotals,
    pub scenario_results: Vec<ScenarioResult>,
}

impl CourseSession {
    /// Build the report for this session as of `finished_at`.
    ///
    /// Completed lessons are listed in course order.
    #[must_use]
    pub fn report(&self, course_id: CourseId, finished_at: DateTime<Utc>) -> SessionReport {
        let content = self.content();
        let completed_lessons = content
            .lessons
            .iter()
            .filter(|lesson| self.is_lesson_complete(&lesson.id))
            .map(|lesson| lesson.id.clone())
            .collect();

        let scenario_results = content
            .scenarios
            .iter()
            .filter_map(|scenario| {
                self.scenario_score(&scenario.id).map(|score| ScenarioResult {
                    scenario: scenario.id.clone(),
                    score: score.score,
                    total: score.total,
                    revealed: self.is_scenario_revealed(&scenario.id),
                })
            })
            .collect();

        SessionReport {
            session_id: self.id(),
            course_id,
            course_title: content.title.clone(),
            started_at: self.started_at(),
            finished_at,
            stage: self.stage(),
            completion_mode: self.completion_mode(),
            completed_lessons,
            lessons_total: content.lessons.len(),
            course_complete: self.all_lessons_complete(),
            learn: self.learn_totals(),
            scenarios: self.scenario_totals(),
            scenario_results,
        }
    }
}
