mod course;
mod ids;
mod options;

pub use course::{
    AnswerOption, ContentWarning, CourseContent, CourseError, Lesson, QuickCheck, Scenario,
    ScenarioAction,
};
pub use ids::{ActionId, CourseId, LessonId, OptionId, QuickCheckId, ScenarioId, SessionId};
pub use options::{
    CompletionMode, DEFAULT_SCENARIO_UNLOCK_THRESHOLD, GateOptions, GateOptionsError, GatePolicy,
};
