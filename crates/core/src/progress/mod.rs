//! Per-learner progression through a course.

mod event;
mod report;
mod session;

pub use event::{EventOutcome, LearnerEvent, Rejection};
pub use report::{ScenarioResult, SessionReport};
pub use session::{CourseProgress, CourseSession, ProgressError, Stage};
