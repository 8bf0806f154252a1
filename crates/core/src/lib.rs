#![forbid(unsafe_code)]

pub mod error;
pub mod gating;
pub mod model;
pub mod progress;
pub mod scoring;
pub mod time;

pub use error::Error;
pub use progress::{CourseSession, LearnerEvent, SessionReport, Stage};
pub use time::Clock;
