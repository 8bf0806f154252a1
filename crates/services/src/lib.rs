#![forbid(unsafe_code)]

pub mod config;
pub mod course_service;
pub mod error;
pub mod remote_progress;

pub use course_core::Clock;

pub use config::{EngineConfig, ProgressServiceConfig};
pub use course_service::{ActiveCourse, CourseSessionService};
pub use error::{ConfigError, CourseSessionError};
pub use remote_progress::HttpProgressRepository;
