//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::GateOptionsError;
use storage::repository::StorageError;

/// Errors emitted while loading `EngineConfig`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Gate(#[from] GateOptionsError),
    #[error("invalid progress service URL: {0}")]
    InvalidBaseUrl(String),
}

/// Errors emitted by `CourseSessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseSessionError {
    #[error(transparent)]
    Engine(#[from] course_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
