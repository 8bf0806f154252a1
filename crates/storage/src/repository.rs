use async_trait::async_trait;
use course_core::SessionReport;
use course_core::model::{CourseContent, CourseId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read side: where course content comes from.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or replace a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(
        &self,
        id: &CourseId,
        course: &CourseContent,
    ) -> Result<(), StorageError>;

    /// Fetch a course by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_course(&self, id: &CourseId) -> Result<CourseContent, StorageError>;
}

/// Write side: where finished-session reports go.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Append a session report and return its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a report for the same session already
    /// exists, or other storage errors.
    async fn append_report(&self, report: &SessionReport) -> Result<i64, StorageError>;

    /// Fetch a report by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_report(&self, id: i64) -> Result<SessionReport, StorageError>;

    /// List reports for a course, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the reports cannot be read.
    async fn list_reports(&self, course_id: &CourseId) -> Result<Vec<SessionReport>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, CourseContent>>>,
    reports: Arc<Mutex<Vec<SessionReport>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(
        &self,
        id: &CourseId,
        course: &CourseContent,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(id.clone(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: &CourseId) -> Result<CourseContent, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn append_report(&self, report: &SessionReport) -> Result<i64, StorageError> {
        let mut guard = self
            .reports
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.iter().any(|r| r.session_id == report.session_id) {
            return Err(StorageError::Conflict);
        }
        guard.push(report.clone());
        i64::try_from(guard.len()).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn get_report(&self, id: i64) -> Result<SessionReport, StorageError> {
        let guard = self
            .reports
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|index| guard.get(index))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_reports(&self, course_id: &CourseId) -> Result<Vec<SessionReport>, StorageError> {
        let guard = self
            .reports
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|r| &r.course_id == course_id)
            .cloned()
            .collect())
    }
}

/// Aggregates the content source and progress sink behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self { courses, progress }
    }
}
