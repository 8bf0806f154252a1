//! Course content stored as `<course_id>.json` files in a directory.

use async_trait::async_trait;
use course_core::model::{CourseContent, CourseId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::repository::{CourseRepository, StorageError};

#[derive(Debug, Clone)]
pub struct JsonCourseDirectory {
    root: PathBuf,
}

impl JsonCourseDirectory {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the file backing `id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for ids that would escape the directory.
    pub fn path_for(&self, id: &CourseId) -> Result<PathBuf, StorageError> {
        let raw = id.as_str();
        if raw.is_empty() || raw.contains(['/', '\\']) || raw.starts_with('.') {
            return Err(StorageError::NotFound);
        }
        Ok(self.root.join(format!("{raw}.json")))
    }
}

/// Read and parse a single course file.
///
/// # Errors
///
/// Returns `StorageError::NotFound` if the file is missing,
/// `StorageError::Serialization` if the JSON does not describe a course, or
/// `StorageError::Connection` for other I/O failures.
pub async fn read_course_file(path: &Path) -> Result<CourseContent, StorageError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

#[async_trait]
impl CourseRepository for JsonCourseDirectory {
    async fn upsert_course(
        &self,
        id: &CourseId,
        course: &CourseContent,
    ) -> Result<(), StorageError> {
        let path = self.path_for(id)?;
        let body = serde_json::to_vec_pretty(course)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        debug!(course = %id, path = %path.display(), "course written");
        Ok(())
    }

    async fn get_course(&self, id: &CourseId) -> Result<CourseContent, StorageError> {
        let path = self.path_for(id)?;
        let course = read_course_file(&path).await?;
        debug!(course = %id, lessons = course.lessons.len(), "course loaded");
        Ok(course)
    }
}
