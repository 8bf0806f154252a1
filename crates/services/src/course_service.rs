use std::sync::Arc;

use course_core::CourseSession;
use course_core::model::{CourseId, GateOptions};
use storage::repository::{CourseRepository, ProgressRepository, Storage};
use tracing::info;

use crate::Clock;
use crate::error::CourseSessionError;

/// A running course session together with where it came from.
#[derive(Debug)]
pub struct ActiveCourse {
    course_id: CourseId,
    session: CourseSession,
    report_id: Option<i64>,
}

impl ActiveCourse {
    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn session(&self) -> &CourseSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CourseSession {
        &mut self.session
    }

    /// Set once the report has been stored by [`CourseSessionService::finish`].
    #[must_use]
    pub fn report_id(&self) -> Option<i64> {
        self.report_id
    }
}

/// Loads course content, starts sessions and stores their reports.
#[derive(Clone)]
pub struct CourseSessionService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    progress: Arc<dyn ProgressRepository>,
    gate: GateOptions,
}

impl CourseSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            progress,
            gate: GateOptions::default(),
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.progress),
        )
    }

    #[must_use]
    pub fn with_gate_options(mut self, gate: GateOptions) -> Self {
        self.gate = gate;
        self
    }

    /// Start a session on a stored course using the service's gate options.
    ///
    /// # Errors
    ///
    /// Returns `CourseSessionError::Storage` if the course cannot be loaded and
    /// `CourseSessionError::Engine` if it cannot be started.
    pub async fn start(&self, course_id: &CourseId) -> Result<ActiveCourse, CourseSessionError> {
        self.start_with_options(course_id, &self.gate).await
    }

    /// Start a session with per-call gate options.
    ///
    /// # Errors
    ///
    /// See [`CourseSessionService::start`].
    pub async fn start_with_options(
        &self,
        course_id: &CourseId,
        options: &GateOptions,
    ) -> Result<ActiveCourse, CourseSessionError> {
        let content = self.courses.get_course(course_id).await?;
        let session = CourseSession::new(content, options, self.clock.now())?;
        info!(course = %course_id, session = %session.id(), "course started");
        Ok(ActiveCourse {
            course_id: course_id.clone(),
            session,
            report_id: None,
        })
    }

    /// Store the session report. Calling it again returns the stored id.
    ///
    /// # Errors
    ///
    /// Returns `CourseSessionError::Storage` if the report cannot be stored.
    pub async fn finish(&self, active: &mut ActiveCourse) -> Result<i64, CourseSessionError> {
        if let Some(id) = active.report_id {
            return Ok(id);
        }

        let report = active
            .session
            .report(active.course_id.clone(), self.clock.now());
        let id = self.progress.append_report(&report).await?;
        info!(
            course = %active.course_id,
            session = %report.session_id,
            report = id,
            complete = report.course_complete,
            "course session finished"
        );
        active.report_id = Some(id);
        Ok(id)
    }
}
