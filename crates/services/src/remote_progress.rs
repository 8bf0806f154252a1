use std::time::Duration;

use async_trait::async_trait;
use course_core::SessionReport;
use course_core::model::CourseId;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use storage::repository::{ProgressRepository, StorageError};
use tracing::{debug, warn};

use crate::config::ProgressServiceConfig;

/// `ProgressRepository` backed by the remote course-progress HTTP service.
///
/// Routes:
/// - `POST {base}/sessions` with a `SessionReport`, answering `{ "id": .. }`
/// - `GET {base}/sessions/{id}`
/// - `GET {base}/courses/{course_id}/sessions`
#[derive(Clone)]
pub struct HttpProgressRepository {
    client: Client,
    config: ProgressServiceConfig,
}

#[derive(Debug, Deserialize)]
struct CreatedReport {
    id: i64,
}

impl HttpProgressRepository {
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the HTTP client cannot be built.
    pub fn new(config: ProgressServiceConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StorageError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        check_status(response.status())?;
        Ok(response)
    }
}

fn check_status(status: StatusCode) -> Result<(), StorageError> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::NOT_FOUND => Err(StorageError::NotFound),
        StatusCode::CONFLICT => Err(StorageError::Conflict),
        other => {
            warn!(status = %other, "progress service rejected request");
            Err(StorageError::Connection(format!(
                "progress service returned status {other}"
            )))
        }
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, StorageError> {
    response
        .json::<T>()
        .await
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

#[async_trait]
impl ProgressRepository for HttpProgressRepository {
    async fn append_report(&self, report: &SessionReport) -> Result<i64, StorageError> {
        let url = self.endpoint("sessions");
        let response = self.send(self.client.post(&url).json(report)).await?;
        let created: CreatedReport = decode(response).await?;
        debug!(id = created.id, session = %report.session_id, "session report sent");
        Ok(created.id)
    }

    async fn get_report(&self, id: i64) -> Result<SessionReport, StorageError> {
        let url = self.endpoint(&format!("sessions/{id}"));
        let response = self.send(self.client.get(&url)).await?;
        decode(response).await
    }

    async fn list_reports(&self, course_id: &CourseId) -> Result<Vec<SessionReport>, StorageError> {
        let url = self.endpoint(&format!("courses/{course_id}/sessions"));
        let response = self.send(self.client.get(&url)).await?;
        decode(response).await
    }
}
