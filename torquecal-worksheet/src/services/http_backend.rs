//! REST implementation of [`CalibrationBackend`]
//!
//! All endpoints hang off one configurable base URL:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | job | `GET /jobs/{id}/worksheet` |
//! | draft | `POST /draft` |
//! | delete step | `DELETE /step` |
//! | auto-select | `POST`/`PUT /auto-select-standards` |
//! | standards | `GET /jobs/{id}/standards` |
//! | environment | `GET /environment?job_id&phase`, `POST /environment` |
//! | lock | `GET /jobs/{id}/lock` |
//! | complete / uncertainty / terminate | `POST /jobs/{id}/...` |

use crate::config::resolve_backend_url;
use crate::error::BackendError;
use crate::models::{
    AutoSelectResponse, DeleteStepRequest, DraftSnapshot, EnvironmentRecord,
    EnvironmentSubmission, JobData, LockStatus, SelectionMode, StandardSnapshot,
    StandardsRequest,
};
use crate::services::backend::{BackendResult, CalibrationBackend};
use crate::WorksheetResult;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use torquecal_common::config::TomlConfig;
use torquecal_common::events::EnvironmentPhase;
use uuid::Uuid;

const USER_AGENT: &str = concat!("torquecal/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct TerminateBody<'a> {
    reason: &'a str,
}

/// HTTP client for the calibration backend
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> BackendResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from the `[backend]` section (URL resolved ENV → TOML)
    pub fn from_config(config: &TomlConfig) -> WorksheetResult<Self> {
        let base_url = resolve_backend_url(config)?;
        let timeout = Duration::from_secs(config.backend.timeout_secs);
        Ok(Self::new(base_url, timeout)?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and map non-2xx statuses onto [`BackendError`]
    async fn send(&self, request: RequestBuilder, what: &str) -> BackendResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = if body.trim().is_empty() {
            what.to_string()
        } else {
            body
        };

        tracing::debug!(status = status.as_u16(), what = %what, "Backend request rejected");

        Err(match status {
            StatusCode::NOT_FOUND => BackendError::NotFound(detail),
            StatusCode::CONFLICT => BackendError::Conflict(detail),
            StatusCode::LOCKED => BackendError::Locked(detail),
            _ => BackendError::ApiError(status.as_u16(), detail),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
        response
            .json()
            .await
            .map_err(|e| BackendError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl CalibrationBackend for HttpBackend {
    async fn fetch_job(&self, job_id: Uuid) -> BackendResult<JobData> {
        let url = self.url(&format!("/jobs/{}/worksheet", job_id));
        tracing::debug!(job_id = %job_id, url = %url, "Fetching worksheet");

        let response = self
            .send(self.http_client.get(&url), &format!("job {}", job_id))
            .await?;
        let job: JobData = Self::decode(response).await?;

        tracing::info!(
            job_id = %job_id,
            equipment = %job.equipment.description,
            persisted_steps = job.steps.len(),
            "Retrieved worksheet"
        );
        Ok(job)
    }

    async fn save_draft(&self, draft: &DraftSnapshot) -> BackendResult<()> {
        let url = self.url("/draft");
        self.send(self.http_client.post(&url).json(draft), "draft")
            .await?;
        Ok(())
    }

    async fn delete_step(&self, request: &DeleteStepRequest) -> BackendResult<()> {
        let url = self.url("/step");
        let what = format!("step {} of stage {}", request.step_key, request.stage);
        self.send(self.http_client.delete(&url).json(request), &what)
            .await?;
        Ok(())
    }

    async fn auto_select_standards(
        &self,
        mode: SelectionMode,
        request: &StandardsRequest,
    ) -> BackendResult<AutoSelectResponse> {
        let url = self.url("/auto-select-standards");
        let builder = match mode {
            SelectionMode::Create => self.http_client.post(&url),
            SelectionMode::Recompute => self.http_client.put(&url),
        };

        tracing::debug!(job_id = %request.job_id, mode = ?mode, "Requesting standards auto-selection");

        let response = self
            .send(builder.json(request), "auto-select standards")
            .await?;
        Self::decode(response).await
    }

    async fn fetch_standards(&self, job_id: Uuid) -> BackendResult<StandardSnapshot> {
        let url = self.url(&format!("/jobs/{}/standards", job_id));
        let response = self
            .send(self.http_client.get(&url), &format!("standards for job {}", job_id))
            .await?;
        Self::decode(response).await
    }

    async fn fetch_environment(
        &self,
        job_id: Uuid,
        phase: EnvironmentPhase,
    ) -> BackendResult<Option<EnvironmentRecord>> {
        let url = self.url("/environment");
        let request = self
            .http_client
            .get(&url)
            .query(&[("job_id", job_id.to_string()), ("phase", phase.code().to_string())]);

        match self.send(request, "environment").await {
            Ok(response) => Ok(Some(Self::decode(response).await?)),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn save_environment(
        &self,
        submission: &EnvironmentSubmission,
    ) -> BackendResult<EnvironmentRecord> {
        let url = self.url("/environment");
        let response = self
            .send(self.http_client.post(&url).json(submission), "environment")
            .await?;
        Self::decode(response).await
    }

    async fn fetch_lock(&self, job_id: Uuid) -> BackendResult<LockStatus> {
        let url = self.url(&format!("/jobs/{}/lock", job_id));
        let response = self
            .send(self.http_client.get(&url), &format!("lock for job {}", job_id))
            .await?;
        Self::decode(response).await
    }

    async fn complete_job(&self, job_id: Uuid) -> BackendResult<()> {
        let url = self.url(&format!("/jobs/{}/complete", job_id));
        self.send(self.http_client.post(&url), "complete").await?;
        tracing::info!(job_id = %job_id, "Job marked completed");
        Ok(())
    }

    async fn calculate_uncertainty(&self, job_id: Uuid) -> BackendResult<()> {
        let url = self.url(&format!("/jobs/{}/uncertainty", job_id));
        self.send(self.http_client.post(&url), "uncertainty").await?;
        Ok(())
    }

    async fn terminate_job(&self, job_id: Uuid, reason: &str) -> BackendResult<()> {
        let url = self.url(&format!("/jobs/{}/terminate", job_id));
        self.send(
            self.http_client.post(&url).json(&TerminateBody { reason }),
            "terminate",
        )
        .await?;
        tracing::info!(job_id = %job_id, reason = %reason, "Job terminated");
        Ok(())
    }
}
