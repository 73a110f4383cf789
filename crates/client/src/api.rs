//! REST client for the job-runner backend.
//!
//! Wraps the dashboard endpoints (job start, log/status polling,
//! history, settings, terminal sessions) using [`reqwest`].

use std::time::Duration;

use serde::de::DeserializeOwned;

use etx_core::job::{HistoryEntry, JobStatus};
use etx_core::settings::Settings;
use etx_core::terminal::TerminalMode;

use crate::schemas::{
    JobHistoryResponse, JobLogResponse, JobStatusResponse, RunJobRequest, RunJobResponse,
    SettingsTextResponse, SuccessResponse, TerminalOutput, TerminalSendRequest,
    TerminalSendResponse, TerminalStartRequest, TerminalStartResponse,
};

/// HTTP client for a single dashboard backend.
#[derive(Clone)]
pub struct DashboardApi {
    client: reqwest::Client,
    base_url: String,
}

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body was not the expected JSON shape.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DashboardApi {
    /// Create a client for the backend at `base_url`, e.g.
    /// `http://127.0.0.1:5000`. A trailing slash is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a backend path such as `/download_log/abc`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a job. `POST /run_job`.
    pub async fn run_job(&self, request: &RunJobRequest) -> Result<RunJobResponse, ApiError> {
        tracing::debug!(job_type = %request.job_type, "Starting job");
        let response = self
            .client
            .post(self.url("/run_job"))
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Full log text of a job so far. `GET /job_log/{id}`.
    pub async fn job_log(&self, job_id: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/job_log/{job_id}")))
            .send()
            .await?;

        let body: JobLogResponse = Self::parse_response(response).await?;
        Ok(body.log)
    }

    /// Current status of a job. `GET /job_status/{id}`.
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/job_status/{job_id}")))
            .send()
            .await?;

        let body: JobStatusResponse = Self::parse_response(response).await?;
        Ok(body.status)
    }

    /// Job history, oldest first. `GET /job_history`.
    pub async fn job_history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        let response = self.client.get(self.url("/job_history")).send().await?;

        let body: JobHistoryResponse = Self::parse_response(response).await?;
        Ok(body.history)
    }

    /// Raw log file of a finished job. `GET /download_log/{id}`.
    pub async fn download_log(&self, job_id: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/download_log/{job_id}")))
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.text().await?)
    }

    /// Flat settings object. `GET /settings_json`.
    pub async fn load_settings(&self) -> Result<Settings, ApiError> {
        let response = self.client.get(self.url("/settings_json")).send().await?;

        Self::parse_response(response).await
    }

    /// Replace all settings. `POST /settings_json`.
    pub async fn save_settings(&self, settings: &Settings) -> Result<bool, ApiError> {
        let response = self
            .client
            .post(self.url("/settings_json"))
            .json(settings)
            .send()
            .await?;

        let body: SuccessResponse = Self::parse_response(response).await?;
        Ok(body.success)
    }

    /// Raw `settings.txt` contents. Legacy `GET /settings`.
    pub async fn load_settings_text(&self) -> Result<String, ApiError> {
        let response = self.client.get(self.url("/settings")).send().await?;

        let body: SettingsTextResponse = Self::parse_response(response).await?;
        Ok(body.settings)
    }

    /// Overwrite `settings.txt`. Legacy form-encoded `POST /settings`.
    pub async fn save_settings_text(&self, text: &str) -> Result<bool, ApiError> {
        let response = self
            .client
            .post(self.url("/settings"))
            .form(&[("settings", text)])
            .send()
            .await?;

        let body: SuccessResponse = Self::parse_response(response).await?;
        Ok(body.success)
    }

    /// Open a terminal session. `POST /terminal/start`.
    ///
    /// A `{success:false, error}` body is returned as-is even when it
    /// comes with an error status, so the caller can show the message.
    pub async fn terminal_start(
        &self,
        mode: TerminalMode,
    ) -> Result<TerminalStartResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/terminal/start"))
            .json(&TerminalStartRequest { mode })
            .send()
            .await?;

        Self::parse_body_any_status(response).await
    }

    /// Close a terminal session. `POST /terminal/stop/{session_id}`.
    pub async fn terminal_stop(&self, session_id: &str) -> Result<bool, ApiError> {
        let response = self
            .client
            .post(self.url(&format!("/terminal/stop/{session_id}")))
            .send()
            .await?;

        let body: SuccessResponse = Self::parse_body_any_status(response).await?;
        Ok(body.success)
    }

    /// Send one command line to a session. `POST /terminal/send`.
    pub async fn terminal_send(
        &self,
        session_id: &str,
        command: &str,
    ) -> Result<TerminalSendResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/terminal/send"))
            .json(&TerminalSendRequest {
                session_id,
                command,
            })
            .send()
            .await?;

        Self::parse_body_any_status(response).await
    }

    /// Full output of a session so far. `GET /terminal/output/{session_id}`.
    pub async fn terminal_output(&self, session_id: &str) -> Result<TerminalOutput, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/terminal/output/{session_id}")))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Api`] containing
    /// the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Parse the JSON body whatever the status code. Falls back to
    /// [`ApiError::Api`] when an error status carries an unparsable body.
    async fn parse_body_any_status<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(ApiError::Api {
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(ApiError::Decode(e)),
        }
    }
}
