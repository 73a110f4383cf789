//! The seam between dashboard components and the HTTP layer.

use async_trait::async_trait;

use etx_core::job::{HistoryEntry, JobStatus};
use etx_core::settings::Settings;
use etx_core::terminal::TerminalMode;

use crate::api::{ApiError, DashboardApi};
use crate::schemas::{
    RunJobRequest, RunJobResponse, TerminalOutput, TerminalSendResponse, TerminalStartResponse,
};

/// Everything the dashboard asks of the backend.
///
/// Implemented by [`DashboardApi`]; tests provide scripted
/// implementations.
#[async_trait]
pub trait DashboardBackend: Send + Sync {
    async fn run_job(&self, request: &RunJobRequest) -> Result<RunJobResponse, ApiError>;

    async fn job_log(&self, job_id: &str) -> Result<String, ApiError>;

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError>;

    async fn job_history(&self) -> Result<Vec<HistoryEntry>, ApiError>;

    async fn download_log(&self, job_id: &str) -> Result<String, ApiError>;

    async fn load_settings(&self) -> Result<Settings, ApiError>;

    async fn save_settings(&self, settings: &Settings) -> Result<bool, ApiError>;

    async fn load_settings_text(&self) -> Result<String, ApiError>;

    async fn save_settings_text(&self, text: &str) -> Result<bool, ApiError>;

    async fn terminal_start(&self, mode: TerminalMode) -> Result<TerminalStartResponse, ApiError>;

    async fn terminal_stop(&self, session_id: &str) -> Result<bool, ApiError>;

    async fn terminal_send(
        &self,
        session_id: &str,
        command: &str,
    ) -> Result<TerminalSendResponse, ApiError>;

    async fn terminal_output(&self, session_id: &str) -> Result<TerminalOutput, ApiError>;

    /// Link a row of the history table points at.
    fn download_url(&self, job_id: &str) -> String {
        format!("/download_log/{job_id}")
    }
}

#[async_trait]
impl DashboardBackend for DashboardApi {
    async fn run_job(&self, request: &RunJobRequest) -> Result<RunJobResponse, ApiError> {
        DashboardApi::run_job(self, request).await
    }

    async fn job_log(&self, job_id: &str) -> Result<String, ApiError> {
        DashboardApi::job_log(self, job_id).await
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        DashboardApi::job_status(self, job_id).await
    }

    async fn job_history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        DashboardApi::job_history(self).await
    }

    async fn download_log(&self, job_id: &str) -> Result<String, ApiError> {
        DashboardApi::download_log(self, job_id).await
    }

    async fn load_settings(&self) -> Result<Settings, ApiError> {
        DashboardApi::load_settings(self).await
    }

    async fn save_settings(&self, settings: &Settings) -> Result<bool, ApiError> {
        DashboardApi::save_settings(self, settings).await
    }

    async fn load_settings_text(&self) -> Result<String, ApiError> {
        DashboardApi::load_settings_text(self).await
    }

    async fn save_settings_text(&self, text: &str) -> Result<bool, ApiError> {
        DashboardApi::save_settings_text(self, text).await
    }

    async fn terminal_start(&self, mode: TerminalMode) -> Result<TerminalStartResponse, ApiError> {
        DashboardApi::terminal_start(self, mode).await
    }

    async fn terminal_stop(&self, session_id: &str) -> Result<bool, ApiError> {
        DashboardApi::terminal_stop(self, session_id).await
    }

    async fn terminal_send(
        &self,
        session_id: &str,
        command: &str,
    ) -> Result<TerminalSendResponse, ApiError> {
        DashboardApi::terminal_send(self, session_id, command).await
    }

    async fn terminal_output(&self, session_id: &str) -> Result<TerminalOutput, ApiError> {
        DashboardApi::terminal_output(self, session_id).await
    }

    fn download_url(&self, job_id: &str) -> String {
        self.url(&format!("/download_log/{job_id}"))
    }
}
