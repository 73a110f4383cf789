//! Request and response bodies for the backend endpoints.

use serde::{Deserialize, Serialize};

use etx_core::job::{HistoryEntry, JobStatus, JobType};
use etx_core::terminal::TerminalMode;
use etx_core::types::{JobId, SessionId};

/// Body of `POST /run_job`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunJobRequest {
    pub job_type: JobType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_gpu: Option<bool>,
}

impl RunJobRequest {
    pub fn new(job_type: JobType) -> Self {
        Self {
            job_type,
            hostname: None,
            is_gpu: None,
        }
    }
}

/// Response of `POST /run_job`. `job_id` is absent when the job did not start.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RunJobResponse {
    #[serde(default)]
    pub job_id: Option<JobId>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobLogResponse {
    #[serde(default)]
    pub log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    pub status: JobStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobHistoryResponse {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// `{success: bool}` acknowledgement used by several endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
}

/// Response of the legacy `GET /settings`.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsTextResponse {
    #[serde(default)]
    pub settings: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TerminalStartRequest {
    pub mode: TerminalMode,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TerminalStartResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TerminalSendRequest<'a> {
    pub session_id: &'a str,
    pub command: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TerminalSendResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `GET /terminal/output/{session_id}`: the full output so far.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TerminalOutput {
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub active: bool,
}
