//! Job types, statuses, handles and history entries.
//!
//! The backend owns the authoritative job state; the client only keeps
//! the last-observed [`JobStatus`] and the [`JobHandle`] of the job it
//! is currently following.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, HISTORY_TIMESTAMP_FORMAT};

/// The fixed set of jobs the backend knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    GithubToLocal,
    LocalToEtx,
    RunEtxCommands,
    DeleteLocalFolders,
    Pipeline,
}

impl JobType {
    pub const ALL: [JobType; 5] = [
        JobType::GithubToLocal,
        JobType::LocalToEtx,
        JobType::RunEtxCommands,
        JobType::DeleteLocalFolders,
        JobType::Pipeline,
    ];

    /// Wire name sent as `job_type` to `POST /run_job`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GithubToLocal => "github_to_local",
            Self::LocalToEtx => "local_to_etx",
            Self::RunEtxCommands => "run_etx_commands",
            Self::DeleteLocalFolders => "delete_local_folders",
            Self::Pipeline => "pipeline",
        }
    }

    /// Human-readable label for tables and prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::GithubToLocal => "GitHub -> Local",
            Self::LocalToEtx => "Local -> ETX",
            Self::RunEtxCommands => "Run ETX commands",
            Self::DeleteLocalFolders => "Delete local folders",
            Self::Pipeline => "Full pipeline",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("unknown job type '{s}'")))
    }
}

/// Last-observed status of a job.
///
/// The backend answers `unknown` for ids it has never seen; that and any
/// other unrecognised value deserialize to [`JobStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// `true` once the job can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The job the client is currently following.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: JobId,
    pub job_type: JobType,
    pub hostname: Option<String>,
    pub is_gpu: Option<bool>,
}

/// One row of the backend's job history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: JobId,
    /// Kept as a raw string: history may contain job types this client
    /// does not know about.
    #[serde(rename = "type")]
    pub job_type: String,
    pub start: String,
    pub end: String,
    pub status: JobStatus,
}

impl HistoryEntry {
    /// Path of the log download link for this entry.
    pub fn download_path(&self) -> String {
        format!("/download_log/{}", self.id)
    }

    /// Wall-clock duration between `start` and `end`.
    ///
    /// Returns `None` when either timestamp does not parse or the end
    /// precedes the start.
    pub fn duration(&self) -> Option<Duration> {
        let start = NaiveDateTime::parse_from_str(&self.start, HISTORY_TIMESTAMP_FORMAT).ok()?;
        let end = NaiveDateTime::parse_from_str(&self.end, HISTORY_TIMESTAMP_FORMAT).ok()?;
        (end - start).to_std().ok()
    }
}
