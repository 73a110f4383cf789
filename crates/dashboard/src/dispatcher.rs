//! Maps dashboard actions to backend jobs.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use etx_client::schemas::RunJobRequest;
use etx_client::DashboardBackend;
use etx_core::error::CoreError;
use etx_core::job::{JobHandle, JobType};
use etx_core::severity::Severity;

use crate::error::DashboardResult;
use crate::poller::JobPoller;
use crate::screen::Screen;

pub const STARTING_MESSAGE: &str = "Starting job...";
pub const START_FAILED_MESSAGE: &str = "Failed to start job";

/// A job button on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiAction {
    RunGithubToLocal,
    RunLocalToEtx,
    RunEtxCommands,
    DeleteLocalFolders,
    RunPipeline,
}

impl UiAction {
    pub const ALL: [UiAction; 5] = [
        UiAction::RunGithubToLocal,
        UiAction::RunLocalToEtx,
        UiAction::RunEtxCommands,
        UiAction::DeleteLocalFolders,
        UiAction::RunPipeline,
    ];

    /// Element id of the button.
    pub fn id(&self) -> &'static str {
        match self {
            Self::RunGithubToLocal => "run-github-to-local",
            Self::RunLocalToEtx => "run-local-to-etx",
            Self::RunEtxCommands => "run-etx-commands",
            Self::DeleteLocalFolders => "delete-local-folders",
            Self::RunPipeline => "run-pipeline",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.id() == id)
    }

    pub fn job_type(&self) -> JobType {
        match self {
            Self::RunGithubToLocal => JobType::GithubToLocal,
            Self::RunLocalToEtx => JobType::LocalToEtx,
            Self::RunEtxCommands => JobType::RunEtxCommands,
            Self::DeleteLocalFolders => JobType::DeleteLocalFolders,
            Self::RunPipeline => JobType::Pipeline,
        }
    }

    /// Whether the request carries the selected hostname and GPU flag.
    pub fn collects_host(&self) -> bool {
        matches!(self, Self::RunEtxCommands)
    }
}

impl fmt::Display for UiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Accepts either a button id (`run-pipeline`) or a job type (`pipeline`).
impl FromStr for UiAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(action) = Self::from_id(s) {
            return Ok(action);
        }
        JobType::from_str(s)
            .ok()
            .and_then(|t| Self::ALL.into_iter().find(|a| a.job_type() == t))
            .ok_or_else(|| CoreError::UnknownAction(s.to_string()))
    }
}

/// Starts jobs and hands them to the [`JobPoller`].
pub struct CommandDispatcher {
    backend: Arc<dyn DashboardBackend>,
    screen: Screen,
    poller: JobPoller,
    current_job: Mutex<Option<JobHandle>>,
}

impl CommandDispatcher {
    pub fn new(backend: Arc<dyn DashboardBackend>, screen: Screen, poller: JobPoller) -> Self {
        Self {
            backend,
            screen,
            poller,
            current_job: Mutex::new(None),
        }
    }

    /// Start the job behind `action`.
    ///
    /// Returns the new handle once the backend has assigned an id, or
    /// `None` when it answered without one. Either way the banner tells
    /// the operator what happened.
    pub async fn dispatch(&self, action: UiAction) -> DashboardResult<Option<JobHandle>> {
        let job_type = action.job_type();
        let mut request = RunJobRequest::new(job_type);
        if action.collects_host() {
            let picker = self.screen.hostname();
            request.hostname = Some(picker.selected);
            request.is_gpu = Some(picker.is_gpu);
        }

        self.screen.show_status(STARTING_MESSAGE, Severity::Info);
        tracing::info!(action = %action, job_type = %job_type, "Dispatching job");

        let response = match self.backend.run_job(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(job_type = %job_type, error = %e, "Job start request failed");
                self.screen.show_status(START_FAILED_MESSAGE, Severity::Danger);
                return Err(e.into());
            }
        };

        let Some(job_id) = response.job_id else {
            tracing::warn!(
                job_type = %job_type,
                error = response.error.as_deref().unwrap_or("no job id"),
                "Backend did not start job"
            );
            self.screen.show_status(START_FAILED_MESSAGE, Severity::Danger);
            return Ok(None);
        };

        let handle = JobHandle {
            id: job_id.clone(),
            job_type,
            hostname: request.hostname,
            is_gpu: request.is_gpu,
        };
        *self.lock_job() = Some(handle.clone());

        self.screen
            .show_status(format!("Job started: {job_id}"), Severity::Success);
        self.poller.start_polling(job_id);
        Ok(Some(handle))
    }

    pub fn set_gpu(&self, is_gpu: bool) {
        self.screen.set_gpu(is_gpu);
    }

    pub fn select_hostname(&self, hostname: &str) -> DashboardResult<()> {
        Ok(self.screen.select_hostname(hostname)?)
    }

    /// The most recently started job.
    pub fn current_job(&self) -> Option<JobHandle> {
        self.lock_job().clone()
    }

    fn lock_job(&self) -> MutexGuard<'_, Option<JobHandle>> {
        self.current_job.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
