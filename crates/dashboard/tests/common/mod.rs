//! Scripted backend shared by the dashboard integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use etx_client::schemas::{
    RunJobRequest, RunJobResponse, TerminalOutput, TerminalSendResponse, TerminalStartResponse,
};
use etx_client::{ApiError, DashboardBackend};
use etx_core::job::{HistoryEntry, JobStatus};
use etx_core::settings::Settings;
use etx_core::terminal::TerminalMode;
use etx_dashboard::app::Dashboard;
use etx_dashboard::config::DashboardConfig;

/// What the fake answers and what it was asked.
#[derive(Default)]
pub struct Script {
    /// Answers to `run_job`, in order. Empty means a 500.
    pub run_job: VecDeque<RunJobResponse>,
    pub run_job_requests: Vec<RunJobRequest>,

    /// Per-job status sequence; the last one repeats. Unscripted jobs are running.
    pub statuses: HashMap<String, VecDeque<JobStatus>>,
    pub logs: HashMap<String, String>,
    /// Per-job delay before a log response arrives.
    pub log_delays: HashMap<String, Duration>,
    /// Per-job delay before a status response arrives.
    pub status_delays: HashMap<String, Duration>,
    pub status_calls: Vec<String>,
    pub log_calls: Vec<String>,

    pub history: Vec<HistoryEntry>,
    pub history_calls: usize,

    pub settings: Settings,
    pub settings_text: String,
    pub saved_settings: Vec<Settings>,

    pub terminal_start: Option<TerminalStartResponse>,
    pub terminal_start_calls: usize,
    /// Output sequence; the last one repeats.
    pub terminal_outputs: VecDeque<TerminalOutput>,
    pub terminal_output_calls: usize,
    /// Per-session delay before an output response arrives.
    pub output_delays: HashMap<String, Duration>,
    pub send_response: Option<TerminalSendResponse>,
    pub sent: Vec<(String, String)>,
    pub stop_calls: Vec<String>,
}

#[derive(Default)]
pub struct FakeBackend {
    script: Mutex<Script>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Read or change the script.
    pub fn with<T>(&self, f: impl FnOnce(&mut Script) -> T) -> T {
        f(&mut self.script.lock().unwrap())
    }
}

impl Script {
    pub fn start_job(&mut self, job_id: &str) {
        self.run_job.push_back(RunJobResponse {
            job_id: Some(job_id.to_string()),
            error: None,
        });
    }

    pub fn script_statuses(&mut self, job_id: &str, statuses: impl IntoIterator<Item = JobStatus>) {
        self.statuses
            .insert(job_id.to_string(), statuses.into_iter().collect());
    }

    pub fn connect_terminal(&mut self, session_id: &str) {
        self.terminal_start = Some(TerminalStartResponse {
            success: true,
            session_id: Some(session_id.to_string()),
            error: None,
        });
    }

    pub fn script_output(&mut self, outputs: &[(&str, bool)]) {
        self.terminal_outputs = outputs
            .iter()
            .map(|(output, active)| TerminalOutput {
                output: output.to_string(),
                active: *active,
            })
            .collect();
    }

    pub fn calls_for(calls: &[String], job_id: &str) -> usize {
        calls.iter().filter(|id| *id == job_id).count()
    }
}

fn pop_repeating<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

fn server_error() -> ApiError {
    ApiError::Api {
        status: 500,
        body: "scripted failure".to_string(),
    }
}

#[async_trait]
impl DashboardBackend for FakeBackend {
    async fn run_job(&self, request: &RunJobRequest) -> Result<RunJobResponse, ApiError> {
        self.with(|s| {
            s.run_job_requests.push(request.clone());
            s.run_job.pop_front().ok_or_else(server_error)
        })
    }

    async fn job_log(&self, job_id: &str) -> Result<String, ApiError> {
        let delay = self.with(|s| {
            s.log_calls.push(job_id.to_string());
            s.log_delays.get(job_id).copied()
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.with(|s| s.logs.get(job_id).cloned().unwrap_or_default()))
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let (status, delay) = self.with(|s| {
            s.status_calls.push(job_id.to_string());
            let status = s
                .statuses
                .get_mut(job_id)
                .and_then(pop_repeating)
                .unwrap_or(JobStatus::Running);
            (status, s.status_delays.get(job_id).copied())
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(status)
    }

    async fn job_history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        Ok(self.with(|s| {
            s.history_calls += 1;
            s.history.clone()
        }))
    }

    async fn download_log(&self, job_id: &str) -> Result<String, ApiError> {
        self.with(|s| s.logs.get(job_id).cloned()).ok_or(ApiError::Api {
            status: 404,
            body: String::new(),
        })
    }

    async fn load_settings(&self) -> Result<Settings, ApiError> {
        Ok(self.with(|s| s.settings.clone()))
    }

    async fn save_settings(&self, settings: &Settings) -> Result<bool, ApiError> {
        self.with(|s| {
            s.saved_settings.push(settings.clone());
            s.settings = settings.clone();
        });
        Ok(true)
    }

    async fn load_settings_text(&self) -> Result<String, ApiError> {
        Ok(self.with(|s| s.settings_text.clone()))
    }

    async fn save_settings_text(&self, text: &str) -> Result<bool, ApiError> {
        self.with(|s| s.settings_text = text.to_string());
        Ok(true)
    }

    async fn terminal_start(&self, _mode: TerminalMode) -> Result<TerminalStartResponse, ApiError> {
        self.with(|s| {
            s.terminal_start_calls += 1;
            s.terminal_start.clone().ok_or_else(server_error)
        })
    }

    async fn terminal_stop(&self, session_id: &str) -> Result<bool, ApiError> {
        self.with(|s| s.stop_calls.push(session_id.to_string()));
        Ok(true)
    }

    async fn terminal_send(
        &self,
        session_id: &str,
        command: &str,
    ) -> Result<TerminalSendResponse, ApiError> {
        self.with(|s| {
            s.sent.push((session_id.to_string(), command.to_string()));
            Ok(s.send_response.clone().unwrap_or(TerminalSendResponse {
                success: true,
                error: None,
            }))
        })
    }

    async fn terminal_output(&self, session_id: &str) -> Result<TerminalOutput, ApiError> {
        let (output, delay) = self.with(|s| {
            s.terminal_output_calls += 1;
            let output = pop_repeating(&mut s.terminal_outputs).ok_or_else(server_error);
            (output, s.output_delays.get(session_id).copied())
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        output
    }
}

/// Dashboard over `fake` with the stock intervals.
pub fn dashboard(fake: &Arc<FakeBackend>) -> Dashboard {
    let backend: Arc<dyn DashboardBackend> = fake.clone();
    Dashboard::new(backend, &DashboardConfig::default())
}

/// Let paused time run forward, driving every timer due before then.
pub async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
}
