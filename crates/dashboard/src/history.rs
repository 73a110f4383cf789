//! Job history table.
//!
//! Every [`HistoryTable::refresh`] fetches the complete history and
//! redraws the table newest-first. There is no incremental update.

use std::sync::Arc;
use std::time::Duration;

use etx_client::{ApiError, DashboardBackend};
use etx_core::job::{HistoryEntry, JobStatus};
use etx_core::types::JobId;

use crate::screen::Screen;

/// Colour of the status badge in a history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Success,
    Danger,
    Secondary,
}

impl Badge {
    pub fn for_status(status: JobStatus) -> Self {
        match status {
            JobStatus::Success => Self::Success,
            JobStatus::Error => Self::Danger,
            _ => Self::Secondary,
        }
    }
}

/// One rendered row of the history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub id: JobId,
    pub job_type: String,
    pub start: String,
    pub end: String,
    pub status: JobStatus,
    pub badge: Badge,
    pub duration: Option<Duration>,
    /// Link to the downloadable log of this job.
    pub log_url: String,
}

/// Turn the backend's oldest-first list into newest-first rows.
pub fn build_rows(entries: Vec<HistoryEntry>, log_url: impl Fn(&str) -> String) -> Vec<HistoryRow> {
    entries
        .into_iter()
        .rev()
        .map(|entry| HistoryRow {
            badge: Badge::for_status(entry.status),
            duration: entry.duration(),
            log_url: log_url(&entry.id),
            id: entry.id,
            job_type: entry.job_type,
            start: entry.start,
            end: entry.end,
            status: entry.status,
        })
        .collect()
}

/// Fetches job history and redraws the table on the [`Screen`].
#[derive(Clone)]
pub struct HistoryTable {
    backend: Arc<dyn DashboardBackend>,
    screen: Screen,
}

impl HistoryTable {
    pub fn new(backend: Arc<dyn DashboardBackend>, screen: Screen) -> Self {
        Self { backend, screen }
    }

    /// Fetch the full history and redraw the table.
    ///
    /// Returns the number of rows drawn. On error the table is left as it was.
    pub async fn refresh(&self) -> Result<usize, ApiError> {
        let entries = self.backend.job_history().await?;
        let rows = build_rows(entries, |id| self.backend.download_url(id));
        let count = rows.len();
        self.screen.replace_history(rows);
        tracing::debug!(rows = count, "History table redrawn");
        Ok(count)
    }

    /// Download the log file of one history entry.
    pub async fn download(&self, job_id: &str) -> Result<String, ApiError> {
        self.backend.download_log(job_id).await
    }
}
