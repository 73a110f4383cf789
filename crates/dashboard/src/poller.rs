//! Job log/status polling.
//!
//! [`JobPoller::start_polling`] follows one job at a time. Each tick
//! fires two independent fetches (full log text, current status) as
//! separate tasks; neither waits for the other and ticks are not
//! correlated. When a status fetch observes `success` or `error` the
//! banner is updated, the timer stops and the history table is
//! refreshed once.
//!
//! Every run carries a generation number. Responses are applied only
//! while their generation is the active one, so a fetch that was in
//! flight when a newer job started can never overwrite the newer log.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use etx_client::DashboardBackend;
use etx_core::job::JobStatus;
use etx_core::severity::Severity;
use etx_core::types::JobId;

use crate::history::HistoryTable;
use crate::screen::Screen;

pub const JOB_SUCCEEDED_MESSAGE: &str = "Job finished successfully!";
pub const JOB_FAILED_MESSAGE: &str = "Job failed!";

/// Polls one job's log and status on a fixed interval.
///
/// Cloning yields another handle to the same poller.
#[derive(Clone)]
pub struct JobPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    backend: Arc<dyn DashboardBackend>,
    screen: Screen,
    history: HistoryTable,
    interval: Duration,
    slot: Mutex<PollSlot>,
    outcome: watch::Sender<Option<JobStatus>>,
}

#[derive(Default)]
struct PollSlot {
    /// Generation whose responses may still reach the screen.
    generation: u64,
    /// The running timer, if any.
    run: Option<PollRun>,
}

struct PollRun {
    generation: u64,
    job_id: JobId,
    cancel: CancellationToken,
}

impl JobPoller {
    pub fn new(
        backend: Arc<dyn DashboardBackend>,
        screen: Screen,
        history: HistoryTable,
        interval: Duration,
    ) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            inner: Arc::new(PollerInner {
                backend,
                screen,
                history,
                interval,
                slot: Mutex::new(PollSlot::default()),
                outcome,
            }),
        }
    }

    /// Start following `job_id`, abandoning any job polled before.
    ///
    /// Cancels the previous timer, clears the log pane and schedules the
    /// first fetch one interval from now. Must be called inside a Tokio
    /// runtime.
    pub fn start_polling(&self, job_id: impl Into<JobId>) {
        let job_id = job_id.into();
        let cancel = CancellationToken::new();

        let generation = {
            let mut slot = self.inner.lock_slot();
            if let Some(prev) = slot.run.take() {
                tracing::debug!(job_id = %prev.job_id, "Cancelling previous job poll");
                prev.cancel.cancel();
            }
            slot.generation += 1;
            slot.run = Some(PollRun {
                generation: slot.generation,
                job_id: job_id.clone(),
                cancel: cancel.clone(),
            });
            // Cleared under the slot lock so no stale log lands after it.
            self.inner.screen.clear_log();
            self.inner.outcome.send_replace(None);
            slot.generation
        };

        tracing::info!(job_id = %job_id, generation, "Polling job");

        tokio::spawn(poll_loop(Arc::clone(&self.inner), job_id, generation, cancel));
    }

    /// Stop the timer without starting another poll.
    pub fn stop(&self) {
        if let Some(run) = self.inner.lock_slot().run.take() {
            tracing::info!(job_id = %run.job_id, "Job polling stopped");
            run.cancel.cancel();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.inner.lock_slot().run.is_some()
    }

    /// Id of the job whose timer is running.
    pub fn polling_job(&self) -> Option<JobId> {
        self.inner
            .lock_slot()
            .run
            .as_ref()
            .map(|run| run.job_id.clone())
    }

    /// Terminal status of the current run, `None` while it is still going.
    pub fn outcome(&self) -> watch::Receiver<Option<JobStatus>> {
        self.inner.outcome.subscribe()
    }
}

impl PollerInner {
    fn lock_slot(&self) -> MutexGuard<'_, PollSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_log(&self, generation: u64, log: String) {
        let slot = self.lock_slot();
        if slot.generation != generation {
            tracing::debug!(generation, active = slot.generation, "Dropping stale job log");
            return;
        }
        self.screen.replace_log(log);
    }

    /// Stop the run of `generation` if it is still running.
    ///
    /// Returns `true` exactly once per run.
    fn finish(&self, generation: u64, status: JobStatus) -> bool {
        let mut slot = self.lock_slot();
        let is_current = slot
            .run
            .as_ref()
            .is_some_and(|run| run.generation == generation);
        if !is_current {
            return false;
        }
        if let Some(run) = slot.run.take() {
            run.cancel.cancel();
            tracing::info!(job_id = %run.job_id, %status, "Job finished");
        }
        match status {
            JobStatus::Success => self.screen.show_status(JOB_SUCCEEDED_MESSAGE, Severity::Success),
            _ => self.screen.show_status(JOB_FAILED_MESSAGE, Severity::Danger),
        }
        self.outcome.send_replace(Some(status));
        true
    }
}

async fn poll_loop(
    inner: Arc<PollerInner>,
    job_id: JobId,
    generation: u64,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + inner.interval, inner.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                tokio::spawn(fetch_log(Arc::clone(&inner), job_id.clone(), generation));
                tokio::spawn(fetch_status(Arc::clone(&inner), job_id.clone(), generation));
            }
        }
    }

    tracing::debug!(job_id = %job_id, generation, "Job poll loop exited");
}

async fn fetch_log(inner: Arc<PollerInner>, job_id: JobId, generation: u64) {
    match inner.backend.job_log(&job_id).await {
        Ok(log) => inner.apply_log(generation, log),
        Err(e) => tracing::warn!(job_id = %job_id, error = %e, "Job log fetch failed"),
    }
}

async fn fetch_status(inner: Arc<PollerInner>, job_id: JobId, generation: u64) {
    let status = match inner.backend.job_status(&job_id).await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(job_id = %job_id, error = %e, "Job status fetch failed");
            return;
        }
    };

    if !status.is_terminal() || !inner.finish(generation, status) {
        return;
    }

    if let Err(e) = inner.history.refresh().await {
        tracing::warn!(error = %e, "History refresh after job completion failed");
    }
}
