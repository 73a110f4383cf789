//! Terminal session controller.
//!
//! Drives one remote shell session at a time through the backend:
//! start, poll the full output buffer, send line commands, stop. The
//! output poll works like the job poller: a spawned loop on a fixed
//! interval, one spawned fetch per tick, a generation number guarding
//! every response.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use etx_client::DashboardBackend;
use etx_core::error::CoreError;
use etx_core::terminal::{TerminalMode, TerminalSessionHandle, TerminalState};
use etx_core::types::SessionId;

use crate::error::{DashboardError, DashboardResult};
use crate::screen::Screen;

const START_ACTION: &str = "start a terminal session";

/// Owns the terminal session lifecycle and its output poll.
#[derive(Clone)]
pub struct TerminalController {
    inner: Arc<TerminalInner>,
}

struct TerminalInner {
    backend: Arc<dyn DashboardBackend>,
    screen: Screen,
    interval: Duration,
    slot: Mutex<SessionSlot>,
}

struct SessionSlot {
    state: TerminalState,
    session: Option<TerminalSessionHandle>,
    generation: u64,
    cancel: Option<CancellationToken>,
}

impl SessionSlot {
    fn stop_timer(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

impl TerminalController {
    pub fn new(backend: Arc<dyn DashboardBackend>, screen: Screen, interval: Duration) -> Self {
        Self {
            inner: Arc::new(TerminalInner {
                backend,
                screen,
                interval,
                slot: Mutex::new(SessionSlot {
                    state: TerminalState::Idle,
                    session: None,
                    generation: 0,
                    cancel: None,
                }),
            }),
        }
    }

    pub fn state(&self) -> TerminalState {
        self.inner.lock_slot().state
    }

    /// The current session, kept after the backend reports it inactive.
    pub fn session(&self) -> Option<TerminalSessionHandle> {
        self.inner.lock_slot().session.clone()
    }

    /// Open a session in `mode`.
    ///
    /// Rejected with [`CoreError::InvalidTransition`] while a session is
    /// starting or connected. A backend refusal moves to
    /// [`TerminalState::Error`] and shows the error in the output pane.
    pub async fn start(&self, mode: TerminalMode) -> DashboardResult<()> {
        let generation = {
            let mut slot = self.inner.lock_slot();
            if !slot.state.can_start() {
                let err = CoreError::InvalidTransition {
                    from: slot.state.as_str(),
                    action: START_ACTION,
                };
                drop(slot);
                self.inner.screen.set_terminal_message(Some(err.to_string()));
                return Err(err.into());
            }
            slot.stop_timer();
            slot.generation += 1;
            slot.session = None;
            slot.state = TerminalState::Starting;
            slot.generation
        };

        self.inner.screen.replace_terminal_output(String::new());
        self.inner.screen.update_terminal_controls(|pane| {
            pane.reset_controls();
            pane.state = TerminalState::Starting;
            pane.start_enabled = false;
        });
        tracing::info!(%mode, "Starting terminal session");

        let failure = match self.inner.backend.terminal_start(mode).await {
            Ok(resp) => match resp.session_id {
                Some(session_id) if resp.success => {
                    self.connect(generation, session_id, mode);
                    return Ok(());
                }
                _ => {
                    let message = resp
                        .error
                        .unwrap_or_else(|| "terminal session was not started".to_string());
                    (message.clone(), DashboardError::TerminalStart(message))
                }
            },
            Err(e) => (e.to_string(), DashboardError::Api(e)),
        };

        let (message, err) = failure;
        tracing::warn!(error = %message, "Terminal session failed to start");
        self.inner.fail(generation, &message);
        Err(err)
    }

    /// Close the session. Returns `Ok(false)` when there is nothing to
    /// stop or the backend declined.
    pub async fn stop(&self) -> DashboardResult<bool> {
        let session_id = {
            let slot = self.inner.lock_slot();
            match (slot.state, slot.session.as_ref()) {
                (TerminalState::Connected | TerminalState::Finished, Some(session)) => {
                    session.session_id.clone()
                }
                _ => return Ok(false),
            }
        };

        if !self.inner.backend.terminal_stop(&session_id).await? {
            tracing::warn!(session_id = %session_id, "Backend refused to stop terminal session");
            self.inner
                .screen
                .set_terminal_message(Some("Failed to stop terminal session".to_string()));
            return Ok(false);
        }

        {
            let mut slot = self.inner.lock_slot();
            let same_session = slot
                .session
                .as_ref()
                .is_some_and(|session| session.session_id == session_id);
            if !same_session {
                return Ok(true);
            }
            slot.stop_timer();
            slot.generation += 1;
            slot.session = None;
            slot.state = TerminalState::Disconnected;
        }

        self.inner.screen.update_terminal_controls(|pane| {
            pane.reset_controls();
            pane.state = TerminalState::Disconnected;
        });
        tracing::info!(session_id = %session_id, "Terminal session stopped");
        Ok(true)
    }

    /// Replace the pending input. Ignored while the input is locked.
    pub fn type_input(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        let mut accepted = false;
        self.inner.screen.update_terminal_controls(|pane| {
            if pane.input_enabled {
                pane.input = text;
                accepted = true;
            }
        });
        accepted
    }

    /// Submit the pending input as one command.
    ///
    /// The input is cleared before the request goes out. A failed send
    /// only sets the inline message; polling carries on.
    pub async fn send_command(&self) -> bool {
        let Some(session_id) = self.inner.active_session() else {
            return false;
        };

        let mut command = None;
        self.inner.screen.update_terminal_controls(|pane| {
            let trimmed = pane.input.trim();
            if pane.input_enabled && !trimmed.is_empty() {
                command = Some(trimmed.to_string());
                pane.input.clear();
            }
        });
        let Some(command) = command else {
            return false;
        };

        tracing::debug!(session_id = %session_id, command = %command, "Sending terminal command");
        let failure = match self.inner.backend.terminal_send(&session_id, &command).await {
            Ok(resp) if resp.success => {
                self.inner.screen.set_terminal_message(None);
                return true;
            }
            Ok(resp) => resp.error.unwrap_or_else(|| "command was not accepted".to_string()),
            Err(e) => e.to_string(),
        };

        tracing::warn!(session_id = %session_id, error = %failure, "Terminal command failed");
        self.inner
            .screen
            .set_terminal_message(Some(format!("Error: {failure}")));
        false
    }

    /// Type `text` and submit it.
    pub async fn send_line(&self, text: &str) -> bool {
        self.type_input(text) && self.send_command().await
    }

    fn connect(&self, generation: u64, session_id: SessionId, mode: TerminalMode) {
        let cancel = CancellationToken::new();
        {
            let mut slot = self.inner.lock_slot();
            if slot.generation != generation {
                return;
            }
            slot.session = Some(TerminalSessionHandle::new(session_id.clone(), mode));
            slot.state = TerminalState::Connected;
            slot.cancel = Some(cancel.clone());
        }

        let interactive = mode.is_interactive();
        self.inner.screen.update_terminal_controls(|pane| {
            pane.state = TerminalState::Connected;
            pane.input_visible = interactive;
            pane.input_enabled = interactive;
            pane.input_focused = interactive;
            pane.start_enabled = false;
            pane.stop_enabled = true;
            pane.message = None;
        });
        tracing::info!(session_id = %session_id, %mode, "Terminal session connected");

        tokio::spawn(poll_output(
            Arc::clone(&self.inner),
            session_id,
            generation,
            cancel,
        ));
    }
}

impl TerminalInner {
    fn lock_slot(&self) -> MutexGuard<'_, SessionSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active_session(&self) -> Option<SessionId> {
        let slot = self.lock_slot();
        if slot.state != TerminalState::Connected {
            return None;
        }
        slot.session
            .as_ref()
            .filter(|session| session.active)
            .map(|session| session.session_id.clone())
    }

    fn fail(&self, generation: u64, message: &str) {
        {
            let mut slot = self.lock_slot();
            if slot.generation != generation {
                return;
            }
            slot.state = TerminalState::Error;
        }
        self.screen.replace_terminal_output(format!("Error: {message}"));
        self.screen.update_terminal_controls(|pane| {
            pane.reset_controls();
            pane.state = TerminalState::Error;
        });
    }

    fn apply_output(&self, generation: u64, output: String, active: bool) {
        let mut slot = self.lock_slot();
        if slot.generation != generation || slot.state != TerminalState::Connected {
            tracing::debug!(generation, active = slot.generation, "Dropping stale terminal output");
            return;
        }
        self.screen.replace_terminal_output(output);
        if active {
            return;
        }

        slot.stop_timer();
        slot.state = TerminalState::Finished;
        if let Some(session) = slot.session.as_mut() {
            session.active = false;
            tracing::info!(session_id = %session.session_id, "Terminal session finished");
        }
        self.screen.update_terminal_controls(|pane| {
            pane.state = TerminalState::Finished;
            pane.input_enabled = false;
            pane.input_focused = false;
            pane.start_enabled = true;
        });
    }
}

async fn poll_output(
    inner: Arc<TerminalInner>,
    session_id: SessionId,
    generation: u64,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + inner.interval, inner.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                tokio::spawn(fetch_output(Arc::clone(&inner), session_id.clone(), generation));
            }
        }
    }

    tracing::debug!(session_id = %session_id, generation, "Terminal poll loop exited");
}

async fn fetch_output(inner: Arc<TerminalInner>, session_id: SessionId, generation: u64) {
    match inner.backend.terminal_output(&session_id).await {
        Ok(out) => inner.apply_output(generation, out.output, out.active),
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "Terminal output fetch failed")
        }
    }
}
