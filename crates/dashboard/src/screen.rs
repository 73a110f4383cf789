//! In-memory display model of the dashboard.
//!
//! [`Screen`] plays the role the page DOM plays in a browser: components
//! write into it (status banner, job log pane, history table, terminal
//! pane, settings form, hostname picker) and presenters read from it.
//! Every mutation replaces the affected region wholesale and publishes a
//! [`ScreenEvent`] so a presenter can redraw just that region.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use etx_core::error::CoreError;
use etx_core::hostname::{default_hostname, hostname_candidates};
use etx_core::severity::Severity;
use etx_core::terminal::TerminalState;

use crate::history::HistoryRow;
use crate::settings::SettingsForm;

/// Broadcast channel capacity for screen events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Which region of the screen changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenEvent {
    Status,
    JobLog,
    History,
    TerminalOutput,
    TerminalControls,
    TerminalMessage,
    SettingsForm,
    SettingsStatus,
    Hostname,
}

/// The single-line status banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBanner {
    pub message: String,
    pub severity: Severity,
}

/// Terminal output pane plus its controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalPane {
    pub state: TerminalState,
    /// Full output of the session so far.
    pub output: String,
    /// Pending text in the command input field.
    pub input: String,
    pub input_visible: bool,
    /// A locked input ignores typing and submission.
    pub input_enabled: bool,
    pub input_focused: bool,
    pub start_enabled: bool,
    pub stop_enabled: bool,
    /// Inline message under the input (send failures, rejected starts).
    pub message: Option<String>,
}

impl Default for TerminalPane {
    fn default() -> Self {
        Self {
            state: TerminalState::Idle,
            output: String::new(),
            input: String::new(),
            input_visible: false,
            input_enabled: false,
            input_focused: false,
            start_enabled: true,
            stop_enabled: false,
            message: None,
        }
    }
}

impl TerminalPane {
    /// Put the controls back to their pre-start state. Output is kept.
    pub fn reset_controls(&mut self) {
        let output = std::mem::take(&mut self.output);
        *self = Self {
            output,
            ..Self::default()
        };
    }
}

/// GPU/CPU toggle with its derived hostname choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostnamePicker {
    pub is_gpu: bool,
    pub options: Vec<String>,
    pub selected: String,
}

impl HostnamePicker {
    pub fn new(is_gpu: bool) -> Self {
        Self {
            is_gpu,
            options: hostname_candidates(is_gpu),
            selected: default_hostname(is_gpu),
        }
    }

    /// Flip the toggle, regenerating options and the default selection.
    pub fn set_gpu(&mut self, is_gpu: bool) {
        *self = Self::new(is_gpu);
    }

    /// Select one of the current options.
    pub fn select(&mut self, hostname: &str) -> Result<(), CoreError> {
        if !self.options.iter().any(|h| h == hostname) {
            return Err(CoreError::Validation(format!(
                "hostname '{hostname}' is not one of {}",
                self.options.join(", ")
            )));
        }
        self.selected = hostname.to_string();
        Ok(())
    }
}

impl Default for HostnamePicker {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Everything currently displayed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenState {
    pub status: Option<StatusBanner>,
    pub job_log: String,
    pub history: Vec<HistoryRow>,
    pub terminal: TerminalPane,
    pub settings: SettingsForm,
    pub settings_status: String,
    pub hostname: HostnamePicker,
}

/// Shared handle to the display model. Cheap to clone.
#[derive(Clone)]
pub struct Screen {
    state: Arc<Mutex<ScreenState>>,
    events: broadcast::Sender<ScreenEvent>,
}

impl Default for Screen {
    fn default() -> Self {
        Self::new(ScreenState::default())
    }
}

impl Screen {
    pub fn new(initial: ScreenState) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(initial)),
            events,
        }
    }

    /// Receive a [`ScreenEvent`] for every subsequent mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<ScreenEvent> {
        self.events.subscribe()
    }

    /// Copy of the whole display.
    pub fn snapshot(&self) -> ScreenState {
        self.lock().clone()
    }

    // ---- status banner ----

    /// Replace the status banner. Last write wins.
    pub fn show_status(&self, message: impl Into<String>, severity: Severity) {
        self.lock().status = Some(StatusBanner {
            message: message.into(),
            severity,
        });
        self.emit(ScreenEvent::Status);
    }

    pub fn status(&self) -> Option<StatusBanner> {
        self.lock().status.clone()
    }

    // ---- job log pane ----

    pub fn clear_log(&self) {
        self.replace_log(String::new());
    }

    /// Replace the job log pane with the full log text.
    pub fn replace_log(&self, log: impl Into<String>) {
        self.lock().job_log = log.into();
        self.emit(ScreenEvent::JobLog);
    }

    pub fn job_log(&self) -> String {
        self.lock().job_log.clone()
    }

    // ---- history table ----

    pub fn replace_history(&self, rows: Vec<HistoryRow>) {
        self.lock().history = rows;
        self.emit(ScreenEvent::History);
    }

    pub fn history(&self) -> Vec<HistoryRow> {
        self.lock().history.clone()
    }

    // ---- terminal pane ----

    pub fn terminal(&self) -> TerminalPane {
        self.lock().terminal.clone()
    }

    /// Replace the terminal output with the full session output.
    pub fn replace_terminal_output(&self, output: impl Into<String>) {
        self.lock().terminal.output = output.into();
        self.emit(ScreenEvent::TerminalOutput);
    }

    /// Mutate the terminal controls (state, input field, buttons).
    pub fn update_terminal_controls(&self, f: impl FnOnce(&mut TerminalPane)) {
        f(&mut self.lock().terminal);
        self.emit(ScreenEvent::TerminalControls);
    }

    pub fn set_terminal_message(&self, message: Option<String>) {
        self.lock().terminal.message = message;
        self.emit(ScreenEvent::TerminalMessage);
    }

    // ---- settings form ----

    pub fn settings_form(&self) -> SettingsForm {
        self.lock().settings.clone()
    }

    pub fn update_settings_form<T>(&self, f: impl FnOnce(&mut SettingsForm) -> T) -> T {
        let out = f(&mut self.lock().settings);
        self.emit(ScreenEvent::SettingsForm);
        out
    }

    pub fn set_settings_status(&self, text: impl Into<String>) {
        self.lock().settings_status = text.into();
        self.emit(ScreenEvent::SettingsStatus);
    }

    pub fn settings_status(&self) -> String {
        self.lock().settings_status.clone()
    }

    // ---- hostname picker ----

    pub fn hostname(&self) -> HostnamePicker {
        self.lock().hostname.clone()
    }

    pub fn set_gpu(&self, is_gpu: bool) {
        self.lock().hostname.set_gpu(is_gpu);
        self.emit(ScreenEvent::Hostname);
    }

    pub fn select_hostname(&self, hostname: &str) -> Result<(), CoreError> {
        self.lock().hostname.select(hostname)?;
        self.emit(ScreenEvent::Hostname);
        Ok(())
    }

    // ---- private helpers ----

    fn lock(&self) -> MutexGuard<'_, ScreenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ScreenEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
