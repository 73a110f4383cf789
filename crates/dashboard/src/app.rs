use std::sync::Arc;

use etx_client::{DashboardApi, DashboardBackend};

use crate::config::DashboardConfig;
use crate::dispatcher::CommandDispatcher;
use crate::error::DashboardResult;
use crate::history::HistoryTable;
use crate::poller::JobPoller;
use crate::screen::Screen;
use crate::settings::SettingsBridge;
use crate::terminal::TerminalController;

/// All dashboard components wired to one backend and one [`Screen`].
pub struct Dashboard {
    pub screen: Screen,
    pub history: HistoryTable,
    pub poller: JobPoller,
    pub dispatcher: CommandDispatcher,
    pub terminal: TerminalController,
    pub settings: SettingsBridge,
}

impl Dashboard {
    pub fn new(backend: Arc<dyn DashboardBackend>, config: &DashboardConfig) -> Self {
        let screen = Screen::default();
        let history = HistoryTable::new(Arc::clone(&backend), screen.clone());
        let poller = JobPoller::new(
            Arc::clone(&backend),
            screen.clone(),
            history.clone(),
            config.job_poll_interval,
        );
        let dispatcher =
            CommandDispatcher::new(Arc::clone(&backend), screen.clone(), poller.clone());
        let terminal = TerminalController::new(
            Arc::clone(&backend),
            screen.clone(),
            config.terminal_poll_interval,
        );
        let settings = SettingsBridge::new(backend, screen.clone(), config.settings_confirm_delay);

        Self {
            screen,
            history,
            poller,
            dispatcher,
            terminal,
            settings,
        }
    }

    /// Build a dashboard talking HTTP to `config.backend_url`.
    pub fn connect(config: &DashboardConfig) -> DashboardResult<Self> {
        let api = DashboardApi::with_timeout(&config.backend_url, config.request_timeout)?;
        tracing::debug!(backend_url = %api.base_url(), "Backend client ready");
        Ok(Self::new(Arc::new(api), config))
    }
}
