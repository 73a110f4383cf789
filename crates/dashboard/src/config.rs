use std::time::Duration;

use crate::error::{DashboardError, DashboardResult};

/// Default backend address of the job runner.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// Dashboard configuration loaded from environment variables.
///
/// All fields have defaults matching the stock job-runner setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Base URL of the backend (default: `http://127.0.0.1:5000`).
    pub backend_url: String,
    /// Period of the job log/status poll (default: 1500 ms).
    pub job_poll_interval: Duration,
    /// Period of the terminal output poll (default: 1000 ms).
    pub terminal_poll_interval: Duration,
    /// How long the "Saved" confirmation stays visible (default: 1000 ms).
    pub settings_confirm_delay: Duration,
    /// Per-request HTTP timeout (default: 30 s).
    pub request_timeout: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            job_poll_interval: Duration::from_millis(1500),
            terminal_poll_interval: Duration::from_millis(1000),
            settings_confirm_delay: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `ETX_BACKEND_URL`           | `http://127.0.0.1:5000` |
    /// | `JOB_POLL_INTERVAL_MS`      | `1500`                  |
    /// | `TERMINAL_POLL_INTERVAL_MS` | `1000`                  |
    /// | `SETTINGS_CONFIRM_MS`       | `1000`                  |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                    |
    pub fn from_env() -> DashboardResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DashboardResult<Self> {
        let defaults = Self::default();

        let backend_url = lookup("ETX_BACKEND_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.backend_url);

        let millis = |key: &str, default: Duration| -> DashboardResult<Duration> {
            match lookup(key) {
                Some(raw) => parse_positive(key, &raw).map(Duration::from_millis),
                None => Ok(default),
            }
        };

        let job_poll_interval = millis("JOB_POLL_INTERVAL_MS", defaults.job_poll_interval)?;
        let terminal_poll_interval =
            millis("TERMINAL_POLL_INTERVAL_MS", defaults.terminal_poll_interval)?;
        let settings_confirm_delay =
            millis("SETTINGS_CONFIRM_MS", defaults.settings_confirm_delay)?;

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_positive("REQUEST_TIMEOUT_SECS", &raw)?),
            None => defaults.request_timeout,
        };

        Ok(Self {
            backend_url,
            job_poll_interval,
            terminal_poll_interval,
            settings_confirm_delay,
            request_timeout,
        })
    }
}

fn parse_positive(key: &str, raw: &str) -> DashboardResult<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(DashboardError::Config(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
        Ok(n) => Ok(n),
    }
}
