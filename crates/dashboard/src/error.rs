use etx_client::ApiError;
use etx_core::error::CoreError;

/// Errors surfaced by dashboard components and the CLI.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// A domain-level error from `etx_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The backend could not be reached or answered with an error.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// An environment variable or flag had an invalid value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend refused to open a terminal session.
    #[error("Terminal session failed to start: {0}")]
    TerminalStart(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for component return values.
pub type DashboardResult<T> = Result<T, DashboardError>;
