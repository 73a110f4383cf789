//! Terminal session modes, lifecycle states and the session handle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::SessionId;

/// How the backend drives the remote shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalMode {
    /// The operator types commands; the input field is shown.
    Interactive,
    /// The backend replays the configured `REMOTE_COMMANDS`.
    Automated,
}

impl TerminalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Automated => "automated",
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }
}

impl fmt::Display for TerminalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TerminalMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interactive" => Ok(Self::Interactive),
            "automated" => Ok(Self::Automated),
            other => Err(CoreError::Validation(format!(
                "unknown terminal mode '{other}'"
            ))),
        }
    }
}

/// Client-side lifecycle of a terminal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Idle,
    Starting,
    Connected,
    /// The backend reported `active:false`. The session id is kept.
    Finished,
    /// The operator stopped the session. The session id is cleared.
    Disconnected,
    Error,
}

impl TerminalState {
    /// Whether a new session may be started from this state.
    ///
    /// Starting and Connected reject a second start.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            Self::Idle | Self::Disconnected | Self::Finished | Self::Error
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Connected => "connected",
            Self::Finished => "finished",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session the backend has accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalSessionHandle {
    pub session_id: SessionId,
    pub mode: TerminalMode,
    pub active: bool,
}

impl TerminalSessionHandle {
    pub fn new(session_id: SessionId, mode: TerminalMode) -> Self {
        Self {
            session_id,
            mode,
            active: true,
        }
    }
}
