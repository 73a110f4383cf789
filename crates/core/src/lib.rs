//! Domain types for the ETX job-runner dashboard client.
//!
//! Pure data and rules with no I/O: job types and statuses, history
//! entries, terminal session lifecycle, hostname candidates, banner
//! severities and the settings value model.

pub mod error;
pub mod hostname;
pub mod job;
pub mod settings;
pub mod severity;
pub mod terminal;
pub mod types;
