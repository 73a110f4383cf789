//! Terminal client for the ETX job-runner dashboard.
//!
//! Components write into the shared [`screen::Screen`]; the
//! [`console::ConsolePresenter`] prints it. [`app::Dashboard`] wires
//! every component to one backend.

pub mod app;
pub mod cli;
pub mod config;
pub mod console;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod poller;
pub mod screen;
pub mod settings;
pub mod terminal;
