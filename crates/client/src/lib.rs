//! HTTP client for the ETX job-runner backend.
//!
//! [`DashboardApi`](api::DashboardApi) wraps every endpoint the
//! dashboard consumes. Components depend on the
//! [`DashboardBackend`](backend::DashboardBackend) trait instead of the
//! concrete client so they can be driven by scripted backends in tests.

pub mod api;
pub mod backend;
pub mod schemas;

pub use api::{ApiError, DashboardApi};
pub use backend::DashboardBackend;
