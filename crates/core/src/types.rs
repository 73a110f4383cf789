/// Backend-assigned job identifier, e.g. `pipeline_20250101_120000`.
pub type JobId = String;

/// Backend-assigned terminal session identifier.
pub type SessionId = String;

/// Timestamp format used by the job history endpoint.
pub const HISTORY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
