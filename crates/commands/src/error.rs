//! Error types for command delivery.

use std::time::Duration;

use wakemate_connection::StoreError;
use wakemate_discovery::ProbeError;

/// Errors produced while sending a command to the server.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Server IP not set")]
    NoServer,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("timeout: no response within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid command: {0}")]
    Invalid(#[from] wakemate_protocol::CommandError),
}

impl From<ProbeError> for CommandError {
    fn from(e: ProbeError) -> Self {
        match e {
            ProbeError::Timeout(d) => CommandError::Timeout(d),
            ProbeError::Http(status) => CommandError::Status {
                status,
                body: String::new(),
            },
            other => CommandError::Http(other.to_string()),
        }
    }
}
