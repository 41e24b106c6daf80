use serde::{Deserialize, Serialize};

use crate::constants::ONLINE_STATUSES;

/// Body of `GET /status`.
///
/// Only `status` is interpreted; any other fields are kept so diagnostics
/// can echo the full response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StatusResponse {
    /// Returns true if the server reports itself as live.
    pub fn is_online(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| ONLINE_STATUSES.contains(&s))
    }
}

/// Body of `POST /`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl CommandRequest {
    /// Creates a request with empty params.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            params: serde_json::Map::new(),
        }
    }

    /// Adds a parameter.
    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}
