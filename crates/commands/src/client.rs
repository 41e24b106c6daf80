//! HTTP client for the server's command endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};
use wakemate_connection::AddressCache;
use wakemate_discovery::http::{command_request, lan_client, send_bounded};
use wakemate_protocol::constants::REQUEST_TIMEOUT;
use wakemate_protocol::{Command, CommandRequest, DEFAULT_PORT, DeviceTarget};

use crate::error::CommandError;

/// Sends commands to the server address held in an [`AddressCache`].
pub struct CommandClient {
    http: reqwest::Client,
    cache: Arc<dyn AddressCache>,
    port: u16,
    timeout: Duration,
}

impl CommandClient {
    /// Creates a client for the default port and request timeout.
    pub fn new(cache: Arc<dyn AddressCache>) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(lan_client()?, cache, DEFAULT_PORT, REQUEST_TIMEOUT))
    }

    /// Creates a client with an existing HTTP client.
    pub fn with_client(
        http: reqwest::Client,
        cache: Arc<dyn AddressCache>,
        port: u16,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            cache,
            port,
            timeout,
        }
    }

    /// Returns the server address commands will be sent to.
    pub fn server_address(&self) -> Result<String, CommandError> {
        self.cache
            .load()?
            .filter(|a| !a.trim().is_empty())
            .ok_or(CommandError::NoServer)
    }

    /// Sends a raw command with the given params and returns the server's
    /// JSON reply. An empty reply body yields `Value::Null`.
    pub async fn send(&self, command: &str, params: Map<String, Value>) -> Result<Value, CommandError> {
        let request = CommandRequest {
            command: command.to_string(),
            params,
        };
        self.post(&request).await
    }

    /// Sends a typed command, optionally aimed at a device.
    pub async fn send_command(
        &self,
        command: &Command,
        target: Option<&DeviceTarget>,
    ) -> Result<Value, CommandError> {
        let request = command.to_request(target)?;
        self.post(&request).await
    }

    async fn post(&self, request: &CommandRequest) -> Result<Value, CommandError> {
        let address = self.server_address()?;
        debug!(address = %address, command = %request.command, "sending command");

        let req = command_request(&self.http, &address, self.port, request);
        let raw = send_bounded(req, self.timeout).await.inspect_err(|e| {
            warn!(address = %address, command = %request.command, error = %e, "command failed");
        })?;

        if !raw.is_success() {
            return Err(CommandError::Status {
                status: raw.status,
                body: raw.body,
            });
        }
        if raw.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&raw.body)?)
    }
}
