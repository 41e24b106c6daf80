//! On-demand troubleshooting of a single server address.
//!
//! Runs two steps in order: the status endpoint, then the command endpoint
//! with a `get_status` command. A step passes when the server answers 2xx
//! with a JSON body. Both steps always run so the report shows
//! every failure. Nothing here touches the address cache.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use wakemate_discovery::ProbeError;
use wakemate_discovery::http::{
    RawResponse, command_request, lan_client, send_bounded, status_request,
};
use wakemate_protocol::constants::REQUEST_TIMEOUT;
use wakemate_protocol::{Command, CommandRequest, DEFAULT_PORT, StatusResponse};

const STATUS_STEP: &str = "Status endpoint";
const COMMAND_STEP: &str = "Command endpoint";
const NO_ADDRESS: &str = "Server IP not set";

/// Coarse classification of a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Timeout,
    Network,
    Http,
    UnexpectedBody,
}

impl From<&ProbeError> for FailureKind {
    fn from(e: &ProbeError) -> Self {
        match e {
            ProbeError::Timeout(_) => FailureKind::Timeout,
            ProbeError::Network(_) => FailureKind::Network,
            ProbeError::Http(_) => FailureKind::Http,
            ProbeError::InvalidJson(_) | ProbeError::UnexpectedStatus(_) => {
                FailureKind::UnexpectedBody
            }
        }
    }
}

/// Result of one diagnostics step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticStep {
    pub name: String,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
}

impl DiagnosticStep {
    fn passed(name: &str, raw: RawResponse) -> Self {
        Self {
            name: name.into(),
            success: true,
            message: format!("status {}, server replied: {}", raw.status, raw.body),
            http_status: Some(raw.status),
            body: Some(raw.body),
            kind: None,
        }
    }

    fn failed(name: &str, error: &ProbeError, raw: Option<RawResponse>) -> Self {
        let (http_status, body) = match raw {
            Some(raw) => (Some(raw.status), Some(raw.body)),
            None => (None, None),
        };
        Self {
            name: name.into(),
            success: false,
            message: error.to_string(),
            http_status,
            body,
            kind: Some(FailureKind::from(error)),
        }
    }
}

/// Full diagnostics outcome for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsReport {
    pub address: String,
    /// True only if every step succeeded.
    pub overall: bool,
    pub steps: Vec<DiagnosticStep>,
    pub checked_at: DateTime<Utc>,
}

impl DiagnosticsReport {
    /// Returns the first step that failed, if any.
    pub fn first_failure(&self) -> Option<&DiagnosticStep> {
        self.steps.iter().find(|s| !s.success)
    }
}

/// Summary answer to "can this client talk to the server?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionCheck {
    Connected,
    Failed(String),
}

impl ConnectionCheck {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionCheck::Connected)
    }
}

/// Runs diagnostics against a server address.
pub struct Diagnostics {
    http: reqwest::Client,
    port: u16,
    timeout: Duration,
}

impl Diagnostics {
    /// Creates diagnostics for the default port and request timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(lan_client()?, DEFAULT_PORT, REQUEST_TIMEOUT))
    }

    /// Creates diagnostics with an existing HTTP client.
    pub fn with_client(http: reqwest::Client, port: u16, timeout: Duration) -> Self {
        Self {
            http,
            port,
            timeout,
        }
    }

    /// Runs every step against `address` and collects the results.
    pub async fn run(&self, address: &str) -> DiagnosticsReport {
        let address = address.trim();
        let steps = if address.is_empty() {
            vec![DiagnosticStep {
                name: STATUS_STEP.into(),
                success: false,
                message: NO_ADDRESS.into(),
                http_status: None,
                body: None,
                kind: None,
            }]
        } else {
            vec![
                self.status_step(address).await,
                self.command_step(address).await,
            ]
        };

        let overall = steps.iter().all(|s| s.success);
        info!(address, overall, "diagnostics finished");
        DiagnosticsReport {
            address: address.to_string(),
            overall,
            steps,
            checked_at: Utc::now(),
        }
    }

    /// Checks the status endpoint, then the command endpoint, stopping at
    /// the first failure.
    pub async fn check(&self, address: &str) -> ConnectionCheck {
        let address = address.trim();
        if address.is_empty() {
            return ConnectionCheck::Failed(NO_ADDRESS.into());
        }

        let status = self.status_step(address).await;
        if !status.success {
            return ConnectionCheck::Failed(status.message);
        }

        let command = self.command_step(address).await;
        if !command.success {
            return ConnectionCheck::Failed(format!(
                "Server responded but command endpoint failed: {}",
                command.message
            ));
        }
        ConnectionCheck::Connected
    }

    async fn status_step(&self, address: &str) -> DiagnosticStep {
        let req = status_request(&self.http, address, self.port);
        let mut step = json_step(STATUS_STEP, send_bounded(req, self.timeout).await);
        if step.success && !step.body.as_deref().is_some_and(reports_online) {
            step.message.push_str(" (not reporting online)");
        }
        debug!(address, success = step.success, message = %step.message, "status step");
        step
    }

    async fn command_step(&self, address: &str) -> DiagnosticStep {
        let body = CommandRequest::new(Command::GetStatus.name());
        let req = command_request(&self.http, address, self.port, &body);
        let step = json_step(COMMAND_STEP, send_bounded(req, self.timeout).await);
        debug!(address, success = step.success, message = %step.message, "command step");
        step
    }
}

/// A step passes on any 2xx reply carrying JSON.
fn json_step(name: &str, exchange: Result<RawResponse, ProbeError>) -> DiagnosticStep {
    let raw = match exchange {
        Ok(raw) => raw,
        Err(e) => return DiagnosticStep::failed(name, &e, None),
    };
    if !raw.is_success() {
        return DiagnosticStep::failed(name, &ProbeError::Http(raw.status), Some(raw));
    }
    match serde_json::from_str::<serde_json::Value>(&raw.body) {
        Ok(_) => DiagnosticStep::passed(name, raw),
        Err(e) => DiagnosticStep::failed(name, &ProbeError::InvalidJson(e.to_string()), Some(raw)),
    }
}

fn reports_online(body: &str) -> bool {
    serde_json::from_str::<StatusResponse>(body).is_ok_and(|s| s.is_online())
}
