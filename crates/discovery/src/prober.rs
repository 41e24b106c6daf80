//! Single bounded-timeout liveness probe against one candidate address.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::trace;
use wakemate_protocol::DEFAULT_PORT;

use crate::http::{interpret_status, lan_client, send_bounded, status_request};

/// Why a candidate did not answer as a companion server.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProbeError {
    #[error("timeout: no response within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP error: {0}")]
    Http(u16),

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("unexpected status: {0}")]
    UnexpectedStatus(String),
}

/// Outcome of one probe. Failures are expected and frequent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub success: bool,
    pub message: String,
}

impl ProbeResult {
    pub fn online(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn offline(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<Result<(), ProbeError>> for ProbeResult {
    fn from(result: Result<(), ProbeError>) -> Self {
        match result {
            Ok(()) => Self::online("server online"),
            Err(e) => Self::offline(e.to_string()),
        }
    }
}

/// Checks whether a companion server answers at an address.
///
/// Implementations must resolve every fault into a [`ProbeResult`]; a probe
/// never fails the caller.
pub trait Prober: Send + Sync {
    fn probe<'a>(
        &'a self,
        address: &'a str,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = ProbeResult> + Send + 'a>>;
}

/// Probes `GET http://{address}:{port}/status`.
#[derive(Debug, Clone)]
pub struct HttpProber {
    http: reqwest::Client,
    port: u16,
}

impl HttpProber {
    /// Creates a prober for the default server port.
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(lan_client()?, DEFAULT_PORT))
    }

    /// Creates a prober with an existing HTTP client and port.
    pub fn with_client(http: reqwest::Client, port: u16) -> Self {
        Self { http, port }
    }

    async fn check(&self, address: &str, timeout: Duration) -> Result<(), ProbeError> {
        let raw = send_bounded(status_request(&self.http, address, self.port), timeout).await?;
        interpret_status(&raw).map(|_| ())
    }
}

impl Prober for HttpProber {
    fn probe<'a>(
        &'a self,
        address: &'a str,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = ProbeResult> + Send + 'a>> {
        Box::pin(async move {
            let result = self.check(address, timeout).await;
            if let Err(e) = &result {
                trace!(address, error = %e, "probe negative");
            }
            ProbeResult::from(result)
        })
    }
}
