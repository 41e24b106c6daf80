//! Bounded HTTP exchanges with a companion server.
//!
//! Shared by the prober and by diagnostics so both classify failures the
//! same way.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use wakemate_protocol::constants::NO_CACHE_HEADERS;
use wakemate_protocol::{CommandRequest, StatusResponse, command_url, status_url};

use crate::prober::ProbeError;

/// Status line and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Builds an HTTP client for hosts on the local network. System proxy
/// settings are ignored.
pub fn lan_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().no_proxy().build()
}

/// Builds a `GET /status` request with cache-busting headers.
pub fn status_request(http: &reqwest::Client, address: &str, port: u16) -> reqwest::RequestBuilder {
    NO_CACHE_HEADERS
        .iter()
        .fold(http.get(status_url(address, port)), |req, (name, value)| {
            req.header(*name, *value)
        })
}

/// Builds a `POST /` request carrying a JSON command.
pub fn command_request(
    http: &reqwest::Client,
    address: &str,
    port: u16,
    command: &CommandRequest,
) -> reqwest::RequestBuilder {
    NO_CACHE_HEADERS
        .iter()
        .fold(http.post(command_url(address, port)), |req, (name, value)| {
            req.header(*name, *value)
        })
        .header(CONTENT_TYPE, "application/json")
        .json(command)
}

/// Sends a request and reads the whole body within `timeout`.
///
/// Any HTTP status is returned as a [`RawResponse`]; only transport
/// failures and the deadline produce an error.
pub async fn send_bounded(
    req: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<RawResponse, ProbeError> {
    let exchange = async {
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok::<_, reqwest::Error>(RawResponse { status, body })
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(Ok(raw)) => Ok(raw),
        Ok(Err(e)) => Err(classify(e, timeout)),
        Err(_) => Err(ProbeError::Timeout(timeout)),
    }
}

/// Interprets a `/status` exchange: 2xx, valid JSON, and a live status.
pub fn interpret_status(raw: &RawResponse) -> Result<StatusResponse, ProbeError> {
    if !raw.is_success() {
        return Err(ProbeError::Http(raw.status));
    }
    let status: StatusResponse =
        serde_json::from_str(&raw.body).map_err(|e| ProbeError::InvalidJson(e.to_string()))?;
    if !status.is_online() {
        return Err(ProbeError::UnexpectedStatus(
            status.status.unwrap_or_else(|| "<missing>".into()),
        ));
    }
    Ok(status)
}

fn classify(e: reqwest::Error, timeout: Duration) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout(timeout)
    } else if e.is_connect() {
        ProbeError::Network(format!("connection failed: {e}"))
    } else {
        ProbeError::Network(e.to_string())
    }
}
