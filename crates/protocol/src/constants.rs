use std::time::Duration;

/// Port the companion server listens on.
pub const DEFAULT_PORT: u16 = 7777;

/// Liveness endpoint.
pub const STATUS_PATH: &str = "/status";

/// Command endpoint.
pub const COMMAND_PATH: &str = "/";

/// Storage key holding the last confirmed server address.
pub const SERVER_ADDRESS_KEY: &str = "serverIp";

/// `status` values that identify a live companion server.
pub const ONLINE_STATUSES: [&str; 2] = ["online", "success"];

/// Headers sent with every status probe so no intermediary answers from cache.
pub const NO_CACHE_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-cache, no-store, must-revalidate"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

/// Per-candidate timeout during a subnet scan.
pub const SCAN_PROBE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Timeout for revalidating a cached address.
pub const REVALIDATE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Timeout for each diagnostics step and for command requests.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Returns the status endpoint URL for a server address.
pub fn status_url(address: &str, port: u16) -> String {
    format!("http://{address}:{port}{STATUS_PATH}")
}

/// Returns the command endpoint URL for a server address.
pub fn command_url(address: &str, port: u16) -> String {
    format!("http://{address}:{port}{COMMAND_PATH}")
}
