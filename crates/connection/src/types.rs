//! Public types for the discovery manager.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wakemate_discovery::plan::{DEFAULT_SUBNETS, DEFAULT_WILDCARD_OCTETS, PRIORITY_HOSTS};
use wakemate_discovery::{PlanError, ScanPlan};
use wakemate_protocol::DEFAULT_PORT;
use wakemate_protocol::constants::{REQUEST_TIMEOUT, REVALIDATE_TIMEOUT, SCAN_PROBE_TIMEOUT};

/// Hints shown when no server could be found.
pub const FAILURE_GUIDANCE: [&str; 3] = [
    "The server application is running on your computer",
    "Your computer and phone are connected to the same network",
    "Firewall settings aren't blocking port 7777",
];

/// Where a discovery run is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscoveryPhase {
    #[default]
    Idle,
    CheckingCache,
    Scanning,
    Found,
    Failed,
}

impl DiscoveryPhase {
    /// Returns true for `Found` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, DiscoveryPhase::Found | DiscoveryPhase::Failed)
    }
}

/// Snapshot of discovery, owned by the manager and read by the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryState {
    pub server_address: Option<String>,
    pub searching: bool,
    pub failed: bool,
    pub current_subnet: Option<String>,
    pub progress_percent: u8,
    pub phase: DiscoveryPhase,
}

impl DiscoveryState {
    /// State at the start of a run.
    pub(crate) fn checking_cache() -> Self {
        Self {
            searching: true,
            phase: DiscoveryPhase::CheckingCache,
            ..Self::default()
        }
    }

    pub(crate) fn found(&mut self, address: String) {
        self.server_address = Some(address);
        self.searching = false;
        self.failed = false;
        self.phase = DiscoveryPhase::Found;
    }

    pub(crate) fn fail(&mut self) {
        self.server_address = None;
        self.searching = false;
        self.failed = true;
        self.phase = DiscoveryPhase::Failed;
    }

    /// Returns true once the run has stopped searching.
    pub fn is_settled(&self) -> bool {
        !self.searching
    }

    /// Hints for the user after a failed run; empty otherwise.
    pub fn guidance(&self) -> &'static [&'static str] {
        if self.failed { &FAILURE_GUIDANCE } else { &[] }
    }
}

/// Events emitted by the discovery manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DiscoveryEvent {
    /// A run began checking the cached address.
    Started { run: u64 },
    /// The cached address was probed.
    CacheChecked { address: String, valid: bool },
    /// The subnet scan began.
    ScanStarted,
    /// The scan moved on to another subnet.
    SubnetChanged { subnet: String },
    /// A server answered. Terminal.
    Found { address: String, from_cache: bool },
    /// Every candidate was tried without success. Terminal.
    Failed,
    /// The run was stopped before reaching a terminal state.
    Cancelled { run: u64 },
}

impl DiscoveryEvent {
    /// Returns true for `Found` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DiscoveryEvent::Found { .. } | DiscoveryEvent::Failed)
    }
}

/// Tunables for discovery. Defaults reproduce the built-in scan order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Server port to probe.
    pub port: u16,
    /// Subnet prefixes in scan order; two-octet entries are wildcards.
    pub subnets: Vec<String>,
    /// Inclusive third-octet range for wildcard entries.
    pub wildcard_octets: (u8, u8),
    /// Hosts probed first in every subnet.
    pub priority_hosts: Vec<u16>,
    pub scan_timeout_ms: u64,
    pub revalidate_timeout_ms: u64,
    pub diagnostics_timeout_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            subnets: DEFAULT_SUBNETS.iter().map(|s| s.to_string()).collect(),
            wildcard_octets: DEFAULT_WILDCARD_OCTETS,
            priority_hosts: PRIORITY_HOSTS.iter().map(|&h| u16::from(h)).collect(),
            scan_timeout_ms: SCAN_PROBE_TIMEOUT.as_millis() as u64,
            revalidate_timeout_ms: REVALIDATE_TIMEOUT.as_millis() as u64,
            diagnostics_timeout_ms: REQUEST_TIMEOUT.as_millis() as u64,
        }
    }
}

impl DiscoveryConfig {
    /// Builds the scan plan described by this config.
    pub fn plan(&self) -> Result<ScanPlan, PlanError> {
        ScanPlan::new(&self.subnets, self.wildcard_octets, &self.priority_hosts)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn revalidate_timeout(&self) -> Duration {
        Duration::from_millis(self.revalidate_timeout_ms)
    }

    pub fn diagnostics_timeout(&self) -> Duration {
        Duration::from_millis(self.diagnostics_timeout_ms)
    }
}
