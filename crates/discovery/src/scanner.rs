//! Sequential subnet scanner.
//!
//! Probes one candidate at a time in plan order and stops at the first
//! live server. Cancellation is checked at every probe boundary.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use wakemate_protocol::constants::SCAN_PROBE_TIMEOUT;

use crate::plan::{ScanPlan, progress_percent};
use crate::prober::Prober;

/// Progress after one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    /// Concrete subnet prefix being scanned, e.g. `192.168.3.`.
    pub subnet: String,
    pub host: u8,
    /// Subnet-relative percentage, see [`progress_percent`].
    pub percent: u8,
}

/// How a scan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Found(String),
    Exhausted,
    Cancelled,
}

/// Walks a [`ScanPlan`] with a [`Prober`].
#[derive(Clone)]
pub struct Scanner {
    prober: Arc<dyn Prober>,
    timeout: Duration,
}

impl Scanner {
    /// Creates a scanner using the default per-candidate timeout.
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            timeout: SCAN_PROBE_TIMEOUT,
        }
    }

    /// Sets the per-candidate probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Scans the plan until a server answers, the plan is exhausted, or
    /// `cancel` fires.
    ///
    /// `on_progress` is called after every probe whose result is used. A
    /// probe that completes after cancellation is discarded.
    pub async fn scan(
        &self,
        plan: &ScanPlan,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(ScanProgress) + Send,
    ) -> ScanOutcome {
        let mut probed: usize = 0;

        for subnet in plan.subnets() {
            debug!(subnet = %subnet, "scanning subnet");

            for host in plan.host_order() {
                if cancel.is_cancelled() {
                    debug!(probed, "scan cancelled");
                    return ScanOutcome::Cancelled;
                }

                let address = subnet.candidate(host);
                let result = self.prober.probe(&address, self.timeout).await;
                probed += 1;

                if cancel.is_cancelled() {
                    debug!(probed, "scan cancelled");
                    return ScanOutcome::Cancelled;
                }

                on_progress(ScanProgress {
                    subnet: subnet.prefix().to_string(),
                    host,
                    percent: progress_percent(host),
                });

                if result.success {
                    info!(address = %address, probed, "server found");
                    return ScanOutcome::Found(address);
                }
            }
        }

        info!(probed, "scan exhausted, no server found");
        ScanOutcome::Exhausted
    }
}
