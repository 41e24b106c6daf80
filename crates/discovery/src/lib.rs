//! LAN discovery of the WakeMATE companion server.
//!
//! Finds a server without any user-supplied address by probing candidate
//! IPv4 addresses across a prioritized list of common home and office
//! subnets, one candidate at a time.

pub mod http;
pub mod plan;
pub mod prober;
pub mod scanner;

// Re-export primary types.
pub use http::RawResponse;
pub use plan::{PRIORITY_HOSTS, PlanError, ScanPlan, Subnet, progress_percent};
pub use prober::{HttpProber, ProbeError, ProbeResult, Prober};
pub use scanner::{ScanOutcome, ScanProgress, Scanner};
