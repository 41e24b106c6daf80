//! Server discovery for WakeMATE clients.
//!
//! Revalidates the last known server address, falls back to a prioritized
//! subnet scan, persists what it finds, and offers on-demand diagnostics
//! for troubleshooting a server that does not answer.

pub mod cache;
pub mod diagnostics;
pub mod manager;
pub mod store;
pub mod types;

pub use cache::{AddressCache, MemoryAddressCache, StoredAddressCache};
pub use diagnostics::{ConnectionCheck, DiagnosticStep, Diagnostics, DiagnosticsReport, FailureKind};
pub use manager::DiscoveryManager;
pub use store::{JsonStore, StoreError};
pub use types::{DiscoveryConfig, DiscoveryEvent, DiscoveryPhase, DiscoveryState};
