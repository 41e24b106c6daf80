//! Ordered candidate generation for a discovery run.
//!
//! A plan is a list of concrete `/24` subnet prefixes plus a priority set of
//! host numbers. Within every subnet the priority hosts are probed first,
//! then the rest of `1..=254` in ascending order.

use std::fmt;
use std::net::Ipv4Addr;

/// Subnet entries in the order they are scanned. Two-octet entries are
/// wildcards, expanded over [`DEFAULT_WILDCARD_OCTETS`].
pub const DEFAULT_SUBNETS: [&str; 5] = ["10.0.0.", "192.168.0.", "192.168.1.", "192.168.", "10.0.1."];

/// Inclusive range of third octets a wildcard entry expands to.
pub const DEFAULT_WILDCARD_OCTETS: (u8, u8) = (2, 5);

/// Hosts probed first in every subnet (common router and DHCP leases).
pub const PRIORITY_HOSTS: [u8; 9] = [1, 100, 101, 102, 103, 104, 105, 150, 200];

pub const FIRST_HOST: u8 = 1;
pub const LAST_HOST: u8 = 254;

/// Errors building a scan plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("invalid subnet prefix {0:?}")]
    InvalidPrefix(String),

    #[error("priority host {0} outside {FIRST_HOST}..={LAST_HOST}")]
    InvalidHost(u16),

    #[error("empty wildcard range {0}..={1}")]
    EmptyWildcardRange(u8, u8),

    #[error("scan plan has no subnets")]
    Empty,
}

/// A concrete subnet prefix such as `192.168.1.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subnet {
    prefix: String,
}

impl Subnet {
    /// Parses a three-octet prefix. A missing trailing `.` is added.
    pub fn parse(prefix: &str) -> Result<Self, PlanError> {
        let prefix = normalize(prefix);
        let subnet = Self { prefix };
        if subnet.octet_count() != 3 || subnet.candidate(FIRST_HOST).parse::<Ipv4Addr>().is_err() {
            return Err(PlanError::InvalidPrefix(subnet.prefix));
        }
        Ok(subnet)
    }

    /// Returns the prefix, always ending in `.`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the dotted-quad address of a host in this subnet.
    pub fn candidate(&self, host: u8) -> String {
        format!("{}{host}", self.prefix)
    }

    fn octet_count(&self) -> usize {
        self.prefix.trim_end_matches('.').split('.').count()
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.prefix)
    }
}

/// The immutable candidate order for one discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    subnets: Vec<Subnet>,
    priority: Vec<u8>,
}

impl ScanPlan {
    /// Builds a plan from subnet entries, expanding two-octet wildcards over
    /// `wildcard_octets` (inclusive) in place.
    pub fn new<S: AsRef<str>>(
        entries: &[S],
        wildcard_octets: (u8, u8),
        priority_hosts: &[u16],
    ) -> Result<Self, PlanError> {
        let (lo, hi) = wildcard_octets;
        if lo > hi {
            return Err(PlanError::EmptyWildcardRange(lo, hi));
        }

        let mut subnets = Vec::new();
        for entry in entries {
            let prefix = normalize(entry.as_ref());
            let octets = prefix.trim_end_matches('.').split('.').count();
            if octets == 2 {
                for third in lo..=hi {
                    subnets.push(Subnet::parse(&format!("{prefix}{third}."))?);
                }
            } else {
                subnets.push(Subnet::parse(&prefix)?);
            }
        }
        if subnets.is_empty() {
            return Err(PlanError::Empty);
        }

        let mut priority: Vec<u8> = Vec::with_capacity(priority_hosts.len());
        for &host in priority_hosts {
            let host = u8::try_from(host)
                .ok()
                .filter(|h| (FIRST_HOST..=LAST_HOST).contains(h))
                .ok_or(PlanError::InvalidHost(host))?;
            if !priority.contains(&host) {
                priority.push(host);
            }
        }

        Ok(Self { subnets, priority })
    }

    /// Concrete subnets in scan order.
    pub fn subnets(&self) -> &[Subnet] {
        &self.subnets
    }

    /// Priority hosts in probe order, without duplicates.
    pub fn priority_hosts(&self) -> &[u8] {
        &self.priority
    }

    /// Host numbers in probe order for any subnet of this plan.
    pub fn host_order(&self) -> impl Iterator<Item = u8> + '_ {
        let rest = (FIRST_HOST..=LAST_HOST).filter(move |h| !self.priority.contains(h));
        self.priority.iter().copied().chain(rest)
    }

    /// Total number of candidates the plan can produce.
    pub fn candidate_count(&self) -> usize {
        self.subnets.len() * usize::from(LAST_HOST - FIRST_HOST + 1)
    }
}

impl Default for ScanPlan {
    fn default() -> Self {
        let priority: Vec<u16> = PRIORITY_HOSTS.iter().map(|&h| u16::from(h)).collect();
        Self::new(&DEFAULT_SUBNETS, DEFAULT_WILDCARD_OCTETS, &priority)
            .unwrap_or_else(|e| unreachable!("built-in scan plan is valid: {e}"))
    }
}

/// Subnet-relative progress shown while probing `host`.
pub fn progress_percent(host: u8) -> u8 {
    (u32::from(host) * 100 / u32::from(LAST_HOST)) as u8
}

fn normalize(prefix: &str) -> String {
    let prefix = prefix.trim();
    if prefix.ends_with('.') {
        prefix.to_string()
    } else {
        format!("{prefix}.")
    }
}
