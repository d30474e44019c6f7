//! Live host targets produced by the discovery phase.

use chrono::{DateTime, Utc};
use std::fmt;
use std::net::Ipv4Addr;

/// An address observed as responsive during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    /// The live address.
    pub address: Ipv4Addr,
    /// When the address was observed (or assumed) live.
    pub discovered_at: DateTime<Utc>,
}

impl HostTarget {
    /// Create a host target observed at `discovered_at`.
    pub fn new(address: Ipv4Addr, discovered_at: DateTime<Utc>) -> Self {
        Self {
            address,
            discovered_at,
        }
    }

    /// A host assumed live without a discovery sweep.
    pub fn assumed(address: Ipv4Addr) -> Self {
        Self::new(address, Utc::now())
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}
