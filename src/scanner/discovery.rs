//! Range expansion: from a CIDR range to discovery targets and live hosts.

use crate::scanner::parse::parse_discovery;
use crate::scanner::traits::EngineTarget;
use crate::types::{HostTarget, ScanRange};
use chrono::Utc;
use std::collections::HashSet;
use tracing::debug;

/// Turns a range into engine targets and discovery output into live hosts.
pub struct RangeExpander<'a> {
    range: &'a ScanRange,
}

impl<'a> RangeExpander<'a> {
    pub fn new(range: &'a ScanRange) -> Self {
        Self { range }
    }

    /// The whole range as a single discovery target.
    pub fn discovery_target(&self) -> EngineTarget {
        EngineTarget::Range(self.range.network())
    }

    /// Live hosts found in a discovery sweep's output.
    ///
    /// Addresses outside the range are dropped and duplicates collapse to
    /// their first observation. Unparseable output gives an empty set.
    pub fn live_hosts(&self, discovery_output: &str) -> Vec<HostTarget> {
        let observed_at = Utc::now();
        let mut seen = HashSet::new();

        parse_discovery(discovery_output)
            .into_iter()
            .filter(|addr| {
                let inside = self.range.contains(*addr);
                if !inside {
                    debug!(%addr, range = %self.range, "ignoring address outside range");
                }
                inside
            })
            .filter(|addr| seen.insert(*addr))
            .map(|addr| HostTarget::new(addr, observed_at))
            .collect()
    }

    /// Every usable address in the range, generated lazily.
    pub fn all_hosts(&self) -> impl Iterator<Item = HostTarget> + Send + 'static {
        self.range.hosts().map(HostTarget::assumed)
    }
}
