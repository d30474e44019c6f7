//! CIDR range descriptor for the sweep.
//!
//! A `ScanRange` is validated once at startup and never mutated. It knows
//! how many addresses it covers, how to name its output files, and how to
//! lazily enumerate the usable host addresses inside it.

use ipnetwork::Ipv4Network;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Error type for range parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("empty range")]
    Empty,
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),
    #[error("IPv6 ranges are not supported: {0}")]
    Ipv6Unsupported(String),
    #[error("CIDR range too large: /{0} (widest allowed: /{1})")]
    TooLarge(u8, u8),
}

/// A validated IPv4 CIDR range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRange {
    /// The range exactly as the user typed it.
    input: String,
    /// Normalized network (host bits cleared).
    network: Ipv4Network,
}

impl ScanRange {
    /// Widest prefix accepted (a /8 is 16,777,216 addresses).
    pub const MIN_PREFIX: u8 = 8;

    /// Ranges above this many addresses are accepted but logged as large.
    pub const LARGE_RANGE: u64 = 65_536;

    /// Parse and validate a range string.
    ///
    /// A bare address is accepted and treated as a /32. Host bits are
    /// allowed and cleared, so `10.1.2.3/16` scans `10.1.0.0/16`.
    pub fn parse(s: &str) -> Result<Self, RangeError> {
        let input = s.trim();
        if input.is_empty() {
            return Err(RangeError::Empty);
        }

        if input.contains(':') {
            return Err(RangeError::Ipv6Unsupported(input.to_string()));
        }

        let parsed: Ipv4Network = input
            .parse()
            .map_err(|_| RangeError::InvalidCidr(input.to_string()))?;

        if parsed.prefix() < Self::MIN_PREFIX {
            return Err(RangeError::TooLarge(parsed.prefix(), Self::MIN_PREFIX));
        }

        let network = Ipv4Network::new(parsed.network(), parsed.prefix())
            .map_err(|_| RangeError::InvalidCidr(input.to_string()))?;

        Ok(Self {
            input: input.to_string(),
            network,
        })
    }

    /// The range as typed.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The normalized network.
    pub fn network(&self) -> Ipv4Network {
        self.network
    }

    /// First address of the network.
    pub fn base(&self) -> Ipv4Addr {
        self.network.network()
    }

    pub fn prefix(&self) -> u8 {
        self.network.prefix()
    }

    /// Total number of addresses covered, including network and broadcast.
    pub fn host_count(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix()))
    }

    /// Number of addresses `hosts()` yields.
    pub fn usable_host_count(&self) -> u64 {
        if self.prefix() < 31 {
            self.host_count() - 2
        } else {
            self.host_count()
        }
    }

    pub fn is_large(&self) -> bool {
        self.host_count() > Self::LARGE_RANGE
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.network.contains(addr)
    }

    /// Lazily iterate over usable host addresses.
    ///
    /// Network and broadcast addresses are skipped for prefixes below /31.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let first = u32::from(self.base());
        let last = first.wrapping_add((self.host_count() - 1) as u32);
        let (start, end) = if self.prefix() < 31 {
            (first + 1, last - 1)
        } else {
            (first, last)
        };
        (start..=end).map(Ipv4Addr::from)
    }

    /// Filesystem-safe stem shared by the three output files.
    ///
    /// Derived from the typed range: `.` becomes `-`, `/` becomes `_`, and any
    /// other non-alphanumeric character becomes `-`.
    pub fn file_stem(&self) -> String {
        let clean: String = self
            .input
            .chars()
            .map(|c| match c {
                '/' => '_',
                c if c.is_ascii_alphanumeric() => c,
                _ => '-',
            })
            .collect();
        format!("{}-network", clean)
    }
}

impl FromStr for ScanRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ScanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cidr() {
        let range = ScanRange::parse("192.168.1.0/24").unwrap();
        assert_eq!(range.prefix(), 24);
        assert_eq!(range.base(), Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(range.host_count(), 256);
        assert_eq!(range.usable_host_count(), 254);
    }

    #[test]
    fn test_parse_clears_host_bits() {
        let range = ScanRange::parse("10.1.2.3/16").unwrap();
        assert_eq!(range.to_string(), "10.1.0.0/16");
        assert_eq!(range.input(), "10.1.2.3/16");
    }

    #[test]
    fn test_bare_address_is_single_host() {
        let range = ScanRange::parse("10.0.0.7").unwrap();
        assert_eq!(range.prefix(), 32);
        assert_eq!(range.hosts().collect::<Vec<_>>(), vec![Ipv4Addr::new(10, 0, 0, 7)]);
    }

    #[test]
    fn test_slash_eight_allowed() {
        let range = ScanRange::parse("10.0.0.0/8").unwrap();
        assert_eq!(range.host_count(), 16_777_216);
        assert!(range.is_large());
    }

    #[test]
    fn test_wider_than_slash_eight_rejected() {
        assert_eq!(
            ScanRange::parse("10.0.0.0/7"),
            Err(RangeError::TooLarge(7, 8))
        );
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(ScanRange::parse("  "), Err(RangeError::Empty));
        assert!(matches!(
            ScanRange::parse("not-a-range"),
            Err(RangeError::InvalidCidr(_))
        ));
        assert!(matches!(
            ScanRange::parse("192.168.1.0/33"),
            Err(RangeError::InvalidCidr(_))
        ));
        assert!(matches!(
            ScanRange::parse("2001:db8::/64"),
            Err(RangeError::Ipv6Unsupported(_))
        ));
    }

    #[test]
    fn test_file_stem() {
        let range = ScanRange::parse("192.168.1.0/24").unwrap();
        assert_eq!(range.file_stem(), "192-168-1-0_24-network");
    }

    #[test]
    fn test_hosts_skip_network_and_broadcast() {
        let range = ScanRange::parse("192.168.1.0/30").unwrap();
        let hosts: Vec<_> = range.hosts().collect();
        assert_eq!(
            hosts,
            vec![Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2)]
        );
    }

    #[test]
    fn test_hosts_point_to_point() {
        let range = ScanRange::parse("192.168.1.0/31").unwrap();
        assert_eq!(range.hosts().count(), 2);
    }

    #[test]
    fn test_hosts_is_lazy_on_wide_ranges() {
        let range = ScanRange::parse("10.0.0.0/8").unwrap();
        let first: Vec<_> = range.hosts().take(2).collect();
        assert_eq!(
            first,
            vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)]
        );
        assert_eq!(range.hosts().last(), Some(Ipv4Addr::new(10, 255, 255, 254)));
    }

    #[test]
    fn test_contains() {
        let range = ScanRange::parse("172.16.0.0/12").unwrap();
        assert!(range.contains(Ipv4Addr::new(172, 31, 255, 1)));
        assert!(!range.contains(Ipv4Addr::new(172, 32, 0, 1)));
    }
}
