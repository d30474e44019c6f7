//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortEntry` is one row of the engine's port table for a host.

use std::fmt;
use std::str::FromStr;

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(value))
    }
}

/// Error type for port table parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (1-65535)")]
    OutOfRange(u16),
    #[error("invalid port number: {0}")]
    InvalidFormat(String),
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),
    #[error("unknown port state: {0}")]
    UnknownState(String),
}

/// Transport protocol of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
            Self::Sctp => write!(f, "sctp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "sctp" => Ok(Self::Sctp),
            _ => Err(PortError::UnknownProtocol(s.to_string())),
        }
    }
}

/// State of a port as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    /// Port is open (service listening).
    Open,
    /// Port is closed (no service, RST received).
    Closed,
    /// Port is filtered (no response, possibly by firewall).
    Filtered,
    /// Reachable, but open/closed could not be determined.
    Unfiltered,
    /// Port is either open or filtered.
    OpenFiltered,
    /// Port is either closed or filtered.
    ClosedFiltered,
}

impl PortState {
    /// Whether this port counts towards the open-ports digest.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::OpenFiltered)
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Filtered => write!(f, "filtered"),
            Self::Unfiltered => write!(f, "unfiltered"),
            Self::OpenFiltered => write!(f, "open|filtered"),
            Self::ClosedFiltered => write!(f, "closed|filtered"),
        }
    }
}

impl FromStr for PortState {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "filtered" => Ok(Self::Filtered),
            "unfiltered" => Ok(Self::Unfiltered),
            "open|filtered" => Ok(Self::OpenFiltered),
            "closed|filtered" => Ok(Self::ClosedFiltered),
            _ => Err(PortError::UnknownState(s.to_string())),
        }
    }
}

/// One row of a host's port table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    pub port: Port,
    pub protocol: Protocol,
    pub state: PortState,
    /// Service name, empty when the engine reported none.
    pub service: String,
    /// Product/version string, empty when unknown.
    pub version: String,
    /// Script output lines attached to this port, as printed (`|` prefixed).
    pub scripts: Vec<String>,
}

impl PortEntry {
    /// Create an entry without version or script output.
    pub fn new(port: Port, protocol: Protocol, state: PortState, service: impl Into<String>) -> Self {
        Self {
            port,
            protocol,
            state,
            service: service.into(),
            version: String::new(),
            scripts: Vec::new(),
        }
    }

    /// Set the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// `22/tcp` style label.
    pub fn label(&self) -> String {
        format!("{}/{}", self.port, self.protocol)
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_validation() {
        assert!(Port::new(0).is_none());
        assert!(Port::new(1).is_some());
        assert!(Port::new(65535).is_some());
        assert_eq!(Port::try_from(0), Err(PortError::OutOfRange(0)));
    }

    #[test]
    fn test_state_parsing() {
        assert_eq!("open".parse::<PortState>().unwrap(), PortState::Open);
        assert_eq!(
            "open|filtered".parse::<PortState>().unwrap(),
            PortState::OpenFiltered
        );
        assert!("half-open".parse::<PortState>().is_err());
    }

    #[test]
    fn test_open_states() {
        assert!(PortState::Open.is_open());
        assert!(PortState::OpenFiltered.is_open());
        assert!(!PortState::Closed.is_open());
        assert!(!PortState::ClosedFiltered.is_open());
    }

    #[test]
    fn test_entry_label() {
        let entry = PortEntry::new(Port::new(53).unwrap(), Protocol::Udp, PortState::Open, "domain");
        assert_eq!(entry.label(), "53/udp");
    }
}
