//! Per-host results and the running aggregate report.

use crate::error::InvokeError;
use crate::scanner::parse::parse_port_table;
use crate::scanner::EngineOutput;
use crate::types::{HostTarget, PortEntry, ScanId, ScanRange};
use chrono::{DateTime, Utc};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Outcome class of one detailed scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    /// The engine finished and reported the host.
    Up,
    /// The scan hit its timeout.
    Timeout,
    /// The engine failed for this host.
    Failed,
}

impl HostStatus {
    pub fn is_success(self) -> bool {
        self == Self::Up
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Timeout => write!(f, "timeout"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one detailed scan. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub host: HostTarget,
    /// 1-based dispatch position.
    pub sequence: u64,
    pub status: HostStatus,
    /// Why the scan failed, for `Timeout` and `Failed`.
    pub failure: Option<String>,
    /// Port table in engine order.
    pub ports: Vec<PortEntry>,
    /// Raw engine output, kept for the structured artifact.
    pub raw_output: String,
    pub completed_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl ScanResult {
    /// A successful scan, with the port table parsed from the output.
    pub fn success(host: HostTarget, sequence: u64, output: EngineOutput, elapsed: Duration) -> Self {
        Self {
            ports: parse_port_table(&output.stdout),
            host,
            sequence,
            status: HostStatus::Up,
            failure: None,
            raw_output: output.stdout,
            completed_at: Utc::now(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// A failed scan. Timeouts are kept apart from other engine failures.
    pub fn failure(host: HostTarget, sequence: u64, error: &InvokeError, elapsed: Duration) -> Self {
        let status = match error {
            InvokeError::Timeout(_) => HostStatus::Timeout,
            _ => HostStatus::Failed,
        };
        Self {
            host,
            sequence,
            status,
            failure: Some(error.to_string()),
            ports: Vec::new(),
            raw_output: String::new(),
            completed_at: Utc::now(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn address(&self) -> Ipv4Addr {
        self.host.address
    }

    /// Ports counted as open, in table order.
    pub fn open_ports(&self) -> impl Iterator<Item = &PortEntry> {
        self.ports.iter().filter(|p| p.is_open())
    }
}

/// Lifecycle status stamped on a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Running,
    Completed,
    Interrupted,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// All results of a run plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateReport {
    pub id: ScanId,
    /// Normalized range, e.g. `192.168.1.0/24`.
    pub range: String,
    /// Addresses covered by the range.
    pub range_hosts: u64,
    pub started_at: DateTime<Utc>,
    /// Hosts admitted for detailed scanning.
    pub live_hosts: u64,
    pub status: ReportStatus,
    /// Results in completion order.
    pub results: Vec<ScanResult>,
}

impl AggregateReport {
    /// An empty report for `range`, started now.
    pub fn new(range: &ScanRange) -> Self {
        Self {
            id: ScanId::new(),
            range: range.to_string(),
            range_hosts: range.host_count(),
            started_at: Utc::now(),
            live_hosts: 0,
            status: ReportStatus::Running,
            results: Vec::new(),
        }
    }

    pub fn with_live_hosts(mut self, live_hosts: u64) -> Self {
        self.live_hosts = live_hosts;
        self
    }

    pub fn completed(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.completed() - self.succeeded()
    }

    /// One-line summary of the report.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}) - {} live, {} scanned, {} up, {} failed",
            self.range,
            self.status,
            self.live_hosts,
            self.completed(),
            self.succeeded(),
            self.failed()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(last: u8) -> HostTarget {
        HostTarget::assumed(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_success_parses_ports() {
        let output = EngineOutput::new("PORT STATE SERVICE\n22/tcp open ssh\n25/tcp closed smtp\n");
        let result = ScanResult::success(host(1), 1, output, Duration::from_millis(1200));

        assert_eq!(result.status, HostStatus::Up);
        assert_eq!(result.ports.len(), 2);
        assert_eq!(result.open_ports().count(), 1);
        assert_eq!(result.elapsed_ms, 1200);
        assert!(result.failure.is_none());
    }

    #[test]
    fn test_failure_classification() {
        let timeout = ScanResult::failure(
            host(1),
            1,
            &InvokeError::Timeout(Duration::from_secs(900)),
            Duration::from_secs(900),
        );
        assert_eq!(timeout.status, HostStatus::Timeout);

        let failed = ScanResult::failure(
            host(2),
            2,
            &InvokeError::EngineFailed {
                code: Some(1),
                stderr: "boom".into(),
            },
            Duration::from_secs(1),
        );
        assert_eq!(failed.status, HostStatus::Failed);
        assert_eq!(failed.failure.as_deref(), Some("engine exited with status 1: boom"));
    }

    #[test]
    fn test_report_counts() {
        let range = ScanRange::parse("10.0.0.0/24").unwrap();
        let mut report = AggregateReport::new(&range).with_live_hosts(2);
        report.results.push(ScanResult::success(
            host(1),
            1,
            EngineOutput::default(),
            Duration::ZERO,
        ));
        report.results.push(ScanResult::failure(
            host(2),
            2,
            &InvokeError::Timeout(Duration::from_secs(1)),
            Duration::from_secs(1),
        ));

        assert_eq!(report.range_hosts, 256);
        assert_eq!(report.completed(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.summary().contains("2 scanned"));
    }
}
