//! Concurrent result collection.
//!
//! The aggregator owns the only mutable state shared by workers. Each
//! completed scan is validated, appended, and streamed to the live sink under
//! one lock, so host blocks never interleave on the console and a snapshot
//! never sees a half-recorded result.

use crate::error::ReportError;
use crate::output::{render_host_block, LiveSink};
use crate::storage::report::{AggregateReport, ReportStatus, ScanResult};
use crate::types::HostTarget;
use ipnetwork::Ipv4Network;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard};

/// Which addresses may be recorded.
#[derive(Debug, Clone)]
pub enum Admission {
    /// Exactly the hosts found by discovery.
    Discovered(HashSet<Ipv4Addr>),
    /// Any address inside the network (discovery skipped).
    Range(Ipv4Network),
}

impl Admission {
    pub fn discovered<'a>(hosts: impl IntoIterator<Item = &'a HostTarget>) -> Self {
        Self::Discovered(hosts.into_iter().map(|h| h.address).collect())
    }

    pub fn admits(&self, addr: Ipv4Addr) -> bool {
        match self {
            Self::Discovered(hosts) => hosts.contains(&addr),
            Self::Range(network) => network.contains(addr),
        }
    }
}

struct Inner {
    report: AggregateReport,
    recorded: HashSet<Ipv4Addr>,
}

/// Thread-safe collector of scan results.
pub struct ResultAggregator {
    inner: Mutex<Inner>,
    admission: Admission,
    sink: Arc<dyn LiveSink>,
}

impl ResultAggregator {
    pub fn new(report: AggregateReport, admission: Admission, sink: Arc<dyn LiveSink>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                report,
                recorded: HashSet::new(),
            }),
            admission,
            sink,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave a partial append
        // behind, so the data is still consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append one result and stream it to the live output.
    ///
    /// Rejects hosts that were not admitted or already have a result; the
    /// stored report is left untouched in that case.
    pub fn record(&self, result: ScanResult) -> Result<(), ReportError> {
        let addr = result.address();
        if !self.admission.admits(addr) {
            return Err(ReportError::UnknownHost(addr));
        }

        let mut inner = self.lock();
        if !inner.recorded.insert(addr) {
            return Err(ReportError::DuplicateHost(addr));
        }

        self.sink.emit(&render_host_block(&result));
        inner.report.results.push(result);
        Ok(())
    }

    /// A consistent point-in-time copy of the report.
    pub fn snapshot(&self) -> AggregateReport {
        self.lock().report.clone()
    }

    /// Stamp the report's final status.
    pub fn finish(&self, status: ReportStatus) {
        self.lock().report.status = status;
    }

    pub fn completed(&self) -> usize {
        self.lock().report.results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::MemorySink;
    use crate::scanner::EngineOutput;
    use crate::types::ScanRange;
    use std::time::Duration;

    fn host(last: u8) -> HostTarget {
        HostTarget::assumed(Ipv4Addr::new(10, 0, 0, last))
    }

    fn result(last: u8) -> ScanResult {
        let output = EngineOutput::new("PORT STATE SERVICE\n22/tcp open ssh\n");
        ScanResult::success(host(last), u64::from(last), output, Duration::ZERO)
    }

    fn aggregator(hosts: &[HostTarget], sink: Arc<MemorySink>) -> ResultAggregator {
        let range = ScanRange::parse("10.0.0.0/24").unwrap();
        let report = AggregateReport::new(&range).with_live_hosts(hosts.len() as u64);
        ResultAggregator::new(report, Admission::discovered(hosts), sink)
    }

    #[test]
    fn test_record_streams_and_appends() {
        let sink = Arc::new(MemorySink::default());
        let agg = aggregator(&[host(1)], sink.clone());

        agg.record(result(1)).unwrap();

        assert_eq!(agg.completed(), 1);
        let blocks = sink.blocks();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].contains("10.0.0.1"));
        assert!(blocks[0].contains("22/tcp"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let sink = Arc::new(MemorySink::default());
        let agg = aggregator(&[host(1)], sink.clone());

        agg.record(result(1)).unwrap();
        assert_eq!(
            agg.record(result(1)),
            Err(ReportError::DuplicateHost(Ipv4Addr::new(10, 0, 0, 1)))
        );
        assert_eq!(agg.completed(), 1);
        assert_eq!(sink.blocks().len(), 1);
    }

    #[test]
    fn test_unknown_host_rejected() {
        let agg = aggregator(&[host(1)], Arc::new(MemorySink::default()));
        assert_eq!(
            agg.record(result(2)),
            Err(ReportError::UnknownHost(Ipv4Addr::new(10, 0, 0, 2)))
        );
        assert_eq!(agg.completed(), 0);
    }

    #[test]
    fn test_range_admission() {
        let admission = Admission::Range("10.0.0.0/30".parse().unwrap());
        assert!(admission.admits(Ipv4Addr::new(10, 0, 0, 2)));
        assert!(!admission.admits(Ipv4Addr::new(10, 0, 0, 4)));
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let agg = aggregator(&[host(1), host(2)], Arc::new(MemorySink::default()));
        agg.record(result(1)).unwrap();

        let before = agg.snapshot();
        agg.record(result(2)).unwrap();
        agg.finish(ReportStatus::Completed);

        assert_eq!(before.results.len(), 1);
        assert_eq!(before.status, ReportStatus::Running);
        let after = agg.snapshot();
        assert_eq!(after.results.len(), 2);
        assert_eq!(after.status, ReportStatus::Completed);
    }

    #[test]
    fn test_concurrent_records_lose_nothing() {
        const N: u8 = 200;
        let hosts: Vec<HostTarget> = (1..=N).map(host).collect();
        let sink = Arc::new(MemorySink::default());
        let agg = Arc::new(aggregator(&hosts, sink.clone()));
        let lasts: Vec<u8> = (1..=N).collect();

        std::thread::scope(|scope| {
            for chunk in lasts.chunks(10) {
                let agg = Arc::clone(&agg);
                scope.spawn(move || {
                    for &last in chunk {
                        agg.record(result(last)).unwrap();
                        // A racing duplicate must never land.
                        assert!(agg.record(result(last)).is_err());
                    }
                });
            }
        });

        let report = agg.snapshot();
        assert_eq!(report.results.len(), usize::from(N));
        let unique: HashSet<_> = report.results.iter().map(|r| r.address()).collect();
        assert_eq!(unique.len(), usize::from(N));
        assert_eq!(sink.blocks().len(), usize::from(N));
    }
}
