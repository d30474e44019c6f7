//! Two-phase run orchestration.
//!
//! Probe the engine, sweep the range for live hosts, scan every live host
//! through the worker pool, then write the report. Whatever happens after
//! discovery succeeds (completion, an interrupt, a forced abort), the final
//! flush still runs.

use crate::config::RunConfig;
use crate::error::{exit_code, RunError, SetupError};
use crate::output::{LiveSink, OutputPaths, OutputWriter};
use crate::scanner::discovery::RangeExpander;
use crate::scanner::interrupt::InterruptCoordinator;
use crate::scanner::pool::{PoolSummary, WorkerPool};
use crate::scanner::rate_limiter::RateLimiter;
use crate::scanner::traits::{ScanEngine, ScanMode};
use crate::storage::{AggregateReport, Admission, ReportStatus, ResultAggregator};
use crate::types::HostTarget;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// How a run ended, when it produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Interrupted,
}

impl From<RunStatus> for ReportStatus {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Completed => ReportStatus::Completed,
            RunStatus::Interrupted => ReportStatus::Interrupted,
        }
    }
}

/// A finished run with its persisted report.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub report: AggregateReport,
    pub paths: OutputPaths,
    pub pool: PoolSummary,
    pub engine_version: String,
    pub elapsed: Duration,
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self.status {
            RunStatus::Completed => exit_code::COMPLETED,
            RunStatus::Interrupted => exit_code::INTERRUPTED,
        }
    }
}

/// Drives one run from engine probe to final flush.
pub struct Orchestrator {
    engine: Arc<dyn ScanEngine>,
    config: RunConfig,
    coordinator: InterruptCoordinator,
    sink: Arc<dyn LiveSink>,
    writer: OutputWriter,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn ScanEngine>,
        config: RunConfig,
        coordinator: InterruptCoordinator,
        sink: Arc<dyn LiveSink>,
    ) -> Self {
        let writer = OutputWriter::new(&config.output_dir, config.range.file_stem());
        Self {
            engine,
            config,
            coordinator,
            sink,
            writer,
        }
    }

    pub fn writer(&self) -> &OutputWriter {
        &self.writer
    }

    pub async fn run(&self) -> Result<RunOutcome, RunError> {
        let started = Instant::now();
        let range = &self.config.range;

        let engine_version = self
            .engine
            .probe()
            .await
            .map_err(SetupError::EngineUnavailable)?;
        info!(engine = self.engine.name(), version = %engine_version, "scan engine available");

        let expander = RangeExpander::new(range);
        let report = AggregateReport::new(range);

        let hosts: Box<dyn Iterator<Item = HostTarget> + Send>;
        let admission;
        let total;
        if self.config.skip_discovery {
            info!(range = %range, "discovery skipped, treating every address as live");
            hosts = Box::new(expander.all_hosts());
            admission = Admission::Range(range.network());
            total = range.usable_host_count();
        } else {
            let Some(live) = self.discover(&expander).await? else {
                warn!("interrupted during discovery");
                return self.finish(
                    report,
                    RunStatus::Interrupted,
                    PoolSummary::default(),
                    engine_version,
                    started,
                );
            };
            info!(live = live.len(), range = %range, "discovery finished");

            admission = Admission::discovered(&live);
            total = live.len() as u64;
            hosts = Box::new(live.into_iter());
        }

        let report = report.with_live_hosts(total);
        if total == 0 {
            info!("no live hosts, nothing to scan");
            return self.finish(
                report,
                RunStatus::Completed,
                PoolSummary::default(),
                engine_version,
                started,
            );
        }

        let aggregator = Arc::new(ResultAggregator::new(
            report,
            admission,
            Arc::clone(&self.sink),
        ));
        let pool = WorkerPool::new(
            Arc::clone(&self.engine),
            RateLimiter::new(self.config.delay),
            self.coordinator.clone(),
            Arc::clone(&aggregator),
            Arc::clone(&self.sink),
            self.config.pool_config(),
        );
        let summary = pool.run(hosts, total).await;

        let status = if self.coordinator.was_interrupted() {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        aggregator.finish(status.into());
        self.persist(aggregator.snapshot(), status, summary, engine_version, started)
    }

    /// Phase 1. `None` means the sweep was abandoned by an interrupt.
    async fn discover(
        &self,
        expander: &RangeExpander<'_>,
    ) -> Result<Option<Vec<HostTarget>>, RunError> {
        let target = expander.discovery_target();
        info!(
            %target,
            timeout_secs = self.config.discovery_timeout.as_secs(),
            "phase 1: discovery sweep"
        );

        let sweep = self
            .engine
            .invoke(target, ScanMode::Discovery, self.config.discovery_timeout);

        tokio::select! {
            biased;
            _ = self.coordinator.stop_requested() => Ok(None),
            result = sweep => {
                let output = result.map_err(RunError::Discovery)?;
                Ok(Some(expander.live_hosts(&output.stdout)))
            }
        }
    }

    fn finish(
        &self,
        mut report: AggregateReport,
        status: RunStatus,
        pool: PoolSummary,
        engine_version: String,
        started: Instant,
    ) -> Result<RunOutcome, RunError> {
        report.status = status.into();
        self.persist(report, status, pool, engine_version, started)
    }

    fn persist(
        &self,
        report: AggregateReport,
        status: RunStatus,
        pool: PoolSummary,
        engine_version: String,
        started: Instant,
    ) -> Result<RunOutcome, RunError> {
        let paths = self.writer.flush(&report)?;
        self.coordinator.finish();
        info!(summary = %report.summary(), "report written");

        Ok(RunOutcome {
            status,
            report,
            paths,
            pool,
            engine_version,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::MemorySink;
    use crate::scanner::interrupt::RunState;
    use crate::scanner::testing::ScriptedEngine;
    use crate::storage::HostStatus;
    use crate::types::ScanRange;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn live(count: u8) -> Vec<Ipv4Addr> {
        (1..=count).map(|i| Ipv4Addr::new(192, 168, 1, i * 10)).collect()
    }

    fn config(dir: &TempDir) -> RunConfig {
        RunConfig::new(ScanRange::parse("192.168.1.0/24").unwrap()).with_output_dir(dir.path())
    }

    fn orchestrator(
        engine: ScriptedEngine,
        config: RunConfig,
    ) -> (Orchestrator, Arc<ScriptedEngine>, Arc<MemorySink>, InterruptCoordinator) {
        let engine = Arc::new(engine);
        let sink = Arc::new(MemorySink::default());
        let coordinator = InterruptCoordinator::new();
        let orchestrator = Orchestrator::new(
            engine.clone(),
            config,
            coordinator.clone(),
            sink.clone(),
        );
        (orchestrator, engine, sink, coordinator)
    }

    /// Requests a stop once a given number of host blocks were streamed.
    struct InterruptAfter {
        inner: MemorySink,
        coordinator: InterruptCoordinator,
        after: usize,
        seen: AtomicUsize,
    }

    impl LiveSink for InterruptAfter {
        fn emit(&self, block: &str) {
            self.inner.emit(block);
            if self.seen.fetch_add(1, Ordering::SeqCst) + 1 == self.after {
                self.coordinator.interrupt();
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_hosts_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, engine, sink, coordinator) =
            orchestrator(ScriptedEngine::new(&live(12)), config(&dir));

        let outcome = orchestrator.run().await.unwrap();

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.report.live_hosts, 12);
        assert_eq!(outcome.report.completed(), 12);
        assert_eq!(outcome.report.succeeded(), 12);
        assert_eq!(outcome.report.status, ReportStatus::Completed);
        assert_eq!(outcome.pool.recorded, 12);
        assert_eq!(engine.discovery_calls(), 1);
        assert_eq!(sink.blocks().len(), 12);
        assert_eq!(coordinator.state(), RunState::Flushed);
        assert!(outcome.engine_version.starts_with("Nmap version 7.94"));

        for path in outcome.paths.iter() {
            assert!(path.exists(), "{}", path.display());
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("192-168-1-0_24-network."), "{}", name);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_live_hosts() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, engine, sink, _) = orchestrator(ScriptedEngine::new(&[]), config(&dir));

        let outcome = orchestrator.run().await.unwrap();

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.report.live_hosts, 0);
        assert!(outcome.report.results.is_empty());
        assert_eq!(engine.detailed_calls(), 0);
        assert!(sink.blocks().is_empty());
        assert_eq!(outcome.paths.iter().filter(|p| p.exists()).count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_timeout_among_twelve() {
        let dir = tempfile::tempdir().unwrap();
        let hosts = live(12);
        let engine = ScriptedEngine::new(&hosts)
            .with_scan_delay(Duration::from_secs(40))
            .with_timeout_for(hosts[4]);
        let (orchestrator, _, _, _) = orchestrator(engine, config(&dir));

        let outcome = orchestrator.run().await.unwrap();

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.report.completed(), 12);
        assert_eq!(outcome.report.succeeded(), 11);
        let timed_out: Vec<_> = outcome
            .report
            .results
            .iter()
            .filter(|r| r.status == HostStatus::Timeout)
            .map(|r| r.address())
            .collect();
        assert_eq!(timed_out, vec![hosts[4]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_after_m_results() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            ScriptedEngine::new(&live(10)).with_scan_delay(Duration::from_secs(3)),
        );
        let coordinator = InterruptCoordinator::new();
        let sink = Arc::new(InterruptAfter {
            inner: MemorySink::default(),
            coordinator: coordinator.clone(),
            after: 4,
            seen: AtomicUsize::new(0),
        });
        let orchestrator = Orchestrator::new(
            engine.clone(),
            config(&dir).with_concurrency(1),
            coordinator.clone(),
            sink.clone(),
        );

        let outcome = orchestrator.run().await.unwrap();

        assert_eq!(outcome.status, RunStatus::Interrupted);
        assert_eq!(outcome.exit_code(), 130);
        assert_eq!(outcome.report.status, ReportStatus::Interrupted);
        assert_eq!(outcome.report.completed(), 4);
        assert_eq!(engine.detailed_calls(), 4);
        assert_eq!(sink.inner.blocks().len(), 4);

        let saved = std::fs::read_to_string(&outcome.paths.xml).unwrap();
        assert_eq!(saved.matches("<host ").count(), 4);
        assert!(saved.contains("status=\"interrupted\""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_interrupt_returns_without_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine::new(&live(6)).with_scan_delay(Duration::from_secs(600));
        let (orchestrator, _, _, coordinator) = orchestrator(
            engine,
            config(&dir).with_concurrency(3).with_delay(Duration::ZERO),
        );
        let start = Instant::now();

        let control = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            coordinator.interrupt();
            tokio::time::sleep(Duration::from_secs(1)).await;
            coordinator.interrupt();
        };
        let (outcome, ()) = tokio::join!(orchestrator.run(), control);
        let outcome = outcome.unwrap();

        assert!(Instant::now() - start < Duration::from_secs(60));
        assert_eq!(outcome.status, RunStatus::Interrupted);
        assert_eq!(outcome.pool.abandoned, 3);
        assert!(outcome.report.results.is_empty());
        assert!(outcome.paths.xml.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flushing_snapshot_twice_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, _, _, _) = orchestrator(ScriptedEngine::new(&live(3)), config(&dir));

        let outcome = orchestrator.run().await.unwrap();
        let first: Vec<Vec<u8>> = outcome.paths.iter().map(|p| std::fs::read(p).unwrap()).collect();
        orchestrator.writer().flush(&outcome.report).unwrap();
        let second: Vec<Vec<u8>> = outcome.paths.iter().map(|p| std::fs::read(p).unwrap()).collect();

        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, engine, _, _) =
            orchestrator(ScriptedEngine::new(&live(3)).failing_discovery(), config(&dir));

        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(err, RunError::Discovery(_)));
        assert_eq!(err.exit_code(), 3);
        assert_eq!(engine.detailed_calls(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_timeout_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine::new(&live(3)).with_discovery_delay(Duration::from_secs(1_000));
        let (orchestrator, _, _, _) = orchestrator(engine, config(&dir));

        let err = orchestrator.run().await.unwrap_err();
        assert!(matches!(err, RunError::Discovery(crate::error::InvokeError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_engine_is_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, engine, _, _) =
            orchestrator(ScriptedEngine::new(&live(3)).missing(), config(&dir));

        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(err, RunError::Setup(SetupError::EngineUnavailable(_))));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(engine.discovery_calls(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_during_discovery_flushes_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine::new(&live(3)).with_discovery_delay(Duration::from_secs(100));
        let (orchestrator, engine, _, coordinator) = orchestrator(engine, config(&dir));

        let control = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            coordinator.interrupt();
        };
        let (outcome, ()) = tokio::join!(orchestrator.run(), control);
        let outcome = outcome.unwrap();

        assert_eq!(outcome.status, RunStatus::Interrupted);
        assert!(outcome.report.results.is_empty());
        assert_eq!(outcome.report.status, ReportStatus::Interrupted);
        assert_eq!(engine.detailed_calls(), 0);
        assert!(outcome.paths.grepable.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_discovery_scans_every_usable_address() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::new(ScanRange::parse("10.9.0.0/29").unwrap())
            .with_output_dir(dir.path())
            .with_skip_discovery(true);
        let (orchestrator, engine, _, _) = orchestrator(ScriptedEngine::new(&[]), config);

        let outcome = orchestrator.run().await.unwrap();

        assert_eq!(engine.discovery_calls(), 0);
        assert_eq!(outcome.report.live_hosts, 6);
        assert_eq!(outcome.report.completed(), 6);
        assert!(outcome
            .paths
            .xml
            .ends_with("10-9-0-0_29-network.xml"));
    }
}
