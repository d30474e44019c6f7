//! Bounded worker pool for Phase 2 detailed scans.
//!
//! Jobs are dispatched in discovery order. Each dispatch first takes a
//! concurrency permit, then a rate-limiter slot; the scan itself runs in a
//! task on a `JoinSet` and hands its result to the aggregator before giving
//! the permit back.

use crate::output::LiveSink;
use crate::scanner::interrupt::InterruptCoordinator;
use crate::scanner::rate_limiter::RateLimiter;
use crate::scanner::traits::{EngineTarget, ScanEngine, ScanMode};
use crate::storage::{ResultAggregator, ScanResult};
use crate::types::HostTarget;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

/// Hard ceiling on simultaneous detailed scans.
pub const MAX_CONCURRENCY: usize = 200;

/// Default number of simultaneous detailed scans.
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Pool tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Requested concurrency; clamped to `1..=MAX_CONCURRENCY`.
    pub max_concurrency: usize,
    /// Per-host scan timeout.
    pub scan_timeout: Duration,
    /// How long in-flight scans may keep running after a stop request.
    pub drain_grace: Duration,
}

impl PoolConfig {
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.clamp(1, MAX_CONCURRENCY)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_CONCURRENCY,
            scan_timeout: Duration::from_secs(900),
            drain_grace: Duration::from_secs(120),
        }
    }
}

/// One unit of Phase 2 work.
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub host: HostTarget,
    /// 1-based dispatch position.
    pub sequence: u64,
    pub total: u64,
}

/// What happened to the jobs of one pool run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSummary {
    /// Jobs started.
    pub dispatched: u64,
    /// Results accepted by the aggregator.
    pub recorded: u64,
    /// In-flight jobs cancelled by a forced stop or grace expiry.
    pub abandoned: u64,
}

impl PoolSummary {
    fn tally(&mut self, joined: Result<bool, JoinError>) {
        match joined {
            Ok(true) => self.recorded += 1,
            Ok(false) => {}
            Err(e) if e.is_cancelled() => self.abandoned += 1,
            Err(e) => error!(error = %e, "scan task panicked"),
        }
    }
}

/// Runs detailed scans with bounded concurrency and paced dispatch.
pub struct WorkerPool {
    engine: Arc<dyn ScanEngine>,
    limiter: RateLimiter,
    coordinator: InterruptCoordinator,
    aggregator: Arc<ResultAggregator>,
    sink: Arc<dyn LiveSink>,
    config: PoolConfig,
}

impl WorkerPool {
    pub fn new(
        engine: Arc<dyn ScanEngine>,
        limiter: RateLimiter,
        coordinator: InterruptCoordinator,
        aggregator: Arc<ResultAggregator>,
        sink: Arc<dyn LiveSink>,
        config: PoolConfig,
    ) -> Self {
        Self {
            engine,
            limiter,
            coordinator,
            aggregator,
            sink,
            config,
        }
    }

    /// Scan every host, or as many as possible before a stop request.
    ///
    /// Returns once every dispatched job has either recorded its result or
    /// been abandoned.
    pub async fn run<I>(&self, hosts: I, total: u64) -> PoolSummary
    where
        I: IntoIterator<Item = HostTarget>,
    {
        let concurrency = self.config.effective_concurrency();
        if concurrency != self.config.max_concurrency {
            warn!(
                requested = self.config.max_concurrency,
                effective = concurrency,
                "concurrency clamped"
            );
        }

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks: JoinSet<bool> = JoinSet::new();
        let mut summary = PoolSummary::default();

        info!(
            total,
            concurrency,
            delay_ms = self.limiter.delay().as_millis() as u64,
            "phase 2: detailed scans"
        );
        self.sink.begin(total);

        for host in hosts {
            if self.coordinator.is_stop_requested() {
                break;
            }

            let permit = tokio::select! {
                biased;
                _ = self.coordinator.stop_requested() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            tokio::select! {
                biased;
                _ = self.coordinator.stop_requested() => break,
                _ = self.limiter.acquire() => {}
            }

            summary.dispatched += 1;
            let job = ScanJob {
                host,
                sequence: summary.dispatched,
                total,
            };
            debug!(host = %job.host, sequence = job.sequence, total, "dispatching");
            self.sink.dispatched(&job.host, job.sequence, total);

            tasks.spawn(scan_host(
                Arc::clone(&self.engine),
                Arc::clone(&self.aggregator),
                job,
                self.config.scan_timeout,
                permit,
            ));

            while let Some(joined) = tasks.try_join_next() {
                summary.tally(joined);
            }
        }

        self.drain(&mut tasks, &mut summary).await;
        self.sink.end();

        info!(
            dispatched = summary.dispatched,
            recorded = summary.recorded,
            abandoned = summary.abandoned,
            "phase 2 finished"
        );
        summary
    }

    /// Wait for in-flight jobs, honouring the grace period and forced stops.
    async fn drain(&self, tasks: &mut JoinSet<bool>, summary: &mut PoolSummary) {
        let mut deadline = None;
        if self.coordinator.is_stop_requested() {
            deadline = Some(self.enter_drain(tasks.len()));
        }

        loop {
            tokio::select! {
                biased;
                _ = self.coordinator.abandon_requested() => {
                    warn!(in_flight = tasks.len(), "abandoning in-flight scans");
                    break;
                }
                _ = self.coordinator.stop_requested(), if deadline.is_none() => {
                    deadline = Some(self.enter_drain(tasks.len()));
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    warn!(in_flight = tasks.len(), "grace period expired");
                    break;
                }
                joined = tasks.join_next() => match joined {
                    Some(joined) => summary.tally(joined),
                    None => break,
                },
            }
        }

        // Aborting drops each task's child handle, which kills the process.
        tasks.abort_all();
        while let Some(joined) = tasks.join_next().await {
            summary.tally(joined);
        }
    }

    fn enter_drain(&self, in_flight: usize) -> Instant {
        self.coordinator.begin_drain();
        info!(
            in_flight,
            grace_secs = self.config.drain_grace.as_secs(),
            "stop requested, draining in-flight scans"
        );
        Instant::now() + self.config.drain_grace
    }
}

/// Body of one job. Returns whether the result was recorded.
async fn scan_host(
    engine: Arc<dyn ScanEngine>,
    aggregator: Arc<ResultAggregator>,
    job: ScanJob,
    limit: Duration,
    permit: OwnedSemaphorePermit,
) -> bool {
    let started = Instant::now();
    let addr = job.host.address;

    let result = match engine
        .invoke(EngineTarget::Host(addr), ScanMode::Detailed, limit)
        .await
    {
        Ok(output) => ScanResult::success(job.host, job.sequence, output, started.elapsed()),
        Err(e) => {
            warn!(host = %addr, error = %e, "detailed scan failed");
            ScanResult::failure(job.host, job.sequence, &e, started.elapsed())
        }
    };

    let recorded = match aggregator.record(result) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "result rejected");
            false
        }
    };
    drop(permit);
    recorded
}
