//! Scanner module - drives the external engine through both phases.
//!
//! Phase 1 sweeps the whole range once to find live hosts; Phase 2 runs a
//! detailed scan per live host through a bounded, rate-limited worker pool.
//! The [`Orchestrator`] sequences the two and owns the interrupt lifecycle.

mod discovery;
mod interrupt;
mod nmap;
mod orchestrator;
pub(crate) mod parse;
mod pool;
mod rate_limiter;
mod traits;

pub use discovery::RangeExpander;
pub use interrupt::{InterruptCoordinator, RunState};
pub use nmap::NmapEngine;
pub use orchestrator::{Orchestrator, RunOutcome, RunStatus};
pub use pool::{PoolConfig, PoolSummary, ScanJob, WorkerPool, DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
pub use rate_limiter::RateLimiter;
pub use traits::{EngineOutput, EngineTarget, ScanEngine, ScanMode};
