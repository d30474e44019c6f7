//! # netranger - Two-Phase Network Reconnaissance
//!
//! netranger drives `nmap` across a whole CIDR range in two phases: a fast
//! discovery sweep finds the live hosts, then every live host gets a
//! full-port service and script scan, run in parallel under a concurrency
//! cap and a global dispatch rate limit.
//!
//! ## Features
//!
//! - **Bounded parallelism**: up to 200 simultaneous detailed scans
//! - **Paced dispatch**: a minimum delay between scan starts, shared by all workers
//! - **Live results**: each host's port table is streamed as it completes
//! - **Three report formats**: XML, human-readable and grepable, written atomically
//! - **Graceful interrupts**: Ctrl-C stops dispatch, drains in-flight scans
//!   and still saves everything collected; a second Ctrl-C abandons the drain
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use netranger::config::RunConfig;
//! use netranger::output::ConsoleSink;
//! use netranger::scanner::{InterruptCoordinator, NmapEngine, Orchestrator};
//! use netranger::types::ScanRange;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let range = ScanRange::parse("192.168.1.0/24").unwrap();
//!     let config = RunConfig::new(range).with_concurrency(20);
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(NmapEngine::new("nmap")),
//!         config,
//!         InterruptCoordinator::new(),
//!         Arc::new(ConsoleSink::new(true, false)),
//!     );
//!
//!     let outcome = orchestrator.run().await.unwrap();
//!     println!("{}", outcome.report.summary());
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Validated ranges, hosts, ports and scan ids
//! - [`scanner`] - Engine trait, nmap engine, worker pool, rate limiter,
//!   interrupt state machine and the run orchestrator
//! - [`storage`] - Per-host results and the shared aggregator
//! - [`output`] - Console presentation and the three report renderers
//! - [`config`] - Settings file and the validated run configuration
//! - [`cli`] - Command-line parsing
//! - [`error`] - Error types and exit codes

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{RunError, SetupError};
pub use scanner::{Orchestrator, RunOutcome, RunStatus, ScanEngine};
pub use types::{HostTarget, PortEntry, ScanId, ScanRange};
