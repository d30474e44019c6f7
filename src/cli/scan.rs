//! Scan command implementation.

use crate::config::{AppSettings, ConfigOverrides, RunConfig};
use crate::error::RunError;
use crate::output::{self, ConsoleSink};
use crate::scanner::{InterruptCoordinator, NmapEngine, Orchestrator, RunOutcome, RunStatus};
use crate::types::ScanRange;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Options of a sweep.
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// Range to sweep in CIDR notation
    ///
    /// Examples:
    ///   192.168.1.0/24     256 addresses
    ///   10.0.0.0/16        65,536 addresses
    ///   192.168.1.7        a single host
    #[arg(short, long, value_name = "CIDR")]
    pub range: String,

    /// Simultaneous detailed scans (1-200) [default: 50]
    #[arg(short, long, visible_alias = "threads", value_name = "N")]
    pub concurrency: Option<usize>,

    /// Minimum seconds between detailed scan starts [default: 0.1]
    #[arg(short, long, value_name = "SECONDS")]
    pub delay: Option<f64>,

    /// Per-host detailed scan timeout in seconds [default: 900]
    #[arg(long, value_name = "SECONDS")]
    pub scan_timeout: Option<u64>,

    /// Discovery sweep timeout in seconds [default: 300]
    #[arg(long, value_name = "SECONDS")]
    pub discovery_timeout: Option<u64>,

    /// Seconds in-flight scans may finish after an interrupt [default: 120]
    #[arg(long, value_name = "SECONDS")]
    pub grace: Option<u64>,

    /// Path to the nmap binary
    #[arg(long, env = "NETRANGER_NMAP", value_name = "PATH")]
    pub nmap: Option<PathBuf>,

    /// Directory for the report files [default: current directory]
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Skip the discovery sweep and scan every address in the range
    #[arg(long)]
    pub skip_discovery: bool,
}

impl ScanCommand {
    /// Command-line values to layer over the settings file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            concurrency: self.concurrency,
            delay_secs: self.delay,
            discovery_timeout_secs: self.discovery_timeout,
            scan_timeout_secs: self.scan_timeout,
            drain_grace_secs: self.grace,
            nmap_path: self.nmap.clone(),
            output_dir: self.output_dir.clone(),
            skip_discovery: self.skip_discovery,
        }
    }

    /// Execute the sweep.
    pub async fn execute(&self, settings: &AppSettings, quiet: bool) -> Result<u8, RunError> {
        let config = RunConfig::resolve(&self.range, settings, self.overrides())?;

        if !quiet {
            output::print_title();
        }

        if let Some(warning) = large_range_warning(&config.range) {
            output::print_warning(&warning);
        }

        let engine = NmapEngine::new(&config.nmap_path);
        if !engine.is_privileged() {
            output::print_warning(
                "Not running as root: detailed scans use TCP connect (-sT) instead of SYN (-sS)",
            );
        }

        if !quiet {
            output::print_info(&format!(
                "Sweeping {} ({} addresses), up to {} parallel scans, {:.2}s between starts",
                config.range,
                config.range.host_count(),
                config.concurrency,
                config.delay.as_secs_f64()
            ));
        }

        let coordinator = InterruptCoordinator::new();
        let listener = coordinator.listen();
        let sink = Arc::new(ConsoleSink::new(true, quiet));
        let orchestrator = Orchestrator::new(Arc::new(engine), config, coordinator, sink);

        let result = orchestrator.run().await;
        listener.abort();

        let outcome = result?;
        print_summary(&outcome, quiet);
        Ok(outcome.exit_code())
    }
}

fn large_range_warning(range: &ScanRange) -> Option<String> {
    range.is_large().then(|| {
        format!(
            "{} covers {} addresses; the discovery sweep alone may take a long time",
            range,
            range.host_count()
        )
    })
}

fn print_summary(outcome: &RunOutcome, quiet: bool) {
    let report = &outcome.report;
    match outcome.status {
        RunStatus::Completed => output::print_success(&format!(
            "Scan complete: {} live hosts, {} scanned ({} up, {} failed) in {:.1}s",
            report.live_hosts,
            report.completed(),
            report.succeeded(),
            report.failed(),
            outcome.elapsed.as_secs_f64()
        )),
        RunStatus::Interrupted => output::print_warning(&format!(
            "Scan interrupted: {} of {} live hosts scanned, {} abandoned; partial results saved",
            report.completed(),
            report.live_hosts,
            outcome.pool.abandoned
        )),
    }

    if quiet {
        return;
    }
    output::print_info(&format!("Engine: {}", outcome.engine_version));
    for path in outcome.paths.iter() {
        output::print_info(&format!("Saved {}", path.display()));
    }
}
