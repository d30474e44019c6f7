//! The validated configuration of one run.
//!
//! Built by layering command-line overrides over [`AppSettings`]; the core
//! never sees unvalidated values.

use crate::config::AppSettings;
use crate::error::SetupError;
use crate::scanner::{PoolConfig, MAX_CONCURRENCY};
use crate::types::ScanRange;
use std::path::PathBuf;
use std::time::Duration;

/// Values given on the command line. `None` keeps the settings value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub concurrency: Option<usize>,
    pub delay_secs: Option<f64>,
    pub discovery_timeout_secs: Option<u64>,
    pub scan_timeout_secs: Option<u64>,
    pub drain_grace_secs: Option<u64>,
    pub nmap_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub skip_discovery: bool,
}

/// Everything a run needs, checked and in typed form.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub range: ScanRange,
    pub concurrency: usize,
    pub delay: Duration,
    pub discovery_timeout: Duration,
    pub scan_timeout: Duration,
    pub drain_grace: Duration,
    pub nmap_path: PathBuf,
    pub output_dir: PathBuf,
    pub skip_discovery: bool,
}

impl RunConfig {
    /// A configuration for `range` with built-in defaults.
    pub fn new(range: ScanRange) -> Self {
        let defaults = AppSettings::default();
        Self {
            range,
            concurrency: defaults.concurrency,
            delay: Duration::from_secs_f64(defaults.delay_secs),
            discovery_timeout: Duration::from_secs(defaults.discovery_timeout_secs),
            scan_timeout: Duration::from_secs(defaults.scan_timeout_secs),
            drain_grace: Duration::from_secs(defaults.drain_grace_secs),
            nmap_path: defaults.nmap_path,
            output_dir: PathBuf::from("."),
            skip_discovery: false,
        }
    }

    /// Merge overrides over settings and validate the result.
    pub fn resolve(
        range: &str,
        settings: &AppSettings,
        overrides: ConfigOverrides,
    ) -> Result<Self, SetupError> {
        let range = ScanRange::parse(range)?;

        let concurrency = overrides.concurrency.unwrap_or(settings.concurrency);
        if !(1..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(SetupError::InvalidArgument(format!(
                "concurrency must be between 1 and {}, got {}",
                MAX_CONCURRENCY, concurrency
            )));
        }

        let delay_secs = overrides.delay_secs.unwrap_or(settings.delay_secs);
        let delay = Duration::try_from_secs_f64(delay_secs).map_err(|_| {
            SetupError::InvalidArgument(format!(
                "delay must be a non-negative number of seconds, got {}",
                delay_secs
            ))
        })?;

        let discovery_timeout = positive_secs(
            "discovery timeout",
            overrides
                .discovery_timeout_secs
                .unwrap_or(settings.discovery_timeout_secs),
        )?;
        let scan_timeout = positive_secs(
            "scan timeout",
            overrides.scan_timeout_secs.unwrap_or(settings.scan_timeout_secs),
        )?;
        let drain_grace = Duration::from_secs(
            overrides.drain_grace_secs.unwrap_or(settings.drain_grace_secs),
        );

        Ok(Self {
            range,
            concurrency,
            delay,
            discovery_timeout,
            scan_timeout,
            drain_grace,
            nmap_path: overrides
                .nmap_path
                .unwrap_or_else(|| settings.nmap_path.clone()),
            output_dir: overrides
                .output_dir
                .or_else(|| settings.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            skip_discovery: overrides.skip_discovery,
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_skip_discovery(mut self, skip: bool) -> Self {
        self.skip_discovery = skip;
        self
    }

    /// Worker pool settings for Phase 2.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_concurrency: self.concurrency,
            scan_timeout: self.scan_timeout,
            drain_grace: self.drain_grace,
        }
    }
}

fn positive_secs(what: &str, secs: u64) -> Result<Duration, SetupError> {
    if secs == 0 {
        return Err(SetupError::InvalidArgument(format!(
            "{} must be at least one second",
            what
        )));
    }
    Ok(Duration::from_secs(secs))
}
