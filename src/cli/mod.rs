//! Command-line interface.
//!
//! `netranger -r <CIDR> [options]` runs one two-phase sweep. Global flags
//! control logging and where persistent settings come from; the scan flags
//! live in [`ScanCommand`].

mod scan;

pub use scan::ScanCommand;

use crate::config::AppSettings;
use crate::error::{RunError, SetupError};
use clap::Parser;
use std::path::PathBuf;

/// netranger - two-phase network reconnaissance.
///
/// Sweeps a CIDR range for live hosts, then runs a full-port service scan on
/// every live host in parallel, streaming results as they complete and
/// saving them in XML, normal and grepable form.
#[derive(Parser, Debug)]
#[command(name = "netranger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Two-phase network reconnaissance driver for nmap", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub scan: ScanCommand,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to custom settings file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Default tracing filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "netranger=debug"
        } else if self.quiet {
            "netranger=warn"
        } else {
            "netranger=info"
        }
    }

    /// Run the scan and return the process exit code.
    pub async fn run(&self) -> Result<u8, RunError> {
        let settings = self.load_settings()?;
        self.scan.execute(&settings, self.quiet).await
    }

    fn load_settings(&self) -> Result<AppSettings, SetupError> {
        let settings = match &self.config {
            Some(path) => AppSettings::load_from(path)?,
            None => AppSettings::load()?,
        };
        Ok(settings)
    }
}
