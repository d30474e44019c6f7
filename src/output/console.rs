//! Terminal presentation: status lines, the startup title and the live sink.

use crate::types::HostTarget;
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, MutexGuard};

/// Destination of the live host stream.
///
/// `emit` is called with the aggregator lock held, so implementations see
/// blocks one at a time and in completion order.
pub trait LiveSink: Send + Sync {
    /// Write one rendered host block.
    fn emit(&self, block: &str);

    /// Phase 2 is about to dispatch `total` jobs.
    fn begin(&self, _total: u64) {}

    /// A detailed scan was started.
    fn dispatched(&self, _host: &HostTarget, _sequence: u64, _total: u64) {}

    /// Phase 2 is over.
    fn end(&self) {}
}

/// Live sink writing to stdout, with an optional progress bar.
pub struct ConsoleSink {
    term: Term,
    show_progress: bool,
    quiet: bool,
    progress: Mutex<Option<ProgressBar>>,
}

impl ConsoleSink {
    pub fn new(show_progress: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            show_progress,
            quiet,
            progress: Mutex::new(None),
        }
    }

    fn bar(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.progress
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self, text: &str) {
        if let Err(e) = self.term.write_line(text) {
            tracing::debug!(error = %e, "failed to write to stdout");
        }
    }
}

impl LiveSink for ConsoleSink {
    fn emit(&self, block: &str) {
        let guard = self.bar();
        match guard.as_ref() {
            Some(pb) if !pb.is_hidden() => {
                pb.println(block);
                pb.inc(1);
            }
            other => {
                self.write(block);
                if let Some(pb) = other {
                    pb.inc(1);
                }
            }
        }
    }

    fn begin(&self, total: u64) {
        if !self.show_progress || self.quiet {
            return;
        }
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} hosts {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        *self.bar() = Some(pb);
    }

    fn dispatched(&self, host: &HostTarget, sequence: u64, total: u64) {
        if self.quiet {
            return;
        }
        let guard = self.bar();
        match guard.as_ref() {
            Some(pb) if !pb.is_hidden() => pb.set_message(format!("scanning {}", host)),
            _ => eprintln!(
                "{} Scanning {} ({}/{})",
                style("[*]").cyan(),
                host,
                sequence,
                total
            ),
        }
    }

    fn end(&self) {
        if let Some(pb) = self.bar().take() {
            pb.finish_and_clear();
        }
    }
}

const TITLE: &str = r"
  _   _      _   ____
 | \ | | ___| |_|  _ \ __ _ _ __   __ _  ___ _ __
 |  \| |/ _ \ __| |_) / _` | '_ \ / _` |/ _ \ '__|
 | |\  |  __/ |_|  _ < (_| | | | | (_| |  __/ |
 |_| \_|\___|\__|_| \_\__,_|_| |_|\__, |\___|_|
                                  |___/";

/// Print the startup title.
pub fn print_title() {
    eprintln!("{}", style(TITLE).cyan().bold());
    eprintln!(
        "  {} v{}\n",
        style("Two-phase network reconnaissance").dim(),
        env!("CARGO_PKG_VERSION")
    );
}

/// Print an error message to stderr.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message to stderr.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print an info message to stderr. Stdout carries only host blocks.
pub fn print_info(msg: &str) {
    eprintln!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a success message to stderr.
pub fn print_success(msg: &str) {
    eprintln!("{} {}", style("✓").green().bold(), msg);
}
