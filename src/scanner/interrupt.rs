//! Interrupt handling as an explicit state machine.
//!
//! ```text
//! Running --interrupt--> StopRequested --begin_drain--> Draining --finish--> Flushed
//!                              |                            |
//!                              +------ interrupt again -----+--> forced (abandon in-flight)
//! ```
//!
//! Signal delivery is kept apart from the state machine: [`listen`] turns
//! Ctrl-C / SIGTERM into [`InterruptCoordinator::interrupt`] calls, and tests
//! call `interrupt` directly.
//!
//! [`listen`]: InterruptCoordinator::listen

use crate::output;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Normal dispatch.
    Running,
    /// A stop was requested; no new jobs may start.
    StopRequested,
    /// In-flight jobs are finishing.
    Draining,
    /// The final report has been written.
    Flushed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::StopRequested => write!(f, "stop requested"),
            Self::Draining => write!(f, "draining"),
            Self::Flushed => write!(f, "flushed"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Signals {
    state: RunState,
    interrupted: bool,
    forced: bool,
}

/// Shared handle to the run's interrupt state. Clones observe the same state.
#[derive(Clone)]
pub struct InterruptCoordinator {
    tx: Arc<watch::Sender<Signals>>,
}

impl InterruptCoordinator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Signals {
            state: RunState::Running,
            interrupted: false,
            forced: false,
        });
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> RunState {
        self.tx.borrow().state
    }

    /// Whether any interrupt arrived during this run.
    pub fn was_interrupted(&self) -> bool {
        self.tx.borrow().interrupted
    }

    /// Whether new work must not be started.
    pub fn is_stop_requested(&self) -> bool {
        self.tx.borrow().interrupted
    }

    /// Whether in-flight work must be abandoned immediately.
    pub fn is_forced(&self) -> bool {
        self.tx.borrow().forced
    }

    /// Feed one external interrupt into the state machine.
    ///
    /// The first interrupt requests a stop. A second one while stopping or
    /// draining forces abandonment of in-flight jobs. Interrupts after the
    /// final flush are ignored.
    pub fn interrupt(&self) -> RunState {
        self.tx.send_modify(|s| match s.state {
            RunState::Running => {
                s.state = RunState::StopRequested;
                s.interrupted = true;
            }
            RunState::StopRequested | RunState::Draining => {
                s.forced = true;
            }
            RunState::Flushed => {}
        });
        self.state()
    }

    /// Acknowledge a stop request: dispatch has ended and in-flight jobs are
    /// draining. Has no effect unless a stop was requested.
    pub fn begin_drain(&self) {
        self.tx.send_if_modified(|s| {
            if s.state == RunState::StopRequested {
                s.state = RunState::Draining;
                true
            } else {
                false
            }
        });
    }

    /// Mark the final report as written.
    pub fn finish(&self) {
        self.tx.send_modify(|s| s.state = RunState::Flushed);
    }

    /// Resolves once a stop has been requested.
    pub async fn stop_requested(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|s| s.interrupted).await;
    }

    /// Resolves once in-flight work must be abandoned.
    pub async fn abandon_requested(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|s| s.forced).await;
    }

    /// Spawn a task translating Ctrl-C (and SIGTERM on Unix) into
    /// [`interrupt`](Self::interrupt) calls.
    pub fn listen(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = wait_for_signal().await {
                    warn!(error = %e, "cannot listen for interrupt signals");
                    return;
                }

                match coordinator.interrupt() {
                    RunState::StopRequested => {
                        info!("interrupt received, stopping dispatch");
                        output::print_warning(
                            "Scan interrupted; finishing in-flight scans (interrupt again to abort them)",
                        );
                    }
                    RunState::Flushed => return,
                    _ => {
                        info!("second interrupt received, abandoning in-flight scans");
                        output::print_warning("Abandoning in-flight scans and saving partial results");
                        return;
                    }
                }
            }
        })
    }
}

impl Default for InterruptCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
