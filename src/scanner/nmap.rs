//! nmap-backed scan engine.
//!
//! Runs the `nmap` binary as a child process. Discovery is a ping sweep over
//! the whole range; the detailed scan enumerates every TCP port on one host
//! with default scripts and version detection.

use crate::error::{InvokeError, InvokeResult};
use crate::scanner::parse::{detailed_verdict, HostVerdict};
use crate::scanner::traits::{EngineOutput, EngineTarget, ScanEngine, ScanMode};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

const DISCOVERY_ARGS: &[&str] = &["-sn", "-T4", "--max-retries", "1", "--host-timeout", "3s"];

/// nmap's own per-host limit in detailed mode; matches `--host-timeout 10m`.
const DETAILED_HOST_TIMEOUT: Duration = Duration::from_secs(600);

const DETAILED_ARGS: &[&str] = &[
    "-sC",
    "-sV",
    "-T4",
    "--max-retries",
    "2",
    "--host-timeout",
    "10m",
    "-p-",
];

/// nmap invocation wrapper.
///
/// The SYN scan (`-sS`) needs raw sockets; without them the detailed scan
/// falls back to a TCP connect scan (`-sT`).
pub struct NmapEngine {
    binary: PathBuf,
    privileged: bool,
}

impl NmapEngine {
    /// Create an engine that runs `binary`, scanning privileged if the
    /// current process is root.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            privileged: is_root(),
        }
    }

    /// Override privilege detection.
    pub fn with_privileges(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Build the argument list for one invocation.
    pub fn arguments(&self, target: EngineTarget, mode: ScanMode) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        match mode {
            ScanMode::Discovery => {
                args.extend(DISCOVERY_ARGS.iter().map(|a| a.to_string()));
            }
            ScanMode::Detailed => {
                let technique = if self.privileged { "-sS" } else { "-sT" };
                args.push(technique.to_string());
                args.extend(DETAILED_ARGS.iter().map(|a| a.to_string()));
            }
        }
        args.push(target.to_string());
        args
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> InvokeError {
        if e.kind() == ErrorKind::NotFound {
            InvokeError::EngineMissing(self.binary.display().to_string())
        } else {
            InvokeError::Spawn(e)
        }
    }
}

#[async_trait]
impl ScanEngine for NmapEngine {
    fn name(&self) -> &str {
        "nmap"
    }

    async fn probe(&self) -> InvokeResult<String> {
        let output = self
            .command()
            .arg("--version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(InvokeError::EngineFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    async fn invoke(
        &self,
        target: EngineTarget,
        mode: ScanMode,
        limit: Duration,
    ) -> InvokeResult<EngineOutput> {
        let args = self.arguments(target, mode);
        debug!(binary = %self.binary.display(), args = ?args, "spawning engine");

        let child = self
            .command()
            .args(&args)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Dropping the pending future drops the child, which kills it.
        let output = match timeout(limit, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(InvokeError::Timeout(limit)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(InvokeError::EngineFailed {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        if mode == ScanMode::Detailed {
            match detailed_verdict(&stdout) {
                HostVerdict::Scanned => {}
                HostVerdict::HostTimeout => {
                    warn!(%target, "engine skipped host on its host timeout");
                    return Err(InvokeError::Timeout(DETAILED_HOST_TIMEOUT));
                }
                HostVerdict::Down => return Err(InvokeError::HostDown),
            }
        }

        Ok(EngineOutput { stdout, stderr })
    }
}

/// Check if running with root/admin privileges.
fn is_root() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
