//! Scan engine trait abstraction.
//!
//! Defines the contract every external scan engine satisfies, so the
//! orchestration layer never depends on a particular binary. The production
//! implementation is [`NmapEngine`](super::NmapEngine); tests substitute
//! scripted engines.

use crate::error::InvokeResult;
use async_trait::async_trait;
use ipnetwork::Ipv4Network;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// How the engine should scan its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Fast liveness sweep over a whole range, no port enumeration.
    Discovery,
    /// Full port range with service/version and script probing on one host.
    Detailed,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery => write!(f, "discovery"),
            Self::Detailed => write!(f, "detailed"),
        }
    }
}

/// What a single invocation is pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineTarget {
    /// A whole range, swept in one invocation.
    Range(Ipv4Network),
    /// A single host.
    Host(Ipv4Addr),
}

impl fmt::Display for EngineTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range(network) => write!(f, "{}", network),
            Self::Host(addr) => write!(f, "{}", addr),
        }
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    pub stdout: String,
    pub stderr: String,
}

impl EngineOutput {
    pub fn new(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Trait for external scan engines.
///
/// Implementations must bound every invocation by `timeout` and report a
/// timeout as [`InvokeError::Timeout`](crate::error::InvokeError::Timeout),
/// a non-zero exit as `EngineFailed` and an absent binary as `EngineMissing`.
/// They never retry.
#[async_trait]
pub trait ScanEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Check that the engine can be run, returning a version line.
    async fn probe(&self) -> InvokeResult<String>;

    /// Run one invocation against `target`.
    async fn invoke(
        &self,
        target: EngineTarget,
        mode: ScanMode,
        timeout: Duration,
    ) -> InvokeResult<EngineOutput>;
}
