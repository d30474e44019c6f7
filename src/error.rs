//! Error types for netranger.
//!
//! Uses `thiserror` for ergonomic error definitions. Errors are split by how
//! far they travel: `InvokeError` stays inside one job unless it happens
//! during discovery, `ReportError` is only ever logged, and `RunError` is the
//! classified, process-ending failure.

use crate::types::RangeError;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Process exit codes.
pub mod exit_code {
    /// Every live host was scanned and the results were saved.
    pub const COMPLETED: u8 = 0;
    /// Runtime failure after setup, e.g. results could not be written.
    pub const FAILURE: u8 = 1;
    /// Invalid input, missing engine or unusable configuration.
    pub const SETUP: u8 = 2;
    /// The discovery sweep itself failed.
    pub const DISCOVERY: u8 = 3;
    /// Stopped by a signal; partial results were saved.
    pub const INTERRUPTED: u8 = 130;
}

/// Failure of a single engine invocation.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("scan engine '{0}' not found")]
    EngineMissing(String),

    #[error("timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("host did not respond")]
    HostDown,

    #[error("engine exited with {}: {stderr}", .code.map_or_else(|| "signal".to_string(), |c| format!("status {c}")))]
    EngineFailed { code: Option<i32>, stderr: String },

    #[error("failed to start engine: {0}")]
    Spawn(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a run before any scanning happens.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("invalid range: {0}")]
    InvalidRange(#[from] RangeError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("scan engine unavailable: {0}")]
    EngineUnavailable(InvokeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),
}

/// Errors raised while persisting a report.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render XML: {0}")]
    Xml(String),

    #[error("failed to render grepable output: {0}")]
    Grepable(#[from] csv::Error),

    #[error("grepable output is not valid UTF-8: {0}")]
    GrepableEncoding(#[from] std::string::FromUtf8Error),
}

/// Results rejected by the aggregator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("host {0} already has a recorded result")]
    DuplicateHost(Ipv4Addr),

    #[error("host {0} was not admitted for scanning")]
    UnknownHost(Ipv4Addr),
}

/// A run-ending failure, classified for the exit status.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("discovery sweep failed: {0}")]
    Discovery(InvokeError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl RunError {
    /// Exit code for this failure class.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Setup(_) => exit_code::SETUP,
            Self::Discovery(_) => exit_code::DISCOVERY,
            Self::Output(_) => exit_code::FAILURE,
        }
    }
}

/// Result type alias for engine invocations.
pub type InvokeResult<T> = Result<T, InvokeError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let setup = RunError::Setup(SetupError::InvalidArgument("x".into()));
        let discovery = RunError::Discovery(InvokeError::Timeout(Duration::from_secs(1)));
        let output = RunError::Output(OutputError::Xml("x".into()));

        assert_eq!(setup.exit_code(), exit_code::SETUP);
        assert_eq!(discovery.exit_code(), exit_code::DISCOVERY);
        assert_eq!(output.exit_code(), exit_code::FAILURE);
        assert_ne!(exit_code::INTERRUPTED, exit_code::COMPLETED);
    }

    #[test]
    fn test_invoke_error_messages() {
        assert_eq!(
            InvokeError::Timeout(Duration::from_millis(1500)).to_string(),
            "timed out after 1.5s"
        );
        let failed = InvokeError::EngineFailed {
            code: Some(1),
            stderr: "bad target".into(),
        };
        assert_eq!(failed.to_string(), "engine exited with status 1: bad target");
        assert_eq!(InvokeError::HostDown.to_string(), "host did not respond");
    }
}
