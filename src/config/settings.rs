//! Application settings and paths.
//!
//! Settings live in an optional `settings.json` in the XDG config directory
//! (`~/.config/netranger` on Linux). Every field has a default, so a partial
//! file only overrides what it names.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/netranger)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Resolve the platform directories. Nothing is created.
    pub fn resolve() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "netranger", "netranger")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Persistent defaults for a run. CLI flags take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppSettings {
    /// Simultaneous detailed scans.
    pub concurrency: usize,
    /// Minimum seconds between detailed scan starts.
    pub delay_secs: f64,
    /// Bound on the discovery sweep, in seconds.
    pub discovery_timeout_secs: u64,
    /// Bound on each detailed scan, in seconds.
    pub scan_timeout_secs: u64,
    /// Grace period for in-flight scans after an interrupt, in seconds.
    pub drain_grace_secs: u64,
    /// Engine binary to run.
    pub nmap_path: PathBuf,
    /// Where reports are written; the working directory if unset.
    pub output_dir: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            concurrency: 50,
            delay_secs: 0.1,
            discovery_timeout_secs: 300,
            scan_timeout_secs: 900,
            drain_grace_secs: 120,
            nmap_path: PathBuf::from("nmap"),
            output_dir: None,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, falling back to defaults
    /// when there is no settings file.
    pub fn load() -> ConfigResult<Self> {
        let file = match Paths::resolve() {
            Ok(paths) => paths.settings_file(),
            Err(e) => {
                debug!(error = %e, "no configuration directory, using defaults");
                return Ok(Self::default());
            }
        };

        if !file.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&file)
    }

    /// Load settings from a specific file, which must exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }
}
