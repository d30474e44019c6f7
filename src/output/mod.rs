//! Output module.
//!
//! Two audiences: the terminal, which gets status lines and the live host
//! stream as results arrive, and the output directory, which gets the report
//! in XML, human-readable and grepable form under a shared filename stem.

mod console;
mod grepable;
mod normal;
mod xml_format;

pub use console::{
    print_error, print_info, print_success, print_title, print_warning, ConsoleSink, LiveSink,
};
pub use grepable::render_grepable;
pub use normal::{render_host_block, render_report};
pub use xml_format::render_xml;

use crate::error::OutputError;
use crate::storage::AggregateReport;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Locations of the three report files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub xml: PathBuf,
    pub normal: PathBuf,
    pub grepable: PathBuf,
}

impl OutputPaths {
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [&self.xml, &self.normal, &self.grepable]
            .into_iter()
            .map(PathBuf::as_path)
    }
}

/// Persists report snapshots.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
    stem: String,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
        }
    }

    pub fn paths(&self) -> OutputPaths {
        OutputPaths {
            xml: self.dir.join(format!("{}.xml", self.stem)),
            normal: self.dir.join(format!("{}.nmap", self.stem)),
            grepable: self.dir.join(format!("{}.gnmap", self.stem)),
        }
    }

    /// Write all three files for `report`, replacing earlier versions.
    ///
    /// Every document is rendered before anything touches the disk, and each
    /// file is written to a temporary name and renamed into place, so a
    /// reader never sees a half-written file.
    pub fn flush(&self, report: &AggregateReport) -> Result<OutputPaths, OutputError> {
        let xml = render_xml(report)?;
        let normal = render_report(report);
        let grepable = render_grepable(report)?;

        fs::create_dir_all(&self.dir).map_err(|source| OutputError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let paths = self.paths();
        write_atomic(&paths.xml, xml.as_bytes())?;
        write_atomic(&paths.normal, normal.as_bytes())?;
        write_atomic(&paths.grepable, grepable.as_bytes())?;

        debug!(
            stem = %self.stem,
            results = report.completed(),
            status = %report.status,
            "report flushed"
        );
        Ok(paths)
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), OutputError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    let wrap = |source: std::io::Error| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, contents).map_err(wrap)?;
    fs::rename(&tmp, path).map_err(wrap)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::LiveSink;
    use std::sync::Mutex;

    /// Live sink recording every block in memory.
    #[derive(Default)]
    pub struct MemorySink {
        blocks: Mutex<Vec<String>>,
    }

    impl MemorySink {
        pub fn blocks(&self) -> Vec<String> {
            self.blocks.lock().unwrap().clone()
        }
    }

    impl LiveSink for MemorySink {
        fn emit(&self, block: &str) {
            self.blocks.lock().unwrap().push(block.to_string());
        }
    }
}
