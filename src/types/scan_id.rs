//! Unique identifiers for scan reports.
//!
//! `ScanId` tags every report so the three output files of one run can be
//! matched up even after they are copied elsewhere.

use std::fmt;
use uuid::Uuid;

/// A unique identifier for one scan run.
///
/// Uses UUID v4 internally for globally unique identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanId(Uuid);

impl ScanId {
    /// Generate a new random scan ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
