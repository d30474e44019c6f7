//! Scan result collection.
//!
//! `report` holds the per-host result and the aggregate report types;
//! `aggregator` is the mutex-guarded collector shared by workers.

mod aggregator;
mod report;

pub use aggregator::{Admission, ResultAggregator};
pub use report::{AggregateReport, HostStatus, ReportStatus, ScanResult};
