//! Core type definitions using newtype patterns for type safety.
//!
//! These types prevent common logic errors by making invalid states unrepresentable
//! at compile time.

mod host;
mod port;
mod range;
mod scan_id;

pub use host::HostTarget;
pub use port::{Port, PortEntry, PortError, PortState, Protocol};
pub use range::{RangeError, ScanRange};
pub use scan_id::ScanId;
