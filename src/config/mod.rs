//! Configuration management for netranger.
//!
//! Layering, lowest to highest: built-in defaults, the JSON settings file,
//! command-line flags. The result is a validated [`RunConfig`].

mod run;
mod settings;

pub use run::{ConfigOverrides, RunConfig};
pub use settings::{AppSettings, Paths};
