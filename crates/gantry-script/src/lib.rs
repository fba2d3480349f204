//! Gantry Script - RON job configuration
//!
//! Loads a job's configuration from one or more RON files:
//! - Global parameters shared by every plugin
//! - Named run settings, looked up per run
//! - Driver settings (verbosity, deferred macro)
//! - Per-plugin parameter sets
//! - Geometry component descriptors

mod error;
mod loader;
mod schema;

pub use error::{Error, Result};
pub use loader::Loader;
pub use schema::{JobConfig, PluginConfig};
