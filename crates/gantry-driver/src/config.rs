//! Driver configuration - logging cadence and the deferred macro
//!
//! The macro settings describe a one-shot engine command file executed after
//! a given number of events, e.g. to switch on visualization partway through
//! a run.

use crate::driver::MacroTrigger;
use serde::{Deserialize, Serialize};

/// Highest supported verbosity level
pub const MAX_VERBOSITY: u8 = 2;

/// Configuration for [`RunDriver`](crate::RunDriver) and [`Job`](crate::Job)
///
/// # Example
///
/// ```
/// use gantry_driver::DriverConfig;
///
/// let mut config = DriverConfig::default();
/// assert_eq!(config.verbosity(), 0);
/// assert!(config.macro_trigger().is_none());
///
/// config.set_macro("vis.mac", 10);
/// let trigger = config.macro_trigger().unwrap();
/// assert_eq!(trigger.after_events, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// 0 logs run boundaries only, 1 adds per-event progress, 2 adds
    /// per-event timing
    ///
    /// Clamped to `[0, MAX_VERBOSITY]`.
    verbosity: u8,
    /// Log progress every this many events at verbosity 1 (0 disables)
    print_progress: u64,
    /// Engine macro file run once during the run
    macro_path: Option<String>,
    /// Number of processed events after which the macro runs
    macro_after_events: u64,
}

impl DriverConfig {
    pub fn with_verbosity(verbosity: u8) -> Self {
        Self {
            verbosity: verbosity.min(MAX_VERBOSITY),
            ..Self::default()
        }
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// Set the verbosity, clamped to `[0, MAX_VERBOSITY]`
    pub fn set_verbosity(&mut self, verbosity: u8) {
        self.verbosity = verbosity.min(MAX_VERBOSITY);
    }

    pub fn print_progress(&self) -> u64 {
        self.print_progress
    }

    pub fn set_print_progress(&mut self, every: u64) {
        self.print_progress = every;
    }

    /// Run `path` once, right after event number `after_events` is processed
    ///
    /// `after_events` is clamped to at least 1.
    pub fn set_macro(&mut self, path: impl Into<String>, after_events: u64) {
        self.macro_path = Some(path.into());
        self.macro_after_events = after_events.max(1);
    }

    pub fn clear_macro(&mut self) {
        self.macro_path = None;
        self.macro_after_events = 0;
    }

    /// The deferred macro, if one is configured
    pub fn macro_trigger(&self) -> Option<MacroTrigger> {
        self.macro_path
            .as_ref()
            .filter(|path| !path.is_empty() && self.macro_after_events > 0)
            .map(|path| MacroTrigger::new(path.clone(), self.macro_after_events))
    }

    /// Whether event `processed` (1-based) should log progress
    pub fn should_report(&self, processed: u64) -> bool {
        self.verbosity >= 1 && self.print_progress > 0 && processed % self.print_progress == 0
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            print_progress: 100,
            macro_path: None,
            macro_after_events: 0,
        }
    }
}
