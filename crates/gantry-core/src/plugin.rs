//! Plugin traits, one per lifecycle capability
//!
//! A plugin implements [`Plugin`] plus any subset of the capability traits.
//! It registers once per capability with the
//! [`ActionRegistry`](crate::ActionRegistry), and must list exactly those
//! capabilities in [`Plugin::capabilities`]. Capability hooks have no default
//! bodies: implementing a capability means implementing all of its hooks.

use crate::capability::CapabilitySet;
use crate::error::Result;
use crate::output::{OutputCollector, OutputRecord};
use crate::records::{Event, RunInfo, Step, Track};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared, job-scoped handle to a plugin or component
///
/// The host that constructs a plugin keeps one handle; the registry keeps
/// others. Nothing is reclaimed mid-job.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap a value into a [`Shared`] handle
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Base behaviour shared by every plugin
pub trait Plugin {
    /// Name, unique per capability
    fn name(&self) -> &str;

    /// Capabilities this plugin implements and will register under
    fn capabilities(&self) -> CapabilitySet;

    /// Reserve output slots before the first run
    fn declare_outputs(&mut self, _collector: &mut OutputCollector) -> Result<()> {
        Ok(())
    }

    /// One-time initialization after physics setup, before the first run
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Write this plugin's per-event products
    fn fill_event_outputs(&mut self, _record: &mut OutputRecord) -> Result<()> {
        Ok(())
    }

    /// Write this plugin's per-run products
    fn fill_run_outputs(&mut self, _record: &mut OutputRecord) -> Result<()> {
        Ok(())
    }
}

/// Run lifecycle hooks
pub trait RunAction: Plugin {
    fn begin_of_run(&mut self, run: &RunInfo) -> Result<()>;
    fn end_of_run(&mut self, run: &RunInfo) -> Result<()>;
}

/// Event lifecycle hooks
pub trait EventAction: Plugin {
    fn begin_of_event(&mut self, event: &Event) -> Result<()>;
    fn end_of_event(&mut self, event: &Event) -> Result<()>;
}

/// Tracking lifecycle hooks
pub trait TrackingAction: Plugin {
    fn pre_tracking(&mut self, track: &Track) -> Result<()>;
    fn post_tracking(&mut self, track: &Track) -> Result<()>;
}

/// Per-step hook
pub trait SteppingAction: Plugin {
    fn stepping(&mut self, step: &Step) -> Result<()>;
}

/// New-track filter
///
/// Returning `true` kills the track; otherwise it stays on the urgent stack.
pub trait StackingAction: Plugin {
    fn kill_new_track(&mut self, track: &Track) -> Result<bool>;
}

/// Primary particle generation
pub trait PrimaryGeneratorAction: Plugin {
    fn generate_primaries(&mut self, event: &mut Event) -> Result<()>;
}
