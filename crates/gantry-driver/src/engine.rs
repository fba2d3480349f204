//! SimulationEngine trait - the seam between the driver and particle transport
//!
//! The driver never transports particles itself. It hands each phase to an
//! engine through this trait, and the engine calls back into the
//! [`ActionRegistry`] at the points only it can see (primary generation,
//! tracking, stepping, stacking).

use crate::error::Result;
use gantry_core::{ActionRegistry, Event, PhysicsList, RunInfo};
use gantry_geometry::{PhysicalVolumeId, VolumeStore};

/// External particle-transport engine
///
/// Expected call sequence per job:
///
/// ```text
/// initialize_physics → construct_geometry
///   (begin_run → (generate_event → process_event → post_event_scoring)* → end_run)*
/// ```
pub trait SimulationEngine {
    /// Take ownership of the job's physics list
    fn initialize_physics(&mut self, physics: Box<dyn PhysicsList>) -> Result<()>;

    /// Receive the placed world volume, once per job
    fn construct_geometry(&mut self, world: PhysicalVolumeId, volumes: &VolumeStore)
        -> Result<()>;

    fn begin_run(&mut self, run: &RunInfo) -> Result<()>;

    /// Create event `number` and fill its primaries
    ///
    /// Implementations call [`ActionRegistry::generate_primaries`].
    fn generate_event(&mut self, number: u64, registry: &ActionRegistry) -> Result<Event>;

    /// Transport the event to completion
    ///
    /// Implementations call the tracking, stepping and stacking fan-outs of
    /// `registry` as tracks are created and stepped.
    fn process_event(&mut self, event: &mut Event, registry: &ActionRegistry) -> Result<()>;

    /// Update scoring meshes after an event; most engines need nothing here
    fn post_event_scoring(&mut self, _event: &Event) -> Result<()> {
        Ok(())
    }

    /// Execute an engine command file
    fn execute_macro(&mut self, path: &str) -> Result<()>;

    fn end_run(&mut self, run: &RunInfo) -> Result<()>;
}
