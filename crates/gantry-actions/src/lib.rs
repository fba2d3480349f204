//! Gantry Actions - stock lifecycle plugins
//!
//! Ready-made plugins most jobs register:
//! - [`ClockAction`]: wall time per run
//! - [`TrackRecorder`]: per-event record of created tracks
//! - [`ParticleFilter`]: stack filter killing unwanted particles
//! - [`VolumeNameStore`]: run-level map from physical-volume uid to name
//!
//! Each plugin is configured from a [`ParameterSet`](gantry_core::ParameterSet)
//! and falls back to defaults for missing keys.

mod clock;
mod filter;
mod track;
mod volumes;

pub use clock::ClockAction;
pub use filter::ParticleFilter;
pub use track::{TrackRecord, TrackRecorder};
pub use volumes::VolumeNameStore;
