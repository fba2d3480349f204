//! Run, event, track and step records passed to lifecycle hooks
//!
//! These are the data the simulation engine hands across the plugin boundary.
//! Their contents are produced by the engine; the runtime only routes them.

use crate::value::{Value, ValueMap};
use serde::{Deserialize, Serialize};

/// Cartesian three-vector (position in mm, direction as unit vector)
pub type Vec3 = [f64; 3];

/// Identifies the run being processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunInfo {
    /// Run number supplied by the event-processing system
    pub number: u32,
}

impl RunInfo {
    pub fn new(number: u32) -> Self {
        Self { number }
    }
}

/// A primary particle placed into an event by a generator plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryParticle {
    /// Particle species name, e.g. `"mu+"`
    pub particle: String,
    /// Kinetic energy in MeV
    pub kinetic_energy: f64,
    /// Starting position
    pub position: Vec3,
    /// Momentum direction
    pub direction: Vec3,
}

impl PrimaryParticle {
    pub fn new(particle: impl Into<String>, kinetic_energy: f64) -> Self {
        Self {
            particle: particle.into(),
            kinetic_energy,
            position: [0.0; 3],
            direction: [0.0, 0.0, 1.0],
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn towards(mut self, direction: Vec3) -> Self {
        self.direction = direction;
        self
    }
}

/// One simulated event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event number supplied by the event-processing system
    pub number: u64,
    /// Primaries filled in by generator plugins
    pub primaries: Vec<PrimaryParticle>,
    /// Free-form engine annotations (hit counts, scoring, ...)
    pub attributes: ValueMap,
}

impl Event {
    pub fn new(number: u64) -> Self {
        Self {
            number,
            ..Default::default()
        }
    }

    /// Append a primary particle
    pub fn add_primary(&mut self, primary: PrimaryParticle) {
        self.primaries.push(primary);
    }

    /// Set an engine annotation
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Read an engine annotation
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// A particle track as seen by tracking and stacking hooks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Track id, unique within an event
    pub id: u32,
    /// Parent track id, 0 for primaries
    pub parent_id: u32,
    /// Particle species name
    pub particle: String,
    /// Kinetic energy in MeV
    pub kinetic_energy: f64,
    /// Name of the physical volume the track is currently in
    pub volume: String,
}

impl Track {
    pub fn new(id: u32, parent_id: u32, particle: impl Into<String>, kinetic_energy: f64) -> Self {
        Self {
            id,
            parent_id,
            particle: particle.into(),
            kinetic_energy,
            volume: String::new(),
        }
    }

    pub fn in_volume(mut self, volume: impl Into<String>) -> Self {
        self.volume = volume.into();
        self
    }

    /// Check whether this track came from the primary generator
    pub fn is_primary(&self) -> bool {
        self.parent_id == 0
    }
}

/// A single transport step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Owning track id
    pub track_id: u32,
    /// Volume at the start of the step
    pub pre_volume: String,
    /// Volume at the end of the step (empty when leaving the world)
    pub post_volume: String,
    /// Energy deposited along the step in MeV
    pub energy_deposit: f64,
    /// Step length in mm
    pub length: f64,
}

impl Step {
    /// Check whether the step crossed a volume boundary
    pub fn crosses_boundary(&self) -> bool {
        self.pre_volume != self.post_volume
    }
}
