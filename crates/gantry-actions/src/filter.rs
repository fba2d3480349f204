//! Stacking filter that drops unwanted particles

use gantry_core::{
    Capability, CapabilitySet, ParameterSet, Plugin, Result, RunAction, RunInfo, StackingAction,
    Track,
};
use std::collections::BTreeSet;

/// Kills new tracks by particle name, and secondaries below an energy cut
///
/// Primaries are never cut on energy. The number of killed tracks is
/// reported at the end of each run.
#[derive(Debug)]
pub struct ParticleFilter {
    name: String,
    kill: BTreeSet<String>,
    min_energy: f64,
    killed: u64,
}

impl ParticleFilter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kill: BTreeSet::new(),
            min_energy: 0.0,
            killed: 0,
        }
    }

    /// Configure from `name` (default `"particle_filter"`), `kill` and
    /// `min_energy`
    pub fn from_parameters(parameters: &ParameterSet) -> Self {
        let kill: Vec<String> = parameters.get_or("kill", Vec::new());
        Self {
            kill: kill.into_iter().collect(),
            min_energy: parameters.get_or("min_energy", 0.0),
            ..Self::new(parameters.get_or("name", "particle_filter".to_string()))
        }
    }

    pub fn kill_particle(mut self, particle: impl Into<String>) -> Self {
        self.kill.insert(particle.into());
        self
    }

    /// Tracks killed since the start of the current run
    pub fn killed(&self) -> u64 {
        self.killed
    }
}

impl Plugin for ParticleFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::only(Capability::StackFilter).with(Capability::RunLifecycle)
    }
}

impl RunAction for ParticleFilter {
    fn begin_of_run(&mut self, _run: &RunInfo) -> Result<()> {
        self.killed = 0;
        Ok(())
    }

    fn end_of_run(&mut self, run: &RunInfo) -> Result<()> {
        tracing::info!(
            plugin = %self.name,
            run = run.number,
            killed = self.killed,
            "particle filter summary"
        );
        Ok(())
    }
}

impl StackingAction for ParticleFilter {
    fn kill_new_track(&mut self, track: &Track) -> Result<bool> {
        let kill = self.kill.contains(&track.particle)
            || (!track.is_primary() && track.kinetic_energy < self.min_energy);
        if kill {
            self.killed += 1;
            tracing::trace!(track = track.id, particle = %track.particle, "killing track");
        }
        Ok(kill)
    }
}
