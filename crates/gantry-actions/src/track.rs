//! Track recording plugin

use gantry_core::{
    Capability, CapabilitySet, Event, EventAction, OutputCollector, OutputRecord, ParameterSet,
    Plugin, Result, Scope, Track, TrackingAction, Value, ValueMap,
};
use serde::{Deserialize, Serialize};

/// One recorded track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: u32,
    pub parent_id: u32,
    pub particle: String,
    pub kinetic_energy: f64,
    pub volume: String,
}

impl From<&Track> for TrackRecord {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id,
            parent_id: track.parent_id,
            particle: track.particle.clone(),
            kinetic_energy: track.kinetic_energy,
            volume: track.volume.clone(),
        }
    }
}

impl From<&TrackRecord> for Value {
    fn from(record: &TrackRecord) -> Self {
        let mut map = ValueMap::new();
        map.insert("id".to_string(), Value::from(record.id));
        map.insert("parent_id".to_string(), Value::from(record.parent_id));
        map.insert("particle".to_string(), Value::from(record.particle.as_str()));
        map.insert("kinetic_energy".to_string(), Value::from(record.kinetic_energy));
        map.insert("volume".to_string(), Value::from(record.volume.as_str()));
        Value::Map(map)
    }
}

/// Records every new track at pre-tracking and writes them per event
///
/// Tracks below `min_energy` or in a volume whose name contains one of
/// `skip_volumes` are ignored.
#[derive(Debug)]
pub struct TrackRecorder {
    name: String,
    min_energy: f64,
    skip_volumes: Vec<String>,
    tracks: Vec<TrackRecord>,
}

impl TrackRecorder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_energy: 0.0,
            skip_volumes: Vec::new(),
            tracks: Vec::new(),
        }
    }

    /// Configure from `name` (default `"track"`), `min_energy` and
    /// `skip_volumes`
    pub fn from_parameters(parameters: &ParameterSet) -> Self {
        Self {
            min_energy: parameters.get_or("min_energy", 0.0),
            skip_volumes: parameters.get_or("skip_volumes", Vec::new()),
            ..Self::new(parameters.get_or("name", "track".to_string()))
        }
    }

    /// Tracks recorded in the current event
    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    fn accepts(&self, track: &Track) -> bool {
        track.kinetic_energy >= self.min_energy
            && !self
                .skip_volumes
                .iter()
                .any(|pattern| track.volume.contains(pattern.as_str()))
    }
}

impl Plugin for TrackRecorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::only(Capability::TrackingLifecycle).with(Capability::EventLifecycle)
    }

    fn declare_outputs(&mut self, collector: &mut OutputCollector) -> Result<()> {
        collector.declare(self.name.clone(), "tracks", Scope::Event)
    }

    fn fill_event_outputs(&mut self, record: &mut OutputRecord) -> Result<()> {
        let tracks: Vec<Value> = self.tracks.iter().map(Value::from).collect();
        record.put(self.name.clone(), "tracks", Value::List(tracks))
    }
}

impl EventAction for TrackRecorder {
    fn begin_of_event(&mut self, _event: &Event) -> Result<()> {
        self.tracks.clear();
        Ok(())
    }

    fn end_of_event(&mut self, event: &Event) -> Result<()> {
        tracing::debug!(
            plugin = %self.name,
            event = event.number,
            tracks = self.tracks.len(),
            "tracks recorded"
        );
        Ok(())
    }
}

impl TrackingAction for TrackRecorder {
    fn pre_tracking(&mut self, track: &Track) -> Result<()> {
        if self.accepts(track) {
            self.tracks.push(TrackRecord::from(track));
        }
        Ok(())
    }

    fn post_tracking(&mut self, _track: &Track) -> Result<()> {
        Ok(())
    }
}
