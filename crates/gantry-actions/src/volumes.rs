//! Physical volume uid to name table

use gantry_core::{
    Capability, CapabilitySet, OutputCollector, OutputRecord, ParameterSet, Plugin, Result,
    RunAction, RunInfo, Scope, Value, ValueMap,
};
use gantry_geometry::{PhysicalVolume, VolumeStore};
use std::collections::BTreeMap;

/// Keeps a name for every physical volume uid seen, and writes the table
/// into each run record
#[derive(Debug)]
pub struct VolumeNameStore {
    name: String,
    names: BTreeMap<u32, String>,
}

impl VolumeNameStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            names: BTreeMap::new(),
        }
    }

    /// Configure from `name` (default `"volume_store"`)
    pub fn from_parameters(parameters: &ParameterSet) -> Self {
        Self::new(parameters.get_or("name", "volume_store".to_string()))
    }

    /// Remember a volume and return its uid
    pub fn uid_for(&mut self, volume: &PhysicalVolume) -> u32 {
        let uid = volume.id.raw();
        self.names
            .entry(uid)
            .or_insert_with(|| volume.name.clone());
        uid
    }

    /// Remember every placed volume
    pub fn record_all(&mut self, store: &VolumeStore) {
        for volume in store.physical_volumes() {
            self.uid_for(volume);
        }
    }

    pub fn name_of(&self, uid: u32) -> Option<&str> {
        self.names.get(&uid).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Plugin for VolumeNameStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::only(Capability::RunLifecycle)
    }

    fn declare_outputs(&mut self, collector: &mut OutputCollector) -> Result<()> {
        collector.declare(self.name.clone(), "names", Scope::Run)
    }

    fn fill_run_outputs(&mut self, record: &mut OutputRecord) -> Result<()> {
        let table: ValueMap = self
            .names
            .iter()
            .map(|(uid, name)| (uid.to_string(), Value::from(name.as_str())))
            .collect();
        record.put(self.name.clone(), "names", table)
    }
}

impl RunAction for VolumeNameStore {
    fn begin_of_run(&mut self, _run: &RunInfo) -> Result<()> {
        Ok(())
    }

    fn end_of_run(&mut self, run: &RunInfo) -> Result<()> {
        tracing::debug!(plugin = %self.name, run = run.number, volumes = self.names.len(), "volume names");
        Ok(())
    }
}
