//! Schema of a job configuration

use gantry_core::{FromValue, ParameterSet};
use gantry_driver::DriverConfig;
use gantry_geometry::ComponentDescriptor;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Parameters for one plugin, keyed by plugin name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub name: String,
    #[serde(default)]
    pub parameters: ParameterSet,
}

/// One RON document as written on disk; every section is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct JobFile {
    pub globals: ParameterSet,
    pub run_settings: IndexMap<String, ParameterSet>,
    /// `None` when the document has no `driver` section
    #[serde(deserialize_with = "present")]
    pub driver: Option<DriverConfig>,
    pub plugins: Vec<PluginConfig>,
    pub geometry: Vec<ComponentDescriptor>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DriverConfig>, D::Error> {
    DriverConfig::deserialize(deserializer).map(Some)
}

/// Complete, merged job configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobConfig {
    pub(crate) globals: ParameterSet,
    pub(crate) run_settings: IndexMap<String, ParameterSet>,
    pub(crate) driver: DriverConfig,
    pub(crate) plugins: IndexMap<String, PluginConfig>,
    pub(crate) geometry: IndexMap<String, ComponentDescriptor>,
}

impl JobConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters shared by the whole job
    pub fn globals(&self) -> &ParameterSet {
        &self.globals
    }

    /// Typed global parameter with a fallback
    pub fn global_or<T: FromValue>(&self, key: &str, default: T) -> T {
        self.globals.get_or(key, default)
    }

    /// Named run settings; empty when the name is not configured
    pub fn run_settings(&self, name: &str) -> ParameterSet {
        self.run_settings.get(name).cloned().unwrap_or_default()
    }

    pub fn driver(&self) -> &DriverConfig {
        &self.driver
    }

    pub fn plugin(&self, name: &str) -> Option<&PluginConfig> {
        self.plugins.get(name)
    }

    /// Parameters for a plugin; empty when it has none configured
    pub fn plugin_parameters(&self, name: &str) -> ParameterSet {
        self.plugin(name)
            .map(|p| p.parameters.clone())
            .unwrap_or_default()
    }

    /// Configured plugins in file order
    pub fn plugins(&self) -> impl Iterator<Item = &PluginConfig> {
        self.plugins.values()
    }

    pub fn component(&self, category: &str) -> Option<&ComponentDescriptor> {
        self.geometry.get(category)
    }

    /// Geometry descriptors in file order
    pub fn components(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.geometry.values()
    }
}
