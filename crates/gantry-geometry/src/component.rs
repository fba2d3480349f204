//! Geometry component contract

use crate::error::Result;
use crate::volume::{LogicalVolumeId, PhysicalVolumeId, VolumeStore};
use gantry_core::{Event, OutputCollector, OutputRecord, ParameterSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a component is placed into
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mother {
    /// The component is the world; it has no mother
    Root,
    /// Placed inside the logical volumes of the named category
    Category(String),
}

impl Mother {
    pub fn category(name: impl Into<String>) -> Self {
        Mother::Category(name.into())
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Mother::Root)
    }

    /// Mother category, `None` for the root
    pub fn as_category(&self) -> Option<&str> {
        match self {
            Mother::Root => None,
            Mother::Category(name) => Some(name),
        }
    }
}

impl fmt::Display for Mother {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mother::Root => write!(f, "(root)"),
            Mother::Category(name) => write!(f, "{}", name),
        }
    }
}

/// Identity and configuration of a registered component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub name: String,
    /// Unique key other components refer to as their mother
    pub category: String,
    pub mother: Mother,
    #[serde(default)]
    pub parameters: ParameterSet,
}

impl ComponentDescriptor {
    pub fn new(name: impl Into<String>, category: impl Into<String>, mother: Mother) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            mother,
            parameters: ParameterSet::new(),
        }
    }

    /// Descriptor for the world component
    pub fn root(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self::new(name, category, Mother::Root)
    }

    /// Descriptor for a component nested inside `mother`
    pub fn daughter(
        name: impl Into<String>,
        category: impl Into<String>,
        mother: impl Into<String>,
    ) -> Self {
        Self::new(name, category, Mother::category(mother))
    }

    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A unit of spatial construction
///
/// `build` must not depend on any other component. `place` receives the
/// mother's logical volumes (empty for the root) and positions this
/// component's volumes inside them.
pub trait Component {
    /// Create this component's logical volumes
    fn build(
        &mut self,
        parameters: &ParameterSet,
        store: &mut VolumeStore,
    ) -> Result<Vec<LogicalVolumeId>>;

    /// Place this component's logical volumes inside `mothers`
    fn place(
        &mut self,
        mothers: &[LogicalVolumeId],
        store: &mut VolumeStore,
    ) -> Result<Vec<PhysicalVolumeId>>;

    /// Reserve output slots for converted hits
    fn declare_outputs(&mut self, _category: &str, _collector: &mut OutputCollector) -> Result<()> {
        Ok(())
    }

    /// Turn the engine's hits for this event into output products
    fn convert_hits(&mut self, _event: &Event, _record: &mut OutputRecord) -> Result<()> {
        Ok(())
    }
}
