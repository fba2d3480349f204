//! Arena of logical and physical volumes
//!
//! Components never hold volumes directly. They create them in the job's
//! [`VolumeStore`] and keep the returned ids, which stay valid for the whole
//! job and double as unique physical-volume uids.

use crate::error::{Error, Result};
use gantry_core::{Value, ValueMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a logical volume (shape plus material, not yet positioned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogicalVolumeId(pub u32);

impl LogicalVolumeId {
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for LogicalVolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lv:{}", self.0)
    }
}

/// Handle to a placed physical volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhysicalVolumeId(pub u32);

impl PhysicalVolumeId {
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PhysicalVolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pv:{}", self.0)
    }
}

/// A volume definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalVolume {
    pub id: LogicalVolumeId,
    pub name: String,
    pub material: String,
    /// Engine-facing shape and visualization attributes
    pub attributes: ValueMap,
}

impl LogicalVolume {
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// A positioned instance of a logical volume inside a mother
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalVolume {
    pub id: PhysicalVolumeId,
    pub name: String,
    /// The logical volume this instantiates
    pub logical: LogicalVolumeId,
    /// Logical volume it sits in; `None` only for the world
    pub mother: Option<LogicalVolumeId>,
    pub copy_number: u32,
}

impl PhysicalVolume {
    pub fn is_world(&self) -> bool {
        self.mother.is_none()
    }
}

/// Job-scoped storage for all volumes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeStore {
    logical: Vec<LogicalVolume>,
    physical: Vec<PhysicalVolume>,
}

impl VolumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new logical volume
    pub fn create_logical(
        &mut self,
        name: impl Into<String>,
        material: impl Into<String>,
    ) -> LogicalVolumeId {
        let id = LogicalVolumeId(self.logical.len() as u32);
        self.logical.push(LogicalVolume {
            id,
            name: name.into(),
            material: material.into(),
            attributes: ValueMap::new(),
        });
        id
    }

    /// Attach an attribute to a logical volume
    pub fn set_attribute(
        &mut self,
        id: LogicalVolumeId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let volume = self
            .logical
            .get_mut(id.0 as usize)
            .ok_or_else(|| Error::not_found("logical volume", id.to_string()))?;
        volume.attributes.insert(key.into(), value.into());
        Ok(())
    }

    /// Place `logical` inside `mother`, or as the world when `mother` is `None`
    pub fn place(
        &mut self,
        name: impl Into<String>,
        logical: LogicalVolumeId,
        mother: Option<LogicalVolumeId>,
        copy_number: u32,
    ) -> Result<PhysicalVolumeId> {
        let name = name.into();
        if self.logical(logical).is_none() {
            return Err(Error::not_found("logical volume", logical.to_string()));
        }
        if let Some(mother) = mother {
            if self.logical(mother).is_none() {
                return Err(Error::not_found("mother logical volume", mother.to_string()));
            }
            if mother == logical {
                return Err(Error::component(
                    name,
                    format!("{} cannot be placed inside itself", logical),
                ));
            }
        }

        let id = PhysicalVolumeId(self.physical.len() as u32);
        self.physical.push(PhysicalVolume {
            id,
            name,
            logical,
            mother,
            copy_number,
        });
        Ok(id)
    }

    pub fn logical(&self, id: LogicalVolumeId) -> Option<&LogicalVolume> {
        self.logical.get(id.0 as usize)
    }

    pub fn physical(&self, id: PhysicalVolumeId) -> Option<&PhysicalVolume> {
        self.physical.get(id.0 as usize)
    }

    /// First physical volume with the given name
    pub fn find_physical(&self, name: &str) -> Option<&PhysicalVolume> {
        self.physical.iter().find(|pv| pv.name == name)
    }

    /// Physical volumes placed directly inside `mother`
    pub fn daughters(&self, mother: LogicalVolumeId) -> impl Iterator<Item = &PhysicalVolume> {
        self.physical
            .iter()
            .filter(move |pv| pv.mother == Some(mother))
    }

    pub fn logical_volumes(&self) -> impl Iterator<Item = &LogicalVolume> {
        self.logical.iter()
    }

    pub fn physical_volumes(&self) -> impl Iterator<Item = &PhysicalVolume> {
        self.physical.iter()
    }

    pub fn logical_count(&self) -> usize {
        self.logical.len()
    }

    pub fn physical_count(&self) -> usize {
        self.physical.len()
    }
}
