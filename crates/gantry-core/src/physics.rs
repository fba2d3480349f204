//! Physics list slot
//!
//! A job carries exactly one physics list. The host registers it during setup
//! and the job hands it to the engine once, at initialization.

use crate::error::{Error, Result};

/// Particle and process definitions handed to the simulation engine
///
/// Concrete lists override the constructors they need. Calling a constructor
/// that was not overridden is an error rather than a silent no-op.
pub trait PhysicsList {
    /// Name used in logs
    fn name(&self) -> &str;

    fn construct_particles(&mut self) -> Result<()> {
        Err(Error::UnimplementedOverride {
            type_name: std::any::type_name::<Self>(),
            method: "construct_particles",
        })
    }

    fn construct_processes(&mut self) -> Result<()> {
        Err(Error::UnimplementedOverride {
            type_name: std::any::type_name::<Self>(),
            method: "construct_processes",
        })
    }

    /// Production cuts; most lists keep the engine defaults
    fn set_cuts(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Holds the job's single physics list until the engine takes it
#[derive(Default)]
pub struct PhysicsListHolder {
    list: Option<Box<dyn PhysicsList>>,
    taken: bool,
}

impl PhysicsListHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the physics list; a second registration is an error
    pub fn register(&mut self, list: Box<dyn PhysicsList>) -> Result<()> {
        if self.list.is_some() || self.taken {
            return Err(Error::PhysicsListAlreadyRegistered);
        }
        tracing::info!(physics_list = list.name(), "registered physics list");
        self.list = Some(list);
        Ok(())
    }

    /// Hand the physics list over, leaving the holder empty
    pub fn take(&mut self) -> Result<Box<dyn PhysicsList>> {
        let list = self.list.take().ok_or(Error::NoPhysicsList)?;
        self.taken = true;
        Ok(list)
    }

    pub fn is_registered(&self) -> bool {
        self.list.is_some()
    }

    /// Name of the held list, if any
    pub fn name(&self) -> Option<&str> {
        self.list.as_ref().map(|l| l.name())
    }
}

impl std::fmt::Debug for PhysicsListHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsListHolder")
            .field("list", &self.name())
            .field("taken", &self.taken)
            .finish()
    }
}
