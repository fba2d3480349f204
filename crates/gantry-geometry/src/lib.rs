//! Gantry Geometry - spatial hierarchy builder
//!
//! Geometry is assembled from components. Each component has a unique
//! category and names the category it sits inside (its mother); exactly one
//! component is the root and produces the world volume.
//!
//! ## Job Phases
//!
//! ```text
//! register_component(..)*        any order
//!        │
//! build_all_logical_volumes()    every component, no dependencies
//!        │
//! place_all_physical_volumes()   topological order over mother edges
//!        │
//! world_volume()                 handed to the engine once
//! ```

mod builder;
mod component;
mod error;
mod volume;

pub use builder::GeometryBuilder;
pub use component::{Component, ComponentDescriptor, Mother};
pub use error::{Error, Result};
pub use volume::{LogicalVolume, LogicalVolumeId, PhysicalVolume, PhysicalVolumeId, VolumeStore};
