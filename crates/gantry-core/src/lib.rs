//! Gantry Core - plugin runtime for simulation jobs
//!
//! This crate provides the pieces every other gantry crate builds on:
//! - Dynamic configuration values (`Value`, `ValueMap`, `ParameterSet`)
//! - Lifecycle capability tags and one plugin trait per capability
//! - Run, event, track and step records passed to hooks
//! - Output slots declared at setup and filled per event or run
//! - The job's single physics-list slot
//! - The capability registry and lifecycle dispatcher
//!
//! ## Plugin Model
//!
//! ```text
//! host ──creates──> Shared<MyPlugin>
//!                      │
//!                      ├── register_run(&plugin)    ──┐
//!                      └── register_event(&plugin)  ──┤
//!                                                     ▼
//!                                              ActionRegistry
//!                                   (one name-sorted table per capability
//!                                    + flat by-name index, sealed after
//!                                    initialize_all)
//! ```
//!
//! A plugin declares its capabilities up front. The registry refuses
//! registrations under undeclared capabilities and refuses to initialize
//! while a declared capability is still unregistered.

mod capability;
mod error;
mod output;
mod params;
mod physics;
mod plugin;
mod records;
mod registry;
mod value;

pub use capability::{Capability, CapabilitySet};
pub use error::{Error, Result};
pub use output::{OutputCollector, OutputKey, OutputRecord, Scope};
pub use params::{FromValue, ParameterSet};
pub use physics::{PhysicsList, PhysicsListHolder};
pub use plugin::{
    shared, EventAction, Plugin, PrimaryGeneratorAction, RunAction, Shared, StackingAction,
    SteppingAction, TrackingAction,
};
pub use records::{Event, PrimaryParticle, RunInfo, Step, Track, Vec3};
pub use registry::ActionRegistry;
pub use value::{Value, ValueMap};
