//! Gantry Driver - phase-split run driver for simulation jobs
//!
//! This crate turns "run the simulation to completion" into phases a host
//! event loop can call one at a time.
//!
//! ## Architecture
//!
//! ```text
//! Job (owns registry, geometry, physics list)
//!  │
//!  └── RunDriver ← begin_run / do_one_event / end_event / end_run
//!       │
//!       └── SimulationEngine (trait) ← transport lives behind this
//! ```
//!
//! ## Key Components
//!
//! - [`Job`]: owns the job's collaborators and sequences setup
//! - [`RunDriver`]: the run state machine, counters and timing
//! - [`SimulationEngine`]: trait the external transport engine implements
//! - [`ProcessClock`]: source of real/user/system times

mod clock;
mod config;
mod driver;
mod engine;
mod error;
mod job;

#[cfg(test)]
mod testing;

pub use clock::{CpuTimes, ProcessClock, ResourceClock};
pub use config::{DriverConfig, MAX_VERBOSITY};
pub use driver::{MacroTrigger, RunDriver, RunState, RunSummary};
pub use engine::SimulationEngine;
pub use error::{Error, Result};
pub use job::Job;
