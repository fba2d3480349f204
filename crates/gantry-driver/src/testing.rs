//! Test doubles shared by the driver and job tests

use crate::clock::{CpuTimes, ProcessClock};
use crate::engine::SimulationEngine;
use crate::error::{Error, Result};
use gantry_core::{
    shared, ActionRegistry, Capability, CapabilitySet, Event, EventAction, PhysicsList, Plugin,
    PrimaryGeneratorAction, PrimaryParticle, RunAction, RunInfo, StackingAction, Step,
    SteppingAction, Track, TrackingAction,
};
use gantry_geometry::{PhysicalVolumeId, VolumeStore};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Physics(String),
    Geometry(PhysicalVolumeId, usize),
    BeginRun(u32),
    Generate(u64),
    Process(u64),
    Score(u64),
    Macro(String),
    EndRun(u32),
}

/// Engine that records every call and transports one track per primary
#[derive(Default)]
pub struct MockEngine {
    pub calls: Vec<Call>,
    pub fail_on_event: Option<u64>,
    /// CPU work done inside each `process_event`
    pub busy: Option<Duration>,
}

impl SimulationEngine for MockEngine {
    fn initialize_physics(&mut self, mut physics: Box<dyn PhysicsList>) -> Result<()> {
        physics.construct_particles()?;
        physics.construct_processes()?;
        self.calls.push(Call::Physics(physics.name().to_string()));
        Ok(())
    }

    fn construct_geometry(&mut self, world: PhysicalVolumeId, volumes: &VolumeStore) -> Result<()> {
        self.calls
            .push(Call::Geometry(world, volumes.physical_count()));
        Ok(())
    }

    fn begin_run(&mut self, run: &RunInfo) -> Result<()> {
        self.calls.push(Call::BeginRun(run.number));
        Ok(())
    }

    fn generate_event(&mut self, number: u64, registry: &ActionRegistry) -> Result<Event> {
        if self.fail_on_event == Some(number) {
            return Err(Error::engine(format!("event {} could not be generated", number)));
        }
        self.calls.push(Call::Generate(number));
        let mut event = Event::new(number);
        registry.generate_primaries(&mut event)?;
        Ok(event)
    }

    fn process_event(&mut self, event: &mut Event, registry: &ActionRegistry) -> Result<()> {
        self.calls.push(Call::Process(event.number));
        if let Some(busy) = self.busy {
            burn_cpu(busy);
        }
        let mut transported = 0i64;
        for (i, primary) in event.primaries.iter().enumerate() {
            let track = Track::new(i as u32 + 1, 0, primary.particle.clone(), primary.kinetic_energy)
                .in_volume("world");
            if registry.kill_new_track(&track)? {
                continue;
            }
            registry.pre_tracking(&track)?;
            registry.stepping(&Step {
                track_id: track.id,
                pre_volume: "world".to_string(),
                post_volume: String::new(),
                energy_deposit: 0.0,
                length: 1000.0,
            })?;
            registry.post_tracking(&track)?;
            transported += 1;
        }
        event.set_attribute("transported", transported);
        Ok(())
    }

    fn post_event_scoring(&mut self, event: &Event) -> Result<()> {
        self.calls.push(Call::Score(event.number));
        Ok(())
    }

    fn execute_macro(&mut self, path: &str) -> Result<()> {
        self.calls.push(Call::Macro(path.to_string()));
        Ok(())
    }

    fn end_run(&mut self, run: &RunInfo) -> Result<()> {
        self.calls.push(Call::EndRun(run.number));
        Ok(())
    }
}

/// Spin on arithmetic for at least `wall` of real time
pub fn burn_cpu(wall: Duration) -> u64 {
    let start = Instant::now();
    let mut acc = 0u64;
    while start.elapsed() < wall {
        for i in 0..10_000u64 {
            acc = std::hint::black_box(acc.wrapping_mul(31).wrapping_add(i));
        }
    }
    acc.max(1)
}

/// Clock advancing by a fixed step on every reading
pub struct StepClock {
    step: Duration,
    ticks: Cell<u32>,
}

impl StepClock {
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            ticks: Cell::new(0),
        }
    }
}

impl ProcessClock for StepClock {
    fn now(&self) -> CpuTimes {
        self.ticks.set(self.ticks.get() + 1);
        let t = self.step * self.ticks.get();
        CpuTimes {
            real: t,
            user: t / 2,
            system: Duration::ZERO,
        }
    }
}

pub type Log = Rc<RefCell<Vec<String>>>;

/// Plugin implementing every capability, logging each hook
pub struct Recorder {
    log: Log,
}

impl Recorder {
    pub fn new(log: &Log) -> Self {
        Self { log: log.clone() }
    }

    fn note(&self, hook: &str) {
        self.log.borrow_mut().push(format!("recorder:{}", hook));
    }
}

impl Plugin for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn capabilities(&self) -> CapabilitySet {
        Capability::ALL.into_iter().collect()
    }
}

impl RunAction for Recorder {
    fn begin_of_run(&mut self, _run: &RunInfo) -> gantry_core::Result<()> {
        self.note("begin_run");
        Ok(())
    }

    fn end_of_run(&mut self, _run: &RunInfo) -> gantry_core::Result<()> {
        self.note("end_run");
        Ok(())
    }
}

impl EventAction for Recorder {
    fn begin_of_event(&mut self, _event: &Event) -> gantry_core::Result<()> {
        self.note("begin_event");
        Ok(())
    }

    fn end_of_event(&mut self, _event: &Event) -> gantry_core::Result<()> {
        self.note("end_event");
        Ok(())
    }
}

impl TrackingAction for Recorder {
    fn pre_tracking(&mut self, _track: &Track) -> gantry_core::Result<()> {
        self.note("pre_tracking");
        Ok(())
    }

    fn post_tracking(&mut self, _track: &Track) -> gantry_core::Result<()> {
        self.note("post_tracking");
        Ok(())
    }
}

impl SteppingAction for Recorder {
    fn stepping(&mut self, _step: &Step) -> gantry_core::Result<()> {
        self.note("stepping");
        Ok(())
    }
}

impl StackingAction for Recorder {
    fn kill_new_track(&mut self, _track: &Track) -> gantry_core::Result<bool> {
        Ok(false)
    }
}

impl PrimaryGeneratorAction for Recorder {
    fn generate_primaries(&mut self, event: &mut Event) -> gantry_core::Result<()> {
        self.note("primaries");
        event.add_primary(PrimaryParticle::new("mu+", 3094.0));
        Ok(())
    }
}

/// Register a [`Recorder`] under every capability
pub fn register_recorder(registry: &mut ActionRegistry, log: &Log) -> gantry_core::Result<()> {
    let recorder = shared(Recorder::new(log));
    registry.register_run(&recorder)?;
    registry.register_event(&recorder)?;
    registry.register_tracking(&recorder)?;
    registry.register_stepping(&recorder)?;
    registry.register_stacking(&recorder)?;
    registry.register_primary_generator(&recorder)?;
    Ok(())
}

/// Initialized registry holding one [`Recorder`]
pub fn sealed_registry() -> (ActionRegistry, Log) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let mut registry = ActionRegistry::new();
    register_recorder(&mut registry, &log).unwrap();
    registry.initialize_all().unwrap();
    (registry, log)
}
