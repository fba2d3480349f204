//! Job - owns everything a simulation job needs and sequences its phases
//!
//! The job replaces any global service lookup: the registry, geometry,
//! physics list and driver live here and are passed by reference to whoever
//! needs them.
//!
//! ## Job Phases
//!
//! ```text
//! new ─> (register plugins, components, physics list)
//!     ─> begin_job(collector)     declare outputs, build logical volumes
//!     ─> initialize()             physics to engine, seal plugins,
//!                                 place volumes, world to engine
//!     ─> (begin_run ─> process_event* ─> end_run)*
//! ```

use crate::clock::ProcessClock;
use crate::config::DriverConfig;
use crate::driver::{RunDriver, RunSummary};
use crate::engine::SimulationEngine;
use crate::error::{Error, Result};
use gantry_core::{ActionRegistry, OutputCollector, OutputRecord, PhysicsListHolder};
use gantry_geometry::GeometryBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobPhase {
    Setup,
    Begun,
    Initialized,
}

/// A simulation job around one engine
pub struct Job<E: SimulationEngine> {
    registry: ActionRegistry,
    geometry: GeometryBuilder,
    physics: PhysicsListHolder,
    driver: RunDriver<E>,
    phase: JobPhase,
}

impl<E: SimulationEngine> Job<E> {
    pub fn new(engine: E) -> Self {
        Self::with_driver(RunDriver::new(engine))
    }

    pub fn with_config(engine: E, config: DriverConfig) -> Self {
        Self::with_driver(RunDriver::with_config(engine, config))
    }

    pub fn with_clock(engine: E, config: DriverConfig, clock: Box<dyn ProcessClock>) -> Self {
        Self::with_driver(RunDriver::with_clock(engine, config, clock))
    }

    fn with_driver(driver: RunDriver<E>) -> Self {
        Self {
            registry: ActionRegistry::new(),
            geometry: GeometryBuilder::new(),
            physics: PhysicsListHolder::new(),
            driver,
            phase: JobPhase::Setup,
        }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Registry for plugin registration during setup
    pub fn registry_mut(&mut self) -> &mut ActionRegistry {
        &mut self.registry
    }

    pub fn geometry(&self) -> &GeometryBuilder {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut GeometryBuilder {
        &mut self.geometry
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsListHolder {
        &mut self.physics
    }

    pub fn driver(&self) -> &RunDriver<E> {
        &self.driver
    }

    pub fn engine(&self) -> &E {
        self.driver.engine()
    }

    pub fn engine_mut(&mut self) -> &mut E {
        self.driver.engine_mut()
    }

    pub fn is_initialized(&self) -> bool {
        self.phase == JobPhase::Initialized
    }

    // ========================================================================
    // Job setup
    // ========================================================================

    /// Declare every output and build the logical volumes
    pub fn begin_job(&mut self, collector: &mut OutputCollector) -> Result<()> {
        if self.phase != JobPhase::Setup {
            return Err(Error::Setup("begin_job was already called".to_string()));
        }
        self.registry.declare_outputs(collector)?;
        self.geometry.declare_outputs(collector)?;
        self.geometry.build_all_logical_volumes()?;
        tracing::info!(
            plugins = self.registry.len(),
            components = self.geometry.len(),
            outputs = collector.len(),
            "job begun"
        );
        self.phase = JobPhase::Begun;
        Ok(())
    }

    /// Hand physics and geometry to the engine and initialize plugins
    pub fn initialize(&mut self) -> Result<()> {
        match self.phase {
            JobPhase::Setup => {
                return Err(Error::Setup(
                    "begin_job must be called before initialize".to_string(),
                ))
            }
            JobPhase::Initialized => {
                return Err(Error::Setup("job was already initialized".to_string()))
            }
            JobPhase::Begun => {}
        }

        let physics = self.physics.take()?;
        self.driver.engine_mut().initialize_physics(physics)?;
        self.registry.initialize_all()?;

        let world = self.geometry.place_all_physical_volumes()?;
        self.driver
            .engine_mut()
            .construct_geometry(world, self.geometry.volumes())?;

        tracing::info!(%world, "job initialized");
        self.phase = JobPhase::Initialized;
        Ok(())
    }

    fn require_initialized(&self, operation: &str) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::Setup(format!(
                "cannot {} before the job is initialized",
                operation
            )))
        }
    }

    // ========================================================================
    // Run phases
    // ========================================================================

    /// Start a run, scheduling the configured macro if any
    pub fn begin_run(&mut self, run_number: u32) -> Result<()> {
        self.require_initialized("begin a run")?;
        let trigger = self.driver.config().macro_trigger();
        self.driver.begin_run(run_number, trigger, &self.registry)
    }

    pub fn do_one_event(&mut self, event_number: u64) -> Result<()> {
        self.driver.do_one_event(event_number, &self.registry)
    }

    pub fn end_event(&mut self, record: &mut OutputRecord) -> Result<()> {
        self.driver.end_event(&self.registry, &self.geometry, record)
    }

    /// Process one event start to finish
    pub fn process_event(&mut self, event_number: u64, record: &mut OutputRecord) -> Result<()> {
        self.do_one_event(event_number)?;
        self.end_event(record)
    }

    pub fn end_run(&mut self, record: &mut OutputRecord) -> Result<RunSummary> {
        self.driver.end_run(&self.registry, record)
    }
}

impl<E: SimulationEngine> std::fmt::Debug for Job<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("phase", &self.phase)
            .field("registry", &self.registry)
            .field("geometry", &self.geometry)
            .field("driver", &self.driver)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{register_recorder, Call, Log, MockEngine};
    use gantry_core::{shared, ParameterSet, PhysicsList, Scope};
    use gantry_geometry::{
        Component, ComponentDescriptor, LogicalVolumeId, PhysicalVolumeId, VolumeStore,
    };
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Standard;

    impl PhysicsList for Standard {
        fn name(&self) -> &str {
            "standard"
        }

        fn construct_particles(&mut self) -> gantry_core::Result<()> {
            Ok(())
        }

        fn construct_processes(&mut self) -> gantry_core::Result<()> {
            Ok(())
        }
    }

    struct Hall {
        lv: Option<LogicalVolumeId>,
    }

    impl Component for Hall {
        fn build(
            &mut self,
            _parameters: &ParameterSet,
            store: &mut VolumeStore,
        ) -> gantry_geometry::Result<Vec<LogicalVolumeId>> {
            let lv = store.create_logical("hall", "G4_AIR");
            self.lv = Some(lv);
            Ok(vec![lv])
        }

        fn place(
            &mut self,
            _mothers: &[LogicalVolumeId],
            store: &mut VolumeStore,
        ) -> gantry_geometry::Result<Vec<PhysicalVolumeId>> {
            let lv = self
                .lv
                .ok_or_else(|| gantry_geometry::Error::component("hall", "not built"))?;
            Ok(vec![store.place("hall", lv, None, 0)?])
        }

        fn declare_outputs(
            &mut self,
            category: &str,
            collector: &mut OutputCollector,
        ) -> gantry_geometry::Result<()> {
            collector.declare(category, "hits", Scope::Event)?;
            Ok(())
        }

        fn convert_hits(
            &mut self,
            event: &gantry_core::Event,
            record: &mut OutputRecord,
        ) -> gantry_geometry::Result<()> {
            let transported = event
                .attribute("transported")
                .and_then(|v| v.as_int())
                .unwrap_or(0);
            record.put("hall", "hits", transported)?;
            Ok(())
        }
    }

    fn job() -> (Job<MockEngine>, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut job = Job::new(MockEngine::default());
        register_recorder(job.registry_mut(), &log).unwrap();
        job.geometry_mut()
            .register_component(
                ComponentDescriptor::root("Hall", "hall"),
                &shared(Hall { lv: None }),
            )
            .unwrap();
        job.physics_mut().register(Box::new(Standard)).unwrap();
        (job, log)
    }

    #[test]
    fn test_job_lifecycle() {
        let (mut job, log) = job();
        let mut collector = OutputCollector::new();
        job.begin_job(&mut collector).unwrap();
        assert!(collector.is_declared("hall", "hits", Scope::Event));
        job.initialize().unwrap();

        job.begin_run(1).unwrap();
        let mut event_record = collector.event_record();
        job.process_event(1, &mut event_record).unwrap();
        assert_eq!(event_record.get("hall", "hits").and_then(|v| v.as_int()), Some(1));

        let mut run_record = collector.run_record();
        let summary = job.end_run(&mut run_record).unwrap();
        assert_eq!(summary.processed, 1);

        let world = job.geometry().world_volume().unwrap();
        assert_eq!(
            &job.engine().calls[..2],
            &[
                Call::Physics("standard".to_string()),
                Call::Geometry(world, 1)
            ]
        );
        assert!(log
            .borrow()
            .iter()
            .any(|l| l == "recorder:stepping"));
    }

    #[test]
    fn test_setup_order_enforced() {
        let (mut job, _log) = job();
        assert!(matches!(job.initialize(), Err(Error::Setup(_))));
        assert!(matches!(job.begin_run(1), Err(Error::Setup(_))));

        let mut collector = OutputCollector::new();
        job.begin_job(&mut collector).unwrap();
        assert!(matches!(job.begin_job(&mut collector), Err(Error::Setup(_))));
        job.initialize().unwrap();
        assert!(matches!(job.initialize(), Err(Error::Setup(_))));
    }

    #[test]
    fn test_missing_physics_list() {
        let mut job = Job::new(MockEngine::default());
        let mut collector = OutputCollector::new();
        job.begin_job(&mut collector).unwrap();
        assert!(matches!(
            job.initialize(),
            Err(Error::Core(gantry_core::Error::NoPhysicsList))
        ));
    }

    #[test]
    fn test_configured_macro() {
        let mut config = DriverConfig::default();
        config.set_macro("vis.mac", 1);
        let (base, _log) = job();
        let mut job = Job {
            driver: RunDriver::with_config(MockEngine::default(), config),
            ..base
        };

        let mut collector = OutputCollector::new();
        job.begin_job(&mut collector).unwrap();
        job.initialize().unwrap();
        job.begin_run(5).unwrap();
        let mut record = collector.event_record();
        job.process_event(1, &mut record).unwrap();
        job.process_event(2, &mut record).unwrap();

        let macros = job
            .engine()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Macro(_)))
            .count();
        assert_eq!(macros, 1);
    }
}
