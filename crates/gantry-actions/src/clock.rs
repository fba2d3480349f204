//! Run timing plugin

use gantry_core::{
    Capability, CapabilitySet, OutputCollector, OutputRecord, ParameterSet, Plugin, Result,
    RunAction, RunInfo, Scope,
};
use std::time::{Duration, Instant};

/// Measures the wall time of each run and reports it in the run record
#[derive(Debug)]
pub struct ClockAction {
    name: String,
    start: Option<Instant>,
    elapsed: Option<Duration>,
}

impl ClockAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: None,
            elapsed: None,
        }
    }

    /// Configure from `name` (default `"clock"`)
    pub fn from_parameters(parameters: &ParameterSet) -> Self {
        Self::new(parameters.get_or("name", "clock".to_string()))
    }

    /// Duration of the last completed run
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }
}

impl Plugin for ClockAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::only(Capability::RunLifecycle)
    }

    fn declare_outputs(&mut self, collector: &mut OutputCollector) -> Result<()> {
        collector.declare(self.name.clone(), "elapsed", Scope::Run)
    }

    fn fill_run_outputs(&mut self, record: &mut OutputRecord) -> Result<()> {
        if let Some(elapsed) = self.elapsed {
            record.put(self.name.clone(), "elapsed", elapsed.as_secs_f64())?;
        }
        Ok(())
    }
}

impl RunAction for ClockAction {
    fn begin_of_run(&mut self, _run: &RunInfo) -> Result<()> {
        self.start = Some(Instant::now());
        self.elapsed = None;
        Ok(())
    }

    fn end_of_run(&mut self, run: &RunInfo) -> Result<()> {
        let elapsed = self.start.take().map(|s| s.elapsed()).unwrap_or_default();
        tracing::info!(
            plugin = %self.name,
            run = run.number,
            "Elapsed time this run: {:.6} seconds",
            elapsed.as_secs_f64()
        );
        self.elapsed = Some(elapsed);
        Ok(())
    }
}
