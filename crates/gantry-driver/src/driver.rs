//! Phase-split run driver
//!
//! A run is normally a single blocking call into the engine. The driver
//! splits it into four phases the hosting event loop calls one at a time,
//! so the host can do its own bookkeeping between events:
//!
//! ```text
//!            begin_run              do_one_event             end_event
//!   Idle ─────────────> RunActive ───────────────> EventActive ─────────> EventIdle
//!    ▲                      │                            ▲                    │
//!    │                      │ end_run                    └── do_one_event ────┤
//!    │                      ▼                                                 │
//!    └──────────────── RunComplete <──────────────── end_run ─────────────────┘
//! ```
//!
//! Calling a phase from the wrong state returns
//! [`Error::IllegalStateTransition`] and changes nothing.

use crate::clock::{CpuTimes, ProcessClock, ResourceClock};
use crate::config::DriverConfig;
use crate::engine::SimulationEngine;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use gantry_core::{ActionRegistry, Event, OutputRecord, RunInfo};
use gantry_geometry::GeometryBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the driver is in the run cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    /// No run in progress
    Idle,
    /// Run started, no event processed yet
    RunActive,
    /// An event was processed and awaits `end_event`
    EventActive,
    /// Between events
    EventIdle,
    /// Run teardown in progress; stays here if teardown failed
    RunComplete,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunState::Idle => "idle",
            RunState::RunActive => "in an active run",
            RunState::EventActive => "in an active event",
            RunState::EventIdle => "between events",
            RunState::RunComplete => "completing a run",
        };
        f.write_str(label)
    }
}

/// One-shot engine macro fired after a number of processed events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTrigger {
    pub path: String,
    /// Fires while processing event number `after_events` (1-based count)
    pub after_events: u64,
}

impl MacroTrigger {
    pub fn new(path: impl Into<String>, after_events: u64) -> Self {
        Self {
            path: path.into(),
            after_events,
        }
    }

    /// The engine command this trigger issues
    pub fn command(&self) -> String {
        format!("/control/execute {}", self.path)
    }
}

/// What a finished run reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run: RunInfo,
    pub processed: u64,
    pub elapsed: CpuTimes,
    pub macro_fired: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {}: {} events, {}",
            self.run.number, self.processed, self.elapsed
        )
    }
}

/// Drives one engine through runs, one phase at a time
pub struct RunDriver<E: SimulationEngine> {
    engine: E,
    clock: Box<dyn ProcessClock>,
    config: DriverConfig,
    state: RunState,
    run: Option<RunInfo>,
    current: Option<Event>,
    previous: Option<Event>,
    processed: u64,
    elapsed: CpuTimes,
    trigger: Option<MacroTrigger>,
    macro_fired: bool,
    started_at: Option<DateTime<Utc>>,
    last_summary: Option<RunSummary>,
}

impl<E: SimulationEngine> RunDriver<E> {
    /// Create a driver timing events with a [`ResourceClock`]
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, DriverConfig::default())
    }

    pub fn with_config(engine: E, config: DriverConfig) -> Self {
        Self::with_clock(engine, config, Box::new(ResourceClock::new()))
    }

    /// Create a driver with a host-supplied process clock
    pub fn with_clock(engine: E, config: DriverConfig, clock: Box<dyn ProcessClock>) -> Self {
        Self {
            engine,
            clock,
            config,
            state: RunState::Idle,
            run: None,
            current: None,
            previous: None,
            processed: 0,
            elapsed: CpuTimes::default(),
            trigger: None,
            macro_fired: false,
            started_at: None,
            last_summary: None,
        }
    }

    fn expect_state(&self, operation: &'static str, allowed: &[RunState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::IllegalStateTransition {
                operation,
                state: self.state,
            })
        }
    }

    fn active_run(&self, operation: &'static str) -> Result<RunInfo> {
        self.run.ok_or(Error::IllegalStateTransition {
            operation,
            state: self.state,
        })
    }

    // ========================================================================
    // Phases
    // ========================================================================

    /// Start run `run_number`
    pub fn begin_run(
        &mut self,
        run_number: u32,
        trigger: Option<MacroTrigger>,
        registry: &ActionRegistry,
    ) -> Result<()> {
        self.expect_state("begin a run", &[RunState::Idle])?;

        let run = RunInfo::new(run_number);
        self.run = Some(run);
        self.current = None;
        self.previous = None;
        self.processed = 0;
        self.elapsed = CpuTimes::default();
        self.trigger = trigger;
        self.macro_fired = false;
        self.started_at = Some(Utc::now());

        if let Some(trigger) = &self.trigger {
            tracing::info!(
                run = run.number,
                after_events = trigger.after_events,
                command = %trigger.command(),
                "macro scheduled"
            );
        }

        self.engine.begin_run(&run)?;
        registry.begin_of_run(&run)?;

        tracing::info!(run = run.number, "run started");
        self.state = RunState::RunActive;
        Ok(())
    }

    /// Generate, transport and score one event
    pub fn do_one_event(&mut self, event_number: u64, registry: &ActionRegistry) -> Result<()> {
        self.expect_state(
            "process an event",
            &[RunState::RunActive, RunState::EventIdle],
        )?;

        let start = self.clock.now();

        let mut event = self.engine.generate_event(event_number, registry)?;
        registry.begin_of_event(&event)?;
        self.engine.process_event(&mut event, registry)?;
        registry.end_of_event(&event)?;
        self.engine.post_event_scoring(&event)?;

        if let Some(trigger) = &self.trigger {
            if !self.macro_fired && self.processed + 1 == trigger.after_events {
                tracing::info!(
                    event = event_number,
                    command = %trigger.command(),
                    "executing deferred macro"
                );
                self.engine.execute_macro(&trigger.path)?;
                self.macro_fired = true;
            }
        }

        let delta = self.clock.now().since(&start);
        self.elapsed += delta;

        let processed = self.processed + 1;
        if self.config.verbosity() >= 2 {
            tracing::info!(event = event_number, timing = %delta, "event processed");
        } else if self.config.should_report(processed) {
            tracing::info!(event = event_number, processed, "processing events");
        } else {
            tracing::debug!(event = event_number, "event processed");
        }

        self.current = Some(event);
        self.state = RunState::EventActive;
        Ok(())
    }

    /// Convert hits, fill event outputs and retire the current event
    pub fn end_event(
        &mut self,
        registry: &ActionRegistry,
        geometry: &GeometryBuilder,
        record: &mut OutputRecord,
    ) -> Result<()> {
        self.expect_state("end an event", &[RunState::EventActive])?;
        let event = self.current.as_ref().ok_or(Error::IllegalStateTransition {
            operation: "end an event",
            state: self.state,
        })?;

        geometry.convert_hits(event, record)?;
        registry.fill_event_outputs(record)?;

        self.previous = self.current.take();
        self.processed += 1;
        self.state = RunState::EventIdle;
        Ok(())
    }

    /// Finish the run and report its totals
    pub fn end_run(
        &mut self,
        registry: &ActionRegistry,
        record: &mut OutputRecord,
    ) -> Result<RunSummary> {
        self.expect_state("end a run", &[RunState::RunActive, RunState::EventIdle])?;
        let run = self.active_run("end a run")?;
        self.state = RunState::RunComplete;

        registry.end_of_run(&run)?;
        self.engine.end_run(&run)?;
        registry.fill_run_outputs(record)?;

        let finished_at = Utc::now();
        let summary = RunSummary {
            run,
            processed: self.processed,
            elapsed: self.elapsed,
            macro_fired: self.macro_fired,
            started_at: self.started_at.unwrap_or(finished_at),
            finished_at,
        };

        tracing::info!(
            run = run.number,
            processed = summary.processed,
            "Number of events processed"
        );
        tracing::info!(run = run.number, "TimeReport> {}", summary.elapsed);

        self.current = None;
        self.run = None;
        self.last_summary = Some(summary.clone());
        self.state = RunState::Idle;
        Ok(summary)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run in progress, if any
    pub fn run(&self) -> Option<RunInfo> {
        self.run
    }

    /// Events completed (through `end_event`) in the current run
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Cumulative event time in the current run
    pub fn elapsed(&self) -> CpuTimes {
        self.elapsed
    }

    /// Event between `do_one_event` and `end_event`
    pub fn current_event(&self) -> Option<&Event> {
        self.current.as_ref()
    }

    /// Most recently retired event
    pub fn previous_event(&self) -> Option<&Event> {
        self.previous.as_ref()
    }

    /// Summary of the last completed run
    pub fn last_summary(&self) -> Option<&RunSummary> {
        self.last_summary.as_ref()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DriverConfig {
        &mut self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

impl<E: SimulationEngine> fmt::Debug for RunDriver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunDriver")
            .field("state", &self.state)
            .field("run", &self.run)
            .field("processed", &self.processed)
            .field("elapsed", &self.elapsed)
            .field("trigger", &self.trigger)
            .finish()
    }
}
