//! Capability registry and lifecycle dispatcher
//!
//! The registry keeps one name-sorted table per capability plus a flat
//! by-name index over every registered plugin. Tables are only mutated during
//! job setup; [`ActionRegistry::initialize_all`] seals them, after which the
//! registry is read-only and only dispatches.
//!
//! Dispatch order is always ascending plugin name. A dispatch call finishes a
//! full pass over its table before returning, and the first plugin error
//! aborts the pass and propagates to the caller unchanged.

use crate::capability::Capability;
use crate::error::{Error, Result};
use crate::output::{OutputCollector, OutputRecord};
use crate::plugin::{
    EventAction, Plugin, PrimaryGeneratorAction, RunAction, Shared, StackingAction,
    SteppingAction, TrackingAction,
};
use crate::records::{Event, RunInfo, Step, Track};
use std::collections::BTreeMap;
use std::rc::Rc;

/// One plugin as stored under a capability: the base view and the typed view
/// of the same object
struct Entry<A: ?Sized> {
    plugin: Shared<dyn Plugin>,
    action: Shared<A>,
}

type Table<A> = BTreeMap<String, Entry<A>>;

/// Setup progress of the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Accepting registrations
    Open,
    /// Sealed by `initialize_all`; dispatch only
    Sealed,
}

fn same_object<A: ?Sized, B: ?Sized>(a: &Shared<A>, b: &Shared<B>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// Every distinct plugin object, grouped by name
///
/// Two different objects may share a name when they register under
/// different capabilities. Name lookup returns the first one registered;
/// job hooks reach every object exactly once.
#[derive(Default)]
struct PluginIndex {
    by_name: BTreeMap<String, Vec<Shared<dyn Plugin>>>,
}

impl PluginIndex {
    /// Add `plugin` unless this exact object is already indexed
    ///
    /// Returns `true` when another object already used the name.
    fn add(&mut self, name: &str, plugin: &Shared<dyn Plugin>) -> bool {
        let objects = self.by_name.entry(name.to_string()).or_default();
        if objects.iter().any(|p| same_object(p, plugin)) {
            return false;
        }
        let shared_name = !objects.is_empty();
        objects.push(plugin.clone());
        shared_name
    }

    fn first(&self, name: &str) -> Option<&Shared<dyn Plugin>> {
        self.by_name.get(name).and_then(|objects| objects.first())
    }

    /// Distinct objects in name order, then registration order
    fn iter(&self) -> impl Iterator<Item = (&String, &Shared<dyn Plugin>)> {
        self.by_name
            .iter()
            .flat_map(|(name, objects)| objects.iter().map(move |p| (name, p)))
    }

    fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }
}

/// Registry of lifecycle plugins, keyed by name per capability
pub struct ActionRegistry {
    run: Table<dyn RunAction>,
    event: Table<dyn EventAction>,
    tracking: Table<dyn TrackingAction>,
    stepping: Table<dyn SteppingAction>,
    stacking: Table<dyn StackingAction>,
    primary: Table<dyn PrimaryGeneratorAction>,
    /// Flat index across all capabilities
    all: PluginIndex,
    phase: Phase,
    outputs_declared: bool,
}

impl ActionRegistry {
    /// Create an empty, open registry
    pub fn new() -> Self {
        Self {
            run: Table::new(),
            event: Table::new(),
            tracking: Table::new(),
            stepping: Table::new(),
            stacking: Table::new(),
            primary: Table::new(),
            all: PluginIndex::default(),
            phase: Phase::Open,
            outputs_declared: false,
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a plugin under [`Capability::RunLifecycle`]
    pub fn register_run<P: RunAction + 'static>(&mut self, plugin: &Shared<P>) -> Result<()> {
        let action: Shared<dyn RunAction> = plugin.clone();
        Self::insert(
            &mut self.run,
            &mut self.all,
            self.phase,
            Capability::RunLifecycle,
            plugin.clone(),
            action,
        )
    }

    /// Register a plugin under [`Capability::EventLifecycle`]
    pub fn register_event<P: EventAction + 'static>(&mut self, plugin: &Shared<P>) -> Result<()> {
        let action: Shared<dyn EventAction> = plugin.clone();
        Self::insert(
            &mut self.event,
            &mut self.all,
            self.phase,
            Capability::EventLifecycle,
            plugin.clone(),
            action,
        )
    }

    /// Register a plugin under [`Capability::TrackingLifecycle`]
    pub fn register_tracking<P: TrackingAction + 'static>(
        &mut self,
        plugin: &Shared<P>,
    ) -> Result<()> {
        let action: Shared<dyn TrackingAction> = plugin.clone();
        Self::insert(
            &mut self.tracking,
            &mut self.all,
            self.phase,
            Capability::TrackingLifecycle,
            plugin.clone(),
            action,
        )
    }

    /// Register a plugin under [`Capability::SteppingLifecycle`]
    pub fn register_stepping<P: SteppingAction + 'static>(
        &mut self,
        plugin: &Shared<P>,
    ) -> Result<()> {
        let action: Shared<dyn SteppingAction> = plugin.clone();
        Self::insert(
            &mut self.stepping,
            &mut self.all,
            self.phase,
            Capability::SteppingLifecycle,
            plugin.clone(),
            action,
        )
    }

    /// Register a plugin under [`Capability::StackFilter`]
    pub fn register_stacking<P: StackingAction + 'static>(
        &mut self,
        plugin: &Shared<P>,
    ) -> Result<()> {
        let action: Shared<dyn StackingAction> = plugin.clone();
        Self::insert(
            &mut self.stacking,
            &mut self.all,
            self.phase,
            Capability::StackFilter,
            plugin.clone(),
            action,
        )
    }

    /// Register a plugin under [`Capability::PrimaryGenerator`]
    pub fn register_primary_generator<P: PrimaryGeneratorAction + 'static>(
        &mut self,
        plugin: &Shared<P>,
    ) -> Result<()> {
        let action: Shared<dyn PrimaryGeneratorAction> = plugin.clone();
        Self::insert(
            &mut self.primary,
            &mut self.all,
            self.phase,
            Capability::PrimaryGenerator,
            plugin.clone(),
            action,
        )
    }

    fn insert<A: ?Sized>(
        table: &mut Table<A>,
        all: &mut PluginIndex,
        phase: Phase,
        capability: Capability,
        plugin: Shared<dyn Plugin>,
        action: Shared<A>,
    ) -> Result<()> {
        let (name, declared) = {
            let p = plugin.borrow();
            (p.name().to_string(), p.capabilities())
        };

        if phase == Phase::Sealed {
            return Err(Error::RegistrySealed(name));
        }
        if declared.is_empty() {
            return Err(Error::NoCapabilities(name));
        }
        if !declared.contains(capability) {
            return Err(Error::UndeclaredCapability {
                plugin: name,
                capability,
            });
        }
        if table.contains_key(&name) {
            return Err(Error::DuplicateName { capability, name });
        }

        tracing::info!(plugin = %name, %capability, "registering action");

        if all.add(&name, &plugin) {
            tracing::warn!(
                plugin = %name,
                %capability,
                "a different plugin object already uses this name; name lookup returns the first"
            );
        }

        table.insert(name, Entry { plugin, action });
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    fn find<'a, A: ?Sized>(
        table: &'a Table<A>,
        capability: Capability,
        name: &str,
    ) -> Result<&'a Entry<A>> {
        table
            .get(name)
            .ok_or_else(|| Error::not_found(format!("{} action", capability), name))
    }

    /// Look up a plugin registered under a capability
    ///
    /// Returns the registered object itself, not a copy.
    pub fn lookup(&self, name: &str, capability: Capability) -> Result<Shared<dyn Plugin>> {
        let plugin = match capability {
            Capability::RunLifecycle => &Self::find(&self.run, capability, name)?.plugin,
            Capability::EventLifecycle => &Self::find(&self.event, capability, name)?.plugin,
            Capability::TrackingLifecycle => {
                &Self::find(&self.tracking, capability, name)?.plugin
            }
            Capability::SteppingLifecycle => {
                &Self::find(&self.stepping, capability, name)?.plugin
            }
            Capability::StackFilter => &Self::find(&self.stacking, capability, name)?.plugin,
            Capability::PrimaryGenerator => &Self::find(&self.primary, capability, name)?.plugin,
        };
        Ok(plugin.clone())
    }

    /// Look up a plugin by name in the flat index
    pub fn plugin(&self, name: &str) -> Result<Shared<dyn Plugin>> {
        self.all
            .first(name)
            .cloned()
            .ok_or_else(|| Error::not_found("plugin", name))
    }

    pub fn run_action(&self, name: &str) -> Result<Shared<dyn RunAction>> {
        Ok(Self::find(&self.run, Capability::RunLifecycle, name)?
            .action
            .clone())
    }

    pub fn event_action(&self, name: &str) -> Result<Shared<dyn EventAction>> {
        Ok(Self::find(&self.event, Capability::EventLifecycle, name)?
            .action
            .clone())
    }

    pub fn tracking_action(&self, name: &str) -> Result<Shared<dyn TrackingAction>> {
        Ok(Self::find(&self.tracking, Capability::TrackingLifecycle, name)?
            .action
            .clone())
    }

    pub fn stepping_action(&self, name: &str) -> Result<Shared<dyn SteppingAction>> {
        Ok(Self::find(&self.stepping, Capability::SteppingLifecycle, name)?
            .action
            .clone())
    }

    pub fn stacking_action(&self, name: &str) -> Result<Shared<dyn StackingAction>> {
        Ok(Self::find(&self.stacking, Capability::StackFilter, name)?
            .action
            .clone())
    }

    pub fn primary_generator(&self, name: &str) -> Result<Shared<dyn PrimaryGeneratorAction>> {
        Ok(Self::find(&self.primary, Capability::PrimaryGenerator, name)?
            .action
            .clone())
    }

    /// Names registered under a capability, in dispatch order
    pub fn names(&self, capability: Capability) -> Vec<&str> {
        fn keys<A: ?Sized>(table: &Table<A>) -> Vec<&str> {
            table.keys().map(String::as_str).collect()
        }
        match capability {
            Capability::RunLifecycle => keys(&self.run),
            Capability::EventLifecycle => keys(&self.event),
            Capability::TrackingLifecycle => keys(&self.tracking),
            Capability::SteppingLifecycle => keys(&self.stepping),
            Capability::StackFilter => keys(&self.stacking),
            Capability::PrimaryGenerator => keys(&self.primary),
        }
    }

    /// Check whether `name` is registered under `capability`
    pub fn contains(&self, name: &str, capability: Capability) -> bool {
        self.names(capability).contains(&name)
    }

    /// Number of distinct plugin objects
    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.by_name.is_empty()
    }

    /// Whether `initialize_all` has sealed the registry
    pub fn is_sealed(&self) -> bool {
        self.phase == Phase::Sealed
    }

    // ========================================================================
    // Job setup
    // ========================================================================

    /// Let every plugin reserve its output slots
    ///
    /// Must be called exactly once, before `initialize_all`.
    pub fn declare_outputs(&mut self, collector: &mut OutputCollector) -> Result<()> {
        if self.outputs_declared {
            return Err(Error::SetupOrder(
                "plugin outputs were already declared".to_string(),
            ));
        }
        if self.is_sealed() {
            return Err(Error::SetupOrder(
                "plugin outputs must be declared before initialization".to_string(),
            ));
        }
        self.outputs_declared = true;
        Self::each(&self.all, |p| p.declare_outputs(collector))
    }

    /// Check that every declared capability was actually registered
    pub fn verify_capabilities(&self) -> Result<()> {
        for (name, plugin) in self.all.iter() {
            let declared = plugin.borrow().capabilities();
            for capability in declared.iter() {
                let registered = match capability {
                    Capability::RunLifecycle => self.run.get(name).map(|e| &e.plugin),
                    Capability::EventLifecycle => self.event.get(name).map(|e| &e.plugin),
                    Capability::TrackingLifecycle => self.tracking.get(name).map(|e| &e.plugin),
                    Capability::SteppingLifecycle => self.stepping.get(name).map(|e| &e.plugin),
                    Capability::StackFilter => self.stacking.get(name).map(|e| &e.plugin),
                    Capability::PrimaryGenerator => self.primary.get(name).map(|e| &e.plugin),
                };
                match registered {
                    Some(entry) if same_object(entry, plugin) => {}
                    _ => {
                        return Err(Error::UnregisteredCapability {
                            plugin: name.clone(),
                            capability,
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// Seal the registry and initialize every plugin once
    ///
    /// Call after physics setup and before the first run.
    pub fn initialize_all(&mut self) -> Result<()> {
        if self.is_sealed() {
            return Err(Error::SetupOrder(
                "plugins were already initialized".to_string(),
            ));
        }
        self.verify_capabilities()?;
        self.phase = Phase::Sealed;
        tracing::info!(plugins = self.all.len(), "initializing actions");
        Self::each(&self.all, |p| p.initialize())
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn each(index: &PluginIndex, mut f: impl FnMut(&mut dyn Plugin) -> Result<()>) -> Result<()> {
        for (name, plugin) in index.iter() {
            let mut plugin = plugin
                .try_borrow_mut()
                .map_err(|_| Error::PluginBusy(name.clone()))?;
            f(&mut *plugin)?;
        }
        Ok(())
    }

    fn each_action<A: ?Sized>(
        table: &Table<A>,
        mut f: impl FnMut(&mut A) -> Result<()>,
    ) -> Result<()> {
        for (name, entry) in table {
            let mut action = entry
                .action
                .try_borrow_mut()
                .map_err(|_| Error::PluginBusy(name.clone()))?;
            f(&mut *action)?;
        }
        Ok(())
    }

    fn require_sealed(&self, operation: &str) -> Result<()> {
        if self.is_sealed() {
            Ok(())
        } else {
            Err(Error::SetupOrder(format!(
                "{} dispatched before plugins were initialized",
                operation
            )))
        }
    }

    pub fn begin_of_run(&self, run: &RunInfo) -> Result<()> {
        self.require_sealed("begin_of_run")?;
        Self::each_action(&self.run, |a| a.begin_of_run(run))
    }

    pub fn end_of_run(&self, run: &RunInfo) -> Result<()> {
        Self::each_action(&self.run, |a| a.end_of_run(run))
    }

    pub fn begin_of_event(&self, event: &Event) -> Result<()> {
        Self::each_action(&self.event, |a| a.begin_of_event(event))
    }

    pub fn end_of_event(&self, event: &Event) -> Result<()> {
        Self::each_action(&self.event, |a| a.end_of_event(event))
    }

    pub fn pre_tracking(&self, track: &Track) -> Result<()> {
        Self::each_action(&self.tracking, |a| a.pre_tracking(track))
    }

    pub fn post_tracking(&self, track: &Track) -> Result<()> {
        Self::each_action(&self.tracking, |a| a.post_tracking(track))
    }

    pub fn stepping(&self, step: &Step) -> Result<()> {
        Self::each_action(&self.stepping, |a| a.stepping(step))
    }

    pub fn generate_primaries(&self, event: &mut Event) -> Result<()> {
        Self::each_action(&self.primary, |a| a.generate_primaries(event))
    }

    /// True if any stack filter wants the track killed
    ///
    /// Stops at the first filter that answers `true`.
    pub fn kill_new_track(&self, track: &Track) -> Result<bool> {
        for (name, entry) in &self.stacking {
            let mut action = entry
                .action
                .try_borrow_mut()
                .map_err(|_| Error::PluginBusy(name.clone()))?;
            if action.kill_new_track(track)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Collect per-event products from every plugin
    pub fn fill_event_outputs(&self, record: &mut OutputRecord) -> Result<()> {
        Self::each(&self.all, |p| p.fill_event_outputs(record))
    }

    /// Collect per-run products from every plugin
    pub fn fill_run_outputs(&self, record: &mut OutputRecord) -> Result<()> {
        Self::each(&self.all, |p| p.fill_run_outputs(record))
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("plugins", &self.all.by_name.keys().collect::<Vec<_>>())
            .field("run", &self.run.len())
            .field("event", &self.event.len())
            .field("tracking", &self.tracking.len())
            .field("stepping", &self.stepping.len())
            .field("stacking", &self.stacking.len())
            .field("primary", &self.primary.len())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}
