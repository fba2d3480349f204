//! Spatial hierarchy builder
//!
//! Components register with a category and a mother category. Building the
//! logical volumes has no ordering constraints. Placement walks the mother
//! graph in topological order so every mother is placed before its
//! daughters, whatever order the components were registered in.

use crate::component::{Component, ComponentDescriptor, Mother};
use crate::error::{Error, Result};
use crate::volume::{LogicalVolumeId, PhysicalVolumeId, VolumeStore};
use gantry_core::{Event, OutputCollector, OutputRecord, ParameterSet, Shared};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::cell::RefMut;
use std::collections::BTreeMap;

struct Entry {
    descriptor: ComponentDescriptor,
    component: Shared<dyn Component>,
    logical: Vec<LogicalVolumeId>,
    physical: Vec<PhysicalVolumeId>,
    placed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Registering,
    Built,
    Placed,
}

/// Holds geometry components and assembles them into one volume tree
pub struct GeometryBuilder {
    components: BTreeMap<String, Entry>,
    /// Categories in registration order
    registration: Vec<String>,
    root: Option<String>,
    store: VolumeStore,
    world: Option<PhysicalVolumeId>,
    order: Vec<String>,
    phase: Phase,
}

impl GeometryBuilder {
    pub fn new() -> Self {
        Self {
            components: BTreeMap::new(),
            registration: Vec::new(),
            root: None,
            store: VolumeStore::new(),
            world: None,
            order: Vec::new(),
            phase: Phase::Registering,
        }
    }

    /// Register a component under its descriptor's category
    pub fn register_component<C: Component + 'static>(
        &mut self,
        descriptor: ComponentDescriptor,
        component: &Shared<C>,
    ) -> Result<()> {
        let category = descriptor.category.clone();
        if self.phase != Phase::Registering {
            return Err(Error::Sealed(category));
        }
        if self.components.contains_key(&category) {
            return Err(Error::DuplicateCategory(category));
        }
        if descriptor.mother.is_root() {
            if let Some(existing) = &self.root {
                return Err(Error::DuplicateRoot {
                    existing: existing.clone(),
                    category,
                });
            }
            self.root = Some(category.clone());
        }

        tracing::info!(
            component = %descriptor.name,
            category = %category,
            mother = %descriptor.mother,
            "registering component"
        );

        let component: Shared<dyn Component> = component.clone();
        self.registration.push(category.clone());
        self.components.insert(
            category,
            Entry {
                descriptor,
                component,
                logical: Vec::new(),
                physical: Vec::new(),
                placed: false,
            },
        );
        Ok(())
    }

    fn entry(&self, category: &str) -> Result<&Entry> {
        self.components
            .get(category)
            .ok_or_else(|| Error::not_found("component for category", category))
    }

    fn borrow<'a>(
        category: &str,
        component: &'a Shared<dyn Component>,
    ) -> Result<RefMut<'a, dyn Component + 'static>> {
        component
            .try_borrow_mut()
            .map_err(|_| Error::component(category, "component is already borrowed"))
    }

    /// Build every component's logical volumes, once
    pub fn build_all_logical_volumes(&mut self) -> Result<()> {
        if self.phase != Phase::Registering {
            return Err(Error::AlreadyBuilt);
        }
        for category in &self.registration {
            let entry = self
                .components
                .get_mut(category)
                .ok_or_else(|| Error::not_found("component for category", category.as_str()))?;
            let logical = Self::borrow(category, &entry.component)?
                .build(&entry.descriptor.parameters, &mut self.store)?;
            tracing::debug!(category = %category, volumes = logical.len(), "built logical volumes");
            entry.logical = logical;
        }
        self.phase = Phase::Built;
        Ok(())
    }

    /// Resolve mothers and place every component, returning the world volume
    pub fn place_all_physical_volumes(&mut self) -> Result<PhysicalVolumeId> {
        match self.phase {
            Phase::Registering => return Err(Error::NotBuilt),
            Phase::Placed => return Err(Error::AlreadyPlaced),
            Phase::Built => {}
        }

        self.check_mothers_registered()?;
        let root = self.root.clone().ok_or(Error::NoRoot)?;
        let order = self.resolve_order()?;

        // A component failing part way must not leave volumes behind
        let snapshot = self.store.clone();
        if let Err(err) = self.place_in_order(&order) {
            tracing::warn!(error = %err, "placement failed; discarding placed volumes");
            self.store = snapshot;
            self.world = None;
            for entry in self.components.values_mut() {
                entry.physical.clear();
                entry.placed = false;
            }
            return Err(err);
        }

        tracing::info!(world = %root, components = order.len(), "geometry placed");
        self.order = order;
        self.phase = Phase::Placed;
        self.world_volume()
    }

    fn place_in_order(&mut self, order: &[String]) -> Result<()> {
        for category in order {
            let mothers = match &self.entry(category)?.descriptor.mother {
                Mother::Root => Vec::new(),
                Mother::Category(mother) => self
                    .components
                    .get(mother)
                    .filter(|m| m.placed)
                    .map(|m| m.logical.clone())
                    .ok_or_else(|| Error::MissingMother {
                        category: category.clone(),
                        mother: mother.clone(),
                    })?,
            };

            let entry = self
                .components
                .get_mut(category)
                .ok_or_else(|| Error::not_found("component for category", category.as_str()))?;
            let physical = Self::borrow(category, &entry.component)?.place(&mothers, &mut self.store)?;

            if entry.descriptor.mother.is_root() {
                let world = physical.first().copied().ok_or_else(|| {
                    Error::component(category.as_str(), "root component placed no physical volume")
                })?;
                self.world = Some(world);
            }
            entry.physical = physical;
            entry.placed = true;
            tracing::info!(category = %category, "placed component");
        }
        Ok(())
    }

    fn check_mothers_registered(&self) -> Result<()> {
        for category in &self.registration {
            let entry = self.entry(category)?;
            if let Mother::Category(mother) = &entry.descriptor.mother {
                if !self.components.contains_key(mother) {
                    return Err(Error::MissingMother {
                        category: category.clone(),
                        mother: mother.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Topological order over mother -> daughter edges
    ///
    /// Nodes are added in category order, so the result does not depend on
    /// registration order.
    fn resolve_order(&self) -> Result<Vec<String>> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let nodes: BTreeMap<&str, NodeIndex> = self
            .components
            .keys()
            .map(|category| (category.as_str(), graph.add_node(category.as_str())))
            .collect();

        for (category, entry) in &self.components {
            if let Some(mother) = entry.descriptor.mother.as_category() {
                let from = nodes.get(mother).ok_or_else(|| Error::MissingMother {
                    category: category.clone(),
                    mother: mother.to_string(),
                })?;
                graph.add_edge(*from, nodes[category.as_str()], ());
            }
        }

        match toposort(&graph, None) {
            Ok(sorted) => Ok(sorted.into_iter().map(|n| graph[n].to_string()).collect()),
            Err(_) => {
                let mut categories: Vec<String> = tarjan_scc(&graph)
                    .into_iter()
                    .find(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
                    .unwrap_or_default()
                    .into_iter()
                    .map(|n| graph[n].to_string())
                    .collect();
                categories.sort();
                Err(Error::DependencyCycle { categories })
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The registered component for a category
    pub fn get_component(&self, category: &str) -> Result<Shared<dyn Component>> {
        Ok(self.entry(category)?.component.clone())
    }

    pub fn descriptor(&self, category: &str) -> Result<&ComponentDescriptor> {
        Ok(&self.entry(category)?.descriptor)
    }

    /// Configuration of the component for a category
    pub fn parameters_for(&self, category: &str) -> Result<&ParameterSet> {
        Ok(&self.entry(category)?.descriptor.parameters)
    }

    pub fn logical_volumes(&self, category: &str) -> Result<&[LogicalVolumeId]> {
        Ok(&self.entry(category)?.logical)
    }

    pub fn physical_volumes(&self, category: &str) -> Result<&[PhysicalVolumeId]> {
        Ok(&self.entry(category)?.physical)
    }

    /// The placed world volume
    pub fn world_volume(&self) -> Result<PhysicalVolumeId> {
        self.world.ok_or(Error::NoRoot)
    }

    /// Registered categories, sorted
    pub fn categories(&self) -> Vec<&str> {
        self.components.keys().map(String::as_str).collect()
    }

    /// Order components were placed in; empty before placement
    pub fn placement_order(&self) -> &[String] {
        &self.order
    }

    pub fn volumes(&self) -> &VolumeStore {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn is_built(&self) -> bool {
        self.phase != Phase::Registering
    }

    pub fn is_placed(&self) -> bool {
        self.phase == Phase::Placed
    }

    // ========================================================================
    // Per-job and per-event hooks
    // ========================================================================

    /// Let every component reserve its hit outputs
    pub fn declare_outputs(&self, collector: &mut OutputCollector) -> Result<()> {
        for (category, entry) in &self.components {
            Self::borrow(category, &entry.component)?.declare_outputs(category, collector)?;
        }
        Ok(())
    }

    /// Convert this event's hits into outputs, component by component
    pub fn convert_hits(&self, event: &Event, record: &mut OutputRecord) -> Result<()> {
        for (category, entry) in &self.components {
            Self::borrow(category, &entry.component)?.convert_hits(event, record)?;
        }
        Ok(())
    }
}

impl Default for GeometryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GeometryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryBuilder")
            .field("categories", &self.categories())
            .field("root", &self.root)
            .field("phase", &self.phase)
            .field("world", &self.world)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::{shared, Scope, Value};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Box-shaped component placing `copies` copies into each mother volume
    struct Slab {
        name: String,
        copies: u32,
        logical: Vec<LogicalVolumeId>,
        hits: u32,
    }

    impl Slab {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                copies: 1,
                logical: Vec::new(),
                hits: 0,
            }
        }
    }

    impl Component for Slab {
        fn build(
            &mut self,
            parameters: &ParameterSet,
            store: &mut VolumeStore,
        ) -> Result<Vec<LogicalVolumeId>> {
            self.copies = parameters.get_or("copies", 1u32);
            let material: String = parameters.get_or("material", "G4_AIR".to_string());
            let lv = store.create_logical(self.name.clone(), material);
            self.logical = vec![lv];
            Ok(self.logical.clone())
        }

        fn place(
            &mut self,
            mothers: &[LogicalVolumeId],
            store: &mut VolumeStore,
        ) -> Result<Vec<PhysicalVolumeId>> {
            let lv = self.logical[0];
            if mothers.is_empty() {
                return Ok(vec![store.place(self.name.clone(), lv, None, 0)?]);
            }
            let mut placed = Vec::new();
            for mother in mothers {
                for copy in 0..self.copies {
                    placed.push(store.place(self.name.clone(), lv, Some(*mother), copy)?);
                }
            }
            Ok(placed)
        }

        fn declare_outputs(
            &mut self,
            category: &str,
            collector: &mut OutputCollector,
        ) -> Result<()> {
            collector.declare(category, "hits", Scope::Event)?;
            Ok(())
        }

        fn convert_hits(&mut self, event: &Event, record: &mut OutputRecord) -> Result<()> {
            self.hits += 1;
            record.put(self.name.clone(), "hits", event.number as i64)?;
            Ok(())
        }
    }

    fn world() -> ComponentDescriptor {
        ComponentDescriptor::root("World", "world")
    }

    fn register(builder: &mut GeometryBuilder, descriptor: ComponentDescriptor) -> Result<()> {
        let name = descriptor.category.clone();
        builder.register_component(descriptor, &shared(Slab::new(&name)))
    }

    #[test]
    fn test_world_calorimeter_crystal() {
        let mut builder = GeometryBuilder::new();
        register(&mut builder, world()).unwrap();
        register(
            &mut builder,
            ComponentDescriptor::daughter("Calo", "calorimeter", "world"),
        )
        .unwrap();
        register(
            &mut builder,
            ComponentDescriptor::daughter("Xtal", "crystal", "calorimeter").with_parameters(
                ParameterSet::new()
                    .with("copies", 3)
                    .with("material", "PbF2"),
            ),
        )
        .unwrap();

        builder.build_all_logical_volumes().unwrap();
        let world_pv = builder.place_all_physical_volumes().unwrap();
        let store = builder.volumes();

        let world_lv = builder.logical_volumes("world").unwrap()[0];
        let calo_lv = builder.logical_volumes("calorimeter").unwrap()[0];
        assert!(store.physical(world_pv).unwrap().is_world());
        assert_eq!(store.physical(world_pv).unwrap().logical, world_lv);

        let calo_pv = builder.physical_volumes("calorimeter").unwrap()[0];
        assert_eq!(store.physical(calo_pv).unwrap().mother, Some(world_lv));

        let crystals = builder.physical_volumes("crystal").unwrap();
        assert_eq!(crystals.len(), 3);
        for pv in crystals {
            assert_eq!(store.physical(*pv).unwrap().mother, Some(calo_lv));
        }
        let xtal_lv = builder.logical_volumes("crystal").unwrap()[0];
        assert_eq!(store.logical(xtal_lv).unwrap().material, "PbF2");
        assert_eq!(
            builder.placement_order(),
            &["world".to_string(), "calorimeter".to_string(), "crystal".to_string()]
        );
    }

    #[test]
    fn test_reverse_registration_still_places() {
        let mut builder = GeometryBuilder::new();
        register(
            &mut builder,
            ComponentDescriptor::daughter("Xtal", "crystal", "calorimeter"),
        )
        .unwrap();
        register(
            &mut builder,
            ComponentDescriptor::daughter("Calo", "calorimeter", "world"),
        )
        .unwrap();
        register(&mut builder, world()).unwrap();

        builder.build_all_logical_volumes().unwrap();
        builder.place_all_physical_volumes().unwrap();
        assert_eq!(builder.placement_order()[0], "world");
        assert_eq!(builder.placement_order()[2], "crystal");
    }

    #[test]
    fn test_missing_mother_named() {
        let mut builder = GeometryBuilder::new();
        register(&mut builder, world()).unwrap();
        register(
            &mut builder,
            ComponentDescriptor::daughter("Xtal", "crystal", "calorimeter"),
        )
        .unwrap();
        builder.build_all_logical_volumes().unwrap();

        let err = builder.place_all_physical_volumes().unwrap_err();
        match &err {
            Error::MissingMother { category, mother } => {
                assert_eq!(category, "crystal");
                assert_eq!(mother, "calorimeter");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("calorimeter"));
    }

    #[test]
    fn test_cycle_detected() {
        let mut builder = GeometryBuilder::new();
        register(&mut builder, world()).unwrap();
        register(&mut builder, ComponentDescriptor::daughter("A", "a", "b")).unwrap();
        register(&mut builder, ComponentDescriptor::daughter("B", "b", "a")).unwrap();
        register(&mut builder, ComponentDescriptor::daughter("C", "c", "world")).unwrap();
        builder.build_all_logical_volumes().unwrap();

        let err = builder.place_all_physical_volumes().unwrap_err();
        match err {
            Error::DependencyCycle { categories } => assert_eq!(categories, vec!["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(builder.world_volume(), Err(Error::NoRoot)));
    }

    #[test]
    fn test_self_mother_is_cycle() {
        let mut builder = GeometryBuilder::new();
        register(&mut builder, world()).unwrap();
        register(&mut builder, ComponentDescriptor::daughter("L", "loop", "loop")).unwrap();
        builder.build_all_logical_volumes().unwrap();
        assert!(matches!(
            builder.place_all_physical_volumes(),
            Err(Error::DependencyCycle { categories }) if categories == vec!["loop"]
        ));
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut builder = GeometryBuilder::new();
        register(&mut builder, world()).unwrap();
        assert!(matches!(
            register(&mut builder, world()),
            Err(Error::DuplicateCategory(c)) if c == "world"
        ));
        assert!(matches!(
            register(&mut builder, ComponentDescriptor::root("Hall", "hall")),
            Err(Error::DuplicateRoot { .. })
        ));
    }

    #[test]
    fn test_phase_ordering() {
        let mut builder = GeometryBuilder::new();
        assert!(matches!(
            builder.place_all_physical_volumes(),
            Err(Error::NotBuilt)
        ));
        register(&mut builder, world()).unwrap();
        builder.build_all_logical_volumes().unwrap();
        assert!(matches!(
            builder.build_all_logical_volumes(),
            Err(Error::AlreadyBuilt)
        ));
        assert!(matches!(
            register(&mut builder, ComponentDescriptor::daughter("L", "late", "world")),
            Err(Error::Sealed(_))
        ));
        builder.place_all_physical_volumes().unwrap();
        assert!(matches!(
            builder.place_all_physical_volumes(),
            Err(Error::AlreadyPlaced)
        ));
    }

    #[test]
    fn test_no_root() {
        let mut builder = GeometryBuilder::new();
        register(&mut builder, ComponentDescriptor::daughter("A", "a", "b")).unwrap();
        register(&mut builder, ComponentDescriptor::daughter("B", "b", "a")).unwrap();
        builder.build_all_logical_volumes().unwrap();
        assert!(matches!(
            builder.place_all_physical_volumes(),
            Err(Error::NoRoot)
        ));
    }

    #[test]
    fn test_lookup_and_parameters() {
        let mut builder = GeometryBuilder::new();
        let slab = shared(Slab::new("world"));
        builder
            .register_component(
                world().with_parameters(ParameterSet::new().with("material", "G4_Galactic")),
                &slab,
            )
            .unwrap();

        let found = builder.get_component("world").unwrap();
        assert!(std::ptr::eq(
            found.as_ptr() as *const (),
            slab.as_ptr() as *const ()
        ));
        assert_eq!(
            builder.parameters_for("world").unwrap().value("material"),
            Some(&Value::from("G4_Galactic"))
        );
        assert!(matches!(
            builder.get_component("tracker"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_hit_conversion() {
        let mut builder = GeometryBuilder::new();
        let slab = shared(Slab::new("world"));
        builder.register_component(world(), &slab).unwrap();

        let mut collector = OutputCollector::new();
        builder.declare_outputs(&mut collector).unwrap();
        let mut record = collector.event_record();
        builder.convert_hits(&Event::new(4), &mut record).unwrap();

        assert_eq!(record.get("world", "hits"), Some(&Value::Int(4)));
        assert_eq!(slab.borrow().hits, 1);
    }

    /// Fails to place while `fail` is set
    struct Flaky {
        inner: Slab,
        fail: Rc<Cell<bool>>,
    }

    impl Component for Flaky {
        fn build(
            &mut self,
            parameters: &ParameterSet,
            store: &mut VolumeStore,
        ) -> Result<Vec<LogicalVolumeId>> {
            self.inner.build(parameters, store)
        }

        fn place(
            &mut self,
            mothers: &[LogicalVolumeId],
            store: &mut VolumeStore,
        ) -> Result<Vec<PhysicalVolumeId>> {
            if self.fail.get() {
                return Err(Error::component(self.inner.name.as_str(), "overlaps its mother"));
            }
            self.inner.place(mothers, store)
        }
    }

    #[test]
    fn test_failed_placement_rolls_back() {
        let fail = Rc::new(Cell::new(true));
        let mut builder = GeometryBuilder::new();
        register(&mut builder, world()).unwrap();
        register(
            &mut builder,
            ComponentDescriptor::daughter("Calo", "calorimeter", "world")
                .with_parameters(ParameterSet::new().with("copies", 3u32)),
        )
        .unwrap();
        builder
            .register_component(
                ComponentDescriptor::daughter("Xtal", "xtal", "calorimeter"),
                &shared(Flaky {
                    inner: Slab::new("xtal"),
                    fail: fail.clone(),
                }),
            )
            .unwrap();
        builder.build_all_logical_volumes().unwrap();
        let logical = builder.volumes().logical_count();

        assert!(matches!(
            builder.place_all_physical_volumes(),
            Err(Error::Component { .. })
        ));
        assert!(!builder.is_placed());
        assert_eq!(builder.volumes().physical_count(), 0);
        assert_eq!(builder.volumes().logical_count(), logical);
        assert!(builder.physical_volumes("calorimeter").unwrap().is_empty());
        assert!(matches!(builder.world_volume(), Err(Error::NoRoot)));

        fail.set(false);
        let world_pv = builder.place_all_physical_volumes().unwrap();
        assert_eq!(world_pv, PhysicalVolumeId(0));
        assert_eq!(builder.volumes().physical_count(), 1 + 3 + 1);
        assert_eq!(builder.physical_volumes("calorimeter").unwrap().len(), 3);
    }
}
