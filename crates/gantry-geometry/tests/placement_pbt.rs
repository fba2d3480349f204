use gantry_core::{shared, ParameterSet};
use gantry_geometry::{
    Component, ComponentDescriptor, Error, GeometryBuilder, LogicalVolumeId, PhysicalVolumeId,
    Result, VolumeStore,
};
use proptest::prelude::*;

struct Shell {
    name: String,
    logical: Option<LogicalVolumeId>,
}

impl Component for Shell {
    fn build(
        &mut self,
        _parameters: &ParameterSet,
        store: &mut VolumeStore,
    ) -> Result<Vec<LogicalVolumeId>> {
        let lv = store.create_logical(self.name.clone(), "G4_AIR");
        self.logical = Some(lv);
        Ok(vec![lv])
    }

    fn place(
        &mut self,
        mothers: &[LogicalVolumeId],
        store: &mut VolumeStore,
    ) -> Result<Vec<PhysicalVolumeId>> {
        let lv = self
            .logical
            .ok_or_else(|| Error::component(self.name.clone(), "placed before build"))?;
        if mothers.is_empty() {
            return Ok(vec![store.place(self.name.clone(), lv, None, 0)?]);
        }
        mothers
            .iter()
            .map(|m| store.place(self.name.clone(), lv, Some(*m), 0))
            .collect()
    }
}

fn category(i: usize) -> String {
    format!("c{:02}", i)
}

/// Mother index per component; component 0 is the root, every other
/// component's mother has a smaller index
fn tree_and_order() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    (1usize..10)
        .prop_flat_map(|n| {
            let mothers: Vec<BoxedStrategy<usize>> = (0..n)
                .map(|i| if i == 0 { Just(0).boxed() } else { (0..i).boxed() })
                .collect();
            (mothers, Just((0..n).collect::<Vec<_>>()).prop_shuffle())
        })
}

fn descriptor(i: usize, mothers: &[usize]) -> ComponentDescriptor {
    if i == 0 {
        ComponentDescriptor::root(category(0), category(0))
    } else {
        ComponentDescriptor::daughter(category(i), category(i), category(mothers[i]))
    }
}

fn builder_for(descriptors: Vec<ComponentDescriptor>) -> GeometryBuilder {
    let mut builder = GeometryBuilder::new();
    for d in descriptors {
        let shell = shared(Shell {
            name: d.category.clone(),
            logical: None,
        });
        builder.register_component(d, &shell).unwrap();
    }
    builder.build_all_logical_volumes().unwrap();
    builder
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn acyclic_trees_place_in_any_registration_order((mothers, order) in tree_and_order()) {
        let mut builder = builder_for(order.iter().map(|&i| descriptor(i, &mothers)).collect());
        let world = builder.place_all_physical_volumes().unwrap();
        let store = builder.volumes();
        prop_assert!(store.physical(world).unwrap().is_world());

        let placed = builder.placement_order();
        prop_assert_eq!(placed.len(), mothers.len());
        for i in 1..mothers.len() {
            let me = placed.iter().position(|c| *c == category(i)).unwrap();
            let mother = placed.iter().position(|c| *c == category(mothers[i])).unwrap();
            prop_assert!(mother < me);

            let mother_lv = builder.logical_volumes(&category(mothers[i])).unwrap()[0];
            for pv in builder.physical_volumes(&category(i)).unwrap() {
                prop_assert_eq!(store.physical(*pv).unwrap().mother, Some(mother_lv));
            }
        }
    }

    #[test]
    fn placement_order_ignores_registration_order((mothers, order) in tree_and_order()) {
        let mut shuffled = builder_for(order.iter().map(|&i| descriptor(i, &mothers)).collect());
        let mut sorted = builder_for((0..mothers.len()).map(|i| descriptor(i, &mothers)).collect());
        shuffled.place_all_physical_volumes().unwrap();
        sorted.place_all_physical_volumes().unwrap();
        prop_assert_eq!(shuffled.placement_order(), sorted.placement_order());
    }

    #[test]
    fn cycles_are_always_rejected((mothers, order) in tree_and_order(), extra in 2usize..5) {
        // Two extra components pointing at each other, hung off nothing
        let n = mothers.len();
        let mut descriptors: Vec<_> = order.iter().map(|&i| descriptor(i, &mothers)).collect();
        for k in 0..extra {
            let next = n + (k + 1) % extra;
            descriptors.insert(
                k % (descriptors.len() + 1),
                ComponentDescriptor::daughter(category(n + k), category(n + k), category(next)),
            );
        }
        let mut builder = builder_for(descriptors);
        match builder.place_all_physical_volumes() {
            Err(Error::DependencyCycle { categories }) => prop_assert_eq!(categories.len(), extra),
            other => prop_assert!(false, "expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn unregistered_mother_is_rejected((mothers, order) in tree_and_order()) {
        let mut descriptors: Vec<_> = order.iter().map(|&i| descriptor(i, &mothers)).collect();
        descriptors.push(ComponentDescriptor::daughter("orphan", "orphan", "nowhere"));
        let mut builder = builder_for(descriptors);
        match builder.place_all_physical_volumes() {
            Err(Error::MissingMother { category, mother }) => {
                prop_assert_eq!(category, "orphan");
                prop_assert_eq!(mother, "nowhere");
            }
            other => prop_assert!(false, "expected a missing mother, got {:?}", other),
        }
    }
}
