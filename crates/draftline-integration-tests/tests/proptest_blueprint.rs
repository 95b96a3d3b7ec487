//! Property-based tests for blueprint export and import.
//!
//! Random rows of chests and decider combinators are wired together, exported
//! to JSON, and parsed back. The rebuilt blueprint must hold the same
//! entities, inventory limits, and circuit wires.

use std::collections::BTreeSet;

use draftline_blueprint::blueprint::{Blueprint, WireColor};
use draftline_core::config::DraftConfig;
use draftline_core::geometry::TilePosition;
use draftline_core::id::{CircuitSide, EntityId};
use draftline_data::registry::PrototypeRegistry;
use draftline_entity::Entity;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Slot {
    decider: bool,
    bar: Option<u32>,
}

#[derive(Debug, Clone)]
struct Link {
    a: usize,
    b: usize,
    a_output: bool,
    b_output: bool,
    red: bool,
}

fn arb_slot() -> impl Strategy<Value = Slot> {
    (any::<bool>(), proptest::option::of(1u32..=32))
        .prop_map(|(decider, bar)| Slot { decider, bar })
}

fn arb_link() -> impl Strategy<Value = Link> {
    (0usize..8, 0usize..8, any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(a, b, a_output, b_output, red)| Link {
            a,
            b,
            a_output,
            b_output,
            red,
        },
    )
}

/// Place each slot three tiles apart and add every link that is legal.
fn build(slots: &[Slot], links: &[Link]) -> Blueprint {
    let reg = PrototypeRegistry::vanilla();
    let mut bp = Blueprint::new();
    let mut ids = Vec::new();
    for (i, slot) in slots.iter().enumerate() {
        let name = if slot.decider { "decider-combinator" } else { "iron-chest" };
        let mut entity = Entity::new(reg, name).unwrap();
        entity.set_tile_position(TilePosition::new(3 * i as i32, 0));
        if !slot.decider {
            entity.set_bar(slot.bar).unwrap();
        }
        ids.push(bp.add_entity(entity).unwrap());
    }
    let side = |slot: &Slot, output: bool| {
        if output && slot.decider { CircuitSide::Output } else { CircuitSide::Input }
    };
    for link in links {
        let (a, b) = (link.a % slots.len(), link.b % slots.len());
        let side_a = side(&slots[a], link.a_output);
        let side_b = side(&slots[b], link.b_output);
        if a == b && side_a == side_b {
            continue;
        }
        let color = if link.red { WireColor::Red } else { WireColor::Green };
        bp.connect_circuit(ids[a], side_a, ids[b], side_b, color).unwrap();
    }
    bp
}

type WireKey = (&'static str, (usize, u8), (usize, u8));

/// Wires keyed by entity position in insertion order, ends sorted.
fn wire_set(bp: &Blueprint) -> BTreeSet<WireKey> {
    let order: Vec<EntityId> = bp.entities().map(|(id, _)| id).collect();
    let index = |id: EntityId| order.iter().position(|o| *o == id).unwrap();
    bp.circuit_wires()
        .iter()
        .map(|w| {
            let (a, b) = w.ends();
            let a = (index(a.0), a.1.number());
            let b = (index(b.0), b.1.number());
            (w.color.as_str(), a.min(b), a.max(b))
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Export then import keeps entities, limits, and wire topology.
    #[test]
    fn export_import_keeps_layout(
        slots in proptest::collection::vec(arb_slot(), 1..8),
        links in proptest::collection::vec(arb_link(), 0..12),
    ) {
        let bp = build(&slots, &links);
        let v = bp.to_value();
        let reg = PrototypeRegistry::vanilla();
        let (back, _) = Blueprint::from_value(&v, reg, &DraftConfig::default()).unwrap();

        prop_assert_eq!(back.len(), bp.len());
        for ((_, before), (_, after)) in bp.entities().zip(back.entities()) {
            prop_assert_eq!(before.name(), after.name());
            prop_assert_eq!(before.tile_position(), after.tile_position());
            prop_assert_eq!(before.bar(), after.bar());
        }
        prop_assert_eq!(back.circuit_wires().len(), bp.circuit_wires().len());
        prop_assert_eq!(wire_set(&back), wire_set(&bp));
    }
}
