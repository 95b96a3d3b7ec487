//! Cross-crate layout tests: train stations with schedules, power networks
//! through a switch, modded entities under each validation mode, and nested
//! books.

use draftline_blueprint::blueprint::{Blueprint, BlueprintError, CopperSide, PowerWire, WireColor};
use draftline_blueprint::schedule::{Schedule, ScheduleStop, WaitCondition};
use draftline_blueprint::tile::Tile;
use draftline_blueprint::{BlueprintBook, Blueprintable};
use draftline_core::condition::{Comparator, Condition};
use draftline_core::config::{DraftConfig, ValidationMode};
use draftline_core::diagnostic::DraftWarning;
use draftline_core::error::DraftError;
use draftline_core::geometry::{Direction, TilePosition, Vector};
use draftline_core::id::{CircuitSide, EntityId};
use draftline_core::kind::EntityKind;
use draftline_core::test_utils::*;
use draftline_data::registry::PrototypeRegistry;
use draftline_entity::Entity;
use serde_json::json;

// ============================================================================
// Shared helpers
// ============================================================================

fn reg() -> &'static PrototypeRegistry {
    PrototypeRegistry::vanilla()
}

fn place(bp: &mut Blueprint, name: &str, x: i32, y: i32) -> EntityId {
    let mut e = Entity::new(reg(), name).unwrap();
    e.set_tile_position(TilePosition::new(x, y));
    bp.add_entity(e).unwrap()
}

/// A north-facing stop at (2, 0) beside a vertical rail, with a locomotive
/// and a cargo wagon parked on the rail.
fn build_station() -> (Blueprint, EntityId, EntityId) {
    let mut bp = Blueprint::new();
    bp.label = Some("Iron pickup".into());
    for y in (0..14).step_by(2) {
        place(&mut bp, "straight-rail", 0, y);
    }
    let mut stop = Entity::new(reg(), "train-stop").unwrap();
    stop.set_tile_position(TilePosition::new(2, 0));
    stop.set_station(Some("Iron pickup")).unwrap();
    stop.set_manual_trains_limit(Some(2)).unwrap();
    bp.add_entity(stop).unwrap();

    let mut loco = Entity::new(reg(), "locomotive").unwrap();
    loco.set_position(Vector::new(1.0, 3.0));
    loco.set_orientation(Some(0.0)).unwrap();
    loco.set_item_request("coal", 10).unwrap();
    let loco = bp.add_entity(loco).unwrap();

    let mut wagon = Entity::new(reg(), "cargo-wagon").unwrap();
    wagon.set_position(Vector::new(1.0, 10.0));
    wagon.set_orientation(Some(0.0)).unwrap();
    let wagon = bp.add_entity(wagon).unwrap();
    (bp, loco, wagon)
}

// ============================================================================
// Test 1: Train station with a schedule
// ============================================================================

#[test]
fn station_schedule_survives_export() {
    let (mut bp, loco, _) = build_station();
    let mut schedule = Schedule::new();
    schedule.add_locomotive(loco);
    schedule.add_stop(
        ScheduleStop::new("Iron pickup")
            .with(WaitCondition::item_count(Condition::new(
                Some(iron_plate()),
                Comparator::Gte,
                2000,
            )))
            .with(WaitCondition::inactivity(300).and()),
    );
    schedule.add_stop(ScheduleStop::new("Smelter drop").with(WaitCondition::time(600)));
    bp.add_schedule(schedule).unwrap();

    let result = bp.validate(reg(), &DraftConfig::default());
    assert!(result.is_clean(), "{result:?}");

    let v = bp.to_value();
    let exported = &v["blueprint"]["schedules"][0];
    // Locomotive is the 9th entity: 7 rails, then the stop.
    assert_eq!(exported["locomotives"], json!([9]));
    assert_eq!(exported["schedule"][0]["wait_conditions"][1]["compare_type"], "and");

    let (back, warnings) = Blueprint::from_value(&v, reg(), &DraftConfig::default()).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(back.schedules().len(), 1);
    assert_eq!(back.schedules()[0].stops().len(), 2);
    let back_loco = back.schedules()[0].locomotives()[0];
    assert_eq!(back.get(back_loco).unwrap().kind(), EntityKind::Locomotive);
    assert_eq!(back.to_value(), v);
}

#[test]
fn schedule_needs_a_locomotive() {
    let (mut bp, _, wagon) = build_station();
    let mut schedule = Schedule::new();
    schedule.add_locomotive(wagon);
    assert!(matches!(bp.add_schedule(schedule), Err(BlueprintError::NotALocomotive(_))));
}

#[test]
fn removing_locomotive_clears_schedule_reference() {
    let (mut bp, loco, _) = build_station();
    let mut schedule = Schedule::new();
    schedule.add_locomotive(loco);
    bp.add_schedule(schedule).unwrap();
    bp.remove_entity(loco).unwrap();
    assert!(bp.schedules()[0].locomotives().is_empty());
    assert_eq!(bp.to_value()["blueprint"]["schedules"][0]["locomotives"], json!([]));
}

#[test]
fn rail_positions_snap_to_the_double_grid() {
    let mut rail = Entity::new(reg(), "straight-rail").unwrap();
    let warning = rail.set_tile_position(TilePosition::new(3, 5));
    assert!(matches!(warning, Some(DraftWarning::GridSnapped { .. })));
    assert_eq!(rail.tile_position(), TilePosition::new(2, 4));
}

// ============================================================================
// Test 2: Power network through a switch
// ============================================================================

#[test]
fn power_switch_network() {
    let mut bp = Blueprint::new();
    let left = place(&mut bp, "medium-electric-pole", 0, 0);
    let switch = place(&mut bp, "power-switch", 2, 0);
    let right = place(&mut bp, "medium-electric-pole", 5, 0);
    let far = place(&mut bp, "medium-electric-pole", 12, 0);

    bp.connect_power_switch(left, switch, CopperSide::Left).unwrap();
    bp.connect_power_switch(right, switch, CopperSide::Right).unwrap();
    bp.connect_power(right, far).unwrap();
    bp.connect_circuit(left, CircuitSide::Input, switch, CircuitSide::Input, WireColor::Green)
        .unwrap();

    let v = bp.to_value();
    let entities = &v["blueprint"]["entities"];
    assert_eq!(
        entities[1]["connections"],
        json!({
            "1": {"green": [{"entity_id": 1}]},
            "Cu0": [{"entity_id": 1, "wire_id": 0}],
            "Cu1": [{"entity_id": 3, "wire_id": 0}]
        })
    );
    assert_eq!(entities[2]["neighbours"], json!([4]));
    assert!(entities[0].get("neighbours").is_none());

    let (back, _) = Blueprint::from_value(&v, reg(), &DraftConfig::default()).unwrap();
    assert_eq!(back.power_wires().len(), 3);
    assert!(back
        .power_wires()
        .iter()
        .any(|w| matches!(w, PowerWire::Switch { side: CopperSide::Right, .. })));
    assert_eq!(back.circuit_wires().len(), 1);
}

#[test]
fn wire_reach_is_checked_when_enabled() {
    let mut bp = Blueprint::new();
    let a = place(&mut bp, "medium-electric-pole", 0, 0);
    let b = place(&mut bp, "medium-electric-pole", 10, 0);
    bp.connect_power(a, b).unwrap();

    let warnings = bp.validate(reg(), &DraftConfig::default()).warnings;
    assert!(matches!(
        warnings.as_slice(),
        [DraftWarning::WireTooLong { max, .. }] if *max == 9.0
    ));

    let cfg = DraftConfig {
        check_wire_distance: false,
        ..DraftConfig::default()
    };
    assert!(bp.validate(reg(), &cfg).is_clean());
}

// ============================================================================
// Test 3: Modded entities by validation mode
// ============================================================================

fn modded_blueprint() -> serde_json::Value {
    json!({"blueprint": {
        "item": "blueprint",
        "entities": [
            {"entity_number": 1, "name": "modded-chest", "position": {"x": 0.5, "y": 0.5},
             "direction": 2, "mod_setting": 7,
             "connections": {"1": {"red": [{"entity_id": 2}]}}},
            {"entity_number": 2, "name": "iron-chest", "position": {"x": 2.5, "y": 0.5},
             "connections": {"1": {"red": [{"entity_id": 1}]}}}
        ],
        "version": 281479278886912u64
    }})
}

#[test]
fn strict_mode_rejects_modded_entities() {
    let err =
        Blueprint::from_value(&modded_blueprint(), reg(), &DraftConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        BlueprintError::Draft(DraftError::UnknownEntity(name)) if name == "modded-chest"
    ));
}

#[test]
fn permissive_mode_keeps_modded_entities() {
    let v = modded_blueprint();
    let (bp, warnings) = Blueprint::from_value(&v, reg(), &DraftConfig::permissive()).unwrap();
    assert!(warnings
        .iter()
        .any(|w| matches!(w, DraftWarning::UnrecognizedKey { key, .. } if key == "mod_setting")));

    let (id, modded) = bp.entities().next().unwrap();
    assert_eq!(modded.kind(), EntityKind::Unknown);
    assert_eq!(modded.direction(), Direction::East);
    assert_eq!(bp.circuit_wires().len(), 1);
    assert!(bp.circuit_wires()[0].touches(id));

    let exported = bp.to_value();
    assert_eq!(exported["blueprint"]["entities"][0]["mod_setting"], 7);
    assert_eq!(exported, v);

    let report = bp.validate(reg(), &DraftConfig::permissive());
    assert!(report.is_ok());
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, DraftWarning::UnknownName { name, .. } if name == "modded-chest")));
}

#[test]
fn no_validation_mode_stays_silent() {
    let cfg = DraftConfig {
        mode: ValidationMode::None,
        check_overlaps: false,
        check_wire_distance: false,
        ..DraftConfig::default()
    };
    let (bp, _) = Blueprint::from_value(&modded_blueprint(), reg(), &cfg).unwrap();
    assert!(bp.validate(reg(), &cfg).is_clean());
}

// ============================================================================
// Test 4: Books
// ============================================================================

#[test]
fn nested_books_round_trip() {
    let (station, _, _) = build_station();
    let mut floor = Blueprint::new();
    floor.label = Some("Concrete".into());
    for x in 0..4 {
        floor.add_tile(Tile::new("concrete", x, 0));
    }

    let mut inner = BlueprintBook::new();
    inner.label = Some("Trains".into());
    inner.push(station);

    let mut outer = BlueprintBook::new();
    outer.push(floor);
    outer.push(inner);
    outer.set_active_index(1).unwrap();
    outer.icons.set(0, Some(coal())).unwrap();

    let s = outer.to_string().unwrap();
    let (item, warnings) = Blueprintable::from_string(&s, reg(), &DraftConfig::default()).unwrap();
    assert!(warnings.is_empty());
    let Blueprintable::Book(back) = item else {
        panic!("expected a book");
    };
    assert_eq!(back.active_index(), 1);
    assert_eq!(back.contents()[0].label(), Some("Concrete"));
    let Blueprintable::Book(trains) = &back.contents()[1] else {
        panic!("expected a nested book");
    };
    assert_eq!(trains.contents()[0].label(), Some("Iron pickup"));
    assert_eq!(back.to_value(), outer.to_value());
    assert!(back.validate(reg(), &DraftConfig::default()).is_clean());
}
