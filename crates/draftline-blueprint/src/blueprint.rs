//! The blueprint container: entities, wires, tiles, and schedules.
//!
//! Entities live in a `SlotMap` keyed by [`EntityId`] so ids survive removal
//! of other entities. Wires are owned here rather than by the entities; on
//! export each wire is written from both ends as `connections`/`neighbours`
//! referring to `entity_number`s, which are assigned 1..N in insertion order.

use std::collections::HashMap;

use draftline_core::capability::Capabilities;
use draftline_core::color::Color;
use draftline_core::config::{DraftConfig, ValidationMode};
use draftline_core::diagnostic::{DraftWarning, ValidationResult};
use draftline_core::error::DraftError;
use draftline_core::geometry::TilePosition;
use draftline_core::id::{CircuitSide, EntityId};
use draftline_core::kind::EntityKind;
use draftline_core::value::{
    as_array, as_bool, as_i32, as_object, as_str, as_u32, as_u64, join, require,
};
use draftline_data::registry::PrototypeRegistry;
use draftline_entity::Entity;
use serde_json::{Map, Value, json};
use slotmap::{SecondaryMap, SlotMap};

use crate::codec::{self, CodecError};
use crate::icons::Icons;
use crate::schedule::Schedule;
use crate::spatial::{SpatialError, SpatialIndex};
use crate::tile::Tile;
use crate::version::Version;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from blueprint editing and parsing.
#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("an entity with key '{0}' already exists")]
    DuplicateKey(String),
    #[error("entity not found in blueprint")]
    EntityNotFound,
    #[error("'{0}' cannot be connected with circuit wires")]
    NotCircuitConnectable(String),
    #[error("'{0}' has no output circuit side")]
    NoOutputSide(String),
    #[error("cannot connect a circuit side to itself")]
    SelfConnection,
    #[error("'{0}' is not an electric pole")]
    NotAPole(String),
    #[error("'{0}' is not a power switch")]
    NotAPowerSwitch(String),
    #[error("'{0}' is not a locomotive")]
    NotALocomotive(String),
    #[error("no entity has entity_number {0}")]
    UnknownEntityNumber(u64),
    #[error("entity_number {0} is used twice")]
    DuplicateEntityNumber(u64),
    #[error("expected a {expected} string, found '{found}'")]
    WrongRoot { expected: &'static str, found: String },
    #[error("unrecognized blueprint key '{0}'")]
    UnknownKey(String),
}

// ---------------------------------------------------------------------------
// Wires
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WireColor {
    Red,
    Green,
}

impl WireColor {
    pub fn as_str(self) -> &'static str {
        match self {
            WireColor::Red => "red",
            WireColor::Green => "green",
        }
    }
}

/// One end of a circuit wire.
pub type CircuitEnd = (EntityId, CircuitSide);

/// A red or green wire. Ends are stored in ascending order so the same wire
/// added from either end compares equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CircuitWire {
    pub color: WireColor,
    a: CircuitEnd,
    b: CircuitEnd,
}

impl CircuitWire {
    pub fn new(color: WireColor, a: CircuitEnd, b: CircuitEnd) -> Self {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        Self { color, a, b }
    }

    pub fn ends(&self) -> (CircuitEnd, CircuitEnd) {
        (self.a, self.b)
    }

    pub fn touches(&self, id: EntityId) -> bool {
        self.a.0 == id || self.b.0 == id
    }
}

/// Copper terminal of a power switch: `Cu0` (left) or `Cu1` (right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CopperSide {
    Left,
    Right,
}

impl CopperSide {
    pub fn key(self) -> &'static str {
        match self {
            CopperSide::Left => "Cu0",
            CopperSide::Right => "Cu1",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "Cu0" => Some(CopperSide::Left),
            "Cu1" => Some(CopperSide::Right),
            _ => None,
        }
    }
}

/// A copper wire between two poles, or from a pole to a switch terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerWire {
    Poles(EntityId, EntityId),
    Switch {
        pole: EntityId,
        switch: EntityId,
        side: CopperSide,
    },
}

impl PowerWire {
    fn poles(a: EntityId, b: EntityId) -> Self {
        if a <= b { PowerWire::Poles(a, b) } else { PowerWire::Poles(b, a) }
    }

    pub fn touches(&self, id: EntityId) -> bool {
        match *self {
            PowerWire::Poles(a, b) => a == id || b == id,
            PowerWire::Switch { pole, switch, .. } => pole == id || switch == id,
        }
    }

    fn between(&self, x: EntityId, y: EntityId) -> bool {
        match *self {
            PowerWire::Poles(a, b) => (a, b) == (x, y) || (a, b) == (y, x),
            PowerWire::Switch { pole, switch, .. } => {
                (pole, switch) == (x, y) || (pole, switch) == (y, x)
            }
        }
    }

    fn endpoints(&self) -> (EntityId, EntityId) {
        match *self {
            PowerWire::Poles(a, b) => (a, b),
            PowerWire::Switch { pole, switch, .. } => (pole, switch),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapping
// ---------------------------------------------------------------------------

/// Grid size for snapping, in tiles. Both sides are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapGrid {
    width: u32,
    height: u32,
}

impl SnapGrid {
    pub fn new(width: u32, height: u32) -> Result<Self, DraftError> {
        if width == 0 || height == 0 {
            return Err(DraftError::invalid("snap-to-grid", "sides must be at least 1"));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

// ---------------------------------------------------------------------------
// Blueprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Blueprint {
    pub label: Option<String>,
    pub label_color: Option<Color>,
    pub description: Option<String>,
    pub icons: Icons,
    pub version: Version,
    snap_to_grid: Option<SnapGrid>,
    absolute_snapping: bool,
    position_relative_to_grid: Option<TilePosition>,
    entities: SlotMap<EntityId, Entity>,
    order: Vec<EntityId>,
    tiles: Vec<Tile>,
    circuit_wires: Vec<CircuitWire>,
    power_wires: Vec<PowerWire>,
    schedules: Vec<Schedule>,
    extra: Map<String, Value>,
}

impl Blueprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty blueprint stamped with the configured game version.
    pub fn with_config(cfg: &DraftConfig) -> Self {
        Self {
            version: Version::from(cfg.version),
            ..Self::default()
        }
    }

    // -- Snapping --

    pub fn snap_to_grid(&self) -> Option<SnapGrid> {
        self.snap_to_grid
    }

    /// Clearing the grid also clears absolute snapping and its offset.
    pub fn set_snap_to_grid(&mut self, grid: Option<SnapGrid>) {
        self.snap_to_grid = grid;
        if grid.is_none() {
            self.absolute_snapping = false;
            self.position_relative_to_grid = None;
        }
    }

    pub fn absolute_snapping(&self) -> bool {
        self.absolute_snapping
    }

    pub fn set_absolute_snapping(&mut self, on: bool) -> Result<(), DraftError> {
        if on && self.snap_to_grid.is_none() {
            return Err(DraftError::invalid("absolute-snapping", "requires snap-to-grid"));
        }
        self.absolute_snapping = on;
        Ok(())
    }

    pub fn position_relative_to_grid(&self) -> Option<TilePosition> {
        self.position_relative_to_grid
    }

    pub fn set_position_relative_to_grid(
        &mut self,
        offset: Option<TilePosition>,
    ) -> Result<(), DraftError> {
        if offset.is_some() && !self.absolute_snapping {
            return Err(DraftError::invalid(
                "position-relative-to-grid",
                "requires absolute snapping",
            ));
        }
        self.position_relative_to_grid = offset;
        Ok(())
    }

    // -- Entities --

    /// Add an entity. Its user key, if any, must not be in use.
    pub fn add_entity(&mut self, entity: Entity) -> Result<EntityId, BlueprintError> {
        if let Some(key) = entity.key() {
            if self.find_by_key(key).is_some() {
                return Err(BlueprintError::DuplicateKey(key.to_string()));
            }
        }
        let name = entity.name().to_string();
        let id = self.entities.insert(entity);
        self.order.push(id);
        tracing::debug!(entity = %name, ?id, "added entity");
        Ok(id)
    }

    /// Remove an entity together with its wires and schedule references.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(id)?;
        self.order.retain(|e| *e != id);
        self.circuit_wires.retain(|w| !w.touches(id));
        self.power_wires.retain(|w| !w.touches(id));
        for schedule in &mut self.schedules {
            schedule.forget_locomotive(id);
        }
        Some(entity)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn find_by_key(&self, key: &str) -> Option<EntityId> {
        self.entities().find(|(_, e)| e.key() == Some(key)).map(|(id, _)| id)
    }

    /// Entities in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.order.iter().filter_map(|id| self.entities.get(*id).map(|e| (*id, e)))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities with at least one tile inside the inclusive rectangle.
    pub fn find_entities_in_area(&self, min: TilePosition, max: TilePosition) -> Vec<EntityId> {
        self.entities()
            .filter(|(_, e)| {
                let origin = e.tile_position();
                let corner = e.footprint().bottom_right(origin);
                origin.x <= max.x && corner.x >= min.x && origin.y <= max.y && corner.y >= min.y
            })
            .map(|(id, _)| id)
            .collect()
    }

    fn entity(&self, id: EntityId) -> Result<&Entity, BlueprintError> {
        self.entities.get(id).ok_or(BlueprintError::EntityNotFound)
    }

    // -- Circuit wires --

    pub fn circuit_wires(&self) -> &[CircuitWire] {
        &self.circuit_wires
    }

    /// Connect two circuit terminals. Connecting an existing wire again is
    /// a no-op.
    pub fn connect_circuit(
        &mut self,
        a: EntityId,
        side_a: CircuitSide,
        b: EntityId,
        side_b: CircuitSide,
        color: WireColor,
    ) -> Result<(), BlueprintError> {
        for (id, side) in [(a, side_a), (b, side_b)] {
            let entity = self.entity(id)?;
            let caps = entity.capabilities();
            if !caps.contains(Capabilities::CIRCUIT_WIRE) {
                return Err(BlueprintError::NotCircuitConnectable(entity.name().to_string()));
            }
            if side == CircuitSide::Output && !caps.contains(Capabilities::DUAL_CIRCUIT) {
                return Err(BlueprintError::NoOutputSide(entity.name().to_string()));
            }
        }
        if a == b && side_a == side_b {
            return Err(BlueprintError::SelfConnection);
        }
        self.insert_circuit(CircuitWire::new(color, (a, side_a), (b, side_b)));
        Ok(())
    }

    /// Returns whether a wire was removed.
    pub fn disconnect_circuit(
        &mut self,
        a: EntityId,
        side_a: CircuitSide,
        b: EntityId,
        side_b: CircuitSide,
        color: WireColor,
    ) -> bool {
        let wire = CircuitWire::new(color, (a, side_a), (b, side_b));
        let before = self.circuit_wires.len();
        self.circuit_wires.retain(|w| *w != wire);
        before != self.circuit_wires.len()
    }

    fn insert_circuit(&mut self, wire: CircuitWire) {
        if !self.circuit_wires.contains(&wire) {
            self.circuit_wires.push(wire);
        }
    }

    // -- Power wires --

    pub fn power_wires(&self) -> &[PowerWire] {
        &self.power_wires
    }

    /// Connect two electric poles with copper wire.
    pub fn connect_power(&mut self, a: EntityId, b: EntityId) -> Result<(), BlueprintError> {
        for id in [a, b] {
            let entity = self.entity(id)?;
            if entity.kind() != EntityKind::ElectricPole {
                return Err(BlueprintError::NotAPole(entity.name().to_string()));
            }
        }
        if a == b {
            return Err(BlueprintError::SelfConnection);
        }
        self.insert_power(PowerWire::poles(a, b));
        Ok(())
    }

    /// Connect a pole to one copper terminal of a power switch.
    pub fn connect_power_switch(
        &mut self,
        pole: EntityId,
        switch: EntityId,
        side: CopperSide,
    ) -> Result<(), BlueprintError> {
        let p = self.entity(pole)?;
        if p.kind() != EntityKind::ElectricPole {
            return Err(BlueprintError::NotAPole(p.name().to_string()));
        }
        let s = self.entity(switch)?;
        if !s.capabilities().contains(Capabilities::COPPER_TERMINALS) {
            return Err(BlueprintError::NotAPowerSwitch(s.name().to_string()));
        }
        self.insert_power(PowerWire::Switch { pole, switch, side });
        Ok(())
    }

    /// Remove every copper wire between `a` and `b`. Returns whether any
    /// wire was removed.
    pub fn disconnect_power(&mut self, a: EntityId, b: EntityId) -> bool {
        let before = self.power_wires.len();
        self.power_wires.retain(|w| !w.between(a, b));
        before != self.power_wires.len()
    }

    fn insert_power(&mut self, wire: PowerWire) {
        if !self.power_wires.contains(&wire) {
            self.power_wires.push(wire);
        }
    }

    // -- Tiles and schedules --

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Place a tile, replacing any tile already at that position.
    pub fn add_tile(&mut self, tile: Tile) {
        match self.tiles.iter_mut().find(|t| t.position == tile.position) {
            Some(existing) => *existing = tile,
            None => self.tiles.push(tile),
        }
    }

    pub fn remove_tile(&mut self, position: TilePosition) -> Option<Tile> {
        let index = self.tiles.iter().position(|t| t.position == position)?;
        Some(self.tiles.remove(index))
    }

    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    /// Add a schedule. Every locomotive must be a locomotive in this blueprint.
    /// Attach a schedule. Every locomotive it names must be a locomotive in
    /// this blueprint; entities of unknown kind are let through.
    pub fn add_schedule(&mut self, schedule: Schedule) -> Result<(), BlueprintError> {
        for id in schedule.locomotives() {
            let entity = self.entity(*id)?;
            if !matches!(entity.kind(), EntityKind::Locomotive | EntityKind::Unknown) {
                return Err(BlueprintError::NotALocomotive(entity.name().to_string()));
            }
        }
        self.schedules.push(schedule);
        Ok(())
    }

    pub fn remove_schedule(&mut self, index: usize) -> Option<Schedule> {
        (index < self.schedules.len()).then(|| self.schedules.remove(index))
    }

    /// Keys kept verbatim by permissive parsing.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    // -- Validation --

    /// Validate every entity, the icons, key uniqueness, and (as configured)
    /// overlaps and wire lengths.
    pub fn validate(&self, reg: &PrototypeRegistry, cfg: &DraftConfig) -> ValidationResult {
        let mut result = ValidationResult::new();
        for (_, entity) in self.entities() {
            result.merge(entity.validate(reg, cfg.mode));
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (_, entity) in self.entities() {
            if let Some(key) = entity.key() {
                *seen.entry(key).or_default() += 1;
            }
        }
        let mut duplicates: Vec<&str> =
            seen.into_iter().filter(|(_, n)| *n > 1).map(|(k, _)| k).collect();
        duplicates.sort_unstable();
        for key in duplicates {
            let message = format!("'{key}' is used by more than one entity");
            result.push_error(DraftError::invalid("key", message));
        }

        if cfg.mode.checks_registry() {
            self.icons.check(reg, cfg.mode, &mut result);
        }
        self.layout_checks(cfg, &mut result);
        result
    }

    fn layout_checks(&self, cfg: &DraftConfig, result: &mut ValidationResult) {
        if cfg.check_overlaps {
            for warning in self.overlaps() {
                result.push_warning(warning);
            }
        }
        if cfg.check_wire_distance {
            for warning in self.long_wires() {
                result.push_warning(warning);
            }
        }
    }

    /// Rails may cross each other and rolling stock sits on rails, so both
    /// are left out of the overlap index.
    fn overlaps(&self) -> Vec<DraftWarning> {
        let mut index = SpatialIndex::new();
        let mut warnings = Vec::new();
        for (id, entity) in self.entities() {
            let kind = entity.kind();
            let rail = matches!(kind, EntityKind::StraightRail | EntityKind::CurvedRail);
            if rail || kind.is_rolling_stock() {
                continue;
            }
            if let Err(SpatialError::Occupied { by, at }) =
                index.place(id, entity.tile_position(), entity.footprint())
            {
                let other = self.entities.get(by).map(Entity::name).unwrap_or_default();
                warnings.push(DraftWarning::Overlapping {
                    a: entity.name().to_string(),
                    b: other.to_string(),
                    at: (at.x, at.y),
                });
            }
        }
        warnings
    }

    fn long_wires(&self) -> Vec<DraftWarning> {
        let mut warnings = Vec::new();
        let mut check = |a: EntityId, b: EntityId, reach: fn(&Entity) -> Option<f64>| {
            let (Some(ea), Some(eb)) = (self.entities.get(a), self.entities.get(b)) else {
                return;
            };
            let max = match (reach(ea), reach(eb)) {
                (Some(x), Some(y)) => x.min(y),
                (Some(x), None) | (None, Some(x)) => x,
                (None, None) => return,
            };
            let distance = ea.position().distance(&eb.position());
            if distance > max {
                warnings.push(DraftWarning::WireTooLong {
                    a: ea.name().to_string(),
                    b: eb.name().to_string(),
                    distance,
                    max,
                });
            }
        };
        for wire in &self.circuit_wires {
            let (a, b) = wire.ends();
            check(a.0, b.0, |e| e.prototype().circuit_wire_max_distance);
        }
        for wire in &self.power_wires {
            let (a, b) = wire.endpoints();
            check(a, b, |e| e.prototype().maximum_wire_distance);
        }
        warnings
    }

    // -- JSON --

    /// `entity_number` for every entity, 1..N in insertion order.
    pub fn entity_numbers(&self) -> SecondaryMap<EntityId, u64> {
        let mut numbers = SecondaryMap::new();
        for (n, id) in self.order.iter().enumerate() {
            numbers.insert(*id, n as u64 + 1);
            tracing::trace!(?id, entity_number = n + 1, "assigned entity number");
        }
        numbers
    }

    /// Export as `{"blueprint": {...}}`.
    pub fn to_value(&self) -> Value {
        let numbers = self.entity_numbers();
        let mut bp = Map::new();
        bp.insert("item".into(), "blueprint".into());
        if let Some(label) = &self.label {
            bp.insert("label".into(), label.clone().into());
        }
        if let Some(color) = &self.label_color {
            bp.insert("label_color".into(), color.to_value());
        }
        if let Some(description) = &self.description {
            bp.insert("description".into(), description.clone().into());
        }
        if !self.icons.is_empty() {
            bp.insert("icons".into(), self.icons.to_value());
        }
        if !self.order.is_empty() {
            let entities: Vec<Value> = self
                .entities()
                .map(|(id, e)| self.entity_value(id, e, &numbers))
                .collect();
            bp.insert("entities".into(), Value::Array(entities));
        }
        if !self.tiles.is_empty() {
            bp.insert("tiles".into(), self.tiles.iter().map(Tile::to_value).collect());
        }
        if !self.schedules.is_empty() {
            let schedules: Vec<Value> = self
                .schedules
                .iter()
                .map(|s| s.to_value(|id| numbers.get(id).copied()))
                .collect();
            bp.insert("schedules".into(), Value::Array(schedules));
        }
        if let Some(grid) = self.snap_to_grid {
            bp.insert("snap-to-grid".into(), json!({"x": grid.width, "y": grid.height}));
            if self.absolute_snapping {
                bp.insert("absolute-snapping".into(), true.into());
            }
            if let Some(offset) = self.position_relative_to_grid {
                bp.insert(
                    "position-relative-to-grid".into(),
                    json!({"x": offset.x, "y": offset.y}),
                );
            }
        }
        for (k, v) in &self.extra {
            bp.insert(k.clone(), v.clone());
        }
        bp.insert("version".into(), self.version.pack().into());

        let mut root = Map::new();
        root.insert("blueprint".into(), Value::Object(bp));
        Value::Object(root)
    }

    fn entity_value(
        &self,
        id: EntityId,
        entity: &Entity,
        numbers: &SecondaryMap<EntityId, u64>,
    ) -> Value {
        let mut map = Map::new();
        map.insert("entity_number".into(), numbers.get(id).copied().unwrap_or(0).into());
        if let Value::Object(fields) = entity.to_value() {
            map.extend(fields);
        }

        let mut connections = Map::new();
        for wire in &self.circuit_wires {
            let (a, b) = wire.ends();
            for (end, other) in [(a, b), (b, a)] {
                if end.0 != id {
                    continue;
                }
                let Some(&other_number) = numbers.get(other.0) else { continue };
                let mut target = Map::new();
                target.insert("entity_id".into(), other_number.into());
                let dual = self
                    .entities
                    .get(other.0)
                    .is_some_and(|e| e.capabilities().contains(Capabilities::DUAL_CIRCUIT));
                if dual {
                    target.insert("circuit_id".into(), other.1.number().into());
                }
                push_entry(
                    &mut connections,
                    &end.1.number().to_string(),
                    Some(wire.color.as_str()),
                    Value::Object(target),
                );
            }
        }

        let mut neighbours = Vec::new();
        for wire in &self.power_wires {
            match *wire {
                PowerWire::Poles(a, b) if a == id || b == id => {
                    let other = if a == id { b } else { a };
                    if let Some(&n) = numbers.get(other) {
                        neighbours.push(Value::from(n));
                    }
                }
                PowerWire::Switch { pole, switch, side } if switch == id => {
                    if let Some(&n) = numbers.get(pole) {
                        let target = json!({"entity_id": n, "wire_id": 0});
                        push_entry(&mut connections, side.key(), None, target);
                    }
                }
                _ => {}
            }
        }

        if !connections.is_empty() {
            map.insert("connections".into(), Value::Object(connections));
        }
        if !neighbours.is_empty() {
            map.insert("neighbours".into(), Value::Array(neighbours));
        }
        Value::Object(map)
    }

    /// Parse `{"blueprint": {...}}`.
    ///
    /// Entities are parsed with `cfg.mode`. Wires listed from both ends are
    /// kept once. In strict mode an unrecognized top-level key is an error;
    /// otherwise it is kept and reported.
    pub fn from_value(
        value: &Value,
        reg: &PrototypeRegistry,
        cfg: &DraftConfig,
    ) -> Result<(Blueprint, Vec<DraftWarning>), BlueprintError> {
        let root = as_object("", value)?;
        let Some(inner) = root.get("blueprint") else {
            let found = root.keys().next().cloned().unwrap_or_default();
            return Err(BlueprintError::WrongRoot {
                expected: "blueprint",
                found,
            });
        };
        let map = as_object("blueprint", inner)?;
        let mut bp = Blueprint::new();
        let mut warnings = Vec::new();
        let mut numbers: HashMap<u64, EntityId> = HashMap::new();

        if let Some(v) = map.get("entities") {
            for (i, entity_value) in as_array("entities", v)?.iter().enumerate() {
                let number = match entity_value.get("entity_number") {
                    Some(n) => as_u64("entities.entity_number", n)?,
                    None => i as u64 + 1,
                };
                let (entity, found) = Entity::from_value(entity_value, reg, cfg.mode)?;
                warnings.extend(found);
                let id = bp.add_entity(entity)?;
                if numbers.insert(number, id).is_some() {
                    return Err(BlueprintError::DuplicateEntityNumber(number));
                }
            }
            for entity_value in as_array("entities", v)? {
                bp.read_wires(entity_value, &numbers)?;
            }
        }

        for (key, v) in map {
            match key.as_str() {
                "item" | "entities" | "version" => {}
                "label" => bp.label = Some(as_str("label", v)?.to_string()),
                "label_color" => bp.label_color = Some(Color::from_value("label_color", v)?),
                "description" => bp.description = Some(as_str("description", v)?.to_string()),
                "icons" => bp.icons = Icons::from_value(v, reg)?,
                "tiles" => {
                    for t in as_array("tiles", v)? {
                        bp.add_tile(Tile::from_value(t)?);
                    }
                }
                "schedules" => {
                    for s in as_array("schedules", v)? {
                        let schedule = Schedule::from_value(s, |n| numbers.get(&n).copied(), reg)?;
                        bp.add_schedule(schedule)?;
                    }
                }
                "snap-to-grid" => {
                    let grid = as_object(key, v)?;
                    let width = as_u32("snap-to-grid.x", require(grid, key, "x")?)?;
                    let height = as_u32("snap-to-grid.y", require(grid, key, "y")?)?;
                    bp.snap_to_grid = Some(SnapGrid::new(width, height)?);
                }
                "absolute-snapping" => bp.absolute_snapping = as_bool(key, v)?,
                "position-relative-to-grid" => {
                    let offset = as_object(key, v)?;
                    let x = as_i32(&join(key, "x"), require(offset, key, "x")?)?;
                    let y = as_i32(&join(key, "y"), require(offset, key, "y")?)?;
                    bp.position_relative_to_grid = Some(TilePosition::new(x, y));
                }
                _ if cfg.mode == ValidationMode::Strict => {
                    return Err(BlueprintError::UnknownKey(key.clone()));
                }
                _ => {
                    warnings.push(DraftWarning::UnrecognizedKey {
                        entity: "blueprint".into(),
                        key: key.clone(),
                    });
                    bp.extra.insert(key.clone(), v.clone());
                }
            }
        }
        if let Some(v) = map.get("version") {
            bp.version = Version::unpack(as_u64("version", v)?);
        }

        let mut result = ValidationResult::new();
        if cfg.mode.checks_registry() {
            bp.icons.check(reg, cfg.mode, &mut result);
        }
        bp.layout_checks(cfg, &mut result);
        warnings.extend(result.into_result()?);
        Ok((bp, warnings))
    }

    /// Rebuild wires from one entity's `connections` and `neighbours`.
    fn read_wires(
        &mut self,
        value: &Value,
        numbers: &HashMap<u64, EntityId>,
    ) -> Result<(), BlueprintError> {
        let lookup = |n: u64| {
            numbers
                .get(&n)
                .copied()
                .ok_or(BlueprintError::UnknownEntityNumber(n))
        };
        let target_id = |path: &str, t: &Map<String, Value>| -> Result<EntityId, BlueprintError> {
            lookup(as_u64(&join(path, "entity_id"), require(t, path, "entity_id")?)?)
        };
        let Some(number) = value.get("entity_number") else {
            if value.get("connections").is_some() || value.get("neighbours").is_some() {
                return Err(DraftError::MissingField("entities.entity_number".into()).into());
            }
            return Ok(());
        };
        let this = lookup(as_u64("entities.entity_number", number)?)?;

        if let Some(conns) = value.get("connections") {
            for (key, v) in as_object("connections", conns)? {
                let field = join("connections", key);
                if let Some(side) = CopperSide::from_key(key) {
                    for target in as_array(&field, v)? {
                        let t = as_object(&field, target)?;
                        let pole = target_id(&field, t)?;
                        self.add_power_wire(PowerWire::Switch { pole, switch: this, side })?;
                    }
                    continue;
                }
                let side = key
                    .parse::<u64>()
                    .ok()
                    .and_then(CircuitSide::from_number)
                    .ok_or_else(|| {
                        DraftError::invalid(&field, "expected '1', '2', 'Cu0' or 'Cu1'")
                    })?;
                for (color_key, color) in [("red", WireColor::Red), ("green", WireColor::Green)] {
                    let Some(list) = v.get(color_key) else { continue };
                    let list_field = join(&field, color_key);
                    for target in as_array(&list_field, list)? {
                        let t = as_object(&list_field, target)?;
                        let other = target_id(&list_field, t)?;
                        let other_side = match t.get("circuit_id") {
                            Some(c) => {
                                let circuit_field = join(&list_field, "circuit_id");
                                CircuitSide::from_number(as_u64(&circuit_field, c)?).ok_or_else(
                                    || DraftError::invalid(&circuit_field, "must be 1 or 2"),
                                )?
                            }
                            None => CircuitSide::Input,
                        };
                        let wire = CircuitWire::new(color, (this, side), (other, other_side));
                        self.add_circuit_wire(wire)?;
                    }
                }
            }
        }

        if let Some(list) = value.get("neighbours") {
            for n in as_array("neighbours", list)? {
                let other = lookup(as_u64("neighbours", n)?)?;
                self.add_power_wire(PowerWire::poles(this, other))?;
            }
        }
        Ok(())
    }

    /// Parsed wires are checked unless an end is an unknown (modded) entity.
    fn add_circuit_wire(&mut self, wire: CircuitWire) -> Result<(), BlueprintError> {
        let (a, b) = wire.ends();
        if self.any_unknown(a.0, b.0) {
            self.insert_circuit(wire);
            Ok(())
        } else {
            self.connect_circuit(a.0, a.1, b.0, b.1, wire.color)
        }
    }

    fn add_power_wire(&mut self, wire: PowerWire) -> Result<(), BlueprintError> {
        let (a, b) = wire.endpoints();
        if self.any_unknown(a, b) {
            self.insert_power(wire);
            return Ok(());
        }
        match wire {
            PowerWire::Poles(a, b) => self.connect_power(a, b),
            PowerWire::Switch { pole, switch, side } => {
                self.connect_power_switch(pole, switch, side)
            }
        }
    }

    fn any_unknown(&self, a: EntityId, b: EntityId) -> bool {
        [a, b]
            .iter()
            .any(|id| self.entities.get(*id).is_some_and(|e| e.kind() == EntityKind::Unknown))
    }

    /// Encode as a blueprint string.
    pub fn to_string(&self) -> Result<String, BlueprintError> {
        Ok(codec::encode(&self.to_value())?)
    }

    pub fn from_string(
        s: &str,
        reg: &PrototypeRegistry,
        cfg: &DraftConfig,
    ) -> Result<(Blueprint, Vec<DraftWarning>), BlueprintError> {
        Self::from_value(&codec::decode(s)?, reg, cfg)
    }
}

/// Append `entry` under `connections[side]` (or `connections[side][color]`).
fn push_entry(connections: &mut Map<String, Value>, side: &str, color: Option<&str>, entry: Value) {
    let slot = connections
        .entry(side.to_string())
        .or_insert_with(|| match color {
            Some(_) => Value::Object(Map::new()),
            None => Value::Array(Vec::new()),
        });
    let list = match (color, slot) {
        (Some(c), Value::Object(by_color)) => by_color
            .entry(c.to_string())
            .or_insert_with(|| Value::Array(Vec::new())),
        (_, slot) => slot,
    };
    if let Value::Array(items) = list {
        items.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftline_core::geometry::Vector;
    use serde_json::json;

    fn reg() -> &'static PrototypeRegistry {
        PrototypeRegistry::vanilla()
    }

    fn add(bp: &mut Blueprint, name: &str, x: i32, y: i32) -> EntityId {
        let mut e = Entity::new(reg(), name).unwrap();
        e.set_tile_position(TilePosition::new(x, y));
        bp.add_entity(e).unwrap()
    }

    // ===========================================================================
    // Entities
    // ===========================================================================

    #[test]
    fn duplicate_key_rejected() {
        let mut bp = Blueprint::new();
        let mut a = Entity::new(reg(), "wooden-chest").unwrap();
        a.set_key(Some("input".into()));
        let b = a.clone();
        bp.add_entity(a).unwrap();
        assert!(matches!(bp.add_entity(b), Err(BlueprintError::DuplicateKey(k)) if k == "input"));
        assert!(bp.find_by_key("input").is_some());
    }

    #[test]
    fn remove_entity_drops_wires_and_schedule_refs() {
        let mut bp = Blueprint::new();
        let a = add(&mut bp, "small-electric-pole", 0, 0);
        let b = add(&mut bp, "small-electric-pole", 3, 0);
        let loco = add(&mut bp, "locomotive", 10, 0);
        bp.connect_power(a, b).unwrap();
        bp.connect_circuit(a, CircuitSide::Input, b, CircuitSide::Input, WireColor::Red).unwrap();
        let mut schedule = Schedule::new();
        schedule.add_locomotive(loco);
        bp.add_schedule(schedule).unwrap();

        bp.remove_entity(b).unwrap();
        bp.remove_entity(loco).unwrap();
        assert!(bp.circuit_wires().is_empty());
        assert!(bp.power_wires().is_empty());
        assert!(bp.schedules()[0].locomotives().is_empty());
        assert_eq!(bp.len(), 1);
        assert!(bp.remove_entity(b).is_none());
    }

    #[test]
    fn area_query() {
        let mut bp = Blueprint::new();
        let am = add(&mut bp, "assembling-machine-1", 0, 0);
        let chest = add(&mut bp, "wooden-chest", 10, 10);
        let area = |x0, y0, x1, y1| {
            bp.find_entities_in_area(TilePosition::new(x0, y0), TilePosition::new(x1, y1))
        };
        assert_eq!(area(2, 2, 5, 5), vec![am]);
        assert_eq!(area(10, 10, 10, 10), vec![chest]);
    }

    #[test]
    fn area_query_lists_overlapping_entities() {
        let mut bp = Blueprint::new();
        let a = add(&mut bp, "iron-chest", 4, 4);
        let b = add(&mut bp, "iron-chest", 4, 4);
        let found = bp.find_entities_in_area(TilePosition::new(4, 4), TilePosition::new(4, 4));
        assert_eq!(found, vec![a, b]);
    }

    #[test]
    fn entities_at_the_edge_of_the_grid() {
        let mut bp = Blueprint::new();
        let mut ids = Vec::new();
        for _ in 0..2 {
            let mut chest = Entity::new(reg(), "iron-chest").unwrap();
            chest.set_position(Vector::new(-3.0e9, 0.5));
            ids.push(bp.add_entity(chest).unwrap());
        }
        let far_east = add(&mut bp, "assembling-machine-1", i32::MAX, 0);

        let result = bp.validate(reg(), &DraftConfig::default());
        assert_eq!(result.warnings.len(), 1);
        assert!(matches!(
            &result.warnings[0],
            DraftWarning::Overlapping { at: (i32::MIN, 0), .. }
        ));

        let west = TilePosition::new(i32::MIN, 0);
        assert_eq!(bp.find_entities_in_area(west, west), ids);
        let east = TilePosition::new(i32::MAX, 0);
        assert_eq!(bp.find_entities_in_area(east, east), vec![far_east]);
    }

    // ===========================================================================
    // Wires
    // ===========================================================================

    #[test]
    fn circuit_rules() {
        let mut bp = Blueprint::new();
        let chest = add(&mut bp, "iron-chest", 0, 0);
        let combinator = add(&mut bp, "arithmetic-combinator", 2, 0);
        let pipe = add(&mut bp, "pipe", 4, 0);

        use CircuitSide::{Input, Output};
        use WireColor::{Green, Red};
        assert!(matches!(
            bp.connect_circuit(chest, Input, pipe, Input, Red),
            Err(BlueprintError::NotCircuitConnectable(_))
        ));
        assert!(matches!(
            bp.connect_circuit(chest, Output, combinator, Input, Red),
            Err(BlueprintError::NoOutputSide(_))
        ));
        assert!(matches!(
            bp.connect_circuit(combinator, Input, combinator, Input, Green),
            Err(BlueprintError::SelfConnection)
        ));
        bp.connect_circuit(combinator, Output, combinator, Input, Green).unwrap();

        bp.connect_circuit(chest, Input, combinator, Input, Red).unwrap();
        bp.connect_circuit(combinator, Input, chest, Input, Red).unwrap();
        assert_eq!(bp.circuit_wires().len(), 2);

        assert!(bp.disconnect_circuit(combinator, Input, chest, Input, Red));
        assert!(!bp.disconnect_circuit(combinator, Input, chest, Input, Red));
    }

    #[test]
    fn power_rules() {
        let mut bp = Blueprint::new();
        let pole = add(&mut bp, "medium-electric-pole", 0, 0);
        let switch = add(&mut bp, "power-switch", 2, 0);
        let chest = add(&mut bp, "iron-chest", 5, 0);

        assert!(matches!(bp.connect_power(pole, chest), Err(BlueprintError::NotAPole(_))));
        assert!(matches!(bp.connect_power(pole, pole), Err(BlueprintError::SelfConnection)));
        assert!(matches!(
            bp.connect_power_switch(pole, chest, CopperSide::Left),
            Err(BlueprintError::NotAPowerSwitch(_))
        ));
        bp.connect_power_switch(pole, switch, CopperSide::Right).unwrap();
        bp.connect_power_switch(pole, switch, CopperSide::Right).unwrap();
        assert_eq!(bp.power_wires().len(), 1);
        assert!(bp.disconnect_power(switch, pole));
    }

    // ===========================================================================
    // Validation
    // ===========================================================================

    #[test]
    fn overlap_is_a_warning() {
        let mut bp = Blueprint::new();
        add(&mut bp, "assembling-machine-1", 0, 0);
        add(&mut bp, "wooden-chest", 1, 1);
        let result = bp.validate(reg(), &DraftConfig::default());
        assert!(result.is_ok());
        assert_eq!(
            result.warnings,
            vec![DraftWarning::Overlapping {
                a: "wooden-chest".into(),
                b: "assembling-machine-1".into(),
                at: (1, 1)
            }]
        );

        let cfg = DraftConfig {
            check_overlaps: false,
            ..DraftConfig::default()
        };
        assert!(bp.validate(reg(), &cfg).is_clean());
    }

    #[test]
    fn crossing_rails_do_not_overlap() {
        let mut bp = Blueprint::new();
        add(&mut bp, "straight-rail", 0, 0);
        let mut crossing = Entity::new(reg(), "straight-rail").unwrap();
        crossing.set_direction(draftline_core::geometry::Direction::East).unwrap();
        crossing.set_tile_position(TilePosition::new(0, 0));
        bp.add_entity(crossing).unwrap();
        assert!(bp.validate(reg(), &DraftConfig::default()).is_clean());
    }

    #[test]
    fn long_wires_warn() {
        let mut bp = Blueprint::new();
        let a = add(&mut bp, "small-electric-pole", 0, 0);
        let b = add(&mut bp, "small-electric-pole", 8, 0);
        bp.connect_power(a, b).unwrap();
        let result = bp.validate(reg(), &DraftConfig::default());
        assert_eq!(result.warnings.len(), 1);
        assert!(matches!(
            result.warnings[0],
            DraftWarning::WireTooLong { distance, max, .. } if distance == 8.0 && max == 7.5
        ));
    }

    #[test]
    fn duplicate_keys_after_mutation() {
        let mut bp = Blueprint::new();
        let a = add(&mut bp, "wooden-chest", 0, 0);
        let b = add(&mut bp, "wooden-chest", 1, 0);
        bp.get_mut(a).unwrap().set_key(Some("x".into()));
        bp.get_mut(b).unwrap().set_key(Some("x".into()));
        let result = bp.validate(reg(), &DraftConfig::default());
        assert_eq!(result.errors.len(), 1);
    }

    // ===========================================================================
    // JSON
    // ===========================================================================

    #[test]
    fn export_numbers_and_connections() {
        let mut bp = Blueprint::new();
        bp.label = Some("Blinker".into());
        let lamp = add(&mut bp, "small-lamp", 0, 0);
        let decider = add(&mut bp, "decider-combinator", 2, 0);
        bp.connect_circuit(lamp, CircuitSide::Input, decider, CircuitSide::Output, WireColor::Green)
            .unwrap();

        let v = bp.to_value();
        let entities = &v["blueprint"]["entities"];
        assert_eq!(entities[0]["entity_number"], 1);
        assert_eq!(entities[1]["entity_number"], 2);
        assert_eq!(
            entities[0]["connections"],
            json!({"1": {"green": [{"entity_id": 2, "circuit_id": 2}]}})
        );
        assert_eq!(
            entities[1]["connections"],
            json!({"2": {"green": [{"entity_id": 1}]}})
        );
        assert_eq!(v["blueprint"]["version"], Version::default().pack());
        assert_eq!(v["blueprint"]["label"], "Blinker");
    }

    #[test]
    fn switch_and_neighbours_export() {
        let mut bp = Blueprint::new();
        let p1 = add(&mut bp, "medium-electric-pole", 0, 0);
        let p2 = add(&mut bp, "medium-electric-pole", 5, 0);
        let switch = add(&mut bp, "power-switch", 2, 2);
        bp.connect_power(p1, p2).unwrap();
        bp.connect_power_switch(p2, switch, CopperSide::Left).unwrap();

        let v = bp.to_value();
        let entities = &v["blueprint"]["entities"];
        assert_eq!(entities[0]["neighbours"], json!([2]));
        assert_eq!(entities[1]["neighbours"], json!([1]));
        assert_eq!(entities[2]["connections"], json!({"Cu0": [{"entity_id": 2, "wire_id": 0}]}));
    }

    #[test]
    fn parse_rebuilds_wires_once() {
        let v = json!({"blueprint": {
            "item": "blueprint",
            "entities": [
                {"entity_number": 1, "name": "small-electric-pole", "position": {"x": 0.5, "y": 0.5},
                 "neighbours": [2],
                 "connections": {"1": {"red": [{"entity_id": 2}]}}},
                {"entity_number": 2, "name": "small-electric-pole", "position": {"x": 3.5, "y": 0.5},
                 "neighbours": [1],
                 "connections": {"1": {"red": [{"entity_id": 1}]}}}
            ],
            "version": 281479278886912u64
        }});
        let (bp, warnings) = Blueprint::from_value(&v, reg(), &DraftConfig::default()).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(bp.circuit_wires().len(), 1);
        assert_eq!(bp.power_wires().len(), 1);
        assert_eq!(bp.to_value(), v);
    }

    #[test]
    fn parse_rejects_dangling_wire() {
        let v = json!({"blueprint": {"entities": [
            {"entity_number": 1, "name": "small-electric-pole", "position": [0.5, 0.5], "neighbours": [9]}
        ]}});
        let err = Blueprint::from_value(&v, reg(), &DraftConfig::default()).unwrap_err();
        assert!(matches!(err, BlueprintError::UnknownEntityNumber(9)));
    }

    #[test]
    fn parsed_schedules_must_name_locomotives() {
        let v = json!({"blueprint": {
            "entities": [
                {"entity_number": 1, "name": "cargo-wagon", "position": [1.0, 3.0], "orientation": 0.0}
            ],
            "schedules": [{"locomotives": [1], "schedule": [{"station": "Mine"}]}]
        }});
        let err = Blueprint::from_value(&v, reg(), &DraftConfig::permissive()).unwrap_err();
        assert!(matches!(err, BlueprintError::NotALocomotive(name) if name == "cargo-wagon"));
    }

    #[test]
    fn unknown_top_level_key_by_mode() {
        let v = json!({"blueprint": {"item": "blueprint", "wires": []}});
        assert!(matches!(
            Blueprint::from_value(&v, reg(), &DraftConfig::default()),
            Err(BlueprintError::UnknownKey(_))
        ));
        let (bp, warnings) = Blueprint::from_value(&v, reg(), &DraftConfig::permissive()).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(bp.to_value()["blueprint"]["wires"], json!([]));
    }

    #[test]
    fn wrong_root() {
        let v = json!({"blueprint_book": {}});
        assert!(matches!(
            Blueprint::from_value(&v, reg(), &DraftConfig::default()),
            Err(BlueprintError::WrongRoot { expected: "blueprint", .. })
        ));
    }

    #[test]
    fn snapping_fields() {
        let mut bp = Blueprint::new();
        assert!(bp.set_absolute_snapping(true).is_err());
        bp.set_snap_to_grid(Some(SnapGrid::new(32, 32).unwrap()));
        bp.set_absolute_snapping(true).unwrap();
        bp.set_position_relative_to_grid(Some(TilePosition::new(1, 2))).unwrap();
        let v = bp.to_value();
        assert_eq!(v["blueprint"]["snap-to-grid"], json!({"x": 32, "y": 32}));
        assert_eq!(v["blueprint"]["position-relative-to-grid"], json!({"x": 1, "y": 2}));

        let (back, _) = Blueprint::from_value(&v, reg(), &DraftConfig::default()).unwrap();
        assert_eq!(back.snap_to_grid(), bp.snap_to_grid());
        assert!(back.absolute_snapping());

        bp.set_snap_to_grid(None);
        assert!(bp.position_relative_to_grid().is_none());
        assert!(SnapGrid::new(0, 4).is_err());
    }

    #[test]
    fn string_round_trip() {
        let mut bp = Blueprint::new();
        let mut belt = Entity::new(reg(), "transport-belt").unwrap();
        belt.set_position(Vector::new(0.5, 0.5));
        bp.add_entity(belt).unwrap();
        bp.add_tile(Tile::new("stone-path", 0, 0));
        let s = bp.to_string().unwrap();
        let (back, _) = Blueprint::from_string(&s, reg(), &DraftConfig::default()).unwrap();
        assert_eq!(back.to_value(), bp.to_value());
    }
}
