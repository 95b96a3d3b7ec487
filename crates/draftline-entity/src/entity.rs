//! A single blueprint entity.
//!
//! An [`Entity`] holds an `Arc` to its prototype, so every bound the game
//! enforces (filter slots, inventory size, request slots, direction set) is
//! checked at assignment time without a registry. Checks that need the
//! prototype tables (do these item names exist? does this recipe fit?) run
//! in [`Entity::validate`].

use std::sync::Arc;

use draftline_core::capability::Capabilities;
use draftline_core::color::Color;
use draftline_core::config::ValidationMode;
use draftline_core::diagnostic::{DraftWarning, ValidationResult};
use draftline_core::error::DraftError;
use draftline_core::geometry::{Direction, Footprint, TilePosition, Vector};
use draftline_core::kind::EntityKind;
use draftline_core::value::{as_bool, as_object, as_str, as_u32, finite_f64, require};
use draftline_data::registry::{EntityPrototype, PrototypeRegistry};
use draftline_data::schema::LogisticMode;
use serde_json::{Map, Value};

use crate::control::ControlBehavior;
use crate::inventory::{InventoryFilters, ItemFilters, ItemRequests, RequestFilters, check_bar};
use crate::settings::{
    AlertParameters, FilterMode, InfinityContainerSettings, InfinityPipeSettings, IoType,
    SpeakerParameters, SpeakerSettings, SplitterPriority,
};

/// Keys owned by the enclosing blueprint rather than the entity.
const BLUEPRINT_KEYS: [&str; 3] = ["entity_number", "connections", "neighbours"];

/// Capabilities of a concrete prototype.
///
/// Starts from the kind's table and narrows it: logistic chests keep only
/// what their mode allows, and prototypes without a circuit reach lose wires
/// and control behavior.
pub fn capabilities_for(proto: &EntityPrototype) -> Capabilities {
    use Capabilities as C;
    let mut caps = proto.kind.capabilities();
    if proto.kind == EntityKind::LogisticContainer {
        match proto.logistic_mode {
            Some(LogisticMode::Requester) => {}
            Some(LogisticMode::Buffer) => caps.remove(C::REQUEST_FROM_BUFFERS),
            _ => caps.remove(C::REQUEST_FILTERS | C::REQUEST_FROM_BUFFERS | C::MODE_OF_OPERATION),
        }
    }
    if proto.kind != EntityKind::Unknown && proto.circuit_wire_max_distance.is_none() {
        caps.remove(C::CIRCUIT_WIRE | C::DUAL_CIRCUIT | C::CONTROL.difference(C::SPEAKER));
    }
    caps
}

/// Infinity chest or infinity pipe settings.
#[derive(Debug, Clone, PartialEq)]
pub enum InfinitySettings {
    Container(InfinityContainerSettings),
    Pipe(InfinityPipeSettings),
}

impl InfinitySettings {
    fn is_default(&self) -> bool {
        match self {
            InfinitySettings::Container(c) => c.is_default(),
            InfinitySettings::Pipe(p) => p.is_default(),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            InfinitySettings::Container(c) => c.to_value(),
            InfinitySettings::Pipe(p) => p.to_value(),
        }
    }
}

/// One placed entity and all of its blueprint settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    proto: Arc<EntityPrototype>,
    caps: Capabilities,
    key: Option<String>,
    position: Vector,
    direction: Direction,
    orientation: Option<f64>,
    control: ControlBehavior,
    tags: Map<String, Value>,
    recipe: Option<String>,
    items: ItemRequests,
    bar: Option<u32>,
    inventory: InventoryFilters,
    filters: ItemFilters,
    filter_mode: Option<FilterMode>,
    request_filters: RequestFilters,
    request_from_buffers: Option<bool>,
    override_stack_size: Option<u8>,
    io_type: Option<IoType>,
    input_priority: Option<SplitterPriority>,
    output_priority: Option<SplitterPriority>,
    splitter_filter: Option<String>,
    station: Option<String>,
    manual_trains_limit: Option<u32>,
    color: Option<Color>,
    switch_state: Option<bool>,
    speaker: SpeakerSettings,
    infinity: Option<InfinitySettings>,
    extra: Map<String, Value>,
}

impl Entity {
    /// A fresh entity of prototype `name`, with its top-left tile at the origin.
    pub fn new(reg: &PrototypeRegistry, name: &str) -> Result<Self, DraftError> {
        Ok(Self::from_prototype(reg.require_entity(name)?))
    }

    pub fn from_prototype(proto: Arc<EntityPrototype>) -> Self {
        let caps = capabilities_for(&proto);
        let slot_count = |n: Option<u32>| n.unwrap_or(0) as usize;
        let infinity = if caps.contains(Capabilities::INFINITY_CONTAINER) {
            Some(InfinitySettings::Container(InfinityContainerSettings::new(
                slot_count(proto.inventory_size),
            )))
        } else if caps.contains(Capabilities::INFINITY_PIPE) {
            Some(InfinitySettings::Pipe(InfinityPipeSettings::default()))
        } else {
            None
        };
        Self {
            caps,
            key: None,
            position: proto.footprint.center_of(TilePosition::default()),
            direction: Direction::North,
            orientation: None,
            control: ControlBehavior::new(proto.kind, caps, slot_count(proto.item_slot_count)),
            tags: Map::new(),
            recipe: None,
            items: ItemRequests::new(),
            bar: None,
            inventory: InventoryFilters::new(proto.inventory_size.unwrap_or(0)),
            filters: ItemFilters::new("filters", slot_count(proto.filter_count)),
            filter_mode: None,
            request_filters: RequestFilters::new(slot_count(proto.request_slot_count)),
            request_from_buffers: None,
            override_stack_size: None,
            io_type: None,
            input_priority: None,
            output_priority: None,
            splitter_filter: None,
            station: None,
            manual_trains_limit: None,
            color: None,
            switch_state: None,
            speaker: SpeakerSettings::default(),
            infinity,
            extra: Map::new(),
            proto,
        }
    }

    fn require(&self, cap: Capabilities, field: &str) -> Result<(), DraftError> {
        if self.caps.contains(cap) {
            Ok(())
        } else {
            Err(DraftError::unsupported(self.proto.kind, field))
        }
    }

    // -----------------------------------------------------------------------
    // Identity and placement
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.proto.name
    }

    pub fn kind(&self) -> EntityKind {
        self.proto.kind
    }

    pub fn prototype(&self) -> &EntityPrototype {
        &self.proto
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// User-assigned identifier, unique within a blueprint.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn set_key(&mut self, key: Option<String>) {
        self.key = key;
    }

    /// Center position.
    pub fn position(&self) -> Vector {
        self.position
    }

    /// Move the entity's center. Double-grid-aligned entities are snapped
    /// to even tile coordinates; the returned warning records the move.
    pub fn set_position(&mut self, position: Vector) -> Option<DraftWarning> {
        self.position = position;
        self.snap_to_grid()
    }

    pub fn tile_position(&self) -> TilePosition {
        self.footprint().tile_of(self.position)
    }

    pub fn set_tile_position(&mut self, tile: TilePosition) -> Option<DraftWarning> {
        self.position = self.footprint().center_of(tile);
        self.snap_to_grid()
    }

    fn snap_to_grid(&mut self) -> Option<DraftWarning> {
        if !self.proto.double_grid_aligned {
            return None;
        }
        let tile = self.tile_position();
        if tile.is_double_grid_aligned() {
            return None;
        }
        let from = self.position;
        self.position = self.footprint().center_of(tile.snapped_to_double_grid());
        tracing::debug!(
            entity = %self.proto.name,
            ?from,
            to = ?self.position,
            "snapped to rail grid"
        );
        Some(DraftWarning::GridSnapped {
            entity: self.proto.name.clone(),
            from,
            to: self.position,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) -> Result<(), DraftError> {
        if direction == Direction::North {
            self.direction = direction;
            return Ok(());
        }
        self.require(Capabilities::DIRECTION, "direction")?;
        if !direction.is_cardinal() && !self.caps.contains(Capabilities::EIGHT_WAY) {
            return Err(DraftError::InvalidDirection {
                kind: self.proto.kind,
                direction: direction.as_u8(),
            });
        }
        self.direction = direction;
        Ok(())
    }

    /// Tiles covered, after rotation. Rolling stock keeps its prototype
    /// footprint regardless of orientation.
    pub fn footprint(&self) -> Footprint {
        if self.proto.kind.is_rolling_stock() {
            self.proto.footprint
        } else {
            self.proto.footprint.rotated(self.direction)
        }
    }

    pub fn orientation(&self) -> Option<f64> {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Option<f64>) -> Result<(), DraftError> {
        self.require(Capabilities::ORIENTATION, "orientation")?;
        if let Some(o) = orientation {
            if !(0.0..1.0).contains(&o) {
                return Err(DraftError::invalid(
                    "orientation",
                    format!("{o} is outside 0 <= o < 1"),
                ));
            }
        }
        self.orientation = orientation;
        Ok(())
    }

    pub fn tags(&self) -> &Map<String, Value> {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.tags
    }

    /// Keys kept verbatim by permissive parsing.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    // -----------------------------------------------------------------------
    // Control behavior
    // -----------------------------------------------------------------------

    pub fn control_behavior(&self) -> &ControlBehavior {
        &self.control
    }

    pub fn control_behavior_mut(&mut self) -> &mut ControlBehavior {
        &mut self.control
    }

    // -----------------------------------------------------------------------
    // Crafting and inventories
    // -----------------------------------------------------------------------

    pub fn recipe(&self) -> Option<&str> {
        self.recipe.as_deref()
    }

    /// Set the recipe, checking that it exists and fits the machine's
    /// crafting categories.
    pub fn set_recipe(
        &mut self,
        reg: &PrototypeRegistry,
        recipe: Option<&str>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::RECIPE, "recipe")?;
        if let Some(name) = recipe {
            if reg.recipe(name).is_none() {
                return Err(DraftError::UnknownRecipe(name.to_string()));
            }
            self.check_recipe_category(reg, name)?;
        }
        self.recipe = recipe.map(str::to_string);
        Ok(())
    }

    /// A known recipe must belong to one of the machine's crafting
    /// categories. Unknown recipes pass here; their names are checked by
    /// [`validate`](Self::validate) according to the mode.
    fn check_recipe_category(
        &self,
        reg: &PrototypeRegistry,
        name: &str,
    ) -> Result<(), DraftError> {
        match reg.recipe(name) {
            Some(data) if !self.proto.crafting_categories.contains(&data.category) => {
                Err(DraftError::RecipeNotAllowed {
                    recipe: name.to_string(),
                    entity: self.proto.name.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn items(&self) -> &ItemRequests {
        &self.items
    }

    /// Request `count` of `item` (modules, fuel, ammo). Zero removes it.
    pub fn set_item_request(&mut self, item: &str, count: u32) -> Result<(), DraftError> {
        self.require(Capabilities::ITEM_REQUESTS, "items")?;
        self.items.set(item, count);
        Ok(())
    }

    /// Inventory limit. Cargo wagons keep theirs inside `inventory`.
    pub fn bar(&self) -> Option<u32> {
        if self.caps.contains(Capabilities::INVENTORY_FILTERS) {
            self.inventory.bar()
        } else {
            self.bar
        }
    }

    pub fn set_bar(&mut self, bar: Option<u32>) -> Result<(), DraftError> {
        if self.caps.contains(Capabilities::INVENTORY_FILTERS) {
            return self.inventory.set_bar(bar);
        }
        self.require(Capabilities::BAR, "bar")?;
        check_bar("bar", bar, self.proto.inventory_size.unwrap_or(0))?;
        self.bar = bar;
        Ok(())
    }

    pub fn inventory(&self) -> &InventoryFilters {
        &self.inventory
    }

    pub fn set_inventory_filter(
        &mut self,
        index: usize,
        item: Option<&str>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::INVENTORY_FILTERS, "inventory")?;
        self.inventory.filters.set(index, item)
    }

    pub fn filters(&self) -> &ItemFilters {
        &self.filters
    }

    pub fn set_filter(&mut self, index: usize, item: Option<&str>) -> Result<(), DraftError> {
        self.require(Capabilities::ITEM_FILTERS, "filters")?;
        self.filters.set(index, item)
    }

    /// Replace all filters, numbered from slot 0.
    pub fn set_filters<'a>(
        &mut self,
        items: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::ITEM_FILTERS, "filters")?;
        self.filters.set_all(items)
    }

    pub fn filter_mode(&self) -> Option<FilterMode> {
        self.filter_mode
    }

    pub fn set_filter_mode(&mut self, mode: Option<FilterMode>) -> Result<(), DraftError> {
        self.require(Capabilities::FILTER_MODE, "filter_mode")?;
        self.filter_mode = mode;
        Ok(())
    }

    pub fn request_filters(&self) -> &RequestFilters {
        &self.request_filters
    }

    pub fn set_request_filter(
        &mut self,
        index: usize,
        request: Option<(&str, u32)>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::REQUEST_FILTERS, "request_filters")?;
        self.request_filters.set(index, request)
    }

    pub fn set_request_filters<'a>(
        &mut self,
        requests: impl IntoIterator<Item = (&'a str, u32)>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::REQUEST_FILTERS, "request_filters")?;
        self.request_filters.set_all(requests)
    }

    pub fn request_from_buffers(&self) -> Option<bool> {
        self.request_from_buffers
    }

    pub fn set_request_from_buffers(&mut self, value: Option<bool>) -> Result<(), DraftError> {
        self.require(Capabilities::REQUEST_FROM_BUFFERS, "request_from_buffers")?;
        self.request_from_buffers = value;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Logistics
    // -----------------------------------------------------------------------

    pub fn override_stack_size(&self) -> Option<u8> {
        self.override_stack_size
    }

    pub fn set_override_stack_size(&mut self, size: Option<u8>) -> Result<(), DraftError> {
        self.require(Capabilities::OVERRIDE_STACK_SIZE, "override_stack_size")?;
        if size == Some(0) {
            return Err(DraftError::invalid("override_stack_size", "must be at least 1"));
        }
        self.override_stack_size = size;
        Ok(())
    }

    pub fn io_type(&self) -> Option<IoType> {
        self.io_type
    }

    pub fn set_io_type(&mut self, io: Option<IoType>) -> Result<(), DraftError> {
        self.require(Capabilities::IO_TYPE, "type")?;
        self.io_type = io;
        Ok(())
    }

    pub fn input_priority(&self) -> Option<SplitterPriority> {
        self.input_priority
    }

    pub fn set_input_priority(
        &mut self,
        priority: Option<SplitterPriority>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::SPLITTER, "input_priority")?;
        self.input_priority = priority;
        Ok(())
    }

    pub fn output_priority(&self) -> Option<SplitterPriority> {
        self.output_priority
    }

    pub fn set_output_priority(
        &mut self,
        priority: Option<SplitterPriority>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::SPLITTER, "output_priority")?;
        self.output_priority = priority;
        Ok(())
    }

    pub fn splitter_filter(&self) -> Option<&str> {
        self.splitter_filter.as_deref()
    }

    pub fn set_splitter_filter(&mut self, item: Option<&str>) -> Result<(), DraftError> {
        self.require(Capabilities::SPLITTER, "filter")?;
        self.splitter_filter = item.map(str::to_string);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Trains, colors, power
    // -----------------------------------------------------------------------

    pub fn station(&self) -> Option<&str> {
        self.station.as_deref()
    }

    pub fn set_station(&mut self, station: Option<&str>) -> Result<(), DraftError> {
        self.require(Capabilities::STATION, "station")?;
        self.station = station.map(str::to_string);
        Ok(())
    }

    pub fn manual_trains_limit(&self) -> Option<u32> {
        self.manual_trains_limit
    }

    pub fn set_manual_trains_limit(&mut self, limit: Option<u32>) -> Result<(), DraftError> {
        self.require(Capabilities::STATION, "manual_trains_limit")?;
        self.manual_trains_limit = limit;
        Ok(())
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn set_color(&mut self, color: Option<Color>) -> Result<(), DraftError> {
        self.require(Capabilities::COLOR, "color")?;
        self.color = color;
        Ok(())
    }

    pub fn switch_state(&self) -> Option<bool> {
        self.switch_state
    }

    pub fn set_switch_state(&mut self, on: Option<bool>) -> Result<(), DraftError> {
        self.require(Capabilities::SWITCH_STATE, "switch_state")?;
        self.switch_state = on;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Speaker and infinity settings
    // -----------------------------------------------------------------------

    pub fn speaker(&self) -> Option<&SpeakerSettings> {
        self.caps
            .contains(Capabilities::SPEAKER)
            .then_some(&self.speaker)
    }

    pub fn speaker_mut(&mut self) -> Result<&mut SpeakerSettings, DraftError> {
        self.require(Capabilities::SPEAKER, "parameters")?;
        Ok(&mut self.speaker)
    }

    pub fn infinity(&self) -> Option<&InfinitySettings> {
        self.infinity.as_ref()
    }

    pub fn infinity_mut(&mut self) -> Result<&mut InfinitySettings, DraftError> {
        let kind = self.proto.kind;
        self.infinity
            .as_mut()
            .ok_or_else(|| DraftError::unsupported(kind, "infinity_settings"))
    }

    // -----------------------------------------------------------------------
    // JSON
    // -----------------------------------------------------------------------

    /// The blueprint dict for this entity, without `entity_number` or wires.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".into(), self.proto.name.clone().into());
        map.insert("position".into(), self.position.to_value());
        if self.direction != Direction::North {
            map.insert("direction".into(), self.direction.as_u8().into());
        }
        if let Some(o) = self.orientation {
            map.insert("orientation".into(), o.into());
        }
        if let Some(io) = self.io_type {
            map.insert("type".into(), io.as_str().into());
        }
        if let Some(recipe) = &self.recipe {
            map.insert("recipe".into(), recipe.clone().into());
        }
        if !self.items.is_empty() {
            map.insert("items".into(), self.items.to_value());
        }
        if let Some(bar) = self.bar {
            map.insert("bar".into(), bar.into());
        }
        if let Some(inventory) = self.inventory.to_value() {
            map.insert("inventory".into(), inventory);
        }
        if !self.filters.is_empty() {
            map.insert("filters".into(), self.filters.to_value());
        }
        if let Some(mode) = self.filter_mode {
            map.insert("filter_mode".into(), mode.as_str().into());
        }
        if !self.request_filters.is_empty() {
            map.insert("request_filters".into(), self.request_filters.to_value());
        }
        if let Some(b) = self.request_from_buffers {
            map.insert("request_from_buffers".into(), b.into());
        }
        if let Some(n) = self.override_stack_size {
            map.insert("override_stack_size".into(), n.into());
        }
        if let Some(p) = self.input_priority {
            map.insert("input_priority".into(), p.as_str().into());
        }
        if let Some(p) = self.output_priority {
            map.insert("output_priority".into(), p.as_str().into());
        }
        if let Some(f) = &self.splitter_filter {
            map.insert("filter".into(), f.clone().into());
        }
        if let Some(s) = &self.station {
            map.insert("station".into(), s.clone().into());
        }
        if let Some(n) = self.manual_trains_limit {
            map.insert("manual_trains_limit".into(), n.into());
        }
        if let Some(c) = &self.color {
            map.insert("color".into(), c.to_value());
        }
        if let Some(s) = self.switch_state {
            map.insert("switch_state".into(), s.into());
        }
        if self.caps.contains(Capabilities::SPEAKER) {
            if !self.speaker.parameters.is_default() {
                map.insert("parameters".into(), self.speaker.parameters.to_value());
            }
            if !self.speaker.alert.is_default() {
                map.insert("alert_parameters".into(), self.speaker.alert.to_value());
            }
        }
        if let Some(inf) = self.infinity.as_ref().filter(|i| !i.is_default()) {
            map.insert("infinity_settings".into(), inf.to_value());
        }
        if let Some(cb) = self.control.to_value() {
            map.insert("control_behavior".into(), cb);
        }
        if !self.tags.is_empty() {
            map.insert("tags".into(), Value::Object(self.tags.clone()));
        }
        for (k, v) in &self.extra {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }

    /// Parse a blueprint entity dict.
    ///
    /// Bare signal names are resolved through `reg`. Unless `mode` is
    /// [`ValidationMode::None`], the result is also run through
    /// [`validate`](Self::validate): strict mode fails on the first error,
    /// permissive mode folds everything into the returned warnings.
    pub fn from_value(
        value: &Value,
        reg: &PrototypeRegistry,
        mode: ValidationMode,
    ) -> Result<(Entity, Vec<DraftWarning>), DraftError> {
        let map = as_object("entity", value)?;
        let name = as_str("name", require(map, "", "name")?)?;
        let mut warnings = Vec::new();

        // Unknown names are reported by `validate` in permissive mode.
        let proto = match reg.entity(name) {
            Some(p) => Arc::clone(p),
            None if mode == ValidationMode::Strict => {
                return Err(DraftError::UnknownEntity(name.to_string()));
            }
            None => Arc::new(EntityPrototype::unknown(name)),
        };
        let mut entity = Entity::from_prototype(proto);

        for (key, v) in map {
            if key == "name" || key == "position" || BLUEPRINT_KEYS.contains(&key.as_str()) {
                continue;
            }
            match entity.apply_key(key, v, reg, mode, &mut warnings) {
                Ok(true) => {}
                Ok(false) | Err(DraftError::Unsupported { .. })
                    if mode != ValidationMode::Strict =>
                {
                    warnings.push(DraftWarning::UnrecognizedKey {
                        entity: name.to_string(),
                        key: key.clone(),
                    });
                    entity.extra.insert(key.clone(), v.clone());
                }
                Ok(false) => return Err(DraftError::unsupported(entity.kind(), key.as_str())),
                Err(e) => return Err(e),
            }
        }

        // Position last: snapping depends on the rotated footprint.
        let position = Vector::from_value("position", require(map, "", "position")?)?;
        warnings.extend(entity.set_position(position));

        if mode.checks_registry() {
            warnings.extend(entity.validate(reg, mode).into_result()?);
        }
        Ok((entity, warnings))
    }

    /// Apply one key. `Ok(false)` means no kind understands it.
    fn apply_key(
        &mut self,
        key: &str,
        v: &Value,
        reg: &PrototypeRegistry,
        mode: ValidationMode,
        warnings: &mut Vec<DraftWarning>,
    ) -> Result<bool, DraftError> {
        let size = |n: Option<u32>| n.unwrap_or(0);
        match key {
            "direction" => {
                let raw = as_u32(key, v)?;
                let direction = u8::try_from(raw)
                    .ok()
                    .and_then(Direction::from_u8)
                    .ok_or(DraftError::InvalidDirection {
                        kind: self.kind(),
                        direction: raw.min(u8::MAX as u32) as u8,
                    })?;
                self.set_direction(direction)?;
            }
            "orientation" => self.set_orientation(Some(finite_f64(key, v)?))?,
            "tags" => self.tags = as_object(key, v)?.clone(),
            "control_behavior" => {
                if !self.caps.has_control_behavior() {
                    return Err(DraftError::unsupported(self.kind(), key));
                }
                let slots = size(self.proto.item_slot_count) as usize;
                self.control = ControlBehavior::from_value(
                    v,
                    self.kind(),
                    self.caps,
                    slots,
                    &self.proto.name,
                    reg,
                    mode,
                    warnings,
                )?;
            }
            "recipe" => {
                self.require(Capabilities::RECIPE, key)?;
                let name = as_str(key, v)?;
                self.check_recipe_category(reg, name)?;
                self.recipe = Some(name.to_string());
            }
            "items" => {
                self.require(Capabilities::ITEM_REQUESTS, key)?;
                self.items = ItemRequests::from_value(v)?;
            }
            "bar" => self.set_bar(Some(as_u32(key, v)?))?,
            "inventory" => {
                self.require(Capabilities::INVENTORY_FILTERS, key)?;
                self.inventory = InventoryFilters::from_value(size(self.proto.inventory_size), v)?;
            }
            "filters" => {
                self.require(Capabilities::ITEM_FILTERS, key)?;
                self.filters =
                    ItemFilters::from_value("filters", size(self.proto.filter_count) as usize, v)?;
            }
            "filter_mode" => self.set_filter_mode(Some(FilterMode::from_value(key, v)?))?,
            "request_filters" => {
                self.require(Capabilities::REQUEST_FILTERS, key)?;
                self.request_filters =
                    RequestFilters::from_value(size(self.proto.request_slot_count) as usize, v)?;
            }
            "request_from_buffers" => self.set_request_from_buffers(Some(as_bool(key, v)?))?,
            "override_stack_size" => {
                let n = as_u32(key, v)?;
                let n = u8::try_from(n)
                    .map_err(|_| DraftError::invalid(key, format!("{n} exceeds 255")))?;
                self.set_override_stack_size(Some(n))?;
            }
            "type" => self.set_io_type(Some(IoType::from_value(key, v)?))?,
            "input_priority" => {
                self.set_input_priority(Some(SplitterPriority::from_value(key, v)?))?
            }
            "output_priority" => {
                self.set_output_priority(Some(SplitterPriority::from_value(key, v)?))?
            }
            "filter" => self.set_splitter_filter(Some(as_str(key, v)?))?,
            "station" => self.set_station(Some(as_str(key, v)?))?,
            "manual_trains_limit" => self.set_manual_trains_limit(Some(as_u32(key, v)?))?,
            "color" => self.set_color(Some(Color::from_value(key, v)?))?,
            "switch_state" => self.set_switch_state(Some(as_bool(key, v)?))?,
            "parameters" => {
                self.require(Capabilities::SPEAKER, key)?;
                self.speaker.parameters = SpeakerParameters::from_value(key, v)?;
            }
            "alert_parameters" => {
                self.require(Capabilities::SPEAKER, key)?;
                self.speaker.alert = AlertParameters::from_value(key, v, reg)?;
            }
            "infinity_settings" => {
                let capacity = size(self.proto.inventory_size) as usize;
                match self.infinity_mut()? {
                    InfinitySettings::Container(c) => {
                        *c = InfinityContainerSettings::from_value(key, capacity, v)?
                    }
                    InfinitySettings::Pipe(p) => *p = InfinityPipeSettings::from_value(key, v)?,
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Checks that need the prototype tables: names exist, the recipe fits,
    /// modules fit, and speaker ids are in range.
    ///
    /// A recipe outside the machine's crafting categories is an error in
    /// every mode, including [`ValidationMode::None`].
    pub fn validate(&self, reg: &PrototypeRegistry, mode: ValidationMode) -> ValidationResult {
        let mut result = ValidationResult::new();
        if let Some(recipe) = &self.recipe {
            if let Err(e) = self.check_recipe_category(reg, recipe) {
                result.push_error(e);
            }
        }
        if !mode.checks_registry() {
            return result;
        }
        let unknown = |result: &mut ValidationResult, err: DraftError, field: &str, name: &str| {
            if let Err(e) = mode.unknown_name(result, err, field, name) {
                result.push_error(e);
            }
        };
        let proto = &self.proto;

        if proto.kind == EntityKind::Unknown && reg.entity(&proto.name).is_none() {
            let err = DraftError::UnknownEntity(proto.name.clone());
            unknown(&mut result, err, "name", &proto.name);
        }

        if let Some(recipe) = self.recipe.as_deref().filter(|r| reg.recipe(r).is_none()) {
            unknown(&mut result, DraftError::UnknownRecipe(recipe.to_string()), "recipe", recipe);
        }

        let mut modules = 0u32;
        for (item, count) in self.items.iter() {
            match reg.item(item) {
                None => {
                    let err = DraftError::UnknownItem(item.to_string());
                    unknown(&mut result, err, "items", item);
                }
                Some(data) if data.module => modules = modules.saturating_add(count),
                Some(_) if proto.accepted_items.iter().any(|a| a == item) => {}
                Some(_) => result.push_warning(DraftWarning::ItemNotAllowed {
                    entity: proto.name.clone(),
                    item: item.to_string(),
                }),
            }
        }
        let slots = proto.module_slots.unwrap_or(0);
        if modules > slots {
            result.push_warning(DraftWarning::ModuleOverflow {
                entity: proto.name.clone(),
                requested: modules,
                slots,
            });
        }

        let mut item_names: Vec<(&str, &str)> = Vec::new();
        item_names.extend(self.filters.iter().map(|(_, n)| ("filters", n)));
        item_names.extend(self.inventory.filters.iter().map(|(_, n)| ("inventory", n)));
        item_names.extend(
            self.request_filters
                .iter()
                .map(|(_, r)| ("request_filters", r.name.as_str())),
        );
        item_names.extend(self.splitter_filter.as_deref().map(|n| ("filter", n)));
        if let Some(InfinitySettings::Container(c)) = &self.infinity {
            item_names.extend(c.filters.values().map(|f| ("infinity_settings", f.name.as_str())));
        }
        for (field, name) in item_names {
            if !reg.item_exists(name) {
                unknown(&mut result, DraftError::UnknownItem(name.to_string()), field, name);
            }
        }

        if let Some(InfinitySettings::Pipe(p)) = &self.infinity {
            if let Some(fluid) = &p.name {
                if reg.fluid(fluid).is_none() {
                    let err = DraftError::UnknownFluid(fluid.clone());
                    unknown(&mut result, err, "infinity_settings", fluid);
                }
            }
        }

        let mut signals = self.control.referenced_signals();
        signals.extend(self.speaker.alert.icon_signal_id.iter());
        for signal in signals {
            if !reg.signal_exists(signal) {
                let err = DraftError::UnknownSignal(signal.name.clone());
                unknown(&mut result, err, "control_behavior", &signal.name);
            }
        }

        if let Some(params) = self.control.circuit_parameters() {
            self.check_speaker(reg, params.instrument_id, params.note_id, &mut result);
        }

        result
    }

    fn check_speaker(
        &self,
        reg: &PrototypeRegistry,
        instrument_id: u32,
        note_id: u32,
        result: &mut ValidationResult,
    ) {
        let instruments = &self.proto.instruments;
        let Some(name) = instruments.get(instrument_id as usize) else {
            result.push_warning(DraftWarning::SpeakerOutOfRange {
                field: "instrument_id",
                id: instrument_id,
                max: instruments.len().saturating_sub(1) as u32,
            });
            return;
        };
        let Some((_, instrument)) = reg.instrument_by_name(name) else {
            result.push_error(DraftError::UnknownInstrument(name.clone()));
            return;
        };
        if note_id as usize >= instrument.notes.len() {
            result.push_warning(DraftWarning::SpeakerOutOfRange {
                field: "note_id",
                id: note_id,
                max: instrument.notes.len().saturating_sub(1) as u32,
            });
        }
    }
}
