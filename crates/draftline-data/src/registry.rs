//! The immutable prototype registry and its builder.
//!
//! Three-phase lifecycle: registration -> mutation -> finalization. Once
//! built, the registry is read-only and safe to share across threads;
//! entities keep an `Arc` to their own prototype.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use draftline_core::error::DraftError;
use draftline_core::geometry::Footprint;
use draftline_core::kind::EntityKind;
use draftline_core::signal::{SignalId, SignalResolver, SignalType};
use serde_json::Value;

use crate::schema::*;

/// Errors raised while assembling a registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },
    #[error("item '{item}' places unknown entity '{entity}'")]
    UnresolvedPlaceResult { item: String, entity: String },
    #[error("recipe '{recipe}' uses unknown ingredient '{ingredient}'")]
    UnresolvedIngredient { recipe: String, ingredient: String },
    #[error("'{entity}' lists unknown instrument '{instrument}'")]
    UnresolvedInstrument { entity: String, instrument: String },
}

// ===========================================================================
// Resolved prototype
// ===========================================================================

/// An entity prototype with its geometry resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPrototype {
    pub name: String,
    pub kind: EntityKind,
    pub footprint: Footprint,
    pub inventory_size: Option<u32>,
    pub filter_count: Option<u32>,
    pub item_slot_count: Option<u32>,
    pub request_slot_count: Option<u32>,
    pub circuit_wire_max_distance: Option<f64>,
    pub maximum_wire_distance: Option<f64>,
    pub crafting_categories: Vec<String>,
    pub module_slots: Option<u32>,
    pub accepted_items: Vec<String>,
    pub double_grid_aligned: bool,
    pub logistic_mode: Option<LogisticMode>,
    pub max_distance: Option<u32>,
    pub instruments: Vec<String>,
}

impl EntityPrototype {
    /// A 1x1 stand-in for names missing from the tables.
    pub fn unknown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: EntityKind::Unknown,
            footprint: Footprint::single(),
            inventory_size: None,
            filter_count: None,
            item_slot_count: None,
            request_slot_count: None,
            circuit_wire_max_distance: None,
            maximum_wire_distance: None,
            crafting_categories: Vec::new(),
            module_slots: None,
            accepted_items: Vec::new(),
            double_grid_aligned: false,
            logistic_mode: None,
            max_distance: None,
            instruments: Vec::new(),
        }
    }
}

impl From<EntityPrototypeData> for EntityPrototype {
    fn from(d: EntityPrototypeData) -> Self {
        Self {
            name: d.name,
            kind: d.kind,
            footprint: Footprint::new(d.width, d.height),
            inventory_size: d.inventory_size,
            filter_count: d.filter_count,
            item_slot_count: d.item_slot_count,
            request_slot_count: d.request_slot_count,
            circuit_wire_max_distance: d.circuit_wire_max_distance,
            maximum_wire_distance: d.maximum_wire_distance,
            crafting_categories: d.crafting_categories,
            module_slots: d.module_slots,
            accepted_items: d.accepted_items,
            double_grid_aligned: d.double_grid_aligned,
            logistic_mode: d.logistic_mode,
            max_distance: d.max_distance,
            instruments: d.instruments,
        }
    }
}

// ===========================================================================
// Builder
// ===========================================================================

/// Builder for constructing an immutable [`PrototypeRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entities: Vec<EntityPrototype>,
    items: Vec<ItemData>,
    fluids: Vec<FluidData>,
    virtual_signals: Vec<String>,
    recipes: Vec<RecipeData>,
    instruments: Vec<InstrumentData>,
    names: HashMap<(&'static str, String), usize>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every table of a parsed document.
    pub fn from_data(data: PrototypeData) -> Result<Self, RegistryError> {
        let mut builder = Self::new();
        for e in data.entities {
            builder.register_entity(e.into())?;
        }
        for i in data.items {
            builder.register_item(i)?;
        }
        for f in data.fluids {
            builder.register_fluid(f)?;
        }
        for s in data.virtual_signals {
            builder.register_virtual_signal(&s)?;
        }
        for r in data.recipes {
            builder.register_recipe(r)?;
        }
        for i in data.instruments {
            builder.register_instrument(i)?;
        }
        Ok(builder)
    }

    fn claim(&mut self, kind: &'static str, name: &str, index: usize) -> Result<(), RegistryError> {
        if self.names.contains_key(&(kind, name.to_string())) {
            return Err(RegistryError::Duplicate {
                kind,
                name: name.to_string(),
            });
        }
        self.names.insert((kind, name.to_string()), index);
        Ok(())
    }

    fn index_of(&self, kind: &'static str, name: &str) -> Result<usize, RegistryError> {
        self.names
            .get(&(kind, name.to_string()))
            .copied()
            .ok_or_else(|| RegistryError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    /// Phase 1: Register an entity prototype.
    pub fn register_entity(&mut self, proto: EntityPrototype) -> Result<(), RegistryError> {
        self.claim("entity", &proto.name, self.entities.len())?;
        self.entities.push(proto);
        Ok(())
    }

    /// Phase 1: Register an item.
    pub fn register_item(&mut self, item: ItemData) -> Result<(), RegistryError> {
        self.claim("item", &item.name, self.items.len())?;
        self.items.push(item);
        Ok(())
    }

    /// Phase 1: Register a fluid.
    pub fn register_fluid(&mut self, fluid: FluidData) -> Result<(), RegistryError> {
        self.claim("fluid", &fluid.name, self.fluids.len())?;
        self.fluids.push(fluid);
        Ok(())
    }

    /// Phase 1: Register a virtual signal name.
    pub fn register_virtual_signal(&mut self, name: &str) -> Result<(), RegistryError> {
        self.claim("virtual signal", name, self.virtual_signals.len())?;
        self.virtual_signals.push(name.to_string());
        Ok(())
    }

    /// Phase 1: Register a recipe.
    pub fn register_recipe(&mut self, recipe: RecipeData) -> Result<(), RegistryError> {
        self.claim("recipe", &recipe.name, self.recipes.len())?;
        self.recipes.push(recipe);
        Ok(())
    }

    /// Phase 1: Register a speaker instrument. Registration order is id order.
    pub fn register_instrument(&mut self, instrument: InstrumentData) -> Result<(), RegistryError> {
        self.claim("instrument", &instrument.name, self.instruments.len())?;
        self.instruments.push(instrument);
        Ok(())
    }

    /// Phase 2: Mutate an existing entity prototype by name.
    pub fn mutate_entity<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut EntityPrototype),
    {
        let index = self.index_of("entity", name)?;
        f(&mut self.entities[index]);
        Ok(())
    }

    /// Phase 2: Mutate an existing recipe by name.
    pub fn mutate_recipe<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut RecipeData),
    {
        let index = self.index_of("recipe", name)?;
        f(&mut self.recipes[index]);
        Ok(())
    }

    /// Phase 3: Check cross-references and freeze.
    pub fn build(self) -> Result<PrototypeRegistry, RegistryError> {
        for item in &self.items {
            if let Some(entity) = &item.place_result {
                if !self.names.contains_key(&("entity", entity.clone())) {
                    return Err(RegistryError::UnresolvedPlaceResult {
                        item: item.name.clone(),
                        entity: entity.clone(),
                    });
                }
            }
        }
        for recipe in &self.recipes {
            for ingredient in &recipe.ingredients {
                let name = ingredient.name().to_string();
                if !self.names.contains_key(&("item", name.clone()))
                    && !self.names.contains_key(&("fluid", name.clone()))
                {
                    return Err(RegistryError::UnresolvedIngredient {
                        recipe: recipe.name.clone(),
                        ingredient: name,
                    });
                }
            }
        }
        for proto in &self.entities {
            for instrument in &proto.instruments {
                if !self.names.contains_key(&("instrument", instrument.clone())) {
                    return Err(RegistryError::UnresolvedInstrument {
                        entity: proto.name.clone(),
                        instrument: instrument.clone(),
                    });
                }
            }
        }

        let entities = self
            .entities
            .into_iter()
            .map(|e| (e.name.clone(), Arc::new(e)))
            .collect();
        let items = self.items.into_iter().map(|i| (i.name.clone(), i)).collect();
        let fluids = self.fluids.into_iter().map(|f| (f.name.clone(), f)).collect();
        let recipes = self.recipes.into_iter().map(|r| (r.name.clone(), r)).collect();

        Ok(PrototypeRegistry {
            entities,
            items,
            fluids,
            virtual_signals: self.virtual_signals.into_iter().collect(),
            recipes,
            instruments: self.instruments,
        })
    }
}

// ===========================================================================
// Registry
// ===========================================================================

/// Immutable prototype tables. Frozen after [`RegistryBuilder::build`].
#[derive(Debug)]
pub struct PrototypeRegistry {
    entities: HashMap<String, Arc<EntityPrototype>>,
    items: HashMap<String, ItemData>,
    fluids: HashMap<String, FluidData>,
    virtual_signals: BTreeSet<String>,
    recipes: HashMap<String, RecipeData>,
    instruments: Vec<InstrumentData>,
}

impl PrototypeRegistry {
    pub fn entity(&self, name: &str) -> Option<&Arc<EntityPrototype>> {
        self.entities.get(name)
    }

    /// Like [`entity`](Self::entity), but an unknown name is an error.
    pub fn require_entity(&self, name: &str) -> Result<Arc<EntityPrototype>, DraftError> {
        self.entities
            .get(name)
            .cloned()
            .ok_or_else(|| DraftError::UnknownEntity(name.to_string()))
    }

    /// All entity prototypes of a kind, sorted by name.
    pub fn entities_of_kind(&self, kind: EntityKind) -> Vec<&Arc<EntityPrototype>> {
        let mut found: Vec<_> = self.entities.values().filter(|e| e.kind == kind).collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    pub fn item(&self, name: &str) -> Option<&ItemData> {
        self.items.get(name)
    }

    pub fn item_exists(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn fluid(&self, name: &str) -> Option<&FluidData> {
        self.fluids.get(name)
    }

    pub fn recipe(&self, name: &str) -> Option<&RecipeData> {
        self.recipes.get(name)
    }

    /// Instrument by id (position in the table).
    pub fn instrument(&self, id: usize) -> Option<&InstrumentData> {
        self.instruments.get(id)
    }

    /// Instrument id and data by name.
    pub fn instrument_by_name(&self, name: &str) -> Option<(usize, &InstrumentData)> {
        self.instruments
            .iter()
            .enumerate()
            .find(|(_, i)| i.name == name)
    }

    /// Namespace of a signal name. Items shadow fluids, which shadow
    /// virtual signals, matching the game's lookup order.
    pub fn signal_type(&self, name: &str) -> Option<SignalType> {
        if self.items.contains_key(name) {
            Some(SignalType::Item)
        } else if self.fluids.contains_key(name) {
            Some(SignalType::Fluid)
        } else if self.virtual_signals.contains(name) {
            Some(SignalType::Virtual)
        } else {
            None
        }
    }

    /// Build a fully qualified signal from a bare name.
    pub fn signal(&self, name: &str) -> Result<SignalId, DraftError> {
        self.signal_type(name)
            .map(|kind| SignalId::new(name, kind))
            .ok_or_else(|| DraftError::UnknownSignal(name.to_string()))
    }

    /// Whether a qualified signal exists in its namespace.
    pub fn signal_exists(&self, signal: &SignalId) -> bool {
        match signal.kind {
            SignalType::Item => self.items.contains_key(&signal.name),
            SignalType::Fluid => self.fluids.contains_key(&signal.name),
            SignalType::Virtual => self.virtual_signals.contains(&signal.name),
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

impl SignalResolver for PrototypeRegistry {
    /// Accepts the dict form or a bare name whose type is looked up here.
    fn resolve_signal(&self, field: &str, value: &Value) -> Result<SignalId, DraftError> {
        match value {
            Value::String(name) => self.signal(name),
            _ => SignalId::from_value(field, value),
        }
    }
}
