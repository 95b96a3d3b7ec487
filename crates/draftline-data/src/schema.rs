//! Serde data file structs for prototype definitions.
//!
//! These structs define the on-disk format for entity, item, fluid, recipe,
//! and instrument tables. They are deserialized from RON, JSON, or TOML
//! data files and then frozen into a [`PrototypeRegistry`](crate::registry::PrototypeRegistry).

use draftline_core::kind::EntityKind;
use serde::Deserialize;

// ===========================================================================
// Entities
// ===========================================================================

/// An entity prototype definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityPrototypeData {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(default = "default_span")]
    pub width: u32,
    #[serde(default = "default_span")]
    pub height: u32,
    /// Main inventory slots (chests, wagons).
    #[serde(default)]
    pub inventory_size: Option<u32>,
    /// Item filter slots (filter inserters, loaders).
    #[serde(default)]
    pub filter_count: Option<u32>,
    /// Constant combinator signal slots.
    #[serde(default)]
    pub item_slot_count: Option<u32>,
    /// Request slots on requester/buffer chests.
    #[serde(default)]
    pub request_slot_count: Option<u32>,
    #[serde(default)]
    pub circuit_wire_max_distance: Option<f64>,
    /// Copper wire reach of electric poles.
    #[serde(default)]
    pub maximum_wire_distance: Option<f64>,
    #[serde(default)]
    pub crafting_categories: Vec<String>,
    #[serde(default)]
    pub module_slots: Option<u32>,
    /// Item names accepted in fuel/ammo/module requests beyond modules.
    #[serde(default)]
    pub accepted_items: Vec<String>,
    /// Rails and train stops sit on the 2x2 rail grid.
    #[serde(default)]
    pub double_grid_aligned: bool,
    /// `active-provider`, `passive-provider`, `storage`, `buffer`, `requester`.
    #[serde(default)]
    pub logistic_mode: Option<LogisticMode>,
    /// Underground belt / pipe-to-ground reach.
    #[serde(default)]
    pub max_distance: Option<u32>,
    /// Programmable speaker instrument table, by name.
    #[serde(default)]
    pub instruments: Vec<String>,
}

fn default_span() -> u32 {
    1
}

/// Behavior of a logistic container in the robot network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogisticMode {
    ActiveProvider,
    PassiveProvider,
    Storage,
    Buffer,
    Requester,
}

// ===========================================================================
// Items, fluids, signals
// ===========================================================================

/// An item definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
    #[serde(default = "default_stack_size")]
    pub stack_size: u32,
    /// Entity placed by this item, if any.
    #[serde(default)]
    pub place_result: Option<String>,
    #[serde(default)]
    pub module: bool,
}

fn default_stack_size() -> u32 {
    50
}

/// A fluid definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct FluidData {
    pub name: String,
    #[serde(default)]
    pub default_temperature: f64,
}

// ===========================================================================
// Recipes
// ===========================================================================

/// A recipe ingredient, in short tuple form or full form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IngredientData {
    /// Short form: `("item_name", amount)`.
    Short(String, u32),
    Full { name: String, amount: u32 },
}

impl IngredientData {
    pub fn name(&self) -> &str {
        match self {
            IngredientData::Short(name, _) | IngredientData::Full { name, .. } => name,
        }
    }
}

/// A recipe definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub ingredients: Vec<IngredientData>,
}

fn default_category() -> String {
    "crafting".to_string()
}

// ===========================================================================
// Instruments
// ===========================================================================

/// A programmable speaker instrument and its notes, in id order.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentData {
    pub name: String,
    #[serde(default)]
    pub notes: Vec<String>,
}

// ===========================================================================
// Bundle
// ===========================================================================

/// Every table in one document, as used by the embedded dataset and
/// [`load_prototypes_str`](crate::loader::load_prototypes_str).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PrototypeData {
    pub entities: Vec<EntityPrototypeData>,
    pub items: Vec<ItemData>,
    pub fluids: Vec<FluidData>,
    pub virtual_signals: Vec<String>,
    pub recipes: Vec<RecipeData>,
    pub instruments: Vec<InstrumentData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_defaults() {
        let e: EntityPrototypeData =
            serde_json::from_str(r#"{"name": "pipe", "type": "pipe"}"#).unwrap();
        assert_eq!((e.width, e.height), (1, 1));
        assert_eq!(e.kind, EntityKind::Pipe);
        assert!(e.inventory_size.is_none());
        assert!(!e.double_grid_aligned);
    }

    #[test]
    fn logistic_mode_is_kebab_case() {
        let e: EntityPrototypeData = serde_json::from_str(
            r#"{"name": "logistic-chest-requester", "type": "logistic-container", "logistic_mode": "requester"}"#,
        )
        .unwrap();
        assert_eq!(e.logistic_mode, Some(LogisticMode::Requester));
    }

    #[test]
    fn ingredients_accept_both_forms() {
        let r: RecipeData = serde_json::from_str(
            r#"{"name": "iron-gear-wheel", "ingredients": [["iron-plate", 2], {"name": "coal", "amount": 1}]}"#,
        )
        .unwrap();
        assert_eq!(r.category, "crafting");
        let names: Vec<_> = r.ingredients.iter().map(IngredientData::name).collect();
        assert_eq!(names, vec!["iron-plate", "coal"]);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let res: Result<EntityPrototypeData, _> =
            serde_json::from_str(r#"{"name": "x", "type": "spaceship"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn ron_instruments() {
        let data: Vec<InstrumentData> =
            ron::from_str(r#"[(name: "alarms", notes: ["alarm-1", "alarm-2"])]"#).unwrap();
        assert_eq!(data[0].notes.len(), 2);
    }
}
