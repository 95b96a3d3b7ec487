//! Blueprints and blueprint books for draftline.
//!
//! A [`Blueprint`] owns its entities in a slot map together with the wire
//! topology between them, floor tiles, and train schedules. Export assigns
//! `entity_number`s and writes each wire from both ends; import rebuilds the
//! wire list from whichever end mentions it. [`BlueprintBook`] nests
//! blueprints and other books.
//!
//! Blueprint strings are `'0'` followed by base64 of zlib-compressed JSON;
//! see [`codec`]. [`Blueprintable`] decodes any string by its root key.
//!
//! # Modules
//!
//! - [`blueprint`] -- the `Blueprint` container, wires, validation, JSON.
//! - [`book`] -- `BlueprintBook`.
//! - [`codec`] -- blueprint string encode/decode.
//! - [`icons`] -- up to four icon signals.
//! - [`schedule`] -- train schedules and wait conditions.
//! - [`spatial`] -- tile occupancy index used for overlap checks.
//! - [`tile`] -- floor tiles.
//! - [`version`] -- packed game version numbers.

pub mod blueprint;
pub mod book;
pub mod codec;
pub mod icons;
pub mod schedule;
pub mod spatial;
pub mod tile;
pub mod version;

use draftline_core::config::DraftConfig;
use draftline_core::diagnostic::{DraftWarning, ValidationResult};
use draftline_data::registry::PrototypeRegistry;
use serde_json::Value;

pub use blueprint::{
    Blueprint, BlueprintError, CircuitWire, CopperSide, PowerWire, SnapGrid, WireColor,
};
pub use book::BlueprintBook;
pub use codec::CodecError;
pub use version::Version;

/// Either kind of top-level blueprint string.
#[derive(Debug, Clone)]
pub enum Blueprintable {
    Blueprint(Blueprint),
    Book(BlueprintBook),
}

impl Blueprintable {
    /// Dispatch on the root key: `blueprint` or `blueprint_book`.
    pub fn from_value(
        value: &Value,
        reg: &PrototypeRegistry,
        cfg: &DraftConfig,
    ) -> Result<(Blueprintable, Vec<DraftWarning>), BlueprintError> {
        if value.get("blueprint").is_some() {
            let (bp, warnings) = Blueprint::from_value(value, reg, cfg)?;
            return Ok((Blueprintable::Blueprint(bp), warnings));
        }
        if value.get("blueprint_book").is_some() {
            let (book, warnings) = BlueprintBook::from_value(value, reg, cfg)?;
            return Ok((Blueprintable::Book(book), warnings));
        }
        let found = value
            .as_object()
            .and_then(|m| m.keys().find(|k| k.as_str() != "index").cloned())
            .unwrap_or_default();
        Err(BlueprintError::WrongRoot {
            expected: "blueprint or blueprint_book",
            found,
        })
    }

    pub fn from_string(
        s: &str,
        reg: &PrototypeRegistry,
        cfg: &DraftConfig,
    ) -> Result<(Blueprintable, Vec<DraftWarning>), BlueprintError> {
        Self::from_value(&codec::decode(s)?, reg, cfg)
    }

    pub fn to_value(&self) -> Value {
        match self {
            Blueprintable::Blueprint(bp) => bp.to_value(),
            Blueprintable::Book(book) => book.to_value(),
        }
    }

    pub fn to_string(&self) -> Result<String, BlueprintError> {
        Ok(codec::encode(&self.to_value())?)
    }

    pub fn validate(&self, reg: &PrototypeRegistry, cfg: &DraftConfig) -> ValidationResult {
        match self {
            Blueprintable::Blueprint(bp) => bp.validate(reg, cfg),
            Blueprintable::Book(book) => book.validate(reg, cfg),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Blueprintable::Blueprint(bp) => bp.label.as_deref(),
            Blueprintable::Book(book) => book.label.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatches_on_root_key() {
        let reg = PrototypeRegistry::vanilla();
        let cfg = DraftConfig::default();
        let book = json!({"blueprint_book": {"blueprints": [], "label": "b"}});
        let (item, _) = Blueprintable::from_value(&book, reg, &cfg).unwrap();
        assert!(matches!(item, Blueprintable::Book(_)));
        assert_eq!(item.label(), Some("b"));

        let s = codec::encode(&json!({"blueprint": {"item": "blueprint"}})).unwrap();
        let (item, _) = Blueprintable::from_string(&s, reg, &cfg).unwrap();
        assert!(matches!(item, Blueprintable::Blueprint(_)));
    }

    #[test]
    fn planners_are_rejected() {
        let reg = PrototypeRegistry::vanilla();
        let v = json!({"upgrade_planner": {}});
        let err = Blueprintable::from_value(&v, reg, &DraftConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            BlueprintError::WrongRoot { found, .. } if found == "upgrade_planner"
        ));
    }
}
