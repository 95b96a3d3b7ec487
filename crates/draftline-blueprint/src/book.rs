//! Blueprint books: ordered collections of blueprints and nested books.

use draftline_core::color::Color;
use draftline_core::config::{DraftConfig, ValidationMode};
use draftline_core::diagnostic::{DraftWarning, ValidationResult};
use draftline_core::error::DraftError;
use draftline_core::value::{as_array, as_object, as_str, as_u64};
use draftline_data::registry::PrototypeRegistry;
use serde_json::{Map, Value};

use crate::Blueprintable;
use crate::blueprint::{Blueprint, BlueprintError};
use crate::codec;
use crate::icons::Icons;
use crate::version::Version;

#[derive(Debug, Clone, Default)]
pub struct BlueprintBook {
    pub label: Option<String>,
    pub label_color: Option<Color>,
    pub description: Option<String>,
    pub icons: Icons,
    pub version: Version,
    active_index: usize,
    contents: Vec<Blueprintable>,
    extra: Map<String, Value>,
}

impl BlueprintBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &[Blueprintable] {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut Vec<Blueprintable> {
        &mut self.contents
    }

    pub fn push(&mut self, item: impl Into<Blueprintable>) {
        self.contents.push(item.into());
    }

    /// Remove the entry at `index`, keeping the active index on the same
    /// entry where possible.
    pub fn remove(&mut self, index: usize) -> Option<Blueprintable> {
        if index >= self.contents.len() {
            return None;
        }
        let item = self.contents.remove(index);
        if self.active_index > index || self.active_index >= self.contents.len() {
            self.active_index = self.active_index.saturating_sub(1);
        }
        Some(item)
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn set_active_index(&mut self, index: usize) -> Result<(), DraftError> {
        if index != 0 && index >= self.contents.len() {
            return Err(DraftError::IndexOutOfBounds {
                field: "active_index".into(),
                index,
                capacity: self.contents.len(),
            });
        }
        self.active_index = index;
        Ok(())
    }

    /// Validate every blueprint in the book, recursively.
    pub fn validate(&self, reg: &PrototypeRegistry, cfg: &DraftConfig) -> ValidationResult {
        let mut result = ValidationResult::new();
        if cfg.mode.checks_registry() {
            self.icons.check(reg, cfg.mode, &mut result);
        }
        for item in &self.contents {
            result.merge(item.validate(reg, cfg));
        }
        result
    }

    /// Export as `{"blueprint_book": {...}}`. Entries are renumbered from 0.
    pub fn to_value(&self) -> Value {
        let mut book = Map::new();
        book.insert("item".into(), "blueprint-book".into());
        if let Some(label) = &self.label {
            book.insert("label".into(), label.clone().into());
        }
        if let Some(color) = &self.label_color {
            book.insert("label_color".into(), color.to_value());
        }
        if let Some(description) = &self.description {
            book.insert("description".into(), description.clone().into());
        }
        if !self.icons.is_empty() {
            book.insert("icons".into(), self.icons.to_value());
        }
        let entries: Vec<Value> = self
            .contents
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let mut entry = Map::new();
                entry.insert("index".into(), i.into());
                if let Value::Object(inner) = item.to_value() {
                    entry.extend(inner);
                }
                Value::Object(entry)
            })
            .collect();
        book.insert("blueprints".into(), Value::Array(entries));
        book.insert("active_index".into(), self.active_index.into());
        for (k, v) in &self.extra {
            book.insert(k.clone(), v.clone());
        }
        book.insert("version".into(), self.version.pack().into());

        let mut root = Map::new();
        root.insert("blueprint_book".into(), Value::Object(book));
        Value::Object(root)
    }

    /// Parse `{"blueprint_book": {...}}`. Entries are placed in `index`
    /// order; gaps are closed.
    pub fn from_value(
        value: &Value,
        reg: &PrototypeRegistry,
        cfg: &DraftConfig,
    ) -> Result<(BlueprintBook, Vec<DraftWarning>), BlueprintError> {
        let root = as_object("", value)?;
        let Some(inner) = root.get("blueprint_book") else {
            let found = root.keys().next().cloned().unwrap_or_default();
            return Err(BlueprintError::WrongRoot {
                expected: "blueprint_book",
                found,
            });
        };
        let map = as_object("blueprint_book", inner)?;
        let mut book = BlueprintBook::new();
        let mut warnings = Vec::new();

        for (key, v) in map {
            match key.as_str() {
                "item" | "version" | "active_index" => {}
                "label" => book.label = Some(as_str("label", v)?.to_string()),
                "label_color" => book.label_color = Some(Color::from_value("label_color", v)?),
                "description" => book.description = Some(as_str("description", v)?.to_string()),
                "icons" => book.icons = Icons::from_value(v, reg)?,
                "blueprints" => {
                    let mut indexed = Vec::new();
                    for (i, entry) in as_array("blueprints", v)?.iter().enumerate() {
                        let index = match entry.get("index") {
                            Some(n) => as_u64("blueprints.index", n)?,
                            None => i as u64,
                        };
                        let (item, found) = Blueprintable::from_value(entry, reg, cfg)?;
                        warnings.extend(found);
                        indexed.push((index, item));
                    }
                    indexed.sort_by_key(|(index, _)| *index);
                    book.contents = indexed.into_iter().map(|(_, item)| item).collect();
                }
                _ if cfg.mode == ValidationMode::Strict => {
                    return Err(BlueprintError::UnknownKey(key.clone()));
                }
                _ => {
                    warnings.push(DraftWarning::UnrecognizedKey {
                        entity: "blueprint_book".into(),
                        key: key.clone(),
                    });
                    book.extra.insert(key.clone(), v.clone());
                }
            }
        }
        if let Some(v) = map.get("active_index") {
            let index = as_u64("active_index", v)?;
            book.set_active_index(usize::try_from(index).unwrap_or(usize::MAX))?;
        }
        if let Some(v) = map.get("version") {
            book.version = Version::unpack(as_u64("version", v)?);
        }
        if cfg.mode.checks_registry() {
            let mut result = ValidationResult::new();
            book.icons.check(reg, cfg.mode, &mut result);
            warnings.extend(result.into_result()?);
        }
        Ok((book, warnings))
    }

    pub fn to_string(&self) -> Result<String, BlueprintError> {
        Ok(codec::encode(&self.to_value())?)
    }

    pub fn from_string(
        s: &str,
        reg: &PrototypeRegistry,
        cfg: &DraftConfig,
    ) -> Result<(BlueprintBook, Vec<DraftWarning>), BlueprintError> {
        Self::from_value(&codec::decode(s)?, reg, cfg)
    }
}

impl From<Blueprint> for Blueprintable {
    fn from(bp: Blueprint) -> Self {
        Blueprintable::Blueprint(bp)
    }
}

impl From<BlueprintBook> for Blueprintable {
    fn from(book: BlueprintBook) -> Self {
        Blueprintable::Book(book)
    }
}
