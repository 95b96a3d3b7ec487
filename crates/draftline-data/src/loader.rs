//! Prototype data loading: format detection, file discovery, and
//! deserialization of the prototype tables and validation config.
//!
//! A prototype directory holds one file per table (`entities`, `items`,
//! `fluids`, `signals`, `recipes`, `instruments`), each in RON, JSON, or
//! TOML. Only `entities` and `items` are required.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use draftline_core::config::DraftConfig;
use serde::de::DeserializeOwned;

use crate::registry::{PrototypeRegistry, RegistryBuilder, RegistryError};
use crate::schema::*;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading prototype data.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The tables parsed but do not form a consistent registry.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name.
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = &found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    tracing::debug!(dir = %dir.display(), base_name, found = ?found, "data file lookup");
    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_str<T: DeserializeOwned>(
    format: Format,
    content: &str,
    origin: &Path,
) -> Result<T, DataLoadError> {
    let parse_err = |detail: String| DataLoadError::Parse {
        file: origin.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    parse_str(format, &content, path)
}

/// Deserialize a list from a file. TOML has no top-level arrays, so for TOML
/// the list is read from the array at `toml_key`; RON and JSON files hold the
/// list directly.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    if format != Format::Toml {
        return parse_str(format, &content, path);
    }

    let mut table: toml::Table = parse_str(format, &content, path)?;
    let array = table.remove(toml_key).ok_or_else(|| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: format!("missing key '{toml_key}' in TOML file"),
    })?;
    array
        .try_into()
        .map_err(|e: toml::de::Error| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        })
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Return a `DuplicateName` error if `name` was already seen.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Prototype loading
// ===========================================================================

/// Load all prototype tables from a directory and freeze them into a registry.
pub fn load_prototypes_dir(dir: &Path) -> Result<PrototypeRegistry, DataLoadError> {
    let entities_path = require_data_file(dir, "entities")?;
    let items_path = require_data_file(dir, "items")?;

    let entities: Vec<EntityPrototypeData> = deserialize_list(&entities_path, "entities")?;
    let items: Vec<ItemData> = deserialize_list(&items_path, "items")?;
    check_unique(entities.iter().map(|e| e.name.as_str()), &entities_path)?;
    check_unique(items.iter().map(|i| i.name.as_str()), &items_path)?;

    let optional = |base: &str| find_data_file(dir, base);
    let fluids: Vec<FluidData> = match optional("fluids")? {
        Some(p) => deserialize_list(&p, "fluids")?,
        None => Vec::new(),
    };
    let virtual_signals: Vec<String> = match optional("signals")? {
        Some(p) => deserialize_list(&p, "signals")?,
        None => Vec::new(),
    };
    let recipes: Vec<RecipeData> = match optional("recipes")? {
        Some(p) => {
            let recipes: Vec<RecipeData> = deserialize_list(&p, "recipes")?;
            check_ingredients(&recipes, &items, &fluids, &p)?;
            recipes
        }
        None => Vec::new(),
    };
    let instruments: Vec<InstrumentData> = match optional("instruments")? {
        Some(p) => deserialize_list(&p, "instruments")?,
        None => Vec::new(),
    };

    let data = PrototypeData {
        entities,
        items,
        fluids,
        virtual_signals,
        recipes,
        instruments,
    };
    tracing::debug!(
        dir = %dir.display(),
        entities = data.entities.len(),
        items = data.items.len(),
        "loaded prototype tables"
    );
    Ok(RegistryBuilder::from_data(data)?.build()?)
}

/// Load a single JSON document holding every table.
pub fn load_prototypes_str(json: &str) -> Result<PrototypeRegistry, DataLoadError> {
    let data: PrototypeData = parse_str(Format::Json, json, Path::new("<string>"))?;
    Ok(RegistryBuilder::from_data(data)?.build()?)
}

/// Load a [`DraftConfig`] from a RON, JSON, or TOML file.
pub fn load_config(path: &Path) -> Result<DraftConfig, DataLoadError> {
    deserialize_file(path)
}

fn check_unique<'a>(
    names: impl Iterator<Item = &'a str>,
    file: &Path,
) -> Result<(), DataLoadError> {
    let mut seen = HashMap::new();
    for name in names {
        check_duplicate(&seen, name, file)?;
        seen.insert(name.to_string(), ());
    }
    Ok(())
}

fn check_ingredients(
    recipes: &[RecipeData],
    items: &[ItemData],
    fluids: &[FluidData],
    file: &Path,
) -> Result<(), DataLoadError> {
    let known: HashMap<String, ()> = items
        .iter()
        .map(|i| i.name.clone())
        .chain(fluids.iter().map(|f| f.name.clone()))
        .map(|n| (n, ()))
        .collect();
    for recipe in recipes {
        for ingredient in &recipe.ingredients {
            resolve_name(&known, ingredient.name(), file, "ingredient")?;
        }
    }
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
