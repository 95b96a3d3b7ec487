//! Validation settings shared by parsing and validation passes.
//!
//! A `DraftConfig` is plain data, deserializable from RON, JSON, or TOML
//! (see `draftline_data::loader::load_config`). Every field has a default so
//! partial files are fine.

use serde::{Deserialize, Serialize};

use crate::diagnostic::{DraftWarning, ValidationResult};
use crate::error::DraftError;

/// How strictly names are checked against the prototype tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Unknown names are errors.
    #[default]
    Strict,
    /// Unknown names are warnings; the values are kept as written.
    Permissive,
    /// No registry checks at all.
    None,
}

impl ValidationMode {
    /// Route an unknown-name finding according to the mode.
    ///
    /// Returns `Err` in strict mode; otherwise records a warning (permissive)
    /// or drops the finding (none).
    pub fn unknown_name(
        self,
        result: &mut ValidationResult,
        error: DraftError,
        field: &str,
        name: &str,
    ) -> Result<(), DraftError> {
        match self {
            ValidationMode::Strict => Err(error),
            ValidationMode::Permissive => {
                result.push_warning(DraftWarning::UnknownName {
                    field: field.to_string(),
                    name: name.to_string(),
                });
                Ok(())
            }
            ValidationMode::None => Ok(()),
        }
    }

    pub fn checks_registry(self) -> bool {
        self != ValidationMode::None
    }
}

/// Game version a blueprint is stamped with when none is given.
pub const DEFAULT_VERSION: [u16; 4] = [1, 1, 110, 0];

/// Top-level validation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftConfig {
    pub mode: ValidationMode,
    /// Report entities covering the same tile.
    pub check_overlaps: bool,
    /// Report wires longer than the prototypes allow.
    pub check_wire_distance: bool,
    /// `[major, minor, patch, dev]` stamped on new blueprints.
    pub version: [u16; 4],
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            mode: ValidationMode::default(),
            check_overlaps: true,
            check_wire_distance: true,
            version: DEFAULT_VERSION,
        }
    }
}

impl DraftConfig {
    pub fn permissive() -> Self {
        Self {
            mode: ValidationMode::Permissive,
            ..Self::default()
        }
    }
}
