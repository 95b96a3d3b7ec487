//! Soft validation findings.
//!
//! Errors reject an assignment outright. Warnings describe blueprints the
//! game will still import but that are probably not what the author meant:
//! unknown modded names, overlapping entities, wires that are too long.

use std::fmt;

use crate::error::DraftError;
use crate::geometry::Vector;

/// A problem that does not prevent the blueprint from being exported.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftWarning {
    /// A name missing from the prototype tables, kept in permissive mode.
    UnknownName { field: String, name: String },
    /// A key the entity kind does not understand, preserved verbatim.
    UnrecognizedKey { entity: String, key: String },
    /// More modules requested than the machine has slots for.
    ModuleOverflow {
        entity: String,
        requested: u32,
        slots: u32,
    },
    /// An item that the entity cannot hold in its module or fuel slots.
    ItemNotAllowed { entity: String, item: String },
    /// A double-grid-aligned entity was moved to even coordinates.
    GridSnapped { entity: String, from: Vector, to: Vector },
    /// Two entities cover the same tile.
    Overlapping { a: String, b: String, at: (i32, i32) },
    /// A wire longer than the shorter of the two reaches.
    WireTooLong {
        a: String,
        b: String,
        distance: f64,
        max: f64,
    },
    /// An instrument or note id beyond the speaker's table.
    SpeakerOutOfRange { field: &'static str, id: u32, max: u32 },
}

impl fmt::Display for DraftWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftWarning::UnknownName { field, name } => {
                write!(f, "unknown name '{name}' in '{field}'")
            }
            DraftWarning::UnrecognizedKey { entity, key } => {
                write!(f, "'{entity}' has unrecognized key '{key}'")
            }
            DraftWarning::ModuleOverflow {
                entity,
                requested,
                slots,
            } => write!(f, "'{entity}' requests {requested} modules but has {slots} slots"),
            DraftWarning::ItemNotAllowed { entity, item } => {
                write!(f, "'{entity}' cannot hold item '{item}'")
            }
            DraftWarning::GridSnapped { entity, from, to } => write!(
                f,
                "'{entity}' snapped from ({}, {}) to ({}, {})",
                from.x_f64(),
                from.y_f64(),
                to.x_f64(),
                to.y_f64()
            ),
            DraftWarning::Overlapping { a, b, at } => {
                write!(f, "'{a}' overlaps '{b}' at tile ({}, {})", at.0, at.1)
            }
            DraftWarning::WireTooLong { a, b, distance, max } => write!(
                f,
                "wire between '{a}' and '{b}' is {distance:.2} tiles long (max {max:.2})"
            ),
            DraftWarning::SpeakerOutOfRange { field, id, max } => {
                write!(f, "{field} {id} is out of range (max {max})")
            }
        }
    }
}

/// Outcome of a full validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<DraftError>,
    pub warnings: Vec<DraftWarning>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&mut self, error: DraftError) {
        tracing::debug!(%error, "validation error");
        self.errors.push(error);
    }

    pub fn push_warning(&mut self, warning: DraftWarning) {
        tracing::warn!(%warning, "validation warning");
        self.warnings.push(warning);
    }

    /// Fold another result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// No errors and no warnings.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Convert into a `Result`, surfacing the first error.
    pub fn into_result(self) -> Result<Vec<DraftWarning>, DraftError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.warnings),
        }
    }
}
