//! Draftline Core -- shared value types for Factorio blueprint modelling.
//!
//! Everything here is independent of the prototype tables: geometry in
//! exact fixed-point, signals and conditions with their shorthand
//! normalization, bounded sparse filter arrays, the per-kind capability
//! table, and the error/warning/config types used by every other crate.
//!
//! # Key Types
//!
//! - [`kind::EntityKind`] -- one variant per prototype `type`, carrying the
//!   [`capability::Capabilities`] that decide which fields a kind accepts.
//! - [`condition::Condition`] -- circuit/logistic condition with
//!   canonical comparator symbols.
//! - [`filters::SparseFilters`] -- index-keyed slots with insert, overwrite,
//!   and delete-by-`None`.
//! - [`geometry::Vector`] / [`geometry::Footprint`] -- center positions and
//!   tile footprints on the blueprint grid.
//! - [`error::DraftError`] / [`diagnostic::ValidationResult`] -- hard
//!   failures and soft findings.

pub mod capability;
pub mod color;
pub mod condition;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod filters;
pub mod fixed;
pub mod geometry;
pub mod id;
pub mod kind;
pub mod signal;
pub mod value;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
