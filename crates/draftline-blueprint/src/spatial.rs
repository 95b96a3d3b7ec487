//! Tile occupancy index used for overlap detection.
//!
//! Each tile maps to the first entity that claimed it.

use std::collections::BTreeMap;

use draftline_core::geometry::{Footprint, TilePosition};
use draftline_core::id::EntityId;

/// Errors from placing entities in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpatialError {
    #[error("tile ({}, {}) is occupied", .at.x, .at.y)]
    Occupied { by: EntityId, at: TilePosition },
}

#[derive(Debug, Default, Clone)]
pub struct SpatialIndex {
    tiles: BTreeMap<TilePosition, EntityId>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every tile of `footprint` at `origin` for `entity`. Nothing is
    /// claimed when any tile is taken.
    pub fn place(
        &mut self,
        entity: EntityId,
        origin: TilePosition,
        footprint: Footprint,
    ) -> Result<(), SpatialError> {
        let conflict = footprint
            .tiles(origin)
            .find_map(|tile| self.tiles.get(&tile).map(|by| (tile, *by)));
        if let Some((at, by)) = conflict {
            return Err(SpatialError::Occupied { by, at });
        }
        for tile in footprint.tiles(origin) {
            self.tiles.insert(tile, entity);
        }
        Ok(())
    }
}
