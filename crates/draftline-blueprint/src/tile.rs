//! Floor tiles (concrete, landfill, ...).

use draftline_core::error::DraftError;
use draftline_core::geometry::TilePosition;
use draftline_core::value::{as_i32, as_object, as_str, require};
use serde_json::{Map, Value, json};

/// A tile placed by the blueprint. Tiles occupy exactly one grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tile {
    pub name: String,
    pub position: TilePosition,
}

impl Tile {
    pub fn new(name: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            name: name.into(),
            position: TilePosition::new(x, y),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".into(), self.name.clone().into());
        map.insert(
            "position".into(),
            json!({"x": self.position.x, "y": self.position.y}),
        );
        Value::Object(map)
    }

    pub fn from_value(value: &Value) -> Result<Self, DraftError> {
        let map = as_object("tiles", value)?;
        let name = as_str("tiles.name", require(map, "tiles", "name")?)?;
        let position = as_object("tiles.position", require(map, "tiles", "position")?)?;
        let x = as_i32("tiles.position.x", require(position, "tiles.position", "x")?)?;
        let y = as_i32("tiles.position.y", require(position, "tiles.position", "y")?)?;
        Ok(Self::new(name, x, y))
    }
}
