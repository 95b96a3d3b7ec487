//! Positions, footprints, and directions on the blueprint grid.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::DraftError;
use crate::fixed::{Fixed64, f64_to_fixed64, fixed64_to_f64, half};
use crate::value::finite_f64;

// ---------------------------------------------------------------------------
// Vector
// ---------------------------------------------------------------------------

/// A point in world coordinates (tile units, +y is south).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Vector {
    pub x: Fixed64,
    pub y: Fixed64,
}

impl Vector {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: f64_to_fixed64(x),
            y: f64_to_fixed64(y),
        }
    }

    pub fn from_fixed(x: Fixed64, y: Fixed64) -> Self {
        Self { x, y }
    }

    pub fn x_f64(&self) -> f64 {
        fixed64_to_f64(self.x)
    }

    pub fn y_f64(&self) -> f64 {
        fixed64_to_f64(self.y)
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Vector) -> f64 {
        let dx = self.x_f64() - other.x_f64();
        let dy = self.y_f64() - other.y_f64();
        (dx * dx + dy * dy).sqrt()
    }

    /// Parse `{"x": .., "y": ..}` or the `[x, y]` shorthand.
    pub fn from_value(field: &str, value: &Value) -> Result<Self, DraftError> {
        match value {
            Value::Object(map) => {
                let x = map
                    .get("x")
                    .ok_or_else(|| DraftError::MissingField(format!("{field}.x")))?;
                let y = map
                    .get("y")
                    .ok_or_else(|| DraftError::MissingField(format!("{field}.y")))?;
                Ok(Self::new(finite_f64(field, x)?, finite_f64(field, y)?))
            }
            Value::Array(items) if items.len() == 2 => {
                Ok(Self::new(finite_f64(field, &items[0])?, finite_f64(field, &items[1])?))
            }
            _ => Err(DraftError::wrong_type(field, "a {x, y} object or [x, y] pair")),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({ "x": self.x_f64(), "y": self.y_f64() })
    }
}

// ---------------------------------------------------------------------------
// TilePosition
// ---------------------------------------------------------------------------

/// Integer coordinates of a tile's top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePosition {
    pub x: i32,
    pub y: i32,
}

impl TilePosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Round both coordinates down to the nearest even number.
    pub fn snapped_to_double_grid(self) -> Self {
        Self {
            x: self.x.div_euclid(2) * 2,
            y: self.y.div_euclid(2) * 2,
        }
    }

    pub fn is_double_grid_aligned(self) -> bool {
        self.x.rem_euclid(2) == 0 && self.y.rem_euclid(2) == 0
    }
}

// ---------------------------------------------------------------------------
// Footprint
// ---------------------------------------------------------------------------

/// Tile width and height of an entity, as defined by its prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Footprint {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A 1x1 entity.
    pub fn single() -> Self {
        Self::new(1, 1)
    }

    /// Footprint after rotation. East and west swap width and height;
    /// diagonals keep the prototype's orientation.
    pub fn rotated(&self, direction: Direction) -> Self {
        match direction {
            Direction::East | Direction::West => Self {
                width: self.height,
                height: self.width,
            },
            _ => *self,
        }
    }

    /// Iterate over all tiles covered when the top-left corner is at `origin`.
    ///
    /// Tiles past the edge of the `i32` grid are clamped onto it.
    pub fn tiles(&self, origin: TilePosition) -> impl Iterator<Item = TilePosition> {
        let w = self.width as i32;
        let h = self.height as i32;
        let ox = origin.x;
        let oy = origin.y;
        (0..h).flat_map(move |dy| {
            (0..w).map(move |dx| TilePosition::new(ox.saturating_add(dx), oy.saturating_add(dy)))
        })
    }

    /// Last tile covered when the top-left corner is at `origin`.
    pub fn bottom_right(&self, origin: TilePosition) -> TilePosition {
        let span = |n: u32| i32::try_from(n.saturating_sub(1)).unwrap_or(i32::MAX);
        TilePosition::new(
            origin.x.saturating_add(span(self.width)),
            origin.y.saturating_add(span(self.height)),
        )
    }

    /// Center of the footprint whose top-left tile is `tile`.
    ///
    /// Saturates at the edge of the fixed-point range.
    pub fn center_of(&self, tile: TilePosition) -> Vector {
        Vector::from_fixed(
            Fixed64::from_num(tile.x).saturating_add(half(self.width)),
            Fixed64::from_num(tile.y).saturating_add(half(self.height)),
        )
    }

    /// Top-left tile of the footprint centered on `center`.
    ///
    /// Each axis is `floor(center - size/2 + 1/2)`, so off-grid centers round
    /// half-up to the nearest tile. Saturates like [`Footprint::center_of`].
    pub fn tile_of(&self, center: Vector) -> TilePosition {
        let one_half = Fixed64::from_num(0.5);
        let axis = |c: Fixed64, span: u32| {
            c.saturating_sub(half(span))
                .saturating_add(one_half)
                .floor()
                .to_num::<i32>()
        };
        TilePosition::new(axis(center.x, self.width), axis(center.y, self.height))
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Eight-way direction as encoded in blueprints (0 = north, clockwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// All eight directions in encoding order.
    pub fn all() -> [Direction; 8] {
        [
            Direction::North,
            Direction::NorthEast,
            Direction::East,
            Direction::SouthEast,
            Direction::South,
            Direction::SouthWest,
            Direction::West,
            Direction::NorthWest,
        ]
    }

    pub fn from_u8(value: u8) -> Option<Direction> {
        Self::all().get(value as usize).copied()
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// North, east, south or west.
    pub fn is_cardinal(self) -> bool {
        self.as_u8() % 2 == 0
    }

    /// Rotate clockwise by `steps` eighth-turns.
    pub fn rotate_cw(self, steps: u8) -> Self {
        Self::all()[((self.as_u8() + steps % 8) % 8) as usize]
    }

    /// Rotate counter-clockwise by `steps` eighth-turns.
    pub fn rotate_ccw(self, steps: u8) -> Self {
        self.rotate_cw(8 - steps % 8)
    }

    pub fn opposite(self) -> Self {
        self.rotate_cw(4)
    }
}
