use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DraftError;
use crate::value::{as_object, finite_f64, join};

/// RGBA color. Components are in `0..=255`; the game also accepts the
/// `0..=1` float range, which passes through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default = "opaque")]
    pub a: f64,
}

fn opaque() -> f64 {
    255.0
}

impl Color {
    pub fn rgb(r: f64, g: f64, b: f64) -> Result<Self, DraftError> {
        Self::rgba(r, g, b, opaque())
    }

    pub fn rgba(r: f64, g: f64, b: f64, a: f64) -> Result<Self, DraftError> {
        for (name, c) in [("r", r), ("g", g), ("b", b), ("a", a)] {
            check_component(&join("color", name), c)?;
        }
        Ok(Self { r, g, b, a })
    }

    /// Parse `{"r", "g", "b", "a"?}` or the `[r, g, b, a?]` shorthand.
    pub fn from_value(field: &str, value: &Value) -> Result<Self, DraftError> {
        let component = |name: &str, v: &Value| -> Result<f64, DraftError> {
            let path = join(field, name);
            let c = finite_f64(&path, v)?;
            check_component(&path, c)?;
            Ok(c)
        };
        match value {
            Value::Array(items) if items.len() == 3 || items.len() == 4 => Ok(Self {
                r: component("r", &items[0])?,
                g: component("g", &items[1])?,
                b: component("b", &items[2])?,
                a: match items.get(3) {
                    Some(v) => component("a", v)?,
                    None => opaque(),
                },
            }),
            Value::Array(_) => Err(DraftError::invalid(field, "expected 3 or 4 components")),
            _ => {
                let map = as_object(field, value)?;
                let get = |name: &str| -> Result<f64, DraftError> {
                    match map.get(name) {
                        Some(v) => component(name, v),
                        None if name == "a" => Ok(opaque()),
                        None => Err(DraftError::MissingField(join(field, name))),
                    }
                };
                Ok(Self {
                    r: get("r")?,
                    g: get("g")?,
                    b: get("b")?,
                    a: get("a")?,
                })
            }
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("r".into(), self.r.into());
        map.insert("g".into(), self.g.into());
        map.insert("b".into(), self.b.into());
        map.insert("a".into(), self.a.into());
        Value::Object(map)
    }
}

fn check_component(field: &str, c: f64) -> Result<(), DraftError> {
    if (0.0..=255.0).contains(&c) {
        Ok(())
    } else {
        Err(DraftError::invalid(field, format!("{c} is outside 0..=255")))
    }
}
