//! Typed accessors over `serde_json::Value` that report the offending field.

use serde_json::{Map, Value};

use crate::error::DraftError;

/// Interpret `value` as a JSON object.
pub fn as_object<'a>(field: &str, value: &'a Value) -> Result<&'a Map<String, Value>, DraftError> {
    value
        .as_object()
        .ok_or_else(|| DraftError::wrong_type(field, "an object"))
}

/// Interpret `value` as a JSON array.
pub fn as_array<'a>(field: &str, value: &'a Value) -> Result<&'a Vec<Value>, DraftError> {
    value
        .as_array()
        .ok_or_else(|| DraftError::wrong_type(field, "an array"))
}

pub fn as_str<'a>(field: &str, value: &'a Value) -> Result<&'a str, DraftError> {
    value
        .as_str()
        .ok_or_else(|| DraftError::wrong_type(field, "a string"))
}

pub fn as_bool(field: &str, value: &Value) -> Result<bool, DraftError> {
    value
        .as_bool()
        .ok_or_else(|| DraftError::wrong_type(field, "a boolean"))
}

/// A finite number. Integers are widened.
pub fn finite_f64(field: &str, value: &Value) -> Result<f64, DraftError> {
    let v = value
        .as_f64()
        .ok_or_else(|| DraftError::wrong_type(field, "a number"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(DraftError::invalid(field, "must be finite"))
    }
}

/// An integer in `i32` range. Whole floats (`3.0`) are accepted.
pub fn as_i32(field: &str, value: &Value) -> Result<i32, DraftError> {
    let wide = as_i64(field, value)?;
    i32::try_from(wide)
        .map_err(|_| DraftError::invalid(field, format!("{wide} is out of 32-bit range")))
}

/// An unsigned integer in `u32` range.
pub fn as_u32(field: &str, value: &Value) -> Result<u32, DraftError> {
    let wide = as_i64(field, value)?;
    u32::try_from(wide).map_err(|_| {
        DraftError::invalid(field, format!("{wide} must be a non-negative 32-bit integer"))
    })
}

pub fn as_u64(field: &str, value: &Value) -> Result<u64, DraftError> {
    let wide = as_i64(field, value)?;
    u64::try_from(wide)
        .map_err(|_| DraftError::invalid(field, format!("{wide} must be non-negative")))
}

pub fn as_i64(field: &str, value: &Value) -> Result<i64, DraftError> {
    if let Some(v) = value.as_i64() {
        return Ok(v);
    }
    if let Some(v) = value.as_f64() {
        if v.fract() == 0.0 && v.is_finite() && v.abs() < i64::MAX as f64 {
            return Ok(v as i64);
        }
    }
    Err(DraftError::wrong_type(field, "an integer"))
}

/// Fetch a required key.
pub fn require<'a>(
    map: &'a Map<String, Value>,
    field: &str,
    key: &str,
) -> Result<&'a Value, DraftError> {
    map.get(key)
        .ok_or_else(|| DraftError::MissingField(join(field, key)))
}

/// `"parent.child"`, or just `child` when the parent is empty.
pub fn join(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integers_accept_whole_floats() {
        assert_eq!(as_i32("count", &json!(3.0)).unwrap(), 3);
        assert!(as_i32("count", &json!(3.5)).is_err());
        assert!(as_i32("count", &json!(1i64 << 40)).is_err());
    }

    #[test]
    fn unsigned_rejects_negative() {
        let err = as_u32("bar", &json!(-1)).unwrap_err();
        assert!(matches!(err, DraftError::InvalidValue { .. }));
    }

    #[test]
    fn missing_key_names_full_path() {
        let map = json!({"a": 1});
        let err = require(map.as_object().unwrap(), "control_behavior", "b").unwrap_err();
        assert_eq!(err, DraftError::MissingField("control_behavior.b".into()));
    }
}
