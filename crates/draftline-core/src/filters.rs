//! Index-keyed sparse arrays with a fixed capacity.
//!
//! Filter slots, request slots, constant combinator slots, and blueprint
//! icons all share this shape: a slot is either set or absent, assigning
//! `None` deletes it, and indices beyond the prototype's capacity are
//! rejected. Indices are 0-based here and 1-based in blueprint JSON.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::DraftError;
use crate::value::{as_array, as_object, as_u32, join, require};

/// A sparse, bounded, index-ordered collection of slot values.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseFilters<T> {
    field: &'static str,
    capacity: usize,
    slots: BTreeMap<usize, T>,
}

impl<T> SparseFilters<T> {
    /// An empty collection for `field` with `capacity` slots.
    pub fn new(field: &'static str, capacity: usize) -> Self {
        Self {
            field,
            capacity,
            slots: BTreeMap::new(),
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn check(&self, index: usize) -> Result<(), DraftError> {
        if index < self.capacity {
            Ok(())
        } else {
            Err(DraftError::IndexOutOfBounds {
                field: self.field.to_string(),
                index,
                capacity: self.capacity,
            })
        }
    }

    /// Insert, overwrite, or (with `None`) delete the slot at `index`.
    /// Returns the previous occupant.
    pub fn set(&mut self, index: usize, value: Option<T>) -> Result<Option<T>, DraftError> {
        self.check(index)?;
        Ok(match value {
            Some(v) => self.slots.insert(index, v),
            None => self.slots.remove(&index),
        })
    }

    /// Replace every slot at once. Nothing changes if any index is invalid.
    pub fn set_all(
        &mut self,
        entries: impl IntoIterator<Item = (usize, T)>,
    ) -> Result<(), DraftError> {
        let mut fresh = BTreeMap::new();
        for (index, value) in entries {
            self.check(index)?;
            fresh.insert(index, value);
        }
        self.slots = fresh;
        Ok(())
    }

    /// Put `value` in the lowest free slot and return its index.
    pub fn push(&mut self, value: T) -> Result<usize, DraftError> {
        let index = (0..self.capacity)
            .find(|i| !self.slots.contains_key(i))
            .ok_or_else(|| DraftError::IndexOutOfBounds {
                field: self.field.to_string(),
                index: self.capacity,
                capacity: self.capacity,
            })?;
        self.slots.insert(index, value);
        Ok(index)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(&index)
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots.iter().map(|(i, v)| (*i, v))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.values()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Change the capacity. Fails if an occupied slot would fall outside.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), DraftError> {
        if let Some((&last, _)) = self.slots.last_key_value() {
            if last >= capacity {
                return Err(DraftError::IndexOutOfBounds {
                    field: self.field.to_string(),
                    index: last,
                    capacity,
                });
            }
        }
        self.capacity = capacity;
        Ok(())
    }

    /// Emit `[{"index": i + 1, ...}]`; `entry` fills in the other keys.
    pub fn to_value_with(&self, mut entry: impl FnMut(&T, &mut Map<String, Value>)) -> Value {
        let list = self
            .iter()
            .map(|(i, v)| {
                let mut map = Map::new();
                map.insert("index".into(), (i + 1).into());
                entry(v, &mut map);
                Value::Object(map)
            })
            .collect();
        Value::Array(list)
    }

    /// Parse a 1-based `[{"index", ...}]` list; `entry` reads the other keys.
    /// Entries for which `entry` returns `None` are skipped.
    pub fn from_value_with(
        field: &'static str,
        capacity: usize,
        value: &Value,
        mut entry: impl FnMut(&str, &Map<String, Value>) -> Result<Option<T>, DraftError>,
    ) -> Result<Self, DraftError> {
        let mut filters = Self::new(field, capacity);
        for (pos, item) in as_array(field, value)?.iter().enumerate() {
            let path = format!("{field}[{pos}]");
            let map = as_object(&path, item)?;
            let index = as_u32(&join(&path, "index"), require(map, &path, "index")?)? as usize;
            if index == 0 {
                return Err(DraftError::invalid(join(&path, "index"), "indices start at 1"));
            }
            if let Some(v) = entry(&path, map)? {
                filters.set(index - 1, Some(v))?;
            }
        }
        Ok(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_overwrite_delete() {
        let mut f = SparseFilters::new("filters", 5);
        assert_eq!(f.set(2, Some("coal")).unwrap(), None);
        assert_eq!(f.set(2, Some("stone")).unwrap(), Some("coal"));
        assert_eq!(f.get(2), Some(&"stone"));
        assert_eq!(f.set(2, None).unwrap(), Some("stone"));
        assert!(f.is_empty());
        // Deleting an empty slot is not an error.
        assert_eq!(f.set(4, None).unwrap(), None);
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut f: SparseFilters<&str> = SparseFilters::new("filters", 5);
        let err = f.set(5, Some("coal")).unwrap_err();
        assert_eq!(
            err,
            DraftError::IndexOutOfBounds {
                field: "filters".into(),
                index: 5,
                capacity: 5
            }
        );
    }

    #[test]
    fn set_all_is_atomic() {
        let mut f = SparseFilters::new("filters", 2);
        f.set(0, Some(1)).unwrap();
        assert!(f.set_all([(0, 5), (3, 6)]).is_err());
        assert_eq!(f.get(0), Some(&1));
        f.set_all([(1, 7)]).unwrap();
        assert_eq!(f.iter().collect::<Vec<_>>(), vec![(1, &7)]);
    }

    #[test]
    fn push_fills_gaps() {
        let mut f = SparseFilters::new("icons", 3);
        f.set(0, Some('a')).unwrap();
        f.set(2, Some('c')).unwrap();
        assert_eq!(f.push('b').unwrap(), 1);
        assert!(f.push('d').is_err());
    }

    #[test]
    fn shrinking_capacity_checks_occupied_slots() {
        let mut f = SparseFilters::new("filters", 10);
        f.set(7, Some(())).unwrap();
        assert!(f.set_capacity(5).is_err());
        assert!(f.set_capacity(8).is_ok());
    }

    #[test]
    fn json_is_one_based() {
        let mut f = SparseFilters::new("filters", 5);
        f.set(0, Some("coal".to_string())).unwrap();
        f.set(3, Some("stone".to_string())).unwrap();
        let value = f.to_value_with(|name, map| {
            map.insert("name".into(), name.clone().into());
        });
        assert_eq!(
            value,
            json!([{"index": 1, "name": "coal"}, {"index": 4, "name": "stone"}])
        );

        let parsed = SparseFilters::from_value_with("filters", 5, &value, |path, map| {
            let name = crate::value::as_str(path, require(map, path, "name")?)?;
            Ok(Some(name.to_string()))
        })
        .unwrap();
        assert_eq!(parsed, f);
    }

    #[test]
    fn json_index_zero_is_rejected() {
        let value = json!([{"index": 0}]);
        let err = SparseFilters::<()>::from_value_with("filters", 5, &value, |_, _| Ok(Some(())))
            .unwrap_err();
        assert!(matches!(err, DraftError::InvalidValue { .. }));
    }
}
