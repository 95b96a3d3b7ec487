//! Item filter lists, logistic requests, wagon inventories, and module/fuel
//! requests.

use draftline_core::error::DraftError;
use draftline_core::filters::SparseFilters;
use draftline_core::value::{as_object, as_str, as_u32, join, require};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Item filters
// ---------------------------------------------------------------------------

/// Sparse item-name slots, exported as `[{"index", "name"}]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFilters(SparseFilters<String>);

impl ItemFilters {
    pub fn new(field: &'static str, capacity: usize) -> Self {
        Self(SparseFilters::new(field, capacity))
    }

    /// Set or (with `None`) clear a slot.
    pub fn set(&mut self, index: usize, item: Option<&str>) -> Result<(), DraftError> {
        self.0.set(index, item.map(str::to_string)).map(|_| ())
    }

    /// Replace all slots with `items`, numbered from 0.
    pub fn set_all<'a>(
        &mut self,
        items: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), DraftError> {
        self.0
            .set_all(items.into_iter().enumerate().map(|(i, s)| (i, s.to_string())))
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.0.iter().map(|(i, s)| (i, s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.0.capacity()
    }

    pub fn to_value(&self) -> Value {
        self.0.to_value_with(|name, m| {
            m.insert("name".into(), name.clone().into());
        })
    }

    pub fn from_value(
        field: &'static str,
        capacity: usize,
        value: &Value,
    ) -> Result<Self, DraftError> {
        SparseFilters::from_value_with(field, capacity, value, |path, entry| {
            let name = as_str(&join(path, "name"), require(entry, path, "name")?)?;
            Ok(Some(name.to_string()))
        })
        .map(Self)
    }
}

// ---------------------------------------------------------------------------
// Request filters
// ---------------------------------------------------------------------------

/// One logistic request slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFilter {
    pub name: String,
    pub count: u32,
}

/// Sparse request slots, exported as `[{"index", "name", "count"}]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFilters(SparseFilters<RequestFilter>);

impl RequestFilters {
    pub fn new(capacity: usize) -> Self {
        Self(SparseFilters::new("request_filters", capacity))
    }

    pub fn set(&mut self, index: usize, request: Option<(&str, u32)>) -> Result<(), DraftError> {
        let request = request.map(|(name, count)| RequestFilter {
            name: name.to_string(),
            count,
        });
        self.0.set(index, request).map(|_| ())
    }

    pub fn set_all<'a>(
        &mut self,
        requests: impl IntoIterator<Item = (&'a str, u32)>,
    ) -> Result<(), DraftError> {
        self.0.set_all(requests.into_iter().enumerate().map(|(i, (name, count))| {
            (
                i,
                RequestFilter {
                    name: name.to_string(),
                    count,
                },
            )
        }))
    }

    pub fn get(&self, index: usize) -> Option<&RequestFilter> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &RequestFilter)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        self.0.to_value_with(|r, m| {
            m.insert("name".into(), r.name.clone().into());
            m.insert("count".into(), r.count.into());
        })
    }

    pub fn from_value(capacity: usize, value: &Value) -> Result<Self, DraftError> {
        SparseFilters::from_value_with("request_filters", capacity, value, |path, entry| {
            let name = as_str(&join(path, "name"), require(entry, path, "name")?)?;
            let count = match entry.get("count") {
                Some(c) => as_u32(&join(path, "count"), c)?,
                None => 0,
            };
            Ok(Some(RequestFilter {
                name: name.to_string(),
                count,
            }))
        })
        .map(Self)
    }
}

// ---------------------------------------------------------------------------
// Wagon inventory
// ---------------------------------------------------------------------------

/// Cargo wagon `inventory`: per-slot filters plus a limiting bar.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryFilters {
    pub filters: ItemFilters,
    bar: Option<u32>,
    size: u32,
}

impl InventoryFilters {
    pub fn new(size: u32) -> Self {
        Self {
            filters: ItemFilters::new("inventory.filters", size as usize),
            bar: None,
            size,
        }
    }

    pub fn bar(&self) -> Option<u32> {
        self.bar
    }

    pub fn set_bar(&mut self, bar: Option<u32>) -> Result<(), DraftError> {
        check_bar("inventory.bar", bar, self.size)?;
        self.bar = bar;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.bar.is_none()
    }

    /// `None` when nothing is set.
    pub fn to_value(&self) -> Option<Value> {
        if self.is_empty() {
            return None;
        }
        let mut map = Map::new();
        if !self.filters.is_empty() {
            map.insert("filters".into(), self.filters.to_value());
        }
        if let Some(bar) = self.bar {
            map.insert("bar".into(), bar.into());
        }
        Some(Value::Object(map))
    }

    pub fn from_value(size: u32, value: &Value) -> Result<Self, DraftError> {
        let map = as_object("inventory", value)?;
        let mut inventory = Self::new(size);
        if let Some(v) = map.get("filters") {
            inventory.filters = ItemFilters::from_value("inventory.filters", size as usize, v)?;
        }
        if let Some(v) = map.get("bar").filter(|v| !v.is_null()) {
            inventory.set_bar(Some(as_u32("inventory.bar", v)?))?;
        }
        Ok(inventory)
    }
}

/// A bar may sit anywhere from 0 up to the inventory size.
pub fn check_bar(field: &str, bar: Option<u32>, size: u32) -> Result<(), DraftError> {
    match bar {
        Some(b) if b > size => Err(DraftError::invalid(
            field,
            format!("{b} exceeds inventory size {size}"),
        )),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Item requests
// ---------------------------------------------------------------------------

/// Module and fuel requests (`items`), kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemRequests {
    entries: Vec<(String, u32)>,
}

impl ItemRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `count` of `item`. A count of 0 removes the request.
    pub fn set(&mut self, item: &str, count: u32) {
        let existing = self.entries.iter().position(|(name, _)| name == item);
        match (existing, count) {
            (Some(i), 0) => {
                self.entries.remove(i);
            }
            (Some(i), n) => self.entries[i].1 = n,
            (None, 0) => {}
            (None, n) => self.entries.push((item.to_string(), n)),
        }
    }

    pub fn get(&self, item: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(name, _)| name == item)
            .map(|(_, n)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(name, n)| (name.as_str(), *n))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(name, n)| (name.clone(), Value::from(*n)))
            .collect();
        Value::Object(map)
    }

    pub fn from_value(value: &Value) -> Result<Self, DraftError> {
        let mut requests = Self::new();
        for (name, count) in as_object("items", value)? {
            requests.set(name, as_u32(&join("items", name), count)?);
        }
        Ok(requests)
    }
}
