//! Train schedules.
//!
//! A schedule names the locomotives that run it and an ordered list of
//! stops. Locomotives are held as [`EntityId`]s; the enclosing blueprint
//! translates them to and from `entity_number`s.

use draftline_core::condition::Condition;
use draftline_core::error::DraftError;
use draftline_core::id::EntityId;
use draftline_core::signal::SignalResolver;
use draftline_core::value::{as_array, as_object, as_str, as_u32, as_u64, join, require};
use serde_json::{Map, Value};

use crate::blueprint::BlueprintError;

/// What a train waits for at a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitConditionKind {
    Time,
    Inactivity,
    Full,
    Empty,
    ItemCount,
    FluidCount,
    Circuit,
    PassengerPresent,
    PassengerNotPresent,
    RobotsInactive,
}

const WAIT_KINDS: [(WaitConditionKind, &str); 10] = [
    (WaitConditionKind::Time, "time"),
    (WaitConditionKind::Inactivity, "inactivity"),
    (WaitConditionKind::Full, "full"),
    (WaitConditionKind::Empty, "empty"),
    (WaitConditionKind::ItemCount, "item_count"),
    (WaitConditionKind::FluidCount, "fluid_count"),
    (WaitConditionKind::Circuit, "circuit"),
    (WaitConditionKind::PassengerPresent, "passenger_present"),
    (WaitConditionKind::PassengerNotPresent, "passenger_not_present"),
    (WaitConditionKind::RobotsInactive, "robots_inactive"),
];

impl WaitConditionKind {
    pub fn as_str(self) -> &'static str {
        WAIT_KINDS[self as usize].1
    }

    pub fn parse(s: &str) -> Option<Self> {
        WAIT_KINDS.iter().find(|(_, name)| *name == s).map(|(k, _)| *k)
    }

    /// Kinds that carry a tick count.
    pub fn uses_ticks(self) -> bool {
        matches!(self, WaitConditionKind::Time | WaitConditionKind::Inactivity)
    }

    /// Kinds that carry a circuit-style condition.
    pub fn uses_condition(self) -> bool {
        matches!(
            self,
            WaitConditionKind::ItemCount
                | WaitConditionKind::FluidCount
                | WaitConditionKind::Circuit
        )
    }
}

/// How a wait condition combines with the one before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CompareType {
    #[default]
    Or,
    And,
}

impl CompareType {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareType::Or => "or",
            CompareType::And => "and",
        }
    }
}

/// One wait condition at a stop.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitCondition {
    kind: WaitConditionKind,
    pub compare_type: CompareType,
    ticks: Option<u32>,
    condition: Option<Condition>,
}

impl WaitCondition {
    /// Wait `ticks` (60 per second) at the stop.
    pub fn time(ticks: u32) -> Self {
        Self::with_ticks(WaitConditionKind::Time, ticks)
    }

    /// Wait until cargo has not changed for `ticks`.
    pub fn inactivity(ticks: u32) -> Self {
        Self::with_ticks(WaitConditionKind::Inactivity, ticks)
    }

    pub fn circuit(condition: Condition) -> Self {
        Self::with_condition(WaitConditionKind::Circuit, condition)
    }

    pub fn item_count(condition: Condition) -> Self {
        Self::with_condition(WaitConditionKind::ItemCount, condition)
    }

    pub fn fluid_count(condition: Condition) -> Self {
        Self::with_condition(WaitConditionKind::FluidCount, condition)
    }

    /// A condition with no parameters (`full`, `empty`, passenger checks).
    pub fn simple(kind: WaitConditionKind) -> Result<Self, DraftError> {
        if kind.uses_ticks() || kind.uses_condition() {
            return Err(DraftError::invalid(
                "wait_conditions.type",
                format!("'{}' needs parameters", kind.as_str()),
            ));
        }
        Ok(Self {
            kind,
            compare_type: CompareType::Or,
            ticks: None,
            condition: None,
        })
    }

    fn with_ticks(kind: WaitConditionKind, ticks: u32) -> Self {
        Self {
            kind,
            compare_type: CompareType::Or,
            ticks: Some(ticks),
            condition: None,
        }
    }

    fn with_condition(kind: WaitConditionKind, condition: Condition) -> Self {
        Self {
            kind,
            compare_type: CompareType::Or,
            ticks: None,
            condition: Some(condition),
        }
    }

    /// Builder form of setting `compare_type` to `and`.
    pub fn and(mut self) -> Self {
        self.compare_type = CompareType::And;
        self
    }

    pub fn kind(&self) -> WaitConditionKind {
        self.kind
    }

    pub fn ticks(&self) -> Option<u32> {
        self.ticks
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), self.kind.as_str().into());
        map.insert("compare_type".into(), self.compare_type.as_str().into());
        if let Some(t) = self.ticks {
            map.insert("ticks".into(), t.into());
        }
        if let Some(c) = &self.condition {
            map.insert("condition".into(), c.to_value());
        }
        Value::Object(map)
    }

    pub fn from_value(
        field: &str,
        value: &Value,
        signals: &dyn SignalResolver,
    ) -> Result<Self, DraftError> {
        let map = as_object(field, value)?;
        let type_field = join(field, "type");
        let raw = as_str(&type_field, require(map, field, "type")?)?;
        let kind = WaitConditionKind::parse(raw).ok_or_else(|| {
            DraftError::invalid(&type_field, format!("unknown wait condition '{raw}'"))
        })?;
        let compare_type = match map.get("compare_type") {
            None => CompareType::Or,
            Some(v) => match as_str(&join(field, "compare_type"), v)? {
                "or" => CompareType::Or,
                "and" => CompareType::And,
                other => {
                    return Err(DraftError::invalid(
                        join(field, "compare_type"),
                        format!("'{other}' is not one of: or, and"),
                    ));
                }
            },
        };
        let ticks = match (kind.uses_ticks(), map.get("ticks")) {
            (true, Some(v)) => Some(as_u32(&join(field, "ticks"), v)?),
            // The game writes 30 seconds for a fresh time condition.
            (true, None) => Some(1800),
            (false, _) => None,
        };
        let condition = match (kind.uses_condition(), map.get("condition")) {
            (true, Some(v)) => Some(Condition::from_value(&join(field, "condition"), v, signals)?),
            (true, None) => Some(Condition::default()),
            (false, _) => None,
        };
        Ok(Self {
            kind,
            compare_type,
            ticks,
            condition,
        })
    }
}

/// A station in a schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleStop {
    pub station: String,
    pub wait_conditions: Vec<WaitCondition>,
}

impl ScheduleStop {
    pub fn new(station: impl Into<String>) -> Self {
        Self {
            station: station.into(),
            wait_conditions: Vec::new(),
        }
    }

    pub fn with(mut self, condition: WaitCondition) -> Self {
        self.wait_conditions.push(condition);
        self
    }
}

/// A train schedule shared by one or more locomotives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    locomotives: Vec<EntityId>,
    stops: Vec<ScheduleStop>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locomotives(&self) -> &[EntityId] {
        &self.locomotives
    }

    /// Assign a locomotive to this schedule. Its kind is checked by
    /// [`Blueprint::add_schedule`](crate::blueprint::Blueprint::add_schedule).
    pub fn add_locomotive(&mut self, id: EntityId) {
        if !self.locomotives.contains(&id) {
            self.locomotives.push(id);
        }
    }

    pub(crate) fn forget_locomotive(&mut self, id: EntityId) {
        self.locomotives.retain(|l| *l != id);
    }

    pub fn stops(&self) -> &[ScheduleStop] {
        &self.stops
    }

    pub fn add_stop(&mut self, stop: ScheduleStop) {
        self.stops.push(stop);
    }

    /// Remove the stop at `index`.
    pub fn remove_stop(&mut self, index: usize) -> Result<ScheduleStop, DraftError> {
        if index >= self.stops.len() {
            return Err(DraftError::IndexOutOfBounds {
                field: "schedule".into(),
                index,
                capacity: self.stops.len(),
            });
        }
        Ok(self.stops.remove(index))
    }

    /// Remove every stop at `station`. Returns how many were removed.
    pub fn remove_station(&mut self, station: &str) -> usize {
        let before = self.stops.len();
        self.stops.retain(|s| s.station != station);
        before - self.stops.len()
    }

    /// Export with locomotive ids mapped through `number`. Locomotives
    /// missing from the map are dropped.
    pub fn to_value(&self, number: impl Fn(EntityId) -> Option<u64>) -> Value {
        let locomotives: Vec<Value> = self
            .locomotives
            .iter()
            .filter_map(|id| number(*id))
            .map(Value::from)
            .collect();
        let stops: Vec<Value> = self
            .stops
            .iter()
            .map(|stop| {
                let mut m = Map::new();
                m.insert("station".into(), stop.station.clone().into());
                if !stop.wait_conditions.is_empty() {
                    m.insert(
                        "wait_conditions".into(),
                        stop.wait_conditions.iter().map(WaitCondition::to_value).collect(),
                    );
                }
                Value::Object(m)
            })
            .collect();

        let mut map = Map::new();
        map.insert("locomotives".into(), Value::Array(locomotives));
        map.insert("schedule".into(), Value::Array(stops));
        Value::Object(map)
    }

    /// Parse a schedule, resolving `entity_number`s through `entity`.
    pub fn from_value(
        value: &Value,
        entity: impl Fn(u64) -> Option<EntityId>,
        signals: &dyn SignalResolver,
    ) -> Result<Self, BlueprintError> {
        let map = as_object("schedules", value)?;
        let mut schedule = Schedule::new();

        if let Some(locos) = map.get("locomotives") {
            for v in as_array("schedules.locomotives", locos)? {
                let number = as_u64("schedules.locomotives", v)?;
                let id = entity(number).ok_or(BlueprintError::UnknownEntityNumber(number))?;
                schedule.add_locomotive(id);
            }
        }

        if let Some(stops) = map.get("schedule") {
            for (i, v) in as_array("schedules.schedule", stops)?.iter().enumerate() {
                let field = format!("schedules.schedule[{i}]");
                let stop_map = as_object(&field, v)?;
                let station =
                    as_str(&join(&field, "station"), require(stop_map, &field, "station")?)?;
                let mut stop = ScheduleStop::new(station);
                if let Some(conds) = stop_map.get("wait_conditions") {
                    let cond_field = join(&field, "wait_conditions");
                    for c in as_array(&cond_field, conds)? {
                        stop.wait_conditions
                            .push(WaitCondition::from_value(&cond_field, c, signals)?);
                    }
                }
                schedule.add_stop(stop);
            }
        }
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftline_core::condition::Comparator;
    use draftline_core::signal::DictSignals;
    use draftline_core::test_utils::*;
    use serde_json::json;
    use slotmap::SlotMap;

    #[test]
    fn wait_condition_shapes() {
        let time = WaitCondition::time(600);
        assert_eq!(
            time.to_value(),
            json!({"type": "time", "compare_type": "or", "ticks": 600})
        );

        let full = WaitCondition::simple(WaitConditionKind::Full).unwrap().and();
        assert_eq!(full.to_value(), json!({"type": "full", "compare_type": "and"}));
        assert!(WaitCondition::simple(WaitConditionKind::Circuit).is_err());
    }

    #[test]
    fn parse_fills_defaults() {
        let c =
            WaitCondition::from_value("w", &json!({"type": "inactivity"}), &DictSignals).unwrap();
        assert_eq!(c.ticks(), Some(1800));
        assert_eq!(c.compare_type, CompareType::Or);

        let err = WaitCondition::from_value("w", &json!({"type": "teleport"}), &DictSignals)
            .unwrap_err();
        assert!(matches!(err, DraftError::InvalidValue { .. }));
    }

    #[test]
    fn stops_add_and_remove() {
        let mut s = Schedule::new();
        let full = WaitCondition::simple(WaitConditionKind::Full).unwrap();
        let empty = WaitCondition::simple(WaitConditionKind::Empty).unwrap();
        s.add_stop(ScheduleStop::new("Iron Load").with(full));
        s.add_stop(ScheduleStop::new("Iron Drop").with(empty));
        s.add_stop(ScheduleStop::new("Iron Load"));
        assert_eq!(s.remove_station("Iron Load"), 2);
        assert_eq!(s.stops().len(), 1);
        assert!(s.remove_stop(1).is_err());
        assert_eq!(s.remove_stop(0).unwrap().station, "Iron Drop");
    }

    #[test]
    fn locomotives_map_through_numbers() {
        let mut ids: SlotMap<EntityId, ()> = SlotMap::with_key();
        let loco = ids.insert(());

        let mut s = Schedule::new();
        s.add_locomotive(loco);
        s.add_locomotive(loco);
        assert_eq!(s.locomotives(), &[loco]);
        s.add_stop(
            ScheduleStop::new("Mine").with(WaitCondition::item_count(Condition::new(
                Some(iron_plate()),
                Comparator::Gte,
                2000,
            ))),
        );
        let v = s.to_value(|id| (id == loco).then_some(7));
        assert_eq!(v["locomotives"], json!([7]));
        assert_eq!(v["schedule"][0]["wait_conditions"][0]["condition"]["constant"], 2000);

        let back = Schedule::from_value(&v, |n| (n == 7).then_some(loco), &DictSignals).unwrap();
        assert_eq!(back, s);

        let err = Schedule::from_value(&v, |_| None, &DictSignals).unwrap_err();
        assert!(matches!(err, BlueprintError::UnknownEntityNumber(7)));
    }
}
