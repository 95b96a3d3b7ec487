//! Arithmetic and decider combinator settings, and constant combinator slots.
//!
//! Settings are checked as a whole: the game's rules on `signal-each`,
//! `signal-anything` and `signal-everything` relate several members, so a
//! value is only accepted once every member is consistent.

use draftline_core::condition::{ArithmeticOperation, Comparator, Condition};
use draftline_core::error::DraftError;
use draftline_core::filters::SparseFilters;
use draftline_core::signal::{SignalCount, SignalId, SignalOperand, SignalResolver};
use draftline_core::value::{as_bool, as_i32, as_object, join, require};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Arithmetic combinator
// ---------------------------------------------------------------------------

/// `arithmetic_conditions`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArithmeticConditions {
    pub first: Option<SignalOperand>,
    pub operation: ArithmeticOperation,
    pub second: Option<SignalOperand>,
    pub output_signal: Option<SignalId>,
}

impl ArithmeticConditions {
    /// Build and check a full set of arithmetic settings.
    pub fn new(
        first: impl Into<SignalOperand>,
        operation: ArithmeticOperation,
        second: impl Into<SignalOperand>,
        output_signal: Option<SignalId>,
    ) -> Result<Self, DraftError> {
        let conditions = Self {
            first: Some(first.into()),
            operation,
            second: Some(second.into()),
            output_signal,
        };
        conditions.check()?;
        Ok(conditions)
    }

    fn first_signal(&self) -> Option<&SignalId> {
        self.first.as_ref().and_then(SignalOperand::signal)
    }

    fn second_signal(&self) -> Option<&SignalId> {
        self.second.as_ref().and_then(SignalOperand::signal)
    }

    /// Enforce the cross-member signal rules.
    pub fn check(&self) -> Result<(), DraftError> {
        let slots = [
            (self.first_signal(), "first_signal"),
            (self.second_signal(), "second_signal"),
            (self.output_signal.as_ref(), "output_signal"),
        ];
        for (signal, position) in slots {
            if let Some(s) = signal {
                if s.is_everything() || s.is_anything() {
                    return Err(DraftError::InvalidSignalUse {
                        signal: s.name.clone(),
                        position,
                    });
                }
            }
        }

        let first_each = self.first_signal().is_some_and(SignalId::is_each);
        let second_each = self.second_signal().is_some_and(SignalId::is_each);
        if first_each && second_each {
            return Err(DraftError::InvalidSignalUse {
                signal: SignalId::each().name,
                position: "both inputs",
            });
        }
        if let Some(out) = &self.output_signal {
            if out.is_each() && !(first_each || second_each) {
                return Err(DraftError::InvalidSignalUse {
                    signal: out.name.clone(),
                    position: "output without an each input",
                });
            }
        }
        Ok(())
    }

    pub fn from_value(
        field: &str,
        value: &Value,
        signals: &dyn SignalResolver,
    ) -> Result<Self, DraftError> {
        let map = as_object(field, value)?;
        let conditions = Self {
            first: operand(field, map, "first_signal", "first_constant", signals)?,
            operation: match map.get("operation") {
                Some(v) => ArithmeticOperation::from_value(&join(field, "operation"), v)?,
                None => ArithmeticOperation::default(),
            },
            second: operand(field, map, "second_signal", "second_constant", signals)?,
            output_signal: optional_signal(field, map, "output_signal", signals)?,
        };
        conditions.check()?;
        Ok(conditions)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        put_operand(&mut map, &self.first, "first_signal", "first_constant");
        put_operand(&mut map, &self.second, "second_signal", "second_constant");
        map.insert("operation".into(), self.operation.symbol().into());
        if let Some(out) = &self.output_signal {
            map.insert("output_signal".into(), out.to_value());
        }
        Value::Object(map)
    }
}

fn operand(
    field: &str,
    map: &Map<String, Value>,
    signal_key: &str,
    constant_key: &str,
    signals: &dyn SignalResolver,
) -> Result<Option<SignalOperand>, DraftError> {
    let signal = map.get(signal_key).filter(|v| !v.is_null());
    let constant = map.get(constant_key).filter(|v| !v.is_null());
    match (signal, constant) {
        (Some(_), Some(_)) => Err(DraftError::invalid(
            field,
            format!("cannot have both '{signal_key}' and '{constant_key}'"),
        )),
        (Some(s), None) => Ok(Some(SignalOperand::Signal(
            signals.resolve_signal(&join(field, signal_key), s)?,
        ))),
        (None, Some(c)) => Ok(Some(SignalOperand::Constant(as_i32(
            &join(field, constant_key),
            c,
        )?))),
        (None, None) => Ok(None),
    }
}

fn put_operand(
    map: &mut Map<String, Value>,
    operand: &Option<SignalOperand>,
    signal_key: &str,
    constant_key: &str,
) {
    match operand {
        Some(SignalOperand::Signal(s)) => {
            map.insert(signal_key.into(), s.to_value());
        }
        Some(SignalOperand::Constant(c)) => {
            map.insert(constant_key.into(), (*c).into());
        }
        None => {}
    }
}

fn optional_signal(
    field: &str,
    map: &Map<String, Value>,
    key: &str,
    signals: &dyn SignalResolver,
) -> Result<Option<SignalId>, DraftError> {
    match map.get(key).filter(|v| !v.is_null()) {
        Some(v) => Ok(Some(signals.resolve_signal(&join(field, key), v)?)),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Decider combinator
// ---------------------------------------------------------------------------

/// `decider_conditions`: a condition plus what to output when it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeciderConditions {
    pub condition: Condition,
    pub output_signal: Option<SignalId>,
    pub copy_count_from_input: bool,
}

impl Default for DeciderConditions {
    fn default() -> Self {
        Self {
            condition: Condition::default(),
            output_signal: None,
            copy_count_from_input: true,
        }
    }
}

impl DeciderConditions {
    pub fn new(
        first_signal: SignalId,
        comparator: Comparator,
        second: impl Into<SignalOperand>,
        output_signal: Option<SignalId>,
        copy_count_from_input: bool,
    ) -> Result<Self, DraftError> {
        let conditions = Self {
            condition: Condition::new(Some(first_signal), comparator, second),
            output_signal,
            copy_count_from_input,
        };
        conditions.check()?;
        Ok(conditions)
    }

    pub fn check(&self) -> Result<(), DraftError> {
        if let SignalOperand::Signal(second) = &self.condition.second {
            if second.is_pure_virtual() {
                return Err(DraftError::InvalidSignalUse {
                    signal: second.name.clone(),
                    position: "second_signal",
                });
            }
        }
        let first_each = self
            .condition
            .first_signal
            .as_ref()
            .is_some_and(SignalId::is_each);
        if let Some(out) = &self.output_signal {
            if out.is_anything() {
                return Err(DraftError::InvalidSignalUse {
                    signal: out.name.clone(),
                    position: "output_signal",
                });
            }
            if out.is_each() && !first_each {
                return Err(DraftError::InvalidSignalUse {
                    signal: out.name.clone(),
                    position: "output without an each input",
                });
            }
            if out.is_everything() && first_each {
                return Err(DraftError::InvalidSignalUse {
                    signal: out.name.clone(),
                    position: "output after an each input",
                });
            }
        }
        Ok(())
    }

    pub fn from_value(
        field: &str,
        value: &Value,
        signals: &dyn SignalResolver,
    ) -> Result<Self, DraftError> {
        let map = as_object(field, value)?;
        let conditions = Self {
            condition: Condition::from_value(field, value, signals)?,
            output_signal: optional_signal(field, map, "output_signal", signals)?,
            copy_count_from_input: match map.get("copy_count_from_input") {
                Some(v) => as_bool(&join(field, "copy_count_from_input"), v)?,
                None => true,
            },
        };
        conditions.check()?;
        Ok(conditions)
    }

    pub fn to_value(&self) -> Value {
        let mut map = match self.condition.to_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Some(out) = &self.output_signal {
            map.insert("output_signal".into(), out.to_value());
        }
        if !self.copy_count_from_input {
            map.insert("copy_count_from_input".into(), false.into());
        }
        Value::Object(map)
    }
}

// ---------------------------------------------------------------------------
// Constant combinator
// ---------------------------------------------------------------------------

/// Constant combinator output slots, bounded by the prototype's
/// `item_slot_count`.
pub type ConstantSlots = SparseFilters<SignalCount>;

pub fn constant_slots(capacity: usize) -> ConstantSlots {
    SparseFilters::new("control_behavior.filters", capacity)
}

pub fn constant_slots_to_value(slots: &ConstantSlots) -> Value {
    slots.to_value_with(|sc, m| {
        m.insert("signal".into(), sc.signal.to_value());
        m.insert("count".into(), sc.count.into());
    })
}

pub fn constant_slots_from_value(
    capacity: usize,
    value: &Value,
    signals: &dyn SignalResolver,
) -> Result<ConstantSlots, DraftError> {
    SparseFilters::from_value_with("control_behavior.filters", capacity, value, |path, entry| {
        // The game writes empty slots as an index with no signal.
        let Some(signal) = entry.get("signal").filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        let signal = signals.resolve_signal(&join(path, "signal"), signal)?;
        let count = as_i32(&join(path, "count"), require(entry, path, "count")?)?;
        Ok(Some(SignalCount::new(signal, count)))
    })
}
