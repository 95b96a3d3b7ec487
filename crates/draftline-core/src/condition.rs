//! Circuit and logistic conditions, plus the arithmetic operation set.
//!
//! The blueprint format stores comparators as single Unicode symbols. The
//! ASCII spellings players type (`>=`, `!=`, ...) are accepted on input and
//! normalized here, so everything downstream only sees the canonical form.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DraftError;
use crate::signal::{SignalId, SignalOperand, SignalResolver};
use crate::value::{as_i32, as_object, as_str, join};

// ---------------------------------------------------------------------------
// Comparator
// ---------------------------------------------------------------------------

/// Comparison operator for conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Comparator {
    #[default]
    Lt,
    Gt,
    Eq,
    Gte,
    Lte,
    Ne,
}

impl Comparator {
    /// The canonical blueprint symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Lt => "<",
            Comparator::Gt => ">",
            Comparator::Eq => "=",
            Comparator::Gte => "≥",
            Comparator::Lte => "≤",
            Comparator::Ne => "≠",
        }
    }

    /// Parse a canonical symbol or one of its ASCII spellings.
    pub fn parse(s: &str) -> Option<Comparator> {
        match s {
            "<" => Some(Comparator::Lt),
            ">" => Some(Comparator::Gt),
            "=" | "==" => Some(Comparator::Eq),
            "≥" | ">=" => Some(Comparator::Gte),
            "≤" | "<=" => Some(Comparator::Lte),
            "≠" | "!=" => Some(Comparator::Ne),
            _ => None,
        }
    }

    pub fn from_value(field: &str, value: &Value) -> Result<Self, DraftError> {
        let raw = as_str(field, value)?;
        Self::parse(raw)
            .ok_or_else(|| DraftError::invalid(field, format!("'{raw}' is not a comparator")))
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// A predicate over circuit or logistic network signals.
///
/// Default is the game's empty condition: no first signal, `<`, constant 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub first_signal: Option<SignalId>,
    pub comparator: Comparator,
    pub second: SignalOperand,
}

impl Condition {
    pub fn new(
        first_signal: Option<SignalId>,
        comparator: Comparator,
        second: impl Into<SignalOperand>,
    ) -> Self {
        Self {
            first_signal,
            comparator,
            second: second.into(),
        }
    }

    /// Whether this is the untouched default condition.
    pub fn is_empty(&self) -> bool {
        *self == Condition::default()
    }

    /// Parse a condition dict. `constant` and `second_signal` are mutually
    /// exclusive; when neither is present the right-hand side is constant 0.
    pub fn from_value(
        field: &str,
        value: &Value,
        signals: &dyn SignalResolver,
    ) -> Result<Self, DraftError> {
        let map = as_object(field, value)?;
        let first_signal = match map.get("first_signal") {
            None | Some(Value::Null) => None,
            Some(v) => Some(signals.resolve_signal(&join(field, "first_signal"), v)?),
        };
        let comparator = match map.get("comparator") {
            None => Comparator::default(),
            Some(v) => Comparator::from_value(&join(field, "comparator"), v)?,
        };
        let second = parse_second(field, map, signals)?;
        Ok(Self {
            first_signal,
            comparator,
            second,
        })
    }

    /// Emit the blueprint dict, omitting members at their default values.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(first) = &self.first_signal {
            map.insert("first_signal".into(), first.to_value());
        }
        if self.comparator != Comparator::default() {
            map.insert("comparator".into(), self.comparator.symbol().into());
        }
        match &self.second {
            SignalOperand::Signal(s) => {
                map.insert("second_signal".into(), s.to_value());
            }
            SignalOperand::Constant(0) => {}
            SignalOperand::Constant(c) => {
                map.insert("constant".into(), (*c).into());
            }
        }
        Value::Object(map)
    }
}

fn parse_second(
    field: &str,
    map: &Map<String, Value>,
    signals: &dyn SignalResolver,
) -> Result<SignalOperand, DraftError> {
    let constant = map.get("constant").filter(|v| !v.is_null());
    let second = map.get("second_signal").filter(|v| !v.is_null());
    match (constant, second) {
        (Some(_), Some(_)) => Err(DraftError::invalid(
            field,
            "cannot have both 'constant' and 'second_signal'",
        )),
        (Some(c), None) => Ok(SignalOperand::Constant(as_i32(&join(field, "constant"), c)?)),
        (None, Some(s)) => Ok(SignalOperand::Signal(
            signals.resolve_signal(&join(field, "second_signal"), s)?,
        )),
        (None, None) => Ok(SignalOperand::default()),
    }
}

// ---------------------------------------------------------------------------
// Arithmetic operation
// ---------------------------------------------------------------------------

/// Operation performed by an arithmetic combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArithmeticOperation {
    #[default]
    Multiply,
    Divide,
    Add,
    Subtract,
    Modulo,
    Power,
    ShiftLeft,
    ShiftRight,
    And,
    Or,
    Xor,
}

impl ArithmeticOperation {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOperation::Multiply => "*",
            ArithmeticOperation::Divide => "/",
            ArithmeticOperation::Add => "+",
            ArithmeticOperation::Subtract => "-",
            ArithmeticOperation::Modulo => "%",
            ArithmeticOperation::Power => "^",
            ArithmeticOperation::ShiftLeft => "<<",
            ArithmeticOperation::ShiftRight => ">>",
            ArithmeticOperation::And => "AND",
            ArithmeticOperation::Or => "OR",
            ArithmeticOperation::Xor => "XOR",
        }
    }

    /// Parse the canonical symbol, lowercase bitwise names, or `**`.
    pub fn parse(s: &str) -> Option<ArithmeticOperation> {
        match s {
            "*" => Some(ArithmeticOperation::Multiply),
            "/" => Some(ArithmeticOperation::Divide),
            "+" => Some(ArithmeticOperation::Add),
            "-" => Some(ArithmeticOperation::Subtract),
            "%" => Some(ArithmeticOperation::Modulo),
            "^" | "**" => Some(ArithmeticOperation::Power),
            "<<" => Some(ArithmeticOperation::ShiftLeft),
            ">>" => Some(ArithmeticOperation::ShiftRight),
            "AND" | "and" => Some(ArithmeticOperation::And),
            "OR" | "or" => Some(ArithmeticOperation::Or),
            "XOR" | "xor" => Some(ArithmeticOperation::Xor),
            _ => None,
        }
    }

    pub fn from_value(field: &str, value: &Value) -> Result<Self, DraftError> {
        let raw = as_str(field, value)?;
        Self::parse(raw).ok_or_else(|| {
            DraftError::invalid(field, format!("'{raw}' is not an arithmetic operation"))
        })
    }
}

impl fmt::Display for ArithmeticOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::DictSignals;
    use serde_json::json;

    fn iron() -> SignalId {
        SignalId::item("iron-plate")
    }

    #[test]
    fn ascii_comparators_normalize() {
        assert_eq!(Comparator::parse(">="), Some(Comparator::Gte));
        assert_eq!(Comparator::parse("=="), Some(Comparator::Eq));
        assert_eq!(Comparator::parse("!="), Some(Comparator::Ne));
        assert_eq!(Comparator::parse("<="), Some(Comparator::Lte));
        assert_eq!(Comparator::parse("=>"), None);
        assert_eq!(Comparator::Gte.symbol(), "≥");
    }

    #[test]
    fn default_condition_serializes_empty() {
        assert!(Condition::default().is_empty());
        assert_eq!(Condition::default().to_value(), json!({}));
    }

    #[test]
    fn condition_with_constant() {
        let cond = Condition::new(Some(iron()), Comparator::Gte, 100);
        assert_eq!(
            cond.to_value(),
            json!({
                "first_signal": {"name": "iron-plate", "type": "item"},
                "comparator": "≥",
                "constant": 100
            })
        );
    }

    #[test]
    fn parse_normalizes_shorthand() {
        let value = json!({
            "first_signal": {"name": "iron-plate", "type": "item"},
            "comparator": "!=",
            "second_signal": {"name": "signal-A", "type": "virtual"}
        });
        let cond = Condition::from_value("circuit_condition", &value, &DictSignals).unwrap();
        assert_eq!(cond.comparator, Comparator::Ne);
        assert_eq!(
            cond.second,
            SignalOperand::Signal(SignalId::virtual_signal("signal-A"))
        );
        assert_eq!(cond.to_value()["comparator"], json!("≠"));
    }

    #[test]
    fn parse_rejects_both_operands() {
        let value = json!({
            "constant": 1,
            "second_signal": {"name": "signal-A", "type": "virtual"}
        });
        let err = Condition::from_value("circuit_condition", &value, &DictSignals).unwrap_err();
        assert!(matches!(err, DraftError::InvalidValue { .. }));
    }

    #[test]
    fn parse_rejects_unknown_comparator() {
        let err =
            Condition::from_value("c", &json!({"comparator": "~"}), &DictSignals).unwrap_err();
        assert!(matches!(
            err,
            DraftError::InvalidValue { ref field, .. } if field == "c.comparator"
        ));
    }

    #[test]
    fn arithmetic_aliases() {
        assert_eq!(ArithmeticOperation::parse("and"), Some(ArithmeticOperation::And));
        assert_eq!(ArithmeticOperation::parse("**"), Some(ArithmeticOperation::Power));
        assert_eq!(ArithmeticOperation::Power.symbol(), "^");
        assert_eq!(ArithmeticOperation::parse("//"), None);
    }
}
