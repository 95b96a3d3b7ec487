//! Signal identifiers and operands as they appear in control behavior.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::DraftError;
use crate::value::{as_object, as_str, join, require};

/// `signal-everything`: true if every input satisfies the condition.
pub const SIGNAL_EVERYTHING: &str = "signal-everything";
/// `signal-anything`: true if any input satisfies the condition.
pub const SIGNAL_ANYTHING: &str = "signal-anything";
/// `signal-each`: evaluate per input signal.
pub const SIGNAL_EACH: &str = "signal-each";

/// Namespace of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Item,
    Fluid,
    Virtual,
}

impl SignalType {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalType::Item => "item",
            SignalType::Fluid => "fluid",
            SignalType::Virtual => "virtual",
        }
    }

    pub fn parse(s: &str) -> Option<SignalType> {
        match s {
            "item" => Some(SignalType::Item),
            "fluid" => Some(SignalType::Fluid),
            "virtual" => Some(SignalType::Virtual),
            _ => None,
        }
    }
}

/// A fully qualified signal: `{"name": "iron-plate", "type": "item"}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignalId {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SignalType,
}

impl SignalId {
    pub fn new(name: impl Into<String>, kind: SignalType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn item(name: impl Into<String>) -> Self {
        Self::new(name, SignalType::Item)
    }

    pub fn fluid(name: impl Into<String>) -> Self {
        Self::new(name, SignalType::Fluid)
    }

    pub fn virtual_signal(name: impl Into<String>) -> Self {
        Self::new(name, SignalType::Virtual)
    }

    pub fn everything() -> Self {
        Self::virtual_signal(SIGNAL_EVERYTHING)
    }

    pub fn anything() -> Self {
        Self::virtual_signal(SIGNAL_ANYTHING)
    }

    pub fn each() -> Self {
        Self::virtual_signal(SIGNAL_EACH)
    }

    /// Everything, anything, or each.
    pub fn is_pure_virtual(&self) -> bool {
        self.kind == SignalType::Virtual
            && matches!(
                self.name.as_str(),
                SIGNAL_EVERYTHING | SIGNAL_ANYTHING | SIGNAL_EACH
            )
    }

    pub fn is_each(&self) -> bool {
        self.kind == SignalType::Virtual && self.name == SIGNAL_EACH
    }

    pub fn is_anything(&self) -> bool {
        self.kind == SignalType::Virtual && self.name == SIGNAL_ANYTHING
    }

    pub fn is_everything(&self) -> bool {
        self.kind == SignalType::Virtual && self.name == SIGNAL_EVERYTHING
    }

    /// Parse the canonical dict form. Name-only shorthand is resolved by the
    /// prototype registry, which knows each signal's type.
    pub fn from_value(field: &str, value: &Value) -> Result<Self, DraftError> {
        let map = as_object(field, value)?;
        let name = as_str(&join(field, "name"), require(map, field, "name")?)?;
        let type_field = join(field, "type");
        let raw_type = as_str(&type_field, require(map, field, "type")?)?;
        let kind = SignalType::parse(raw_type).ok_or_else(|| {
            DraftError::invalid(type_field, format!("'{raw_type}' is not item, fluid or virtual"))
        })?;
        Ok(Self::new(name, kind))
    }

    pub fn to_value(&self) -> Value {
        json!({ "name": self.name, "type": self.kind.as_str() })
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.name)
    }
}

/// Turns a JSON signal reference into a [`SignalId`].
///
/// The prototype registry implements this to accept bare names; without
/// one, only the full dict form is understood.
pub trait SignalResolver {
    fn resolve_signal(&self, field: &str, value: &Value) -> Result<SignalId, DraftError>;
}

/// Resolver that accepts only `{"name", "type"}` dicts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DictSignals;

impl SignalResolver for DictSignals {
    fn resolve_signal(&self, field: &str, value: &Value) -> Result<SignalId, DraftError> {
        SignalId::from_value(field, value)
    }
}

/// The right-hand side of a condition: another signal or a constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalOperand {
    Signal(SignalId),
    Constant(i32),
}

impl Default for SignalOperand {
    fn default() -> Self {
        SignalOperand::Constant(0)
    }
}

impl From<SignalId> for SignalOperand {
    fn from(signal: SignalId) -> Self {
        SignalOperand::Signal(signal)
    }
}

impl From<i32> for SignalOperand {
    fn from(value: i32) -> Self {
        SignalOperand::Constant(value)
    }
}

impl SignalOperand {
    pub fn signal(&self) -> Option<&SignalId> {
        match self {
            SignalOperand::Signal(s) => Some(s),
            SignalOperand::Constant(_) => None,
        }
    }
}

/// A signal paired with a value, as held by constant combinator slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCount {
    pub signal: SignalId,
    pub count: i32,
}

impl SignalCount {
    pub fn new(signal: SignalId, count: i32) -> Self {
        Self { signal, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_virtual_detection() {
        assert!(SignalId::each().is_pure_virtual());
        assert!(SignalId::anything().is_pure_virtual());
        assert!(!SignalId::virtual_signal("signal-A").is_pure_virtual());
        // An item that happens to share the name is not special.
        assert!(!SignalId::item(SIGNAL_EACH).is_pure_virtual());
    }

    #[test]
    fn parses_dict_form() {
        let sig = SignalId::from_value("s", &json!({"name": "water", "type": "fluid"})).unwrap();
        assert_eq!(sig, SignalId::fluid("water"));
        assert_eq!(sig.to_value(), json!({"name": "water", "type": "fluid"}));
    }

    #[test]
    fn rejects_bad_type() {
        let err =
            SignalId::from_value("s", &json!({"name": "water", "type": "liquid"})).unwrap_err();
        assert!(matches!(err, DraftError::InvalidValue { ref field, .. } if field == "s.type"));
    }

    #[test]
    fn serde_matches_blueprint_shape() {
        let json = serde_json::to_value(SignalId::item("iron-plate")).unwrap();
        assert_eq!(json, json!({"name": "iron-plate", "type": "item"}));
    }

    #[test]
    fn operand_conversions() {
        assert_eq!(SignalOperand::from(5), SignalOperand::Constant(5));
        let op = SignalOperand::from(SignalId::item("coal"));
        assert_eq!(op.signal().map(|s| s.name.as_str()), Some("coal"));
        assert_eq!(SignalOperand::default(), SignalOperand::Constant(0));
    }
}
