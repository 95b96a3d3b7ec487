//! Up to four icon signals shown on a blueprint or book.

use draftline_core::config::ValidationMode;
use draftline_core::diagnostic::ValidationResult;
use draftline_core::error::DraftError;
use draftline_core::filters::SparseFilters;
use draftline_core::signal::{SignalId, SignalResolver};
use draftline_core::value::{join, require};
use draftline_data::registry::PrototypeRegistry;
use serde_json::Value;

pub const MAX_ICONS: usize = 4;

/// Sparse icon slots, exported as `[{"index", "signal"}]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Icons(SparseFilters<SignalId>);

impl Default for Icons {
    fn default() -> Self {
        Self(SparseFilters::new("icons", MAX_ICONS))
    }
}

impl Icons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, index: usize, signal: Option<SignalId>) -> Result<(), DraftError> {
        self.0.set(index, signal).map(|_| ())
    }

    /// Replace all icons, numbered from slot 0.
    pub fn set_all(
        &mut self,
        signals: impl IntoIterator<Item = SignalId>,
    ) -> Result<(), DraftError> {
        self.0.set_all(signals.into_iter().enumerate())
    }

    pub fn get(&self, index: usize) -> Option<&SignalId> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &SignalId)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        self.0.to_value_with(|signal, m| {
            m.insert("signal".into(), signal.to_value());
        })
    }

    pub fn from_value(value: &Value, signals: &dyn SignalResolver) -> Result<Self, DraftError> {
        SparseFilters::from_value_with("icons", MAX_ICONS, value, |path, entry| {
            let field = join(path, "signal");
            signals
                .resolve_signal(&field, require(entry, path, "signal")?)
                .map(Some)
        })
        .map(Self)
    }

    /// Report icon signals missing from the registry.
    pub fn check(
        &self,
        reg: &PrototypeRegistry,
        mode: ValidationMode,
        result: &mut ValidationResult,
    ) {
        for signal in self.0.values() {
            if reg.signal_exists(signal) {
                continue;
            }
            let err = DraftError::UnknownSignal(signal.name.clone());
            if let Err(e) = mode.unknown_name(result, err, "icons", &signal.name) {
                result.push_error(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftline_core::test_utils::*;
    use serde_json::json;

    #[test]
    fn at_most_four() {
        let mut icons = Icons::new();
        icons.set_all([iron_plate(), copper_plate(), coal(), signal_a()]).unwrap();
        assert!(icons.set(4, Some(signal_b())).is_err());
        icons.set(1, None).unwrap();
        assert_eq!(icons.len(), 3);
    }

    #[test]
    fn bare_names_resolve_through_registry() {
        let reg = PrototypeRegistry::vanilla();
        let icons = Icons::from_value(&json!([{"index": 2, "signal": "iron-plate"}]), reg).unwrap();
        assert_eq!(icons.get(1), Some(&iron_plate()));
        assert_eq!(
            icons.to_value(),
            json!([{"index": 2, "signal": {"name": "iron-plate", "type": "item"}}])
        );
    }

    #[test]
    fn unknown_icon_by_mode() {
        let reg = PrototypeRegistry::vanilla();
        let mut icons = Icons::new();
        icons.set(0, Some(SignalId::item("modded-gear"))).unwrap();

        let mut strict = ValidationResult::new();
        icons.check(reg, ValidationMode::Strict, &mut strict);
        assert_eq!(strict.errors.len(), 1);

        let mut permissive = ValidationResult::new();
        icons.check(reg, ValidationMode::Permissive, &mut permissive);
        assert!(permissive.is_ok());
        assert_eq!(permissive.warnings.len(), 1);
    }
}
