//! The embedded Factorio 1.1 base-game prototype slice.

use once_cell::sync::Lazy;

use crate::loader::{load_prototypes_str, DataLoadError};
use crate::registry::PrototypeRegistry;

const VANILLA_JSON: &str = include_str!("../data/vanilla.json");

static VANILLA: Lazy<Result<PrototypeRegistry, String>> =
    Lazy::new(|| load_prototypes_str(VANILLA_JSON).map_err(|e| e.to_string()));

impl PrototypeRegistry {
    /// The shared vanilla registry, built on first use.
    ///
    /// The dataset is compiled in, so this only fails if the embedded file
    /// itself is broken.
    ///
    /// # Panics
    ///
    /// Panics if the embedded dataset fails to load; see [`try_vanilla`].
    pub fn vanilla() -> &'static PrototypeRegistry {
        match try_vanilla() {
            Ok(reg) => reg,
            Err(e) => panic!("embedded vanilla prototype data is invalid: {e}"),
        }
    }
}

/// Fallible access to the vanilla registry.
pub fn try_vanilla() -> Result<&'static PrototypeRegistry, DataLoadError> {
    (*VANILLA).as_ref().map_err(|detail| DataLoadError::Parse {
        file: "vanilla.json".into(),
        detail: detail.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftline_core::kind::EntityKind;
    use draftline_core::signal::SignalType;

    #[test]
    fn vanilla_builds() {
        assert!(try_vanilla().is_ok());
        let reg = PrototypeRegistry::vanilla();
        assert!(reg.entity_count() > 70);
    }

    #[test]
    fn every_kind_is_represented() {
        let reg = PrototypeRegistry::vanilla();
        for kind in EntityKind::all() {
            if *kind == EntityKind::Unknown {
                continue;
            }
            assert!(
                !reg.entities_of_kind(*kind).is_empty(),
                "no vanilla prototype of kind {kind}"
            );
        }
    }

    #[test]
    fn known_prototype_values() {
        let reg = PrototypeRegistry::vanilla();
        assert_eq!(reg.entity("steel-chest").unwrap().inventory_size, Some(48));
        assert_eq!(reg.entity("filter-inserter").unwrap().filter_count, Some(5));
        assert_eq!(reg.entity("stack-filter-inserter").unwrap().filter_count, Some(1));
        assert_eq!(reg.entity("constant-combinator").unwrap().item_slot_count, Some(20));
        assert!(reg.entity("straight-rail").unwrap().double_grid_aligned);
        assert_eq!(reg.entity("assembling-machine-3").unwrap().module_slots, Some(4));
        assert_eq!(reg.item("rail").unwrap().place_result.as_deref(), Some("straight-rail"));
    }

    #[test]
    fn signal_tables() {
        let reg = PrototypeRegistry::vanilla();
        assert_eq!(reg.signal_type("signal-each"), Some(SignalType::Virtual));
        assert_eq!(reg.signal_type("petroleum-gas"), Some(SignalType::Fluid));
        assert_eq!(reg.signal_type("speed-module"), Some(SignalType::Item));
        assert!(reg.item("speed-module-3").unwrap().module);
    }

    #[test]
    fn speaker_instruments() {
        let reg = PrototypeRegistry::vanilla();
        let (id, piano) = reg.instrument_by_name("piano").unwrap();
        assert_eq!(id, 3);
        assert_eq!(piano.notes.len(), 48);
        assert_eq!(piano.notes[0], "F3");
        assert_eq!(reg.instrument(0).unwrap().name, "alarms");
    }
}
