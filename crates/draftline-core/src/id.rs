use slotmap::new_key_type;

new_key_type! {
    /// Identifies an entity inside a blueprint. Stable across removals of
    /// other entities; the exported `entity_number` is assigned on write.
    pub struct EntityId;
}

/// Which circuit terminal of an entity a wire attaches to.
///
/// Combinators have an input side (1) and an output side (2); every other
/// circuit-connectable entity only has side 1.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum CircuitSide {
    #[default]
    Input,
    Output,
}

impl CircuitSide {
    /// The 1-based number used in blueprint JSON.
    pub fn number(self) -> u8 {
        match self {
            CircuitSide::Input => 1,
            CircuitSide::Output => 2,
        }
    }

    pub fn from_number(n: u64) -> Option<CircuitSide> {
        match n {
            1 => Some(CircuitSide::Input),
            2 => Some(CircuitSide::Output),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn entity_ids_are_distinct() {
        let mut map: SlotMap<EntityId, &str> = SlotMap::with_key();
        let a = map.insert("inserter");
        let b = map.insert("chest");
        assert_ne!(a, b);
        map.remove(a);
        assert_eq!(map[b], "chest");
    }

    #[test]
    fn circuit_side_numbers() {
        assert_eq!(CircuitSide::Output.number(), 2);
        assert_eq!(CircuitSide::from_number(1), Some(CircuitSide::Input));
        assert_eq!(CircuitSide::from_number(3), None);
    }
}
