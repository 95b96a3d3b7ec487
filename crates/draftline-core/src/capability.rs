//! Field groups an entity kind may carry.
//!
//! Each flag names one optional group of blueprint keys. An entity kind's
//! capability set decides which setters succeed and which keys survive
//! parsing; everything else is rejected with
//! [`DraftError::Unsupported`](crate::error::DraftError::Unsupported).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u64 {
        // -- placement --
        const DIRECTION = 1 << 0;
        /// Diagonal directions are valid (rails and rail signals).
        const EIGHT_WAY = 1 << 1;
        const ORIENTATION = 1 << 2;

        // -- wires --
        const CIRCUIT_WIRE = 1 << 3;
        /// Separate input (1) and output (2) circuit sides.
        const DUAL_CIRCUIT = 1 << 4;
        const POWER_WIRE = 1 << 5;
        /// Two copper terminals (`Cu0`/`Cu1`), as on a power switch.
        const COPPER_TERMINALS = 1 << 6;

        // -- entity fields --
        const RECIPE = 1 << 7;
        const ITEM_REQUESTS = 1 << 8;
        const BAR = 1 << 9;
        const INVENTORY_FILTERS = 1 << 10;
        const ITEM_FILTERS = 1 << 11;
        const FILTER_MODE = 1 << 12;
        const REQUEST_FILTERS = 1 << 13;
        const REQUEST_FROM_BUFFERS = 1 << 14;
        const OVERRIDE_STACK_SIZE = 1 << 15;
        const IO_TYPE = 1 << 16;
        const SPLITTER = 1 << 17;
        const STATION = 1 << 18;
        const COLOR = 1 << 19;
        const SWITCH_STATE = 1 << 20;
        const SPEAKER = 1 << 21;
        const INFINITY_CONTAINER = 1 << 22;
        const INFINITY_PIPE = 1 << 23;

        // -- control behavior --
        const CIRCUIT_CONDITION = 1 << 32;
        /// The explicit `circuit_enable_disable` toggle.
        const CIRCUIT_ENABLE = 1 << 33;
        const LOGISTIC_CONDITION = 1 << 34;
        const READ_CONTENTS = 1 << 35;
        const READ_HAND = 1 << 36;
        const STACK_SIZE_CONTROL = 1 << 37;
        const MODE_OF_OPERATION = 1 << 38;
        const READ_RESOURCES = 1 << 39;
        const ROBOPORT_SIGNALS = 1 << 40;
        const OUTPUT_SIGNAL = 1 << 41;
        const GATE_CONTROL = 1 << 42;
        const RAIL_SIGNAL = 1 << 43;
        const CHAIN_SIGNAL = 1 << 44;
        const TRAIN_STOP_CONTROL = 1 << 45;
        const LAMP = 1 << 46;
        const CONSTANT = 1 << 47;
        const ARITHMETIC = 1 << 48;
        const DECIDER = 1 << 49;
    }
}

impl Capabilities {
    /// Every capability that implies a `control_behavior` key.
    pub const CONTROL: Capabilities = Capabilities::CIRCUIT_CONDITION
        .union(Capabilities::CIRCUIT_ENABLE)
        .union(Capabilities::LOGISTIC_CONDITION)
        .union(Capabilities::READ_CONTENTS)
        .union(Capabilities::READ_HAND)
        .union(Capabilities::STACK_SIZE_CONTROL)
        .union(Capabilities::MODE_OF_OPERATION)
        .union(Capabilities::READ_RESOURCES)
        .union(Capabilities::ROBOPORT_SIGNALS)
        .union(Capabilities::OUTPUT_SIGNAL)
        .union(Capabilities::GATE_CONTROL)
        .union(Capabilities::RAIL_SIGNAL)
        .union(Capabilities::CHAIN_SIGNAL)
        .union(Capabilities::TRAIN_STOP_CONTROL)
        .union(Capabilities::LAMP)
        .union(Capabilities::SPEAKER)
        .union(Capabilities::CONSTANT)
        .union(Capabilities::ARITHMETIC)
        .union(Capabilities::DECIDER);

    /// Whether any control-behavior key can be set.
    pub fn has_control_behavior(self) -> bool {
        self.intersects(Self::CONTROL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_set_excludes_placement() {
        assert!(!Capabilities::CONTROL.contains(Capabilities::DIRECTION));
        assert!(Capabilities::CONTROL.contains(Capabilities::DECIDER));
    }

    #[test]
    fn plain_pipe_has_no_control_behavior() {
        assert!(!Capabilities::empty().has_control_behavior());
        assert!((Capabilities::CIRCUIT_WIRE | Capabilities::LAMP).has_control_behavior());
    }
}
