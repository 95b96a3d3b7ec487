//! Entity kinds, one per Factorio prototype `type`, and the capability table
//! that decides which blueprint keys each kind may carry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capability::Capabilities;

/// A Factorio prototype category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Container,
    LogisticContainer,
    InfinityContainer,
    StorageTank,
    TransportBelt,
    UndergroundBelt,
    Splitter,
    Loader,
    Inserter,
    FilterInserter,
    ElectricPole,
    PowerSwitch,
    Accumulator,
    SolarPanel,
    Boiler,
    Generator,
    Reactor,
    HeatPipe,
    Pipe,
    InfinityPipe,
    PipeToGround,
    Pump,
    OffshorePump,
    StraightRail,
    CurvedRail,
    RailSignal,
    RailChainSignal,
    TrainStop,
    Locomotive,
    CargoWagon,
    FluidWagon,
    ArtilleryWagon,
    Lamp,
    ArithmeticCombinator,
    DeciderCombinator,
    ConstantCombinator,
    ProgrammableSpeaker,
    AssemblingMachine,
    Furnace,
    RocketSilo,
    MiningDrill,
    Lab,
    Beacon,
    Roboport,
    Wall,
    Gate,
    Radar,
    AmmoTurret,
    /// An entity missing from the prototype tables (modded content).
    Unknown,
}

const ALL: [EntityKind; 49] = [
    EntityKind::Container,
    EntityKind::LogisticContainer,
    EntityKind::InfinityContainer,
    EntityKind::StorageTank,
    EntityKind::TransportBelt,
    EntityKind::UndergroundBelt,
    EntityKind::Splitter,
    EntityKind::Loader,
    EntityKind::Inserter,
    EntityKind::FilterInserter,
    EntityKind::ElectricPole,
    EntityKind::PowerSwitch,
    EntityKind::Accumulator,
    EntityKind::SolarPanel,
    EntityKind::Boiler,
    EntityKind::Generator,
    EntityKind::Reactor,
    EntityKind::HeatPipe,
    EntityKind::Pipe,
    EntityKind::InfinityPipe,
    EntityKind::PipeToGround,
    EntityKind::Pump,
    EntityKind::OffshorePump,
    EntityKind::StraightRail,
    EntityKind::CurvedRail,
    EntityKind::RailSignal,
    EntityKind::RailChainSignal,
    EntityKind::TrainStop,
    EntityKind::Locomotive,
    EntityKind::CargoWagon,
    EntityKind::FluidWagon,
    EntityKind::ArtilleryWagon,
    EntityKind::Lamp,
    EntityKind::ArithmeticCombinator,
    EntityKind::DeciderCombinator,
    EntityKind::ConstantCombinator,
    EntityKind::ProgrammableSpeaker,
    EntityKind::AssemblingMachine,
    EntityKind::Furnace,
    EntityKind::RocketSilo,
    EntityKind::MiningDrill,
    EntityKind::Lab,
    EntityKind::Beacon,
    EntityKind::Roboport,
    EntityKind::Wall,
    EntityKind::Gate,
    EntityKind::Radar,
    EntityKind::AmmoTurret,
    EntityKind::Unknown,
];

impl EntityKind {
    /// All kinds, including [`EntityKind::Unknown`].
    pub fn all() -> &'static [EntityKind] {
        &ALL
    }

    /// The prototype `type` string used in game data.
    pub fn type_name(self) -> &'static str {
        match self {
            EntityKind::Container => "container",
            EntityKind::LogisticContainer => "logistic-container",
            EntityKind::InfinityContainer => "infinity-container",
            EntityKind::StorageTank => "storage-tank",
            EntityKind::TransportBelt => "transport-belt",
            EntityKind::UndergroundBelt => "underground-belt",
            EntityKind::Splitter => "splitter",
            EntityKind::Loader => "loader",
            EntityKind::Inserter => "inserter",
            EntityKind::FilterInserter => "filter-inserter",
            EntityKind::ElectricPole => "electric-pole",
            EntityKind::PowerSwitch => "power-switch",
            EntityKind::Accumulator => "accumulator",
            EntityKind::SolarPanel => "solar-panel",
            EntityKind::Boiler => "boiler",
            EntityKind::Generator => "generator",
            EntityKind::Reactor => "reactor",
            EntityKind::HeatPipe => "heat-pipe",
            EntityKind::Pipe => "pipe",
            EntityKind::InfinityPipe => "infinity-pipe",
            EntityKind::PipeToGround => "pipe-to-ground",
            EntityKind::Pump => "pump",
            EntityKind::OffshorePump => "offshore-pump",
            EntityKind::StraightRail => "straight-rail",
            EntityKind::CurvedRail => "curved-rail",
            EntityKind::RailSignal => "rail-signal",
            EntityKind::RailChainSignal => "rail-chain-signal",
            EntityKind::TrainStop => "train-stop",
            EntityKind::Locomotive => "locomotive",
            EntityKind::CargoWagon => "cargo-wagon",
            EntityKind::FluidWagon => "fluid-wagon",
            EntityKind::ArtilleryWagon => "artillery-wagon",
            EntityKind::Lamp => "lamp",
            EntityKind::ArithmeticCombinator => "arithmetic-combinator",
            EntityKind::DeciderCombinator => "decider-combinator",
            EntityKind::ConstantCombinator => "constant-combinator",
            EntityKind::ProgrammableSpeaker => "programmable-speaker",
            EntityKind::AssemblingMachine => "assembling-machine",
            EntityKind::Furnace => "furnace",
            EntityKind::RocketSilo => "rocket-silo",
            EntityKind::MiningDrill => "mining-drill",
            EntityKind::Lab => "lab",
            EntityKind::Beacon => "beacon",
            EntityKind::Roboport => "roboport",
            EntityKind::Wall => "wall",
            EntityKind::Gate => "gate",
            EntityKind::Radar => "radar",
            EntityKind::AmmoTurret => "ammo-turret",
            EntityKind::Unknown => "unknown",
        }
    }

    /// Parse a prototype `type` string. `"unknown"` is not accepted.
    pub fn from_type_name(name: &str) -> Option<EntityKind> {
        ALL.iter()
            .copied()
            .filter(|k| *k != EntityKind::Unknown)
            .find(|k| k.type_name() == name)
    }

    /// Whether this kind is rolling stock placed by orientation.
    pub fn is_rolling_stock(self) -> bool {
        matches!(
            self,
            EntityKind::Locomotive
                | EntityKind::CargoWagon
                | EntityKind::FluidWagon
                | EntityKind::ArtilleryWagon
        )
    }

    /// Capability table: the field groups each kind can carry.
    ///
    /// Logistic containers advertise the union of all logistic modes here;
    /// the entity narrows the set from its prototype's `logistic_mode`.
    pub fn capabilities(self) -> Capabilities {
        use Capabilities as C;

        let belt_control = C::CIRCUIT_WIRE
            | C::CIRCUIT_CONDITION
            | C::CIRCUIT_ENABLE
            | C::LOGISTIC_CONDITION;
        let inserter = C::DIRECTION
            | C::CIRCUIT_WIRE
            | C::CIRCUIT_CONDITION
            | C::LOGISTIC_CONDITION
            | C::READ_HAND
            | C::STACK_SIZE_CONTROL
            | C::MODE_OF_OPERATION
            | C::OVERRIDE_STACK_SIZE;

        match self {
            EntityKind::Container => C::CIRCUIT_WIRE | C::BAR,
            EntityKind::LogisticContainer => {
                C::CIRCUIT_WIRE
                    | C::BAR
                    | C::REQUEST_FILTERS
                    | C::REQUEST_FROM_BUFFERS
                    | C::MODE_OF_OPERATION
            }
            EntityKind::InfinityContainer => C::CIRCUIT_WIRE | C::BAR | C::INFINITY_CONTAINER,
            EntityKind::StorageTank => C::DIRECTION | C::CIRCUIT_WIRE,
            EntityKind::TransportBelt => C::DIRECTION | belt_control | C::READ_CONTENTS,
            EntityKind::UndergroundBelt => C::DIRECTION | C::IO_TYPE,
            EntityKind::Splitter => C::DIRECTION | C::SPLITTER,
            EntityKind::Loader => C::DIRECTION | C::IO_TYPE | C::ITEM_FILTERS,
            EntityKind::Inserter => inserter,
            EntityKind::FilterInserter => inserter | C::ITEM_FILTERS | C::FILTER_MODE,
            EntityKind::ElectricPole => C::CIRCUIT_WIRE | C::POWER_WIRE,
            EntityKind::PowerSwitch => {
                C::CIRCUIT_WIRE
                    | C::COPPER_TERMINALS
                    | C::SWITCH_STATE
                    | C::CIRCUIT_CONDITION
                    | C::LOGISTIC_CONDITION
            }
            EntityKind::Accumulator => C::CIRCUIT_WIRE | C::OUTPUT_SIGNAL,
            EntityKind::SolarPanel
            | EntityKind::HeatPipe
            | EntityKind::Pipe
            | EntityKind::Radar => C::empty(),
            EntityKind::Boiler => C::DIRECTION | C::ITEM_REQUESTS,
            EntityKind::Generator | EntityKind::PipeToGround | EntityKind::Gate => C::DIRECTION,
            EntityKind::Reactor | EntityKind::Lab | EntityKind::Beacon | EntityKind::Furnace => {
                C::ITEM_REQUESTS
            }
            EntityKind::InfinityPipe => C::INFINITY_PIPE,
            EntityKind::Pump | EntityKind::OffshorePump => {
                C::DIRECTION | C::CIRCUIT_WIRE | C::CIRCUIT_CONDITION | C::LOGISTIC_CONDITION
            }
            EntityKind::StraightRail | EntityKind::CurvedRail => C::DIRECTION | C::EIGHT_WAY,
            EntityKind::RailSignal => {
                C::DIRECTION
                    | C::EIGHT_WAY
                    | C::CIRCUIT_WIRE
                    | C::RAIL_SIGNAL
                    | C::CIRCUIT_CONDITION
            }
            EntityKind::RailChainSignal => {
                C::DIRECTION | C::EIGHT_WAY | C::CIRCUIT_WIRE | C::RAIL_SIGNAL | C::CHAIN_SIGNAL
            }
            EntityKind::TrainStop => {
                C::DIRECTION
                    | C::STATION
                    | C::COLOR
                    | C::TRAIN_STOP_CONTROL
                    | belt_control
            }
            EntityKind::Locomotive => C::ORIENTATION | C::COLOR | C::ITEM_REQUESTS,
            EntityKind::CargoWagon => C::ORIENTATION | C::INVENTORY_FILTERS,
            EntityKind::FluidWagon => C::ORIENTATION,
            EntityKind::ArtilleryWagon => C::ORIENTATION | C::ITEM_REQUESTS,
            EntityKind::Lamp => {
                C::CIRCUIT_WIRE | C::CIRCUIT_CONDITION | C::LOGISTIC_CONDITION | C::LAMP
            }
            EntityKind::ArithmeticCombinator => {
                C::DIRECTION | C::CIRCUIT_WIRE | C::DUAL_CIRCUIT | C::ARITHMETIC
            }
            EntityKind::DeciderCombinator => {
                C::DIRECTION | C::CIRCUIT_WIRE | C::DUAL_CIRCUIT | C::DECIDER
            }
            EntityKind::ConstantCombinator => C::DIRECTION | C::CIRCUIT_WIRE | C::CONSTANT,
            EntityKind::ProgrammableSpeaker => {
                C::CIRCUIT_WIRE | C::SPEAKER | C::CIRCUIT_CONDITION
            }
            EntityKind::AssemblingMachine => C::DIRECTION | C::RECIPE | C::ITEM_REQUESTS,
            EntityKind::RocketSilo => C::RECIPE | C::ITEM_REQUESTS,
            EntityKind::MiningDrill => {
                C::DIRECTION | C::ITEM_REQUESTS | belt_control | C::READ_RESOURCES
            }
            EntityKind::Roboport => C::CIRCUIT_WIRE | C::ROBOPORT_SIGNALS,
            EntityKind::Wall => {
                C::CIRCUIT_WIRE | C::GATE_CONTROL | C::CIRCUIT_CONDITION | C::OUTPUT_SIGNAL
            }
            EntityKind::AmmoTurret => C::DIRECTION | C::ITEM_REQUESTS,
            EntityKind::Unknown => C::DIRECTION | C::EIGHT_WAY,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_round_trip() {
        for &kind in EntityKind::all() {
            if kind == EntityKind::Unknown {
                assert_eq!(EntityKind::from_type_name("unknown"), None);
                continue;
            }
            assert_eq!(EntityKind::from_type_name(kind.type_name()), Some(kind));
        }
    }

    #[test]
    fn serde_uses_type_names() {
        let json = serde_json::to_string(&EntityKind::ArithmeticCombinator).unwrap();
        assert_eq!(json, "\"arithmetic-combinator\"");
        let kind: EntityKind = serde_json::from_str("\"rail-chain-signal\"").unwrap();
        assert_eq!(kind, EntityKind::RailChainSignal);
    }

    #[test]
    fn combinators_are_dual_circuit() {
        assert!(
            EntityKind::DeciderCombinator
                .capabilities()
                .contains(Capabilities::DUAL_CIRCUIT)
        );
        assert!(
            !EntityKind::ConstantCombinator
                .capabilities()
                .contains(Capabilities::DUAL_CIRCUIT)
        );
    }

    #[test]
    fn filter_inserter_extends_inserter() {
        let base = EntityKind::Inserter.capabilities();
        let filter = EntityKind::FilterInserter.capabilities();
        assert!(filter.contains(base));
        assert!(filter.contains(Capabilities::ITEM_FILTERS));
        assert!(!base.contains(Capabilities::ITEM_FILTERS));
    }

    #[test]
    fn rails_accept_diagonals() {
        assert!(
            EntityKind::StraightRail
                .capabilities()
                .contains(Capabilities::EIGHT_WAY)
        );
        assert!(
            !EntityKind::TransportBelt
                .capabilities()
                .contains(Capabilities::EIGHT_WAY)
        );
    }
}
