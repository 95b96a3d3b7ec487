//! Typed `control_behavior`.
//!
//! Every key Factorio 1.1 writes under `control_behavior` maps onto a field
//! here. Boolean toggles and single-signal outputs are keyed by the
//! [`Flag`] and [`SignalSlot`] enums so that each key carries its own
//! capability; everything with structure (conditions, combinator settings,
//! constant slots, read modes) has a dedicated field.
//!
//! Setters check the owning entity's [`Capabilities`] and fail with
//! [`DraftError::Unsupported`] when the kind has no such key.

use std::collections::BTreeMap;

use draftline_core::capability::Capabilities;
use draftline_core::condition::{Comparator, Condition};
use draftline_core::config::ValidationMode;
use draftline_core::diagnostic::DraftWarning;
use draftline_core::error::DraftError;
use draftline_core::kind::EntityKind;
use draftline_core::signal::{SignalCount, SignalId, SignalOperand, SignalResolver};
use draftline_core::value::{as_bool, as_object, as_u32, join};
use serde_json::{Map, Value};

use crate::combinator::{
    ArithmeticConditions, ConstantSlots, DeciderConditions, constant_slots,
    constant_slots_from_value, constant_slots_to_value,
};

const FIELD: &str = "control_behavior";

// ===========================================================================
// Keyed toggles and signals
// ===========================================================================

/// Boolean `control_behavior` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    CircuitEnableDisable,
    ConnectToLogisticNetwork,
    ReadHandContents,
    SetStackSize,
    ReadResources,
    ReadLogistics,
    ReadRobotStats,
    OpenGate,
    ReadSensor,
    CloseSignal,
    ReadSignal,
    SendToTrain,
    ReadFromTrain,
    ReadStoppedTrain,
    SetTrainsLimit,
    ReadTrainsCount,
    UseColors,
    IsOn,
}

impl Flag {
    pub const ALL: [Flag; 18] = [
        Flag::CircuitEnableDisable,
        Flag::ConnectToLogisticNetwork,
        Flag::ReadHandContents,
        Flag::SetStackSize,
        Flag::ReadResources,
        Flag::ReadLogistics,
        Flag::ReadRobotStats,
        Flag::OpenGate,
        Flag::ReadSensor,
        Flag::CloseSignal,
        Flag::ReadSignal,
        Flag::SendToTrain,
        Flag::ReadFromTrain,
        Flag::ReadStoppedTrain,
        Flag::SetTrainsLimit,
        Flag::ReadTrainsCount,
        Flag::UseColors,
        Flag::IsOn,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Flag::CircuitEnableDisable => "circuit_enable_disable",
            Flag::ConnectToLogisticNetwork => "connect_to_logistic_network",
            Flag::ReadHandContents => "circuit_read_hand_contents",
            Flag::SetStackSize => "circuit_set_stack_size",
            Flag::ReadResources => "circuit_read_resources",
            Flag::ReadLogistics => "read_logistics",
            Flag::ReadRobotStats => "read_robot_stats",
            Flag::OpenGate => "circuit_open_gate",
            Flag::ReadSensor => "circuit_read_sensor",
            Flag::CloseSignal => "circuit_close_signal",
            Flag::ReadSignal => "circuit_read_signal",
            Flag::SendToTrain => "send_to_train",
            Flag::ReadFromTrain => "read_from_train",
            Flag::ReadStoppedTrain => "read_stopped_train",
            Flag::SetTrainsLimit => "set_trains_limit",
            Flag::ReadTrainsCount => "read_trains_count",
            Flag::UseColors => "use_colors",
            Flag::IsOn => "is_on",
        }
    }

    /// Capabilities any one of which admits the key.
    pub fn capability(self) -> Capabilities {
        use Capabilities as C;
        match self {
            Flag::CircuitEnableDisable => C::CIRCUIT_ENABLE,
            Flag::ConnectToLogisticNetwork => C::LOGISTIC_CONDITION,
            // Belts share the inserter key for reading their contents.
            Flag::ReadHandContents => C::READ_HAND | C::READ_CONTENTS,
            Flag::SetStackSize => C::STACK_SIZE_CONTROL,
            Flag::ReadResources => C::READ_RESOURCES,
            Flag::ReadLogistics | Flag::ReadRobotStats => C::ROBOPORT_SIGNALS,
            Flag::OpenGate | Flag::ReadSensor => C::GATE_CONTROL,
            Flag::CloseSignal | Flag::ReadSignal => C::RAIL_SIGNAL,
            Flag::SendToTrain
            | Flag::ReadFromTrain
            | Flag::ReadStoppedTrain
            | Flag::SetTrainsLimit
            | Flag::ReadTrainsCount => C::TRAIN_STOP_CONTROL,
            Flag::UseColors => C::LAMP,
            Flag::IsOn => C::CONSTANT,
        }
    }

    fn from_key(key: &str) -> Option<Flag> {
        Flag::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// Single-signal `control_behavior` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalSlot {
    StackControlInput,
    Output,
    AvailableLogistic,
    TotalLogistic,
    AvailableConstruction,
    TotalConstruction,
    RedOutput,
    OrangeOutput,
    GreenOutput,
    BlueOutput,
    TrainStopped,
    TrainsLimit,
    TrainsCount,
}

impl SignalSlot {
    pub const ALL: [SignalSlot; 13] = [
        SignalSlot::StackControlInput,
        SignalSlot::Output,
        SignalSlot::AvailableLogistic,
        SignalSlot::TotalLogistic,
        SignalSlot::AvailableConstruction,
        SignalSlot::TotalConstruction,
        SignalSlot::RedOutput,
        SignalSlot::OrangeOutput,
        SignalSlot::GreenOutput,
        SignalSlot::BlueOutput,
        SignalSlot::TrainStopped,
        SignalSlot::TrainsLimit,
        SignalSlot::TrainsCount,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SignalSlot::StackControlInput => "stack_control_input_signal",
            SignalSlot::Output => "output_signal",
            SignalSlot::AvailableLogistic => "available_logistic_output_signal",
            SignalSlot::TotalLogistic => "total_logistic_output_signal",
            SignalSlot::AvailableConstruction => "available_construction_output_signal",
            SignalSlot::TotalConstruction => "total_construction_output_signal",
            SignalSlot::RedOutput => "red_output_signal",
            SignalSlot::OrangeOutput => "orange_output_signal",
            SignalSlot::GreenOutput => "green_output_signal",
            SignalSlot::BlueOutput => "blue_output_signal",
            SignalSlot::TrainStopped => "train_stopped_signal",
            SignalSlot::TrainsLimit => "trains_limit_signal",
            SignalSlot::TrainsCount => "trains_count_signal",
        }
    }

    pub fn capability(self) -> Capabilities {
        use Capabilities as C;
        match self {
            SignalSlot::StackControlInput => C::STACK_SIZE_CONTROL,
            SignalSlot::Output => C::OUTPUT_SIGNAL,
            SignalSlot::AvailableLogistic
            | SignalSlot::TotalLogistic
            | SignalSlot::AvailableConstruction
            | SignalSlot::TotalConstruction => C::ROBOPORT_SIGNALS,
            SignalSlot::RedOutput | SignalSlot::OrangeOutput | SignalSlot::GreenOutput => {
                C::RAIL_SIGNAL
            }
            SignalSlot::BlueOutput => C::CHAIN_SIGNAL,
            SignalSlot::TrainStopped | SignalSlot::TrainsLimit | SignalSlot::TrainsCount => {
                C::TRAIN_STOP_CONTROL
            }
        }
    }

    fn from_key(key: &str) -> Option<SignalSlot> {
        SignalSlot::ALL.into_iter().find(|s| s.key() == key)
    }
}

// ===========================================================================
// Modes
// ===========================================================================

/// Pulse or hold, for inserter hand and belt content reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    #[default]
    Pulse,
    Hold,
}

impl ReadMode {
    fn number(self) -> u32 {
        match self {
            ReadMode::Pulse => 0,
            ReadMode::Hold => 1,
        }
    }

    fn from_number(field: &str, n: u32) -> Result<Self, DraftError> {
        match n {
            0 => Ok(ReadMode::Pulse),
            1 => Ok(ReadMode::Hold),
            _ => Err(DraftError::invalid(field, format!("{n} is not 0 (pulse) or 1 (hold)"))),
        }
    }
}

/// Mining drill resource reading scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceReadMode {
    #[default]
    ThisMiner,
    EntirePatch,
}

/// `circuit_mode_of_operation`, whose meaning depends on the entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOfOperation {
    /// Inserters.
    Inserter(InserterMode),
    /// Requester and buffer chests.
    Logistic(LogisticModeOfOperation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InserterMode {
    EnableDisable,
    SetFilters,
    ReadHandContents,
    None,
    SetStackSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogisticModeOfOperation {
    SendContents,
    SetRequests,
}

impl ModeOfOperation {
    pub fn number(self) -> u32 {
        match self {
            ModeOfOperation::Inserter(m) => m as u32,
            ModeOfOperation::Logistic(m) => m as u32,
        }
    }

    fn for_kind(kind: EntityKind, n: u32) -> Option<Self> {
        use InserterMode as I;
        use LogisticModeOfOperation as L;
        match kind {
            EntityKind::Inserter | EntityKind::FilterInserter => {
                let modes = [
                    I::EnableDisable,
                    I::SetFilters,
                    I::ReadHandContents,
                    I::None,
                    I::SetStackSize,
                ];
                modes.get(n as usize).copied().map(ModeOfOperation::Inserter)
            }
            EntityKind::LogisticContainer => [L::SendContents, L::SetRequests]
                .get(n as usize)
                .copied()
                .map(ModeOfOperation::Logistic),
            _ => None,
        }
    }

    fn matches_kind(self, kind: EntityKind) -> bool {
        match self {
            ModeOfOperation::Inserter(_) => {
                matches!(kind, EntityKind::Inserter | EntityKind::FilterInserter)
            }
            ModeOfOperation::Logistic(_) => kind == EntityKind::LogisticContainer,
        }
    }
}

/// Speaker `circuit_parameters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpeakerCircuitParameters {
    pub signal_value_is_pitch: bool,
    pub instrument_id: u32,
    pub note_id: u32,
}

impl SpeakerCircuitParameters {
    fn from_value(field: &str, value: &Value) -> Result<Self, DraftError> {
        let map = as_object(field, value)?;
        let mut params = Self::default();
        if let Some(v) = map.get("signal_value_is_pitch") {
            params.signal_value_is_pitch = as_bool(&join(field, "signal_value_is_pitch"), v)?;
        }
        if let Some(v) = map.get("instrument_id") {
            params.instrument_id = as_u32(&join(field, "instrument_id"), v)?;
        }
        if let Some(v) = map.get("note_id") {
            params.note_id = as_u32(&join(field, "note_id"), v)?;
        }
        Ok(params)
    }

    fn to_value(self) -> Value {
        let mut map = Map::new();
        map.insert("signal_value_is_pitch".into(), self.signal_value_is_pitch.into());
        map.insert("instrument_id".into(), self.instrument_id.into());
        map.insert("note_id".into(), self.note_id.into());
        Value::Object(map)
    }
}

// ===========================================================================
// ControlBehavior
// ===========================================================================

/// The circuit and logistic settings of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlBehavior {
    kind: EntityKind,
    caps: Capabilities,
    circuit_condition: Option<Condition>,
    logistic_condition: Option<Condition>,
    flags: BTreeMap<Flag, bool>,
    signals: BTreeMap<SignalSlot, SignalId>,
    hand_read_mode: Option<ReadMode>,
    contents_read_mode: Option<ReadMode>,
    resource_read_mode: Option<ResourceReadMode>,
    mode_of_operation: Option<ModeOfOperation>,
    circuit_parameters: Option<SpeakerCircuitParameters>,
    arithmetic: Option<ArithmeticConditions>,
    decider: Option<DeciderConditions>,
    constant: ConstantSlots,
    /// Keys preserved verbatim from permissive parsing.
    extra: Map<String, Value>,
}

impl ControlBehavior {
    /// Empty settings for an entity of `kind` with capability set `caps`.
    /// `slot_count` bounds constant combinator slots.
    pub fn new(kind: EntityKind, caps: Capabilities, slot_count: usize) -> Self {
        Self {
            kind,
            caps,
            circuit_condition: None,
            logistic_condition: None,
            flags: BTreeMap::new(),
            signals: BTreeMap::new(),
            hand_read_mode: None,
            contents_read_mode: None,
            resource_read_mode: None,
            mode_of_operation: None,
            circuit_parameters: None,
            arithmetic: None,
            decider: None,
            constant: constant_slots(slot_count),
            extra: Map::new(),
        }
    }

    fn require(&self, needed: Capabilities, field: &str) -> Result<(), DraftError> {
        if self.caps.intersects(needed) {
            Ok(())
        } else {
            Err(DraftError::unsupported(self.kind, join(FIELD, field)))
        }
    }

    // -- conditions ---------------------------------------------------------

    pub fn circuit_condition(&self) -> Option<&Condition> {
        self.circuit_condition.as_ref()
    }

    pub fn set_circuit_condition(
        &mut self,
        first: Option<SignalId>,
        comparator: Comparator,
        second: impl Into<SignalOperand>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::CIRCUIT_CONDITION, "circuit_condition")?;
        self.circuit_condition = Some(Condition::new(first, comparator, second));
        Ok(())
    }

    pub fn remove_circuit_condition(&mut self) {
        self.circuit_condition = None;
    }

    pub fn logistic_condition(&self) -> Option<&Condition> {
        self.logistic_condition.as_ref()
    }

    pub fn set_logistic_condition(
        &mut self,
        first: Option<SignalId>,
        comparator: Comparator,
        second: impl Into<SignalOperand>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::LOGISTIC_CONDITION, "logistic_condition")?;
        self.logistic_condition = Some(Condition::new(first, comparator, second));
        Ok(())
    }

    pub fn remove_logistic_condition(&mut self) {
        self.logistic_condition = None;
    }

    // -- flags and signals --------------------------------------------------

    pub fn flag(&self, flag: Flag) -> Option<bool> {
        self.flags.get(&flag).copied()
    }

    /// Set or (with `None`) clear a boolean key.
    pub fn set_flag(&mut self, flag: Flag, value: Option<bool>) -> Result<(), DraftError> {
        self.require(flag.capability(), flag.key())?;
        match value {
            Some(v) => self.flags.insert(flag, v),
            None => self.flags.remove(&flag),
        };
        Ok(())
    }

    pub fn set_enable_disable(&mut self, enabled: bool) -> Result<(), DraftError> {
        self.set_flag(Flag::CircuitEnableDisable, Some(enabled))
    }

    pub fn signal(&self, slot: SignalSlot) -> Option<&SignalId> {
        self.signals.get(&slot)
    }

    /// Set or clear a single-signal key. Pure virtual signals are never
    /// valid outputs or inputs here.
    pub fn set_signal_slot(
        &mut self,
        slot: SignalSlot,
        signal: Option<SignalId>,
    ) -> Result<(), DraftError> {
        self.require(slot.capability(), slot.key())?;
        match signal {
            Some(s) if s.is_pure_virtual() => {
                return Err(DraftError::InvalidSignalUse {
                    signal: s.name,
                    position: slot.key(),
                });
            }
            Some(s) => {
                self.signals.insert(slot, s);
            }
            None => {
                self.signals.remove(&slot);
            }
        }
        Ok(())
    }

    pub fn set_output_signal(&mut self, signal: Option<SignalId>) -> Result<(), DraftError> {
        self.set_signal_slot(SignalSlot::Output, signal)
    }

    /// Enable stack size control from `signal`, or disable it with `None`.
    pub fn set_stack_size_control(&mut self, signal: Option<SignalId>) -> Result<(), DraftError> {
        self.require(Capabilities::STACK_SIZE_CONTROL, "circuit_set_stack_size")?;
        self.set_signal_slot(SignalSlot::StackControlInput, signal.clone())?;
        self.flags.insert(Flag::SetStackSize, signal.is_some());
        Ok(())
    }

    // -- read modes -----------------------------------------------------------

    pub fn hand_read_mode(&self) -> Option<ReadMode> {
        self.hand_read_mode
    }

    /// Read the inserter hand in `mode`, or stop reading with `None`.
    pub fn set_read_hand(&mut self, mode: Option<ReadMode>) -> Result<(), DraftError> {
        self.require(Capabilities::READ_HAND, "circuit_hand_read_mode")?;
        self.flags.insert(Flag::ReadHandContents, mode.is_some());
        self.hand_read_mode = mode;
        Ok(())
    }

    pub fn contents_read_mode(&self) -> Option<ReadMode> {
        self.contents_read_mode
    }

    /// Read belt contents in `mode`, or stop reading with `None`.
    pub fn set_read_contents(&mut self, mode: Option<ReadMode>) -> Result<(), DraftError> {
        self.require(Capabilities::READ_CONTENTS, "circuit_contents_read_mode")?;
        self.flags.insert(Flag::ReadHandContents, mode.is_some());
        self.contents_read_mode = mode;
        Ok(())
    }

    pub fn resource_read_mode(&self) -> Option<ResourceReadMode> {
        self.resource_read_mode
    }

    pub fn set_read_resources(&mut self, mode: Option<ResourceReadMode>) -> Result<(), DraftError> {
        self.require(Capabilities::READ_RESOURCES, "circuit_resource_read_mode")?;
        self.flags.insert(Flag::ReadResources, mode.is_some());
        self.resource_read_mode = mode;
        Ok(())
    }

    pub fn mode_of_operation(&self) -> Option<ModeOfOperation> {
        self.mode_of_operation
    }

    pub fn set_mode_of_operation(
        &mut self,
        mode: Option<ModeOfOperation>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::MODE_OF_OPERATION, "circuit_mode_of_operation")?;
        if let Some(m) = mode {
            if !m.matches_kind(self.kind) {
                return Err(DraftError::invalid(
                    join(FIELD, "circuit_mode_of_operation"),
                    format!("{m:?} does not apply to {} entities", self.kind),
                ));
            }
        }
        self.mode_of_operation = mode;
        Ok(())
    }

    // -- speaker --------------------------------------------------------------

    pub fn circuit_parameters(&self) -> Option<&SpeakerCircuitParameters> {
        self.circuit_parameters.as_ref()
    }

    pub fn set_circuit_parameters(
        &mut self,
        params: Option<SpeakerCircuitParameters>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::SPEAKER, "circuit_parameters")?;
        self.circuit_parameters = params;
        Ok(())
    }

    // -- combinators ----------------------------------------------------------

    pub fn arithmetic_conditions(&self) -> Option<&ArithmeticConditions> {
        self.arithmetic.as_ref()
    }

    pub fn set_arithmetic_conditions(
        &mut self,
        conditions: Option<ArithmeticConditions>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::ARITHMETIC, "arithmetic_conditions")?;
        if let Some(c) = &conditions {
            c.check()?;
        }
        self.arithmetic = conditions;
        Ok(())
    }

    pub fn decider_conditions(&self) -> Option<&DeciderConditions> {
        self.decider.as_ref()
    }

    pub fn set_decider_conditions(
        &mut self,
        conditions: Option<DeciderConditions>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::DECIDER, "decider_conditions")?;
        if let Some(c) = &conditions {
            c.check()?;
        }
        self.decider = conditions;
        Ok(())
    }

    pub fn constant_slots(&self) -> &ConstantSlots {
        &self.constant
    }

    /// Set or (with `None`) clear constant combinator slot `index`.
    pub fn set_signal(
        &mut self,
        index: usize,
        value: Option<(SignalId, i32)>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::CONSTANT, "filters")?;
        self.constant
            .set(index, value.map(|(s, c)| SignalCount::new(s, c)))
            .map(|_| ())
    }

    /// Replace every constant combinator slot, numbered from 0.
    pub fn set_signals(
        &mut self,
        values: impl IntoIterator<Item = (SignalId, i32)>,
    ) -> Result<(), DraftError> {
        self.require(Capabilities::CONSTANT, "filters")?;
        self.constant.set_all(
            values
                .into_iter()
                .enumerate()
                .map(|(i, (s, c))| (i, SignalCount::new(s, c))),
        )
    }

    pub fn is_on(&self) -> bool {
        self.flag(Flag::IsOn).unwrap_or(true)
    }

    // -- inspection -----------------------------------------------------------

    /// Keys kept verbatim because this kind does not understand them.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Every signal referenced anywhere in the settings.
    pub fn referenced_signals(&self) -> Vec<&SignalId> {
        let mut out = Vec::new();
        for c in [&self.circuit_condition, &self.logistic_condition]
            .into_iter()
            .flatten()
        {
            out.extend(c.first_signal.iter());
            out.extend(c.second.signal());
        }
        out.extend(self.signals.values());
        if let Some(a) = &self.arithmetic {
            out.extend(a.first.as_ref().and_then(SignalOperand::signal));
            out.extend(a.second.as_ref().and_then(SignalOperand::signal));
            out.extend(a.output_signal.iter());
        }
        if let Some(d) = &self.decider {
            out.extend(d.condition.first_signal.iter());
            out.extend(d.condition.second.signal());
            out.extend(d.output_signal.iter());
        }
        out.extend(self.constant.values().map(|sc| &sc.signal));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.to_value().is_none()
    }

    // -- JSON -----------------------------------------------------------------

    /// Emit `control_behavior`, or `None` when nothing is set.
    pub fn to_value(&self) -> Option<Value> {
        let mut map = Map::new();
        if let Some(c) = &self.circuit_condition {
            map.insert("circuit_condition".into(), c.to_value());
        }
        if let Some(c) = &self.logistic_condition {
            map.insert("logistic_condition".into(), c.to_value());
        }
        for (flag, v) in &self.flags {
            map.insert(flag.key().into(), (*v).into());
        }
        for (slot, s) in &self.signals {
            map.insert(slot.key().into(), s.to_value());
        }
        if let Some(m) = self.hand_read_mode {
            map.insert("circuit_hand_read_mode".into(), m.number().into());
        }
        if let Some(m) = self.contents_read_mode {
            map.insert("circuit_contents_read_mode".into(), m.number().into());
        }
        if let Some(m) = self.resource_read_mode {
            map.insert("circuit_resource_read_mode".into(), (m as u32).into());
        }
        if let Some(m) = self.mode_of_operation {
            map.insert("circuit_mode_of_operation".into(), m.number().into());
        }
        if let Some(p) = self.circuit_parameters {
            map.insert("circuit_parameters".into(), p.to_value());
        }
        if let Some(a) = &self.arithmetic {
            map.insert("arithmetic_conditions".into(), a.to_value());
        }
        if let Some(d) = &self.decider {
            map.insert("decider_conditions".into(), d.to_value());
        }
        if !self.constant.is_empty() {
            map.insert("filters".into(), constant_slots_to_value(&self.constant));
        }
        for (k, v) in &self.extra {
            map.insert(k.clone(), v.clone());
        }
        (!map.is_empty()).then_some(Value::Object(map))
    }

    /// Parse `control_behavior` for an entity of `kind`.
    ///
    /// Shorthand forms are normalized. A key the kind does not support is an
    /// error in strict mode; otherwise it is kept verbatim and reported.
    #[allow(clippy::too_many_arguments)]
    pub fn from_value(
        value: &Value,
        kind: EntityKind,
        caps: Capabilities,
        slot_count: usize,
        entity: &str,
        signals: &dyn SignalResolver,
        mode: ValidationMode,
        warnings: &mut Vec<DraftWarning>,
    ) -> Result<Self, DraftError> {
        let map = as_object(FIELD, value)?;
        let mut cb = Self::new(kind, caps, slot_count);

        for (key, v) in map {
            let path = join(FIELD, key);
            match cb.parse_key(key, &path, v, signals) {
                Ok(true) => {}
                Ok(false) | Err(DraftError::Unsupported { .. })
                    if mode != ValidationMode::Strict =>
                {
                    tracing::debug!(entity, key = %path, "keeping unrecognized key");
                    warnings.push(DraftWarning::UnrecognizedKey {
                        entity: entity.to_string(),
                        key: path,
                    });
                    cb.extra.insert(key.clone(), v.clone());
                }
                Ok(false) => return Err(DraftError::unsupported(kind, path)),
                Err(e) => return Err(e),
            }
        }
        Ok(cb)
    }

    /// Returns `Ok(false)` for keys no kind understands.
    fn parse_key(
        &mut self,
        key: &str,
        path: &str,
        v: &Value,
        signals: &dyn SignalResolver,
    ) -> Result<bool, DraftError> {
        if let Some(flag) = Flag::from_key(key) {
            return self.set_flag(flag, Some(as_bool(path, v)?)).map(|_| true);
        }
        if let Some(slot) = SignalSlot::from_key(key) {
            let signal = match v {
                Value::Null => None,
                _ => Some(signals.resolve_signal(path, v)?),
            };
            return self.set_signal_slot(slot, signal).map(|_| true);
        }
        match key {
            "circuit_condition" => {
                self.require(Capabilities::CIRCUIT_CONDITION, key)?;
                self.circuit_condition = Some(Condition::from_value(path, v, signals)?);
            }
            "logistic_condition" => {
                self.require(Capabilities::LOGISTIC_CONDITION, key)?;
                self.logistic_condition = Some(Condition::from_value(path, v, signals)?);
            }
            "circuit_hand_read_mode" => {
                self.require(Capabilities::READ_HAND, key)?;
                self.hand_read_mode = Some(ReadMode::from_number(path, as_u32(path, v)?)?);
            }
            "circuit_contents_read_mode" => {
                self.require(Capabilities::READ_CONTENTS, key)?;
                self.contents_read_mode = Some(ReadMode::from_number(path, as_u32(path, v)?)?);
            }
            "circuit_resource_read_mode" => {
                self.require(Capabilities::READ_RESOURCES, key)?;
                self.resource_read_mode = Some(match as_u32(path, v)? {
                    0 => ResourceReadMode::ThisMiner,
                    1 => ResourceReadMode::EntirePatch,
                    n => {
                        return Err(DraftError::invalid(
                            path,
                            format!("{n} is not 0 (this miner) or 1 (entire patch)"),
                        ));
                    }
                });
            }
            "circuit_mode_of_operation" => {
                self.require(Capabilities::MODE_OF_OPERATION, key)?;
                let n = as_u32(path, v)?;
                let mode = ModeOfOperation::for_kind(self.kind, n).ok_or_else(|| {
                    let kind = self.kind;
                    DraftError::invalid(path, format!("{n} is not a mode for {kind} entities"))
                })?;
                self.mode_of_operation = Some(mode);
            }
            "circuit_parameters" => {
                self.require(Capabilities::SPEAKER, key)?;
                self.circuit_parameters = Some(SpeakerCircuitParameters::from_value(path, v)?);
            }
            "arithmetic_conditions" => {
                self.require(Capabilities::ARITHMETIC, key)?;
                self.arithmetic = Some(ArithmeticConditions::from_value(path, v, signals)?);
            }
            "decider_conditions" => {
                self.require(Capabilities::DECIDER, key)?;
                self.decider = Some(DeciderConditions::from_value(path, v, signals)?);
            }
            "filters" => {
                self.require(Capabilities::CONSTANT, key)?;
                self.constant = constant_slots_from_value(self.constant.capacity(), v, signals)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftline_core::signal::DictSignals;
    use draftline_core::test_utils::*;
    use serde_json::json;

    fn behavior(kind: EntityKind) -> ControlBehavior {
        ControlBehavior::new(kind, kind.capabilities(), 20)
    }

    fn parse(
        kind: EntityKind,
        v: Value,
        mode: ValidationMode,
    ) -> Result<(ControlBehavior, Vec<DraftWarning>), DraftError> {
        let mut warnings = Vec::new();
        let caps = kind.capabilities();
        let cb = ControlBehavior::from_value(
            &v,
            kind,
            caps,
            20,
            "test",
            &DictSignals,
            mode,
            &mut warnings,
        )?;
        Ok((cb, warnings))
    }

    #[test]
    fn empty_emits_nothing() {
        assert!(behavior(EntityKind::Inserter).to_value().is_none());
    }

    #[test]
    fn circuit_condition_on_inserter() {
        let mut cb = behavior(EntityKind::Inserter);
        cb.set_circuit_condition(Some(iron_plate()), Comparator::Gt, 100).unwrap();
        let v = cb.to_value().unwrap();
        assert_eq!(
            v,
            json!({"circuit_condition": {
                "first_signal": {"name": "iron-plate", "type": "item"},
                "comparator": ">",
                "constant": 100
            }})
        );
        cb.remove_circuit_condition();
        assert!(cb.is_empty());
    }

    #[test]
    fn unsupported_setter() {
        let mut cb = behavior(EntityKind::Accumulator);
        let err = cb.set_circuit_condition(None, Comparator::Lt, 0).unwrap_err();
        assert_eq!(
            err,
            DraftError::unsupported(EntityKind::Accumulator, "control_behavior.circuit_condition")
        );
        assert!(cb.set_output_signal(Some(signal_a())).is_ok());
    }

    #[test]
    fn output_slots_reject_pure_virtual() {
        let mut cb = behavior(EntityKind::Accumulator);
        let err = cb.set_output_signal(Some(SignalId::each())).unwrap_err();
        assert!(matches!(err, DraftError::InvalidSignalUse { position: "output_signal", .. }));
    }

    #[test]
    fn read_modes_set_flags() {
        let mut cb = behavior(EntityKind::Inserter);
        cb.set_read_hand(Some(ReadMode::Hold)).unwrap();
        let v = cb.to_value().unwrap();
        assert_eq!(v["circuit_read_hand_contents"], true);
        assert_eq!(v["circuit_hand_read_mode"], 1);

        let mut belt = behavior(EntityKind::TransportBelt);
        belt.set_read_contents(Some(ReadMode::Pulse)).unwrap();
        assert_eq!(belt.to_value().unwrap()["circuit_contents_read_mode"], 0);
        assert!(belt.set_read_hand(Some(ReadMode::Hold)).is_err());
    }

    #[test]
    fn stack_size_control() {
        let mut cb = behavior(EntityKind::Inserter);
        cb.set_stack_size_control(Some(signal_b())).unwrap();
        let v = cb.to_value().unwrap();
        assert_eq!(v["circuit_set_stack_size"], true);
        assert_eq!(v["stack_control_input_signal"]["name"], "signal-B");
    }

    #[test]
    fn mode_of_operation_by_kind() {
        let mut cb = behavior(EntityKind::Inserter);
        cb.set_mode_of_operation(Some(ModeOfOperation::Inserter(InserterMode::SetFilters)))
            .unwrap();
        assert_eq!(cb.to_value().unwrap()["circuit_mode_of_operation"], 1);
        assert!(
            cb.set_mode_of_operation(Some(ModeOfOperation::Logistic(
                LogisticModeOfOperation::SetRequests
            )))
            .is_err()
        );
    }

    #[test]
    fn parse_normalizes_shorthand() {
        let (cb, warnings) = parse(
            EntityKind::Lamp,
            json!({
                "circuit_condition": {
                    "first_signal": {"name": "signal-A", "type": "virtual"},
                    "comparator": "!=",
                    "constant": 0
                },
                "use_colors": true
            }),
            ValidationMode::Strict,
        )
        .unwrap();
        assert!(warnings.is_empty());
        let v = cb.to_value().unwrap();
        assert_eq!(v["circuit_condition"]["comparator"], "≠");
        assert!(v["circuit_condition"].get("constant").is_none());
        assert_eq!(v["use_colors"], true);
    }

    #[test]
    fn unsupported_key_strict_vs_permissive() {
        let v = json!({"use_colors": true});
        let err = parse(EntityKind::Inserter, v.clone(), ValidationMode::Strict).unwrap_err();
        assert!(matches!(err, DraftError::Unsupported { .. }));

        let (cb, warnings) = parse(EntityKind::Inserter, v, ValidationMode::Permissive).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(cb.extra()["use_colors"], true);
        assert_eq!(cb.to_value().unwrap()["use_colors"], true);
    }

    #[test]
    fn unknown_key_strict() {
        let err = parse(EntityKind::Lamp, json!({"glow": 1}), ValidationMode::Strict).unwrap_err();
        assert_eq!(
            err,
            DraftError::unsupported(EntityKind::Lamp, "control_behavior.glow")
        );
    }

    #[test]
    fn constant_combinator_slots() {
        let mut cb = behavior(EntityKind::ConstantCombinator);
        cb.set_signal(0, Some((signal_a(), 10))).unwrap();
        cb.set_signal(19, Some((iron_plate(), -3))).unwrap();
        assert!(cb.set_signal(20, Some((coal(), 1))).is_err());
        cb.set_flag(Flag::IsOn, Some(false)).unwrap();
        assert!(!cb.is_on());
        let v = cb.to_value().unwrap();
        assert_eq!(v["filters"][1]["index"], 20);
        assert_eq!(v["is_on"], false);

        let (back, _) = parse(EntityKind::ConstantCombinator, v, ValidationMode::Strict).unwrap();
        assert_eq!(back, cb);
    }

    #[test]
    fn train_stop_signals() {
        let mut cb = behavior(EntityKind::TrainStop);
        cb.set_flag(Flag::ReadStoppedTrain, Some(true)).unwrap();
        cb.set_signal_slot(SignalSlot::TrainStopped, Some(signal_green())).unwrap();
        cb.set_enable_disable(true).unwrap();
        let v = cb.to_value().unwrap();
        assert_eq!(v["read_stopped_train"], true);
        assert_eq!(v["train_stopped_signal"]["name"], "signal-green");
        assert_eq!(v["circuit_enable_disable"], true);
    }

    #[test]
    fn referenced_signals_cover_combinators() {
        let mut cb = behavior(EntityKind::DeciderCombinator);
        cb.set_decider_conditions(Some(
            DeciderConditions::new(signal_a(), Comparator::Eq, signal_b(), Some(signal_red()), true)
                .unwrap(),
        ))
        .unwrap();
        let names: Vec<_> = cb.referenced_signals().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["signal-A", "signal-B", "signal-red"]);
    }
}
