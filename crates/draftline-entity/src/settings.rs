//! Small per-kind settings: belt/loader direction, splitter priorities,
//! filter mode, speaker parameters, and infinity chest/pipe settings.

use draftline_core::error::DraftError;
use draftline_core::filters::SparseFilters;
use draftline_core::signal::{SignalId, SignalResolver};
use draftline_core::value::{as_bool, as_object, as_str, as_u32, finite_f64, join, require};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declares a string-keyed enum with `as_str` / `parse` / `from_value`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn from_value(field: &str, value: &Value) -> Result<Self, DraftError> {
                let s = as_str(field, value)?;
                Self::parse(s).ok_or_else(|| {
                    DraftError::invalid(
                        field,
                        format!("'{s}' is not one of: {}", [$($text),+].join(", ")),
                    )
                })
            }
        }
    };
}

string_enum! {
    /// Whether an underground belt or loader takes items in or puts them out.
    IoType { Input => "input", Output => "output" }
}

string_enum! {
    /// Splitter input/output lane priority.
    SplitterPriority { Left => "left", Right => "right" }
}

string_enum! {
    /// Filter inserter whitelist/blacklist.
    FilterMode { Whitelist => "whitelist", Blacklist => "blacklist" }
}

string_enum! {
    /// How an infinity chest slot or pipe maintains its amount.
    InfinityMode {
        AtLeast => "at-least",
        AtMost => "at-most",
        Exactly => "exactly",
        Add => "add",
        Remove => "remove",
    }
}

impl InfinityMode {
    /// Chest filters only understand the three threshold modes.
    pub fn valid_for_container(self) -> bool {
        matches!(self, InfinityMode::AtLeast | InfinityMode::AtMost | InfinityMode::Exactly)
    }
}

// ---------------------------------------------------------------------------
// Programmable speaker
// ---------------------------------------------------------------------------

/// Playback settings (`parameters`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerParameters {
    playback_volume: f64,
    pub playback_globally: bool,
    pub allow_polyphony: bool,
}

impl Default for SpeakerParameters {
    fn default() -> Self {
        Self {
            playback_volume: 1.0,
            playback_globally: false,
            allow_polyphony: false,
        }
    }
}

impl SpeakerParameters {
    pub fn playback_volume(&self) -> f64 {
        self.playback_volume
    }

    pub fn set_playback_volume(&mut self, volume: f64) -> Result<(), DraftError> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(DraftError::invalid(
                "parameters.playback_volume",
                format!("{volume} is outside 0..=1"),
            ));
        }
        self.playback_volume = volume;
        Ok(())
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn from_value(field: &str, value: &Value) -> Result<Self, DraftError> {
        let map = as_object(field, value)?;
        let mut params = Self::default();
        if let Some(v) = map.get("playback_volume") {
            let volume = finite_f64(&join(field, "playback_volume"), v)?;
            params.set_playback_volume(volume)?;
        }
        if let Some(v) = map.get("playback_globally") {
            params.playback_globally = as_bool(&join(field, "playback_globally"), v)?;
        }
        if let Some(v) = map.get("allow_polyphony") {
            params.allow_polyphony = as_bool(&join(field, "allow_polyphony"), v)?;
        }
        Ok(params)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("playback_volume".into(), self.playback_volume.into());
        map.insert("playback_globally".into(), self.playback_globally.into());
        map.insert("allow_polyphony".into(), self.allow_polyphony.into());
        Value::Object(map)
    }
}

/// Alert settings (`alert_parameters`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertParameters {
    pub show_alert: bool,
    pub show_on_map: bool,
    pub icon_signal_id: Option<SignalId>,
    pub alert_message: String,
}

impl Default for AlertParameters {
    fn default() -> Self {
        Self {
            show_alert: false,
            show_on_map: true,
            icon_signal_id: None,
            alert_message: String::new(),
        }
    }
}

impl AlertParameters {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn from_value(
        field: &str,
        value: &Value,
        signals: &dyn SignalResolver,
    ) -> Result<Self, DraftError> {
        let map = as_object(field, value)?;
        let mut alert = Self::default();
        if let Some(v) = map.get("show_alert") {
            alert.show_alert = as_bool(&join(field, "show_alert"), v)?;
        }
        if let Some(v) = map.get("show_on_map") {
            alert.show_on_map = as_bool(&join(field, "show_on_map"), v)?;
        }
        if let Some(v) = map.get("icon_signal_id").filter(|v| !v.is_null()) {
            alert.icon_signal_id = Some(signals.resolve_signal(&join(field, "icon_signal_id"), v)?);
        }
        if let Some(v) = map.get("alert_message") {
            alert.alert_message = as_str(&join(field, "alert_message"), v)?.to_string();
        }
        Ok(alert)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("show_alert".into(), self.show_alert.into());
        map.insert("show_on_map".into(), self.show_on_map.into());
        if let Some(icon) = &self.icon_signal_id {
            map.insert("icon_signal_id".into(), icon.to_value());
        }
        if !self.alert_message.is_empty() {
            map.insert("alert_message".into(), self.alert_message.clone().into());
        }
        Value::Object(map)
    }
}

/// Both halves of a programmable speaker's entity-level settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeakerSettings {
    pub parameters: SpeakerParameters,
    pub alert: AlertParameters,
}

// ---------------------------------------------------------------------------
// Infinity chest and pipe
// ---------------------------------------------------------------------------

/// One infinity chest slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfinityFilter {
    pub name: String,
    pub count: u32,
    pub mode: InfinityMode,
}

impl InfinityFilter {
    pub fn new(
        name: impl Into<String>,
        count: u32,
        mode: InfinityMode,
    ) -> Result<Self, DraftError> {
        if !mode.valid_for_container() {
            return Err(DraftError::invalid(
                "infinity_settings.filters.mode",
                format!("'{}' is not valid for a chest", mode.as_str()),
            ));
        }
        Ok(Self {
            name: name.into(),
            count,
            mode,
        })
    }
}

/// `infinity_settings` of an infinity chest. Filter capacity is the
/// chest's inventory size.
#[derive(Debug, Clone, PartialEq)]
pub struct InfinityContainerSettings {
    pub remove_unfiltered_items: bool,
    pub filters: SparseFilters<InfinityFilter>,
}

impl InfinityContainerSettings {
    pub fn new(capacity: usize) -> Self {
        Self {
            remove_unfiltered_items: false,
            filters: SparseFilters::new("infinity_settings.filters", capacity),
        }
    }

    pub fn is_default(&self) -> bool {
        !self.remove_unfiltered_items && self.filters.is_empty()
    }

    pub fn from_value(field: &str, capacity: usize, value: &Value) -> Result<Self, DraftError> {
        let map = as_object(field, value)?;
        let mut settings = Self::new(capacity);
        if let Some(v) = map.get("remove_unfiltered_items") {
            settings.remove_unfiltered_items = as_bool(&join(field, "remove_unfiltered_items"), v)?;
        }
        if let Some(v) = map.get("filters") {
            settings.filters = SparseFilters::from_value_with(
                "infinity_settings.filters",
                capacity,
                v,
                |path, entry| {
                    let name = as_str(&join(path, "name"), require(entry, path, "name")?)?;
                    let count = match entry.get("count") {
                        Some(c) => as_u32(&join(path, "count"), c)?,
                        None => 0,
                    };
                    let mode = match entry.get("mode") {
                        Some(m) => InfinityMode::from_value(&join(path, "mode"), m)?,
                        None => InfinityMode::AtLeast,
                    };
                    InfinityFilter::new(name, count, mode).map(Some)
                },
            )?;
        }
        Ok(settings)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "remove_unfiltered_items".into(),
            self.remove_unfiltered_items.into(),
        );
        if !self.filters.is_empty() {
            let filters = self.filters.to_value_with(|f, m| {
                m.insert("name".into(), f.name.clone().into());
                m.insert("count".into(), f.count.into());
                m.insert("mode".into(), f.mode.as_str().into());
            });
            map.insert("filters".into(), filters);
        }
        Value::Object(map)
    }
}

/// `infinity_settings` of an infinity pipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfinityPipeSettings {
    pub name: Option<String>,
    percentage: f64,
    pub mode: InfinityMode,
    temperature: Option<f64>,
}

impl Default for InfinityPipeSettings {
    fn default() -> Self {
        Self {
            name: None,
            percentage: 0.0,
            mode: InfinityMode::AtLeast,
            temperature: None,
        }
    }
}

impl InfinityPipeSettings {
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn set_percentage(&mut self, percentage: f64) -> Result<(), DraftError> {
        if !percentage.is_finite() || percentage < 0.0 {
            return Err(DraftError::invalid(
                "infinity_settings.percentage",
                format!("{percentage} must be a non-negative number"),
            ));
        }
        self.percentage = percentage;
        Ok(())
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn set_temperature(&mut self, temperature: Option<f64>) -> Result<(), DraftError> {
        if let Some(t) = temperature {
            if !t.is_finite() {
                return Err(DraftError::invalid("infinity_settings.temperature", "must be finite"));
            }
        }
        self.temperature = temperature;
        Ok(())
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn from_value(field: &str, value: &Value) -> Result<Self, DraftError> {
        let map = as_object(field, value)?;
        let mut settings = Self::default();
        if let Some(v) = map.get("name").filter(|v| !v.is_null()) {
            settings.name = Some(as_str(&join(field, "name"), v)?.to_string());
        }
        if let Some(v) = map.get("percentage") {
            settings.set_percentage(finite_f64(&join(field, "percentage"), v)?)?;
        }
        if let Some(v) = map.get("mode") {
            settings.mode = InfinityMode::from_value(&join(field, "mode"), v)?;
        }
        if let Some(v) = map.get("temperature") {
            settings.set_temperature(Some(finite_f64(&join(field, "temperature"), v)?))?;
        }
        Ok(settings)
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(name) = &self.name {
            map.insert("name".into(), name.clone().into());
        }
        map.insert("percentage".into(), self.percentage.into());
        map.insert("mode".into(), self.mode.as_str().into());
        if let Some(t) = self.temperature {
            map.insert("temperature".into(), t.into());
        }
        Value::Object(map)
    }
}
