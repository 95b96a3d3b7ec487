//! Blueprint entities for draftline.
//!
//! An [`Entity`] pairs a resolved prototype with every setting a blueprint
//! can carry for it. Setters consult the entity's capability set, so a pipe
//! refuses a `bar` and a chest refuses a `circuit_condition` at the point of
//! assignment. JSON parsing accepts the shorthand forms the game and other
//! tools emit and normalizes them; export always writes the canonical form.
//!
//! # Modules
//!
//! - [`entity`] -- the `Entity` type, its JSON codec and registry checks.
//! - [`control`] -- `control_behavior`: conditions, read modes, flags and
//!   output signals.
//! - [`combinator`] -- arithmetic and decider conditions, constant slots.
//! - [`inventory`] -- item filters, logistic requests, wagon inventories.
//! - [`settings`] -- small string enums, speaker and infinity settings.

pub mod combinator;
pub mod control;
pub mod entity;
pub mod inventory;
pub mod settings;

pub use control::{ControlBehavior, Flag, SignalSlot};
pub use entity::{Entity, InfinitySettings, capabilities_for};
