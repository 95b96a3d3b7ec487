//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::fixed::Fixed64;
use crate::signal::SignalId;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Signal constructors
// ===========================================================================

pub fn iron_plate() -> SignalId {
    SignalId::item("iron-plate")
}
pub fn copper_plate() -> SignalId {
    SignalId::item("copper-plate")
}
pub fn coal() -> SignalId {
    SignalId::item("coal")
}
pub fn water() -> SignalId {
    SignalId::fluid("water")
}
pub fn signal_a() -> SignalId {
    SignalId::virtual_signal("signal-A")
}
pub fn signal_b() -> SignalId {
    SignalId::virtual_signal("signal-B")
}
pub fn signal_red() -> SignalId {
    SignalId::virtual_signal("signal-red")
}
pub fn signal_green() -> SignalId {
    SignalId::virtual_signal("signal-green")
}
