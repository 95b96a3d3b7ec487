use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Blueprint coordinates are multiples of 1/2 (occasionally 1/4 for rolling
/// stock), so they round-trip exactly and can be hashed and ordered.
pub type Fixed64 = I32F32;

/// Convert an f64 to Fixed64.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64 for JSON output.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Half of an integer tile span, as used for footprint centers.
#[inline]
pub fn half(span: u32) -> Fixed64 {
    Fixed64::from_num(span) / Fixed64::from_num(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_are_exact() {
        let a = f64_to_fixed64(1.5);
        let b = f64_to_fixed64(-0.5);
        assert_eq!(fixed64_to_f64(a + b), 1.0);
        assert_eq!(half(3), f64_to_fixed64(1.5));
    }

    #[test]
    fn out_of_range_saturates() {
        assert_eq!(f64_to_fixed64(1e30), Fixed64::MAX);
        assert_eq!(f64_to_fixed64(-1e30), Fixed64::MIN);
    }

    #[test]
    fn fixed64_ordering() {
        let a = f64_to_fixed64(1.0);
        let b = f64_to_fixed64(2.0);
        assert!(a < b);
    }
}
