//! Property-based tests for packed game versions.

use draftline_blueprint::version::Version;
use proptest::prelude::*;

fn arb_version() -> impl Strategy<Value = Version> {
    any::<[u16; 4]>().prop_map(Version::from)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every 64-bit value is exactly one version.
    #[test]
    fn pack_is_a_bijection(packed in any::<u64>()) {
        prop_assert_eq!(Version::unpack(packed).pack(), packed);
    }

    /// Packing preserves ordering, so newer versions compare greater.
    #[test]
    fn pack_preserves_order(a in arb_version(), b in arb_version()) {
        prop_assert_eq!(a.cmp(&b), a.pack().cmp(&b.pack()));
    }

    /// The dotted form parses back to the same version.
    #[test]
    fn display_parses_back(v in arb_version()) {
        let parsed: Version = v.to_string().parse().unwrap();
        prop_assert_eq!(parsed, v);
    }
}
