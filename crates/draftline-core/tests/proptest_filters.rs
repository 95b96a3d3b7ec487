//! Property-based tests for sparse filter slots.
//!
//! Random sequences of set/delete/push operations must keep every occupied
//! slot inside the capacity, and failed operations must leave the
//! collection untouched.

use std::collections::BTreeMap;

use draftline_core::filters::SparseFilters;
use proptest::prelude::*;
use serde_json::Value;

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
enum SlotOp {
    Set(usize, u32),
    Clear(usize),
    Push(u32),
}

fn arb_ops(max_index: usize) -> impl Strategy<Value = Vec<SlotOp>> {
    proptest::collection::vec(
        prop_oneof![
            (0..max_index, any::<u32>()).prop_map(|(i, v)| SlotOp::Set(i, v)),
            (0..max_index).prop_map(SlotOp::Clear),
            any::<u32>().prop_map(SlotOp::Push),
        ],
        1..40,
    )
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The collection behaves like a bounded map from index to value.
    #[test]
    fn matches_bounded_map(capacity in 1usize..12, ops in arb_ops(16)) {
        let mut filters = SparseFilters::new("filters", capacity);
        let mut model: BTreeMap<usize, u32> = BTreeMap::new();

        for op in ops {
            let before = filters.clone();
            match op {
                SlotOp::Set(i, v) => {
                    let result = filters.set(i, Some(v));
                    if i < capacity {
                        prop_assert_eq!(result.unwrap(), model.insert(i, v));
                    } else {
                        prop_assert!(result.is_err());
                        prop_assert_eq!(&filters, &before);
                    }
                }
                SlotOp::Clear(i) => {
                    let result = filters.set(i, None);
                    if i < capacity {
                        prop_assert_eq!(result.unwrap(), model.remove(&i));
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
                SlotOp::Push(v) => {
                    let free = (0..capacity).find(|i| !model.contains_key(i));
                    match (filters.push(v), free) {
                        (Ok(index), Some(expected)) => {
                            prop_assert_eq!(index, expected);
                            model.insert(index, v);
                        }
                        (Err(_), None) => prop_assert_eq!(&filters, &before),
                        (got, want) => {
                            prop_assert!(false, "push gave {:?}, expected slot {:?}", got, want)
                        }
                    }
                }
            }
            prop_assert!(filters.iter().all(|(i, _)| i < capacity));
        }

        let got: Vec<(usize, u32)> = filters.iter().map(|(i, v)| (i, *v)).collect();
        let want: Vec<(usize, u32)> = model.into_iter().collect();
        prop_assert_eq!(got, want);
    }

    /// JSON indices are 1-based and parse back to the same slots.
    #[test]
    fn json_indices_are_one_based(
        slots in proptest::collection::btree_map(0usize..8, 0u32..1000, 0..8),
    ) {
        let mut filters = SparseFilters::new("filters", 8);
        filters.set_all(slots.clone()).unwrap();

        let value = filters.to_value_with(|v, m| {
            m.insert("count".into(), (*v).into());
        });
        let indices: Vec<u64> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["index"].as_u64().unwrap())
            .collect();
        let expected: Vec<u64> = slots.keys().map(|i| *i as u64 + 1).collect();
        prop_assert_eq!(indices, expected);

        let back = SparseFilters::from_value_with("filters", 8, &value, |_, m| {
            Ok(m.get("count").and_then(Value::as_u64).map(|c| c as u32))
        })
        .unwrap();
        prop_assert_eq!(back, filters);
    }

    /// Shrinking the capacity below an occupied slot fails and changes nothing.
    #[test]
    fn shrink_respects_occupied(index in 0usize..10, capacity in 0usize..10) {
        let mut filters = SparseFilters::new("filters", 10);
        filters.set(index, Some(1u8)).unwrap();
        let result = filters.set_capacity(capacity);
        prop_assert_eq!(result.is_ok(), index < capacity);
        prop_assert_eq!(filters.capacity(), if index < capacity { capacity } else { 10 });
    }
}
