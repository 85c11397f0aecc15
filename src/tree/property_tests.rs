use alloc::vec::Vec;

use proptest::prelude::*;

use super::Smt;
use crate::{MemoryStorage, key::TreeKey, node::LeafValue};

// STRATEGIES
// ================================================================================================

fn arb_key() -> impl Strategy<Value = TreeKey> {
    prop::array::uniform4(any::<u64>()).prop_map(TreeKey::new)
}

fn arb_value() -> impl Strategy<Value = LeafValue> {
    prop::array::uniform8(0u64..=u32::MAX as u64).prop_map(LeafValue)
}

/// Entry sets with distinct keys; values may be zero (a zero value is a deletion).
fn arb_entries(max: usize) -> impl Strategy<Value = Vec<(TreeKey, LeafValue)>> {
    prop::collection::btree_map(arb_key(), arb_value(), 0..max)
        .prop_map(|map| map.into_iter().collect())
}

fn build_tree(entries: &[(TreeKey, LeafValue)]) -> Smt<MemoryStorage> {
    let mut tree = Smt::new(MemoryStorage::new()).unwrap();
    for (key, value) in entries {
        tree.insert_value(key, *value).unwrap();
    }
    tree
}

// PROPERTIES
// ================================================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn inserted_values_read_back(entries in arb_entries(16)) {
        let tree = build_tree(&entries);
        for (key, value) in &entries {
            prop_assert_eq!(tree.get_value(key).unwrap(), *value);
        }
    }

    #[test]
    fn root_is_order_independent(entries in arb_entries(12)) {
        let forward = build_tree(&entries);

        let mut reversed = entries.clone();
        reversed.reverse();
        let backward = build_tree(&reversed);

        prop_assert_eq!(forward.root(), backward.root());
    }

    #[test]
    fn bulk_build_matches_incremental(entries in arb_entries(16)) {
        let incremental = build_tree(&entries);

        let mut bulk = Smt::new(MemoryStorage::new()).unwrap();
        bulk.bulk_build(entries, None).unwrap();

        prop_assert_eq!(bulk.root(), incremental.root());
    }

    #[test]
    fn insert_then_delete_is_identity(
        entries in arb_entries(12),
        extra_key in arb_key(),
        extra_value in arb_value(),
    ) {
        prop_assume!(!extra_value.is_zero());
        prop_assume!(!entries.iter().any(|(key, _)| key == &extra_key));

        let mut tree = build_tree(&entries);
        let baseline = tree.root();

        tree.insert_value(&extra_key, extra_value).unwrap();
        tree.delete(&extra_key).unwrap();

        prop_assert_eq!(tree.root(), baseline);
    }

    #[test]
    fn empty_root_iff_no_entries(entries in arb_entries(8)) {
        let tree = build_tree(&entries);
        let live = entries.iter().filter(|(_, value)| !value.is_zero()).count();
        prop_assert_eq!(tree.root().is_zero(), live == 0);
    }
}
