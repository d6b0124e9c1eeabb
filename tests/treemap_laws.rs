#![cfg(feature = "ordered")]
//! Property-based tests for TreeMap.
//!
//! These tests check TreeMap against `BTreeMap` as a reference model and
//! verify the red-black invariants after every mutation using proptest.

use proptest::prelude::*;
use rbmap::ordered::TreeMap;
use std::collections::BTreeMap;

// =============================================================================
// Strategies for Generating Test Data
// =============================================================================

#[derive(Clone, Debug)]
enum Operation {
    Insert(i16, i32),
    Remove(i16),
    Merge(i16, i32),
    ComputeIfPresent(i16),
}

/// Keys are drawn from a narrow range so removals and overwrites hit.
fn arbitrary_operation() -> impl Strategy<Value = Operation> {
    let key = -64_i16..64;
    prop_oneof![
        4 => (key.clone(), any::<i32>()).prop_map(|(key, value)| Operation::Insert(key, value)),
        3 => key.clone().prop_map(Operation::Remove),
        1 => (key.clone(), any::<i32>()).prop_map(|(key, value)| Operation::Merge(key, value)),
        1 => key.prop_map(Operation::ComputeIfPresent),
    ]
}

fn arbitrary_treemap(max_size: usize) -> impl Strategy<Value = TreeMap<i32, i32>> {
    prop::collection::vec((any::<i32>(), any::<i32>()), 0..max_size)
        .prop_map(|entries| entries.into_iter().collect::<TreeMap<i32, i32>>())
}

/// Drops odd values on merge so the removal branch is exercised too.
fn merge_values(old: i32, new: i32) -> Option<i32> {
    let merged = old.wrapping_add(new);
    (merged % 2 == 0).then_some(merged)
}

fn apply(
    map: &mut TreeMap<i16, i32>,
    model: &mut BTreeMap<i16, i32>,
    operation: &Operation,
) -> Result<(), TestCaseError> {
    match *operation {
        Operation::Insert(key, value) => {
            prop_assert_eq!(map.insert(key, value), model.insert(key, value));
        }
        Operation::Remove(key) => {
            prop_assert_eq!(map.remove(&key), model.remove(&key).is_some());
        }
        Operation::Merge(key, value) => {
            let expected = match model.get(&key).copied() {
                Some(old) => merge_values(old, value),
                None => Some(value),
            };
            match expected {
                Some(merged) => model.insert(key, merged),
                None => model.remove(&key),
            };
            let actual = map.merge(key, value, |old, new| merge_values(*old, new));
            prop_assert_eq!(actual.copied(), expected);
        }
        Operation::ComputeIfPresent(key) => {
            let expected = model.get(&key).map(|value| value.wrapping_mul(3));
            if let Some(value) = expected {
                model.insert(key, value);
            }
            let actual = map.compute_if_present(&key, |_, value| Some(value.wrapping_mul(3)));
            prop_assert_eq!(actual.copied(), expected);
        }
    }
    Ok(())
}

// =============================================================================
// Model Laws
// =============================================================================

proptest! {
    /// Law: any sequence of operations agrees with BTreeMap and keeps the
    /// tree valid at every step.
    #[test]
    fn prop_operations_match_model(
        operations in prop::collection::vec(arbitrary_operation(), 0..200)
    ) {
        let mut map = TreeMap::new();
        let mut model = BTreeMap::new();

        for operation in &operations {
            apply(&mut map, &mut model, operation)?;
            prop_assert_eq!(map.validate(), Ok(()), "after {:?}", operation);
            prop_assert_eq!(map.len(), model.len());
        }

        let actual: Vec<(i16, i32)> = map.iter().map(|(key, value)| (*key, *value)).collect();
        let expected: Vec<(i16, i32)> = model.into_iter().collect();
        prop_assert_eq!(actual, expected);
    }

    /// Law: keys come out strictly ascending regardless of insertion order.
    #[test]
    fn prop_keys_strictly_ascending(map in arbitrary_treemap(100)) {
        let keys: Vec<&i32> = map.keys().collect();
        prop_assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
        prop_assert_eq!(keys.len(), map.len());
    }
}

// =============================================================================
// Get-Insert / Remove Laws
// =============================================================================

proptest! {
    /// Law: get after insert returns the inserted value.
    #[test]
    fn prop_get_insert_law(map in arbitrary_treemap(20), key: i32, value: i32) {
        let mut map = map;
        map.insert(key, value);
        prop_assert_eq!(map.get(&key), Some(&value));
    }

    /// Law: insert does not affect other keys.
    #[test]
    fn prop_get_insert_other_law(
        map in arbitrary_treemap(20),
        key1: i32,
        key2: i32,
        value: i32
    ) {
        prop_assume!(key1 != key2);
        let mut updated = map.clone();
        updated.insert(key1, value);
        prop_assert_eq!(updated.get(&key2), map.get(&key2));
    }

    /// Law: get after remove returns None and the tree stays valid.
    #[test]
    fn prop_get_remove_law(map in arbitrary_treemap(50), key: i32) {
        let mut map = map;
        map.remove(&key);
        prop_assert_eq!(map.get(&key), None);
        prop_assert_eq!(map.validate(), Ok(()));
    }

    /// Law: removing every key in any order empties the map.
    #[test]
    fn prop_remove_all_empties(
        keys in prop::collection::vec(any::<i32>(), 0..100),
        seed in any::<u64>()
    ) {
        let mut map: TreeMap<i32, ()> = keys.iter().map(|key| (*key, ())).collect();
        let mut order = keys;
        order.sort_unstable_by_key(|key| (*key as u64).wrapping_mul(seed | 1));

        for key in &order {
            map.remove(key);
            prop_assert_eq!(map.validate(), Ok(()));
        }
        prop_assert!(map.is_empty());
    }
}

// =============================================================================
// Structural Laws
// =============================================================================

proptest! {
    /// Law: a clone is equal to its source and independently valid.
    #[test]
    fn prop_clone_equality(map in arbitrary_treemap(50)) {
        let cloned = map.clone();
        prop_assert_eq!(&cloned, &map);
        prop_assert_eq!(cloned.validate(), Ok(()));
    }

    /// Law: maps built from the same entries in different orders are equal.
    #[test]
    fn prop_equality_is_order_independent(
        entries in prop::collection::btree_map(any::<i32>(), any::<i32>(), 0..50)
    ) {
        let forward: TreeMap<i32, i32> = entries.iter().map(|(k, v)| (*k, *v)).collect();
        let backward: TreeMap<i32, i32> = entries.iter().rev().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(forward, backward);
    }

    /// Law: views agree with iteration.
    #[test]
    fn prop_views_match_iteration(map in arbitrary_treemap(50)) {
        let (keys, values): (Vec<&i32>, Vec<&i32>) = map.iter().unzip();
        prop_assert_eq!(map.key_sequence(), keys);
        prop_assert_eq!(map.value_sequence(), values);
        prop_assert_eq!(map.entry_sequence().len(), map.len());
    }

    /// Law: len equals the number of distinct keys.
    #[test]
    fn prop_len_counts_distinct_keys(
        entries in prop::collection::vec((any::<i32>(), any::<i32>()), 0..100)
    ) {
        let distinct: std::collections::BTreeSet<i32> = entries.iter().map(|(key, _)| *key).collect();
        let map: TreeMap<i32, i32> = entries.into_iter().collect();
        prop_assert_eq!(map.len(), distinct.len());
    }
}
