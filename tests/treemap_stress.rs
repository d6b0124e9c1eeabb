#![cfg(feature = "ordered")]
//! Randomized stress tests for TreeMap.
//!
//! Keys are inserted and removed in shuffled orders drawn from seeded
//! generators, with the tree validated after every step.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rbmap::ordered::TreeMap;
use rstest::rstest;

#[rstest]
#[case::seed_one(1)]
#[case::seed_forty_two(42)]
#[case::seed_large(0x5eed_cafe)]
fn test_shuffled_insert_then_shuffled_remove(#[case] seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keys: Vec<u32> = (1..=1000).collect();
    keys.shuffle(&mut rng);

    let mut map = TreeMap::new();
    for (inserted, key) in keys.iter().enumerate() {
        assert_eq!(map.insert(*key, key.to_string()), None);
        assert_eq!(map.len(), inserted + 1);
        assert_eq!(map.validate(), Ok(()), "after inserting {key}");
    }

    let ascending: Vec<u32> = map.keys().copied().collect();
    assert_eq!(ascending, (1..=1000).collect::<Vec<_>>());

    keys.shuffle(&mut rng);
    for (removed, key) in keys.iter().enumerate() {
        assert_eq!(map.remove_entry(key), Some((*key, key.to_string())));
        assert_eq!(map.len(), keys.len() - removed - 1);
        assert_eq!(map.validate(), Ok(()), "after removing {key}");
    }

    assert!(map.is_empty());
    assert_eq!(map.iter().next(), None);
}

#[rstest]
fn test_interleaved_churn_keeps_invariants() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut map = TreeMap::new();

    for round in 0..20_u32 {
        let mut batch: Vec<u32> = (0..200).map(|offset| round * 50 + offset).collect();
        batch.shuffle(&mut rng);
        for key in &batch {
            map.insert(*key, round);
        }
        assert_eq!(map.validate(), Ok(()));

        batch.shuffle(&mut rng);
        for key in batch.iter().take(120) {
            map.remove(key);
        }
        assert_eq!(map.validate(), Ok(()));
    }

    let keys: Vec<&u32> = map.keys().collect();
    assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(keys.len(), map.len());
}

#[rstest]
#[case::ascending(false)]
#[case::descending(true)]
fn test_sorted_inserts_stay_balanced(#[case] reversed: bool) {
    let mut keys: Vec<u32> = (0..4096).collect();
    if reversed {
        keys.reverse();
    }

    let map: TreeMap<u32, u32> = keys.into_iter().map(|key| (key, key)).collect();
    assert_eq!(map.validate(), Ok(()));
    assert_eq!(map.len(), 4096);
    assert_eq!(map.get(&4095), Some(&4095));
}
