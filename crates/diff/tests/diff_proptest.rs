//! Property-based tests for lookout-diff using proptest.

use std::collections::BTreeMap;

use lookout_diff::{keyed_diff_eq, sequence_diff, DiffScanner, KeyedDiffer, SequenceDiffer};
use proptest::prelude::*;

/// A collection sorted by unique key, built from an arbitrary key/value map.
fn keyed_rows() -> impl Strategy<Value = Vec<(u16, u8)>> {
    prop::collection::btree_map(0u16..200, 0u8..4, 0..60)
        .prop_map(|map: BTreeMap<u16, u8>| map.into_iter().collect())
}

fn sequence() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..8, 0..40)
}

proptest! {
    /// Inserted, deleted, and updated keys partition the changed keys.
    #[test]
    fn keyed_diff_partitions_keys(old in keyed_rows(), new in keyed_rows()) {
        let diff = keyed_diff_eq(&old, &new, |v| v.0);

        let old_map: BTreeMap<u16, u8> = old.iter().copied().collect();
        let new_map: BTreeMap<u16, u8> = new.iter().copied().collect();

        let inserted: Vec<u16> = diff.inserted.iter().map(|v| v.0).collect();
        let deleted: Vec<u16> = diff.deleted.iter().map(|v| v.0).collect();
        let updated: Vec<u16> = diff.updated.iter().map(|(o, _)| o.0).collect();

        let expected_inserted: Vec<u16> =
            new_map.keys().filter(|k| !old_map.contains_key(*k)).copied().collect();
        let expected_deleted: Vec<u16> =
            old_map.keys().filter(|k| !new_map.contains_key(*k)).copied().collect();
        let expected_updated: Vec<u16> = old_map
            .iter()
            .filter(|(k, v)| new_map.get(*k).map_or(false, |n| n != *v))
            .map(|(k, _)| *k)
            .collect();

        prop_assert_eq!(inserted, expected_inserted);
        prop_assert_eq!(deleted, expected_deleted);
        prop_assert_eq!(updated, expected_updated);

        for (o, n) in &diff.updated {
            prop_assert_eq!(o.0, n.0);
            prop_assert_ne!(o.1, n.1);
        }
    }

    /// Applying a keyed diff to the old map reproduces the new map.
    #[test]
    fn keyed_diff_reconstructs_new(old in keyed_rows(), new in keyed_rows()) {
        let diff = keyed_diff_eq(&old, &new, |v| v.0);

        let mut rebuilt: BTreeMap<u16, u8> = old.iter().copied().collect();
        for (k, _) in &diff.deleted {
            rebuilt.remove(k);
        }
        for (_, (k, v)) in &diff.updated {
            rebuilt.insert(*k, *v);
        }
        for (k, v) in &diff.inserted {
            prop_assert!(rebuilt.insert(*k, *v).is_none());
        }

        prop_assert_eq!(rebuilt.into_iter().collect::<Vec<_>>(), new);
    }

    /// The edit script turns old into new.
    #[test]
    fn sequence_diff_round_trip(old in sequence(), new in sequence()) {
        let script = sequence_diff(&old, &new, |a, b| a == b);
        prop_assert_eq!(script.apply(old.clone()), new);
    }

    /// Folding matched delete/insert pairs into moves keeps the result.
    #[test]
    fn sequence_diff_round_trip_with_moves(old in sequence(), new in sequence()) {
        let plain = sequence_diff(&old, &new, |a, b| a == b);
        let moved = plain.clone().with_moves(|a, b| a == b);

        prop_assert_eq!(moved.apply(old.clone()), new);
        prop_assert!(moved.len() <= plain.len());
    }

    /// The script size matches the longest common subsequence bound.
    #[test]
    fn sequence_diff_is_minimal(old in sequence(), new in sequence()) {
        let script = sequence_diff(&old, &new, |a, b| a == b);
        let common = old.len() - script.deletes();
        prop_assert_eq!(new.len() - script.inserts(), common);
        prop_assert_eq!(common, lcs_len(&old, &new));
    }

    /// Elements matched under a coarser equality stay as old instances.
    #[test]
    fn sequence_diff_custom_equality(old in sequence(), new in sequence()) {
        let same_bucket = |a: &u8, b: &u8| a / 2 == b / 2;
        let script = sequence_diff(&old, &new, same_bucket);
        let applied = script.apply(old.clone());

        prop_assert_eq!(applied.len(), new.len());
        for (a, n) in applied.iter().zip(new.iter()) {
            prop_assert!(same_bucket(a, n));
        }
    }

    /// The diff is a function of its inputs.
    #[test]
    fn sequence_diff_deterministic(old in sequence(), new in sequence()) {
        let first = sequence_diff(&old, &new, |a, b| a == b);
        let second = sequence_diff(&old, &new, |a, b| a == b);
        prop_assert_eq!(first, second);
    }

    /// Scanning the same collection twice reports an empty diff.
    #[test]
    fn scanner_idempotent(rows in keyed_rows(), seq in sequence()) {
        let mut keyed = KeyedDiffer::new(|v: &(u16, u8)| v.0);
        let scanner = DiffScanner::new(rows.clone()).scan(rows.clone(), &mut keyed);
        prop_assert!(scanner.diff().map_or(false, |d| d.is_empty()));

        let mut ordered = SequenceDiffer::new(|a: &u8, b: &u8| a == b).with_moves();
        let scanner = DiffScanner::new(seq.clone()).scan(seq.clone(), &mut ordered);
        prop_assert!(scanner.diff().map_or(false, |d| d.is_empty()));
    }
}

fn lcs_len(a: &[u8], b: &[u8]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    for x in a {
        let mut row = vec![0usize; b.len() + 1];
        for (j, y) in b.iter().enumerate() {
            row[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(row[j])
            };
        }
        prev = row;
    }
    prev[b.len()]
}
