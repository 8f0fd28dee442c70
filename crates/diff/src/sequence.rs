//! Sequence diff: a minimal edit script between two ordered collections.
//!
//! The script is derived from a longest common subsequence table. Indices in
//! each edit refer to the sequence as it stands after all preceding edits, so
//! applying the script in order to the old collection yields the new one.

use alloc::vec;
use alloc::vec::Vec;

/// A single edit in a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edit<V> {
    /// Remove the element at `index`.
    Delete { index: usize, value: V },
    /// Insert `value` at `index`.
    Insert { index: usize, value: V },
    /// Remove the element at `from`, then insert it at `to`.
    Move { from: usize, to: usize, value: V },
}

impl<V> Edit<V> {
    /// The element this edit removes, inserts, or relocates.
    pub fn value(&self) -> &V {
        match self {
            Edit::Delete { value, .. } | Edit::Insert { value, .. } | Edit::Move { value, .. } => {
                value
            }
        }
    }

    #[inline]
    pub fn is_move(&self) -> bool {
        matches!(self, Edit::Move { .. })
    }
}

/// An ordered list of edits turning one sequence into another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditScript<V> {
    ops: Vec<Edit<V>>,
    base_len: usize,
}

impl<V> EditScript<V> {
    /// The edits, in application order.
    #[inline]
    pub fn ops(&self) -> &[Edit<V>] {
        &self.ops
    }

    #[inline]
    pub fn into_ops(self) -> Vec<Edit<V>> {
        self.ops
    }

    /// Length of the sequence this script applies to.
    #[inline]
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn inserts(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Edit::Insert { .. }))
            .count()
    }

    pub fn deletes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Edit::Delete { .. }))
            .count()
    }

    pub fn moves(&self) -> usize {
        self.ops.iter().filter(|op| op.is_move()).count()
    }

    /// Applies the script to `base`.
    ///
    /// Applied to the `old` slice a script was computed from, this yields
    /// `new` exactly when the script came from structural equality. Under a
    /// coarser `is_equal`, kept elements remain the instances from `old`, so
    /// the result equals `new` only up to `is_equal`:
    ///
    /// ```rust
    /// use lookout_diff::sequence_diff;
    ///
    /// let old = vec!["A", "b"];
    /// let new = vec!["a", "b", "c"];
    /// let script = sequence_diff(&old, &new, |x, y| x.eq_ignore_ascii_case(y));
    /// assert_eq!(script.apply(old), vec!["A", "b", "c"]);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range, which happens when `base` is not
    /// the sequence the script was computed from.
    pub fn apply(&self, mut base: Vec<V>) -> Vec<V>
    where
        V: Clone,
    {
        for op in &self.ops {
            match op {
                Edit::Delete { index, .. } => {
                    base.remove(*index);
                }
                Edit::Insert { index, value } => base.insert(*index, value.clone()),
                Edit::Move { from, to, .. } => {
                    let moved = base.remove(*from);
                    base.insert(*to, moved);
                }
            }
        }
        base
    }

    /// Folds every insert that matches an earlier or later delete into a
    /// single move.
    ///
    /// Each insert pairs with the first unpaired delete whose value satisfies
    /// `is_equal(deleted, inserted)`. Unpaired edits are re-indexed so the
    /// script still applies to the same base. A move carries the inserted
    /// value, but applying it relocates the old instance. A script that
    /// already contains moves is returned as is.
    pub fn with_moves<E>(self, mut is_equal: E) -> Self
    where
        E: FnMut(&V, &V) -> bool,
    {
        if self.ops.iter().any(Edit::is_move) {
            return self;
        }

        // Which delete each insert pairs with
        let mut paired_delete: Vec<Option<usize>> = vec![None; self.ops.len()];
        let mut delete_taken: Vec<bool> = vec![false; self.ops.len()];
        for (q, insert) in self.ops.iter().enumerate() {
            let Edit::Insert { value: inserted, .. } = insert else {
                continue;
            };
            let found = self.ops.iter().enumerate().position(|(p, op)| {
                matches!(op, Edit::Delete { value, .. } if !delete_taken[p] && is_equal(value, inserted))
            });
            if let Some(p) = found {
                delete_taken[p] = true;
                paired_delete[q] = Some(p);
            }
        }
        if paired_delete.iter().all(Option::is_none) {
            return self;
        }

        let base_len = self.base_len;
        let mut replay = Replay::new(base_len, self.ops.len());
        let mut ops = Vec::with_capacity(self.ops.len());

        // The slot each delete removes, known once the script reaches it
        let mut deleted_slot: Vec<Option<Slot>> = vec![None; self.ops.len()];
        {
            let mut scratch = Replay::new(base_len, self.ops.len());
            for (q, op) in self.ops.iter().enumerate() {
                match op {
                    Edit::Delete { index, .. } => {
                        deleted_slot[q] = Some(scratch.original.remove(*index));
                    }
                    Edit::Insert { index, .. } => scratch.original.insert(*index, Slot::New(q)),
                    Edit::Move { .. } => {}
                }
            }
        }

        for (q, op) in self.ops.into_iter().enumerate() {
            match op {
                Edit::Delete { index, value } => {
                    let slot = replay.original.remove(index);
                    if delete_taken[q] {
                        continue;
                    }
                    if let Some(at) = replay.position(slot) {
                        replay.current.remove(at);
                        ops.push(Edit::Delete { index: at, value });
                    }
                }
                Edit::Insert { index, value } => {
                    let to = replay.insertion_point(index);
                    replay.original.insert(index, Slot::New(q));
                    match paired_delete[q].and_then(|p| deleted_slot[p]) {
                        Some(slot) => {
                            let Some(from) = replay.position(slot) else {
                                continue;
                            };
                            replay.current.remove(from);
                            let to = if from < to { to - 1 } else { to };
                            replay.current.insert(to, Slot::New(q));
                            if let Slot::Old(i) = slot {
                                replay.stale[i] = true;
                            }
                            if from != to {
                                ops.push(Edit::Move { from, to, value });
                            }
                        }
                        None => {
                            replay.current.insert(to, Slot::New(q));
                            ops.push(Edit::Insert { index: to, value });
                        }
                    }
                }
                Edit::Move { .. } => {}
            }
        }

        Self { ops, base_len }
    }
}

impl<V> IntoIterator for EditScript<V> {
    type Item = Edit<V>;
    type IntoIter = vec::IntoIter<Edit<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a, V> IntoIterator for &'a EditScript<V> {
    type Item = &'a Edit<V>;
    type IntoIter = core::slice::Iter<'a, Edit<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

/// Identity of an element while a script is replayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    /// Element at this index of the base sequence
    Old(usize),
    /// Element inserted by the edit at this index
    New(usize),
}

/// Replays the unmoved script and the rewritten script side by side.
///
/// `original` is the state under the input script. `current` is the state
/// under the rewritten one. An old slot moved ahead of its delete is stale in
/// `original` until that delete is reached.
struct Replay {
    original: Vec<Slot>,
    current: Vec<Slot>,
    stale: Vec<bool>,
}

impl Replay {
    fn new(base_len: usize, ops: usize) -> Self {
        let base: Vec<Slot> = (0..base_len).map(Slot::Old).collect();
        let mut original = Vec::with_capacity(base_len + ops);
        original.extend_from_slice(&base);
        Self {
            original,
            current: base,
            stale: vec![false; base_len],
        }
    }

    fn position(&self, slot: Slot) -> Option<usize> {
        let found = self.current.iter().position(|s| *s == slot);
        debug_assert!(found.is_some(), "slot {:?} missing from replay", slot);
        found
    }

    fn is_stale(&self, slot: Slot) -> bool {
        matches!(slot, Slot::Old(i) if self.stale[i])
    }

    /// Where an insert at `index` of `original` lands in `current`: right
    /// after the nearest live predecessor.
    fn insertion_point(&self, index: usize) -> usize {
        self.original[..index]
            .iter()
            .rev()
            .find(|slot| !self.is_stale(**slot))
            .and_then(|slot| self.position(*slot))
            .map_or(0, |at| at + 1)
    }
}

/// Computes a minimal edit script turning `old` into `new`.
///
/// Deletions win ties, so at equal cost a delete is emitted before an insert
/// at the same position. Elements matched by `is_equal` are kept as their old
/// instances; with a non-structural `is_equal` the applied result equals
/// `new` up to `is_equal`.
///
/// Runs in O(n * m) time and space after trimming the common prefix and
/// suffix.
///
/// # Example
///
/// ```rust
/// use lookout_diff::{sequence_diff, Edit};
///
/// let script = sequence_diff(&['a', 'b', 'c'], &['b', 'c', 'd'], |a, b| a == b);
/// assert_eq!(
///     script.ops(),
///     &[
///         Edit::Delete { index: 0, value: 'a' },
///         Edit::Insert { index: 2, value: 'd' },
///     ]
/// );
/// ```
pub fn sequence_diff<V, E>(old: &[V], new: &[V], mut is_equal: E) -> EditScript<V>
where
    V: Clone,
    E: FnMut(&V, &V) -> bool,
{
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(o, n)| is_equal(*o, *n))
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(o, n)| is_equal(*o, *n))
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];
    let table = LcsTable::build(old_mid, new_mid, &mut is_equal);

    let mut ops = Vec::new();
    let (mut i, mut j, mut k) = (0, 0, prefix);
    while i < old_mid.len() && j < new_mid.len() {
        if table.matches(i, j) {
            i += 1;
            j += 1;
            k += 1;
        } else if table.len(i + 1, j) >= table.len(i, j + 1) {
            ops.push(Edit::Delete {
                index: k,
                value: old_mid[i].clone(),
            });
            i += 1;
        } else {
            ops.push(Edit::Insert {
                index: k,
                value: new_mid[j].clone(),
            });
            j += 1;
            k += 1;
        }
    }
    for value in &old_mid[i..] {
        ops.push(Edit::Delete {
            index: k,
            value: value.clone(),
        });
    }
    for value in &new_mid[j..] {
        ops.push(Edit::Insert {
            index: k,
            value: value.clone(),
        });
        k += 1;
    }

    EditScript {
        ops,
        base_len: old.len(),
    }
}

/// Suffix LCS lengths: `len(i, j)` is the LCS of `old[i..]` and `new[j..]`.
struct LcsTable {
    lengths: Vec<u32>,
    matched: Vec<bool>,
    width: usize,
}

impl LcsTable {
    fn build<V, E>(old: &[V], new: &[V], is_equal: &mut E) -> Self
    where
        E: FnMut(&V, &V) -> bool,
    {
        let width = new.len() + 1;
        let mut lengths = vec![0u32; (old.len() + 1) * width];
        let mut matched = vec![false; (old.len() + 1) * width];

        for i in (0..old.len()).rev() {
            for j in (0..new.len()).rev() {
                let at = i * width + j;
                if is_equal(&old[i], &new[j]) {
                    matched[at] = true;
                    lengths[at] = lengths[(i + 1) * width + j + 1] + 1;
                } else {
                    lengths[at] = lengths[(i + 1) * width + j].max(lengths[at + 1]);
                }
            }
        }

        Self {
            lengths,
            matched,
            width,
        }
    }

    #[inline]
    fn len(&self, i: usize, j: usize) -> u32 {
        self.lengths[i * self.width + j]
    }

    #[inline]
    fn matches(&self, i: usize, j: usize) -> bool {
        self.matched[i * self.width + j]
    }
}
