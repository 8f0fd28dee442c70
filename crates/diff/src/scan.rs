//! Folding a stream of collection snapshots into (collection, diff) pairs.
//!
//! [`DiffScanner`] is a pure state-transition value. The first element of a
//! stream has no predecessor, so its scanner carries no diff; consumers use
//! that to render an initial load without animating it.

use alloc::vec::Vec;

use crate::keyed::{keyed_diff_eq, KeyedDiff};
use crate::sequence::{sequence_diff, EditScript};

/// Computes a diff between two consecutive collections.
pub trait Differ<C> {
    type Diff;

    fn diff(&mut self, old: &C, new: &C) -> Self::Diff;
}

impl<C, D, F> Differ<C> for F
where
    F: FnMut(&C, &C) -> D,
{
    type Diff = D;

    fn diff(&mut self, old: &C, new: &C) -> D {
        self(old, new)
    }
}

/// Keyed diff over vectors sorted by the key function.
#[derive(Clone, Debug)]
pub struct KeyedDiffer<KF> {
    key: KF,
}

impl<KF> KeyedDiffer<KF> {
    pub fn new(key: KF) -> Self {
        Self { key }
    }
}

impl<V, K, KF> Differ<Vec<V>> for KeyedDiffer<KF>
where
    V: Clone + PartialEq,
    K: Ord,
    KF: Fn(&V) -> K,
{
    type Diff = KeyedDiff<V>;

    fn diff(&mut self, old: &Vec<V>, new: &Vec<V>) -> KeyedDiff<V> {
        keyed_diff_eq(old, new, &self.key)
    }
}

/// Sequence diff over vectors, optionally folding delete/insert pairs into
/// moves.
#[derive(Clone, Debug)]
pub struct SequenceDiffer<E> {
    is_equal: E,
    moves: bool,
}

impl<E> SequenceDiffer<E> {
    pub fn new(is_equal: E) -> Self {
        Self {
            is_equal,
            moves: false,
        }
    }

    /// Emits moves instead of matching delete/insert pairs.
    pub fn with_moves(mut self) -> Self {
        self.moves = true;
        self
    }
}

impl<V, E> Differ<Vec<V>> for SequenceDiffer<E>
where
    V: Clone,
    E: FnMut(&V, &V) -> bool,
{
    type Diff = EditScript<V>;

    fn diff(&mut self, old: &Vec<V>, new: &Vec<V>) -> EditScript<V> {
        let script = sequence_diff(old, new, &mut self.is_equal);
        if self.moves {
            script.with_moves(&mut self.is_equal)
        } else {
            script
        }
    }
}

/// The latest collection and the diff from its predecessor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffScanner<C, D> {
    collection: C,
    diff: Option<D>,
}

impl<C, D> DiffScanner<C, D> {
    /// Starts a scan. The initial collection has no diff.
    pub fn new(initial: C) -> Self {
        Self {
            collection: initial,
            diff: None,
        }
    }

    /// Advances to `new`, diffing against the current collection.
    ///
    /// Scanning an equal collection still produces a diff, which is empty for
    /// the built-in differs.
    #[must_use]
    pub fn scan<F>(self, new: C, differ: &mut F) -> Self
    where
        F: Differ<C, Diff = D>,
    {
        let diff = differ.diff(&self.collection, &new);
        Self {
            collection: new,
            diff: Some(diff),
        }
    }

    /// One fold step: starts the scan on the first element, advances it
    /// afterwards.
    pub fn step<F>(state: Option<Self>, new: C, differ: &mut F) -> Self
    where
        F: Differ<C, Diff = D>,
    {
        match state {
            None => Self::new(new),
            Some(scanner) => scanner.scan(new, differ),
        }
    }

    #[inline]
    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// `None` for the initial collection.
    #[inline]
    pub fn diff(&self) -> Option<&D> {
        self.diff.as_ref()
    }

    #[inline]
    pub fn is_initial(&self) -> bool {
        self.diff.is_none()
    }

    pub fn into_parts(self) -> (C, Option<D>) {
        (self.collection, self.diff)
    }
}

/// Iterator adapter produced by [`ScanDiffsExt::scan_diffs`].
pub struct ScanDiffs<I, F, C> {
    iter: I,
    differ: F,
    previous: Option<C>,
}

impl<I, F, C> Iterator for ScanDiffs<I, F, C>
where
    I: Iterator<Item = C>,
    F: Differ<C>,
    C: Clone,
{
    type Item = DiffScanner<C, F::Diff>;

    fn next(&mut self) -> Option<Self::Item> {
        let new = self.iter.next()?;
        let diff = match self.previous.take() {
            Some(old) => Some(self.differ.diff(&old, &new)),
            None => None,
        };
        self.previous = Some(new.clone());
        Some(DiffScanner {
            collection: new,
            diff,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

/// Adds [`scan_diffs`](ScanDiffsExt::scan_diffs) to every iterator.
pub trait ScanDiffsExt: Iterator + Sized {
    /// Pairs each collection with its diff from the previous one.
    ///
    /// ```rust
    /// use lookout_diff::{KeyedDiffer, ScanDiffsExt};
    ///
    /// let snapshots = vec![vec![1, 2], vec![2, 3]];
    /// let scanned: Vec<_> = snapshots
    ///     .into_iter()
    ///     .scan_diffs(KeyedDiffer::new(|v: &i32| *v))
    ///     .collect();
    ///
    /// assert!(scanned[0].is_initial());
    /// let diff = scanned[1].diff().unwrap();
    /// assert_eq!(diff.deleted, vec![1]);
    /// assert_eq!(diff.inserted, vec![3]);
    /// ```
    fn scan_diffs<F>(self, differ: F) -> ScanDiffs<Self, F, Self::Item>
    where
        F: Differ<Self::Item>,
    {
        ScanDiffs {
            iter: self,
            differ,
            previous: None,
        }
    }
}

impl<I: Iterator> ScanDiffsExt for I {}
