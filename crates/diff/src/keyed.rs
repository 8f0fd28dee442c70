//! Keyed diff: a linear merge of two collections sorted by primary key.
//!
//! Both inputs must be sorted by strictly ascending key. The diff is computed
//! in one pass without sorting, so an unsorted input yields a wrong diff; debug
//! builds assert the ordering as elements are consumed.

use alloc::vec::Vec;
use core::cmp::Ordering;

/// Outcome of reconciling an old and a new element that share a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Update<V> {
    /// Nothing changed; the pair is left out of the diff.
    Unchanged(V),
    /// The element changed. `new` is the value to keep, which may be the old
    /// instance updated in place.
    Changed { old: V, new: V },
}

/// The result of a keyed diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyedDiff<V> {
    /// Elements whose key only appears in the new collection
    pub inserted: Vec<V>,
    /// Elements whose key only appears in the old collection
    pub deleted: Vec<V>,
    /// Changed elements as (old, new) pairs
    pub updated: Vec<(V, V)>,
}

impl<V> Default for KeyedDiff<V> {
    fn default() -> Self {
        Self {
            inserted: Vec::new(),
            deleted: Vec::new(),
            updated: Vec::new(),
        }
    }
}

impl<V> KeyedDiff<V> {
    /// Creates an empty diff.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no changes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.deleted.is_empty() && self.updated.is_empty()
    }

    /// Returns the total number of changes.
    #[inline]
    pub fn len(&self) -> usize {
        self.inserted.len() + self.deleted.len() + self.updated.len()
    }
}

impl<V: Clone> KeyedDiff<&V> {
    /// Clones the referenced elements into an owned diff.
    pub fn cloned(&self) -> KeyedDiff<V> {
        KeyedDiff {
            inserted: self.inserted.iter().map(|v| (*v).clone()).collect(),
            deleted: self.deleted.iter().map(|v| (*v).clone()).collect(),
            updated: self
                .updated
                .iter()
                .map(|(old, new)| ((*old).clone(), (*new).clone()))
                .collect(),
        }
    }
}

/// One side of the merge: the next element and its key.
struct Cursor<I: Iterator, K> {
    iter: I,
    head: Option<(K, I::Item)>,
    side: &'static str,
}

impl<I, K> Cursor<I, K>
where
    I: Iterator,
    K: Ord,
{
    fn new<F>(mut iter: I, key: &F, side: &'static str) -> Self
    where
        F: Fn(&I::Item) -> K,
    {
        let head = iter.next().map(|v| (key(&v), v));
        Self { iter, head, side }
    }

    fn key(&self) -> Option<&K> {
        self.head.as_ref().map(|(k, _)| k)
    }

    fn advance<F>(&mut self, key: &F) -> Option<I::Item>
    where
        F: Fn(&I::Item) -> K,
    {
        let (current, item) = self.head.take()?;
        self.head = self.iter.next().map(|v| (key(&v), v));
        if let Some((next, _)) = &self.head {
            debug_assert!(
                current < *next,
                "keyed diff: {} collection is not sorted by strictly ascending key",
                self.side
            );
        }
        Some(item)
    }
}

/// Computes the keyed diff of two collections sorted by ascending unique key.
///
/// For every key present on both sides, `update` receives ownership of the old
/// and the new element and decides whether the pair is a change. Keeping the
/// old instance (mutated) as `new` preserves its identity for consumers that
/// reuse objects.
///
/// Runs in O(n + m) with a single pass and no auxiliary sorting.
///
/// # Example
///
/// ```rust
/// use lookout_diff::{keyed_diff, Update};
///
/// let old = vec![(1, 10), (2, 20)];
/// let new = vec![(2, 25), (3, 30)];
/// let diff = keyed_diff(old, new, |v: &(i32, i32)| v.0, |old, new| {
///     if old == new {
///         Update::Unchanged(old)
///     } else {
///         Update::Changed { old, new }
///     }
/// });
///
/// assert_eq!(diff.deleted, vec![(1, 10)]);
/// assert_eq!(diff.updated, vec![((2, 20), (2, 25))]);
/// assert_eq!(diff.inserted, vec![(3, 30)]);
/// ```
pub fn keyed_diff<V, K, I, J, KF, U>(old: I, new: J, key: KF, mut update: U) -> KeyedDiff<V>
where
    I: IntoIterator<Item = V>,
    J: IntoIterator<Item = V>,
    K: Ord,
    KF: Fn(&V) -> K,
    U: FnMut(V, V) -> Update<V>,
{
    let mut old = Cursor::new(old.into_iter(), &key, "old");
    let mut new = Cursor::new(new.into_iter(), &key, "new");
    let mut diff = KeyedDiff::new();

    loop {
        let ordering = match (old.key(), new.key()) {
            (Some(o), Some(n)) => o.cmp(n),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        match ordering {
            Ordering::Less => diff.deleted.extend(old.advance(&key)),
            Ordering::Greater => diff.inserted.extend(new.advance(&key)),
            Ordering::Equal => {
                if let (Some(o), Some(n)) = (old.advance(&key), new.advance(&key)) {
                    if let Update::Changed { old, new } = update(o, n) {
                        diff.updated.push((old, new));
                    }
                }
            }
        }
    }

    diff
}

/// Keyed diff that treats elements as changed when they are not equal.
///
/// Borrows both collections and clones only the elements that end up in the
/// diff.
pub fn keyed_diff_eq<V, K, KF>(old: &[V], new: &[V], key: KF) -> KeyedDiff<V>
where
    V: Clone + PartialEq,
    K: Ord,
    KF: Fn(&V) -> K,
{
    keyed_diff(
        old.iter(),
        new.iter(),
        |v: &&V| key(v),
        |old, new| {
            if old == new {
                Update::Unchanged(old)
            } else {
                Update::Changed { old, new }
            }
        },
    )
    .cloned()
}
