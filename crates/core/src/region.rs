//! Tracked regions: what a computation read.
//!
//! A `TrackedRegion` is recorded by a read transaction while a computation runs.
//! It is replaced wholesale after each evaluation, since a conditional
//! computation may read different tables from one run to the next.

use crate::change_set::ChangeSet;
use std::collections::{BTreeMap, BTreeSet};

/// The columns of one table a computation depends on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Columns {
    /// Every column, including the table's row set.
    All,
    /// Only these columns (the row set is always observed).
    Subset(BTreeSet<String>),
}

impl Columns {
    /// Returns true if the given column is covered.
    pub fn contains(&self, column: &str) -> bool {
        match self {
            Columns::All => true,
            Columns::Subset(columns) => columns.contains(column),
        }
    }

    fn merge(&mut self, other: &Columns) {
        match (&mut *self, other) {
            (Columns::All, _) => {}
            (_, Columns::All) => *self = Columns::All,
            (Columns::Subset(mine), Columns::Subset(theirs)) => {
                mine.extend(theirs.iter().cloned());
            }
        }
    }
}

/// The set of (table, columns) pairs a computation's latest evaluation read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackedRegion {
    tables: BTreeMap<String, Columns>,
}

impl TrackedRegion {
    /// Creates an empty region.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a region covering every column of the given tables.
    pub fn from_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut region = Self::new();
        for table in tables {
            region.tables.insert(table.into(), Columns::All);
        }
        region
    }

    /// Adds a whole table to the region.
    pub fn insert_table(&mut self, table: &str) {
        self.tables.insert(table.to_owned(), Columns::All);
    }

    /// Adds some columns of a table to the region.
    ///
    /// Has no effect on a table that is already fully tracked.
    pub fn insert_columns<I, S>(&mut self, table: &str, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let subset = Columns::Subset(columns.into_iter().map(Into::into).collect());
        match self.tables.get_mut(table) {
            Some(existing) => existing.merge(&subset),
            None => {
                self.tables.insert(table.to_owned(), subset);
            }
        }
    }

    /// Merges another region into this one.
    pub fn union(&mut self, other: &TrackedRegion) {
        for (table, columns) in &other.tables {
            match self.tables.get_mut(table) {
                Some(existing) => existing.merge(columns),
                None => {
                    self.tables.insert(table.clone(), columns.clone());
                }
            }
        }
    }

    /// Returns true if the committed changes may alter what this region read.
    ///
    /// Inserted or deleted rows affect every tracked column of their table;
    /// updates only matter when they touch a tracked column.
    pub fn intersects(&self, changes: &ChangeSet) -> bool {
        changes.iter().any(|(table, change)| match self.tables.get(table) {
            None => false,
            Some(Columns::All) => !change.is_empty(),
            Some(Columns::Subset(columns)) => {
                change.changes_row_set()
                    || change
                        .updated_columns
                        .iter()
                        .any(|column| columns.contains(column))
            }
        })
    }

    /// Returns the tracked columns of a table.
    pub fn columns(&self, table: &str) -> Option<&Columns> {
        self.tables.get(table)
    }

    /// Returns true if the table is tracked at all.
    #[inline]
    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Returns the names of the tracked tables.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Returns true if nothing is tracked.
    ///
    /// An empty region never intersects any change.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
