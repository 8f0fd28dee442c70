//! Change set describing what one committed write transaction touched.
//!
//! A `ChangeSet` is produced once per commit by the store and is never mutated
//! after it has been published. Observers compare it against their
//! [`TrackedRegion`](crate::TrackedRegion) to decide whether to re-evaluate.

use std::collections::{BTreeMap, BTreeSet};

/// Changes applied to a single table by one commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableChange {
    /// Number of rows inserted
    pub inserted: usize,
    /// Number of rows deleted
    pub deleted: usize,
    /// Number of rows updated
    pub updated: usize,
    /// Columns whose values changed in at least one updated row
    pub updated_columns: BTreeSet<String>,
}

impl TableChange {
    /// Returns true if rows were added to or removed from the table.
    ///
    /// Such a change affects every column of the table.
    #[inline]
    pub fn changes_row_set(&self) -> bool {
        self.inserted > 0 || self.deleted > 0
    }

    /// Returns true if nothing was recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inserted == 0 && self.deleted == 0 && self.updated == 0
    }

    fn merge(&mut self, other: &TableChange) {
        self.inserted += other.inserted;
        self.deleted += other.deleted;
        self.updated += other.updated;
        self.updated_columns
            .extend(other.updated_columns.iter().cloned());
    }
}

/// The set of tables (and columns) touched by a committed write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    tables: BTreeMap<String, TableChange>,
}

impl ChangeSet {
    /// Creates a new empty change set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an inserted row.
    pub fn record_insert(&mut self, table: &str) {
        self.entry(table).inserted += 1;
    }

    /// Records a deleted row.
    pub fn record_delete(&mut self, table: &str) {
        self.entry(table).deleted += 1;
    }

    /// Records an updated row and the columns whose values changed.
    pub fn record_update<I, S>(&mut self, table: &str, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let change = self.entry(table);
        change.updated += 1;
        change
            .updated_columns
            .extend(columns.into_iter().map(Into::into));
    }

    fn entry(&mut self, table: &str) -> &mut TableChange {
        self.tables.entry(table.to_owned()).or_default()
    }

    /// Merges another change set into this one.
    ///
    /// Used to accumulate several commits into one pending change.
    pub fn merge(&mut self, other: &ChangeSet) {
        for (table, change) in &other.tables {
            self.tables.entry(table.clone()).or_default().merge(change);
        }
    }

    /// Returns the change recorded for a table, if any.
    pub fn table(&self, name: &str) -> Option<&TableChange> {
        self.tables.get(name)
    }

    /// Iterates over touched tables and their changes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableChange)> {
        self.tables.iter().map(|(name, change)| (name.as_str(), change))
    }

    /// Returns the names of the touched tables.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Returns true if the given table was touched.
    #[inline]
    pub fn touches_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Returns true if there are no changes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(TableChange::is_empty)
    }

    /// Returns the number of touched tables.
    #[inline]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Clears all changes.
    pub fn clear(&mut self) {
        self.tables.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_set_new() {
        let cs = ChangeSet::new();
        assert!(cs.is_empty());
        assert_eq!(cs.len(), 0);
    }

    #[test]
    fn test_change_set_record() {
        let mut cs = ChangeSet::new();
        cs.record_insert("users");
        cs.record_insert("users");
        cs.record_delete("posts");
        cs.record_update("users", ["name"]);

        assert_eq!(cs.len(), 2);
        let users = cs.table("users").unwrap();
        assert_eq!(users.inserted, 2);
        assert_eq!(users.updated, 1);
        assert!(users.updated_columns.contains("name"));
        assert!(users.changes_row_set());
        assert!(cs.touches_table("posts"));
        assert!(!cs.touches_table("comments"));
    }

    #[test]
    fn test_change_set_update_only() {
        let mut cs = ChangeSet::new();
        cs.record_update("users", ["email", "name"]);

        let users = cs.table("users").unwrap();
        assert!(!users.changes_row_set());
        assert_eq!(users.updated_columns.len(), 2);
    }

    #[test]
    fn test_change_set_merge() {
        let mut cs1 = ChangeSet::new();
        cs1.record_update("users", ["name"]);

        let mut cs2 = ChangeSet::new();
        cs2.record_update("users", ["email"]);
        cs2.record_insert("posts");

        cs1.merge(&cs2);

        assert_eq!(cs1.len(), 2);
        let users = cs1.table("users").unwrap();
        assert_eq!(users.updated, 2);
        assert_eq!(users.updated_columns.len(), 2);
        assert_eq!(cs1.tables().collect::<Vec<_>>(), vec!["posts", "users"]);
    }

    #[test]
    fn test_change_set_clear() {
        let mut cs = ChangeSet::new();
        cs.record_insert("users");
        assert!(!cs.is_empty());
        cs.clear();
        assert!(cs.is_empty());
    }
}
