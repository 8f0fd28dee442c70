//! Journal for tracking changes within a write transaction.
//!
//! The journal folds the operations of one transaction into a net per-table
//! diff, then turns it into the `ChangeSet` published with the commit.

use crate::table::Table;
use lookout_core::{ChangeSet, Row, RowId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Net changes to a single table within one transaction.
#[derive(Clone, Debug, Default)]
pub struct TableDiff {
    /// Added rows (row_id → row).
    added: BTreeMap<RowId, Row>,
    /// Modified rows (row_id → (old, new)).
    modified: BTreeMap<RowId, (Row, Row)>,
    /// Deleted rows (row_id → row).
    deleted: BTreeMap<RowId, Row>,
}

impl TableDiff {
    /// Creates a new table diff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an addition.
    pub fn add(&mut self, row: Row) {
        let row_id = row.id();
        // Re-inserting a deleted key is a modification of the original row
        if let Some(old_row) = self.deleted.remove(&row_id) {
            self.modified.insert(row_id, (old_row, row));
        } else {
            self.added.insert(row_id, row);
        }
    }

    /// Records a modification.
    pub fn modify(&mut self, old: Row, new: Row) {
        let row_id = old.id();
        if self.added.contains_key(&row_id) {
            self.added.insert(row_id, new);
        } else if let Some((original_old, _)) = self.modified.remove(&row_id) {
            self.modified.insert(row_id, (original_old, new));
        } else {
            self.modified.insert(row_id, (old, new));
        }
    }

    /// Records a deletion.
    pub fn delete(&mut self, row: Row) {
        let row_id = row.id();
        if self.added.remove(&row_id).is_some() {
            return;
        }
        if let Some((old_row, _)) = self.modified.remove(&row_id) {
            self.deleted.insert(row_id, old_row);
        } else {
            self.deleted.insert(row_id, row);
        }
    }

    /// Returns added rows.
    pub fn added(&self) -> &BTreeMap<RowId, Row> {
        &self.added
    }

    /// Returns modified rows.
    pub fn modified(&self) -> &BTreeMap<RowId, (Row, Row)> {
        &self.modified
    }

    /// Returns deleted rows.
    pub fn deleted(&self) -> &BTreeMap<RowId, Row> {
        &self.deleted
    }

    /// Returns true if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Journal for tracking changes within a transaction.
#[derive(Debug, Default)]
pub struct Journal {
    /// Table diffs (table name → diff).
    table_diffs: BTreeMap<String, TableDiff>,
    /// Number of recorded operations.
    operations: usize,
}

impl Journal {
    /// Creates a new empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an insert operation.
    pub fn record_insert(&mut self, table: &str, row: Row) {
        self.diff_mut(table).add(row);
        self.operations += 1;
    }

    /// Records an update operation.
    pub fn record_update(&mut self, table: &str, old: Row, new: Row) {
        self.diff_mut(table).modify(old, new);
        self.operations += 1;
    }

    /// Records a delete operation.
    pub fn record_delete(&mut self, table: &str, row: Row) {
        self.diff_mut(table).delete(row);
        self.operations += 1;
    }

    fn diff_mut(&mut self, table: &str) -> &mut TableDiff {
        self.table_diffs.entry(table.to_owned()).or_default()
    }

    /// Returns the table diff for a table.
    pub fn table_diff(&self, table: &str) -> Option<&TableDiff> {
        self.table_diffs.get(table)
    }

    /// Returns the number of recorded operations.
    pub fn operations(&self) -> usize {
        self.operations
    }

    /// Returns true if the net effect of the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.table_diffs.values().all(TableDiff::is_empty)
    }

    /// Builds the change set of this journal.
    ///
    /// Updates report the names of the columns whose values differ between
    /// the original and the final row.
    pub fn to_change_set(&self, tables: &BTreeMap<String, Arc<Table>>) -> ChangeSet {
        let mut changes = ChangeSet::new();
        for (name, diff) in &self.table_diffs {
            for _ in diff.added.values() {
                changes.record_insert(name);
            }
            for _ in diff.deleted.values() {
                changes.record_delete(name);
            }
            let columns = tables.get(name).map(|t| t.schema().columns());
            for (old, new) in diff.modified.values() {
                let changed = changed_positions(old, new).filter_map(|position| {
                    columns.and_then(|c| c.get(position)).cloned()
                });
                changes.record_update(name, changed);
            }
        }
        changes
    }
}

fn changed_positions<'a>(old: &'a Row, new: &'a Row) -> impl Iterator<Item = usize> + 'a {
    let width = old.len().max(new.len());
    (0..width).filter(move |&i| old.get(i) != new.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableSchema;
    use lookout_core::Value;

    fn row(id: u64, name: &str, score: i64) -> Row {
        Row::new(id, vec![Value::Int64(id as i64), Value::from(name), Value::Int64(score)])
    }

    fn tables() -> BTreeMap<String, Arc<Table>> {
        let schema = TableSchema::new("players", ["id", "name", "score"]);
        let mut tables = BTreeMap::new();
        tables.insert("players".to_owned(), Arc::new(Table::new(schema)));
        tables
    }

    #[test]
    fn test_table_diff_add_delete() {
        let mut diff = TableDiff::new();

        let r = row(1, "a", 1);
        diff.add(r.clone());
        assert_eq!(diff.added().len(), 1);

        diff.delete(r);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_table_diff_modify_keeps_original() {
        let mut diff = TableDiff::new();
        diff.modify(row(1, "a", 1), row(1, "a", 2));
        diff.modify(row(1, "a", 2), row(1, "a", 3));

        let (old, new) = diff.modified().get(&1).unwrap();
        assert_eq!(old.get(2), Some(&Value::Int64(1)));
        assert_eq!(new.get(2), Some(&Value::Int64(3)));
    }

    #[test]
    fn test_table_diff_delete_then_add_is_modify() {
        let mut diff = TableDiff::new();
        diff.delete(row(1, "a", 1));
        diff.add(row(1, "b", 1));

        assert!(diff.deleted().is_empty());
        assert!(diff.added().is_empty());
        assert_eq!(diff.modified().len(), 1);
    }

    #[test]
    fn test_journal_change_set_columns() {
        let mut journal = Journal::new();
        journal.record_insert("players", row(1, "a", 10));
        journal.record_update("players", row(2, "b", 20), row(2, "b", 25));
        journal.record_delete("players", row(3, "c", 30));

        let changes = journal.to_change_set(&tables());
        let players = changes.table("players").unwrap();
        assert_eq!(players.inserted, 1);
        assert_eq!(players.deleted, 1);
        assert_eq!(players.updated, 1);
        assert_eq!(
            players.updated_columns.iter().collect::<Vec<_>>(),
            vec!["score"]
        );
        assert_eq!(journal.operations(), 3);
    }

    #[test]
    fn test_journal_net_empty() {
        let mut journal = Journal::new();
        journal.record_insert("players", row(1, "a", 10));
        journal.record_delete("players", row(1, "a", 10));

        assert!(journal.is_empty());
        assert!(journal.to_change_set(&tables()).is_empty());
    }
}
