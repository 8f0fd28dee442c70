//! Read and write transactions.
//!
//! A `ReadTransaction` evaluates against one immutable snapshot and records
//! every table and column it reads into a `TrackedRegion`. A
//! `WriteTransaction` applies changes to a private working copy of the latest
//! snapshot and records them in a `Journal`; the store publishes the copy on
//! commit or discards it on failure.

use crate::journal::Journal;
use crate::snapshot::{Snapshot, Version};
use crate::table::{Table, TableSchema};
use lookout_core::{Error, Result, Row, RowId, TrackedRegion};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A read transaction anchored at one committed snapshot.
#[derive(Debug)]
pub struct ReadTransaction {
    snapshot: Snapshot,
    region: TrackedRegion,
}

impl ReadTransaction {
    pub(crate) fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            region: TrackedRegion::new(),
        }
    }

    /// Returns the version this transaction reads.
    #[inline]
    pub fn version(&self) -> Version {
        self.snapshot.version()
    }

    /// Returns every row of a table in primary key order.
    pub fn scan(&mut self, table: &str) -> Result<Vec<Row>> {
        let rows = self
            .snapshot
            .table(table)?
            .iter()
            .map(|row| Row::clone(row))
            .collect();
        self.region.insert_table(table);
        Ok(rows)
    }

    /// Returns every row of a table projected to the given columns.
    ///
    /// Only these columns (and the table's row set) are tracked.
    pub fn scan_columns(&mut self, table: &str, columns: &[&str]) -> Result<Vec<Row>> {
        let source = self.snapshot.table(table)?;
        let positions = source.positions(columns)?;
        let rows = source.iter().map(|row| row.project(&positions)).collect();
        self.region.insert_columns(table, columns.iter().copied());
        Ok(rows)
    }

    /// Gets one row by primary key.
    pub fn get(&mut self, table: &str, id: RowId) -> Result<Option<Row>> {
        let row = self
            .snapshot
            .table(table)?
            .get(id)
            .map(|row| Row::clone(row));
        self.region.insert_table(table);
        Ok(row)
    }

    /// Counts the rows of a table. Only the row set is tracked.
    pub fn count(&mut self, table: &str) -> Result<usize> {
        let len = self.snapshot.table(table)?.len();
        self.region.insert_columns(table, std::iter::empty::<&str>());
        Ok(len)
    }

    /// Returns what has been read so far.
    #[inline]
    pub fn region(&self) -> &TrackedRegion {
        &self.region
    }

    /// Consumes the transaction and returns what it read.
    pub fn into_region(self) -> TrackedRegion {
        self.region
    }
}

/// A write transaction over a working copy of the latest snapshot.
#[derive(Debug)]
pub struct WriteTransaction {
    base_version: Version,
    base_table_count: usize,
    tables: BTreeMap<String, Arc<Table>>,
    journal: Journal,
}

impl WriteTransaction {
    pub(crate) fn begin(base: &Snapshot) -> Self {
        Self {
            base_version: base.version(),
            base_table_count: base.tables().len(),
            tables: base.tables().clone(),
            journal: Journal::new(),
        }
    }

    /// Returns the version this transaction started from.
    #[inline]
    pub fn base_version(&self) -> Version {
        self.base_version
    }

    fn table(&self, table: &str) -> Result<&Table> {
        self.tables
            .get(table)
            .map(|t| t.as_ref())
            .ok_or_else(|| Error::table_not_found(table))
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(table)
            .map(Arc::make_mut)
            .ok_or_else(|| Error::table_not_found(table))
    }

    /// Creates a table. Creating an existing table is an error.
    pub fn create_table(&mut self, schema: TableSchema) -> Result<()> {
        if self.tables.contains_key(schema.name()) {
            return Err(Error::invalid_operation(format!(
                "table {} already exists",
                schema.name()
            )));
        }
        self.tables
            .insert(schema.name().to_owned(), Arc::new(Table::new(schema)));
        Ok(())
    }

    /// Inserts a row.
    pub fn insert(&mut self, table: &str, row: Row) -> Result<RowId> {
        let id = row.id();
        self.table_mut(table)?.insert(row.clone())?;
        self.journal.record_insert(table, row);
        Ok(id)
    }

    /// Replaces the row with the same primary key and bumps its version.
    pub fn update(&mut self, table: &str, row: Row) -> Result<()> {
        let store = self.table_mut(table)?;
        let id = row.id();
        let version = store
            .get(id)
            .map(|old| old.version().wrapping_add(1))
            .ok_or_else(|| Error::not_found(table, id))?;
        let new = Row::new_with_version(id, version, row.into_values());
        let old = store.replace(new.clone())?;
        self.journal.record_update(table, Row::clone(&old), new);
        Ok(())
    }

    /// Inserts the row, or updates it if its key already exists.
    pub fn upsert(&mut self, table: &str, row: Row) -> Result<()> {
        if self.table(table)?.get(row.id()).is_some() {
            self.update(table, row)
        } else {
            self.insert(table, row).map(|_| ())
        }
    }

    /// Deletes a row by primary key and returns it.
    pub fn delete(&mut self, table: &str, id: RowId) -> Result<Row> {
        let removed = self.table_mut(table)?.remove(id)?;
        let row = Row::clone(&removed);
        self.journal.record_delete(table, row.clone());
        Ok(row)
    }

    /// Deletes every row of a table and returns how many were removed.
    pub fn delete_all(&mut self, table: &str) -> Result<usize> {
        let ids: Vec<RowId> = self.table(table)?.iter().map(|row| row.id()).collect();
        for id in &ids {
            self.delete(table, *id)?;
        }
        Ok(ids.len())
    }

    /// Reads a row as seen by this transaction, including its own writes.
    pub fn get(&self, table: &str, id: RowId) -> Result<Option<Row>> {
        Ok(self.table(table)?.get(id).map(|row| Row::clone(row)))
    }

    /// Reads every row of a table as seen by this transaction.
    pub fn scan(&self, table: &str) -> Result<Vec<Row>> {
        Ok(self
            .table(table)?
            .iter()
            .map(|row| Row::clone(row))
            .collect())
    }

    /// Returns the journal.
    #[inline]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Returns true if tables were created. Tables are never dropped.
    pub(crate) fn has_schema_changes(&self) -> bool {
        self.tables.len() != self.base_table_count
    }

    pub(crate) fn into_parts(self) -> (BTreeMap<String, Arc<Table>>, Journal) {
        (self.tables, self.journal)
    }
}
