//! Table storage.
//!
//! A `Table` holds rows keyed by primary key. Tables are shared between
//! snapshots through `Arc` and copied on write by the write transaction.

use lookout_core::{Error, Result, Row, RowId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name and column layout of a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    columns: Vec<String>,
}

impl TableSchema {
    /// Creates a schema from a table name and its column names, in position order.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column names in position order.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the position of a column.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

/// Rows of one table, ordered by primary key.
#[derive(Clone, Debug)]
pub struct Table {
    schema: Arc<TableSchema>,
    rows: BTreeMap<RowId, Arc<Row>>,
}

impl Table {
    /// Creates an empty table.
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema: Arc::new(schema),
            rows: BTreeMap::new(),
        }
    }

    /// Returns the schema.
    #[inline]
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Returns the number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Gets a row by primary key.
    pub fn get(&self, id: RowId) -> Option<&Arc<Row>> {
        self.rows.get(&id)
    }

    /// Iterates rows in primary key order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Row>> {
        self.rows.values()
    }

    /// Resolves column names to positions.
    pub fn positions(&self, columns: &[&str]) -> Result<Vec<usize>> {
        columns
            .iter()
            .map(|column| {
                self.schema
                    .position(column)
                    .ok_or_else(|| Error::column_not_found(self.schema.name(), *column))
            })
            .collect()
    }

    pub(crate) fn check_width(&self, row: &Row) -> Result<()> {
        if row.len() != self.schema.columns.len() {
            return Err(Error::invalid_operation(format!(
                "table {} expects {} values, got {}",
                self.schema.name,
                self.schema.columns.len(),
                row.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn insert(&mut self, row: Row) -> Result<()> {
        self.check_width(&row)?;
        let id = row.id();
        if self.rows.contains_key(&id) {
            return Err(Error::duplicate_key(self.schema.name(), id));
        }
        self.rows.insert(id, Arc::new(row));
        Ok(())
    }

    pub(crate) fn replace(&mut self, row: Row) -> Result<Arc<Row>> {
        self.check_width(&row)?;
        let id = row.id();
        match self.rows.get_mut(&id) {
            Some(slot) => Ok(std::mem::replace(slot, Arc::new(row))),
            None => Err(Error::not_found(self.schema.name(), id)),
        }
    }

    pub(crate) fn remove(&mut self, id: RowId) -> Result<Arc<Row>> {
        self.rows
            .remove(&id)
            .ok_or_else(|| Error::not_found(self.schema.name(), id))
    }
}
