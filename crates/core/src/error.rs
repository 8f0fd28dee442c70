//! Error types for Lookout.

use crate::row::RowId;
use thiserror::Error;

/// Result type alias for Lookout operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for store access and observation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// A tracked computation failed while reading a valid snapshot.
    ///
    /// Terminal for the observation that raised it.
    #[error("Recompute failed: {message}")]
    Recompute { message: String },
    /// The store was closed or dropped.
    #[error("Store is unavailable")]
    StoreUnavailable,
    /// Table not found.
    #[error("Table not found: {name}")]
    TableNotFound { name: String },
    /// Column not found.
    #[error("Column {column} not found in table {table}")]
    ColumnNotFound { table: String, column: String },
    /// Row not found.
    #[error("Row {id} not found in table {table}")]
    NotFound { table: String, id: RowId },
    /// A row with the same primary key already exists.
    #[error("Duplicate key {id} in table {table}")]
    DuplicateKey { table: String, id: RowId },
    /// Invalid operation.
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },
}

impl Error {
    /// Creates a recompute failure.
    pub fn recompute(message: impl Into<String>) -> Self {
        Error::Recompute {
            message: message.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates a column not found error.
    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a row not found error.
    pub fn not_found(table: impl Into<String>, id: RowId) -> Self {
        Error::NotFound {
            table: table.into(),
            id,
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(table: impl Into<String>, id: RowId) -> Self {
        Error::DuplicateKey {
            table: table.into(),
            id,
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true if this error means the store went away.
    #[inline]
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Error::StoreUnavailable)
    }
}
