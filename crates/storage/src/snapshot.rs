//! Immutable committed states.

use crate::table::Table;
use crate::transaction::ReadTransaction;
use lookout_core::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Version number of a committed state. Increases by one per commit.
pub type Version = u64;

/// The committed state of every table at one version.
///
/// Cloning is cheap; tables are shared between snapshots until written.
#[derive(Clone, Debug)]
pub struct Snapshot {
    version: Version,
    tables: Arc<BTreeMap<String, Arc<Table>>>,
}

impl Snapshot {
    pub(crate) fn new(version: Version, tables: BTreeMap<String, Arc<Table>>) -> Self {
        Self {
            version,
            tables: Arc::new(tables),
        }
    }

    /// Returns the version of this snapshot.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns a table by name.
    pub fn table(&self, name: &str) -> Result<&Arc<Table>> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::table_not_found(name))
    }

    /// Returns the names of all tables.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub(crate) fn tables(&self) -> &BTreeMap<String, Arc<Table>> {
        &self.tables
    }

    /// Starts a read transaction anchored at this snapshot.
    pub fn begin_read(&self) -> ReadTransaction {
        ReadTransaction::new(self.clone())
    }
}
