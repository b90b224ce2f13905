//! ClonedTables: point-in-time copy of every table
//!
//! Used to implement test transactions: `begin` clones the table map,
//! `rollback` puts the clone back. Expensive for large data sets but the
//! fixture data a test touches is small.

use std::collections::BTreeMap;

use fixguard_core::Row;

/// Deep copy of the table map taken at transaction begin
#[derive(Debug, Clone)]
pub struct ClonedTables {
    /// Write counter value when the copy was taken
    version: u64,
    /// Cloned table contents
    data: BTreeMap<String, Vec<Row>>,
}

impl ClonedTables {
    /// Wrap a cloned table map
    pub fn new(version: u64, data: BTreeMap<String, Vec<Row>>) -> Self {
        Self { version, data }
    }

    /// Write counter value at capture time
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of tables in the copy
    pub fn table_count(&self) -> usize {
        self.data.len()
    }

    /// Consume the copy, returning the table map
    pub fn into_tables(self) -> BTreeMap<String, Vec<Row>> {
        self.data
    }
}
