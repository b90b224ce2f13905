//! MemoryDatabase: in-memory table store with test transactions
//!
//! - `BTreeMap<String, Vec<Row>>` for tables; rows keep insertion order
//! - `parking_lot::RwLock` for thread-safe access
//! - `AtomicU64` write counter, useful to assert that nothing was written
//! - Single, non-nested test transaction backed by [`ClonedTables`]
//!
//! A database created with [`MemoryDatabase::unconfigured`] behaves like a
//! suite with no connection configured: every read answers
//! [`FetchError::NotConfigured`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use fixguard_core::{Error, FetchError, Result, Row, TableReader, TransactionBackend};

use crate::snapshot::ClonedTables;

/// In-memory database of named tables
#[derive(Debug)]
pub struct MemoryDatabase {
    /// Table contents in fetch order
    tables: RwLock<BTreeMap<String, Vec<Row>>>,
    /// Copy taken by `begin`, restored by `rollback`
    active: Mutex<Option<ClonedTables>>,
    /// Injected fetch failures: table -> message
    faults: RwLock<HashMap<String, String>>,
    /// False when the database stands in for a missing connection
    configured: bool,
    /// Incremented on every mutation
    version: AtomicU64,
}

impl MemoryDatabase {
    /// Create an empty, configured database
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Create a database that reports no configured connection
    pub fn unconfigured() -> Self {
        Self::build(false)
    }

    fn build(configured: bool) -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
            active: Mutex::new(None),
            faults: RwLock::new(HashMap::new()),
            configured,
            version: AtomicU64::new(0),
        }
    }

    /// Create a database with the given empty tables
    pub fn with_tables<I, T>(tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let db = Self::new();
        {
            let mut guard = db.tables.write();
            for table in tables {
                guard.entry(table.into()).or_default();
            }
        }
        db
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.configured {
            Ok(())
        } else {
            Err(FetchError::NotConfigured.into())
        }
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Whether this database has a connection
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Number of mutations performed so far
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Create a table if it does not exist
    pub fn create_table(&self, table: &str) -> Result<()> {
        self.ensure_configured()?;
        let mut tables = self.tables.write();
        if !tables.contains_key(table) {
            tables.insert(table.to_string(), Vec::new());
            self.bump();
        }
        Ok(())
    }

    /// Append a row to a table, returning the new row count
    pub fn insert(&self, table: &str, row: Row) -> Result<usize> {
        self.ensure_configured()?;
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| FetchError::TableNotFound(table.to_string()))?;
        rows.push(row);
        self.bump();
        Ok(rows.len())
    }

    /// Remove every row matching the predicate, returning how many were removed
    pub fn delete_where<F>(&self, table: &str, predicate: F) -> Result<usize>
    where
        F: Fn(&Row) -> bool,
    {
        self.ensure_configured()?;
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| FetchError::TableNotFound(table.to_string()))?;
        let before = rows.len();
        rows.retain(|row| !predicate(row));
        let removed = before - rows.len();
        if removed > 0 {
            self.bump();
        }
        Ok(removed)
    }

    /// Remove every row of a table
    pub fn truncate(&self, table: &str) -> Result<()> {
        self.delete_where(table, |_| true).map(|_| ())
    }

    /// Current row count of a table
    pub fn row_count(&self, table: &str) -> Result<usize> {
        self.ensure_configured()?;
        self.tables
            .read()
            .get(table)
            .map(Vec::len)
            .ok_or_else(|| FetchError::TableNotFound(table.to_string()).into())
    }

    /// Make every fetch of `table` fail with a backend error
    pub fn fail_fetches(&self, table: &str, message: impl Into<String>) {
        self.faults.write().insert(table.to_string(), message.into());
    }

    /// Remove all injected fetch failures
    pub fn clear_faults(&self) {
        self.faults.write().clear();
    }

    /// Whether a test transaction is open
    pub fn in_transaction(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Keep the writes of the open transaction
    pub fn commit(&self) -> Result<()> {
        match self.active.lock().take() {
            Some(_) => {
                debug!(target: "fixguard::storage", "Transaction committed");
                Ok(())
            }
            None => Err(Error::Transaction("no active transaction to commit".into())),
        }
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl TableReader for MemoryDatabase {
    fn fetch_all(&self, table: &str) -> std::result::Result<Vec<Row>, FetchError> {
        if !self.configured {
            return Err(FetchError::NotConfigured);
        }
        if let Some(message) = self.faults.read().get(table) {
            return Err(FetchError::Backend {
                table: table.to_string(),
                message: message.clone(),
            });
        }
        self.tables
            .read()
            .get(table)
            .cloned()
            .ok_or_else(|| FetchError::TableNotFound(table.to_string()))
    }
}

impl TransactionBackend for MemoryDatabase {
    fn begin(&self) -> Result<()> {
        if !self.configured {
            return Err(Error::Transaction(
                "cannot begin transaction: database connection is not configured".into(),
            ));
        }
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(Error::Transaction(
                "nested transactions are not supported".into(),
            ));
        }
        let copy = ClonedTables::new(self.version(), self.tables.read().clone());
        debug!(
            target: "fixguard::storage",
            version = copy.version(),
            tables = copy.table_count(),
            "Transaction started"
        );
        *active = Some(copy);
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let copy = self
            .active
            .lock()
            .take()
            .ok_or_else(|| Error::Transaction("no active transaction to roll back".into()))?;
        let version = copy.version();
        *self.tables.write() = copy.into_tables();
        self.bump();
        debug!(target: "fixguard::storage", version, "Transaction rolled back");
        Ok(())
    }
}
