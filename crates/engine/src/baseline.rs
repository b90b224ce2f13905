//! Process-wide baseline of the monitored tables
//!
//! The baseline is captured lazily, the first time a test runs with
//! isolation disabled, and is never refreshed during the run. Every later
//! residual check compares against this single capture.
//!
//! Initialization is guarded by a `OnceCell`: a successful capture is
//! stored exactly once. A failed capture stores nothing, so the next test
//! that needs the baseline tries again.

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use fixguard_core::{FetchError, TableReader, TableSnapshot};

/// Lazily captured snapshot of the monitored tables
#[derive(Debug)]
pub struct Baseline {
    /// Tables captured, in capture order
    tables: Vec<String>,
    /// Set once by the first successful capture
    snapshot: OnceCell<TableSnapshot>,
    /// Number of capture attempts, successful or not
    attempts: AtomicU64,
}

impl Baseline {
    /// Create an uncaptured baseline over the given tables
    pub fn new<I, T>(tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
            snapshot: OnceCell::new(),
            attempts: AtomicU64::new(0),
        }
    }

    /// Monitored tables
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// The captured snapshot, if any
    pub fn get(&self) -> Option<&TableSnapshot> {
        self.snapshot.get()
    }

    /// Whether the baseline has been captured
    pub fn is_captured(&self) -> bool {
        self.snapshot.get().is_some()
    }

    /// Number of capture attempts so far
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Return the baseline, capturing it first if needed
    ///
    /// # Errors
    ///
    /// Returns the first table read failure. Nothing is cached in that case.
    pub fn ensure_captured(&self, reader: &dyn TableReader) -> Result<&TableSnapshot, FetchError> {
        self.snapshot.get_or_try_init(|| self.capture(reader))
    }

    fn capture(&self, reader: &dyn TableReader) -> Result<TableSnapshot, FetchError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let mut snapshot = TableSnapshot::new();
        for table in &self.tables {
            let rows = reader.fetch_all(table)?;
            debug!(target: "fixguard::baseline", table = %table, rows = rows.len(), "Captured table");
            snapshot.insert(table.clone(), rows);
        }
        info!(
            target: "fixguard::baseline",
            tables = snapshot.len(),
            "Baseline captured"
        );
        Ok(snapshot)
    }
}
