//! Collaborator traits
//!
//! The fixture controller never talks to a database, a fixture loader or a
//! test runner directly. It goes through these seams so that each can be
//! swapped (real connection, in-memory store, recording sink) without
//! touching the isolation logic.

use crate::error::{FetchError, FixtureError, Result};
use crate::types::{FixtureId, FixtureSet, Row, TestCase, TestId};

/// Read access to table contents
///
/// Implementations must return rows in a stable fetch order; residual
/// detection treats trailing rows as the ones a test added.
pub trait TableReader: Send + Sync {
    /// Fetch every row of a table
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotConfigured`] when no database is available,
    /// and other variants for genuine read failures.
    fn fetch_all(&self, table: &str) -> std::result::Result<Vec<Row>, FetchError>;
}

/// The database side of a test transaction
pub trait TransactionBackend: Send + Sync {
    /// Begin the transaction that wraps a test
    fn begin(&self) -> Result<()>;

    /// Roll the test transaction back
    fn rollback(&self) -> Result<()>;
}

/// Source and applier of fixtures
pub trait FixtureRegistry: Send + Sync {
    /// Fixtures in effect for a test, in application order
    fn fixtures_for(&self, test: &TestCase) -> FixtureSet;

    /// Apply fixtures in order
    ///
    /// # Errors
    ///
    /// Stops at the first failing fixture. Fixtures applied before the
    /// failure stay recorded as applied so [`revert`](Self::revert) undoes them.
    fn apply(&self, fixtures: &FixtureSet) -> std::result::Result<(), FixtureError>;

    /// Revert every applied fixture, most recent first
    fn revert(&self) -> std::result::Result<(), FixtureError>;

    /// Fixtures currently applied, in application order
    fn applied(&self) -> Vec<FixtureId>;
}

/// Destination for test failures
pub trait ResultSink: Send + Sync {
    /// Mark a test failed with an assertion-style message
    fn record_failure(&self, test: &TestId, message: String);
}

/// Event parameter through which observers ask for a transaction
///
/// Observers only request; the coordinator performs the begin/rollback once
/// every observer has seen the event and then reports back through
/// [`TestLifecycleObserver::on_transaction_begin`] and
/// [`TestLifecycleObserver::on_transaction_end`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionRequest {
    start: bool,
    rollback: bool,
}

impl TransactionRequest {
    /// Fresh request with nothing asked for
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a transaction to be started before the test body
    pub fn request_start(&mut self) {
        self.start = true;
    }

    /// Ask for the test transaction to be rolled back
    pub fn request_rollback(&mut self) {
        self.rollback = true;
    }

    /// Whether a start was requested
    pub fn start_requested(&self) -> bool {
        self.start
    }

    /// Whether a rollback was requested
    pub fn rollback_requested(&self) -> bool {
        self.rollback
    }
}

/// Hooks a test-run coordinator calls around every test
///
/// All hooks default to doing nothing. Errors are recorded against the
/// running test; they never abort the run.
pub trait TestLifecycleObserver: Send {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Before the test body; may request a transaction start
    fn before_test(&mut self, _test: &TestCase, _txn: &mut TransactionRequest) -> Result<()> {
        Ok(())
    }

    /// After the test body; may request a transaction rollback
    fn after_test(&mut self, _test: &TestCase, _txn: &mut TransactionRequest) -> Result<()> {
        Ok(())
    }

    /// The requested transaction has begun
    fn on_transaction_begin(&mut self, _test: &TestCase) -> Result<()> {
        Ok(())
    }

    /// The test transaction has been rolled back
    fn on_transaction_end(&mut self, _test: &TestCase) -> Result<()> {
        Ok(())
    }
}
