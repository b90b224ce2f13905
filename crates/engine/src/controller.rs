//! Fixture transaction controller
//!
//! Applies and reverts the fixtures declared on a test, isolating them
//! either with a wrapping transaction or, when the test runs with isolation
//! disabled, with a baseline snapshot and a residual-data check.
//!
//! ## Transactional flow
//!
//! ```text
//! before_test          → request transaction start
//! on_transaction_begin → apply fixtures
//! after_test           → request transaction rollback
//! on_transaction_end   → revert fixtures
//! ```
//!
//! ## Disabled flow
//!
//! ```text
//! before_test → capture baseline (once per run), apply fixtures
//! after_test  → revert fixtures, check residual data
//! ```
//!
//! Isolation problems are recorded in the result sink and never returned as
//! errors; the suite keeps running.

use std::sync::Arc;

use tracing::{debug, warn};

use fixguard_core::{
    FixtureRegistry, FixtureSet, IsolationMode, Result, ResultSink, TableReader, TestCase,
    TestId, TestLifecycleObserver, TransactionRequest,
};

use crate::baseline::Baseline;
use crate::config::IsolationConfig;
use crate::isolation::IsolationResolver;
use crate::residual::{self, FetchErrorPolicy};
use crate::state::{FixtureState, Lifecycle};

/// Observer name used in logs and registration
pub const CONTROLLER_NAME: &str = "data-fixture";

/// The test the controller is currently isolating
#[derive(Debug, Clone)]
struct ActiveTest {
    id: TestId,
    mode: IsolationMode,
    fixtures: FixtureSet,
}

impl ActiveTest {
    fn is(&self, test: &TestCase) -> bool {
        self.id == *test.id()
    }
}

/// Applies and reverts fixtures around each test
pub struct FixtureTransactionController {
    registry: Arc<dyn FixtureRegistry>,
    reader: Arc<dyn TableReader>,
    sink: Arc<dyn ResultSink>,
    baseline: Arc<Baseline>,
    resolver: IsolationResolver,
    fetch_policy: FetchErrorPolicy,
    lifecycle: Lifecycle,
    active: Option<ActiveTest>,
}

impl FixtureTransactionController {
    /// Create a controller with its own baseline over the configured tables
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn new(
        config: &IsolationConfig,
        registry: Arc<dyn FixtureRegistry>,
        reader: Arc<dyn TableReader>,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Self> {
        config.validate()?;
        let baseline = Arc::new(Baseline::new(config.monitored_tables.iter().cloned()));
        Ok(Self {
            registry,
            reader,
            sink,
            baseline,
            resolver: IsolationResolver::new(config.default_isolation_mode()?),
            fetch_policy: config.fetch_error_policy(),
            lifecycle: Lifecycle::new(),
            active: None,
        })
    }

    /// Share an existing baseline instead of the controller's own
    pub fn with_baseline(mut self, baseline: Arc<Baseline>) -> Self {
        self.baseline = baseline;
        self
    }

    /// Baseline used for residual checks
    pub fn baseline(&self) -> &Arc<Baseline> {
        &self.baseline
    }

    /// Current lifecycle state
    pub fn state(&self) -> FixtureState {
        self.lifecycle.state()
    }

    fn apply_fixtures(&mut self, fixtures: &FixtureSet) -> Result<()> {
        self.registry.apply(fixtures)?;
        self.lifecycle
            .advance(&[FixtureState::FixturesApplied, FixtureState::TestRunning])
    }

    fn capture_baseline(&self, test: &TestCase) {
        match self.baseline.ensure_captured(self.reader.as_ref()) {
            Ok(snapshot) => {
                debug!(target: "fixguard::fixture", test = %test.id(), tables = snapshot.len(), "Baseline ready");
            }
            Err(e) => self.sink.record_failure(test.id(), e.to_string()),
        }
    }

    fn check_residual_data(&self, test: &TestCase) {
        let Some(baseline) = self.baseline.get() else {
            debug!(target: "fixguard::fixture", test = %test.id(), "No baseline, residual check skipped");
            return;
        };

        let outcome = residual::check(baseline, self.reader.as_ref(), self.fetch_policy);
        for failure in &outcome.fetch_failures {
            self.sink.record_failure(
                test.id(),
                format!("Residual data check could not read table: {}", failure),
            );
        }
        if !outcome.report.is_empty() {
            self.sink
                .record_failure(test.id(), residual::isolation_failure_message(&outcome.report));
        }
    }
}

impl TestLifecycleObserver for FixtureTransactionController {
    fn name(&self) -> &str {
        CONTROLLER_NAME
    }

    fn before_test(&mut self, test: &TestCase, txn: &mut TransactionRequest) -> Result<()> {
        if !self.lifecycle.is_idle() {
            warn!(
                target: "fixguard::fixture",
                state = %self.lifecycle.state(),
                "Previous test did not finish its fixture lifecycle, resetting"
            );
            self.lifecycle.reset();
            self.active = None;
        }

        let fixtures = self.registry.fixtures_for(test);
        if fixtures.is_empty() {
            return Ok(());
        }

        let mode = self.resolver.resolve(test);
        self.lifecycle.transition(FixtureState::FixturesRequested)?;
        self.active = Some(ActiveTest {
            id: test.id().clone(),
            mode,
            fixtures: fixtures.clone(),
        });

        if !mode.is_disabled() {
            // The transaction must exist before the first fixture so all of them roll back.
            debug!(target: "fixguard::fixture", test = %test.id(), fixtures = fixtures.len(), "Requesting transaction start");
            txn.request_start();
            return Ok(());
        }

        self.capture_baseline(test);
        self.lifecycle.transition(FixtureState::SnapshotCaptured)?;
        self.apply_fixtures(&fixtures)
    }

    fn on_transaction_begin(&mut self, test: &TestCase) -> Result<()> {
        let fixtures = match &self.active {
            Some(active) if active.is(test) && !active.mode.is_disabled() => active.fixtures.clone(),
            _ => return Ok(()),
        };
        self.lifecycle.transition(FixtureState::TransactionStarted)?;
        self.apply_fixtures(&fixtures)
    }

    fn after_test(&mut self, test: &TestCase, txn: &mut TransactionRequest) -> Result<()> {
        let mode = match &self.active {
            Some(active) if active.is(test) => active.mode,
            _ => return Ok(()),
        };

        if !mode.is_disabled() {
            // Requested even when fixture application failed, so nothing leaks into the next test.
            debug!(target: "fixguard::fixture", test = %test.id(), "Requesting transaction rollback");
            txn.request_rollback();
            return Ok(());
        }

        self.active = None;
        let reverted = self.registry.revert();
        self.lifecycle.transition(FixtureState::FixturesReverted)?;
        self.check_residual_data(test);
        self.lifecycle
            .advance(&[FixtureState::ResidualChecked, FixtureState::Idle])?;
        reverted.map_err(Into::into)
    }

    fn on_transaction_end(&mut self, test: &TestCase) -> Result<()> {
        match &self.active {
            Some(active) if active.is(test) && !active.mode.is_disabled() => {}
            _ => return Ok(()),
        }

        self.active = None;
        let reverted = self.registry.revert();
        self.lifecycle.advance(&[
            FixtureState::FixturesReverted,
            FixtureState::TransactionRolledBack,
            FixtureState::Idle,
        ])?;
        reverted.map_err(Into::into)
    }
}
