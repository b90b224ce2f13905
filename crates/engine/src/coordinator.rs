//! Test-run coordinator
//!
//! Drives registered lifecycle observers around each test and performs the
//! transaction begin/rollback they request:
//!
//! ```text
//! 1. before_test (registration order)        - observers may request a start
//! 2. backend.begin() + on_transaction_begin  - only if a start was requested
//! 3. test body                               - skipped if setup failed
//! 4. after_test (reverse registration order) - observers may request a rollback
//! 5. backend.rollback() + on_transaction_end - if requested or a transaction is open
//! ```
//!
//! Tests run one at a time. Observer and body errors, panics included, are
//! recorded against the test in the result sink and steps 4 and 5 still run.
//! Backend errors are returned to the caller.
//!
//! The coordinator also tracks run metrics (tests run and failed,
//! transactions started and rolled back).

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use fixguard_core::{
    FixtureRegistry, Result, ResultSink, TableReader, TestCase, TestLifecycleObserver,
    TransactionBackend, TransactionRequest,
};

use crate::baseline::Baseline;
use crate::config::IsolationConfig;
use crate::controller::FixtureTransactionController;
use crate::sink::RecordingSink;

/// Outcome of one test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    /// Nothing was recorded against the test
    Passed,
    /// Failures recorded during this run of the test, in order
    Failed {
        /// Failure messages
        messages: Vec<String>,
    },
}

impl TestOutcome {
    /// True for `Passed`
    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }

    /// Failure messages; empty for `Passed`
    pub fn messages(&self) -> &[String] {
        match self {
            TestOutcome::Passed => &[],
            TestOutcome::Failed { messages } => messages,
        }
    }
}

/// Runs tests with their lifecycle observers
pub struct TestRunCoordinator {
    backend: Arc<dyn TransactionBackend>,
    sink: Arc<RecordingSink>,
    observers: Vec<Box<dyn TestLifecycleObserver>>,
    /// Whether the backend transaction for the current test is open
    transaction_open: bool,
    tests_run: AtomicU64,
    tests_failed: AtomicU64,
    transactions_started: AtomicU64,
    transactions_rolled_back: AtomicU64,
}

impl TestRunCoordinator {
    /// Create a coordinator with no observers
    pub fn new(backend: Arc<dyn TransactionBackend>, sink: Arc<RecordingSink>) -> Self {
        Self {
            backend,
            sink,
            observers: Vec::new(),
            transaction_open: false,
            tests_run: AtomicU64::new(0),
            tests_failed: AtomicU64::new(0),
            transactions_started: AtomicU64::new(0),
            transactions_rolled_back: AtomicU64::new(0),
        }
    }

    /// Coordinator with a fixture controller registered over `database`
    ///
    /// Returns the coordinator and the controller's baseline. The baseline
    /// belongs to this coordinator only; use
    /// [`with_shared_baseline`](Self::with_shared_baseline) when several
    /// coordinators in one process must compare against the same capture.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn with_fixture_isolation<D>(
        config: &IsolationConfig,
        registry: Arc<dyn FixtureRegistry>,
        database: Arc<D>,
    ) -> Result<(Self, Arc<Baseline>)>
    where
        D: TableReader + TransactionBackend + 'static,
    {
        let baseline = Arc::new(Baseline::new(config.monitored_tables.iter().cloned()));
        let coordinator =
            Self::with_shared_baseline(config, registry, database, Arc::clone(&baseline))?;
        Ok((coordinator, baseline))
    }

    /// Coordinator with a fixture controller comparing against `baseline`
    ///
    /// The baseline's own table list is what gets captured and checked.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn with_shared_baseline<D>(
        config: &IsolationConfig,
        registry: Arc<dyn FixtureRegistry>,
        database: Arc<D>,
        baseline: Arc<Baseline>,
    ) -> Result<Self>
    where
        D: TableReader + TransactionBackend + 'static,
    {
        let sink = Arc::new(RecordingSink::new());
        let controller = FixtureTransactionController::new(
            config,
            registry,
            database.clone(),
            sink.clone(),
        )?
        .with_baseline(baseline);

        let mut coordinator = Self::new(database, sink);
        coordinator.register(Box::new(controller));
        Ok(coordinator)
    }

    /// Register an observer
    ///
    /// Observers are called in registration order before the test and in
    /// reverse order after it. Returns false if an observer with the same
    /// name is already registered.
    pub fn register(&mut self, observer: Box<dyn TestLifecycleObserver>) -> bool {
        if self.observers.iter().any(|o| o.name() == observer.name()) {
            return false;
        }
        info!(target: "fixguard::run", observer = observer.name(), "Registered lifecycle observer");
        self.observers.push(observer);
        true
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Sink holding every recorded failure
    pub fn sink(&self) -> &Arc<RecordingSink> {
        &self.sink
    }

    /// Run one test
    ///
    /// # Errors
    ///
    /// Only transaction backend failures are returned. Everything else is
    /// recorded against the test and reflected in the outcome.
    pub fn run<F, E>(&mut self, test: &TestCase, body: F) -> Result<TestOutcome>
    where
        F: FnOnce() -> std::result::Result<(), E>,
        E: fmt::Display,
    {
        let id = test.id();
        let recorded_before = self.sink.failures_for(id).len();
        debug!(target: "fixguard::run", test = %id, "Test started");

        let mut request = TransactionRequest::new();
        let mut setup_ok = true;
        for observer in self.observers.iter_mut() {
            if let Err(message) = guarded(|| observer.before_test(test, &mut request)) {
                Self::record(&self.sink, test, observer.name(), message);
                setup_ok = false;
            }
        }

        if request.start_requested() {
            self.backend.begin()?;
            self.transaction_open = true;
            self.transactions_started.fetch_add(1, Ordering::Relaxed);
            debug!(target: "fixguard::run", test = %id, "Transaction started");
            for observer in self.observers.iter_mut() {
                if let Err(message) = guarded(|| observer.on_transaction_begin(test)) {
                    Self::record(&self.sink, test, observer.name(), message);
                    setup_ok = false;
                }
            }
        }

        if setup_ok {
            if let Err(message) = guarded(body) {
                self.sink.record_failure(id, message);
            }
        } else {
            debug!(target: "fixguard::run", test = %id, "Setup failed, test body skipped");
        }

        // Teardown runs whatever happened above, panics included.
        let mut request = TransactionRequest::new();
        for observer in self.observers.iter_mut().rev() {
            if let Err(message) = guarded(|| observer.after_test(test, &mut request)) {
                Self::record(&self.sink, test, observer.name(), message);
            }
        }

        if request.rollback_requested() || self.transaction_open {
            if !request.rollback_requested() {
                warn!(target: "fixguard::run", test = %id, "Transaction left open by observers, rolling back");
            }
            self.backend.rollback()?;
            self.transaction_open = false;
            self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
            debug!(target: "fixguard::run", test = %id, "Transaction rolled back");
            for observer in self.observers.iter_mut().rev() {
                if let Err(message) = guarded(|| observer.on_transaction_end(test)) {
                    Self::record(&self.sink, test, observer.name(), message);
                }
            }
        }

        self.tests_run.fetch_add(1, Ordering::Relaxed);
        let messages: Vec<String> = self
            .sink
            .failures_for(id)
            .into_iter()
            .skip(recorded_before)
            .collect();

        if messages.is_empty() {
            debug!(target: "fixguard::run", test = %id, "Test passed");
            Ok(TestOutcome::Passed)
        } else {
            self.tests_failed.fetch_add(1, Ordering::Relaxed);
            debug!(target: "fixguard::run", test = %id, failures = messages.len(), "Test failed");
            Ok(TestOutcome::Failed { messages })
        }
    }

    fn record(sink: &RecordingSink, test: &TestCase, observer: &str, message: String) {
        debug!(target: "fixguard::run", test = %test.id(), observer, "Observer hook failed");
        sink.record_failure(test.id(), message);
    }

    /// Get run metrics
    pub fn metrics(&self) -> RunMetrics {
        RunMetrics {
            tests_run: self.tests_run.load(Ordering::Relaxed),
            tests_failed: self.tests_failed.load(Ordering::Relaxed),
            transactions_started: self.transactions_started.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
        }
    }

    /// Log the run summary and return the final metrics
    pub fn finish(&self) -> RunMetrics {
        let metrics = self.metrics();
        info!(
            target: "fixguard::run",
            tests_run = metrics.tests_run,
            tests_failed = metrics.tests_failed,
            transactions_started = metrics.transactions_started,
            transactions_rolled_back = metrics.transactions_rolled_back,
            "Test run finished"
        );
        metrics
    }
}

/// Run `f`, turning both an error and a panic into a failure message
///
/// A failed assertion in a test body unwinds; catching it here keeps the
/// teardown steps of `TestRunCoordinator::run` reachable.
fn guarded<F, E>(f: F) -> std::result::Result<(), String>
where
    F: FnOnce() -> std::result::Result<(), E>,
    E: fmt::Display,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(target: "fixguard::run", panic = message, "Test hook panicked");
            Err(format!("Panicked: {}", message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("(non-string panic)")
}

/// Run metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMetrics {
    /// Tests executed
    pub tests_run: u64,
    /// Tests with at least one recorded failure
    pub tests_failed: u64,
    /// Backend transactions begun
    pub transactions_started: u64,
    /// Backend transactions rolled back
    pub transactions_rolled_back: u64,
}

impl RunMetrics {
    /// Tests without recorded failures
    pub fn tests_passed(&self) -> u64 {
        self.tests_run - self.tests_failed
    }
}
