//! In-memory result sink

use parking_lot::Mutex;
use tracing::warn;

use fixguard_core::{ResultSink, TestId};

/// Keeps every recorded failure in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    failures: Mutex<Vec<(TestId, String)>>,
}

impl RecordingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All failures recorded so far
    pub fn failures(&self) -> Vec<(TestId, String)> {
        self.failures.lock().clone()
    }

    /// Messages recorded against one test
    pub fn failures_for(&self, test: &TestId) -> Vec<String> {
        self.failures
            .lock()
            .iter()
            .filter(|(id, _)| id == test)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Number of recorded failures
    pub fn failure_count(&self) -> usize {
        self.failures.lock().len()
    }

    /// Forget every recorded failure
    pub fn clear(&self) {
        self.failures.lock().clear();
    }
}

impl ResultSink for RecordingSink {
    fn record_failure(&self, test: &TestId, message: String) {
        warn!(target: "fixguard::result", test = %test, "{}", message);
        self.failures.lock().push((test.clone(), message));
    }
}
