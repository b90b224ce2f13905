//! Per-test fixture lifecycle
//!
//! ```text
//! Idle → FixturesRequested → (TransactionStarted | SnapshotCaptured)
//!      → FixturesApplied → TestRunning → FixturesReverted
//!      → (TransactionRolledBack | ResidualChecked) → Idle
//! ```
//!
//! When fixture application fails the test goes straight from
//! `TransactionStarted`/`SnapshotCaptured` to `FixturesReverted`, so that
//! whatever was applied before the failure is still cleaned up.

use std::fmt;

use fixguard_core::{Error, Result};

/// Lifecycle state of the test currently under isolation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FixtureState {
    /// No test under isolation
    #[default]
    Idle,
    /// The test declares fixtures; isolation is being set up
    FixturesRequested,
    /// The wrapping transaction has begun
    TransactionStarted,
    /// The baseline exists (or its capture failure was recorded)
    SnapshotCaptured,
    /// Every declared fixture was applied
    FixturesApplied,
    /// The test body runs
    TestRunning,
    /// Applied fixtures were reverted
    FixturesReverted,
    /// The wrapping transaction was rolled back
    TransactionRolledBack,
    /// Residual data was checked
    ResidualChecked,
}

impl FixtureState {
    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: FixtureState) -> bool {
        use FixtureState::*;
        matches!(
            (self, next),
            (Idle, FixturesRequested)
                | (FixturesRequested, TransactionStarted)
                | (FixturesRequested, SnapshotCaptured)
                | (TransactionStarted, FixturesApplied)
                | (SnapshotCaptured, FixturesApplied)
                | (FixturesApplied, TestRunning)
                | (TestRunning, FixturesReverted)
                | (TransactionStarted, FixturesReverted)
                | (SnapshotCaptured, FixturesReverted)
                | (FixturesReverted, TransactionRolledBack)
                | (FixturesReverted, ResidualChecked)
                | (TransactionRolledBack, Idle)
                | (ResidualChecked, Idle)
        )
    }
}

impl fmt::Display for FixtureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks the lifecycle state and rejects illegal transitions
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    state: FixtureState,
}

impl Lifecycle {
    /// Start in `Idle`
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> FixtureState {
        self.state
    }

    /// True in `Idle`
    pub fn is_idle(&self) -> bool {
        self.state == FixtureState::Idle
    }

    /// Move to `next`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` when the transition is not allowed; the
    /// state is left unchanged.
    pub fn transition(&mut self, next: FixtureState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::InvalidState {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Apply a chain of transitions, stopping at the first illegal one
    pub fn advance(&mut self, path: &[FixtureState]) -> Result<()> {
        path.iter().try_for_each(|next| self.transition(*next))
    }

    /// Force the state back to `Idle`
    pub fn reset(&mut self) {
        self.state = FixtureState::Idle;
    }
}
