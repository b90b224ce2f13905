//! Fixture isolation engine for fixguard
//!
//! This crate orchestrates the isolation of fixture data between tests:
//! - FixtureTransactionController: applies/reverts fixtures around a test
//! - Baseline: process-wide snapshot of the monitored tables
//! - Residual detection: row-count diff against the baseline
//! - FixtureCatalog: registry of named fixtures with rollback companions
//! - TestRunCoordinator: drives lifecycle observers and the test transaction
//! - IsolationConfig: `fixguard.toml` configuration
//!
//! The engine never owns a database. Table reads and transactions go
//! through the traits in `fixguard_core`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod baseline;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod fixtures;
pub mod isolation;
pub mod residual;
pub mod sink;
pub mod state;

pub use baseline::Baseline;
pub use config::{IsolationConfig, CONFIG_FILE_NAME, DEFAULT_MONITORED_TABLES};
pub use controller::{FixtureTransactionController, CONTROLLER_NAME};
pub use coordinator::{RunMetrics, TestOutcome, TestRunCoordinator};
pub use fixtures::{Fixture, FixtureCatalog, FnFixture};
pub use isolation::IsolationResolver;
pub use residual::{check, isolation_failure_message, trailing_rows, FetchErrorPolicy, ResidualCheck};
pub use sink::RecordingSink;
pub use state::{FixtureState, Lifecycle};
