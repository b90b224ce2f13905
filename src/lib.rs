//! fixguard - fixture isolation for integration test suites
//!
//! Wraps every test that declares fixtures either in a database transaction
//! that is rolled back afterwards, or, when a test runs with isolation
//! disabled, in a baseline snapshot and a residual-data check that fails the
//! test if it left rows behind.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use fixguard::{FixtureCatalog, FnFixture, IsolationConfig, MemoryDatabase, TestCase, TestRunCoordinator};
//!
//! let db = Arc::new(MemoryDatabase::with_tables(["store"]));
//! let catalog = Arc::new(FixtureCatalog::new());
//! let fixture_db = Arc::clone(&db);
//! catalog.register("store_second", FnFixture::new(move || {
//!     fixture_db.insert("store", second_store()).map(|_| ())
//! }))?;
//!
//! let (mut run, _baseline) =
//!     TestRunCoordinator::with_fixture_isolation(&IsolationConfig::default(), catalog, db)?;
//! let outcome = run.run(&TestCase::new("StoreTest", "testSwitch").with_fixture("store_second"), || {
//!     Ok::<(), String>(())
//! })?;
//! assert!(outcome.is_passed());
//! ```

pub use fixguard_core::*;
pub use fixguard_engine::*;
pub use fixguard_storage::{ClonedTables, MemoryDatabase};
