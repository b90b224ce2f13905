//! Core types and traits for fixguard
//!
//! This crate defines the foundational types used throughout the system:
//! - TestId / TestCase: test identity and its fixture/isolation metadata
//! - FixtureId / FixtureSet: ordered fixture declarations
//! - IsolationMode: transactional rollback vs snapshot/diff cleanup
//! - Row / TableSnapshot / ResidualReport: table state before and after a test
//! - Error: Error type hierarchy
//! - Traits: collaborator seams (TableReader, TransactionBackend,
//!   FixtureRegistry, ResultSink, TestLifecycleObserver)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, FetchError, FixtureError, Result};
pub use traits::{
    FixtureRegistry, ResultSink, TableReader, TestLifecycleObserver, TransactionBackend,
    TransactionRequest,
};
pub use types::{
    FixtureId, FixtureSet, IsolationMode, ResidualReport, Row, TableSnapshot, TestCase, TestId,
};
