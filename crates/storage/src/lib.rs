//! Storage layer for fixguard
//!
//! This crate implements an in-memory table store that plays the role of
//! the database during isolation runs:
//! - MemoryDatabase: named tables of ordered rows behind a RwLock
//! - Test transactions via cloned table snapshots (begin/rollback/commit)
//! - Fault injection for fetch failures and an "unconfigured" mode
//!
//! It implements both [`TableReader`](fixguard_core::TableReader) and
//! [`TransactionBackend`](fixguard_core::TransactionBackend).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod snapshot;

pub use memory::MemoryDatabase;
pub use snapshot::ClonedTables;
