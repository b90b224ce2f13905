//! Isolation Integration Tests
//!
//! End-to-end runs through `TestRunCoordinator` against `MemoryDatabase`:
//!
//! 1. **Transactional** - fixtures wrapped in a rolled-back transaction
//! 2. **Snapshot diff** - isolation disabled, baseline + residual check
//! 3. **Config file** - suites configured from `fixguard.toml`
//! 4. **Properties** - leaked row counts and rollback over generated runs
//!
//! ```bash
//! cargo test --test isolation
//! ```

mod support;

mod config_file;
mod properties;
mod snapshot_diff;
