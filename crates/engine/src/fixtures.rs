//! Fixture catalog
//!
//! Named fixtures are registered once, then applied in declaration order
//! and reverted in reverse order around each test. A fixture may carry a
//! rollback companion; fixtures without one are left to the surrounding
//! transaction (or to the residual check when transactions are disabled).
//!
//! ## Usage
//!
//! ```rust,ignore
//! let catalog = FixtureCatalog::new();
//! let db = Arc::clone(&database);
//! catalog.register(
//!     "store_second",
//!     FnFixture::new(move || db.insert("store", second_store()).map(|_| ())),
//! )?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use fixguard_core::{FixtureError, FixtureId, FixtureRegistry, FixtureSet, Result, TestCase};

/// A unit of setup data
pub trait Fixture: Send + Sync {
    /// Load the fixture data
    fn apply(&self) -> Result<()>;

    /// Undo [`apply`](Self::apply); fixtures without a rollback companion do nothing
    fn revert(&self) -> Result<()> {
        Ok(())
    }
}

type FixtureFn = Box<dyn Fn() -> Result<()> + Send + Sync>;

/// Fixture built from closures
pub struct FnFixture {
    apply: FixtureFn,
    revert: Option<FixtureFn>,
}

impl FnFixture {
    /// Fixture with no rollback companion
    pub fn new<F>(apply: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self {
            apply: Box::new(apply),
            revert: None,
        }
    }

    /// Attach a rollback companion
    pub fn with_revert<F>(mut self, revert: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.revert = Some(Box::new(revert));
        self
    }
}

impl Fixture for FnFixture {
    fn apply(&self) -> Result<()> {
        (self.apply)()
    }

    fn revert(&self) -> Result<()> {
        match &self.revert {
            Some(revert) => revert(),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for FnFixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFixture")
            .field("has_revert", &self.revert.is_some())
            .finish()
    }
}

/// Registry of named fixtures plus the list of fixtures applied for the
/// running test
#[derive(Default)]
pub struct FixtureCatalog {
    fixtures: RwLock<HashMap<FixtureId, Arc<dyn Fixture>>>,
    applied: Mutex<Vec<FixtureId>>,
}

impl FixtureCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixture under an identifier
    ///
    /// # Errors
    ///
    /// Returns `FixtureError::Duplicate` if the identifier is taken.
    pub fn register<F>(
        &self,
        id: impl Into<FixtureId>,
        fixture: F,
    ) -> std::result::Result<(), FixtureError>
    where
        F: Fixture + 'static,
    {
        let id = id.into();
        let mut fixtures = self.fixtures.write();
        if fixtures.contains_key(&id) {
            return Err(FixtureError::Duplicate(id));
        }
        debug!(target: "fixguard::fixture", fixture = %id, "Registered fixture");
        fixtures.insert(id, Arc::new(fixture));
        Ok(())
    }

    /// Whether an identifier is registered
    pub fn contains(&self, id: &FixtureId) -> bool {
        self.fixtures.read().contains_key(id)
    }

    /// Number of registered fixtures
    pub fn len(&self) -> usize {
        self.fixtures.read().len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.fixtures.read().is_empty()
    }

    fn lookup(&self, id: &FixtureId) -> std::result::Result<Arc<dyn Fixture>, FixtureError> {
        self.fixtures
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| FixtureError::UnknownFixture(id.clone()))
    }
}

impl FixtureRegistry for FixtureCatalog {
    fn fixtures_for(&self, test: &TestCase) -> FixtureSet {
        test.declared_fixtures()
    }

    fn apply(&self, fixtures: &FixtureSet) -> std::result::Result<(), FixtureError> {
        for id in fixtures {
            let fixture = self.lookup(id)?;
            fixture.apply().map_err(|e| FixtureError::ApplyFailed {
                fixture: id.clone(),
                message: e.to_string(),
            })?;
            debug!(target: "fixguard::fixture", fixture = %id, "Fixture applied");
            self.applied.lock().push(id.clone());
        }
        Ok(())
    }

    fn revert(&self) -> std::result::Result<(), FixtureError> {
        let applied = std::mem::take(&mut *self.applied.lock());
        let mut first_error = None;

        for id in applied.iter().rev() {
            let result = self.lookup(id).and_then(|fixture| {
                fixture.revert().map_err(|e| FixtureError::RevertFailed {
                    fixture: id.clone(),
                    message: e.to_string(),
                })
            });
            match result {
                Ok(()) => debug!(target: "fixguard::fixture", fixture = %id, "Fixture reverted"),
                Err(e) => {
                    warn!(target: "fixguard::fixture", fixture = %id, error = %e, "Fixture revert failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn applied(&self) -> Vec<FixtureId> {
        self.applied.lock().clone()
    }
}
