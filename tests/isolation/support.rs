//! Shared helpers: a small catalog-shaped database and its fixtures.

#![allow(dead_code)]

use std::sync::Arc;

use fixguard::{
    Baseline, FixtureCatalog, FnFixture, IsolationConfig, MemoryDatabase, Row, TestRunCoordinator,
};

/// Tables created in every test database.
pub const TABLES: &[&str] = &["store", "store_website", "url_rewrite"];

pub struct Suite {
    pub db: Arc<MemoryDatabase>,
    pub catalog: Arc<FixtureCatalog>,
    pub run: TestRunCoordinator,
    pub baseline: Arc<Baseline>,
}

pub fn config() -> IsolationConfig {
    IsolationConfig {
        monitored_tables: TABLES.iter().map(|t| t.to_string()).collect(),
        ..IsolationConfig::default()
    }
}

pub fn store_row(id: i64, code: &str) -> Row {
    Row::new().with("store_id", id).with("code", code)
}

/// Database seeded with the admin store and one website.
pub fn seeded_database() -> Arc<MemoryDatabase> {
    let db = Arc::new(MemoryDatabase::with_tables(TABLES.iter().copied()));
    db.insert("store", store_row(0, "admin")).unwrap();
    db.insert("store_website", Row::new().with("website_id", 1).with("code", "base"))
        .unwrap();
    db
}

/// Registers:
/// - `store_second`: inserts a store, no rollback companion
/// - `store_with_rollback`: inserts a store and deletes it on revert
/// - `rewrite_pair`: inserts two url rewrites, no rollback companion
/// - `broken`: always fails
pub fn catalog_for(db: &Arc<MemoryDatabase>) -> Arc<FixtureCatalog> {
    let catalog = Arc::new(FixtureCatalog::new());

    let fixture_db = Arc::clone(db);
    catalog
        .register(
            "store_second",
            FnFixture::new(move || fixture_db.insert("store", store_row(1, "second")).map(|_| ())),
        )
        .unwrap();

    let fixture_db = Arc::clone(db);
    let revert_db = Arc::clone(db);
    catalog
        .register(
            "store_with_rollback",
            FnFixture::new(move || {
                fixture_db
                    .insert("store", store_row(2, "rollback"))
                    .map(|_| ())
            })
            .with_revert(move || {
                revert_db
                    .delete_where("store", |row| {
                        row.get("code").and_then(|v| v.as_str()) == Some("rollback")
                    })
                    .map(|_| ())
            }),
        )
        .unwrap();

    let fixture_db = Arc::clone(db);
    catalog
        .register(
            "rewrite_pair",
            FnFixture::new(move || {
                fixture_db.insert("url_rewrite", Row::new().with("url_rewrite_id", 10))?;
                fixture_db.insert("url_rewrite", Row::new().with("url_rewrite_id", 11))?;
                Ok(())
            }),
        )
        .unwrap();

    catalog
        .register(
            "broken",
            FnFixture::new(|| Err(fixguard::Error::Transaction("duplicate entry".into()))),
        )
        .unwrap();

    catalog
}

pub fn suite_with(config: IsolationConfig, db: Arc<MemoryDatabase>) -> Suite {
    let catalog = catalog_for(&db);
    let (run, baseline) =
        TestRunCoordinator::with_fixture_isolation(&config, catalog.clone(), db.clone()).unwrap();
    Suite {
        db,
        catalog,
        run,
        baseline,
    }
}

pub fn suite() -> Suite {
    suite_with(config(), seeded_database())
}

/// Test body that passes.
pub fn pass() -> Result<(), String> {
    Ok(())
}
