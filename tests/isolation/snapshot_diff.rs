//! Tests with isolation disabled: the baseline is captured once and every
//! test is checked for rows it left behind.

use std::sync::Arc;

use fixguard::{
    Baseline, IsolationConfig, IsolationMode, MemoryDatabase, Row, TestCase, TestRunCoordinator,
};
use serde_json::{json, Value};

use crate::support::{
    catalog_for, config, pass, seeded_database, store_row, suite, suite_with, TABLES,
};

fn disabled(method: &str) -> TestCase {
    TestCase::new("IndexerTest", method).with_class_isolation(IsolationMode::Disabled)
}

#[test]
fn test_leaked_store_row_is_reported() {
    let mut s = suite();
    let db = Arc::clone(&s.db);
    let test = disabled("testLeak").with_fixture("store_with_rollback");

    let outcome = s
        .run
        .run(&test, || db.insert("store", store_row(5, "leaked")).map(|_| ()))
        .unwrap();

    assert_eq!(outcome.messages().len(), 1);
    let message = &outcome.messages()[0];
    assert!(message.starts_with("There was a problem with isolation: "));
    assert!(message.contains("\"store\""));
    assert!(message.contains("leaked"));
    assert!(!message.contains("rollback"));
    assert!(!message.contains("url_rewrite"));
    // Reported, never auto-corrected.
    assert_eq!(s.db.row_count("store").unwrap(), 2);
    assert_eq!(s.run.metrics().transactions_started, 0);
}

#[test]
fn test_fixture_without_rollback_leaks_across_tables() {
    let mut s = suite();
    let test = disabled("testFixtures")
        .with_fixture("store_second")
        .with_fixture("rewrite_pair");

    let outcome = s.run.run(&test, pass).unwrap();

    assert_eq!(outcome.messages().len(), 1);
    let message = &outcome.messages()[0];
    assert!(message.contains("\"store\""));
    assert!(message.contains("\"url_rewrite\""));
    assert!(message.contains("\"url_rewrite_id\": 10"));
    assert!(message.contains("\"url_rewrite_id\": 11"));
    assert!(!message.contains("store_website"));
}

#[test]
fn test_clean_test_passes() {
    let mut s = suite();
    let test = disabled("testClean").with_fixture("store_with_rollback");

    assert!(s.run.run(&test, pass).unwrap().is_passed());
    assert_eq!(s.db.row_count("store").unwrap(), 1);
}

#[test]
fn test_baseline_captured_once_per_run() {
    let mut s = suite();
    for method in ["testA", "testB", "testC", "testD"] {
        let test = disabled(method).with_fixture("store_with_rollback");
        assert!(s.run.run(&test, pass).unwrap().is_passed());
    }
    assert_eq!(s.baseline.attempts(), 1);
    assert_eq!(s.baseline.get().unwrap().row_count("store"), Some(1));
}

#[test]
fn test_baseline_not_refreshed_after_leak() {
    let mut s = suite();
    let leaking = disabled("testLeaks").with_fixture("store_second");
    let clean = disabled("testAfterLeak").with_fixture("store_with_rollback");

    assert!(!s.run.run(&leaking, pass).unwrap().is_passed());
    // The leaked row is still there, so the next test is flagged as well.
    let outcome = s.run.run(&clean, pass).unwrap();
    assert!(!outcome.is_passed());
    assert!(outcome.messages()[0].contains("second"));
}

#[test]
fn test_deleted_rows_are_not_reported() {
    let mut s = suite();
    let db = Arc::clone(&s.db);
    let test = disabled("testDelete").with_fixture("store_with_rollback");

    let outcome = s.run.run(&test, || db.truncate("store_website")).unwrap();
    assert!(outcome.is_passed());
}

#[test]
fn test_no_database_configured() {
    let mut s = suite_with(config(), Arc::new(MemoryDatabase::unconfigured()));
    s.catalog
        .register("noop", fixguard::FnFixture::new(|| Ok(())))
        .unwrap();
    let test = disabled("testNoDb").with_fixture("noop");

    let outcome = s.run.run(&test, pass).unwrap();

    // The baseline cannot be captured; that failure is reported once.
    assert_eq!(outcome.messages().len(), 1);
    assert!(outcome.messages()[0].contains("not configured"));
    assert!(!s.baseline.is_captured());
}

#[test]
fn test_residual_fetch_failure_reported() {
    let mut s = suite();
    let db = Arc::clone(&s.db);
    let test = disabled("testLostConnection").with_fixture("store_with_rollback");

    let outcome = s
        .run
        .run(&test, || {
            db.fail_fetches("url_rewrite", "server has gone away");
            Ok::<(), String>(())
        })
        .unwrap();

    assert_eq!(outcome.messages().len(), 1);
    assert!(outcome.messages()[0].contains("server has gone away"));
}

#[test]
fn test_residual_fetch_failure_tolerated() {
    let config = IsolationConfig {
        tolerate_fetch_errors: true,
        ..config()
    };
    let mut s = suite_with(config, seeded_database());
    let db = Arc::clone(&s.db);
    let test = disabled("testLostConnection").with_fixture("store_with_rollback");

    let outcome = s
        .run
        .run(&test, || {
            db.fail_fetches("url_rewrite", "server has gone away");
            db.insert("store", Row::new().with("store_id", 9))
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .unwrap();

    // The unreadable table is skipped; the readable one still reports its leak.
    assert_eq!(outcome.messages().len(), 1);
    assert!(outcome.messages()[0].starts_with("There was a problem with isolation"));
}

#[test]
fn test_mixed_modes_share_one_baseline() {
    let mut s = suite();
    let transactional = TestCase::new("StoreTest", "testTxn").with_fixture("store_second");
    let snapshot = disabled("testSnapshot").with_fixture("store_with_rollback");

    assert!(s.run.run(&transactional, pass).unwrap().is_passed());
    assert!(!s.baseline.is_captured());
    assert!(s.run.run(&snapshot, pass).unwrap().is_passed());
    assert!(s.run.run(&transactional, pass).unwrap().is_passed());
    assert!(s.run.run(&snapshot, pass).unwrap().is_passed());

    assert_eq!(s.baseline.attempts(), 1);
    let metrics = s.run.metrics();
    assert_eq!(metrics.transactions_started, 2);
    assert_eq!(metrics.transactions_rolled_back, 2);
}

#[test]
fn test_leaked_rows_reported_as_json() {
    let mut s = suite();
    let db = Arc::clone(&s.db);
    let leaked = json!({"store_id": 4, "code": "fr", "is_active": true, "sort_order": 0});
    let row = Row::try_from(leaked.clone()).unwrap();
    let test = disabled("testJsonRow").with_fixture("store_with_rollback");

    let outcome = s
        .run
        .run(&test, move || db.insert("store", row).map(|_| ()))
        .unwrap();

    let message = &outcome.messages()[0];
    let body = message
        .strip_prefix("There was a problem with isolation: ")
        .unwrap();
    let parsed: Value = serde_json::from_str(body).unwrap();
    assert_eq!(parsed, json!({ "store": [leaked] }));
}

#[test]
fn test_coordinators_share_one_baseline() {
    let db = seeded_database();
    let baseline = Arc::new(Baseline::new(TABLES.iter().copied()));
    let mut first = TestRunCoordinator::with_shared_baseline(
        &config(),
        catalog_for(&db),
        db.clone(),
        Arc::clone(&baseline),
    )
    .unwrap();
    let mut second = TestRunCoordinator::with_shared_baseline(
        &config(),
        catalog_for(&db),
        db.clone(),
        Arc::clone(&baseline),
    )
    .unwrap();

    let clean = disabled("testShared").with_fixture("store_with_rollback");
    assert!(first.run(&clean, pass).unwrap().is_passed());

    // Written after the capture, so the second coordinator must see it as a leak.
    db.insert("store", store_row(7, "between")).unwrap();
    let outcome = second.run(&clean, pass).unwrap();

    assert_eq!(outcome.messages().len(), 1);
    assert!(outcome.messages()[0].contains("between"));
    assert_eq!(baseline.attempts(), 1);
}
