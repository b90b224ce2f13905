//! Property tests over whole runs: leaked row counts and rollback.

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::Value;

use fixguard::{IsolationMode, Row, TestCase};

use crate::support::suite;

fn insert_stores(db: &fixguard::MemoryDatabase, count: usize) -> fixguard::Result<()> {
    for id in 0..count {
        db.insert("store", Row::new().with("store_id", 100 + id as i64))?;
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_disabled_reports_every_appended_row(count in 0usize..12) {
        let mut s = suite();
        let db = Arc::clone(&s.db);
        let test = TestCase::new("GrowthTest", "testAppend")
            .with_isolation(IsolationMode::Disabled)
            .with_fixture("store_with_rollback");

        let outcome = s.run.run(&test, || insert_stores(&db, count)).unwrap();

        if count == 0 {
            prop_assert!(outcome.is_passed());
        } else {
            prop_assert_eq!(outcome.messages().len(), 1);
            let body = outcome.messages()[0]
                .strip_prefix("There was a problem with isolation: ")
                .unwrap();
            let parsed: Value = serde_json::from_str(body).unwrap();
            prop_assert_eq!(parsed["store"].as_array().map(Vec::len), Some(count));
            prop_assert_eq!(parsed["store"][0]["store_id"].as_i64(), Some(100));
        }
    }

    #[test]
    fn prop_transactional_restores_row_count(count in 0usize..12) {
        let mut s = suite();
        let db = Arc::clone(&s.db);
        let test = TestCase::new("GrowthTest", "testRolledBack")
            .with_fixture("store_second")
            .with_fixture("rewrite_pair");

        let outcome = s.run.run(&test, || insert_stores(&db, count)).unwrap();

        prop_assert!(outcome.is_passed());
        prop_assert_eq!(s.db.row_count("store").unwrap(), 1);
        prop_assert_eq!(s.db.row_count("url_rewrite").unwrap(), 0);
        prop_assert!(!s.db.in_transaction());
    }
}
