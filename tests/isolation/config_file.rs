//! Suites configured from `fixguard.toml`.

use fixguard::{IsolationConfig, TestCase, CONFIG_FILE_NAME};
use tempfile::TempDir;

use crate::support::{pass, seeded_database, suite_with};

#[test]
fn test_disabled_by_default_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "monitored_tables = [\"store\"]\ndefault_isolation = \"disabled\"\n",
    )
    .unwrap();

    let config = IsolationConfig::from_file(&path).unwrap();
    let mut s = suite_with(config, seeded_database());
    let test = TestCase::new("StoreTest", "testDefault")
        .with_fixture("store_second")
        .with_fixture("rewrite_pair");

    let outcome = s.run.run(&test, pass).unwrap();

    // Only `store` is monitored, so the url rewrites go unnoticed.
    assert_eq!(outcome.messages().len(), 1);
    assert!(outcome.messages()[0].contains("\"store\""));
    assert!(!outcome.messages()[0].contains("url_rewrite"));
    assert_eq!(s.run.metrics().transactions_started, 0);
    assert_eq!(s.baseline.get().unwrap().len(), 1);
}

#[test]
fn test_default_file_written_and_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    IsolationConfig::write_default_if_missing(&path).unwrap();
    let config = IsolationConfig::from_file(&path).unwrap();
    assert_eq!(config, IsolationConfig::default());
}

#[test]
fn test_invalid_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "default_isolation = 3\n").unwrap();

    let err = IsolationConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, fixguard::Error::Config(_)));
}
