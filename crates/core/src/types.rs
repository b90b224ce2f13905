//! Core types for fixguard
//!
//! - [`TestId`] / [`TestCase`]: a test and the metadata declared on it
//! - [`FixtureId`] / [`FixtureSet`]: ordered fixture declarations
//! - [`IsolationMode`]: how a test is cleaned up after
//! - [`Row`] / [`TableSnapshot`] / [`ResidualReport`]: table state around a test

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Test identity
// ============================================================================

/// Identity of a single test: the declaring class (suite) and the method
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestId {
    /// Test class or suite name
    pub class: String,
    /// Test method name
    pub method: String,
}

impl TestId {
    /// Create a new test identity
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.method)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Identifier of a named fixture
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureId(String);

impl FixtureId {
    /// Create a fixture identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FixtureId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FixtureId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Ordered sequence of fixtures declared on a test
///
/// Built once from test metadata and never modified during the test run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureSet {
    ids: Vec<FixtureId>,
}

impl FixtureSet {
    /// Create a set from identifiers, preserving declaration order
    pub fn new<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FixtureId>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// The empty set
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no fixture is declared
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of declared fixtures
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Iterate in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, FixtureId> {
        self.ids.iter()
    }

    /// Declared fixtures as a slice
    pub fn as_slice(&self) -> &[FixtureId] {
        &self.ids
    }
}

impl<'a> IntoIterator for &'a FixtureSet {
    type Item = &'a FixtureId;
    type IntoIter = std::slice::Iter<'a, FixtureId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

// ============================================================================
// Isolation mode
// ============================================================================

/// How a test with fixtures is isolated from the next one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationMode {
    /// Fixtures are applied inside a transaction that is rolled back afterwards
    #[default]
    Transactional,
    /// No transaction; monitored tables are snapshotted and diffed instead
    Disabled,
}

impl IsolationMode {
    /// True for snapshot/diff isolation
    pub fn is_disabled(self) -> bool {
        matches!(self, IsolationMode::Disabled)
    }
}

impl fmt::Display for IsolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationMode::Transactional => f.write_str("transactional"),
            IsolationMode::Disabled => f.write_str("disabled"),
        }
    }
}

impl FromStr for IsolationMode {
    type Err = Error;

    /// Accepts `transactional`/`enabled` and `disabled`, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transactional" | "enabled" => Ok(IsolationMode::Transactional),
            "disabled" => Ok(IsolationMode::Disabled),
            other => Err(Error::Config(format!(
                "Invalid isolation mode '{}'. Expected \"transactional\", \"enabled\" or \"disabled\".",
                other
            ))),
        }
    }
}

// ============================================================================
// Test case metadata
// ============================================================================

/// A test together with the fixture and isolation metadata declared on it
///
/// Metadata may be declared on the class (applies to every method) and on
/// the method itself. Method-level declarations win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    id: TestId,
    class_fixtures: Vec<FixtureId>,
    method_fixtures: Vec<FixtureId>,
    class_isolation: Option<IsolationMode>,
    method_isolation: Option<IsolationMode>,
}

impl TestCase {
    /// Create a test with no metadata
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: TestId::new(class, method),
            class_fixtures: Vec::new(),
            method_fixtures: Vec::new(),
            class_isolation: None,
            method_isolation: None,
        }
    }

    /// Declare a class-level fixture
    pub fn with_class_fixture(mut self, id: impl Into<FixtureId>) -> Self {
        self.class_fixtures.push(id.into());
        self
    }

    /// Declare a method-level fixture
    pub fn with_fixture(mut self, id: impl Into<FixtureId>) -> Self {
        self.method_fixtures.push(id.into());
        self
    }

    /// Declare the class-level isolation mode
    pub fn with_class_isolation(mut self, mode: IsolationMode) -> Self {
        self.class_isolation = Some(mode);
        self
    }

    /// Declare the method-level isolation mode
    pub fn with_isolation(mut self, mode: IsolationMode) -> Self {
        self.method_isolation = Some(mode);
        self
    }

    /// Test identity
    pub fn id(&self) -> &TestId {
        &self.id
    }

    /// Fixtures declared on the class
    pub fn class_fixtures(&self) -> &[FixtureId] {
        &self.class_fixtures
    }

    /// Fixtures declared on the method
    pub fn method_fixtures(&self) -> &[FixtureId] {
        &self.method_fixtures
    }

    /// Isolation declared on the class, if any
    pub fn class_isolation(&self) -> Option<IsolationMode> {
        self.class_isolation
    }

    /// Isolation declared on the method, if any
    pub fn method_isolation(&self) -> Option<IsolationMode> {
        self.method_isolation
    }

    /// Fixtures in effect for this test
    ///
    /// Method fixtures replace class fixtures entirely when present.
    pub fn declared_fixtures(&self) -> FixtureSet {
        if self.method_fixtures.is_empty() {
            FixtureSet::new(self.class_fixtures.iter().cloned())
        } else {
            FixtureSet::new(self.method_fixtures.iter().cloned())
        }
    }
}

// ============================================================================
// Rows and table state
// ============================================================================

/// One record fetched from a table: column name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value, returning the row for chaining
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    /// Set a column value
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    /// Read a column value
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the row has no columns
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Row as a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Row {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::Serialization(format!(
                "row must be a JSON object, got {}",
                other
            ))),
        }
    }
}

/// Rows of a set of tables captured at one point in time
///
/// Tables keep the order they were captured in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSnapshot {
    tables: Vec<(String, Vec<Row>)>,
    captured_at: DateTime<Utc>,
}

impl TableSnapshot {
    /// Create an empty snapshot stamped with the current time
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    /// Record the rows of a table, replacing any earlier capture of it
    pub fn insert(&mut self, table: impl Into<String>, rows: Vec<Row>) {
        let table = table.into();
        match self.tables.iter_mut().find(|(name, _)| *name == table) {
            Some((_, existing)) => *existing = rows,
            None => self.tables.push((table, rows)),
        }
    }

    /// Rows captured for a table
    pub fn get(&self, table: &str) -> Option<&[Row]> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, rows)| rows.as_slice())
    }

    /// Row count captured for a table
    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.get(table).map(<[Row]>::len)
    }

    /// Iterate tables in capture order
    pub fn tables(&self) -> impl Iterator<Item = (&str, &[Row])> {
        self.tables
            .iter()
            .map(|(name, rows)| (name.as_str(), rows.as_slice()))
    }

    /// Number of captured tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when no table was captured
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Capture time
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

impl Default for TableSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Rows left behind by a test, grouped by table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResidualReport {
    tables: Vec<(String, Vec<Row>)>,
}

impl ResidualReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record leaked rows for a table; empty row lists are ignored
    pub fn push(&mut self, table: impl Into<String>, rows: Vec<Row>) {
        if !rows.is_empty() {
            self.tables.push((table.into(), rows));
        }
    }

    /// True when nothing leaked
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Leaked rows for a table
    pub fn leaked(&self, table: &str) -> Option<&[Row]> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, rows)| rows.as_slice())
    }

    /// Names of the affected tables, in check order
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|(name, _)| name.as_str())
    }

    /// Total number of leaked rows across tables
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, rows)| rows.len()).sum()
    }

    /// Report as a JSON object keyed by table name
    ///
    /// Keys keep check order (`serde_json` is built with `preserve_order`).
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (table, rows) in &self.tables {
            map.insert(
                table.clone(),
                Value::Array(rows.iter().map(Row::to_json).collect()),
            );
        }
        Value::Object(map)
    }
}
