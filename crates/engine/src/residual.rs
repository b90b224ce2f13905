//! Residual-data detection
//!
//! Compares the current contents of each baseline table with the baseline
//! by row count. Rows beyond the baseline count, in fetch order, are the
//! ones reported as leaked.
//!
//! # Known weakness
//!
//! Only growth is detected. A test that replaces or reorders rows without
//! changing the count, or that deletes baseline rows, passes the check.

use tracing::{debug, warn};

use fixguard_core::{FetchError, ResidualReport, Row, TableReader, TableSnapshot};

/// What to do with a table that cannot be read during the check
///
/// A missing database configuration is always skipped, whatever the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchErrorPolicy {
    /// Report genuine read failures against the test
    #[default]
    Report,
    /// Skip tables that cannot be read
    Tolerate,
}

/// Result of one residual check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResidualCheck {
    /// Leaked rows per table
    pub report: ResidualReport,
    /// Read failures that must be reported
    pub fetch_failures: Vec<FetchError>,
    /// Tables that were skipped because they could not be read
    pub skipped: Vec<String>,
}

impl ResidualCheck {
    /// True when nothing leaked and nothing needs reporting
    pub fn is_clean(&self) -> bool {
        self.report.is_empty() && self.fetch_failures.is_empty()
    }
}

/// Rows of `after` beyond the length of `before`
///
/// Empty when `after` is not longer than `before`.
pub fn trailing_rows<'a>(before: &[Row], after: &'a [Row]) -> &'a [Row] {
    if after.len() > before.len() {
        &after[before.len()..]
    } else {
        &[]
    }
}

/// Compare every baseline table with its current contents
pub fn check(
    baseline: &TableSnapshot,
    reader: &dyn TableReader,
    policy: FetchErrorPolicy,
) -> ResidualCheck {
    let mut outcome = ResidualCheck::default();

    for (table, before) in baseline.tables() {
        let after = match reader.fetch_all(table) {
            Ok(rows) => rows,
            Err(e) if e.is_not_configured() => {
                debug!(target: "fixguard::residual", table, "No database configured, skipping");
                outcome.skipped.push(table.to_string());
                continue;
            }
            Err(e) => {
                match policy {
                    FetchErrorPolicy::Report => outcome.fetch_failures.push(e),
                    FetchErrorPolicy::Tolerate => {
                        warn!(target: "fixguard::residual", table, error = %e, "Skipping unreadable table");
                        outcome.skipped.push(table.to_string());
                    }
                }
                continue;
            }
        };

        let leaked = trailing_rows(before, &after);
        if !leaked.is_empty() {
            debug!(
                target: "fixguard::residual",
                table,
                before = before.len(),
                after = after.len(),
                "Residual rows detected"
            );
            outcome.report.push(table, leaked.to_vec());
        }
    }

    outcome
}

/// Failure message for an isolation violation
///
/// Lists every affected table and its leaked rows as pretty-printed JSON.
pub fn isolation_failure_message(report: &ResidualReport) -> String {
    format!("There was a problem with isolation: {:#}", report.to_json())
}
