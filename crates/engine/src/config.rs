//! Isolation configuration via `fixguard.toml`
//!
//! Lists the tables watched for residual data, the isolation mode used when
//! a test declares none, and how residual-check read failures are treated.
//! A missing file or missing keys fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use fixguard_core::{Error, IsolationMode, Result};

use crate::residual::FetchErrorPolicy;

/// Config file name looked up in the suite root.
pub const CONFIG_FILE_NAME: &str = "fixguard.toml";

/// Tables snapshotted before the first non-transactional test.
pub const DEFAULT_MONITORED_TABLES: &[&str] = &[
    "catalog_product_entity",
    "eav_attribute",
    "catalog_category_entity",
    "eav_attribute_set",
    "store",
    "store_website",
    "url_rewrite",
];

/// Isolation configuration loaded from `fixguard.toml`.
///
/// # Example
///
/// ```toml
/// monitored_tables = ["store", "store_website"]
/// default_isolation = "transactional"
/// tolerate_fetch_errors = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationConfig {
    /// Tables compared before and after each non-transactional test.
    #[serde(default = "default_monitored_tables")]
    pub monitored_tables: Vec<String>,
    /// `"transactional"` (alias `"enabled"`) or `"disabled"`.
    #[serde(default = "default_isolation_str")]
    pub default_isolation: String,
    /// Skip tables whose residual-check read fails instead of failing the test.
    #[serde(default)]
    pub tolerate_fetch_errors: bool,
}

fn default_monitored_tables() -> Vec<String> {
    DEFAULT_MONITORED_TABLES
        .iter()
        .map(|table| table.to_string())
        .collect()
}

fn default_isolation_str() -> String {
    "transactional".to_string()
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            monitored_tables: default_monitored_tables(),
            default_isolation: default_isolation_str(),
            tolerate_fetch_errors: false,
        }
    }
}

impl IsolationConfig {
    /// Parse the default isolation string.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for anything other than the accepted values.
    pub fn default_isolation_mode(&self) -> Result<IsolationMode> {
        self.default_isolation.parse()
    }

    /// Residual-check policy for table read failures.
    pub fn fetch_error_policy(&self) -> FetchErrorPolicy {
        if self.tolerate_fetch_errors {
            FetchErrorPolicy::Tolerate
        } else {
            FetchErrorPolicy::Report
        }
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// Rejects an unknown isolation mode, blank table names and duplicates.
    pub fn validate(&self) -> Result<()> {
        self.default_isolation_mode()?;
        let mut seen = HashSet::new();
        for table in &self.monitored_tables {
            if table.trim().is_empty() {
                return Err(Error::Config(
                    "monitored_tables must not contain blank table names".to_string(),
                ));
            }
            if !seen.insert(table.as_str()) {
                return Err(Error::Config(format!(
                    "monitored table '{}' is listed more than once",
                    table
                )));
            }
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# fixguard isolation configuration
#
# Tables snapshotted before the first test that runs with isolation disabled.
# After each such test, rows appended to these tables are reported as leaked.
monitored_tables = [
    "catalog_product_entity",
    "eav_attribute",
    "catalog_category_entity",
    "eav_attribute_set",
    "store",
    "store_website",
    "url_rewrite",
]

# Isolation for tests that do not declare one: "transactional" or "disabled"
default_isolation = "transactional"

# When true, a table that cannot be read during the residual check is skipped.
# When false (default), the read failure fails the test.
# Missing database configuration is always skipped.
tolerate_fetch_errors = false
"#
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: IsolationConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(message) => {
                Error::Config(format!("{} ({})", message, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
