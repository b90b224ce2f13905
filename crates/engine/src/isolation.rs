//! Isolation mode resolution
//!
//! A method annotation wins over the class annotation, which wins over the
//! configured default. Class-level outcomes are cached for the whole run.

use std::collections::HashMap;

use fixguard_core::{IsolationMode, TestCase};

/// Resolves the isolation mode of each test
#[derive(Debug, Clone)]
pub struct IsolationResolver {
    default: IsolationMode,
    by_class: HashMap<String, IsolationMode>,
}

impl IsolationResolver {
    /// Resolver falling back to `default`
    pub fn new(default: IsolationMode) -> Self {
        Self {
            default,
            by_class: HashMap::new(),
        }
    }

    /// Isolation mode in effect for `test`
    pub fn resolve(&mut self, test: &TestCase) -> IsolationMode {
        if let Some(mode) = test.method_isolation() {
            return mode;
        }
        let default = self.default;
        *self
            .by_class
            .entry(test.id().class.clone())
            .or_insert_with(|| test.class_isolation().unwrap_or(default))
    }

    /// Number of classes with a cached resolution
    pub fn cached_classes(&self) -> usize {
        self.by_class.len()
    }
}
