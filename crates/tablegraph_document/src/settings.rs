// SPDX-License-Identifier: MIT OR Apache-2.0
//! Project-level key-value settings.
//!
//! Editor views persist opaque blobs (usually JSON) through this interface,
//! keyed by `namespace:tableId:viewId`.

use crate::ids::TableId;
use std::collections::BTreeMap;

/// Key-value store for per-project plugin settings
pub trait SettingsStore {
    /// Get a stored value
    fn get_setting(&self, key: &str) -> Option<String>;

    /// Store a value, replacing any previous one
    fn set_setting(&mut self, key: &str, value: String);
}

/// Build a settings key for a view of a table
pub fn settings_key(namespace: &str, table: TableId, view: &str) -> String {
    format!("{namespace}:{table}:{view}")
}

/// Settings held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: BTreeMap<String, String>,
}

impl MemorySettings {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from existing values
    pub fn from_values(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// All stored values
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

impl SettingsStore for MemorySettings {
    fn get_setting(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_setting(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}
