// SPDX-License-Identifier: MIT OR Apache-2.0
//! Settings persisted as a JSON file next to the document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tablegraph_document::SettingsStore;
use thiserror::Error;

/// Current settings file format
const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    version: u32,
    values: BTreeMap<String, String>,
}

/// Key-value settings backed by a JSON file
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: BTreeMap<String, String>,
    dirty: bool,
}

impl FileSettings {
    /// Load settings from `path`. A missing or unreadable file yields empty
    /// settings.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match Self::read(&path) {
            Ok(values) => values,
            Err(SettingsError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                BTreeMap::new()
            }
            Err(err) => {
                tracing::warn!("Ignoring settings file {:?}: {}", path, err);
                BTreeMap::new()
            }
        };
        Self {
            path,
            values,
            dirty: false,
        }
    }

    fn read(path: &Path) -> Result<BTreeMap<String, String>, SettingsError> {
        let source = std::fs::read_to_string(path)?;
        let file: SettingsFile = serde_json::from_str(&source)?;
        Ok(file.values)
    }

    /// Settings file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether values changed since the last save
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the file if anything changed
    pub fn save(&mut self) -> Result<(), SettingsError> {
        if !self.dirty {
            return Ok(());
        }
        let file = SettingsFile {
            version: SETTINGS_FORMAT_VERSION,
            values: self.values.clone(),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        self.dirty = false;
        tracing::debug!("Saved settings {:?}", self.path);
        Ok(())
    }
}

impl SettingsStore for FileSettings {
    fn get_setting(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_setting(&mut self, key: &str, value: String) {
        if self.values.get(key) != Some(&value) {
            self.values.insert(key.to_string(), value);
            self.dirty = true;
        }
    }
}
