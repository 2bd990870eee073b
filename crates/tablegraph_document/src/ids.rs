// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stable identifiers for tables, columns and rows.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub Uuid);

impl TableId {
    /// Create a new random table ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TableId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Unique identifier for a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub Uuid);

impl RowId {
    /// Create a new random row ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Stable identifier for a column.
///
/// Column ids are short strings so that they can double as pin ids inside
/// edge records and marker formulas. Use [`ColumnId::from_name`] to derive a
/// readable id from a display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId(pub String);

impl ColumnId {
    /// Create a column ID from a raw string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an identifier from a display name.
    ///
    /// Keeps alphanumerics and `_`, maps whitespace and `-` to `_`, drops the
    /// rest. Falls back to a random id when nothing usable remains.
    pub fn from_name(name: &str) -> Self {
        let slug: String = name
            .trim()
            .chars()
            .filter_map(|c| match c {
                c if c.is_alphanumeric() || c == '_' => Some(c),
                c if c.is_whitespace() || c == '-' => Some('_'),
                _ => None,
            })
            .collect();
        if slug.is_empty() {
            Self(format!("col_{}", &Uuid::new_v4().simple().to_string()[..8]))
        } else {
            Self(slug)
        }
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ColumnId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ColumnId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
