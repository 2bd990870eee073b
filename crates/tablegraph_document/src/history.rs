// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history using serialized document snapshots.
//!
//! Each applied batch stores the affected tables before and after the change,
//! serialized with bincode.

use crate::ids::TableId;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Maximum undo history depth
const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// State of a set of tables at one point in time.
///
/// A table id mapped to `None` did not exist at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Serialized `Vec<(TableId, Option<Table>)>`
    pub data: Vec<u8>,
    /// Size in bytes
    pub size: usize,
}

impl StateSnapshot {
    /// Capture the given tables
    pub fn capture(tables: &[(TableId, Option<Table>)]) -> Result<Self> {
        let data = bincode::serialize(tables)?;
        let size = data.len();
        Ok(Self { data, size })
    }

    /// Restore the captured tables
    pub fn restore(&self) -> Result<Vec<(TableId, Option<Table>)>> {
        Ok(bincode::deserialize(&self.data)?)
    }
}

/// One undoable step
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Human-readable description
    pub description: String,
    /// Affected tables before the batch
    pub before: StateSnapshot,
    /// Affected tables after the batch
    pub after: StateSnapshot,
    /// Seconds since the epoch
    pub timestamp: u64,
}

impl HistoryEntry {
    /// Create a new entry
    pub fn new(description: impl Into<String>, before: StateSnapshot, after: StateSnapshot) -> Self {
        Self {
            description: description.into(),
            before,
            after,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    /// Get memory size of this entry
    pub fn memory_size(&self) -> usize {
        self.before.size + self.after.size
    }
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    max_depth: usize,
    memory_used: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth,
            memory_used: 0,
        }
    }

    /// Record an applied step
    pub fn commit(&mut self, entry: HistoryEntry) {
        self.redo_stack.clear();

        self.memory_used += entry.memory_size();
        self.undo_stack.push_back(entry);

        while self.undo_stack.len() > self.max_depth {
            if let Some(old) = self.undo_stack.pop_front() {
                self.memory_used = self.memory_used.saturating_sub(old.memory_size());
            }
        }
    }

    /// Pop the last step for undoing
    pub fn undo(&mut self) -> Result<HistoryEntry> {
        let entry = self
            .undo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToUndo)?;

        self.memory_used = self.memory_used.saturating_sub(entry.memory_size());
        self.redo_stack.push_back(entry.clone());

        Ok(entry)
    }

    /// Pop the last undone step for redoing
    pub fn redo(&mut self) -> Result<HistoryEntry> {
        let entry = self
            .redo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToRedo)?;

        self.memory_used += entry.memory_size();
        self.undo_stack.push_back(entry.clone());

        Ok(entry)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Total bytes held by the undo stack
    pub fn memory_used(&self) -> usize {
        self.memory_used
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.memory_used = 0;
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description.as_str())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> HistoryEntry {
        let snapshot = StateSnapshot::capture(&[]).unwrap();
        HistoryEntry::new(name, snapshot.clone(), snapshot)
    }

    #[test]
    fn test_depth_limit() {
        let mut history = History::with_max_depth(2);
        history.commit(entry("a"));
        history.commit(entry("b"));
        history.commit(entry("c"));

        assert_eq!(history.undo_depth(), 2);
        assert_eq!(history.undo_description(), Some("c"));
    }

    #[test]
    fn test_commit_clears_redo() {
        let mut history = History::new();
        history.commit(entry("a"));
        history.undo().unwrap();
        assert!(history.can_redo());

        history.commit(entry("b"));
        assert!(!history.can_redo());
        assert!(matches!(history.redo(), Err(HistoryError::NothingToRedo)));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let table = Table::new("Nodes");
        let id = table.id;
        let snapshot = StateSnapshot::capture(&[(id, Some(table.clone())), (TableId::new(), None)]).unwrap();
        let restored = snapshot.restore().unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].1.as_ref(), Some(&table));
        assert!(restored[1].1.is_none());
    }
}
