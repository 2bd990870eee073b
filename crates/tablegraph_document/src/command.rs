// SPDX-License-Identifier: MIT OR Apache-2.0
//! Document mutation commands.
//!
//! Commands are grouped into a [`CommandBatch`]; executors apply a batch
//! atomically and record it as a single undo step.

use crate::ids::{ColumnId, RowId, TableId};
use crate::table::{Column, Row, Table};
use crate::value::CellValue;
use serde::{Deserialize, Serialize};

/// A single document mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocCommand {
    /// Add a table
    AddTable(Table),
    /// Remove a table
    RemoveTable(TableId),
    /// Add a column, appended when `index` is `None`
    AddColumn {
        /// Target table
        table: TableId,
        /// Column definition
        column: Column,
        /// Insert position
        index: Option<usize>,
    },
    /// Remove a column and its cells
    RemoveColumn {
        /// Target table
        table: TableId,
        /// Column to remove
        column: ColumnId,
    },
    /// Add a row, appended when `index` is `None`
    AddRow {
        /// Target table
        table: TableId,
        /// Row to insert
        row: Row,
        /// Insert position
        index: Option<usize>,
    },
    /// Remove a row
    RemoveRow {
        /// Target table
        table: TableId,
        /// Row to remove
        row: RowId,
    },
    /// Set a cell value, keeping any formula
    SetCell {
        /// Target table
        table: TableId,
        /// Target row
        row: RowId,
        /// Target column
        column: ColumnId,
        /// New value
        value: CellValue,
    },
    /// Set or clear a cell's formula expression
    SetFormula {
        /// Target table
        table: TableId,
        /// Target row
        row: RowId,
        /// Target column
        column: ColumnId,
        /// New expression, `None` clears the formula
        expression: Option<String>,
    },
}

impl DocCommand {
    /// Table affected by this command
    pub fn table(&self) -> TableId {
        match self {
            Self::AddTable(table) => table.id,
            Self::RemoveTable(table)
            | Self::AddColumn { table, .. }
            | Self::RemoveColumn { table, .. }
            | Self::AddRow { table, .. }
            | Self::RemoveRow { table, .. }
            | Self::SetCell { table, .. }
            | Self::SetFormula { table, .. } => *table,
        }
    }
}

/// An ordered group of commands applied as one atomic, undoable step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandBatch {
    /// Human-readable description (shown in undo menus)
    pub description: String,
    /// Commands in application order
    pub commands: Vec<DocCommand>,
}

impl CommandBatch {
    /// Create an empty batch
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            commands: Vec::new(),
        }
    }

    /// Append a command
    pub fn push(&mut self, command: DocCommand) {
        self.commands.push(command);
    }

    /// Append a command (builder form)
    pub fn with(mut self, command: DocCommand) -> Self {
        self.push(command);
        self
    }

    /// Append all commands of another batch
    pub fn extend(&mut self, other: CommandBatch) {
        self.commands.extend(other.commands);
    }

    /// Whether the batch holds no commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Iterate over the commands
    pub fn iter(&self) -> impl Iterator<Item = &DocCommand> {
        self.commands.iter()
    }
}
