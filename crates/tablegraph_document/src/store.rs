// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read and write interfaces of the document store.

use crate::command::CommandBatch;
use crate::history::HistoryError;
use crate::ids::{ColumnId, RowId, TableId};
use crate::table::{Column, Row, Table};

/// Error type for document operations
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Table not found
    #[error("Table not found: {0}")]
    TableNotFound(TableId),

    /// Row not found
    #[error("Row not found: {0}")]
    RowNotFound(RowId),

    /// Column not found
    #[error("Column not found: {0}")]
    ColumnNotFound(ColumnId),

    /// Id already in use
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// History error
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// Document file could not be read or written
    #[error("Document format error: {0}")]
    Format(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to tables.
///
/// Lookups return `None` for ids that no longer exist; callers treat that as
/// "render nothing" rather than as a failure.
pub trait DocumentStore {
    /// Get a table by id
    fn table(&self, id: TableId) -> Option<&Table>;

    /// Iterate over all tables
    fn tables(&self) -> Box<dyn Iterator<Item = &Table> + '_>;

    /// Tables whose parent is `parent`
    fn child_tables(&self, parent: TableId) -> Vec<&Table> {
        self.tables().filter(|t| t.parent == Some(parent)).collect()
    }

    /// Get a row of a table
    fn row(&self, table: TableId, row: RowId) -> Option<&Row> {
        self.table(table)?.row(row)
    }

    /// Get a column of a table
    fn column(&self, table: TableId, column: &ColumnId) -> Option<&Column> {
        self.table(table)?.column(column)
    }

    /// Resolve the table a relation column points into
    fn relation_target(&self, table: TableId, column: &ColumnId) -> Option<&Table> {
        let target = self.column(table, column)?.relation_target()?;
        self.table(target)
    }
}

/// Write access: applies command batches atomically and keeps undo history
pub trait CommandExecutor {
    /// Apply all commands of `batch` or none of them
    fn execute(&mut self, batch: CommandBatch) -> Result<(), DocumentError>;

    /// Undo the last batch, returning its description
    fn undo(&mut self) -> Result<String, DocumentError>;

    /// Redo the last undone batch, returning its description
    fn redo(&mut self) -> Result<String, DocumentError>;
}
