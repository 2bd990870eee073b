// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reference in-memory document.
//!
//! Batches are applied to a working copy of the affected tables and only
//! swapped in once every command succeeded, so a failing batch leaves the
//! document untouched.

use crate::command::{CommandBatch, DocCommand};
use crate::history::{History, HistoryEntry, StateSnapshot};
use crate::ids::TableId;
use crate::store::{CommandExecutor, DocumentError, DocumentStore};
use crate::table::Table;
use crate::value::Formula;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current document file format version
pub const DOCUMENT_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct DocumentFile {
    version: u32,
    tables: Vec<Table>,
}

/// In-memory document with undo/redo
#[derive(Debug, Default)]
pub struct Document {
    tables: IndexMap<TableId, Table>,
    history: History,
    dirty: bool,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table directly, bypassing history (for loading and setup)
    pub fn insert_table(&mut self, table: Table) -> TableId {
        let id = table.id;
        self.tables.insert(id, table);
        id
    }

    /// Get the undo history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Whether the document changed since it was loaded or saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Serialize to RON
    pub fn to_ron(&self) -> Result<String, DocumentError> {
        let file = DocumentFile {
            version: DOCUMENT_FORMAT_VERSION,
            tables: self.tables.values().cloned().collect(),
        };
        ron::ser::to_string_pretty(&file, ron::ser::PrettyConfig::default())
            .map_err(|e| DocumentError::Format(e.to_string()))
    }

    /// Deserialize from RON
    pub fn from_ron(source: &str) -> Result<Self, DocumentError> {
        let file: DocumentFile =
            ron::from_str(source).map_err(|e| DocumentError::Format(e.to_string()))?;
        if file.version > DOCUMENT_FORMAT_VERSION {
            return Err(DocumentError::Format(format!(
                "Unsupported document version {}",
                file.version
            )));
        }
        let mut document = Self::new();
        for table in file.tables {
            document.insert_table(table);
        }
        Ok(document)
    }

    /// Load a document file
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let source = std::fs::read_to_string(path)?;
        let document = Self::from_ron(&source)?;
        tracing::info!("Loaded document {:?} ({} tables)", path, document.tables.len());
        Ok(document)
    }

    /// Save the document to a file
    pub fn save(&mut self, path: &Path) -> Result<(), DocumentError> {
        std::fs::write(path, self.to_ron()?)?;
        self.dirty = false;
        tracing::info!("Saved document {:?}", path);
        Ok(())
    }

    fn affected_tables(batch: &CommandBatch) -> Vec<TableId> {
        let mut ids: Vec<TableId> = Vec::new();
        for command in batch.iter() {
            let id = command.table();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    fn capture(&self, ids: &[TableId]) -> Vec<(TableId, Option<Table>)> {
        ids.iter()
            .map(|id| (*id, self.tables.get(id).cloned()))
            .collect()
    }

    fn restore(&mut self, tables: Vec<(TableId, Option<Table>)>) {
        for (id, table) in tables {
            match table {
                Some(table) => {
                    self.tables.insert(id, table);
                }
                None => {
                    self.tables.shift_remove(&id);
                }
            }
        }
        self.dirty = true;
    }
}

fn table_mut(
    working: &mut IndexMap<TableId, Option<Table>>,
    id: TableId,
) -> Result<&mut Table, DocumentError> {
    working
        .get_mut(&id)
        .and_then(Option::as_mut)
        .ok_or(DocumentError::TableNotFound(id))
}

/// Apply one command to a working set of tables
fn apply(
    working: &mut IndexMap<TableId, Option<Table>>,
    command: DocCommand,
) -> Result<(), DocumentError> {
    match command {
        DocCommand::AddTable(table) => {
            let slot = working.entry(table.id).or_insert(None);
            if slot.is_some() {
                return Err(DocumentError::DuplicateId(table.id.to_string()));
            }
            *slot = Some(table);
        }
        DocCommand::RemoveTable(id) => {
            let slot = working.get_mut(&id).ok_or(DocumentError::TableNotFound(id))?;
            if slot.take().is_none() {
                return Err(DocumentError::TableNotFound(id));
            }
        }
        DocCommand::AddColumn { table, column, index } => {
            let table = table_mut(working, table)?;
            if table.column(&column.id).is_some() {
                return Err(DocumentError::DuplicateId(column.id.to_string()));
            }
            let index = index.unwrap_or(table.columns.len()).min(table.columns.len());
            table.columns.insert(index, column);
        }
        DocCommand::RemoveColumn { table, column } => {
            let table = table_mut(working, table)?;
            let index = table
                .column_index(&column)
                .ok_or_else(|| DocumentError::ColumnNotFound(column.clone()))?;
            table.columns.remove(index);
            for row in &mut table.rows {
                row.cells.shift_remove(&column);
            }
        }
        DocCommand::AddRow { table, row, index } => {
            let table = table_mut(working, table)?;
            if table.row(row.id).is_some() {
                return Err(DocumentError::DuplicateId(row.id.to_string()));
            }
            let index = index.unwrap_or(table.rows.len()).min(table.rows.len());
            table.rows.insert(index, row);
        }
        DocCommand::RemoveRow { table, row } => {
            let table = table_mut(working, table)?;
            let index = table.row_index(row).ok_or(DocumentError::RowNotFound(row))?;
            table.rows.remove(index);
        }
        DocCommand::SetCell {
            table,
            row,
            column,
            value,
        } => {
            let table = table_mut(working, table)?;
            if table.column(&column).is_none() {
                return Err(DocumentError::ColumnNotFound(column));
            }
            let row = table.row_mut(row).ok_or(DocumentError::RowNotFound(row))?;
            row.set_value(column, value);
        }
        DocCommand::SetFormula {
            table,
            row,
            column,
            expression,
        } => {
            let table = table_mut(working, table)?;
            if table.column(&column).is_none() {
                return Err(DocumentError::ColumnNotFound(column));
            }
            let row = table.row_mut(row).ok_or(DocumentError::RowNotFound(row))?;
            match expression {
                Some(expression) => {
                    row.cells.entry(column).or_default().formula = Some(Formula::new(expression));
                }
                None => {
                    if let Some(cell) = row.cells.get_mut(&column) {
                        cell.formula = None;
                    }
                }
            }
        }
    }
    Ok(())
}

impl DocumentStore for Document {
    fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(&id)
    }

    fn tables(&self) -> Box<dyn Iterator<Item = &Table> + '_> {
        Box::new(self.tables.values())
    }
}

impl CommandExecutor for Document {
    fn execute(&mut self, batch: CommandBatch) -> Result<(), DocumentError> {
        if batch.is_empty() {
            return Ok(());
        }

        let ids = Self::affected_tables(&batch);
        let before = self.capture(&ids);
        let mut working: IndexMap<TableId, Option<Table>> = before.iter().cloned().collect();

        let description = batch.description.clone();
        for command in batch.commands {
            if let Err(err) = apply(&mut working, command) {
                tracing::warn!("Rejected batch '{}': {}", description, err);
                return Err(err);
            }
        }

        let after: Vec<(TableId, Option<Table>)> = working.into_iter().collect();
        let entry = HistoryEntry::new(
            description.clone(),
            StateSnapshot::capture(&before)?,
            StateSnapshot::capture(&after)?,
        );
        self.restore(after);
        self.history.commit(entry);

        tracing::debug!("Applied batch '{}'", description);
        Ok(())
    }

    fn undo(&mut self) -> Result<String, DocumentError> {
        let entry = self.history.undo()?;
        self.restore(entry.before.restore()?);
        Ok(entry.description)
    }

    fn redo(&mut self) -> Result<String, DocumentError> {
        let entry = self.history.redo()?;
        self.restore(entry.after.restore()?);
        Ok(entry.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ColumnId, RowId};
    use crate::table::{Column, Row};
    use crate::value::{CellValue, ColumnKind};

    fn document_with_table() -> (Document, TableId) {
        let mut doc = Document::new();
        let table = Table::new("Nodes").with_column(Column::new("Value", "Value", ColumnKind::Number));
        let id = doc.insert_table(table);
        (doc, id)
    }

    #[test]
    fn test_batch_is_atomic() {
        let (mut doc, table) = document_with_table();
        let row = Row::new();
        let row_id = row.id;

        let batch = CommandBatch::new("Broken")
            .with(DocCommand::AddRow { table, row, index: None })
            .with(DocCommand::RemoveRow { table, row: RowId::new() });

        assert!(doc.execute(batch).is_err());
        assert!(doc.row(table, row_id).is_none());
        assert!(!doc.history().can_undo());
    }

    #[test]
    fn test_undo_redo() {
        let (mut doc, table) = document_with_table();
        let row = Row::new();
        let row_id = row.id;
        doc.execute(CommandBatch::new("Add").with(DocCommand::AddRow { table, row, index: None }))
            .unwrap();
        doc.execute(CommandBatch::new("Set").with(DocCommand::SetCell {
            table,
            row: row_id,
            column: ColumnId::from("Value"),
            value: CellValue::Number(4.0),
        }))
        .unwrap();

        assert_eq!(doc.undo().unwrap(), "Set");
        assert!(doc.row(table, row_id).unwrap().value(&"Value".into()).is_empty());
        assert_eq!(doc.undo().unwrap(), "Add");
        assert!(doc.row(table, row_id).is_none());
        assert_eq!(doc.redo().unwrap(), "Add");
        assert!(doc.row(table, row_id).is_some());
    }

    #[test]
    fn test_add_table_undo_removes_it() {
        let mut doc = Document::new();
        let table = Table::new("Edges");
        let id = table.id;
        doc.execute(CommandBatch::new("Add table").with(DocCommand::AddTable(table)))
            .unwrap();
        assert!(doc.table(id).is_some());

        doc.undo().unwrap();
        assert!(doc.table(id).is_none());
    }

    #[test]
    fn test_set_formula_and_clear() {
        let (mut doc, table) = document_with_table();
        let row = Row::new();
        let row_id = row.id;
        doc.execute(CommandBatch::new("Add").with(DocCommand::AddRow { table, row, index: None }))
            .unwrap();
        let set = |expression: Option<&str>| {
            CommandBatch::new("Formula").with(DocCommand::SetFormula {
                table,
                row: row_id,
                column: ColumnId::from("Value"),
                expression: expression.map(str::to_string),
            })
        };

        doc.execute(set(Some("1 + 1"))).unwrap();
        let cell = doc.row(table, row_id).unwrap().cell(&"Value".into()).cloned().unwrap();
        assert_eq!(cell.expression(), Some("1 + 1"));

        doc.execute(set(None)).unwrap();
        let cell = doc.row(table, row_id).unwrap().cell(&"Value".into()).cloned().unwrap();
        assert_eq!(cell.expression(), None);
    }

    #[test]
    fn test_ron_roundtrip() {
        let (mut doc, table) = document_with_table();
        doc.execute(CommandBatch::new("Add").with(DocCommand::AddRow {
            table,
            row: Row::new().with_value("Value", CellValue::Number(2.0)),
            index: None,
        }))
        .unwrap();

        let loaded = Document::from_ron(&doc.to_ron().unwrap()).unwrap();
        assert_eq!(loaded.table(table), doc.table(table));
    }

    #[test]
    fn test_remove_column_drops_cells() {
        let (mut doc, table) = document_with_table();
        let row = Row::new().with_value("Value", CellValue::Number(1.0));
        let row_id = row.id;
        doc.execute(CommandBatch::new("Add").with(DocCommand::AddRow { table, row, index: None }))
            .unwrap();
        doc.execute(CommandBatch::new("Remove").with(DocCommand::RemoveColumn {
            table,
            column: "Value".into(),
        }))
        .unwrap();

        assert!(doc.row(table, row_id).unwrap().cells.is_empty());
    }
}
