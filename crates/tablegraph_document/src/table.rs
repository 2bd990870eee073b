// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tables, columns and rows.

use crate::ids::{ColumnId, RowId, TableId};
use crate::value::{Cell, CellValue, ColumnKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How many rows a relation cell may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelationMode {
    /// At most one row
    #[default]
    Single,
    /// Any number of rows
    Many,
}

/// Kind-specific column metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ColumnMeta {
    /// No metadata
    #[default]
    None,
    /// Options of a select column
    Select {
        /// Allowed values, in display order
        options: Vec<String>,
    },
    /// Target of a relation column
    Relation {
        /// Table the relation points into
        target: TableId,
        /// Cardinality
        mode: RelationMode,
    },
    /// Child table of a subtable column
    Subtable {
        /// Child table id
        child: TableId,
    },
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Stable id
    pub id: ColumnId,
    /// Display name
    pub name: String,
    /// Data kind
    pub kind: ColumnKind,
    /// Kind-specific metadata
    pub meta: ColumnMeta,
}

impl Column {
    /// Create a column with no metadata
    pub fn new(id: impl Into<ColumnId>, name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            meta: ColumnMeta::None,
        }
    }

    /// Create a single relation column pointing into `target`
    pub fn relation(id: impl Into<ColumnId>, name: impl Into<String>, target: TableId) -> Self {
        Self::new(id, name, ColumnKind::Relation).with_meta(ColumnMeta::Relation {
            target,
            mode: RelationMode::Single,
        })
    }

    /// Create a subtable column owning `child`
    pub fn subtable(id: impl Into<ColumnId>, name: impl Into<String>, child: TableId) -> Self {
        Self::new(id, name, ColumnKind::Subtable).with_meta(ColumnMeta::Subtable { child })
    }

    /// Set the metadata
    pub fn with_meta(mut self, meta: ColumnMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Target table of a relation column
    pub fn relation_target(&self) -> Option<TableId> {
        match self.meta {
            ColumnMeta::Relation { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Child table of a subtable column
    pub fn subtable_child(&self) -> Option<TableId> {
        match self.meta {
            ColumnMeta::Subtable { child } => Some(child),
            _ => None,
        }
    }

    /// Select options, empty for other kinds
    pub fn select_options(&self) -> &[String] {
        match &self.meta {
            ColumnMeta::Select { options } => options,
            _ => &[],
        }
    }
}

/// A row: a stable id plus cells keyed by column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Stable id
    pub id: RowId,
    /// Owning row, for rows of a child table
    pub parent_row: Option<RowId>,
    /// Cells by column id (absent means empty)
    pub cells: IndexMap<ColumnId, Cell>,
}

impl Row {
    /// Create an empty row with a fresh id
    pub fn new() -> Self {
        Self::with_id(RowId::new())
    }

    /// Create an empty row with the given id
    pub fn with_id(id: RowId) -> Self {
        Self {
            id,
            parent_row: None,
            cells: IndexMap::new(),
        }
    }

    /// Set the owning row
    pub fn with_parent(mut self, parent: RowId) -> Self {
        self.parent_row = Some(parent);
        self
    }

    /// Set a cell value (builder form)
    pub fn with_value(mut self, column: impl Into<ColumnId>, value: CellValue) -> Self {
        self.set_value(column.into(), value);
        self
    }

    /// Get a cell
    pub fn cell(&self, column: &ColumnId) -> Option<&Cell> {
        self.cells.get(column)
    }

    /// Get a cell value, `Empty` when absent
    pub fn value(&self, column: &ColumnId) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(column).map_or(&EMPTY, |cell| &cell.value)
    }

    /// Set a cell value, keeping any formula
    pub fn set_value(&mut self, column: ColumnId, value: CellValue) {
        self.cells.entry(column).or_default().value = value;
    }
}

impl Default for Row {
    fn default() -> Self {
        Self::new()
    }
}

/// A table: ordered columns and ordered rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Stable id
    pub id: TableId,
    /// Display name
    pub name: String,
    /// Parent table, for child tables of a subtable column
    pub parent: Option<TableId>,
    /// Columns in display order
    pub columns: Vec<Column>,
    /// Rows in display order
    pub rows: Vec<Row>,
}

impl Table {
    /// Create an empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TableId::new(),
            name: name.into(),
            parent: None,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Set the parent table
    pub fn with_parent(mut self, parent: TableId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Add a column (builder form)
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Get a column by id
    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == *id)
    }

    /// Get the index of a column
    pub fn column_index(&self, id: &ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| c.id == *id)
    }

    /// Get a row by id
    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Get a mutable row by id
    pub fn row_mut(&mut self, id: RowId) -> Option<&mut Row> {
        self.rows.iter_mut().find(|r| r.id == id)
    }

    /// Get the index of a row
    pub fn row_index(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.id == id)
    }

    /// Rows owned by the given parent row
    pub fn rows_of(&self, parent: RowId) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |r| r.parent_row == Some(parent))
    }

    /// A column id derived from `name` that is not used by this table yet
    pub fn unique_column_id(&self, name: &str) -> ColumnId {
        let base = ColumnId::from_name(name);
        if self.column(&base).is_none() {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = ColumnId(format!("{}_{n}", base.0));
            if self.column(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// A column display name not used by this table yet
    pub fn unique_column_name(&self, name: &str) -> String {
        let taken = |candidate: &str| self.columns.iter().any(|c| c.name == candidate);
        if !taken(name) {
            return name.to_string();
        }
        (2..)
            .map(|n| format!("{name} {n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_column_ids() {
        let table = Table::new("Nodes")
            .with_column(Column::new("Value", "Value", ColumnKind::Number))
            .with_column(Column::new("Value_2", "Value 2", ColumnKind::Number));

        assert_eq!(table.unique_column_id("In").as_str(), "In");
        assert_eq!(table.unique_column_id("Value").as_str(), "Value_3");
        assert_eq!(table.unique_column_name("Value"), "Value 3");
    }

    #[test]
    fn test_rows_of_parent() {
        let parent = RowId::new();
        let mut table = Table::new("Children");
        table.rows.push(Row::new().with_parent(parent));
        table.rows.push(Row::new());
        table.rows.push(Row::new().with_parent(parent));

        assert_eq!(table.rows_of(parent).count(), 2);
    }

    #[test]
    fn test_missing_cell_reads_empty() {
        let row = Row::new().with_value("A", CellValue::Number(1.0));
        assert_eq!(row.value(&ColumnId::from("A")), &CellValue::Number(1.0));
        assert!(row.value(&ColumnId::from("B")).is_empty());
    }
}
