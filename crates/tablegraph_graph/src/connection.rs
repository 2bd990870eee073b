// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection rules and their document mutations.
//!
//! Data connections live as rows of the edge table and mark the target cell
//! with a `graph.in("<pin>")` formula. Execution connections are a single
//! relation cell on the source row (node row or embedded child row). Every
//! operation only builds a [`CommandBatch`]; the caller executes it.

use crate::pin::{PinDirection, PinId, PinRef};
use crate::schema::{embedded_exec_column, EdgeColumns, GraphSchema};
use std::collections::HashSet;
use tablegraph_document::{
    CellValue, ColumnId, ColumnKind, CommandBatch, DocCommand, DocumentStore, Row, RowId, Table,
    TableId,
};
use thiserror::Error;

/// Reasons a connection is refused
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectError {
    /// Execution pins mixed with data pins
    #[error("Execution pins only connect to execution pins")]
    ExecutionMismatch,

    /// Both pins on the same side
    #[error("Connect an output to an input")]
    SameDirection,

    /// Both pins on the same node
    #[error("A node cannot connect to itself")]
    SelfLoop,

    /// Data kinds do not match
    #[error("Cannot connect {} output to {} input", .from.display_name(), .to.display_name())]
    IncompatibleKinds {
        /// Source kind
        from: ColumnKind,
        /// Target kind
        to: ColumnKind,
    },

    /// Node row no longer exists
    #[error("Node not found: {0}")]
    NodeNotFound(RowId),

    /// Pin column or embedded row no longer exists
    #[error("Pin not found: {0}")]
    PinNotFound(String),

    /// Required graph columns are missing
    #[error("Graph schema is incomplete")]
    SchemaIncomplete,
}

/// Kind of value a pin carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    /// Execution flow
    Execution,
    /// Data of a column kind
    Data(ColumnKind),
}

/// Formula marking a cell as driven by the edge into `pin`
pub fn marker_formula(pin: &ColumnId) -> String {
    let escaped = pin.as_str().replace('\\', "\\\\").replace('"', "\\\"");
    format!("graph.in(\"{escaped}\")")
}

/// Whether `expression` is exactly the marker for `pin`
pub fn is_marker_for(expression: &str, pin: &ColumnId) -> bool {
    expression.trim() == marker_formula(pin)
}

/// Whether a `from` output may feed a `to` input
pub fn kinds_compatible(from: ColumnKind, to: ColumnKind) -> bool {
    from == to
        || matches!(
            (from, to),
            (ColumnKind::Number, ColumnKind::Formula) | (ColumnKind::Formula, ColumnKind::Number)
        )
}

/// One row of the edge table
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    /// Edge row
    pub row: RowId,
    /// Source node
    pub from_node: Option<RowId>,
    /// Source pin id
    pub from_pin: String,
    /// Target node
    pub to_node: Option<RowId>,
    /// Target pin id
    pub to_pin: String,
}

impl EdgeRecord {
    /// Whether either end is `node`
    pub fn touches(&self, node: RowId) -> bool {
        self.from_node == Some(node) || self.to_node == Some(node)
    }

    /// Whether this edge feeds `pin` on `node`
    pub fn targets(&self, node: RowId, pin: &ColumnId) -> bool {
        self.to_node == Some(node) && self.to_pin == pin.as_str()
    }
}

/// An execution relation from a pin to a node
#[derive(Debug, Clone, PartialEq)]
pub struct ExecLink {
    /// Execution output or embedded pin
    pub source: PinRef,
    /// Target node
    pub target: RowId,
}

/// A subtable column whose child rows carry execution outputs
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedSource {
    /// Subtable column of the node table
    pub column: ColumnId,
    /// Child table
    pub table: TableId,
    /// Execution relation column of the child table
    pub exec_column: ColumnId,
}

/// Builds connection mutations against a document snapshot
pub struct ConnectionEngine<'a> {
    store: &'a dyn DocumentStore,
    schema: &'a GraphSchema,
}

impl<'a> ConnectionEngine<'a> {
    /// Create an engine
    pub fn new(store: &'a dyn DocumentStore, schema: &'a GraphSchema) -> Self {
        Self { store, schema }
    }

    fn node_table(&self) -> Result<&'a Table, ConnectError> {
        self.store
            .table(self.schema.node_table)
            .ok_or(ConnectError::SchemaIncomplete)
    }

    fn edge_columns(&self) -> Result<EdgeColumns, ConnectError> {
        self.schema.edge_columns().ok_or(ConnectError::SchemaIncomplete)
    }

    fn node_row(&self, node: RowId) -> Result<&'a Row, ConnectError> {
        self.node_table()?
            .row(node)
            .ok_or(ConnectError::NodeNotFound(node))
    }

    /// Subtable columns with an execution relation, excluding the edge
    /// collection
    pub fn embedded_sources(&self) -> Vec<EmbeddedSource> {
        let Ok(table) = self.node_table() else {
            return Vec::new();
        };
        table
            .columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Subtable)
            .filter(|c| self.schema.edge_collection.as_ref() != Some(&c.id))
            .filter_map(|c| {
                let child = self.store.table(c.subtable_child()?)?;
                let exec = embedded_exec_column(child, table.id)?;
                Some(EmbeddedSource {
                    column: c.id.clone(),
                    table: child.id,
                    exec_column: exec.id.clone(),
                })
            })
            .collect()
    }

    /// All edge records
    pub fn edges(&self) -> Vec<EdgeRecord> {
        let (Some(columns), Some(table)) = (
            self.schema.edge_columns(),
            self.schema.edge_table.and_then(|id| self.store.table(id)),
        ) else {
            return Vec::new();
        };
        let text = |row: &Row, column: &ColumnId| {
            row.value(column).as_text().unwrap_or_default().to_string()
        };
        table
            .rows
            .iter()
            .map(|row| EdgeRecord {
                row: row.id,
                from_node: row.value(&columns.from_node).as_relation(),
                from_pin: text(row, &columns.from_pin),
                to_node: row.value(&columns.to_node).as_relation(),
                to_pin: text(row, &columns.to_pin),
            })
            .collect()
    }

    /// All execution relations, node outputs first
    pub fn exec_links(&self) -> Vec<ExecLink> {
        let Ok(table) = self.node_table() else {
            return Vec::new();
        };
        let mut links = Vec::new();
        if let Some(exec) = &self.schema.exec_output {
            for row in &table.rows {
                if let Some(target) = row.value(exec).as_relation() {
                    links.push(ExecLink {
                        source: PinRef::exec_out(row.id),
                        target,
                    });
                }
            }
        }
        for source in self.embedded_sources() {
            let Some(child) = self.store.table(source.table) else {
                continue;
            };
            for row in &child.rows {
                let target = row.value(&source.exec_column).as_relation();
                if let (Some(owner), Some(target)) = (row.parent_row, target) {
                    links.push(ExecLink {
                        source: PinRef::embedded(owner, source.column.clone(), row.id),
                        target,
                    });
                }
            }
        }
        links
    }

    /// Input columns of `node` fed by an edge
    pub fn connected_inputs(&self, node: RowId) -> HashSet<ColumnId> {
        self.edges()
            .into_iter()
            .filter(|e| e.to_node == Some(node))
            .map(|e| ColumnId::from(e.to_pin))
            .collect()
    }

    /// Kind of value a pin carries
    pub fn pin_kind(&self, pin: &PinRef) -> Result<PinKind, ConnectError> {
        match &pin.pin {
            PinId::Data(column) => self
                .node_table()?
                .column(column)
                .map(|c| PinKind::Data(c.kind))
                .ok_or_else(|| ConnectError::PinNotFound(column.to_string())),
            _ => Ok(PinKind::Execution),
        }
    }

    /// Whether `a` and `b` could be connected
    pub fn can_connect(&self, a: &PinRef, b: &PinRef) -> bool {
        self.validate(a, b).is_ok()
    }

    /// Check the connection rules, returning (source, target)
    fn validate<'p>(
        &self,
        a: &'p PinRef,
        b: &'p PinRef,
    ) -> Result<(&'p PinRef, &'p PinRef), ConnectError> {
        let execution = a.pin.is_execution() || b.pin.is_execution();
        if execution && !(a.pin.is_execution() && b.pin.is_execution()) {
            return Err(ConnectError::ExecutionMismatch);
        }
        let (source, target) = match (a.direction, b.direction) {
            (PinDirection::Output, PinDirection::Input) => (a, b),
            (PinDirection::Input, PinDirection::Output) => (b, a),
            _ => return Err(ConnectError::SameDirection),
        };
        if source.node == target.node {
            return Err(ConnectError::SelfLoop);
        }
        self.node_row(target.node)?;

        if execution {
            if !matches!(target.pin, PinId::ExecIn) {
                return Err(ConnectError::ExecutionMismatch);
            }
            self.exec_cell(source)?;
            return Ok((source, target));
        }

        self.node_row(source.node)?;
        let (PinKind::Data(from), PinKind::Data(to)) = (self.pin_kind(source)?, self.pin_kind(target)?)
        else {
            return Err(ConnectError::ExecutionMismatch);
        };
        if !kinds_compatible(from, to) {
            return Err(ConnectError::IncompatibleKinds { from, to });
        }
        Ok((source, target))
    }

    /// Location of the relation cell behind an execution output
    fn exec_cell(&self, pin: &PinRef) -> Result<(TableId, RowId, ColumnId), ConnectError> {
        match &pin.pin {
            PinId::ExecOut => {
                self.node_row(pin.node)?;
                let column = self
                    .schema
                    .exec_output
                    .clone()
                    .ok_or(ConnectError::SchemaIncomplete)?;
                Ok((self.schema.node_table, pin.node, column))
            }
            PinId::Embedded { column, row } => {
                self.node_row(pin.node)?;
                let source = self
                    .embedded_sources()
                    .into_iter()
                    .find(|s| s.column == *column)
                    .ok_or_else(|| ConnectError::PinNotFound(pin.pin.to_string()))?;
                let owned = self
                    .store
                    .row(source.table, *row)
                    .is_some_and(|r| r.parent_row == Some(pin.node));
                if !owned {
                    return Err(ConnectError::PinNotFound(pin.pin.to_string()));
                }
                Ok((source.table, *row, source.exec_column))
            }
            _ => Err(ConnectError::ExecutionMismatch),
        }
    }

    /// Build the mutation connecting `a` and `b`, in either order
    pub fn try_connect(&self, a: &PinRef, b: &PinRef) -> Result<CommandBatch, ConnectError> {
        let (source, target) = self.validate(a, b)?;
        if source.pin.is_execution() {
            let (table, row, column) = self.exec_cell(source)?;
            let batch = CommandBatch::new("Connect execution").with(DocCommand::SetCell {
                table,
                row,
                column,
                value: CellValue::Relation(target.node),
            });
            return Ok(batch);
        }

        let columns = self.edge_columns()?;
        let (Some(from_pin), Some(to_pin)) = (source.pin.data_column(), target.pin.data_column())
        else {
            return Err(ConnectError::ExecutionMismatch);
        };

        let mut batch = CommandBatch::new(format!("Connect {} -> {}", from_pin, to_pin));
        for edge in self.edges() {
            if edge.targets(target.node, to_pin) {
                batch.push(DocCommand::RemoveRow {
                    table: columns.table,
                    row: edge.row,
                });
            }
        }
        let edge = Row::new()
            .with_parent(target.node)
            .with_value(columns.from_node, CellValue::Relation(source.node))
            .with_value(columns.from_pin, CellValue::Text(from_pin.to_string()))
            .with_value(columns.to_node, CellValue::Relation(target.node))
            .with_value(columns.to_pin, CellValue::Text(to_pin.to_string()));
        batch.push(DocCommand::AddRow {
            table: columns.table,
            row: edge,
            index: None,
        });
        batch.push(DocCommand::SetFormula {
            table: self.schema.node_table,
            row: target.node,
            column: to_pin.clone(),
            expression: Some(marker_formula(to_pin)),
        });
        Ok(batch)
    }

    /// Clear the marker formula on `column` of `node`, only if it is still
    /// the marker
    fn clear_marker(&self, node: RowId, column: &ColumnId) -> Option<DocCommand> {
        let row = self.store.row(self.schema.node_table, node)?;
        let expression = row.cell(column)?.expression()?;
        is_marker_for(expression, column).then(|| DocCommand::SetFormula {
            table: self.schema.node_table,
            row: node,
            column: column.clone(),
            expression: None,
        })
    }

    /// Clear every execution relation pointing at `target`, except those
    /// owned by `skip_owner`. Links whose owner no longer resolves are left
    /// alone.
    fn clear_exec_links_to(&self, target: RowId, skip_owner: Option<RowId>, batch: &mut CommandBatch) {
        for link in self.exec_links() {
            if link.target != target || Some(link.source.node) == skip_owner {
                continue;
            }
            let Ok((table, row, column)) = self.exec_cell(&link.source) else {
                tracing::debug!("Skipping stale execution link from {}", link.source);
                continue;
            };
            batch.push(DocCommand::SetCell {
                table,
                row,
                column,
                value: CellValue::Empty,
            });
        }
    }

    /// Build the mutation removing every connection of `pin`
    pub fn disconnect(&self, pin: &PinRef) -> Result<CommandBatch, ConnectError> {
        let mut batch = CommandBatch::new(format!("Disconnect {}", pin.pin));
        match (&pin.pin, pin.direction) {
            (PinId::Data(column), PinDirection::Input) => {
                let columns = self.edge_columns()?;
                for edge in self.edges() {
                    if edge.targets(pin.node, column) {
                        batch.push(DocCommand::RemoveRow {
                            table: columns.table,
                            row: edge.row,
                        });
                    }
                }
                if let Some(command) = self.clear_marker(pin.node, column) {
                    batch.push(command);
                }
            }
            (PinId::Data(column), PinDirection::Output) => {
                let columns = self.edge_columns()?;
                let mut cleared = HashSet::new();
                for edge in self.edges() {
                    if edge.from_node != Some(pin.node) || edge.from_pin != column.as_str() {
                        continue;
                    }
                    batch.push(DocCommand::RemoveRow {
                        table: columns.table,
                        row: edge.row,
                    });
                    let Some(to_node) = edge.to_node else {
                        continue;
                    };
                    let to_pin = ColumnId::from(edge.to_pin);
                    if let Some(command) = self.clear_marker(to_node, &to_pin) {
                        if cleared.insert((to_node, to_pin)) {
                            batch.push(command);
                        }
                    }
                }
            }
            (PinId::ExecIn, _) => self.clear_exec_links_to(pin.node, None, &mut batch),
            (PinId::ExecOut | PinId::Embedded { .. }, _) => {
                let (table, row, column) = self.exec_cell(pin)?;
                let linked = self
                    .store
                    .row(table, row)
                    .is_some_and(|r| !r.value(&column).is_empty());
                if linked {
                    batch.push(DocCommand::SetCell {
                        table,
                        row,
                        column,
                        value: CellValue::Empty,
                    });
                }
            }
        }
        Ok(batch)
    }

    /// Build the mutation deleting `node` and everything attached to it
    pub fn delete_node(&self, node: RowId) -> Result<CommandBatch, ConnectError> {
        let table = self.node_table()?;
        self.node_row(node)?;
        let mut batch = CommandBatch::new("Delete node");

        self.clear_exec_links_to(node, Some(node), &mut batch);

        let mut removed: HashSet<(TableId, RowId)> = HashSet::new();
        if let Some(columns) = self.schema.edge_columns() {
            let mut cleared = HashSet::new();
            for edge in self.edges().into_iter().filter(|e| e.touches(node)) {
                removed.insert((columns.table, edge.row));
                batch.push(DocCommand::RemoveRow {
                    table: columns.table,
                    row: edge.row,
                });
                if edge.from_node != Some(node) {
                    continue;
                }
                let Some(to_node) = edge.to_node.filter(|to| *to != node) else {
                    continue;
                };
                let to_pin = ColumnId::from(edge.to_pin);
                if let Some(command) = self.clear_marker(to_node, &to_pin) {
                    if cleared.insert((to_node, to_pin)) {
                        batch.push(command);
                    }
                }
            }
        }

        for child in self.store.child_tables(table.id) {
            for row in child.rows_of(node) {
                if removed.insert((child.id, row.id)) {
                    batch.push(DocCommand::RemoveRow {
                        table: child.id,
                        row: row.id,
                    });
                }
            }
        }

        batch.push(DocCommand::RemoveRow {
            table: table.id,
            row: node,
        });
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{resolve_schema, RoleHints};
    use crate::testing::{add_child_table, add_column, add_node, graph_document};
    use tablegraph_document::{Column, CommandExecutor, Document};

    struct Graph {
        doc: Document,
        nodes: TableId,
        edges: TableId,
        a: RowId,
        b: RowId,
    }

    impl Graph {
        fn new() -> Self {
            let (mut doc, nodes, edges) = graph_document();
            add_column(&mut doc, nodes, Column::new("Out", "Out", ColumnKind::Number));
            add_column(&mut doc, nodes, Column::new("In", "In", ColumnKind::Number));
            add_column(&mut doc, nodes, Column::new("Calc", "Calc", ColumnKind::Formula));
            add_column(&mut doc, nodes, Column::new("Label", "Label", ColumnKind::Text));
            let a = add_node(&mut doc, nodes, "Start", [0.0, 0.0]);
            let b = add_node(&mut doc, nodes, "Step", [300.0, 0.0]);
            Self { doc, nodes, edges, a, b }
        }

        fn schema(&self) -> GraphSchema {
            resolve_schema(&self.doc, self.doc.table(self.nodes).unwrap(), &RoleHints::new())
        }

        fn run(&mut self, build: impl FnOnce(&ConnectionEngine<'_>) -> Result<CommandBatch, ConnectError>) -> Result<(), ConnectError> {
            let schema = self.schema();
            let batch = build(&ConnectionEngine::new(&self.doc, &schema))?;
            self.doc.execute(batch).unwrap();
            Ok(())
        }

        fn formula(&self, node: RowId, column: &str) -> Option<String> {
            self.doc
                .row(self.nodes, node)
                .and_then(|r| r.cell(&column.into()))
                .and_then(|c| c.expression().map(str::to_string))
        }

        fn edge_count(&self) -> usize {
            self.doc.table(self.edges).unwrap().rows.len()
        }
    }

    #[test]
    fn test_data_connect_writes_edge_and_marker() {
        let mut graph = Graph::new();
        let (a, b) = (graph.a, graph.b);
        graph
            .run(|e| e.try_connect(&PinRef::input(b, "In"), &PinRef::output(a, "Out")))
            .unwrap();

        let edges = graph.doc.table(graph.edges).unwrap();
        assert_eq!(edges.rows.len(), 1);
        let edge = &edges.rows[0];
        assert_eq!(edge.parent_row, Some(b));
        assert_eq!(edge.value(&"FromNode".into()), &CellValue::Relation(a));
        assert_eq!(edge.value(&"ToPin".into()).as_text(), Some("In"));
        assert_eq!(graph.formula(b, "In").as_deref(), Some("graph.in(\"In\")"));
    }

    #[test]
    fn test_data_connect_replaces_previous_edge() {
        let mut graph = Graph::new();
        let (a, b) = (graph.a, graph.b);
        let c = add_node(&mut graph.doc, graph.nodes, "Step", [0.0, 300.0]);
        graph
            .run(|e| e.try_connect(&PinRef::output(a, "Out"), &PinRef::input(b, "In")))
            .unwrap();
        graph
            .run(|e| e.try_connect(&PinRef::output(c, "Out"), &PinRef::input(b, "In")))
            .unwrap();

        let schema = graph.schema();
        let engine = ConnectionEngine::new(&graph.doc, &schema);
        let edges = engine.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from_node, Some(c));
        assert!(engine.connected_inputs(b).contains(&ColumnId::from("In")));
    }

    #[test]
    fn test_kind_rules() {
        let graph = Graph::new();
        let schema = graph.schema();
        let engine = ConnectionEngine::new(&graph.doc, &schema);
        let (a, b) = (graph.a, graph.b);

        assert!(engine.can_connect(&PinRef::output(a, "Out"), &PinRef::input(b, "Calc")));
        assert_eq!(
            engine.try_connect(&PinRef::output(a, "Label"), &PinRef::input(b, "In")),
            Err(ConnectError::IncompatibleKinds {
                from: ColumnKind::Text,
                to: ColumnKind::Number
            })
        );
        assert_eq!(
            engine.try_connect(&PinRef::output(a, "Out"), &PinRef::exec_in(b)),
            Err(ConnectError::ExecutionMismatch)
        );
        assert_eq!(
            engine.try_connect(&PinRef::output(a, "Out"), &PinRef::output(b, "Out")),
            Err(ConnectError::SameDirection)
        );
        assert_eq!(
            engine.try_connect(&PinRef::exec_out(a), &PinRef::exec_in(a)),
            Err(ConnectError::SelfLoop)
        );
        let ghost = RowId::new();
        assert_eq!(
            engine.try_connect(&PinRef::output(a, "Out"), &PinRef::input(ghost, "In")),
            Err(ConnectError::NodeNotFound(ghost))
        );
        assert!(matches!(
            engine.try_connect(&PinRef::output(a, "Gone"), &PinRef::input(b, "In")),
            Err(ConnectError::PinNotFound(_))
        ));
    }

    #[test]
    fn test_number_to_text_is_rejected_untouched() {
        let mut graph = Graph::new();
        let (a, b) = (graph.a, graph.b);
        let result = graph.run(|e| e.try_connect(&PinRef::output(a, "Out"), &PinRef::input(b, "Label")));
        assert_eq!(
            result,
            Err(ConnectError::IncompatibleKinds {
                from: ColumnKind::Number,
                to: ColumnKind::Text
            })
        );
        assert_eq!(graph.formula(b, "Label"), None);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.doc.history().can_undo());
    }

    #[test]
    fn test_exec_connect_and_disconnect() {
        let mut graph = Graph::new();
        let (a, b) = (graph.a, graph.b);
        graph
            .run(|e| e.try_connect(&PinRef::exec_in(b), &PinRef::exec_out(a)))
            .unwrap();
        assert_eq!(
            graph.doc.row(graph.nodes, a).unwrap().value(&"ExecNext".into()),
            &CellValue::Relation(b)
        );

        graph.run(|e| e.disconnect(&PinRef::exec_in(b))).unwrap();
        assert!(graph.doc.row(graph.nodes, a).unwrap().value(&"ExecNext".into()).is_empty());
        assert!(graph.edge_count() == 0);
    }

    #[test]
    fn test_embedded_exec_connect() {
        let mut graph = Graph::new();
        let (a, b) = (graph.a, graph.b);
        let child = add_child_table(&mut graph.doc, graph.nodes, "Choices", a, 2);
        let choice = graph.doc.table(child).unwrap().rows[1].id;

        graph
            .run(|e| e.try_connect(&PinRef::embedded(a, "Choices", choice), &PinRef::exec_in(b)))
            .unwrap();
        assert_eq!(
            graph.doc.row(child, choice).unwrap().value(&"Next".into()),
            &CellValue::Relation(b)
        );

        let schema = graph.schema();
        let links = ConnectionEngine::new(&graph.doc, &schema).exec_links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source, PinRef::embedded(a, "Choices", choice));

        let stale = PinRef::embedded(b, "Choices", choice);
        let engine = ConnectionEngine::new(&graph.doc, &schema);
        assert!(matches!(
            engine.try_connect(&stale, &PinRef::exec_in(a)),
            Err(ConnectError::PinNotFound(_))
        ));
        assert_eq!(
            engine.try_connect(&PinRef::embedded(a, "Choices", choice), &PinRef::input(b, "In")),
            Err(ConnectError::ExecutionMismatch)
        );
    }

    #[test]
    fn test_disconnect_input_keeps_user_formula() {
        let mut graph = Graph::new();
        let (a, b, nodes) = (graph.a, graph.b, graph.nodes);
        graph
            .run(|e| e.try_connect(&PinRef::output(a, "Out"), &PinRef::input(b, "In")))
            .unwrap();
        graph
            .doc
            .execute(CommandBatch::new("Edit").with(DocCommand::SetFormula {
                table: nodes,
                row: b,
                column: "In".into(),
                expression: Some("1 + 2".to_string()),
            }))
            .unwrap();

        graph.run(|e| e.disconnect(&PinRef::input(b, "In"))).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.formula(b, "In").as_deref(), Some("1 + 2"));
    }

    #[test]
    fn test_disconnect_output_clears_all_targets() {
        let mut graph = Graph::new();
        let (a, b) = (graph.a, graph.b);
        let c = add_node(&mut graph.doc, graph.nodes, "Step", [0.0, 300.0]);
        graph
            .run(|e| e.try_connect(&PinRef::output(a, "Out"), &PinRef::input(b, "In")))
            .unwrap();
        graph
            .run(|e| e.try_connect(&PinRef::output(a, "Out"), &PinRef::input(c, "Calc")))
            .unwrap();

        graph.run(|e| e.disconnect(&PinRef::output(a, "Out"))).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.formula(b, "In"), None);
        assert_eq!(graph.formula(c, "Calc"), None);
    }

    #[test]
    fn test_delete_node_cleans_up() {
        let mut graph = Graph::new();
        let (a, b, nodes) = (graph.a, graph.b, graph.nodes);
        let c = add_node(&mut graph.doc, nodes, "Step", [0.0, 300.0]);
        let child = add_child_table(&mut graph.doc, nodes, "Choices", c, 1);
        let choice = graph.doc.table(child).unwrap().rows[0].id;

        graph
            .run(|e| e.try_connect(&PinRef::output(b, "Out"), &PinRef::input(a, "In")))
            .unwrap();
        graph
            .run(|e| e.try_connect(&PinRef::output(a, "Out"), &PinRef::input(b, "Calc")))
            .unwrap();
        graph
            .run(|e| e.try_connect(&PinRef::exec_out(a), &PinRef::exec_in(b)))
            .unwrap();
        graph
            .run(|e| e.try_connect(&PinRef::embedded(c, "Choices", choice), &PinRef::exec_in(b)))
            .unwrap();
        graph
            .run(|e| e.try_connect(&PinRef::exec_out(c), &PinRef::exec_in(a)))
            .unwrap();

        graph.run(|e| e.delete_node(b)).unwrap();

        assert!(graph.doc.row(nodes, b).is_none());
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.formula(a, "In"), None);
        assert!(graph.doc.row(nodes, a).unwrap().value(&"ExecNext".into()).is_empty());
        assert!(graph.doc.row(child, choice).unwrap().value(&"Next".into()).is_empty());
        assert_eq!(
            graph.doc.row(nodes, c).unwrap().value(&"ExecNext".into()),
            &CellValue::Relation(a)
        );

        graph.run(|e| e.delete_node(c)).unwrap();
        assert!(graph.doc.table(child).unwrap().rows.is_empty());

        graph.doc.undo().unwrap();
        assert_eq!(graph.doc.table(child).unwrap().rows.len(), 1);
    }

    #[test]
    fn test_delete_node_ignores_orphaned_links() {
        let mut graph = Graph::new();
        let (a, b, nodes) = (graph.a, graph.b, graph.nodes);
        let child = add_child_table(&mut graph.doc, nodes, "Choices", a, 1);
        let mut table = graph.doc.table(child).cloned().unwrap();
        table.rows[0].parent_row = Some(RowId::new());
        table.rows[0].set_value("Next".into(), CellValue::Relation(b));
        graph.doc.insert_table(table);
        graph
            .run(|e| e.try_connect(&PinRef::exec_out(a), &PinRef::exec_in(b)))
            .unwrap();

        graph.run(|e| e.delete_node(b)).unwrap();
        assert!(graph.doc.row(nodes, b).is_none());
        assert!(graph.doc.row(nodes, a).unwrap().value(&"ExecNext".into()).is_empty());

        graph.run(|e| e.disconnect(&PinRef::exec_in(a))).unwrap();
        assert_eq!(graph.doc.table(child).unwrap().rows.len(), 1);
    }

    #[test]
    fn test_marker_formula() {
        let pin = ColumnId::from("In");
        assert_eq!(marker_formula(&pin), "graph.in(\"In\")");
        assert!(is_marker_for(" graph.in(\"In\") ", &pin));
        assert!(!is_marker_for("graph.in(\"Out\")", &pin));
        assert_eq!(marker_formula(&ColumnId::from("a\"b")), "graph.in(\"a\\\"b\")");
    }
}
