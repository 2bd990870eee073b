// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared test fixtures.

use tablegraph_document::{
    CellValue, Column, ColumnKind, Document, DocumentStore, Row, RowId, Table, TableId,
};

/// A node table with the full graph schema and its edge table
pub(crate) fn graph_document() -> (Document, TableId, TableId) {
    let mut doc = Document::new();
    let nodes = Table::new("Nodes");
    let node_id = nodes.id;
    let edges = Table::new("Edges")
        .with_parent(node_id)
        .with_column(Column::relation("FromNode", "FromNode", node_id))
        .with_column(Column::new("FromPin", "FromPin", ColumnKind::Text))
        .with_column(Column::relation("ToNode", "ToNode", node_id))
        .with_column(Column::new("ToPin", "ToPin", ColumnKind::Text));
    let edge_id = edges.id;
    let nodes = nodes
        .with_column(Column::new("Type", "Type", ColumnKind::Select))
        .with_column(Column::new("Pos", "Pos", ColumnKind::Vec2))
        .with_column(Column::new("Title", "Title", ColumnKind::Text))
        .with_column(Column::relation("ExecNext", "ExecNext", node_id))
        .with_column(Column::subtable("Edges", "Edges", edge_id));
    doc.insert_table(nodes);
    doc.insert_table(edges);
    (doc, node_id, edge_id)
}

/// Add a column to a table outside of history
pub(crate) fn add_column(doc: &mut Document, table: TableId, column: Column) {
    let updated = doc
        .table(table)
        .cloned()
        .expect("table exists")
        .with_column(column);
    doc.insert_table(updated);
}

/// Add a node row outside of history
pub(crate) fn add_node(doc: &mut Document, nodes: TableId, type_name: &str, pos: [f32; 2]) -> RowId {
    let row = Row::new()
        .with_value("Type", CellValue::Text(type_name.to_string()))
        .with_value("Pos", CellValue::Vec2(pos))
        .with_value("Title", CellValue::Text(type_name.to_string()));
    let id = row.id;
    let mut table = doc.table(nodes).cloned().expect("node table exists");
    table.rows.push(row);
    doc.insert_table(table);
    id
}

/// Add a `name` subtable column whose child table has a label and an
/// execution relation back into the node table, with `count` rows owned by
/// `owner`
pub(crate) fn add_child_table(
    doc: &mut Document,
    nodes: TableId,
    name: &str,
    owner: RowId,
    count: usize,
) -> TableId {
    let mut child = Table::new(name)
        .with_parent(nodes)
        .with_column(Column::new("Label", "Label", ColumnKind::Text))
        .with_column(Column::relation("Next", "Next", nodes));
    for i in 0..count {
        child.rows.push(
            Row::new()
                .with_parent(owner)
                .with_value("Label", CellValue::Text(format!("Choice {i}"))),
        );
    }
    let child_id = child.id;
    add_column(doc, nodes, Column::subtable(name, name, child_id));
    doc.insert_table(child);
    child_id
}
