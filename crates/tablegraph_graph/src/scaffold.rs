// SPDX-License-Identifier: MIT OR Apache-2.0
//! Synthesis of missing graph columns.
//!
//! Scaffolding is additive: it never removes or renames anything. When a
//! preferred name is taken by a column of the wrong kind, the new column gets
//! a unique name and the returned hints pin its id.

use crate::schema::{GraphRole, GraphSchema, RoleHints};
use tablegraph_document::{
    Column, ColumnKind, ColumnMeta, CommandBatch, DocCommand, DocumentStore, Table, TableId,
};

/// Node types offered by a freshly scaffolded type column
pub const DEFAULT_NODE_TYPES: &[&str] = &["Start", "Step"];

/// Commands and hints that complete a graph schema
#[derive(Debug, Clone)]
pub struct ScaffoldPlan {
    /// Single batch adding every missing column and table
    pub batch: CommandBatch,
    /// Hints pinning the new column ids
    pub hints: RoleHints,
}

/// Column to add to an existing table, named after `name` but not colliding
fn fresh_column(table: &Table, name: &str, kind: ColumnKind, meta: ColumnMeta) -> Column {
    Column::new(
        table.unique_column_id(name),
        table.unique_column_name(name),
        kind,
    )
    .with_meta(meta)
}

fn relation_meta(target: TableId) -> ColumnMeta {
    ColumnMeta::Relation {
        target,
        mode: Default::default(),
    }
}

/// Plan the columns `table` lacks for `schema` to become complete.
///
/// Returns `None` when nothing is missing.
pub fn plan_scaffold(
    store: &dyn DocumentStore,
    table: &Table,
    schema: &GraphSchema,
) -> Option<ScaffoldPlan> {
    let mut batch = CommandBatch::new("Scaffold graph schema");
    let mut hints = RoleHints::new();

    let node_columns = [
        (
            GraphRole::Type,
            "Type",
            ColumnKind::Select,
            ColumnMeta::Select {
                options: DEFAULT_NODE_TYPES.iter().map(|s| s.to_string()).collect(),
            },
        ),
        (GraphRole::Position, "Pos", ColumnKind::Vec2, ColumnMeta::None),
        (GraphRole::Title, "Title", ColumnKind::Text, ColumnMeta::None),
        (
            GraphRole::ExecOutput,
            "ExecNext",
            ColumnKind::Relation,
            relation_meta(table.id),
        ),
    ];

    // Columns are planned against a scratch copy so later names see earlier ones
    let mut scratch = table.clone();
    for (role, name, kind, meta) in node_columns {
        if schema.column(role).is_some() {
            continue;
        }
        let column = fresh_column(&scratch, name, kind, meta);
        hints.set(role, column.id.clone());
        scratch.columns.push(column.clone());
        batch.push(DocCommand::AddColumn {
            table: table.id,
            column,
            index: None,
        });
    }

    let edge_roles = [
        (GraphRole::EdgeFromNode, "FromNode", ColumnKind::Relation),
        (GraphRole::EdgeFromPin, "FromPin", ColumnKind::Text),
        (GraphRole::EdgeToNode, "ToNode", ColumnKind::Relation),
        (GraphRole::EdgeToPin, "ToPin", ColumnKind::Text),
    ];
    let edge_meta = |kind: ColumnKind| match kind {
        ColumnKind::Relation => relation_meta(table.id),
        _ => ColumnMeta::None,
    };

    let existing_edges = schema.edge_table.and_then(|id| store.table(id));
    let edge_table_id = match existing_edges {
        Some(edges) => {
            let mut scratch = edges.clone();
            for (role, name, kind) in edge_roles {
                if schema.column(role).is_some() {
                    continue;
                }
                let column = fresh_column(&scratch, name, kind, edge_meta(kind));
                hints.set(role, column.id.clone());
                scratch.columns.push(column.clone());
                batch.push(DocCommand::AddColumn {
                    table: edges.id,
                    column,
                    index: None,
                });
            }
            edges.id
        }
        None => {
            let mut edges = Table::new(format!("{} Edges", table.name)).with_parent(table.id);
            for (role, name, kind) in edge_roles {
                let column = Column::new(name, name, kind).with_meta(edge_meta(kind));
                hints.set(role, column.id.clone());
                edges.columns.push(column);
            }
            let id = edges.id;
            tracing::debug!("Scaffold creates edge table '{}'", edges.name);
            batch.push(DocCommand::AddTable(edges));
            id
        }
    };

    if schema.edge_collection.is_none() {
        let column = fresh_column(
            &scratch,
            "Edges",
            ColumnKind::Subtable,
            ColumnMeta::Subtable {
                child: edge_table_id,
            },
        );
        hints.set(GraphRole::EdgeCollection, column.id.clone());
        batch.push(DocCommand::AddColumn {
            table: table.id,
            column,
            index: None,
        });
    }

    if batch.is_empty() {
        return None;
    }
    tracing::info!(
        "Planned scaffold for '{}': {} commands",
        table.name,
        batch.len()
    );
    Some(ScaffoldPlan { batch, hints })
}
