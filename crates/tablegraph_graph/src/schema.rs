// SPDX-License-Identifier: MIT OR Apache-2.0
//! Schema resolution: which columns play which graph role.
//!
//! Resolution is a pure function of the table. Each role is an ordered,
//! typed predicate: a column whose id matches the persisted hint wins,
//! otherwise the first column whose normalized name and kind match.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tablegraph_document::{Column, ColumnId, ColumnKind, DocumentStore, Table, TableId};

/// Semantic role a column can play in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GraphRole {
    /// Node type name
    Type,
    /// Node position on the canvas
    Position,
    /// Node title
    Title,
    /// Execution-output relation
    ExecOutput,
    /// Subtable holding the edge records
    EdgeCollection,
    /// Edge table: source node
    EdgeFromNode,
    /// Edge table: source pin
    EdgeFromPin,
    /// Edge table: target node
    EdgeToNode,
    /// Edge table: target pin
    EdgeToPin,
}

impl GraphRole {
    /// Display name of this role
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Type => "Type",
            Self::Position => "Position",
            Self::Title => "Title",
            Self::ExecOutput => "Execution output",
            Self::EdgeCollection => "Edge collection",
            Self::EdgeFromNode => "Edge from-node",
            Self::EdgeFromPin => "Edge from-pin",
            Self::EdgeToNode => "Edge to-node",
            Self::EdgeToPin => "Edge to-pin",
        }
    }

    /// Whether the graph cannot be edited without this role
    pub fn is_required(&self) -> bool {
        !matches!(self, Self::Title)
    }
}

/// Persisted best-effort mapping from role to column id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleHints {
    roles: BTreeMap<GraphRole, ColumnId>,
}

impl RoleHints {
    /// Create empty hints
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the hinted column for a role
    pub fn get(&self, role: GraphRole) -> Option<&ColumnId> {
        self.roles.get(&role)
    }

    /// Set the hinted column for a role
    pub fn set(&mut self, role: GraphRole, column: ColumnId) {
        self.roles.insert(role, column);
    }

    /// Merge newer hints in, returning whether anything changed
    pub fn merge(&mut self, other: &RoleHints) -> bool {
        let mut changed = false;
        for (role, column) in &other.roles {
            if self.roles.get(role) != Some(column) {
                self.roles.insert(*role, column.clone());
                changed = true;
            }
        }
        changed
    }

    /// Whether no hints are stored
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Typed predicate selecting the column for one role
#[derive(Debug, Clone, Copy)]
pub struct RolePredicate {
    /// Role this predicate resolves
    pub role: GraphRole,
    /// Required column kind
    pub kind: ColumnKind,
    /// Accepted normalized names
    pub names: &'static [&'static str],
}

impl RolePredicate {
    /// Whether the column has the expected kind
    pub fn matches_kind(&self, column: &Column) -> bool {
        column.kind == self.kind
    }

    /// Whether the column has the expected kind and one of the accepted names
    pub fn matches_name(&self, column: &Column) -> bool {
        let name = normalize_name(&column.name);
        self.matches_kind(column) && self.names.iter().any(|n| *n == name)
    }

    /// Resolve against a table: hinted id first, then name + kind
    pub fn resolve<'a>(&self, table: &'a Table, hints: &RoleHints) -> Option<&'a Column> {
        hints
            .get(self.role)
            .and_then(|id| table.column(id))
            .filter(|c| self.matches_kind(c))
            .or_else(|| table.columns.iter().find(|c| self.matches_name(c)))
    }
}

/// Node-table roles, in resolution order
pub const NODE_ROLES: [RolePredicate; 5] = [
    RolePredicate {
        role: GraphRole::Type,
        kind: ColumnKind::Select,
        names: &["type", "nodetype"],
    },
    RolePredicate {
        role: GraphRole::Position,
        kind: ColumnKind::Vec2,
        names: &["pos", "position"],
    },
    RolePredicate {
        role: GraphRole::Title,
        kind: ColumnKind::Text,
        names: &["title", "name"],
    },
    RolePredicate {
        role: GraphRole::ExecOutput,
        kind: ColumnKind::Relation,
        names: &["execnext", "next", "exec"],
    },
    RolePredicate {
        role: GraphRole::EdgeCollection,
        kind: ColumnKind::Subtable,
        names: &["edges", "connections"],
    },
];

/// Edge-table roles, in resolution order
pub const EDGE_ROLES: [RolePredicate; 4] = [
    RolePredicate {
        role: GraphRole::EdgeFromNode,
        kind: ColumnKind::Relation,
        names: &["fromnode", "from"],
    },
    RolePredicate {
        role: GraphRole::EdgeFromPin,
        kind: ColumnKind::Text,
        names: &["frompin"],
    },
    RolePredicate {
        role: GraphRole::EdgeToNode,
        kind: ColumnKind::Relation,
        names: &["tonode", "to"],
    },
    RolePredicate {
        role: GraphRole::EdgeToPin,
        kind: ColumnKind::Text,
        names: &["topin"],
    },
];

/// Lower-case a name and drop spaces, `_` and `-`
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// The four resolved edge-table columns
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeColumns {
    /// Edge table
    pub table: TableId,
    /// Source node relation
    pub from_node: ColumnId,
    /// Source pin id
    pub from_pin: ColumnId,
    /// Target node relation
    pub to_node: ColumnId,
    /// Target pin id
    pub to_pin: ColumnId,
}

/// Resolved graph roles of a node table.
///
/// Holds ids only; rebuilt every frame and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSchema {
    /// Node table
    pub node_table: TableId,
    /// Type column
    pub type_column: Option<ColumnId>,
    /// Position column
    pub position: Option<ColumnId>,
    /// Title column
    pub title: Option<ColumnId>,
    /// Execution-output column
    pub exec_output: Option<ColumnId>,
    /// Edge-collection column
    pub edge_collection: Option<ColumnId>,
    /// Edge table
    pub edge_table: Option<TableId>,
    /// Edge from-node column
    pub edge_from_node: Option<ColumnId>,
    /// Edge from-pin column
    pub edge_from_pin: Option<ColumnId>,
    /// Edge to-node column
    pub edge_to_node: Option<ColumnId>,
    /// Edge to-pin column
    pub edge_to_pin: Option<ColumnId>,
}

impl GraphSchema {
    /// A schema with nothing resolved
    pub fn empty(node_table: TableId) -> Self {
        Self {
            node_table,
            type_column: None,
            position: None,
            title: None,
            exec_output: None,
            edge_collection: None,
            edge_table: None,
            edge_from_node: None,
            edge_from_pin: None,
            edge_to_node: None,
            edge_to_pin: None,
        }
    }

    /// Column resolved for a role
    pub fn column(&self, role: GraphRole) -> Option<&ColumnId> {
        match role {
            GraphRole::Type => self.type_column.as_ref(),
            GraphRole::Position => self.position.as_ref(),
            GraphRole::Title => self.title.as_ref(),
            GraphRole::ExecOutput => self.exec_output.as_ref(),
            GraphRole::EdgeCollection => self.edge_collection.as_ref(),
            GraphRole::EdgeFromNode => self.edge_from_node.as_ref(),
            GraphRole::EdgeFromPin => self.edge_from_pin.as_ref(),
            GraphRole::EdgeToNode => self.edge_to_node.as_ref(),
            GraphRole::EdgeToPin => self.edge_to_pin.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: GraphRole) -> &mut Option<ColumnId> {
        match role {
            GraphRole::Type => &mut self.type_column,
            GraphRole::Position => &mut self.position,
            GraphRole::Title => &mut self.title,
            GraphRole::ExecOutput => &mut self.exec_output,
            GraphRole::EdgeCollection => &mut self.edge_collection,
            GraphRole::EdgeFromNode => &mut self.edge_from_node,
            GraphRole::EdgeFromPin => &mut self.edge_from_pin,
            GraphRole::EdgeToNode => &mut self.edge_to_node,
            GraphRole::EdgeToPin => &mut self.edge_to_pin,
        }
    }

    /// Required roles that did not resolve (the edge table counts as the
    /// edge-collection role when it is missing)
    pub fn missing_roles(&self) -> Vec<GraphRole> {
        let mut missing: Vec<GraphRole> = NODE_ROLES
            .iter()
            .chain(EDGE_ROLES.iter())
            .map(|p| p.role)
            .filter(|role| role.is_required() && self.column(*role).is_none())
            .collect();
        if self.edge_table.is_none() && !missing.contains(&GraphRole::EdgeCollection) {
            missing.push(GraphRole::EdgeCollection);
        }
        missing
    }

    /// Whether type, position, execution output, edge collection, edge table
    /// and all four edge columns resolved
    pub fn has_required_schema(&self) -> bool {
        self.missing_roles().is_empty()
    }

    /// Node-table columns owned by the graph itself
    pub fn reserved_columns(&self) -> Vec<&ColumnId> {
        NODE_ROLES
            .iter()
            .filter_map(|p| self.column(p.role))
            .collect()
    }

    /// Whether a node-table column is owned by the graph itself
    pub fn is_reserved(&self, column: &ColumnId) -> bool {
        NODE_ROLES
            .iter()
            .any(|p| self.column(p.role) == Some(column))
    }

    /// All four edge columns, if resolved
    pub fn edge_columns(&self) -> Option<EdgeColumns> {
        Some(EdgeColumns {
            table: self.edge_table?,
            from_node: self.edge_from_node.clone()?,
            from_pin: self.edge_from_pin.clone()?,
            to_node: self.edge_to_node.clone()?,
            to_pin: self.edge_to_pin.clone()?,
        })
    }

    /// Export the resolved ids as hints
    pub fn hints(&self) -> RoleHints {
        let mut hints = RoleHints::new();
        for predicate in NODE_ROLES.iter().chain(EDGE_ROLES.iter()) {
            if let Some(column) = self.column(predicate.role) {
                hints.set(predicate.role, column.clone());
            }
        }
        hints
    }
}

/// Resolve the graph roles of `table`.
///
/// Pure: callers persist [`GraphSchema::hints`] themselves.
pub fn resolve_schema(store: &dyn DocumentStore, table: &Table, hints: &RoleHints) -> GraphSchema {
    let mut schema = GraphSchema::empty(table.id);

    for predicate in &NODE_ROLES {
        *schema.slot_mut(predicate.role) = predicate.resolve(table, hints).map(|c| c.id.clone());
    }

    let edge_table = schema
        .edge_collection
        .as_ref()
        .and_then(|id| table.column(id))
        .and_then(Column::subtable_child)
        .and_then(|child| store.table(child))
        .or_else(|| find_edge_table(store, table));

    if let Some(edge_table) = edge_table {
        schema.edge_table = Some(edge_table.id);
        for predicate in &EDGE_ROLES {
            *schema.slot_mut(predicate.role) =
                predicate.resolve(edge_table, hints).map(|c| c.id.clone());
        }
    }

    schema
}

/// Find a child table of `table` exposing from-node and to-node relations
fn find_edge_table<'a>(store: &'a dyn DocumentStore, table: &Table) -> Option<&'a Table> {
    let from = &EDGE_ROLES[0];
    let to = &EDGE_ROLES[2];
    store.child_tables(table.id).into_iter().find(|child| {
        child.columns.iter().any(|c| from.matches_name(c))
            && child.columns.iter().any(|c| to.matches_name(c))
    })
}

/// The execution relation of an embedded child table: its first relation
/// column pointing back into the node table
pub fn embedded_exec_column(child: &Table, node_table: TableId) -> Option<&Column> {
    child
        .columns
        .iter()
        .find(|c| c.kind == ColumnKind::Relation && c.relation_target() == Some(node_table))
}
