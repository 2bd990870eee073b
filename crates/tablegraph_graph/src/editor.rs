// SPDX-License-Identifier: MIT OR Apache-2.0
//! The graph editor facade.
//!
//! [`GraphEditor`] ties one view of a table to the document, the settings
//! store and an [`EditorSession`]. Each frame it builds a [`FrameModel`]
//! (schema, laid-out nodes, pins and wires), feeds input through the
//! interaction state machine and turns the resulting events into command
//! batches.

use crate::anchor::resolve_anchor;
use crate::connection::{is_marker_for, ConnectError, ConnectionEngine, PinKind};
use crate::interaction::{Camera, HitTarget, InputSnapshot, InteractionEvent, InteractionState};
use crate::layout::{LayoutContext, LayoutMetrics, NodeInput, SectionRegistry, TextMeasure};
use crate::pin::{PinDirection, PinId, PinRef};
use crate::scaffold::plan_scaffold;
use crate::schema::{resolve_schema, GraphRole, GraphSchema};
use crate::session::{ClipboardNode, EditorSession, ViewKey};
use crate::type_layout::{DisplayMode, NodeTypeLayout, TypeLayoutStore};
use crate::visual::{hit_test, NodeVisual, PinVisual, WireVisual};
use egui::{Pos2, Rect, Vec2};
use std::collections::{BTreeSet, HashMap, HashSet};
use tablegraph_document::{
    Cell, CellValue, Column, ColumnId, ColumnKind, ColumnMeta, CommandBatch, CommandExecutor,
    DocCommand, DocumentError, DocumentStore, Row, RowId, SettingsStore, Table, TableId,
};
use thiserror::Error;

/// Type name used for rows with an empty type cell
pub const UNTYPED: &str = "Untyped";

/// Offset of a pasted node from the paste position (world space)
pub const PASTE_OFFSET: f32 = 24.0;

/// Graph editor errors
#[derive(Debug, Error)]
pub enum EditorError {
    /// The node table no longer exists
    #[error("Table not found: {0}")]
    TableNotFound(TableId),

    /// Required graph columns are missing
    #[error("Graph schema is incomplete")]
    SchemaIncomplete,

    /// The node row no longer exists
    #[error("Node not found: {0}")]
    NodeNotFound(RowId),

    /// The column no longer exists
    #[error("Column not found: {0}")]
    ColumnNotFound(ColumnId),

    /// Text could not be read as the column kind
    #[error("'{text}' is not a valid {kind}")]
    InvalidValue {
        /// Entered text
        text: String,
        /// Column kind
        kind: &'static str,
    },

    /// Paste without a copied node
    #[error("Nothing to paste")]
    EmptyClipboard,

    /// Connection rule violation
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Document rejected a batch
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Result type for editor operations
pub type Result<T> = std::result::Result<T, EditorError>;

/// Everything needed to draw one frame of a complete graph
#[derive(Debug, Clone)]
pub struct GraphFrame {
    /// Resolved schema
    pub schema: GraphSchema,
    /// Canvas bounds (screen space)
    pub canvas: Rect,
    /// Camera used for this frame
    pub camera: Camera,
    /// Nodes in draw order
    pub nodes: Vec<NodeVisual>,
    /// Wires
    pub wires: Vec<WireVisual>,
    /// Node types offered by the create menu
    pub type_names: Vec<String>,
    /// Pin hit radius (unscaled)
    pub pin_radius: f32,
}

impl GraphFrame {
    /// Node by row id
    pub fn node(&self, row: RowId) -> Option<&NodeVisual> {
        self.nodes.iter().find(|n| n.row == row)
    }

    /// What `pointer` is over
    pub fn hit_test(&self, pointer: Pos2) -> HitTarget {
        hit_test(&self.nodes, pointer, self.canvas, self.pin_radius)
    }
}

/// What the editor can show for its table
#[derive(Debug, Clone)]
pub enum FrameModel {
    /// The table does not exist
    Missing,
    /// The table lacks required graph columns
    Incomplete {
        /// Roles without a column
        missing: Vec<GraphRole>,
    },
    /// A drawable graph
    Ready(GraphFrame),
}

/// One graph view of a node table
pub struct GraphEditor {
    key: ViewKey,
    /// Layout metrics
    pub metrics: LayoutMetrics,
    /// Custom embedded-table renderers
    pub sections: SectionRegistry,
}

impl GraphEditor {
    /// Create an editor for the `view` view of `table`
    pub fn new(table: TableId, view: impl Into<String>) -> Self {
        Self::with_key(ViewKey::new(table, view))
    }

    /// Create an editor for an explicit view key
    pub fn with_key(key: ViewKey) -> Self {
        Self {
            key,
            metrics: LayoutMetrics::default(),
            sections: SectionRegistry::new(),
        }
    }

    /// View key
    pub fn key(&self) -> &ViewKey {
        &self.key
    }

    /// Node table
    pub fn table(&self) -> TableId {
        self.key.table
    }

    /// Edit buffer key of a node title
    pub fn title_buffer_key(&self, node: RowId) -> String {
        format!("{}:title:{}", self.key, node)
    }

    /// Edit buffer key of a node cell
    pub fn cell_buffer_key(&self, node: RowId, column: &ColumnId) -> String {
        format!("{}:cell:{}:{}", self.key, node, column)
    }

    fn buffer_prefix(&self) -> String {
        format!("{}:", self.key)
    }

    // ========================================================================
    // Schema
    // ========================================================================

    /// Resolve the schema using stored hints, then persist the resolved ids
    /// as hints so later lookups stay stable across renames
    pub fn resolve<D: DocumentStore>(
        &self,
        doc: &D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
    ) -> Result<GraphSchema> {
        let table = doc
            .table(self.key.table)
            .ok_or(EditorError::TableNotFound(self.key.table))?;
        let layouts = session.layouts_mut(&self.key, &*settings);
        let schema = resolve_schema(doc, table, layouts.hints());
        layouts.merge_hints(&schema.hints());
        if schema.has_required_schema() {
            layouts.ensure_columns_covered(table, &schema);
        }
        layouts.save_if_dirty(settings);
        Ok(schema)
    }

    fn require<D: DocumentStore>(
        &self,
        doc: &D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
    ) -> Result<GraphSchema> {
        let schema = self.resolve(doc, settings, session)?;
        if !schema.has_required_schema() {
            return Err(EditorError::SchemaIncomplete);
        }
        Ok(schema)
    }

    /// Add every missing graph column in one undoable batch.
    ///
    /// Returns `false` when the schema was already complete.
    pub fn scaffold<D: DocumentStore + CommandExecutor>(
        &self,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
    ) -> Result<bool> {
        let schema = self.resolve(&*doc, settings, session)?;
        let table = doc
            .table(self.key.table)
            .ok_or(EditorError::TableNotFound(self.key.table))?;
        let Some(plan) = plan_scaffold(&*doc, table, &schema) else {
            return Ok(false);
        };
        doc.execute(plan.batch)?;
        let layouts = session.layouts_mut(&self.key, &*settings);
        layouts.merge_hints(&plan.hints);
        layouts.save_if_dirty(settings);
        tracing::info!("Scaffolded graph schema for {}", self.key);
        Ok(true)
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Build the frame model for the current document state
    pub fn prepare_frame<D: DocumentStore>(
        &self,
        doc: &D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        canvas: Rect,
        measure: &dyn TextMeasure,
    ) -> FrameModel {
        let Some(table) = doc.table(self.key.table) else {
            return FrameModel::Missing;
        };
        let schema = match self.resolve(doc, settings, session) {
            Ok(schema) => schema,
            Err(err) => {
                tracing::warn!("Failed to resolve schema for {}: {}", self.key, err);
                return FrameModel::Missing;
            }
        };
        if !schema.has_required_schema() {
            return FrameModel::Incomplete {
                missing: schema.missing_roles(),
            };
        }

        let type_layouts = {
            let layouts = session.layouts_mut(&self.key, &*settings);
            let mut type_layouts: HashMap<String, NodeTypeLayout> = HashMap::new();
            for row in &table.rows {
                let type_name = type_name_of(&schema, row);
                if !type_layouts.contains_key(&type_name) {
                    let layout = layouts.get_or_create(&type_name, table, &schema).clone();
                    type_layouts.insert(type_name, layout);
                }
            }
            layouts.save_if_dirty(settings);
            type_layouts
        };
        let type_names = self.type_names(table, &schema, session.layouts_mut(&self.key, &*settings));

        let view = session.view_mut(&self.key);
        let camera = view.camera;
        let selected = view.selected;
        let dragged = match view.state {
            InteractionState::DraggingNode { node, world, .. } => Some((node, world)),
            _ => None,
        };

        let engine = ConnectionEngine::new(doc, &schema);
        let edges = engine.edges();
        let exec_links = engine.exec_links();
        let mut connected_inputs: HashMap<RowId, HashSet<ColumnId>> = HashMap::new();
        let mut connected_outputs: HashSet<(RowId, String)> = HashSet::new();
        for edge in &edges {
            if let Some(to) = edge.to_node {
                connected_inputs
                    .entry(to)
                    .or_default()
                    .insert(ColumnId::from(edge.to_pin.as_str()));
            }
            if let Some(from) = edge.from_node {
                connected_outputs.insert((from, edge.from_pin.clone()));
            }
        }
        let exec_targets: HashSet<RowId> = exec_links.iter().map(|l| l.target).collect();
        let exec_sources: HashSet<&PinRef> = exec_links.iter().map(|l| &l.source).collect();

        let ctx = LayoutContext {
            store: doc,
            table,
            schema: &schema,
            metrics: &self.metrics,
            measure,
            sections: &self.sections,
        };
        let no_inputs = HashSet::new();
        let scale = camera.zoom;

        let mut nodes = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let type_name = type_name_of(&schema, row);
            let Some(type_layout) = type_layouts.get(&type_name) else {
                continue;
            };
            let world = match dragged {
                Some((node, world)) if node == row.id => world,
                _ => position_of(&schema, row),
            };
            let origin = camera.world_to_screen(world, canvas);
            let input = NodeInput {
                row,
                type_layout,
                connected_inputs: connected_inputs.get(&row.id).unwrap_or(&no_inputs),
            };
            let layout = ctx.layout_node(&input, scale);
            let rect = Rect::from_min_size(origin, Vec2::new(layout.width, layout.total_height));

            let pin = |pin: PinRef, kind: PinKind, label: String, connected: bool| PinVisual {
                anchor: resolve_anchor(&ctx, &input, origin, scale, &pin.pin),
                pin,
                kind,
                label,
                connected,
            };
            let mut pins = Vec::new();
            let exec_in = PinRef::exec_in(row.id);
            let exec_out = PinRef::exec_out(row.id);
            let exec_out_connected = exec_sources.contains(&exec_out);
            pins.push(pin(exec_in, PinKind::Execution, String::new(), exec_targets.contains(&row.id)));
            pins.push(pin(exec_out, PinKind::Execution, String::new(), exec_out_connected));

            for pin_row in &layout.pin_rows {
                if let Some(column) = pin_row.input.as_ref().and_then(|c| table.column(c)) {
                    pins.push(pin(
                        PinRef::input(row.id, column.id.clone()),
                        PinKind::Data(column.kind),
                        column.name.clone(),
                        pin_row.input_connected,
                    ));
                }
                if let Some(column) = pin_row.output.as_ref().and_then(|c| table.column(c)) {
                    let connected =
                        connected_outputs.contains(&(row.id, column.id.as_str().to_string()));
                    pins.push(pin(
                        PinRef::output(row.id, column.id.clone()),
                        PinKind::Data(column.kind),
                        column.name.clone(),
                        connected,
                    ));
                }
            }

            for setting in &layout.setting_rows {
                let Some(section) = &setting.section else {
                    continue;
                };
                if section.exec_column.is_none() {
                    continue;
                }
                let child_table = doc.table(section.child_table);
                for child in &section.child_rows {
                    let embedded = PinRef::embedded(row.id, setting.column.clone(), *child);
                    let connected = exec_sources.contains(&embedded);
                    let label = child_table
                        .and_then(|t| t.row(*child))
                        .map(|r| child_label(child_table, r))
                        .unwrap_or_default();
                    pins.push(pin(embedded, PinKind::Execution, label, connected));
                }
            }

            let title = schema
                .title
                .as_ref()
                .and_then(|c| row.value(c).as_text())
                .filter(|t| !t.is_empty())
                .unwrap_or(&type_name)
                .to_string();

            nodes.push(NodeVisual {
                row: row.id,
                type_name,
                title,
                world,
                rect,
                layout,
                pins,
                selected: selected == Some(row.id),
            });
        }

        let find = |id: Option<RowId>| id.and_then(|id| nodes.iter().find(|n| n.row == id));
        let mut wires = Vec::with_capacity(edges.len() + exec_links.len());
        for edge in &edges {
            let (Some(from), Some(to)) = (find(edge.from_node), find(edge.to_node)) else {
                continue;
            };
            let from_pin = PinId::Data(ColumnId::from(edge.from_pin.as_str()));
            let to_pin = PinId::Data(ColumnId::from(edge.to_pin.as_str()));
            let kind = table
                .column(&ColumnId::from(edge.from_pin.as_str()))
                .map_or(PinKind::Data(ColumnKind::Text), |c| PinKind::Data(c.kind));
            wires.push(WireVisual {
                from: from.anchor(&from_pin),
                to: to.anchor(&to_pin),
                kind,
            });
        }
        for link in &exec_links {
            let (Some(from), Some(to)) = (find(Some(link.source.node)), find(Some(link.target)))
            else {
                continue;
            };
            wires.push(WireVisual {
                from: from.anchor(&link.source.pin),
                to: to.anchor(&PinId::ExecIn),
                kind: PinKind::Execution,
            });
        }

        FrameModel::Ready(GraphFrame {
            schema,
            canvas,
            camera,
            nodes,
            wires,
            type_names,
            pin_radius: self.metrics.pin_radius,
        })
    }

    /// Node types offered by the create menu: select options, known
    /// layouts and types present in the table
    fn type_names(&self, table: &Table, schema: &GraphSchema, layouts: &TypeLayoutStore) -> Vec<String> {
        let mut names = BTreeSet::new();
        if let Some(column) = schema.type_column.as_ref().and_then(|c| table.column(c)) {
            names.extend(column.select_options().iter().cloned());
        }
        names.extend(layouts.type_names().map(str::to_string));
        names.extend(table.rows.iter().map(|row| type_name_of(schema, row)));
        names.into_iter().collect()
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Run one frame of input through the state machine and apply the
    /// resulting events
    pub fn process_input<D: DocumentStore + CommandExecutor>(
        &self,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        frame: &GraphFrame,
        input: &InputSnapshot,
        hit: &HitTarget,
    ) -> Vec<InteractionEvent> {
        let events = {
            let engine = ConnectionEngine::new(&*doc, &frame.schema);
            let node_origin = |node: RowId| frame.node(node).map(|n| n.world);
            let can_connect = |a: &PinRef, b: &PinRef| engine.can_connect(a, b);
            session
                .view_mut(&self.key)
                .handle_input(input, hit, frame.canvas, &node_origin, &can_connect)
        };
        self.apply_events(doc, settings, session, &events);
        events
    }

    /// Apply events, reporting failures in the view status
    pub fn apply_events<D: DocumentStore + CommandExecutor>(
        &self,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        events: &[InteractionEvent],
    ) {
        for event in events {
            if let Err(err) = self.apply_event(doc, settings, session, event) {
                tracing::warn!("{}: {:?} failed: {}", self.key, event, err);
                session.view_mut(&self.key).status = Some(err.to_string());
            }
        }
    }

    fn apply_event<D: DocumentStore + CommandExecutor>(
        &self,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        event: &InteractionEvent,
    ) -> Result<()> {
        match event {
            InteractionEvent::Connect { source, target } => {
                self.connect(doc, settings, session, source, target)
            }
            InteractionEvent::Disconnect(pin) => self.disconnect(doc, settings, session, pin),
            InteractionEvent::MoveNode { node, position } => {
                self.move_node(doc, settings, session, *node, *position)
            }
            InteractionEvent::BeginTitleEdit(node) => {
                let schema = self.require(&*doc, settings, session)?;
                let row = self.node_row(&*doc, *node)?;
                let title = schema
                    .title
                    .as_ref()
                    .and_then(|c| row.value(c).as_text())
                    .unwrap_or_default()
                    .to_string();
                session.set_buffer(&self.title_buffer_key(*node), title);
                Ok(())
            }
            InteractionEvent::CommitTitle(node) => {
                match session.take_buffer(&self.title_buffer_key(*node)) {
                    Some(text) => self.set_title(doc, settings, session, *node, &text),
                    None => Ok(()),
                }
            }
            InteractionEvent::BeginCellEdit { node, column } => {
                let text = self
                    .node_row(&*doc, *node)?
                    .cell(column)
                    .map(Cell::edit_text)
                    .unwrap_or_default();
                session.set_buffer(&self.cell_buffer_key(*node, column), text);
                Ok(())
            }
            InteractionEvent::CommitCell { node, column } => {
                match session.take_buffer(&self.cell_buffer_key(*node, column)) {
                    Some(text) => self.commit_cell_text(doc, settings, session, *node, column, &text),
                    None => Ok(()),
                }
            }
            InteractionEvent::CancelEdit => {
                session.clear_buffers(&self.buffer_prefix());
                Ok(())
            }
            InteractionEvent::Copy(node) => self.copy_node(&*doc, settings, session, *node),
            InteractionEvent::Paste { world } => {
                self.paste_node(doc, settings, session, *world).map(|_| ())
            }
            InteractionEvent::Delete(node) => self.delete_node(doc, settings, session, *node),
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    fn node_row<'d, D: DocumentStore>(&self, doc: &'d D, node: RowId) -> Result<&'d Row> {
        doc.table(self.key.table)
            .ok_or(EditorError::TableNotFound(self.key.table))?
            .row(node)
            .ok_or(EditorError::NodeNotFound(node))
    }

    /// Create a node of `type_name` at a world position
    pub fn create_node_at<D: DocumentStore + CommandExecutor>(
        &self,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        type_name: &str,
        world: Pos2,
    ) -> Result<RowId> {
        let schema = self.require(&*doc, settings, session)?;
        let (Some(type_column), Some(position)) = (&schema.type_column, &schema.position) else {
            return Err(EditorError::SchemaIncomplete);
        };
        {
            let table = doc
                .table(self.key.table)
                .ok_or(EditorError::TableNotFound(self.key.table))?;
            let layouts = session.layouts_mut(&self.key, &*settings);
            layouts.get_or_create(type_name, table, &schema);
            layouts.save_if_dirty(settings);
        }

        let mut row = Row::new()
            .with_value(type_column.clone(), CellValue::Text(type_name.to_string()))
            .with_value(position.clone(), CellValue::Vec2([world.x, world.y]));
        if let Some(title) = &schema.title {
            row = row.with_value(title.clone(), CellValue::Text(type_name.to_string()));
        }
        let id = row.id;
        doc.execute(CommandBatch::new(format!("Create {type_name} node")).with(
            DocCommand::AddRow {
                table: self.key.table,
                row,
                index: None,
            },
        ))?;
        session.view_mut(&self.key).selected = Some(id);
        tracing::debug!("Created {} node {} at {:?}", type_name, id, world);
        Ok(id)
    }

    /// Add a column to the node table and show it on `type_name` with
    /// `mode`. Subtable columns get a fresh child table with a label and an
    /// execution relation back into the node table.
    pub fn add_pin_column<D: DocumentStore + CommandExecutor>(
        &self,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        type_name: &str,
        name: &str,
        kind: ColumnKind,
        mode: DisplayMode,
    ) -> Result<ColumnId> {
        let schema = self.require(&*doc, settings, session)?;
        let table = doc
            .table(self.key.table)
            .ok_or(EditorError::TableNotFound(self.key.table))?;
        let id = table.unique_column_id(name);
        let column_name = table.unique_column_name(name);
        let mut batch = CommandBatch::new(format!("Add pin '{column_name}'"));
        let column = match kind {
            ColumnKind::Relation => Column::relation(id.clone(), column_name, table.id),
            ColumnKind::Subtable => {
                let child = Table::new(format!("{} {}", table.name, column_name))
                    .with_parent(table.id)
                    .with_column(Column::new("Label", "Label", ColumnKind::Text))
                    .with_column(Column::relation("Next", "Next", table.id));
                let child_id = child.id;
                batch.push(DocCommand::AddTable(child));
                Column::subtable(id.clone(), column_name, child_id)
            }
            ColumnKind::Select => Column::new(id.clone(), column_name, kind)
                .with_meta(ColumnMeta::Select { options: Vec::new() }),
            _ => Column::new(id.clone(), column_name, kind),
        };
        batch.push(DocCommand::AddColumn {
            table: self.key.table,
            column,
            index: None,
        });
        doc.execute(batch)?;

        let table = doc
            .table(self.key.table)
            .ok_or(EditorError::TableNotFound(self.key.table))?;
        let layouts = session.layouts_mut(&self.key, &*settings);
        layouts.get_or_create(type_name, table, &schema);
        layouts.ensure_columns_covered(table, &schema);
        layouts.set_mode(type_name, &id, mode);
        layouts.save_if_dirty(settings);
        tracing::debug!("Added {:?} column '{}' as {:?} of {}", kind, id, mode, type_name);
        Ok(id)
    }

    /// Change how a column is shown on nodes of `type_name`
    pub fn set_display_mode(
        &self,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        type_name: &str,
        column: &ColumnId,
        mode: DisplayMode,
    ) -> bool {
        let layouts = session.layouts_mut(&self.key, &*settings);
        let changed = layouts.set_mode(type_name, column, mode);
        layouts.save_if_dirty(settings);
        changed
    }

    /// Change the width of nodes of `type_name`
    pub fn set_node_width(
        &self,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        type_name: &str,
        width: f32,
    ) -> bool {
        let layouts = session.layouts_mut(&self.key, &*settings);
        let changed = layouts.set_width(type_name, width);
        layouts.save_if_dirty(settings);
        changed
    }

    /// Move a field of `type_name` to position `to_index`
    pub fn move_field(
        &self,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        type_name: &str,
        column: &ColumnId,
        to_index: usize,
    ) -> bool {
        let layouts = session.layouts_mut(&self.key, &*settings);
        let changed = layouts.move_field(type_name, column, to_index);
        layouts.save_if_dirty(settings);
        changed
    }

    /// Connect two pins
    pub fn connect<D: DocumentStore + CommandExecutor>(
        &self,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        a: &PinRef,
        b: &PinRef,
    ) -> Result<()> {
        let schema = self.require(&*doc, settings, session)?;
        for pin in [a, b] {
            self.require_exposed(&*doc, settings, session, &schema, pin)?;
        }
        let batch = ConnectionEngine::new(&*doc, &schema).try_connect(a, b)?;
        doc.execute(batch)?;
        tracing::debug!("Connected {} and {}", a, b);
        Ok(())
    }

    /// Reject data pins the node's type layout does not show in that
    /// direction. Unknown nodes are left to the connection rules.
    fn require_exposed<D: DocumentStore>(
        &self,
        doc: &D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        schema: &GraphSchema,
        pin: &PinRef,
    ) -> Result<()> {
        let PinId::Data(column) = &pin.pin else {
            return Ok(());
        };
        let table = doc
            .table(self.key.table)
            .ok_or(EditorError::TableNotFound(self.key.table))?;
        let Some(row) = table.row(pin.node) else {
            return Ok(());
        };
        let type_name = type_name_of(schema, row);
        let layouts = session.layouts_mut(&self.key, &*settings);
        let mode = layouts.get_or_create(&type_name, table, schema).mode(column);
        layouts.save_if_dirty(settings);

        let expected = match pin.direction {
            PinDirection::Input => DisplayMode::InputPin,
            PinDirection::Output => DisplayMode::OutputPin,
        };
        if mode != Some(expected) {
            tracing::debug!("{} is not shown as {:?} on '{}'", column, expected, type_name);
            return Err(ConnectError::PinNotFound(pin.pin.to_string()).into());
        }
        Ok(())
    }

    /// Remove every connection of a pin
    pub fn disconnect<D: DocumentStore + CommandExecutor>(
        &self,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        pin: &PinRef,
    ) -> Result<()> {
        let schema = self.require(&*doc, settings, session)?;
        let batch = ConnectionEngine::new(&*doc, &schema).disconnect(pin)?;
        if !batch.is_empty() {
            doc.execute(batch)?;
            tracing::debug!("Disconnected {}", pin);
        }
        Ok(())
    }

    /// Delete a node together with its connections
    pub fn delete_node<D: DocumentStore + CommandExecutor>(
        &self,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        node: RowId,
    ) -> Result<()> {
        let schema = self.require(&*doc, settings, session)?;
        let batch = ConnectionEngine::new(&*doc, &schema).delete_node(node)?;
        doc.execute(batch)?;
        let view = session.view_mut(&self.key);
        if view.selected == Some(node) {
            view.selected = None;
        }
        view.context_menu = None;
        tracing::debug!("Deleted node {}", node);
        Ok(())
    }

    /// Write a node position
    pub fn move_node<D: DocumentStore + CommandExecutor>(
        &self,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        node: RowId,
        position: [f32; 2],
    ) -> Result<()> {
        let schema = self.require(&*doc, settings, session)?;
        let column = schema.position.clone().ok_or(EditorError::SchemaIncomplete)?;
        self.node_row(&*doc, node)?;
        doc.execute(CommandBatch::new("Move node").with(DocCommand::SetCell {
            table: self.key.table,
            row: node,
            column,
            value: CellValue::Vec2(position),
        }))?;
        Ok(())
    }

    /// Write a node title. Does nothing when the table has no title column
    /// or the title is unchanged.
    pub fn set_title<D: DocumentStore + CommandExecutor>(
        &self,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        node: RowId,
        text: &str,
    ) -> Result<()> {
        let schema = self.require(&*doc, settings, session)?;
        let Some(column) = schema.title else {
            return Ok(());
        };
        let row = self.node_row(&*doc, node)?;
        if row.value(&column).as_text() == Some(text) {
            return Ok(());
        }
        doc.execute(CommandBatch::new("Rename node").with(DocCommand::SetCell {
            table: self.key.table,
            row: node,
            column,
            value: CellValue::Text(text.to_string()),
        }))?;
        Ok(())
    }

    /// Commit inline cell text. Text starting with `=` sets a formula;
    /// anything else is parsed as the column kind and clears any formula.
    pub fn commit_cell_text<D: DocumentStore + CommandExecutor>(
        &self,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        node: RowId,
        column: &ColumnId,
        text: &str,
    ) -> Result<()> {
        let schema = self.require(&*doc, settings, session)?;
        let kind = doc
            .column(self.key.table, column)
            .ok_or_else(|| EditorError::ColumnNotFound(column.clone()))?
            .kind;
        let row = self.node_row(&*doc, node)?;
        let cell = row.cell(column);
        if cell.map(Cell::edit_text).unwrap_or_default() == text {
            return Ok(());
        }
        let had_formula = cell.and_then(Cell::expression).is_some();

        let trimmed = text.trim();
        let mut batch = CommandBatch::new(format!("Edit {column}"));
        // An edited input no longer takes its value from an edge
        let engine = ConnectionEngine::new(&*doc, &schema);
        if engine.connected_inputs(node).contains(column) {
            let disconnect = engine.disconnect(&PinRef::input(node, column.clone()))?;
            for command in disconnect.commands {
                batch.push(command);
            }
        }
        if let Some(expression) = trimmed.strip_prefix('=') {
            batch.push(DocCommand::SetFormula {
                table: self.key.table,
                row: node,
                column: column.clone(),
                expression: Some(expression.trim().to_string()),
            });
        } else {
            let value = if trimmed.is_empty() {
                CellValue::Empty
            } else {
                CellValue::parse(kind, trimmed).ok_or_else(|| EditorError::InvalidValue {
                    text: trimmed.to_string(),
                    kind: kind.display_name(),
                })?
            };
            if had_formula {
                batch.push(DocCommand::SetFormula {
                    table: self.key.table,
                    row: node,
                    column: column.clone(),
                    expression: None,
                });
            }
            batch.push(DocCommand::SetCell {
                table: self.key.table,
                row: node,
                column: column.clone(),
                value,
            });
        }
        doc.execute(batch)?;
        Ok(())
    }

    /// Copy a node's type, title and non-reserved cells to the clipboard
    pub fn copy_node<D: DocumentStore>(
        &self,
        doc: &D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        node: RowId,
    ) -> Result<()> {
        let schema = self.require(doc, settings, session)?;
        let table = doc
            .table(self.key.table)
            .ok_or(EditorError::TableNotFound(self.key.table))?;
        let row = table.row(node).ok_or(EditorError::NodeNotFound(node))?;
        let cells = row
            .cells
            .iter()
            .filter(|(column, _)| !schema.is_reserved(column))
            .filter(|(column, _)| {
                table
                    .column(column)
                    .is_some_and(|c| c.kind != ColumnKind::Subtable)
            })
            .map(|(column, cell)| (column.clone(), cell.clone()))
            .collect();
        session.clipboard = Some(ClipboardNode {
            type_name: type_name_of(&schema, row),
            title: schema
                .title
                .as_ref()
                .and_then(|c| row.value(c).as_text())
                .map(str::to_string),
            cells,
        });
        session.view_mut(&self.key).status = Some("Copied node".to_string());
        Ok(())
    }

    /// Paste the clipboard node near a world position. Marker formulas are
    /// dropped since the copy has no incoming edges.
    pub fn paste_node<D: DocumentStore + CommandExecutor>(
        &self,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
        world: Pos2,
    ) -> Result<RowId> {
        let clip = session.clipboard.clone().ok_or(EditorError::EmptyClipboard)?;
        let schema = self.require(&*doc, settings, session)?;
        let (Some(type_column), Some(position)) = (&schema.type_column, &schema.position) else {
            return Err(EditorError::SchemaIncomplete);
        };
        let table = doc
            .table(self.key.table)
            .ok_or(EditorError::TableNotFound(self.key.table))?;

        let mut row = Row::new()
            .with_value(type_column.clone(), CellValue::Text(clip.type_name.clone()))
            .with_value(
                position.clone(),
                CellValue::Vec2([world.x + PASTE_OFFSET, world.y + PASTE_OFFSET]),
            );
        if let (Some(column), Some(title)) = (&schema.title, clip.title) {
            row = row.with_value(column.clone(), CellValue::Text(title));
        }
        for (column, mut cell) in clip.cells {
            if table.column(&column).is_none() {
                continue;
            }
            if cell.expression().is_some_and(|e| is_marker_for(e, &column)) {
                cell.formula = None;
            }
            row.cells.insert(column, cell);
        }
        let id = row.id;
        doc.execute(CommandBatch::new("Paste node").with(DocCommand::AddRow {
            table: self.key.table,
            row,
            index: None,
        }))?;
        session.view_mut(&self.key).selected = Some(id);
        Ok(id)
    }

    /// Undo the last batch, reporting it in the view status
    pub fn undo<D: CommandExecutor>(&self, doc: &mut D, session: &mut EditorSession) -> Result<String> {
        let description = doc.undo()?;
        session.view_mut(&self.key).status = Some(format!("Undo: {description}"));
        Ok(description)
    }

    /// Redo the last undone batch, reporting it in the view status
    pub fn redo<D: CommandExecutor>(&self, doc: &mut D, session: &mut EditorSession) -> Result<String> {
        let description = doc.redo()?;
        session.view_mut(&self.key).status = Some(format!("Redo: {description}"));
        Ok(description)
    }
}

/// Node type of a row
pub fn type_name_of(schema: &GraphSchema, row: &Row) -> String {
    schema
        .type_column
        .as_ref()
        .and_then(|c| row.value(c).as_text())
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTYPED)
        .to_string()
}

/// Node origin of a row (world space)
pub fn position_of(schema: &GraphSchema, row: &Row) -> Pos2 {
    schema
        .position
        .as_ref()
        .and_then(|c| row.value(c).as_vec2())
        .map_or(Pos2::ZERO, |[x, y]| Pos2::new(x, y))
}

/// Label of an embedded row: its first non-empty text cell
fn child_label(table: Option<&Table>, row: &Row) -> String {
    let Some(table) = table else {
        return String::new();
    };
    table
        .columns
        .iter()
        .filter(|c| c.kind.is_text())
        .find_map(|c| row.value(&c.id).as_text().filter(|t| !t.is_empty()))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::CharWidthMeasure;
    use crate::testing::{add_child_table, add_node, graph_document};
    use tablegraph_document::{Document, MemorySettings};

    fn canvas() -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(1200.0, 800.0))
    }

    fn ready(
        editor: &GraphEditor,
        doc: &Document,
        settings: &mut MemorySettings,
        session: &mut EditorSession,
    ) -> GraphFrame {
        match editor.prepare_frame(doc, settings, session, canvas(), &CharWidthMeasure::default()) {
            FrameModel::Ready(frame) => frame,
            other => panic!("expected a ready frame, got {other:?}"),
        }
    }

    fn edge_rows(doc: &Document, edges: TableId) -> Vec<(RowId, String, RowId, String)> {
        doc.table(edges)
            .unwrap()
            .rows
            .iter()
            .map(|row| {
                (
                    row.value(&"FromNode".into()).as_relation().unwrap(),
                    row.value(&"FromPin".into()).as_text().unwrap().to_string(),
                    row.value(&"ToNode".into()).as_relation().unwrap(),
                    row.value(&"ToPin".into()).as_text().unwrap().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_end_to_end_wiring() {
        let (mut doc, nodes, edges) = graph_document();
        let mut settings = MemorySettings::new();
        let mut session = EditorSession::new();
        let editor = GraphEditor::new(nodes, "graph");

        let a = editor
            .create_node_at(&mut doc, &mut settings, &mut session, "Start", Pos2::new(0.0, 0.0))
            .unwrap();
        let b = editor
            .create_node_at(&mut doc, &mut settings, &mut session, "Step", Pos2::new(300.0, 0.0))
            .unwrap();

        editor
            .connect(
                &mut doc,
                &mut settings,
                &mut session,
                &PinRef::exec_out(a),
                &PinRef::exec_in(b),
            )
            .unwrap();
        assert_eq!(
            doc.row(nodes, a).unwrap().value(&"ExecNext".into()).as_relation(),
            Some(b)
        );
        assert!(doc.table(edges).unwrap().rows.is_empty());

        let value = editor
            .add_pin_column(
                &mut doc,
                &mut settings,
                &mut session,
                "Start",
                "Value",
                ColumnKind::Number,
                DisplayMode::OutputPin,
            )
            .unwrap();
        let input = editor
            .add_pin_column(
                &mut doc,
                &mut settings,
                &mut session,
                "Step",
                "In",
                ColumnKind::Number,
                DisplayMode::InputPin,
            )
            .unwrap();

        editor
            .connect(
                &mut doc,
                &mut settings,
                &mut session,
                &PinRef::output(a, value.clone()),
                &PinRef::input(b, input.clone()),
            )
            .unwrap();
        assert_eq!(
            edge_rows(&doc, edges),
            vec![(a, "Value".to_string(), b, "In".to_string())]
        );
        assert_eq!(
            doc.row(nodes, b).unwrap().cell(&input).and_then(Cell::expression),
            Some("graph.in(\"In\")")
        );

        let frame = ready(&editor, &doc, &mut settings, &mut session);
        assert_eq!(frame.nodes.len(), 2);
        assert_eq!(frame.wires.len(), 2);
        assert!(frame.wires.iter().any(|w| w.kind == PinKind::Execution));
        let step = frame.node(b).unwrap();
        assert!(step.pin(&PinId::Data(input)).unwrap().connected);
    }

    #[test]
    fn test_incomplete_table_offers_scaffold() {
        let mut doc = Document::new();
        let table = doc.insert_table(Table::new("Story"));
        let mut settings = MemorySettings::new();
        let mut session = EditorSession::new();
        let editor = GraphEditor::new(table, "graph");

        let model = editor.prepare_frame(
            &doc,
            &mut settings,
            &mut session,
            canvas(),
            &CharWidthMeasure::default(),
        );
        assert!(matches!(model, FrameModel::Incomplete { ref missing } if missing.contains(&GraphRole::Type)));
        assert!(matches!(
            editor.create_node_at(&mut doc, &mut settings, &mut session, "Start", Pos2::ZERO),
            Err(EditorError::SchemaIncomplete)
        ));

        assert!(editor.scaffold(&mut doc, &mut settings, &mut session).unwrap());
        let frame = ready(&editor, &doc, &mut settings, &mut session);
        assert!(frame.nodes.is_empty());
        assert_eq!(frame.type_names, ["Start", "Step"]);

        // Hints survive a fresh session
        let mut fresh = EditorSession::new();
        let schema = editor.resolve(&doc, &mut settings, &mut fresh).unwrap();
        assert!(schema.has_required_schema());
    }

    #[test]
    fn test_missing_table() {
        let doc = Document::new();
        let mut settings = MemorySettings::new();
        let mut session = EditorSession::new();
        let editor = GraphEditor::new(TableId::new(), "graph");
        assert!(matches!(
            editor.prepare_frame(&doc, &mut settings, &mut session, canvas(), &CharWidthMeasure::default()),
            FrameModel::Missing
        ));
    }

    #[test]
    fn test_embedded_pins_fan_out() {
        let (mut doc, nodes, _) = graph_document();
        let owner = add_node(&mut doc, nodes, "Choice", [0.0, 0.0]);
        let target = add_node(&mut doc, nodes, "Step", [0.0, 400.0]);
        let child = add_child_table(&mut doc, nodes, "Options", owner, 2);
        let mut settings = MemorySettings::new();
        let mut session = EditorSession::new();
        let editor = GraphEditor::new(nodes, "graph");

        let frame = ready(&editor, &doc, &mut settings, &mut session);
        let embedded: Vec<_> = frame
            .node(owner)
            .unwrap()
            .pins
            .iter()
            .filter(|p| matches!(p.pin.pin, PinId::Embedded { .. }))
            .cloned()
            .collect();
        assert_eq!(embedded.len(), 2);
        assert_eq!(embedded[0].label, "Choice 0");
        assert!(embedded[0].anchor.x < embedded[1].anchor.x);
        assert_eq!(embedded[0].anchor.y, embedded[1].anchor.y);

        editor
            .connect(&mut doc, &mut settings, &mut session, &embedded[1].pin, &PinRef::exec_in(target))
            .unwrap();
        let child_rows = &doc.table(child).unwrap().rows;
        assert_eq!(child_rows[0].value(&"Next".into()).as_relation(), None);
        assert_eq!(child_rows[1].value(&"Next".into()).as_relation(), Some(target));
    }

    #[test]
    fn test_cell_commit_parses_and_sets_formulas() {
        let (mut doc, nodes, _) = graph_document();
        let node = add_node(&mut doc, nodes, "Step", [0.0, 0.0]);
        let mut settings = MemorySettings::new();
        let mut session = EditorSession::new();
        let editor = GraphEditor::new(nodes, "graph");
        let score = editor
            .add_pin_column(
                &mut doc,
                &mut settings,
                &mut session,
                "Step",
                "Score",
                ColumnKind::Number,
                DisplayMode::Setting,
            )
            .unwrap();

        editor.commit_cell_text(&mut doc, &mut settings, &mut session, node, &score, "=1 + 2").unwrap();
        let cell = doc.row(nodes, node).unwrap().cell(&score).cloned().unwrap();
        assert_eq!(cell.expression(), Some("1 + 2"));

        editor.commit_cell_text(&mut doc, &mut settings, &mut session, node, &score, " 42 ").unwrap();
        let cell = doc.row(nodes, node).unwrap().cell(&score).cloned().unwrap();
        assert_eq!(cell.expression(), None);
        assert_eq!(cell.value, CellValue::Number(42.0));

        let depth = doc.history().undo_depth();
        editor.commit_cell_text(&mut doc, &mut settings, &mut session, node, &score, "42").unwrap();
        assert_eq!(doc.history().undo_depth(), depth);

        assert!(matches!(
            editor.commit_cell_text(&mut doc, &mut settings, &mut session, node, &score, "many"),
            Err(EditorError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_connect_requires_pin_display_mode() {
        let (mut doc, nodes, edges) = graph_document();
        let mut settings = MemorySettings::new();
        let mut session = EditorSession::new();
        let editor = GraphEditor::new(nodes, "graph");
        let a = editor
            .create_node_at(&mut doc, &mut settings, &mut session, "Start", Pos2::ZERO)
            .unwrap();
        let b = editor
            .create_node_at(&mut doc, &mut settings, &mut session, "Step", Pos2::new(300.0, 0.0))
            .unwrap();
        let out = editor
            .add_pin_column(&mut doc, &mut settings, &mut session, "Start", "Out", ColumnKind::Number, DisplayMode::Setting)
            .unwrap();
        let input = editor
            .add_pin_column(&mut doc, &mut settings, &mut session, "Step", "In", ColumnKind::Number, DisplayMode::InputPin)
            .unwrap();

        let source = PinRef::output(a, out.clone());
        let target = PinRef::input(b, input.clone());
        assert!(matches!(
            editor.connect(&mut doc, &mut settings, &mut session, &source, &target),
            Err(EditorError::Connect(ConnectError::PinNotFound(_)))
        ));
        // Out is only a setting on Step
        assert!(matches!(
            editor.connect(&mut doc, &mut settings, &mut session, &PinRef::output(b, out.clone()), &PinRef::input(a, input.clone())),
            Err(EditorError::Connect(ConnectError::PinNotFound(_)))
        ));
        assert!(doc.table(edges).unwrap().rows.is_empty());

        editor.set_display_mode(&mut settings, &mut session, "Start", &out, DisplayMode::OutputPin);
        editor
            .connect(&mut doc, &mut settings, &mut session, &source, &target)
            .unwrap();
        assert_eq!(doc.table(edges).unwrap().rows.len(), 1);
    }

    #[test]
    fn test_cell_commit_on_connected_input_drops_edge() {
        let (mut doc, nodes, edges) = graph_document();
        let mut settings = MemorySettings::new();
        let mut session = EditorSession::new();
        let editor = GraphEditor::new(nodes, "graph");
        let a = editor
            .create_node_at(&mut doc, &mut settings, &mut session, "Start", Pos2::ZERO)
            .unwrap();
        let b = editor
            .create_node_at(&mut doc, &mut settings, &mut session, "Step", Pos2::new(300.0, 0.0))
            .unwrap();
        let out = editor
            .add_pin_column(&mut doc, &mut settings, &mut session, "Start", "Out", ColumnKind::Number, DisplayMode::OutputPin)
            .unwrap();
        let input = editor
            .add_pin_column(&mut doc, &mut settings, &mut session, "Step", "In", ColumnKind::Number, DisplayMode::InputPin)
            .unwrap();
        editor
            .connect(&mut doc, &mut settings, &mut session, &PinRef::output(a, out), &PinRef::input(b, input.clone()))
            .unwrap();
        let depth = doc.history().undo_depth();

        editor
            .commit_cell_text(&mut doc, &mut settings, &mut session, b, &input, "5")
            .unwrap();
        assert!(doc.table(edges).unwrap().rows.is_empty());
        let cell = doc.row(nodes, b).unwrap().cell(&input).cloned().unwrap();
        assert_eq!(cell.expression(), None);
        assert_eq!(cell.value, CellValue::Number(5.0));
        assert_eq!(doc.history().undo_depth(), depth + 1);

        editor.undo(&mut doc, &mut session).unwrap();
        assert_eq!(doc.table(edges).unwrap().rows.len(), 1);
        assert_eq!(
            doc.row(nodes, b).unwrap().cell(&input).and_then(Cell::expression),
            Some("graph.in(\"In\")")
        );
    }

    #[test]
    fn test_drag_commits_once_and_undoes() {
        let (mut doc, nodes, _) = graph_document();
        let node = add_node(&mut doc, nodes, "Step", [100.0, 100.0]);
        let mut settings = MemorySettings::new();
        let mut session = EditorSession::new();
        let editor = GraphEditor::new(nodes, "graph");

        let frame = ready(&editor, &doc, &mut settings, &mut session);
        let header = frame.node(node).unwrap().header_rect().center();
        let press = InputSnapshot {
            pointer: Some(header),
            primary_pressed: true,
            ..Default::default()
        };
        editor.process_input(&mut doc, &mut settings, &mut session, &frame, &press, &frame.hit_test(header));

        let moved = header + Vec2::new(50.0, 20.0);
        let hold = InputSnapshot {
            pointer: Some(moved),
            ..Default::default()
        };
        editor.process_input(&mut doc, &mut settings, &mut session, &frame, &hold, &frame.hit_test(moved));
        let dragged = ready(&editor, &doc, &mut settings, &mut session);
        assert_eq!(dragged.node(node).unwrap().world, Pos2::new(150.0, 120.0));
        assert_eq!(
            doc.row(nodes, node).unwrap().value(&"Pos".into()).as_vec2(),
            Some([100.0, 100.0])
        );

        let release = InputSnapshot {
            pointer: Some(moved),
            primary_released: true,
            ..Default::default()
        };
        let events = editor.process_input(&mut doc, &mut settings, &mut session, &dragged, &release, &dragged.hit_test(moved));
        assert_eq!(
            events,
            vec![InteractionEvent::MoveNode { node, position: [150.0, 120.0] }]
        );
        assert_eq!(
            doc.row(nodes, node).unwrap().value(&"Pos".into()).as_vec2(),
            Some([150.0, 120.0])
        );

        assert_eq!(editor.undo(&mut doc, &mut session).unwrap(), "Move node");
        assert_eq!(
            doc.row(nodes, node).unwrap().value(&"Pos".into()).as_vec2(),
            Some([100.0, 100.0])
        );
    }

    #[test]
    fn test_copy_paste_drops_markers() {
        let (mut doc, nodes, _) = graph_document();
        let mut settings = MemorySettings::new();
        let mut session = EditorSession::new();
        let editor = GraphEditor::new(nodes, "graph");
        let a = editor
            .create_node_at(&mut doc, &mut settings, &mut session, "Start", Pos2::ZERO)
            .unwrap();
        let b = editor
            .create_node_at(&mut doc, &mut settings, &mut session, "Step", Pos2::new(300.0, 0.0))
            .unwrap();
        let out = editor
            .add_pin_column(&mut doc, &mut settings, &mut session, "Start", "Out", ColumnKind::Number, DisplayMode::OutputPin)
            .unwrap();
        let input = editor
            .add_pin_column(&mut doc, &mut settings, &mut session, "Step", "In", ColumnKind::Number, DisplayMode::InputPin)
            .unwrap();
        editor
            .connect(&mut doc, &mut settings, &mut session, &PinRef::output(a, out), &PinRef::input(b, input.clone()))
            .unwrap();

        assert!(matches!(
            editor.paste_node(&mut doc, &mut settings, &mut session, Pos2::ZERO),
            Err(EditorError::EmptyClipboard)
        ));
        editor.copy_node(&doc, &mut settings, &mut session, b).unwrap();
        let pasted = editor
            .paste_node(&mut doc, &mut settings, &mut session, Pos2::new(10.0, 10.0))
            .unwrap();

        let row = doc.row(nodes, pasted).unwrap();
        assert_eq!(row.value(&"Type".into()).as_text(), Some("Step"));
        assert_eq!(row.value(&"Pos".into()).as_vec2(), Some([34.0, 34.0]));
        assert_eq!(row.cell(&input).and_then(Cell::expression), None);
        assert_eq!(session.view(editor.key()).unwrap().selected, Some(pasted));
    }

    #[test]
    fn test_failed_connect_sets_status() {
        let (mut doc, nodes, _) = graph_document();
        let node = add_node(&mut doc, nodes, "Step", [0.0, 0.0]);
        let mut settings = MemorySettings::new();
        let mut session = EditorSession::new();
        let editor = GraphEditor::new(nodes, "graph");

        editor.apply_events(
            &mut doc,
            &mut settings,
            &mut session,
            &[InteractionEvent::Connect {
                source: PinRef::exec_out(node),
                target: PinRef::exec_in(node),
            }],
        );
        assert!(session.view(editor.key()).unwrap().status.is_some());
        assert_eq!(doc.history().undo_depth(), 0);
    }

    #[test]
    fn test_title_edit_through_buffers() {
        let (mut doc, nodes, _) = graph_document();
        let node = add_node(&mut doc, nodes, "Step", [0.0, 0.0]);
        let mut settings = MemorySettings::new();
        let mut session = EditorSession::new();
        let editor = GraphEditor::new(nodes, "graph");

        editor.apply_events(&mut doc, &mut settings, &mut session, &[InteractionEvent::BeginTitleEdit(node)]);
        let key = editor.title_buffer_key(node);
        assert_eq!(session.buffer_mut(&key, String::new).as_str(), "Step");
        session.set_buffer(&key, "Intro".to_string());
        editor.apply_events(&mut doc, &mut settings, &mut session, &[InteractionEvent::CommitTitle(node)]);
        assert_eq!(
            doc.row(nodes, node).unwrap().value(&"Title".into()).as_text(),
            Some("Intro")
        );

        editor.apply_events(&mut doc, &mut settings, &mut session, &[InteractionEvent::BeginTitleEdit(node)]);
        editor.apply_events(&mut doc, &mut settings, &mut session, &[InteractionEvent::CancelEdit]);
        assert_eq!(session.take_buffer(&key), None);
    }

    #[test]
    fn test_delete_clears_selection() {
        let (mut doc, nodes, _) = graph_document();
        let mut settings = MemorySettings::new();
        let mut session = EditorSession::new();
        let editor = GraphEditor::new(nodes, "graph");
        let node = editor
            .create_node_at(&mut doc, &mut settings, &mut session, "Step", Pos2::ZERO)
            .unwrap();

        editor.delete_node(&mut doc, &mut settings, &mut session, node).unwrap();
        assert!(doc.row(nodes, node).is_none());
        assert_eq!(session.view(editor.key()).unwrap().selected, None);
        editor.undo(&mut doc, &mut session).unwrap();
        assert!(doc.row(nodes, node).is_some());
    }
}
