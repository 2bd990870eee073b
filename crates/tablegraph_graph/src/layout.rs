// SPDX-License-Identifier: MIT OR Apache-2.0
//! Variable-height node layout.
//!
//! A node is a header, then pin rows (inputs on the left paired with outputs
//! on the right), then full-width setting rows. Rows grow when their text
//! wraps and subtable settings reserve a preview block. The per-row height
//! functions here are shared with [`crate::anchor`], which must agree with the
//! layout to the pixel.

use crate::schema::{embedded_exec_column, GraphSchema};
use crate::type_layout::{DisplayMode, NodeTypeLayout};
use std::collections::{HashMap, HashSet};
use tablegraph_document::{Cell, Column, ColumnId, ColumnKind, DocumentStore, Row, RowId, Table, TableId};

/// Fixed measurements in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    /// Header height
    pub header_height: f32,
    /// Minimum row height
    pub row_height: f32,
    /// Gap after each row
    pub row_gap: f32,
    /// Label line above an expanded editor
    pub label_height: f32,
    /// Height of one wrapped text line
    pub line_height: f32,
    /// Padding around an expanded editor
    pub control_padding: f32,
    /// Space below the last row
    pub footer_padding: f32,
    /// Horizontal padding inside the node
    pub horizontal_padding: f32,
    /// Title line of a subtable block
    pub section_header: f32,
    /// Minimum list preview height
    pub section_min: f32,
    /// Maximum list preview height
    pub section_max: f32,
    /// Lane for embedded execution pins
    pub embedded_lane: f32,
    /// Distance of execution pins from the node edge
    pub exec_lane_offset: f32,
    /// Pin radius
    pub pin_radius: f32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            header_height: 28.0,
            row_height: 22.0,
            row_gap: 4.0,
            label_height: 16.0,
            line_height: 16.0,
            control_padding: 6.0,
            footer_padding: 8.0,
            horizontal_padding: 10.0,
            section_header: 18.0,
            section_min: 32.0,
            section_max: 160.0,
            embedded_lane: 14.0,
            exec_lane_offset: 4.0,
            pin_radius: 6.0,
        }
    }
}

/// Measures how many lines a text wraps to
pub trait TextMeasure {
    /// Number of lines `text` occupies at `wrap_width` (at least one)
    fn wrapped_line_count(&self, text: &str, wrap_width: f32) -> usize;
}

/// Fixed-advance measurement, for headless use and tests
#[derive(Debug, Clone, Copy)]
pub struct CharWidthMeasure {
    /// Advance of one character
    pub char_width: f32,
}

impl Default for CharWidthMeasure {
    fn default() -> Self {
        Self { char_width: 7.0 }
    }
}

impl TextMeasure for CharWidthMeasure {
    fn wrapped_line_count(&self, text: &str, wrap_width: f32) -> usize {
        let per_line = ((wrap_width / self.char_width).floor() as usize).max(1);
        text.split('\n')
            .map(|line| line.chars().count().div_ceil(per_line).max(1))
            .sum()
    }
}

/// Custom body for one subtable column
pub trait SectionRenderer {
    /// Body height in world units for the given rows
    fn section_height(&self, child: &Table, rows: &[&Row], width: f32) -> f32;

    /// Paint the body into `rect`
    fn paint(&self, painter: &egui::Painter, rect: egui::Rect, child: &Table, rows: &[&Row], scale: f32);
}

/// Section renderers keyed by subtable column
#[derive(Default)]
pub struct SectionRegistry {
    renderers: HashMap<ColumnId, Box<dyn SectionRenderer>>,
}

impl SectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a renderer for a column
    pub fn register(&mut self, column: impl Into<ColumnId>, renderer: Box<dyn SectionRenderer>) {
        self.renderers.insert(column.into(), renderer);
    }

    /// Renderer registered for a column
    pub fn get(&self, column: &ColumnId) -> Option<&dyn SectionRenderer> {
        self.renderers.get(column).map(|r| r.as_ref())
    }
}

/// Columns of a node split by display mode, in field order
#[derive(Debug, Clone, Default)]
pub struct FieldPartition<'a> {
    /// Input pins
    pub inputs: Vec<&'a Column>,
    /// Output pins
    pub outputs: Vec<&'a Column>,
    /// Inline settings
    pub settings: Vec<&'a Column>,
}

impl<'a> FieldPartition<'a> {
    /// Number of pin rows
    pub fn pin_row_count(&self) -> usize {
        self.inputs.len().max(self.outputs.len())
    }

    /// Input and output shown on pin row `index`
    pub fn pin_pair(&self, index: usize) -> (Option<&'a Column>, Option<&'a Column>) {
        (self.inputs.get(index).copied(), self.outputs.get(index).copied())
    }
}

/// Split the columns of `table` by the type's display modes, skipping
/// reserved columns, hidden fields and columns that no longer exist
pub fn partition_fields<'a>(
    table: &'a Table,
    layout: &NodeTypeLayout,
    schema: &GraphSchema,
) -> FieldPartition<'a> {
    let mut partition = FieldPartition::default();
    for field in &layout.fields {
        if schema.is_reserved(&field.column) {
            continue;
        }
        let Some(column) = table.column(&field.column) else {
            continue;
        };
        match field.mode {
            DisplayMode::InputPin => partition.inputs.push(column),
            DisplayMode::OutputPin => partition.outputs.push(column),
            DisplayMode::Setting => partition.settings.push(column),
            DisplayMode::Hidden => {}
        }
    }
    partition
}

/// Per-node inputs of the layout
#[derive(Debug, Clone, Copy)]
pub struct NodeInput<'a> {
    /// Node row
    pub row: &'a Row,
    /// Layout of the node's type
    pub type_layout: &'a NodeTypeLayout,
    /// Input columns with an incoming edge
    pub connected_inputs: &'a HashSet<ColumnId>,
}

/// Height of one row and whether it grew past the minimum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowExtent {
    /// Height in world units
    pub height: f32,
    /// Whether the row shows a label line above a multi-line editor
    pub expanded: bool,
}

/// Resolved subtable block of a setting row
#[derive(Debug, Clone, PartialEq)]
pub struct SectionLayout {
    /// Child table
    pub child_table: TableId,
    /// Rows owned by the node, in table order
    pub child_rows: Vec<RowId>,
    /// Execution relation of the child table, if it has one
    pub exec_column: Option<ColumnId>,
    /// Body height in world units
    pub body_height: f32,
    /// Whether a registered renderer supplies the body
    pub custom: bool,
}

/// Laid-out pin row, offsets relative to the node top
#[derive(Debug, Clone, PartialEq)]
pub struct PinRowLayout {
    /// Input column
    pub input: Option<ColumnId>,
    /// Output column
    pub output: Option<ColumnId>,
    /// Whether the input has an incoming edge (read-only)
    pub input_connected: bool,
    /// Top offset
    pub top: f32,
    /// Height
    pub height: f32,
    /// Whether the row is expanded
    pub expanded: bool,
}

/// Laid-out setting row, offsets relative to the node top
#[derive(Debug, Clone, PartialEq)]
pub struct SettingRowLayout {
    /// Column
    pub column: ColumnId,
    /// Top offset
    pub top: f32,
    /// Height
    pub height: f32,
    /// Whether the row is expanded
    pub expanded: bool,
    /// Subtable block, for subtable columns
    pub section: Option<SectionLayout>,
}

/// Complete layout of one node, scaled by the view zoom
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLayout {
    /// Width
    pub width: f32,
    /// Header height
    pub header_height: f32,
    /// Pin rows
    pub pin_rows: Vec<PinRowLayout>,
    /// Setting rows
    pub setting_rows: Vec<SettingRowLayout>,
    /// Total height
    pub total_height: f32,
    /// Zoom factor applied
    pub scale: f32,
}

/// Everything the layout needs besides the node itself
#[derive(Clone, Copy)]
pub struct LayoutContext<'a> {
    /// Document
    pub store: &'a dyn DocumentStore,
    /// Node table
    pub table: &'a Table,
    /// Resolved schema
    pub schema: &'a GraphSchema,
    /// Measurements
    pub metrics: &'a LayoutMetrics,
    /// Text measurement
    pub measure: &'a dyn TextMeasure,
    /// Custom subtable renderers
    pub sections: &'a SectionRegistry,
}

impl<'a> LayoutContext<'a> {
    /// Partition the fields of a node
    pub fn partition(&self, node: &NodeInput<'_>) -> FieldPartition<'a> {
        partition_fields(self.table, node.type_layout, self.schema)
    }

    /// Wrap width of a pin-row editor
    pub fn pin_wrap_width(&self, node: &NodeInput<'_>) -> f32 {
        (node.type_layout.width / 2.0 - self.metrics.horizontal_padding * 2.0).max(1.0)
    }

    /// Wrap width of a setting editor
    pub fn setting_wrap_width(&self, node: &NodeInput<'_>) -> f32 {
        (node.type_layout.width - self.metrics.horizontal_padding * 2.0).max(1.0)
    }

    fn editor_extent(&self, row: &Row, column: &Column, wrap_width: f32) -> RowExtent {
        let minimum = RowExtent {
            height: self.metrics.row_height,
            expanded: false,
        };
        if column.kind != ColumnKind::Text {
            return minimum;
        }
        let text = row.cell(&column.id).map(Cell::edit_text).unwrap_or_default();
        let lines = self.measure.wrapped_line_count(&text, wrap_width);
        if lines <= 1 {
            return minimum;
        }
        let expanded = self.metrics.label_height
            + lines as f32 * self.metrics.line_height
            + self.metrics.control_padding;
        RowExtent {
            height: expanded.max(self.metrics.row_height),
            expanded: true,
        }
    }

    /// Unscaled extent of a pin row
    pub fn pin_row_extent(
        &self,
        node: &NodeInput<'_>,
        input: Option<&Column>,
        output: Option<&Column>,
    ) -> RowExtent {
        let wrap = self.pin_wrap_width(node);
        let mut extent = RowExtent {
            height: self.metrics.row_height,
            expanded: false,
        };
        let input = input.filter(|c| !node.connected_inputs.contains(&c.id));
        for column in input.into_iter().chain(output) {
            let side = self.editor_extent(node.row, column, wrap);
            if side.height > extent.height {
                extent.height = side.height;
            }
            extent.expanded |= side.expanded;
        }
        extent
    }

    /// Subtable block of a setting column, `None` for other kinds or when
    /// the child table no longer exists
    pub fn section(&self, node: &NodeInput<'_>, column: &Column) -> Option<SectionLayout> {
        let child = self.store.table(column.subtable_child()?)?;
        let rows: Vec<&Row> = child.rows_of(node.row.id).collect();
        let (body_height, custom) = match self.sections.get(&column.id) {
            Some(renderer) => (
                renderer.section_height(child, &rows, node.type_layout.width),
                true,
            ),
            None => (
                (rows.len().max(1) as f32 * self.metrics.line_height)
                    .clamp(self.metrics.section_min, self.metrics.section_max),
                false,
            ),
        };
        Some(SectionLayout {
            child_table: child.id,
            child_rows: rows.iter().map(|r| r.id).collect(),
            exec_column: embedded_exec_column(child, self.table.id).map(|c| c.id.clone()),
            body_height,
            custom,
        })
    }

    /// Height of a resolved subtable block
    pub fn section_height(&self, section: &SectionLayout) -> f32 {
        let lane = if section.exec_column.is_some() {
            self.metrics.embedded_lane
        } else {
            0.0
        };
        self.metrics.section_header + section.body_height + lane
    }

    /// Unscaled extent of a setting row together with its subtable block
    pub fn setting_row_extent(
        &self,
        node: &NodeInput<'_>,
        column: &Column,
    ) -> (RowExtent, Option<SectionLayout>) {
        if column.kind == ColumnKind::Subtable {
            if let Some(section) = self.section(node, column) {
                let extent = RowExtent {
                    height: self.section_height(&section),
                    expanded: false,
                };
                return (extent, Some(section));
            }
        }
        let extent = self.editor_extent(node.row, column, self.setting_wrap_width(node));
        (extent, None)
    }

    /// Lay out a node at the given zoom
    pub fn layout_node(&self, node: &NodeInput<'_>, scale: f32) -> NodeLayout {
        let metrics = self.metrics;
        let partition = self.partition(node);
        let mut cursor = metrics.header_height;

        let mut pin_rows = Vec::with_capacity(partition.pin_row_count());
        for index in 0..partition.pin_row_count() {
            let (input, output) = partition.pin_pair(index);
            let extent = self.pin_row_extent(node, input, output);
            pin_rows.push(PinRowLayout {
                input: input.map(|c| c.id.clone()),
                output: output.map(|c| c.id.clone()),
                input_connected: input.is_some_and(|c| node.connected_inputs.contains(&c.id)),
                top: cursor * scale,
                height: extent.height * scale,
                expanded: extent.expanded,
            });
            cursor += extent.height + metrics.row_gap;
        }

        let mut setting_rows = Vec::with_capacity(partition.settings.len());
        for column in &partition.settings {
            let (extent, section) = self.setting_row_extent(node, column);
            setting_rows.push(SettingRowLayout {
                column: column.id.clone(),
                top: cursor * scale,
                height: extent.height * scale,
                expanded: extent.expanded,
                section,
            });
            cursor += extent.height + metrics.row_gap;
        }

        NodeLayout {
            width: node.type_layout.width * scale,
            header_height: metrics.header_height * scale,
            pin_rows,
            setting_rows,
            total_height: (cursor + metrics.footer_padding) * scale,
            scale,
        }
    }

    /// Unscaled total height of a node
    pub fn node_height(&self, node: &NodeInput<'_>) -> f32 {
        let metrics = self.metrics;
        let partition = self.partition(node);
        let mut height = metrics.header_height;
        for index in 0..partition.pin_row_count() {
            let (input, output) = partition.pin_pair(index);
            height += self.pin_row_extent(node, input, output).height + metrics.row_gap;
        }
        for column in &partition.settings {
            height += self.setting_row_extent(node, column).0.height + metrics.row_gap;
        }
        height + metrics.footer_padding
    }
}
