// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin anchor positions.
//!
//! Anchors are computed by walking the same partition and row-height
//! functions as [`crate::layout`], without building a full layout. Unknown
//! pins land on the header centre so wires always have an endpoint.

use crate::layout::{LayoutContext, NodeInput};
use crate::pin::PinId;
use egui::{Pos2, Vec2};
use tablegraph_document::{ColumnId, RowId};

/// Screen position of `pin` on a node whose top-left corner is at `origin`
pub fn resolve_anchor(
    ctx: &LayoutContext<'_>,
    node: &NodeInput<'_>,
    origin: Pos2,
    scale: f32,
    pin: &PinId,
) -> Pos2 {
    let metrics = ctx.metrics;
    let center_x = node.type_layout.width / 2.0;
    let offset = match pin {
        PinId::ExecIn => Some(Vec2::new(center_x, -metrics.exec_lane_offset)),
        PinId::ExecOut => Some(Vec2::new(
            center_x,
            ctx.node_height(node) + metrics.exec_lane_offset,
        )),
        PinId::Data(column) => data_offset(ctx, node, column),
        PinId::Embedded { column, row } => embedded_offset(ctx, node, column, *row),
    };
    let offset = offset.unwrap_or_else(|| Vec2::new(center_x, metrics.header_height / 2.0));
    origin + offset * scale
}

/// Header centre of a node whose top-left corner is at `origin`
pub fn header_center(ctx: &LayoutContext<'_>, node: &NodeInput<'_>, origin: Pos2, scale: f32) -> Pos2 {
    origin + Vec2::new(node.type_layout.width / 2.0, ctx.metrics.header_height / 2.0) * scale
}

fn data_offset(ctx: &LayoutContext<'_>, node: &NodeInput<'_>, column: &ColumnId) -> Option<Vec2> {
    let metrics = ctx.metrics;
    let partition = ctx.partition(node);
    let (index, x) = match partition.inputs.iter().position(|c| c.id == *column) {
        Some(index) => (index, 0.0),
        None => (
            partition.outputs.iter().position(|c| c.id == *column)?,
            node.type_layout.width,
        ),
    };

    let mut top = metrics.header_height;
    for row in 0..index {
        let (input, output) = partition.pin_pair(row);
        top += ctx.pin_row_extent(node, input, output).height + metrics.row_gap;
    }
    let (input, output) = partition.pin_pair(index);
    let extent = ctx.pin_row_extent(node, input, output);
    let y = if extent.expanded {
        top + metrics.label_height / 2.0
    } else {
        top + extent.height / 2.0
    };
    Some(Vec2::new(x, y))
}

fn embedded_offset(
    ctx: &LayoutContext<'_>,
    node: &NodeInput<'_>,
    column: &ColumnId,
    row: RowId,
) -> Option<Vec2> {
    let metrics = ctx.metrics;
    let partition = ctx.partition(node);

    let mut top = metrics.header_height;
    for index in 0..partition.pin_row_count() {
        let (input, output) = partition.pin_pair(index);
        top += ctx.pin_row_extent(node, input, output).height + metrics.row_gap;
    }

    for setting in &partition.settings {
        let (extent, section) = ctx.setting_row_extent(node, setting);
        if setting.id != *column {
            top += extent.height + metrics.row_gap;
            continue;
        }
        let section = section.filter(|s| s.exec_column.is_some())?;
        let index = section.child_rows.iter().position(|r| *r == row)?;
        let count = section.child_rows.len();
        let x = node.type_layout.width * (index + 1) as f32 / (count + 1) as f32;
        let y = top + metrics.section_header + section.body_height + metrics.embedded_lane / 2.0;
        return Some(Vec2::new(x, y));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{CharWidthMeasure, LayoutMetrics, SectionRegistry};
    use crate::schema::{resolve_schema, GraphSchema, RoleHints};
    use crate::testing::{add_child_table, add_column, graph_document};
    use crate::type_layout::{DisplayMode, FieldLayout, NodeTypeLayout};
    use std::collections::HashSet;
    use tablegraph_document::{CellValue, Column, ColumnKind, Document, DocumentStore, Row, TableId};

    struct Fixture {
        doc: Document,
        nodes: TableId,
        schema: GraphSchema,
        metrics: LayoutMetrics,
        measure: CharWidthMeasure,
        sections: SectionRegistry,
    }

    impl Fixture {
        fn new(owner: RowId, choices: usize) -> Self {
            let (mut doc, nodes, _) = graph_document();
            add_column(&mut doc, nodes, Column::new("A", "A", ColumnKind::Text));
            add_column(&mut doc, nodes, Column::new("B", "B", ColumnKind::Number));
            add_column(&mut doc, nodes, Column::new("Out", "Out", ColumnKind::Number));
            add_child_table(&mut doc, nodes, "Choices", owner, choices);
            let schema = resolve_schema(&doc, doc.table(nodes).unwrap(), &RoleHints::new());
            Self {
                doc,
                nodes,
                schema,
                metrics: LayoutMetrics::default(),
                measure: CharWidthMeasure::default(),
                sections: SectionRegistry::new(),
            }
        }

        fn ctx(&self) -> LayoutContext<'_> {
            LayoutContext {
                store: &self.doc,
                table: self.doc.table(self.nodes).unwrap(),
                schema: &self.schema,
                metrics: &self.metrics,
                measure: &self.measure,
                sections: &self.sections,
            }
        }
    }

    fn type_layout() -> NodeTypeLayout {
        let mut layout = NodeTypeLayout::new(200.0);
        layout.fields = [
            ("A", DisplayMode::InputPin),
            ("B", DisplayMode::InputPin),
            ("Out", DisplayMode::OutputPin),
            ("Choices", DisplayMode::Setting),
        ]
        .iter()
        .map(|(column, mode)| FieldLayout {
            column: (*column).into(),
            mode: *mode,
        })
        .collect();
        layout
    }

    fn owner_row(owner: RowId, text: &str) -> Row {
        Row::with_id(owner).with_value("A", CellValue::Text(text.to_string()))
    }

    #[test]
    fn test_data_anchors_match_layout_rows() {
        let owner = RowId::new();
        let fixture = Fixture::new(owner, 2);
        let layout = type_layout();
        let row = owner_row(owner, &"word ".repeat(12));
        let connected = HashSet::new();
        let node = NodeInput { row: &row, type_layout: &layout, connected_inputs: &connected };
        let origin = Pos2::new(100.0, 50.0);

        let ctx = fixture.ctx();
        let laid_out = ctx.layout_node(&node, 1.5);
        let m = fixture.metrics;

        let a = resolve_anchor(&ctx, &node, origin, 1.5, &PinId::Data("A".into()));
        let first = &laid_out.pin_rows[0];
        assert!(first.expanded);
        assert_eq!(a, Pos2::new(100.0, 50.0 + first.top + m.label_height / 2.0 * 1.5));

        let b = resolve_anchor(&ctx, &node, origin, 1.5, &PinId::Data("B".into()));
        let second = &laid_out.pin_rows[1];
        assert_eq!(b.x, 100.0);
        assert!((b.y - (50.0 + second.top + second.height / 2.0)).abs() < 1e-3);

        let out = resolve_anchor(&ctx, &node, origin, 1.5, &PinId::Data("Out".into()));
        assert_eq!(out.x, 100.0 + laid_out.width);
        assert_eq!(out.y, a.y);
    }

    #[test]
    fn test_exec_anchors() {
        let owner = RowId::new();
        let fixture = Fixture::new(owner, 0);
        let layout = type_layout();
        let row = owner_row(owner, "");
        let connected = HashSet::new();
        let node = NodeInput { row: &row, type_layout: &layout, connected_inputs: &connected };
        let ctx = fixture.ctx();
        let laid_out = ctx.layout_node(&node, 1.0);
        let m = fixture.metrics;

        let exec_in = resolve_anchor(&ctx, &node, Pos2::ZERO, 1.0, &PinId::ExecIn);
        let exec_out = resolve_anchor(&ctx, &node, Pos2::ZERO, 1.0, &PinId::ExecOut);
        assert_eq!(exec_in, Pos2::new(100.0, -m.exec_lane_offset));
        assert_eq!(exec_out, Pos2::new(100.0, laid_out.total_height + m.exec_lane_offset));
    }

    #[test]
    fn test_embedded_anchors_spread_along_lane() {
        let owner = RowId::new();
        let fixture = Fixture::new(owner, 3);
        let layout = type_layout();
        let row = owner_row(owner, "");
        let connected = HashSet::new();
        let node = NodeInput { row: &row, type_layout: &layout, connected_inputs: &connected };
        let ctx = fixture.ctx();
        let laid_out = ctx.layout_node(&node, 1.0);
        let m = fixture.metrics;

        let setting = &laid_out.setting_rows[0];
        let section = setting.section.as_ref().unwrap();
        let lane_y = setting.top + setting.height - m.embedded_lane / 2.0;
        for (index, child) in section.child_rows.iter().enumerate() {
            let pin = PinId::Embedded { column: "Choices".into(), row: *child };
            let anchor = resolve_anchor(&ctx, &node, Pos2::ZERO, 1.0, &pin);
            assert_eq!(anchor.x, 200.0 * (index + 1) as f32 / 4.0);
            assert!((anchor.y - lane_y).abs() < 1e-3);
        }
    }

    #[test]
    fn test_unknown_pins_fall_back_to_header_center() {
        let owner = RowId::new();
        let fixture = Fixture::new(owner, 1);
        let layout = type_layout();
        let row = owner_row(owner, "");
        let connected = HashSet::new();
        let node = NodeInput { row: &row, type_layout: &layout, connected_inputs: &connected };
        let ctx = fixture.ctx();
        let center = header_center(&ctx, &node, Pos2::ZERO, 1.0);

        let missing = resolve_anchor(&ctx, &node, Pos2::ZERO, 1.0, &PinId::Data("Gone".into()));
        let stale = PinId::Embedded { column: "Choices".into(), row: RowId::new() };
        assert_eq!(missing, center);
        assert_eq!(resolve_anchor(&ctx, &node, Pos2::ZERO, 1.0, &stale), center);
    }
}
