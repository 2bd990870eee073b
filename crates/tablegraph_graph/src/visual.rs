// SPDX-License-Identifier: MIT OR Apache-2.0
//! Screen-space node and wire geometry for one frame, plus hit-testing.

use crate::connection::PinKind;
use crate::interaction::HitTarget;
use crate::layout::NodeLayout;
use crate::pin::{PinId, PinRef};
use egui::{Pos2, Rect, Vec2};
use tablegraph_document::{ColumnId, RowId};

/// A pin as drawn this frame
#[derive(Debug, Clone, PartialEq)]
pub struct PinVisual {
    /// Pin
    pub pin: PinRef,
    /// Carried kind
    pub kind: PinKind,
    /// Anchor (screen space)
    pub anchor: Pos2,
    /// Label
    pub label: String,
    /// Whether any connection uses this pin
    pub connected: bool,
}

/// A node as drawn this frame
#[derive(Debug, Clone, PartialEq)]
pub struct NodeVisual {
    /// Node row
    pub row: RowId,
    /// Node type
    pub type_name: String,
    /// Title
    pub title: String,
    /// Origin (world space)
    pub world: Pos2,
    /// Bounds (screen space)
    pub rect: Rect,
    /// Layout at the current zoom
    pub layout: NodeLayout,
    /// Pins
    pub pins: Vec<PinVisual>,
    /// Whether the node is selected
    pub selected: bool,
}

impl NodeVisual {
    /// Header bounds
    pub fn header_rect(&self) -> Rect {
        Rect::from_min_size(
            self.rect.min,
            Vec2::new(self.rect.width(), self.layout.header_height),
        )
    }

    /// Pin by id
    pub fn pin(&self, pin: &PinId) -> Option<&PinVisual> {
        self.pins.iter().find(|p| p.pin.pin == *pin)
    }

    /// Anchor of a pin, or the header centre when it is not shown
    pub fn anchor(&self, pin: &PinId) -> Pos2 {
        self.pin(pin)
            .map(|p| p.anchor)
            .unwrap_or_else(|| self.header_rect().center())
    }

    /// Editable cell under `pointer`, if any
    pub fn widget_at(&self, pointer: Pos2) -> Option<ColumnId> {
        let top = self.rect.top();
        let in_row = |row_top: f32, height: f32| {
            pointer.y >= top + row_top && pointer.y <= top + row_top + height
        };
        for row in &self.layout.pin_rows {
            if !in_row(row.top, row.height) {
                continue;
            }
            return if pointer.x < self.rect.center().x {
                row.input.clone().filter(|_| !row.input_connected)
            } else {
                row.output.clone()
            };
        }
        self.layout
            .setting_rows
            .iter()
            .find(|row| row.section.is_none() && in_row(row.top, row.height))
            .map(|row| row.column.clone())
    }
}

/// A wire as drawn this frame
#[derive(Debug, Clone, PartialEq)]
pub struct WireVisual {
    /// Start (screen space)
    pub from: Pos2,
    /// End (screen space)
    pub to: Pos2,
    /// Carried kind
    pub kind: PinKind,
}

/// Find what `pointer` is over. Later nodes are drawn on top and win.
pub fn hit_test(nodes: &[NodeVisual], pointer: Pos2, canvas: Rect, pin_radius: f32) -> HitTarget {
    if !canvas.contains(pointer) {
        return HitTarget::Outside;
    }

    for node in nodes.iter().rev() {
        let reach = pin_radius * node.layout.scale + 2.0;
        if let Some(pin) = node.pins.iter().find(|p| p.anchor.distance(pointer) <= reach) {
            return HitTarget::Pin {
                pin: pin.pin.clone(),
                anchor: pin.anchor,
            };
        }
    }

    for node in nodes.iter().rev() {
        if !node.rect.contains(pointer) {
            continue;
        }
        if node.header_rect().contains(pointer) {
            return HitTarget::NodeHeader(node.row);
        }
        return match node.widget_at(pointer) {
            Some(column) => HitTarget::Widget {
                node: node.row,
                column,
            },
            None => HitTarget::NodeBody(node.row),
        };
    }

    HitTarget::Canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{PinRowLayout, SettingRowLayout};
    use tablegraph_document::ColumnKind;

    fn node(origin: Pos2) -> NodeVisual {
        let row = RowId::new();
        let layout = NodeLayout {
            width: 200.0,
            header_height: 28.0,
            pin_rows: vec![PinRowLayout {
                input: Some("In".into()),
                output: Some("Out".into()),
                input_connected: false,
                top: 28.0,
                height: 22.0,
                expanded: false,
            }],
            setting_rows: vec![SettingRowLayout {
                column: "Note".into(),
                top: 54.0,
                height: 22.0,
                expanded: false,
                section: None,
            }],
            total_height: 88.0,
            scale: 1.0,
        };
        NodeVisual {
            row,
            type_name: "Step".to_string(),
            title: "Step".to_string(),
            world: origin,
            rect: Rect::from_min_size(origin, Vec2::new(200.0, 88.0)),
            layout,
            pins: vec![PinVisual {
                pin: PinRef::input(row, "In"),
                kind: PinKind::Data(ColumnKind::Number),
                anchor: origin + Vec2::new(0.0, 39.0),
                label: "In".to_string(),
                connected: false,
            }],
            selected: false,
        }
    }

    fn canvas() -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(1000.0, 1000.0))
    }

    #[test]
    fn test_hit_regions() {
        let n = node(Pos2::new(100.0, 100.0));
        let nodes = vec![n.clone()];

        assert!(matches!(
            hit_test(&nodes, Pos2::new(101.0, 139.0), canvas(), 6.0),
            HitTarget::Pin { .. }
        ));
        assert_eq!(
            hit_test(&nodes, Pos2::new(150.0, 110.0), canvas(), 6.0),
            HitTarget::NodeHeader(n.row)
        );
        assert_eq!(
            hit_test(&nodes, Pos2::new(150.0, 140.0), canvas(), 6.0),
            HitTarget::Widget { node: n.row, column: "In".into() }
        );
        assert_eq!(
            hit_test(&nodes, Pos2::new(250.0, 140.0), canvas(), 6.0),
            HitTarget::Widget { node: n.row, column: "Out".into() }
        );
        assert_eq!(
            hit_test(&nodes, Pos2::new(150.0, 165.0), canvas(), 6.0),
            HitTarget::Widget { node: n.row, column: "Note".into() }
        );
        assert_eq!(
            hit_test(&nodes, Pos2::new(150.0, 185.0), canvas(), 6.0),
            HitTarget::NodeBody(n.row)
        );
        assert_eq!(hit_test(&nodes, Pos2::new(600.0, 600.0), canvas(), 6.0), HitTarget::Canvas);
        assert_eq!(hit_test(&nodes, Pos2::new(-5.0, 0.0), canvas(), 6.0), HitTarget::Outside);
    }

    #[test]
    fn test_connected_input_is_not_editable() {
        let mut n = node(Pos2::ZERO);
        n.layout.pin_rows[0].input_connected = true;
        assert_eq!(n.widget_at(Pos2::new(50.0, 40.0)), None);
    }

    #[test]
    fn test_topmost_node_wins() {
        let below = node(Pos2::new(100.0, 100.0));
        let above = node(Pos2::new(150.0, 100.0));
        let nodes = vec![below, above.clone()];
        assert_eq!(
            hit_test(&nodes, Pos2::new(200.0, 110.0), canvas(), 6.0),
            HitTarget::NodeHeader(above.row)
        );
    }

    #[test]
    fn test_hidden_pin_anchor_falls_back_to_header() {
        let n = node(Pos2::ZERO);
        assert_eq!(n.anchor(&PinId::ExecIn), Pos2::new(100.0, 14.0));
    }
}
