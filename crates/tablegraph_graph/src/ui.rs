// SPDX-License-Identifier: MIT OR Apache-2.0
//! egui rendering of a graph view.
//!
//! Features:
//! - Grid, bezier wires and variable-height nodes
//! - Inline title and cell editors bound to session buffers
//! - Create and context menus
//! - Scaffold prompt for tables without graph columns
//! - Type layout inspector

use crate::connection::PinKind;
use crate::editor::{type_name_of, FrameModel, GraphEditor, GraphFrame};
use crate::interaction::{HitTarget, InputSnapshot, InteractionEvent, InteractionState, Modifiers};
use crate::layout::TextMeasure;
use crate::schema::GraphRole;
use crate::pin::PinDirection;
use crate::session::EditorSession;
use crate::type_layout::{DisplayMode, MAX_NODE_WIDTH, MIN_NODE_WIDTH};
use crate::visual::{NodeVisual, WireVisual};
use egui::{Color32, Pos2, Rect, Stroke, Vec2};
use tablegraph_document::{ColumnId, ColumnKind, CommandExecutor, DocumentStore, SettingsStore};

/// Node visual parameters
const NODE_ROUNDING: f32 = 6.0;
const NODE_SHADOW_OFFSET: f32 = 3.0;
const BODY_FONT_SIZE: f32 = 12.0;
const LABEL_FONT_SIZE: f32 = 10.0;

/// Wire visual parameters
const BEZIER_CURVATURE: f32 = 50.0;
const CONNECTION_THICKNESS: f32 = 2.5;

/// Grid parameters
const GRID_SPACING: f32 = 20.0;

const STATUS_BAR_HEIGHT: f32 = 20.0;

/// Text measurement with egui fonts
pub struct EguiTextMeasure {
    ctx: egui::Context,
    font: egui::FontId,
}

impl EguiTextMeasure {
    /// Measure with the body font of `ctx`
    pub fn new(ctx: &egui::Context) -> Self {
        Self {
            ctx: ctx.clone(),
            font: egui::FontId::proportional(BODY_FONT_SIZE),
        }
    }
}

impl TextMeasure for EguiTextMeasure {
    fn wrapped_line_count(&self, text: &str, wrap_width: f32) -> usize {
        let galley = self.ctx.fonts(|fonts| {
            fonts.layout(text.to_owned(), self.font.clone(), Color32::WHITE, wrap_width)
        });
        galley.rows.len().max(1)
    }
}

/// Add-pin form state, kept in egui temp memory per view
#[derive(Debug, Clone)]
struct AddPinForm {
    name: String,
    kind: ColumnKind,
    mode: DisplayMode,
}

impl Default for AddPinForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: ColumnKind::Number,
            mode: DisplayMode::InputPin,
        }
    }
}

fn kind_color(kind: PinKind) -> Color32 {
    match kind {
        PinKind::Execution => Color32::from_gray(230),
        PinKind::Data(kind) => {
            let [r, g, b] = kind.color();
            Color32::from_rgb(r, g, b)
        }
    }
}

impl GraphEditor {
    /// Draw the graph view into the remaining space of `ui` and apply this
    /// frame's input
    pub fn ui<D: DocumentStore + CommandExecutor>(
        &self,
        ui: &mut egui::Ui,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
    ) {
        let full = ui.available_rect_before_wrap();
        let canvas = Rect::from_min_max(
            full.min,
            Pos2::new(full.max.x, full.max.y - STATUS_BAR_HEIGHT),
        );
        let response = ui.allocate_rect(full, egui::Sense::click_and_drag());
        let painter = ui.painter_at(full);
        painter.rect_filled(full, 0.0, Color32::from_rgb(28, 28, 30));

        let measure = EguiTextMeasure::new(ui.ctx());
        let frame = match self.prepare_frame(&*doc, settings, session, canvas, &measure) {
            FrameModel::Ready(frame) => frame,
            FrameModel::Missing => {
                painter.text(
                    canvas.center(),
                    egui::Align2::CENTER_CENTER,
                    "Table not found",
                    egui::FontId::proportional(14.0),
                    Color32::from_gray(160),
                );
                return;
            }
            FrameModel::Incomplete { missing } => {
                self.scaffold_prompt(ui, canvas, &missing, doc, settings, session);
                return;
            }
        };

        self.draw_grid(&painter, canvas, &frame);
        self.draw_wires(&painter, &frame);
        self.draw_pending_wire(&painter, &frame, session);
        self.draw_nodes(&painter, doc, &frame);

        let focus_lost = self.inline_editor(ui, &frame, session);
        let input = self.input_snapshot(ui, &response, focus_lost);
        let hit = self.hit_target(ui, &frame, &input);
        if let HitTarget::Pin { pin, .. } = &hit {
            response.clone().on_hover_text(pin.to_string());
        }
        self.process_input(doc, settings, session, &frame, &input, &hit);

        self.create_menu(ui, &frame, doc, settings, session);
        self.context_menu(ui, &frame, doc, settings, session);
        self.draw_status_bar(&painter, full, &frame, session);
    }

    fn scaffold_prompt<D: DocumentStore + CommandExecutor>(
        &self,
        ui: &mut egui::Ui,
        canvas: Rect,
        missing: &[GraphRole],
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
    ) {
        let names: Vec<&str> = missing.iter().map(|r| r.display_name()).collect();
        egui::Area::new(egui::Id::new(("tablegraph-scaffold", self.key().to_string())))
            .fixed_pos(canvas.center() - Vec2::new(140.0, 40.0))
            .show(ui.ctx(), |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_width(280.0);
                    ui.label("This table is not a graph yet.");
                    ui.label(format!("Missing: {}", names.join(", ")));
                    if ui.button("Create graph columns").clicked() {
                        if let Err(err) = self.scaffold(doc, settings, session) {
                            tracing::error!("Scaffold failed: {}", err);
                            session.view_mut(self.key()).status = Some(err.to_string());
                        }
                    }
                    if let Some(status) = session.view(self.key()).and_then(|v| v.status.as_ref()) {
                        ui.colored_label(Color32::from_rgb(230, 120, 100), status);
                    }
                });
            });
    }

    // ========================================================================
    // Input
    // ========================================================================

    fn input_snapshot(&self, ui: &egui::Ui, response: &egui::Response, focus_lost: bool) -> InputSnapshot {
        let text_focused = ui.ctx().memory(|m| m.focused().is_some());
        ui.input(|i| {
            let mut input = InputSnapshot {
                pointer: i.pointer.hover_pos(),
                primary_pressed: i.pointer.primary_pressed(),
                primary_released: i.pointer.primary_released(),
                secondary_pressed: i.pointer.secondary_pressed(),
                middle_pressed: i.pointer.button_pressed(egui::PointerButton::Middle),
                middle_released: i.pointer.button_released(egui::PointerButton::Middle),
                double_clicked: response.double_clicked(),
                scroll_delta: if response.hovered() { i.raw_scroll_delta.y } else { 0.0 },
                modifiers: Modifiers {
                    ctrl: i.modifiers.command,
                    shift: i.modifiers.shift,
                    alt: i.modifiers.alt,
                },
                enter: i.key_pressed(egui::Key::Enter),
                escape: i.key_pressed(egui::Key::Escape),
                delete: false,
                copy: false,
                paste: false,
                text_focus_lost: focus_lost,
            };
            if !text_focused {
                input.delete = i.key_pressed(egui::Key::Delete);
                for event in &i.events {
                    match event {
                        egui::Event::Copy => input.copy = true,
                        egui::Event::Paste(_) => input.paste = true,
                        _ => {}
                    }
                }
            }
            input
        })
    }

    fn hit_target(&self, ui: &egui::Ui, frame: &GraphFrame, input: &InputSnapshot) -> HitTarget {
        let Some(pointer) = input.pointer else {
            return HitTarget::Outside;
        };
        let inline = self.inline_area_id();
        let over_other_layer = ui
            .ctx()
            .layer_id_at(pointer)
            .is_some_and(|layer| layer != ui.layer_id() && layer.id != inline);
        if over_other_layer {
            return HitTarget::Outside;
        }
        frame.hit_test(pointer)
    }

    fn inline_area_id(&self) -> egui::Id {
        egui::Id::new(("tablegraph-inline", self.key().to_string()))
    }

    /// Draw the active inline editor. Returns whether it lost focus.
    fn inline_editor(&self, ui: &egui::Ui, frame: &GraphFrame, session: &mut EditorSession) -> bool {
        let state = session.view_mut(self.key()).state.clone();
        let (rect, key, initial) = match &state {
            InteractionState::EditingTitle { node } => {
                let Some(visual) = frame.node(*node) else {
                    return false;
                };
                (visual.header_rect(), self.title_buffer_key(*node), visual.title.clone())
            }
            InteractionState::EditingFormula { node, column } => {
                let Some(rect) = frame.node(*node).and_then(|v| widget_rect(v, column)) else {
                    return false;
                };
                (rect, self.cell_buffer_key(*node, column), String::new())
            }
            _ => return false,
        };

        let mut lost = false;
        egui::Area::new(self.inline_area_id())
            .order(egui::Order::Foreground)
            .fixed_pos(rect.min)
            .show(ui.ctx(), |ui| {
                let buffer = session.buffer_mut(&key, || initial);
                let edit = egui::TextEdit::singleline(buffer)
                    .desired_width(rect.width())
                    .font(egui::FontId::proportional(BODY_FONT_SIZE * frame.camera.zoom));
                let response = ui.add(edit);
                if response.lost_focus() {
                    lost = true;
                } else if !response.has_focus() {
                    response.request_focus();
                }
            });
        lost
    }

    // ========================================================================
    // Menus
    // ========================================================================

    fn create_menu<D: DocumentStore + CommandExecutor>(
        &self,
        ui: &egui::Ui,
        frame: &GraphFrame,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
    ) {
        let InteractionState::CreateMenuOpen { world, screen } = session.view_mut(self.key()).state
        else {
            return;
        };
        let mut chosen: Option<String> = None;
        let mut paste = false;
        let has_clipboard = session.clipboard.is_some();
        egui::Area::new(egui::Id::new(("tablegraph-create", self.key().to_string())))
            .order(egui::Order::Foreground)
            .fixed_pos(screen)
            .show(ui.ctx(), |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(egui::RichText::new("Create node").strong());
                    ui.separator();
                    for name in &frame.type_names {
                        if ui.button(name).clicked() {
                            chosen = Some(name.clone());
                        }
                    }
                    if has_clipboard {
                        ui.separator();
                        paste = ui.button("Paste").clicked();
                    }
                });
            });

        if chosen.is_none() && !paste {
            return;
        }
        session.view_mut(self.key()).close_create_menu();
        let result = match chosen {
            Some(type_name) => self
                .create_node_at(doc, settings, session, &type_name, world)
                .map(|_| ()),
            None => self.paste_node(doc, settings, session, world).map(|_| ()),
        };
        if let Err(err) = result {
            tracing::warn!("Create menu action failed: {}", err);
            session.view_mut(self.key()).status = Some(err.to_string());
        }
    }

    fn context_menu<D: DocumentStore + CommandExecutor>(
        &self,
        ui: &egui::Ui,
        frame: &GraphFrame,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
    ) {
        let Some(menu) = session.view_mut(self.key()).context_menu else {
            return;
        };
        let Some(node) = frame.node(menu.node) else {
            session.view_mut(self.key()).context_menu = None;
            return;
        };

        let mut events = Vec::new();
        egui::Area::new(egui::Id::new(("tablegraph-context", self.key().to_string())))
            .order(egui::Order::Foreground)
            .fixed_pos(menu.screen)
            .show(ui.ctx(), |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(egui::RichText::new(&node.title).strong());
                    ui.separator();
                    if ui.button("Copy").clicked() {
                        events.push(InteractionEvent::Copy(node.row));
                    }
                    if ui.button("Disconnect all").clicked() {
                        events.extend(
                            node.pins
                                .iter()
                                .filter(|p| p.connected)
                                .map(|p| InteractionEvent::Disconnect(p.pin.clone())),
                        );
                    }
                    if ui.button("Delete").clicked() {
                        events.push(InteractionEvent::Delete(node.row));
                    }
                });
            });

        if !events.is_empty() {
            session.view_mut(self.key()).context_menu = None;
            self.apply_events(doc, settings, session, &events);
        }
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    fn draw_grid(&self, painter: &egui::Painter, rect: Rect, frame: &GraphFrame) {
        let camera = frame.camera;
        let spacing = GRID_SPACING * camera.zoom;
        let major_spacing = spacing * 5.0;
        let minor = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 60, 60, 100));
        let major = Stroke::new(1.0, Color32::from_rgba_unmultiplied(80, 80, 80, 150));

        let origin = camera.world_to_screen(Pos2::ZERO, rect);
        for (step, stroke) in [(spacing, minor), (major_spacing, major)] {
            let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
            while x < rect.right() {
                painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
                x += step;
            }
            let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
            while y < rect.bottom() {
                painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
                y += step;
            }
        }
    }

    fn draw_wires(&self, painter: &egui::Painter, frame: &GraphFrame) {
        for wire in &frame.wires {
            draw_wire(painter, wire, frame.camera.zoom);
        }
    }

    fn draw_pending_wire(&self, painter: &egui::Painter, frame: &GraphFrame, session: &mut EditorSession) {
        let InteractionState::DraggingWire { source, anchor, pointer } = &session.view_mut(self.key()).state
        else {
            return;
        };
        let kind = frame
            .node(source.node)
            .and_then(|n| n.pin(&source.pin))
            .map_or(PinKind::Execution, |p| p.kind);
        let (from, to) = match source.direction {
            PinDirection::Output => (*anchor, *pointer),
            PinDirection::Input => (*pointer, *anchor),
        };
        draw_wire(painter, &WireVisual { from, to, kind }, frame.camera.zoom);
    }

    fn draw_nodes<D: DocumentStore>(&self, painter: &egui::Painter, doc: &D, frame: &GraphFrame) {
        let zoom = frame.camera.zoom;
        let body_font = egui::FontId::proportional(BODY_FONT_SIZE * zoom);
        let label_font = egui::FontId::proportional(LABEL_FONT_SIZE * zoom);
        let padding = self.metrics.horizontal_padding * zoom;
        let table = doc.table(self.table());

        for node in &frame.nodes {
            if !node.rect.intersects(frame.canvas) {
                continue;
            }
            let rect = node.rect;
            let rounding = NODE_ROUNDING * zoom;
            painter.rect_filled(
                rect.translate(Vec2::splat(NODE_SHADOW_OFFSET)),
                rounding,
                Color32::from_rgba_unmultiplied(0, 0, 0, 60),
            );
            painter.rect_filled(rect, rounding, Color32::from_rgb(45, 45, 48));

            let header = node.header_rect();
            painter.rect_filled(
                header,
                egui::Rounding {
                    nw: rounding,
                    ne: rounding,
                    sw: 0.0,
                    se: 0.0,
                },
                Color32::from_rgb(70, 100, 130),
            );
            painter.text(
                header.center(),
                egui::Align2::CENTER_CENTER,
                &node.title,
                body_font.clone(),
                Color32::WHITE,
            );

            let row = table.and_then(|t| t.row(node.row));
            let cell_text = |column: &ColumnId| {
                row.and_then(|r| r.cell(column))
                    .map(|c| c.edit_text())
                    .unwrap_or_default()
            };
            let column_name = |column: &ColumnId| {
                table
                    .and_then(|t| t.column(column))
                    .map_or_else(|| column.to_string(), |c| c.name.clone())
            };

            for pin_row in &node.layout.pin_rows {
                let top = rect.top() + pin_row.top;
                let label_y = top + (self.metrics.label_height * zoom).min(pin_row.height) / 2.0;
                if let Some(column) = &pin_row.input {
                    painter.text(
                        Pos2::new(rect.left() + padding, label_y),
                        egui::Align2::LEFT_CENTER,
                        column_name(column),
                        label_font.clone(),
                        Color32::from_gray(200),
                    );
                    if !pin_row.input_connected && pin_row.expanded {
                        draw_wrapped(
                            painter,
                            Rect::from_min_size(
                                Pos2::new(rect.left() + padding, label_y + 6.0 * zoom),
                                Vec2::new(rect.width() / 2.0 - padding * 2.0, pin_row.height),
                            ),
                            cell_text(column),
                            label_font.clone(),
                        );
                    }
                }
                if let Some(column) = &pin_row.output {
                    painter.text(
                        Pos2::new(rect.right() - padding, label_y),
                        egui::Align2::RIGHT_CENTER,
                        column_name(column),
                        label_font.clone(),
                        Color32::from_gray(200),
                    );
                }
            }

            for setting in &node.layout.setting_rows {
                let row_rect = Rect::from_min_size(
                    Pos2::new(rect.left() + padding, rect.top() + setting.top),
                    Vec2::new(rect.width() - padding * 2.0, setting.height),
                );
                match &setting.section {
                    Some(section) => {
                        let header_height = self.metrics.section_header * zoom;
                        painter.text(
                            row_rect.left_top() + Vec2::new(0.0, header_height / 2.0),
                            egui::Align2::LEFT_CENTER,
                            format!("{} ({})", column_name(&setting.column), section.child_rows.len()),
                            label_font.clone(),
                            Color32::from_gray(170),
                        );
                        let body = Rect::from_min_size(
                            row_rect.left_top() + Vec2::new(0.0, header_height),
                            Vec2::new(row_rect.width(), section.body_height * zoom),
                        );
                        painter.rect_filled(body, 2.0 * zoom, Color32::from_rgb(38, 38, 40));
                        let child = doc.table(section.child_table);
                        let child_rows: Vec<_> = section
                            .child_rows
                            .iter()
                            .filter_map(|id| child.and_then(|t| t.row(*id)))
                            .collect();
                        match (self.sections.get(&setting.column), child) {
                            (Some(renderer), Some(child)) if section.custom => {
                                renderer.paint(painter, body, child, &child_rows, zoom);
                            }
                            _ => {
                                let line = self.metrics.line_height * zoom;
                                for (i, child_row) in child_rows.iter().enumerate() {
                                    let y = body.top() + line * (i as f32 + 0.5);
                                    if y > body.bottom() {
                                        break;
                                    }
                                    let label = child
                                        .and_then(|t| t.columns.iter().find(|c| c.kind.is_text()))
                                        .and_then(|c| child_row.value(&c.id).as_text())
                                        .unwrap_or("-")
                                        .to_string();
                                    painter.text(
                                        Pos2::new(body.left() + 4.0 * zoom, y),
                                        egui::Align2::LEFT_CENTER,
                                        label,
                                        label_font.clone(),
                                        Color32::from_gray(190),
                                    );
                                }
                            }
                        }
                    }
                    None => {
                        let text = format!("{}: {}", column_name(&setting.column), cell_text(&setting.column));
                        draw_wrapped(painter, row_rect, text, label_font.clone());
                    }
                }
            }

            if node.selected {
                painter.rect_stroke(rect, rounding, Stroke::new(2.0, Color32::from_rgb(100, 150, 255)));
            }

            let radius = self.metrics.pin_radius * zoom;
            for pin in &node.pins {
                let color = kind_color(pin.kind);
                if pin.pin.pin.is_execution() {
                    // Downward triangle, following the flow
                    let points = vec![
                        pin.anchor + Vec2::new(-radius, -radius),
                        pin.anchor + Vec2::new(radius, -radius),
                        pin.anchor + Vec2::new(0.0, radius),
                    ];
                    let fill = if pin.connected { color } else { Color32::from_gray(70) };
                    painter.add(egui::Shape::convex_polygon(points, fill, Stroke::new(1.0, color)));
                } else {
                    if pin.connected {
                        painter.circle_filled(pin.anchor, radius, color);
                    } else {
                        painter.circle_filled(pin.anchor, radius, Color32::from_gray(40));
                    }
                    painter.circle_stroke(pin.anchor, radius, Stroke::new(1.5, color));
                }
            }
        }
    }

    fn draw_status_bar(
        &self,
        painter: &egui::Painter,
        rect: Rect,
        frame: &GraphFrame,
        session: &mut EditorSession,
    ) {
        let bar = Rect::from_min_max(Pos2::new(rect.left(), rect.bottom() - STATUS_BAR_HEIGHT), rect.max);
        painter.rect_filled(bar, 0.0, Color32::from_rgb(35, 35, 38));
        let view = session.view_mut(self.key());
        let mut text = format!(
            "Nodes: {} | Wires: {} | Zoom: {:.0}%",
            frame.nodes.len(),
            frame.wires.len(),
            frame.camera.zoom * 100.0,
        );
        if let Some(status) = &view.status {
            text.push_str(" | ");
            text.push_str(status);
        }
        painter.text(
            bar.left_center() + Vec2::new(5.0, 0.0),
            egui::Align2::LEFT_CENTER,
            text,
            egui::FontId::proportional(11.0),
            Color32::from_gray(150),
        );
    }

    // ========================================================================
    // Inspector
    // ========================================================================

    /// Type layout inspector for the selected node. Draw it before
    /// [`GraphEditor::ui`] so open dropdowns suppress canvas shortcuts.
    pub fn inspector_ui<D: DocumentStore + CommandExecutor>(
        &self,
        ui: &mut egui::Ui,
        doc: &mut D,
        settings: &mut dyn SettingsStore,
        session: &mut EditorSession,
    ) {
        let mut dropdown_open = false;
        let schema = match self.resolve(&*doc, settings, session) {
            Ok(schema) if schema.has_required_schema() => schema,
            _ => {
                ui.label("No graph");
                session.view_mut(self.key()).dropdown_open = false;
                return;
            }
        };
        let selected = session.view_mut(self.key()).selected;
        let Some(table) = doc.table(self.table()) else {
            session.view_mut(self.key()).dropdown_open = false;
            return;
        };
        let Some(type_name) = selected
            .and_then(|node| table.row(node))
            .map(|row| type_name_of(&schema, row))
        else {
            ui.label("Select a node to edit its type layout");
            session.view_mut(self.key()).dropdown_open = false;
            return;
        };

        ui.heading(&type_name);
        let layout = session
            .layouts_mut(self.key(), &*settings)
            .get_or_create(&type_name, table, &schema)
            .clone();

        let mut width = layout.width;
        let mut new_width = None;
        if ui
            .add(egui::Slider::new(&mut width, MIN_NODE_WIDTH..=MAX_NODE_WIDTH).text("Width"))
            .changed()
        {
            new_width = Some(width);
        }

        ui.separator();
        let mut mode_changes = Vec::new();
        let mut field_move = None;
        let field_count = layout.fields.len();
        egui::Grid::new(("tablegraph-fields", self.key().to_string()))
            .num_columns(3)
            .striped(true)
            .show(ui, |ui| {
                for (index, field) in layout.fields.iter().enumerate() {
                    let name = table
                        .column(&field.column)
                        .map_or_else(|| field.column.to_string(), |c| c.name.clone());
                    ui.label(name);
                    let mut mode = field.mode;
                    let combo = egui::ComboBox::from_id_salt(("tablegraph-mode", field.column.as_str()))
                        .selected_text(mode.display_name())
                        .show_ui(ui, |ui| {
                            for option in DisplayMode::all() {
                                ui.selectable_value(&mut mode, *option, option.display_name());
                            }
                        });
                    dropdown_open |= combo.inner.is_some();
                    if mode != field.mode {
                        mode_changes.push((field.column.clone(), mode));
                    }
                    ui.horizontal(|ui| {
                        if ui.add_enabled(index > 0, egui::Button::new("▲").small()).clicked() {
                            field_move = Some((field.column.clone(), index - 1));
                        }
                        if ui
                            .add_enabled(index + 1 < field_count, egui::Button::new("▼").small())
                            .clicked()
                        {
                            field_move = Some((field.column.clone(), index + 1));
                        }
                    });
                    ui.end_row();
                }
            });

        ui.separator();
        ui.label(egui::RichText::new("Add pin").strong());
        let form_id = egui::Id::new(("tablegraph-add-pin", self.key().to_string()));
        let mut form: AddPinForm = ui.data_mut(|d| d.get_temp(form_id).unwrap_or_default());
        ui.text_edit_singleline(&mut form.name);
        let kind_combo = egui::ComboBox::from_id_salt(("tablegraph-add-kind", self.key().to_string()))
            .selected_text(form.kind.display_name())
            .show_ui(ui, |ui| {
                for kind in ColumnKind::all() {
                    ui.selectable_value(&mut form.kind, *kind, kind.display_name());
                }
            });
        dropdown_open |= kind_combo.inner.is_some();
        let mode_combo = egui::ComboBox::from_id_salt(("tablegraph-add-mode", self.key().to_string()))
            .selected_text(form.mode.display_name())
            .show_ui(ui, |ui| {
                for mode in DisplayMode::all() {
                    ui.selectable_value(&mut form.mode, *mode, mode.display_name());
                }
            });
        dropdown_open |= mode_combo.inner.is_some();
        let add = ui
            .add_enabled(!form.name.trim().is_empty(), egui::Button::new("Add"))
            .clicked();

        if let Some(width) = new_width {
            self.set_node_width(settings, session, &type_name, width);
        }
        for (column, mode) in mode_changes {
            self.set_display_mode(settings, session, &type_name, &column, mode);
        }
        if let Some((column, to_index)) = field_move {
            self.move_field(settings, session, &type_name, &column, to_index);
        }
        if add {
            let name = form.name.trim().to_string();
            match self.add_pin_column(doc, settings, session, &type_name, &name, form.kind, form.mode) {
                Ok(_) => form.name.clear(),
                Err(err) => {
                    tracing::warn!("Adding pin '{}' failed: {}", name, err);
                    session.view_mut(self.key()).status = Some(err.to_string());
                }
            }
        }
        ui.data_mut(|d| d.insert_temp(form_id, form));
        session.view_mut(self.key()).dropdown_open = dropdown_open;
    }
}

/// Screen bounds of the editor for `column` on `node`
fn widget_rect(node: &NodeVisual, column: &ColumnId) -> Option<Rect> {
    let rect = node.rect;
    let half = rect.width() / 2.0;
    for row in &node.layout.pin_rows {
        let top = rect.top() + row.top;
        if row.input.as_ref() == Some(column) {
            return Some(Rect::from_min_size(Pos2::new(rect.left(), top), Vec2::new(half, row.height)));
        }
        if row.output.as_ref() == Some(column) {
            return Some(Rect::from_min_size(
                Pos2::new(rect.left() + half, top),
                Vec2::new(half, row.height),
            ));
        }
    }
    node.layout
        .setting_rows
        .iter()
        .find(|row| row.column == *column && row.section.is_none())
        .map(|row| {
            Rect::from_min_size(
                Pos2::new(rect.left(), rect.top() + row.top),
                Vec2::new(rect.width(), row.height),
            )
        })
}

fn draw_wrapped(painter: &egui::Painter, rect: Rect, text: String, font: egui::FontId) {
    let galley = painter.layout(text, font, Color32::from_gray(180), rect.width().max(1.0));
    painter.with_clip_rect(rect).galley(rect.min, galley, Color32::from_gray(180));
}

/// Data wires leave pins horizontally, execution wires vertically
fn draw_wire(painter: &egui::Painter, wire: &WireVisual, zoom: f32) {
    let (from, to) = (wire.from, wire.to);
    let (ctrl1, ctrl2) = match wire.kind {
        PinKind::Execution => {
            let curvature = (BEZIER_CURVATURE * zoom).min((to.y - from.y).abs().max(20.0 * zoom));
            (
                Pos2::new(from.x, from.y + curvature),
                Pos2::new(to.x, to.y - curvature),
            )
        }
        PinKind::Data(_) => {
            let curvature = (BEZIER_CURVATURE * zoom).min((to.x - from.x).abs() * 0.5);
            (
                Pos2::new(from.x + curvature, from.y),
                Pos2::new(to.x - curvature, to.y),
            )
        }
    };
    let stroke = Stroke::new(CONNECTION_THICKNESS * zoom, kind_color(wire.kind));
    let points = bezier_points(from, ctrl1, ctrl2, to, 32);
    for pair in points.windows(2) {
        painter.line_segment([pair[0], pair[1]], stroke);
    }
}

/// Generate points along a cubic bezier curve
fn bezier_points(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, segments: usize) -> Vec<Pos2> {
    let mut points = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        points.push(Pos2::new(
            a * p0.x + b * p1.x + c * p2.x + d * p3.x,
            a * p0.y + b * p1.y + c * p2.y + d * p3.y,
        ));
    }
    points
}
