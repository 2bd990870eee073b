// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sample document shown when no document is given.

use egui::Pos2;
use tablegraph_document::{
    CellValue, Column, ColumnKind, CommandBatch, CommandExecutor, DocCommand, Document,
    DocumentStore, Row, SettingsStore, Table, TableId,
};
use tablegraph_graph::editor::Result;
use tablegraph_graph::{DisplayMode, EditorSession, GraphEditor, PinRef};

/// Build a small story graph: a start node feeding a step with two choices.
///
/// The document is built through the editor operations and then reloaded,
/// so it starts with an empty undo history.
pub fn demo_document(
    settings: &mut dyn SettingsStore,
    session: &mut EditorSession,
) -> Result<(Document, TableId)> {
    let mut doc = Document::new();
    let table = doc.insert_table(
        Table::new("Story").with_column(Column::new("Notes", "Notes", ColumnKind::Text)),
    );
    let editor = GraphEditor::new(table, crate::app::GRAPH_VIEW);
    editor.scaffold(&mut doc, settings, session)?;

    let start = editor.create_node_at(&mut doc, settings, session, "Start", Pos2::new(-320.0, -120.0))?;
    let step = editor.create_node_at(&mut doc, settings, session, "Step", Pos2::new(0.0, -120.0))?;
    let left = editor.create_node_at(&mut doc, settings, session, "Step", Pos2::new(-160.0, 220.0))?;
    let right = editor.create_node_at(&mut doc, settings, session, "Step", Pos2::new(160.0, 220.0))?;
    editor.set_title(&mut doc, settings, session, left, "Go left")?;
    editor.set_title(&mut doc, settings, session, right, "Go right")?;

    let score = editor.add_pin_column(
        &mut doc,
        settings,
        session,
        "Start",
        "Score",
        ColumnKind::Number,
        DisplayMode::OutputPin,
    )?;
    let score_in = editor.add_pin_column(
        &mut doc,
        settings,
        session,
        "Step",
        "Score In",
        ColumnKind::Number,
        DisplayMode::InputPin,
    )?;
    let choices = editor.add_pin_column(
        &mut doc,
        settings,
        session,
        "Step",
        "Choices",
        ColumnKind::Subtable,
        DisplayMode::Setting,
    )?;
    editor.commit_cell_text(&mut doc, settings, session, start, &score, "10")?;
    editor.commit_cell_text(
        &mut doc,
        settings,
        session,
        start,
        &"Notes".into(),
        "Every row of the Story table is a node",
    )?;

    let mut choice_rows = Vec::new();
    if let Some(child) = doc.column(table, &choices).and_then(Column::subtable_child) {
        let mut batch = CommandBatch::new("Add choices");
        for label in ["Left", "Right"] {
            let row = Row::new()
                .with_parent(step)
                .with_value("Label", CellValue::Text(label.to_string()));
            choice_rows.push(row.id);
            batch.push(DocCommand::AddRow {
                table: child,
                row,
                index: None,
            });
        }
        doc.execute(batch)?;
    }

    editor.connect(&mut doc, settings, session, &PinRef::exec_out(start), &PinRef::exec_in(step))?;
    editor.connect(
        &mut doc,
        settings,
        session,
        &PinRef::output(start, score),
        &PinRef::input(step, score_in),
    )?;
    for (choice, target) in choice_rows.into_iter().zip([left, right]) {
        editor.connect(
            &mut doc,
            settings,
            session,
            &PinRef::embedded(step, choices.clone(), choice),
            &PinRef::exec_in(target),
        )?;
    }

    let doc = Document::from_ron(&doc.to_ron()?)?;
    tracing::info!("Built demo document");
    Ok((doc, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablegraph_document::MemorySettings;
    use tablegraph_graph::layout::CharWidthMeasure;
    use tablegraph_graph::FrameModel;

    #[test]
    fn test_demo_document_is_a_ready_graph() {
        let mut settings = MemorySettings::new();
        let mut session = EditorSession::new();
        let (doc, table) = demo_document(&mut settings, &mut session).unwrap();
        assert!(!doc.history().can_undo());

        let editor = GraphEditor::new(table, crate::app::GRAPH_VIEW);
        let canvas = egui::Rect::from_min_size(Pos2::ZERO, egui::vec2(1280.0, 720.0));
        let model = editor.prepare_frame(
            &doc,
            &mut settings,
            &mut session,
            canvas,
            &CharWidthMeasure::default(),
        );
        let FrameModel::Ready(frame) = model else {
            panic!("demo graph should be complete");
        };
        assert_eq!(frame.nodes.len(), 4);
        // exec start->step, data score, two embedded choices
        assert_eq!(frame.wires.len(), 4);
    }
}
