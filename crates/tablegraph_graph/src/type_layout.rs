// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per node-type display configuration.
//!
//! Each node type decides, per column, whether it shows as an input pin, an
//! output pin, an inline setting, or not at all. The configuration is stored
//! as one JSON blob per (table, view) in the project settings, together with
//! the resolved role hints.

use crate::schema::{GraphSchema, RoleHints};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tablegraph_document::{ColumnId, SettingsStore, Table};

/// Current layout blob version
pub const LAYOUT_VERSION: u32 = 1;

/// Default node width in world units
pub const DEFAULT_NODE_WIDTH: f32 = 220.0;

/// Narrowest allowed node width
pub const MIN_NODE_WIDTH: f32 = 140.0;

/// Widest allowed node width
pub const MAX_NODE_WIDTH: f32 = 640.0;

/// How a column is presented on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayMode {
    /// Pin on the left edge with an inline editor
    InputPin,
    /// Pin on the right edge
    OutputPin,
    /// Full-width inline editor below the pins
    #[default]
    Setting,
    /// Not shown
    Hidden,
}

impl DisplayMode {
    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::InputPin => "Input pin",
            Self::OutputPin => "Output pin",
            Self::Setting => "Setting",
            Self::Hidden => "Hidden",
        }
    }

    /// All modes
    pub fn all() -> &'static [DisplayMode] {
        &[Self::InputPin, Self::OutputPin, Self::Setting, Self::Hidden]
    }
}

/// Display mode of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLayout {
    /// Column
    pub column: ColumnId,
    /// Presentation
    pub mode: DisplayMode,
}

/// Layout of one node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTypeLayout {
    /// Node width in world units
    pub width: f32,
    /// Ordered field list
    pub fields: Vec<FieldLayout>,
}

impl NodeTypeLayout {
    /// Create an empty layout
    pub fn new(width: f32) -> Self {
        Self {
            width,
            fields: Vec::new(),
        }
    }

    /// Mode of a column, if it is listed
    pub fn mode(&self, column: &ColumnId) -> Option<DisplayMode> {
        self.fields.iter().find(|f| f.column == *column).map(|f| f.mode)
    }

    /// Columns shown with the given mode, in field order
    pub fn columns_with(&self, mode: DisplayMode) -> impl Iterator<Item = &ColumnId> {
        self.fields
            .iter()
            .filter(move |f| f.mode == mode)
            .map(|f| &f.column)
    }

    /// Drop fields for missing or reserved columns and append new columns as
    /// settings. Returns whether anything changed.
    fn reconcile(&mut self, table: &Table, schema: &GraphSchema) -> bool {
        let before = self.fields.len();
        self.fields
            .retain(|f| table.column(&f.column).is_some() && !schema.is_reserved(&f.column));
        let mut changed = self.fields.len() != before;

        for column in &table.columns {
            if schema.is_reserved(&column.id) || self.mode(&column.id).is_some() {
                continue;
            }
            self.fields.push(FieldLayout {
                column: column.id.clone(),
                mode: DisplayMode::Setting,
            });
            changed = true;
        }
        changed
    }
}

/// Persisted layout configuration of one (table, view)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeLayoutBlob {
    /// Format version
    pub version: u32,
    /// Width used for new types
    pub width_default: f32,
    /// Layouts by type name
    pub types: IndexMap<String, NodeTypeLayout>,
    /// Role hints from the last schema resolution
    #[serde(default)]
    pub hints: RoleHints,
}

impl Default for TypeLayoutBlob {
    fn default() -> Self {
        Self {
            version: LAYOUT_VERSION,
            width_default: DEFAULT_NODE_WIDTH,
            types: IndexMap::new(),
            hints: RoleHints::default(),
        }
    }
}

/// Loaded layout blob with dirty tracking
#[derive(Debug, Clone)]
pub struct TypeLayoutStore {
    key: String,
    blob: TypeLayoutBlob,
    dirty: bool,
}

impl TypeLayoutStore {
    /// Load the blob stored under `key`, falling back to defaults when it is
    /// missing or unreadable
    pub fn load(settings: &dyn SettingsStore, key: impl Into<String>) -> Self {
        let key = key.into();
        let blob = match settings.get_setting(&key) {
            Some(json) => match serde_json::from_str::<TypeLayoutBlob>(&json) {
                Ok(blob) if blob.version <= LAYOUT_VERSION => blob,
                Ok(blob) => {
                    tracing::warn!(
                        "Layout '{}' has unsupported version {}, using defaults",
                        key,
                        blob.version
                    );
                    TypeLayoutBlob::default()
                }
                Err(err) => {
                    tracing::warn!("Malformed layout '{}', using defaults: {}", key, err);
                    TypeLayoutBlob::default()
                }
            },
            None => TypeLayoutBlob::default(),
        };
        Self {
            key,
            blob,
            dirty: false,
        }
    }

    /// Settings key this store persists to
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The loaded blob
    pub fn blob(&self) -> &TypeLayoutBlob {
        &self.blob
    }

    /// Whether there are unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Stored role hints
    pub fn hints(&self) -> &RoleHints {
        &self.blob.hints
    }

    /// Merge freshly resolved hints
    pub fn merge_hints(&mut self, hints: &RoleHints) -> bool {
        let changed = self.blob.hints.merge(hints);
        self.dirty |= changed;
        changed
    }

    /// Known type names, in insertion order
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.blob.types.keys().map(String::as_str)
    }

    /// Layout of a type, if it exists
    pub fn get(&self, type_name: &str) -> Option<&NodeTypeLayout> {
        self.blob.types.get(type_name)
    }

    /// Layout of a type, created with every non-reserved column as a setting
    /// when missing
    pub fn get_or_create(
        &mut self,
        type_name: &str,
        table: &Table,
        schema: &GraphSchema,
    ) -> &NodeTypeLayout {
        if !self.blob.types.contains_key(type_name) {
            let mut layout = NodeTypeLayout::new(self.blob.width_default);
            layout.reconcile(table, schema);
            tracing::debug!("Created layout for node type '{}'", type_name);
            self.blob.types.insert(type_name.to_string(), layout);
            self.dirty = true;
        }
        &self.blob.types[type_name]
    }

    /// Reconcile every type against the current columns
    pub fn ensure_columns_covered(&mut self, table: &Table, schema: &GraphSchema) -> bool {
        let mut changed = false;
        for layout in self.blob.types.values_mut() {
            changed |= layout.reconcile(table, schema);
        }
        self.dirty |= changed;
        changed
    }

    /// Set the display mode of a column, adding the field when absent
    pub fn set_mode(&mut self, type_name: &str, column: &ColumnId, mode: DisplayMode) -> bool {
        let Some(layout) = self.blob.types.get_mut(type_name) else {
            return false;
        };
        match layout.fields.iter_mut().find(|f| f.column == *column) {
            Some(field) if field.mode == mode => return false,
            Some(field) => field.mode = mode,
            None => layout.fields.push(FieldLayout {
                column: column.clone(),
                mode,
            }),
        }
        self.dirty = true;
        true
    }

    /// Set the node width of a type, clamped to the allowed range
    pub fn set_width(&mut self, type_name: &str, width: f32) -> bool {
        let width = width.clamp(MIN_NODE_WIDTH, MAX_NODE_WIDTH);
        match self.blob.types.get_mut(type_name) {
            Some(layout) if layout.width != width => {
                layout.width = width;
                self.dirty = true;
                true
            }
            _ => false,
        }
    }

    /// Move a field to a new position in the field order
    pub fn move_field(&mut self, type_name: &str, column: &ColumnId, to_index: usize) -> bool {
        let Some(layout) = self.blob.types.get_mut(type_name) else {
            return false;
        };
        let Some(from) = layout.fields.iter().position(|f| f.column == *column) else {
            return false;
        };
        let to = to_index.min(layout.fields.len() - 1);
        if from == to {
            return false;
        }
        let field = layout.fields.remove(from);
        layout.fields.insert(to, field);
        self.dirty = true;
        true
    }

    /// Write the blob back if it changed
    pub fn save_if_dirty(&mut self, settings: &mut dyn SettingsStore) -> bool {
        if !self.dirty {
            return false;
        }
        match serde_json::to_string(&self.blob) {
            Ok(json) => {
                settings.set_setting(&self.key, json);
                self.dirty = false;
                tracing::debug!("Saved layout '{}'", self.key);
                true
            }
            Err(err) => {
                tracing::error!("Failed to serialize layout '{}': {}", self.key, err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::resolve_schema;
    use crate::testing::graph_document;
    use tablegraph_document::{Column, ColumnKind, DocumentStore, MemorySettings};

    fn setup() -> (Table, GraphSchema) {
        let (doc, nodes, _) = graph_document();
        let table = doc
            .table(nodes)
            .cloned()
            .unwrap()
            .with_column(Column::new("Value", "Value", ColumnKind::Number))
            .with_column(Column::new("Note", "Note", ColumnKind::Text));
        let schema = resolve_schema(&doc, &table, &RoleHints::new());
        (table, schema)
    }

    #[test]
    fn test_new_type_gets_settings_for_non_reserved_columns() {
        let (table, schema) = setup();
        let mut store = TypeLayoutStore::load(&MemorySettings::new(), "k");
        let layout = store.get_or_create("Step", &table, &schema);

        assert_eq!(layout.width, DEFAULT_NODE_WIDTH);
        let columns: Vec<&str> = layout.fields.iter().map(|f| f.column.as_str()).collect();
        assert_eq!(columns, vec!["Value", "Note"]);
        assert!(layout.fields.iter().all(|f| f.mode == DisplayMode::Setting));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_reconcile_adds_and_drops_columns() {
        let (mut table, schema) = setup();
        let mut store = TypeLayoutStore::load(&MemorySettings::new(), "k");
        store.get_or_create("Step", &table, &schema);

        table.columns.retain(|c| c.id.as_str() != "Note");
        table.columns.push(Column::new("Extra", "Extra", ColumnKind::Checkbox));
        assert!(store.ensure_columns_covered(&table, &schema));
        assert!(!store.ensure_columns_covered(&table, &schema));

        let layout = store.get("Step").unwrap();
        assert_eq!(layout.mode(&"Note".into()), None);
        assert_eq!(layout.mode(&"Extra".into()), Some(DisplayMode::Setting));
    }

    #[test]
    fn test_width_is_clamped() {
        let (table, schema) = setup();
        let mut store = TypeLayoutStore::load(&MemorySettings::new(), "k");
        store.get_or_create("Step", &table, &schema);

        store.set_width("Step", 5000.0);
        assert_eq!(store.get("Step").unwrap().width, MAX_NODE_WIDTH);
        store.set_width("Step", 10.0);
        assert_eq!(store.get("Step").unwrap().width, MIN_NODE_WIDTH);
    }

    #[test]
    fn test_move_field() {
        let (table, schema) = setup();
        let mut store = TypeLayoutStore::load(&MemorySettings::new(), "k");
        store.get_or_create("Step", &table, &schema);

        assert!(store.move_field("Step", &"Note".into(), 0));
        let first = &store.get("Step").unwrap().fields[0];
        assert_eq!(first.column.as_str(), "Note");
        assert!(!store.move_field("Step", &"Missing".into(), 0));
    }

    #[test]
    fn test_save_and_reload() {
        let (table, schema) = setup();
        let mut settings = MemorySettings::new();
        let mut store = TypeLayoutStore::load(&settings, "k");
        store.get_or_create("Step", &table, &schema);
        store.set_mode("Step", &"Value".into(), DisplayMode::InputPin);
        store.merge_hints(&schema.hints());

        assert!(store.save_if_dirty(&mut settings));
        assert!(!store.save_if_dirty(&mut settings));

        let reloaded = TypeLayoutStore::load(&settings, "k");
        assert_eq!(
            reloaded.get("Step").unwrap().mode(&"Value".into()),
            Some(DisplayMode::InputPin)
        );
        assert_eq!(reloaded.hints(), &schema.hints());
    }

    #[test]
    fn test_malformed_blob_falls_back_to_defaults() {
        let mut settings = MemorySettings::new();
        settings.set_setting("k", "{ not json".to_string());
        let store = TypeLayoutStore::load(&settings, "k");
        assert_eq!(store.blob(), &TypeLayoutBlob::default());
        assert!(!store.is_dirty());
    }
}
