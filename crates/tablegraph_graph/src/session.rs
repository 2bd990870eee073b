// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-editor session state.
//!
//! Everything that outlives a frame but is not part of the document lives
//! here: view states, loaded layout blobs, inline edit buffers and the node
//! clipboard. Nothing is global; embedders own one session per editor host.

use crate::interaction::ViewState;
use crate::type_layout::TypeLayoutStore;
use std::collections::HashMap;
use std::fmt;
use tablegraph_document::{settings_key, Cell, ColumnId, SettingsStore, TableId};

/// Namespace of every settings key written by the graph editor
pub const SETTINGS_NAMESPACE: &str = "tablegraph";

/// Identifies one graph view of a table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    /// Node table
    pub table: TableId,
    /// View id
    pub view: String,
    /// Host instance, for views embedded more than once
    pub instance: Option<String>,
}

impl ViewKey {
    /// Key for a view of a table
    pub fn new(table: TableId, view: impl Into<String>) -> Self {
        Self {
            table,
            view: view.into(),
            instance: None,
        }
    }

    /// Distinguish one embedding of the view
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Settings key of the layout blob, shared by all instances
    pub fn settings_key(&self) -> String {
        settings_key(SETTINGS_NAMESPACE, self.table, &self.view)
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            Some(instance) => write!(f, "{}#{}", self.settings_key(), instance),
            None => write!(f, "{}", self.settings_key()),
        }
    }
}

/// A copied node
#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardNode {
    /// Node type
    pub type_name: String,
    /// Title
    pub title: Option<String>,
    /// Non-reserved cells
    pub cells: Vec<(ColumnId, Cell)>,
}

/// Caches owned by one editor host
#[derive(Debug, Default)]
pub struct EditorSession {
    views: HashMap<ViewKey, ViewState>,
    layouts: HashMap<String, TypeLayoutStore>,
    buffers: HashMap<String, String>,
    /// Node clipboard
    pub clipboard: Option<ClipboardNode>,
}

impl EditorSession {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// View state, if the view was shown before
    pub fn view(&self, key: &ViewKey) -> Option<&ViewState> {
        self.views.get(key)
    }

    /// View state, created on first use
    pub fn view_mut(&mut self, key: &ViewKey) -> &mut ViewState {
        self.views.entry(key.clone()).or_default()
    }

    /// Layout store of a view, if loaded
    pub fn layouts(&self, key: &ViewKey) -> Option<&TypeLayoutStore> {
        self.layouts.get(&key.settings_key())
    }

    /// Layout store of a view, loaded from settings on first use
    pub fn layouts_mut(&mut self, key: &ViewKey, settings: &dyn SettingsStore) -> &mut TypeLayoutStore {
        let settings_key = key.settings_key();
        self.layouts
            .entry(settings_key.clone())
            .or_insert_with(|| TypeLayoutStore::load(settings, settings_key))
    }

    /// Edit buffer, initialised with `initial` when absent
    pub fn buffer_mut(&mut self, key: &str, initial: impl FnOnce() -> String) -> &mut String {
        self.buffers.entry(key.to_string()).or_insert_with(initial)
    }

    /// Replace an edit buffer
    pub fn set_buffer(&mut self, key: &str, text: String) {
        self.buffers.insert(key.to_string(), text);
    }

    /// Remove and return an edit buffer
    pub fn take_buffer(&mut self, key: &str) -> Option<String> {
        self.buffers.remove(key)
    }

    /// Drop every edit buffer whose key starts with `prefix`
    pub fn clear_buffers(&mut self, prefix: &str) {
        self.buffers.retain(|key, _| !key.starts_with(prefix));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablegraph_document::MemorySettings;

    #[test]
    fn test_instances_share_layouts_but_not_views() {
        let table = TableId::new();
        let first = ViewKey::new(table, "main").with_instance("a");
        let second = ViewKey::new(table, "main").with_instance("b");
        let settings = MemorySettings::new();
        let mut session = EditorSession::new();

        session.view_mut(&first).selected = Some(Default::default());
        assert!(session.view(&second).is_none());

        session.layouts_mut(&first, &settings).set_width("Step", 300.0);
        assert_eq!(
            session.layouts(&second).map(|l| l.key().to_string()),
            Some(format!("tablegraph:{}:main", table))
        );
    }

    #[test]
    fn test_buffers() {
        let mut session = EditorSession::new();
        session.buffer_mut("v:title:1", || "Start".to_string()).push('!');
        assert_eq!(session.buffer_mut("v:title:1", String::new).as_str(), "Start!");
        session.set_buffer("v:cell:1:A", "=1".to_string());
        session.clear_buffers("v:");
        assert_eq!(session.take_buffer("v:title:1"), None);
        assert_eq!(session.take_buffer("v:cell:1:A"), None);
    }
}
