// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph editing over tabular documents.
//!
//! Every row of a table is a node and its columns become pins or inline
//! settings. Connections are written back into the document, either as rows
//! of an edge table (data pins) or as relation cells (execution pins), so the
//! document stays the single source of truth.
//!
//! ## Architecture
//!
//! Per frame the editor runs:
//! - [`schema`]: infer which columns play which graph role
//! - [`type_layout`]: per-type display modes, reconciled against the schema
//! - [`layout`]: variable-height node layout
//! - [`anchor`]: exact pin positions for wires and hit-testing
//! - [`interaction`]: the pointer-driven state machine
//! - [`connection`]: connection rules and the resulting command batches
//!
//! [`scaffold`] synthesizes missing schema columns, [`session`] holds the
//! per-editor caches, and [`ui`] draws everything with egui.

pub mod schema;
pub mod type_layout;
pub mod pin;
pub mod layout;
pub mod anchor;
pub mod connection;
pub mod scaffold;
pub mod interaction;
pub mod visual;
pub mod session;
pub mod editor;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{ConnectError, ConnectionEngine};
pub use editor::{EditorError, FrameModel, GraphEditor, GraphFrame};
pub use interaction::{InputSnapshot, InteractionEvent, InteractionState, ViewState};
pub use layout::{LayoutContext, LayoutMetrics, NodeLayout};
pub use pin::{PinDirection, PinId, PinRef};
pub use schema::{resolve_schema, GraphRole, GraphSchema, RoleHints};
pub use session::{EditorSession, ViewKey};
pub use type_layout::{DisplayMode, NodeTypeLayout, TypeLayoutStore};
