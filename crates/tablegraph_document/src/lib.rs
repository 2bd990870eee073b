// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tabular document model for `TableGraph`.
//!
//! This crate provides the document side of the graph editor:
//! - Tables, columns and rows with typed cell values
//! - The [`DocumentStore`] read interface and the [`CommandExecutor`]
//!   write interface
//! - Command batches that are applied atomically
//! - A reference in-memory [`Document`] with undo/redo history
//! - The key-value [`SettingsStore`] used for per-view editor settings
//!
//! ## Architecture
//!
//! The graph editor never mutates tables directly. Every change is expressed
//! as a [`CommandBatch`] and handed to an executor, which either applies all
//! of it or none of it.

pub mod ids;
pub mod value;
pub mod table;
pub mod command;
pub mod store;
pub mod history;
pub mod memory;
pub mod settings;

pub use command::{CommandBatch, DocCommand};
pub use history::History;
pub use ids::{ColumnId, RowId, TableId};
pub use memory::Document;
pub use settings::{settings_key, MemorySettings, SettingsStore};
pub use store::{CommandExecutor, DocumentError, DocumentStore};
pub use table::{Column, ColumnMeta, RelationMode, Row, Table};
pub use value::{Cell, CellValue, ColumnKind, Formula};
