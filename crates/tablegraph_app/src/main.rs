// SPDX-License-Identifier: MIT OR Apache-2.0
//! TableGraph - node graph editor over a tabular document
//!
//! Every row of a table is drawn as a node. Columns become pins, settings or
//! embedded lists depending on the per-type layout, and wires are stored as
//! relation cells and formulas in the same document.
//!
//! Usage: `tablegraph [document.ron]`. Without a path, or when the file does
//! not exist yet, a sample graph is opened.

mod app;
mod demo;
mod settings_file;

use app::TableGraphApp;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("tablegraph_app=debug,tablegraph_graph=debug,wgpu=warn,naga=warn")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting TableGraph v{}", env!("CARGO_PKG_VERSION"));

    let document_path = std::env::args_os().nth(1).map(std::path::PathBuf::from);
    if let Err(e) = TableGraphApp::run(document_path) {
        tracing::error!("TableGraph exited with an error: {e}");
        std::process::exit(1);
    }
}
