// SPDX-License-Identifier: MIT OR Apache-2.0
//! Application setup and event loop.

use crate::demo::demo_document;
use crate::settings_file::{FileSettings, SettingsError};
use egui_wgpu::wgpu;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tablegraph_document::{Document, DocumentError, DocumentStore, TableId};
use tablegraph_graph::{EditorError, EditorSession, GraphEditor};
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// View id of the graph editor
pub const GRAPH_VIEW: &str = "graph";

/// Settings file used when no document path is given
const DEFAULT_SETTINGS_FILE: &str = "tablegraph.settings.json";

/// Application errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Window creation failed
    #[error("Failed to create window: {0}")]
    WindowCreation(String),

    /// Renderer initialization failed
    #[error("Failed to initialize renderer: {0}")]
    RendererInit(String),

    /// Event loop error
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// Document error
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Graph editor error
    #[error(transparent)]
    Editor(#[from] EditorError),

    /// Settings error
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Result type for application operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Graphics state for wgpu rendering
struct GraphicsState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    egui_renderer: egui_wgpu::Renderer,
}

impl GraphicsState {
    fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| AppError::RendererInit(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| AppError::RendererInit("No suitable GPU adapter".to_string()))?;

        tracing::info!("Using GPU: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("TableGraph Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
            None,
        ))
        .map_err(|e| AppError::RendererInit(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| AppError::RendererInit("Surface has no formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            egui_renderer,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    fn render(
        &mut self,
        egui_ctx: &egui::Context,
        full_output: egui::FullOutput,
        window: &Window,
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("TableGraph Encoder"),
        });

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("TableGraph Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color {
                                r: 0.1,
                                g: 0.1,
                                b: 0.1,
                                a: 1.0,
                            }),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();

            self.egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        Ok(())
    }
}

/// Document, settings and open graph views
struct Workspace {
    document: Document,
    document_path: Option<PathBuf>,
    settings: FileSettings,
    session: EditorSession,
    editors: HashMap<TableId, GraphEditor>,
    active: Option<TableId>,
}

impl Workspace {
    /// Open `path`, or the demo document when no path is given or the file
    /// does not exist yet
    fn open(path: Option<PathBuf>) -> Result<Self> {
        let settings_path = path
            .as_ref()
            .map_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE), |p| p.with_extension("settings.json"));
        let mut settings = FileSettings::load(settings_path);
        tracing::debug!("Using settings file {:?}", settings.path());
        let mut session = EditorSession::new();

        let document = match &path {
            Some(path) if path.exists() => Document::load(path)?,
            _ => {
                let (document, _) = demo_document(&mut settings, &mut session)?;
                document
            }
        };
        let active = document
            .tables()
            .find(|t| t.parent.is_none())
            .map(|t| t.id);

        Ok(Self {
            document,
            document_path: path,
            settings,
            session,
            editors: HashMap::new(),
            active,
        })
    }

    fn title(&self) -> String {
        let name = self
            .document_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map_or_else(|| "Untitled".to_string(), |n| n.to_string_lossy().into_owned());
        let dirty = if self.document.is_dirty() { "*" } else { "" };
        format!("{name}{dirty} - TableGraph")
    }

    fn save(&mut self) {
        if let Err(err) = self.settings.save() {
            tracing::error!("Failed to save settings: {}", err);
        }
        let Some(path) = self.document_path.clone() else {
            tracing::warn!("No document path; start with a path argument to save");
            return;
        };
        if let Err(err) = self.document.save(&path) {
            tracing::error!("Failed to save {:?}: {}", path, err);
        }
    }

    fn undo(&mut self) {
        let Some(editor) = self.active.and_then(|id| self.editors.get(&id)) else {
            return;
        };
        if let Err(err) = editor.undo(&mut self.document, &mut self.session) {
            tracing::debug!("Undo: {}", err);
        }
    }

    fn redo(&mut self) {
        let Some(editor) = self.active.and_then(|id| self.editors.get(&id)) else {
            return;
        };
        if let Err(err) = editor.redo(&mut self.document, &mut self.session) {
            tracing::debug!("Redo: {}", err);
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        use egui::{Key, KeyboardShortcut, Modifiers};
        let save = KeyboardShortcut::new(Modifiers::COMMAND, Key::S);
        let undo = KeyboardShortcut::new(Modifiers::COMMAND, Key::Z);
        let redo = KeyboardShortcut::new(Modifiers::COMMAND | Modifiers::SHIFT, Key::Z);
        let redo_alt = KeyboardShortcut::new(Modifiers::COMMAND, Key::Y);

        if ctx.input_mut(|i| i.consume_shortcut(&save)) {
            self.save();
        }
        if ctx.wants_keyboard_input() {
            return;
        }
        // Redo first: Ctrl+Shift+Z also matches the plain undo shortcut
        if ctx.input_mut(|i| i.consume_shortcut(&redo) || i.consume_shortcut(&redo_alt)) {
            self.redo();
        } else if ctx.input_mut(|i| i.consume_shortcut(&undo)) {
            self.undo();
        }
    }

    fn update(&mut self, ctx: &egui::Context) {
        if let Some(id) = self.active {
            self.editors
                .entry(id)
                .or_insert_with(|| GraphEditor::new(id, GRAPH_VIEW));
        }
        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Save").clicked() {
                        self.save();
                        ui.close_menu();
                    }
                });
                ui.menu_button("Edit", |ui| {
                    let history = self.document.history();
                    let undo_label = history
                        .undo_description()
                        .map_or_else(|| "Undo".to_string(), |d| format!("Undo {d}"));
                    let redo_label = history
                        .redo_description()
                        .map_or_else(|| "Redo".to_string(), |d| format!("Redo {d}"));
                    let (can_undo, can_redo) = (history.can_undo(), history.can_redo());
                    if ui.add_enabled(can_undo, egui::Button::new(undo_label)).clicked() {
                        self.undo();
                        ui.close_menu();
                    }
                    if ui.add_enabled(can_redo, egui::Button::new(redo_label)).clicked() {
                        self.redo();
                        ui.close_menu();
                    }
                });
                ui.separator();

                let selected_name = self
                    .active
                    .and_then(|id| self.document.table(id))
                    .map_or_else(|| "No table".to_string(), |t| t.name.clone());
                let tables: Vec<(TableId, String)> = self
                    .document
                    .tables()
                    .filter(|t| t.parent.is_none())
                    .map(|t| (t.id, t.name.clone()))
                    .collect();
                egui::ComboBox::from_id_salt("active_table")
                    .selected_text(selected_name)
                    .show_ui(ui, |ui| {
                        for (id, name) in tables {
                            ui.selectable_value(&mut self.active, Some(id), name);
                        }
                    });
            });
        });

        let Some(editor) = self.active.and_then(|id| self.editors.get(&id)) else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.label("The document has no tables");
            });
            return;
        };

        egui::SidePanel::right("inspector")
            .default_width(280.0)
            .show(ctx, |ui| {
                editor.inspector_ui(ui, &mut self.document, &mut self.settings, &mut self.session);
            });
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                editor.ui(ui, &mut self.document, &mut self.settings, &mut self.session);
            });
    }
}

/// Running state of the application
struct AppRunning {
    window: Arc<Window>,
    graphics: GraphicsState,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    workspace: Workspace,
    title: String,
}

/// Main application
pub struct TableGraphApp {
    document_path: Option<PathBuf>,
    running: Option<AppRunning>,
    error: Option<AppError>,
}

impl TableGraphApp {
    /// Create the application for an optional document path
    pub fn new(document_path: Option<PathBuf>) -> Self {
        Self {
            document_path,
            running: None,
            error: None,
        }
    }

    /// Run the event loop until the window closes
    pub fn run(document_path: Option<PathBuf>) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = TableGraphApp::new(document_path);
        event_loop.run_app(&mut app)?;

        match app.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> Result<AppRunning> {
        tracing::info!("Creating window...");

        let window_attrs = Window::default_attributes()
            .with_title("TableGraph")
            .with_inner_size(winit::dpi::LogicalSize::new(1400, 860))
            .with_min_inner_size(winit::dpi::LogicalSize::new(800, 600));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| AppError::WindowCreation(e.to_string()))?,
        );

        let graphics = GraphicsState::new(window.clone())?;
        let egui_ctx = egui::Context::default();
        egui_ctx.set_visuals(egui::Visuals::dark());
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2 * 1024),
        );
        let workspace = Workspace::open(self.document_path.clone())?;

        tracing::info!("Window size: {:?}", window.inner_size());
        Ok(AppRunning {
            window,
            graphics,
            egui_ctx,
            egui_state,
            workspace,
            title: String::new(),
        })
    }
}

impl ApplicationHandler for TableGraphApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(err) => {
                tracing::error!("Startup failed: {}", err);
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };

        let response = running.egui_state.on_window_event(&running.window, &event);
        if response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                let workspace = &mut running.workspace;
                if workspace.document_path.is_some() && workspace.document.is_dirty() {
                    workspace.save();
                } else if let Err(err) = workspace.settings.save() {
                    tracing::error!("Failed to save settings: {}", err);
                }
                tracing::info!("Close requested, exiting...");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                running.graphics.resize(new_size);
                running.window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                let raw_input = running.egui_state.take_egui_input(&running.window);
                let full_output = running.egui_ctx.run(raw_input, |ctx| {
                    running.workspace.update(ctx);
                });

                let title = running.workspace.title();
                if title != running.title {
                    running.window.set_title(&title);
                    running.title = title;
                }

                running
                    .egui_state
                    .handle_platform_output(&running.window, full_output.platform_output.clone());

                match running.graphics.render(&running.egui_ctx, full_output, &running.window) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = running.window.inner_size();
                        running.graphics.resize(size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        tracing::error!("Out of GPU memory!");
                        event_loop.exit();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        tracing::warn!("Surface timeout");
                    }
                }

                running.window.request_redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            running.window.request_redraw();
        }
    }
}
