// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer-driven interaction state machine.
//!
//! The state machine never touches the document. It consumes one
//! [`InputSnapshot`] per frame plus what the pointer is over, updates the
//! camera and its own state, and emits [`InteractionEvent`]s that the editor
//! turns into command batches.

use crate::pin::PinRef;
use egui::{Pos2, Rect, Vec2};
use tablegraph_document::{ColumnId, RowId};

/// Smallest zoom
pub const MIN_ZOOM: f32 = 0.2;

/// Largest zoom
pub const MAX_ZOOM: f32 = 3.0;

/// Pan and zoom of a view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Pan offset (world space)
    pub pan: Vec2,
    /// Zoom factor
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Camera {
    /// Convert a screen position to world space
    pub fn screen_to_world(&self, screen: Pos2, canvas: Rect) -> Pos2 {
        let center = canvas.center();
        Pos2::new(
            (screen.x - center.x) / self.zoom - self.pan.x,
            (screen.y - center.y) / self.zoom - self.pan.y,
        )
    }

    /// Convert a world position to screen space
    pub fn world_to_screen(&self, world: Pos2, canvas: Rect) -> Pos2 {
        let center = canvas.center();
        Pos2::new(
            (world.x + self.pan.x) * self.zoom + center.x,
            (world.y + self.pan.y) * self.zoom + center.y,
        )
    }

    /// Zoom by `factor`, keeping the world point under `pointer` fixed
    pub fn zoom_toward(&mut self, pointer: Pos2, canvas: Rect, factor: f32) {
        let world = self.screen_to_world(pointer, canvas);
        let zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if zoom == self.zoom {
            return;
        }
        self.zoom = zoom;
        let center = canvas.center();
        self.pan = (pointer - center) / zoom - world.to_vec2();
    }
}

/// Keyboard modifiers held this frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Control / command
    pub ctrl: bool,
    /// Shift
    pub shift: bool,
    /// Alt / option
    pub alt: bool,
}

/// Input edges of one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    /// Pointer position (screen space)
    pub pointer: Option<Pos2>,
    /// Primary button went down
    pub primary_pressed: bool,
    /// Primary button went up
    pub primary_released: bool,
    /// Secondary button went down
    pub secondary_pressed: bool,
    /// Middle button went down
    pub middle_pressed: bool,
    /// Middle button went up
    pub middle_released: bool,
    /// Primary button double-clicked
    pub double_clicked: bool,
    /// Vertical scroll delta
    pub scroll_delta: f32,
    /// Held modifiers
    pub modifiers: Modifiers,
    /// Enter pressed
    pub enter: bool,
    /// Escape pressed
    pub escape: bool,
    /// Delete pressed
    pub delete: bool,
    /// Copy shortcut
    pub copy: bool,
    /// Paste shortcut
    pub paste: bool,
    /// The inline editor lost keyboard focus
    pub text_focus_lost: bool,
}

/// What the pointer is over
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HitTarget {
    /// Outside the canvas, or over a popup drawn on top of it
    #[default]
    Outside,
    /// Empty canvas
    Canvas,
    /// A pin
    Pin {
        /// Pin
        pin: PinRef,
        /// Anchor (screen space)
        anchor: Pos2,
    },
    /// A node header
    NodeHeader(RowId),
    /// A node body, away from widgets
    NodeBody(RowId),
    /// An inline editor on a node
    Widget {
        /// Node
        node: RowId,
        /// Edited column
        column: ColumnId,
    },
}

impl HitTarget {
    /// Node under the pointer, if any
    pub fn node(&self) -> Option<RowId> {
        match self {
            Self::Pin { pin, .. } => Some(pin.node),
            Self::NodeHeader(node) | Self::NodeBody(node) => Some(*node),
            Self::Widget { node, .. } => Some(*node),
            Self::Outside | Self::Canvas => None,
        }
    }
}

/// Interaction state of a view
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    /// Nothing in progress
    #[default]
    Idle,
    /// Dragging the canvas
    PanningCanvas {
        /// Pointer position last frame
        last: Pos2,
    },
    /// Dragging a node
    DraggingNode {
        /// Node
        node: RowId,
        /// Pointer offset from the node origin (world space)
        offset: Vec2,
        /// Current node origin (world space)
        world: Pos2,
        /// Node origin when the drag started
        start: Pos2,
    },
    /// Dragging a wire out of a pin
    DraggingWire {
        /// Pin the wire started from
        source: PinRef,
        /// Anchor of that pin (screen space)
        anchor: Pos2,
        /// Current pointer (screen space)
        pointer: Pos2,
    },
    /// Editing a node title inline
    EditingTitle {
        /// Node
        node: RowId,
    },
    /// Editing a cell inline
    EditingFormula {
        /// Node
        node: RowId,
        /// Column
        column: ColumnId,
    },
    /// The create-node menu is open
    CreateMenuOpen {
        /// Where the node will be placed (world space)
        world: Pos2,
        /// Where the menu is shown (screen space)
        screen: Pos2,
    },
}

/// Open context menu of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextMenu {
    /// Node
    pub node: RowId,
    /// Menu position (screen space)
    pub screen: Pos2,
}

/// Intent emitted by the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    /// Connect two pins
    Connect {
        /// Pin the drag started on
        source: PinRef,
        /// Pin it was released on
        target: PinRef,
    },
    /// Remove every connection of a pin
    Disconnect(PinRef),
    /// Commit a node move
    MoveNode {
        /// Node
        node: RowId,
        /// New origin (world space)
        position: [f32; 2],
    },
    /// Start editing a title
    BeginTitleEdit(RowId),
    /// Commit the title buffer
    CommitTitle(RowId),
    /// Start editing a cell
    BeginCellEdit {
        /// Node
        node: RowId,
        /// Column
        column: ColumnId,
    },
    /// Commit the cell buffer
    CommitCell {
        /// Node
        node: RowId,
        /// Column
        column: ColumnId,
    },
    /// Discard the current inline edit
    CancelEdit,
    /// Copy a node to the clipboard
    Copy(RowId),
    /// Paste the clipboard node
    Paste {
        /// Position (world space)
        world: Pos2,
    },
    /// Delete a node
    Delete(RowId),
}

/// Per-view state: camera, interaction state, selection and menus
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Camera
    pub camera: Camera,
    /// Current interaction
    pub state: InteractionState,
    /// Selected node
    pub selected: Option<RowId>,
    /// Open node context menu
    pub context_menu: Option<ContextMenu>,
    /// Whether a dropdown (combo box) is open in this view
    pub dropdown_open: bool,
    /// Status message
    pub status: Option<String>,
}

impl ViewState {
    /// Create a new view state
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether copy, paste and delete shortcuts may fire
    pub fn shortcuts_enabled(&self) -> bool {
        self.state == InteractionState::Idle && self.context_menu.is_none() && !self.dropdown_open
    }

    /// Close the create menu, returning where the node should go
    pub fn close_create_menu(&mut self) -> Option<Pos2> {
        match self.state {
            InteractionState::CreateMenuOpen { world, .. } => {
                self.state = InteractionState::Idle;
                Some(world)
            }
            _ => None,
        }
    }

    /// Advance the state machine by one frame.
    ///
    /// `node_origin` maps a node to its origin in world space; `can_connect`
    /// decides whether a wire may be dropped on a pin.
    pub fn handle_input(
        &mut self,
        input: &InputSnapshot,
        hit: &HitTarget,
        canvas: Rect,
        node_origin: &dyn Fn(RowId) -> Option<Pos2>,
        can_connect: &dyn Fn(&PinRef, &PinRef) -> bool,
    ) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        let Some(pointer) = input.pointer else {
            if input.escape {
                self.cancel(&mut events);
            }
            return events;
        };

        let editing = matches!(
            self.state,
            InteractionState::EditingTitle { .. } | InteractionState::EditingFormula { .. }
        );
        if input.scroll_delta != 0.0 && canvas.contains(pointer) && !editing {
            self.camera
                .zoom_toward(pointer, canvas, 1.0 + input.scroll_delta * 0.001);
        }

        match self.state.clone() {
            InteractionState::Idle => self.idle(input, hit, pointer, canvas, node_origin, &mut events),

            InteractionState::PanningCanvas { last } => {
                self.camera.pan += (pointer - last) / self.camera.zoom;
                self.state = if input.primary_released || input.middle_released || input.escape {
                    InteractionState::Idle
                } else {
                    InteractionState::PanningCanvas { last: pointer }
                };
            }

            InteractionState::DraggingNode {
                node, offset, start, ..
            } => {
                let world = self.camera.screen_to_world(pointer, canvas) - offset;
                if input.escape {
                    self.state = InteractionState::Idle;
                } else if input.primary_released {
                    if world != start {
                        events.push(InteractionEvent::MoveNode {
                            node,
                            position: [world.x, world.y],
                        });
                    }
                    self.state = InteractionState::Idle;
                } else {
                    self.state = InteractionState::DraggingNode {
                        node,
                        offset,
                        world,
                        start,
                    };
                }
            }

            InteractionState::DraggingWire { source, anchor, .. } => {
                if input.escape {
                    self.state = InteractionState::Idle;
                } else if input.primary_released {
                    if let HitTarget::Pin { pin, .. } = hit {
                        if *pin != source {
                            if can_connect(&source, pin) {
                                events.push(InteractionEvent::Connect {
                                    source: source.clone(),
                                    target: pin.clone(),
                                });
                            } else {
                                self.status = Some("Incompatible pins".to_string());
                            }
                        }
                    }
                    self.state = InteractionState::Idle;
                } else {
                    self.state = InteractionState::DraggingWire {
                        source,
                        anchor,
                        pointer,
                    };
                }
            }

            InteractionState::EditingTitle { node } => {
                let clicked_away =
                    input.primary_pressed && *hit != HitTarget::NodeHeader(node);
                if input.escape {
                    events.push(InteractionEvent::CancelEdit);
                    self.state = InteractionState::Idle;
                } else if input.enter || input.text_focus_lost || clicked_away {
                    events.push(InteractionEvent::CommitTitle(node));
                    self.state = InteractionState::Idle;
                }
            }

            InteractionState::EditingFormula { node, column } => {
                let on_widget = matches!(
                    hit,
                    HitTarget::Widget { node: n, column: c } if *n == node && *c == column
                );
                let clicked_away = input.primary_pressed && !on_widget;
                if input.escape {
                    events.push(InteractionEvent::CancelEdit);
                    self.state = InteractionState::Idle;
                } else if input.enter || input.text_focus_lost || clicked_away {
                    events.push(InteractionEvent::CommitCell { node, column });
                    self.state = InteractionState::Idle;
                }
            }

            InteractionState::CreateMenuOpen { .. } => {
                let clicked_away = (input.primary_pressed || input.secondary_pressed)
                    && *hit != HitTarget::Outside;
                if input.escape || clicked_away {
                    self.state = InteractionState::Idle;
                }
            }
        }

        events
    }

    fn cancel(&mut self, events: &mut Vec<InteractionEvent>) {
        if matches!(
            self.state,
            InteractionState::EditingTitle { .. } | InteractionState::EditingFormula { .. }
        ) {
            events.push(InteractionEvent::CancelEdit);
        }
        self.state = InteractionState::Idle;
        self.context_menu = None;
    }

    fn idle(
        &mut self,
        input: &InputSnapshot,
        hit: &HitTarget,
        pointer: Pos2,
        canvas: Rect,
        node_origin: &dyn Fn(RowId) -> Option<Pos2>,
        events: &mut Vec<InteractionEvent>,
    ) {
        if input.escape && self.context_menu.is_some() {
            self.context_menu = None;
            return;
        }

        if input.secondary_pressed {
            match hit {
                HitTarget::Canvas => {
                    self.context_menu = None;
                    self.state = InteractionState::CreateMenuOpen {
                        world: self.camera.screen_to_world(pointer, canvas),
                        screen: pointer,
                    };
                }
                HitTarget::Outside => {}
                other => {
                    if let Some(node) = other.node() {
                        self.selected = Some(node);
                        self.context_menu = Some(ContextMenu {
                            node,
                            screen: pointer,
                        });
                    }
                }
            }
            return;
        }

        if input.primary_pressed {
            if *hit != HitTarget::Outside {
                self.context_menu = None;
            }
            match hit {
                HitTarget::Pin { pin, anchor } => {
                    if input.modifiers.alt {
                        events.push(InteractionEvent::Disconnect(pin.clone()));
                    } else {
                        self.state = InteractionState::DraggingWire {
                            source: pin.clone(),
                            anchor: *anchor,
                            pointer,
                        };
                    }
                }
                HitTarget::NodeHeader(node) if input.double_clicked => {
                    self.selected = Some(*node);
                    self.state = InteractionState::EditingTitle { node: *node };
                    events.push(InteractionEvent::BeginTitleEdit(*node));
                }
                HitTarget::NodeHeader(node) | HitTarget::NodeBody(node) => {
                    self.selected = Some(*node);
                    if let Some(origin) = node_origin(*node) {
                        let offset = self.camera.screen_to_world(pointer, canvas) - origin;
                        self.state = InteractionState::DraggingNode {
                            node: *node,
                            offset,
                            world: origin,
                            start: origin,
                        };
                    }
                }
                HitTarget::Widget { node, column } => {
                    self.selected = Some(*node);
                    self.state = InteractionState::EditingFormula {
                        node: *node,
                        column: column.clone(),
                    };
                    events.push(InteractionEvent::BeginCellEdit {
                        node: *node,
                        column: column.clone(),
                    });
                }
                HitTarget::Canvas => {
                    self.selected = None;
                    self.status = None;
                    self.state = InteractionState::PanningCanvas { last: pointer };
                }
                HitTarget::Outside => {}
            }
            return;
        }

        if input.middle_pressed && canvas.contains(pointer) {
            self.state = InteractionState::PanningCanvas { last: pointer };
            return;
        }

        if !self.shortcuts_enabled() {
            return;
        }
        if let Some(node) = self.selected {
            if input.delete {
                self.selected = None;
                events.push(InteractionEvent::Delete(node));
                return;
            }
            if input.copy {
                events.push(InteractionEvent::Copy(node));
            }
        }
        if input.paste && canvas.contains(pointer) {
            events.push(InteractionEvent::Paste {
                world: self.camera.screen_to_world(pointer, canvas),
            });
        }
    }
}
