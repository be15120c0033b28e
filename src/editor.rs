use tracing::debug;

use crate::canvas::geometry::{Position, TextMeasure, clamp};
use crate::canvas::{CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::state::{AppState, OverlayUpdate};

/// On-screen rectangle the canvas is displayed in. Pointer coordinates are
/// reported relative to the viewport's client area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// Shown at native size with its origin at (0, 0).
    pub fn canvas() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: CANVAS_WIDTH as f32,
            height: CANVAS_HEIGHT as f32,
        }
    }

    pub fn to_canvas(&self, client_x: f32, client_y: f32) -> Position {
        let scale_x = if self.width > 0.0 {
            CANVAS_WIDTH as f32 / self.width
        } else {
            1.0
        };
        let scale_y = if self.height > 0.0 {
            CANVAS_HEIGHT as f32 / self.height
        } else {
            1.0
        };
        Position {
            x: (client_x - self.left) * scale_x,
            y: (client_y - self.top) * scale_y,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::canvas()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
    Leave,
}

impl PointerEvent {
    /// Whether the event's coordinates (if any) are finite.
    pub fn is_finite(&self) -> bool {
        match self {
            PointerEvent::Down { x, y } | PointerEvent::Move { x, y } => {
                x.is_finite() && y.is_finite()
            }
            PointerEvent::Up | PointerEvent::Leave => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Idle,
    Dragging,
}

impl DragMode {
    pub fn of(state: &AppState) -> Self {
        if state.thumbnail.is_dragging {
            DragMode::Dragging
        } else {
            DragMode::Idle
        }
    }
}

/// Turns pointer events into overlay moves.
///
/// Pressing anywhere on the canvas starts a drag and jumps the text to the
/// pointer without clamping. Moves while dragging are clamped so the
/// measured text stays inside the canvas. Release or leave ends the drag.
pub struct DragController<'a, M: TextMeasure + ?Sized> {
    measurer: &'a M,
    viewport: Viewport,
}

impl<'a, M: TextMeasure + ?Sized> DragController<'a, M> {
    pub fn new(measurer: &'a M, viewport: Viewport) -> Self {
        Self { measurer, viewport }
    }

    /// `None` when the event does not change the session.
    pub fn handle(&self, state: &AppState, event: PointerEvent) -> Option<AppState> {
        match (DragMode::of(state), event) {
            (_, PointerEvent::Down { x, y }) => {
                let pos = self.viewport.to_canvas(x, y);
                debug!("drag start at ({}, {})", pos.x, pos.y);
                Some(
                    state
                        .with_dragging(true)
                        .with_overlay(OverlayUpdate::position(pos.x, pos.y)),
                )
            }
            (DragMode::Dragging, PointerEvent::Move { x, y }) => {
                let pos = self.viewport.to_canvas(x, y);
                let overlay = state.overlay();
                let clamped = clamp(
                    self.measurer,
                    pos.x,
                    pos.y,
                    &overlay.text,
                    overlay.font_size as f32,
                    overlay.font_family,
                );
                Some(state.with_overlay(OverlayUpdate::position(clamped.x, clamped.y)))
            }
            (DragMode::Idle, PointerEvent::Move { .. }) => None,
            (DragMode::Dragging, PointerEvent::Up | PointerEvent::Leave) => {
                debug!("drag end");
                Some(state.with_dragging(false))
            }
            (DragMode::Idle, PointerEvent::Up | PointerEvent::Leave) => None,
        }
    }
}
