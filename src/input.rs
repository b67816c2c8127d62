//! Viewport and pointer handling.
//!
//! Terminal events are turned into [`InputEvent`] messages, queued between
//! frames, and folded into [`InputState`] before the next animation step.

use crate::render::Renderer;
use crate::scene::Scene;

/// Drawable area in framebuffer pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Last known pointer position, normalized to [-1, 1] with +y up
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    pub x: f64,
    pub y: f64,
}

impl PointerState {
    /// Maps a pointer position in viewport pixels (origin top-left) to
    /// normalized coordinates. The vertical axis is inverted.
    pub fn from_position(px: f64, py: f64, viewport: Viewport) -> Self {
        if viewport.width == 0 || viewport.height == 0 {
            return Self::default();
        }
        let x = (px / viewport.width as f64) * 2.0 - 1.0;
        let y = -(py / viewport.height as f64) * 2.0 + 1.0;
        Self {
            x: x.clamp(-1.0, 1.0),
            y: y.clamp(-1.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerMoved { x: f64, y: f64 },
    Resized { width: u32, height: u32 },
}

/// Everything the event handlers write and the frame update reads
#[derive(Debug, Clone, Copy)]
pub struct InputState {
    pub pointer: PointerState,
    pub viewport: Viewport,
}

impl InputState {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            pointer: PointerState::default(),
            viewport,
        }
    }

    /// Applies one queued event. Resizes propagate to the camera and the
    /// renderer; zero-sized viewports are ignored.
    pub fn apply_event(&mut self, event: InputEvent, scene: &mut Scene, renderer: &mut Renderer) {
        match event {
            InputEvent::PointerMoved { x, y } => {
                self.pointer = PointerState::from_position(x, y, self.viewport);
            }
            InputEvent::Resized { width, height } => {
                if width == 0 || height == 0 {
                    tracing::debug!(width, height, "ignoring empty resize");
                    return;
                }
                self.viewport = Viewport::new(width, height);
                scene.camera.aspect = self.viewport.aspect();
                renderer.set_size(width, height);
                tracing::debug!(width, height, "viewport resized");
            }
        }
    }
}
