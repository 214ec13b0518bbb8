//! Pointer state fed to the shader as `iMouse`.
//!
//! Coordinates arrive in logical pixels with a top-left origin and are stored
//! already flipped to the bottom-left origin GLSL expects.

/// Whether the primary button is currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Released,
    Dragging,
}

/// `[current_x, current_y, press_x, press_y]` plus the drag phase.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseState {
    current: [f32; 2],
    origin: [f32; 2],
    phase: DragPhase,
}

impl MouseState {
    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    /// Latches both the current position and the drag origin.
    pub fn press(&mut self, x: f32, y: f32, surface_height: u32) {
        let point = [x, flip_y(y, surface_height)];
        self.current = point;
        self.origin = point;
        self.phase = DragPhase::Dragging;
    }

    /// Updates the current position while dragging; ignored otherwise.
    pub fn drag_to(&mut self, x: f32, y: f32, surface_height: u32) -> bool {
        if self.phase != DragPhase::Dragging {
            return false;
        }
        self.current = [x, flip_y(y, surface_height)];
        true
    }

    /// Stops consuming moves. The last vector stays visible to the shader.
    pub fn release(&mut self) {
        self.phase = DragPhase::Released;
    }

    pub fn as_uniform(&self) -> [f32; 4] {
        [
            self.current[0],
            self.current[1],
            self.origin[0],
            self.origin[1],
        ]
    }
}

fn flip_y(y: f32, surface_height: u32) -> f32 {
    surface_height as f32 - y - 1.0
}
