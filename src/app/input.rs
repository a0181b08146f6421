use crate::render::pick::PointerSample;
use crate::render::CameraMovement;
use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Wheel pixels that count as one line step.
const PIXELS_PER_WHEEL_STEP: f32 = 50.0;

/// What a pointer motion should do to the orbit camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Drag {
    Rotate(Vec2),
    Pan(Vec2),
}

#[derive(Default, Debug, Clone, Copy)]
pub struct InputState {
    pub aim_left: bool,
    pub aim_right: bool,
    pub aim_up: bool,
    pub aim_down: bool,
    rotating: bool,
    panning: bool,
    last_cursor: Option<PointerSample>,
}

impl InputState {
    pub fn handle_key(&mut self, key: PhysicalKey, pressed: bool) {
        match key {
            PhysicalKey::Code(KeyCode::ArrowLeft) => self.aim_left = pressed,
            PhysicalKey::Code(KeyCode::ArrowRight) => self.aim_right = pressed,
            PhysicalKey::Code(KeyCode::ArrowUp) => self.aim_up = pressed,
            PhysicalKey::Code(KeyCode::ArrowDown) => self.aim_down = pressed,
            _ => {}
        }
    }

    pub fn handle_button(&mut self, button: MouseButton, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => self.rotating = pressed,
            MouseButton::Right | MouseButton::Middle => self.panning = pressed,
            _ => {}
        }
    }

    /// Record the new cursor position and report the drag it implies.
    pub fn handle_cursor(&mut self, sample: PointerSample) -> Option<Drag> {
        let previous = self.last_cursor.replace(sample);
        let delta = previous.map(|p| Vec2::new(sample.x - p.x, sample.y - p.y))?;
        if self.rotating {
            Some(Drag::Rotate(delta))
        } else if self.panning {
            Some(Drag::Pan(delta))
        } else {
            None
        }
    }

    pub fn cursor_left(&mut self) {
        self.last_cursor = None;
    }

    /// Focus loss drops held keys and buttons.
    pub fn release_all(&mut self) {
        *self = Self::default();
    }

    pub fn movement(&self) -> CameraMovement {
        CameraMovement {
            aim_left: self.aim_left,
            aim_right: self.aim_right,
            aim_up: self.aim_up,
            aim_down: self.aim_down,
        }
    }
}

/// Wheel delta in line steps; positive zooms in.
pub fn wheel_steps(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_WHEEL_STEP,
    }
}
