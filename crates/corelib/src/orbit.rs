//! Orbit camera driven by an explicit input state (mouse drag + wheel).

use crate::{Vec3, camera::Camera};

/// Orbit parameters, updated by window input and read by the render loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitInput {
    pub distance: f32,
    /// Degrees around +Y.
    pub yaw_deg: f32,
    /// Degrees above the XZ plane.
    pub pitch_deg: f32,
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
}

impl OrbitInput {
    pub const MIN_DISTANCE: f32 = 2.0;
    pub const MAX_DISTANCE: f32 = 20.0;
    pub const ZOOM_STEP: f32 = 0.5;
    pub const PITCH_LIMIT_DEG: f32 = 89.0;
    /// Degrees per pixel of drag.
    pub const SENSITIVITY: f32 = 0.3;

    pub fn new() -> Self {
        Self {
            distance: 5.0,
            yaw_deg: 0.0,
            pitch_deg: 20.0,
            dragging: false,
            last_cursor: None,
        }
    }

    /// Wheel: positive lines zoom in.
    pub fn scroll(&mut self, lines: f32) {
        self.distance = (self.distance - lines * Self::ZOOM_STEP)
            .clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
    }

    pub fn set_dragging(&mut self, pressed: bool) {
        self.dragging = pressed;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Cursor moved to `(x, y)` in physical pixels. Rotates only while dragging;
    /// the position is always remembered so a drag starts without a jump.
    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        if self.dragging {
            if let Some((lx, ly)) = self.last_cursor {
                let dx = (x - lx) as f32;
                let dy = (y - ly) as f32;
                self.yaw_deg += dx * Self::SENSITIVITY;
                self.pitch_deg = (self.pitch_deg - dy * Self::SENSITIVITY)
                    .clamp(-Self::PITCH_LIMIT_DEG, Self::PITCH_LIMIT_DEG);
            }
        }
        self.last_cursor = Some((x, y));
    }

    pub fn eye(&self) -> Vec3 {
        let yaw = self.yaw_deg.to_radians();
        let pitch = self.pitch_deg.to_radians();
        self.distance
            * Vec3::new(
                pitch.cos() * yaw.sin(),
                pitch.sin(),
                pitch.cos() * yaw.cos(),
            )
    }

    /// Perspective camera looking at the origin from the current orbit position.
    pub fn camera(&self, aspect: f32) -> Camera {
        Camera::new_perspective(
            self.eye(),
            Vec3::ZERO,
            Vec3::Y,
            45f32.to_radians(),
            0.1,
            100.0,
            aspect,
        )
    }
}

impl Default for OrbitInput {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_is_clamped() {
        let mut input = OrbitInput::new();
        input.scroll(1.0);
        assert_eq!(input.distance, 4.5);
        input.scroll(100.0);
        assert_eq!(input.distance, OrbitInput::MIN_DISTANCE);
        input.scroll(-100.0);
        assert_eq!(input.distance, OrbitInput::MAX_DISTANCE);
    }

    #[test]
    fn drag_rotates_and_clamps_pitch() {
        let mut input = OrbitInput::new();
        input.cursor_moved(100.0, 100.0);
        // not dragging yet
        input.cursor_moved(200.0, 100.0);
        assert_eq!(input.yaw_deg, 0.0);

        input.set_dragging(true);
        assert!(input.is_dragging());
        input.cursor_moved(210.0, 100.0);
        assert!((input.yaw_deg - 3.0).abs() < 1e-5);

        input.cursor_moved(210.0, -10_000.0);
        assert_eq!(input.pitch_deg, OrbitInput::PITCH_LIMIT_DEG);

        input.set_dragging(false);
        assert!(!input.is_dragging());
        input.cursor_moved(500.0, 500.0);
        assert!((input.yaw_deg - 3.0).abs() < 1e-5);
    }

    #[test]
    fn eye_sits_on_orbit_sphere() {
        let input = OrbitInput::new();
        let eye = input.eye();
        assert!((eye.length() - input.distance).abs() < 1e-4);
        assert!(eye.y > 0.0);
        assert!(eye.x.abs() < 1e-6);
    }
}
