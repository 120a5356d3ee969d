use glam::{Vec2, vec2};

use crate::spatial::Rectangle;

pub const MIN_ZOOM: f32 = 0.05;
pub const MAX_ZOOM: f32 = 6.0;

/// Pan and zoom applied on top of the layout frame.
///
/// World coordinates are the simulation's; with no pan and unit zoom they
/// coincide with screen coordinates inside the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub pan: Vec2,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

fn frame_center(frame: Rectangle) -> Vec2 {
    let (x, y) = frame.center();
    vec2(x, y)
}

impl Viewport {
    pub fn world_to_screen(&self, frame: Rectangle, world: Vec2) -> Vec2 {
        let center = frame_center(frame);
        center + self.pan + ((world - center) * self.zoom)
    }

    pub fn screen_to_world(&self, frame: Rectangle, screen: Vec2) -> Vec2 {
        let center = frame_center(frame);
        ((screen - center - self.pan) / self.zoom) + center
    }

    /// Zooms by a scroll delta while keeping the world point under `pointer`
    /// fixed on screen.
    pub fn zoom_at(&mut self, frame: Rectangle, pointer: Vec2, scroll: f32) {
        if scroll.abs() <= f32::EPSILON || !scroll.is_finite() {
            return;
        }

        let center = frame_center(frame);
        let world_before = self.screen_to_world(frame, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = pointer - center - ((world_before - center) * self.zoom);
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        if delta.is_finite() {
            self.pan += delta;
        }
    }
}
