//! Math types for soundscape

pub use glam::Vec3;

/// Listener orientation and placement, pushed to the output once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listener {
    pub position: Vec3,
    /// Facing direction
    pub direction: Vec3,
    pub up: Vec3,
}

impl Listener {
    pub fn new(position: Vec3, direction: Vec3, up: Vec3) -> Self {
        Self {
            position,
            direction,
            up,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn distance_squared(&self, point: Vec3) -> f32 {
        self.position.distance_squared(point)
    }
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Vec3::X,
            up: Vec3::Z,
        }
    }
}
