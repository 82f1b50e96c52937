use glam::{Quat, Vec3};

/// Rendered pose of an avatar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for CharacterTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl CharacterTransform {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Turns the avatar to face `direction` on the horizontal plane.
    /// Directions without a horizontal component leave the rotation alone.
    pub fn look_along(&mut self, direction: Vec3) {
        let flat = Vec3::new(direction.x, 0.0, direction.z);
        if flat.length_squared() <= f32::EPSILON {
            return;
        }
        self.rotation = Quat::from_rotation_y(flat.x.atan2(flat.z));
    }

    /// Heading around the Y axis in radians, zero facing +Z.
    pub fn yaw(&self) -> f32 {
        let forward = self.rotation * Vec3::Z;
        forward.x.atan2(forward.z)
    }
}
