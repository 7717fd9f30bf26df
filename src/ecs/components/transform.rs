//! Transform components for ECS entities.

use glam::{Mat4, Quat, Vec3};

/// World-space transform of a physics entity. Stores position, rotation, and scale separately.
///
/// The collision core reads and writes this component but never owns the
/// entity it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Create an identity transform.
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Create a transform from a position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Create a transform from a position and a rotation.
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Builder-style scale override.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a local-to-world matrix (translation * rotation * scale).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Transform used by collision queries, shifted by a local collider offset.
    pub fn collision_transform(&self, offset: Vec3) -> GlobalTransform {
        let mat = self.to_matrix();
        if offset != Vec3::ZERO {
            GlobalTransform(mat * Mat4::from_translation(offset))
        } else {
            GlobalTransform(mat)
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Local-to-world matrix. Kept in sync with [`Transform`] after every physics step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTransform(pub Mat4);

impl GlobalTransform {
    /// World-space origin of the transform.
    #[inline]
    pub fn translation(&self) -> Vec3 {
        self.0.transform_point3(Vec3::ZERO)
    }

    /// Unit-length local axes expressed in world space.
    #[inline]
    pub fn axes(&self) -> [Vec3; 3] {
        [
            self.0.x_axis.truncate().normalize_or_zero(),
            self.0.y_axis.truncate().normalize_or_zero(),
            self.0.z_axis.truncate().normalize_or_zero(),
        ]
    }

    /// Per-axis scale factors.
    #[inline]
    pub fn scale(&self) -> Vec3 {
        Vec3::new(
            self.0.x_axis.truncate().length(),
            self.0.y_axis.truncate().length(),
            self.0.z_axis.truncate().length(),
        )
    }
}

impl Default for GlobalTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

impl From<&Transform> for GlobalTransform {
    fn from(transform: &Transform) -> Self {
        Self(transform.to_matrix())
    }
}
