//! Physics components for ECS entities.

use glam::{BVec3, Quat, Vec3};

/// Collider shape. Extents are in the owner's local space, before scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    /// Oriented box with full width/height/depth along local X/Y/Z.
    Box { size: Vec3 },
    Sphere { radius: f32 },
    /// Capsule along local Y. `height` is the total height including both caps.
    Capsule { radius: f32, height: f32 },
}

/// Discriminant of a [`ColliderShape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Box,
    Sphere,
    Capsule,
}

impl ColliderShape {
    /// Box from width, height and depth.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        ColliderShape::Box {
            size: Vec3::new(width, height, depth),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            ColliderShape::Box { .. } => ShapeKind::Box,
            ColliderShape::Sphere { .. } => ShapeKind::Sphere,
            ColliderShape::Capsule { .. } => ShapeKind::Capsule,
        }
    }
}

/// Collision detection component.
#[derive(Debug, Clone)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Offset from the entity's transform origin.
    pub offset: Vec3,
    /// If true, raises trigger events but receives no physical response.
    pub is_trigger: bool,
    /// Static colliders are tested against, but never run their own resolution pass.
    pub is_static: bool,
    /// Set during the collision pass of the current tick when any contact was found.
    pub is_colliding: bool,
}

impl Collider {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            is_trigger: false,
            is_static: false,
            is_colliding: false,
        }
    }

    /// Immovable level geometry.
    pub fn new_static(shape: ColliderShape) -> Self {
        Self {
            is_static: true,
            ..Self::new(shape)
        }
    }

    /// Trigger volume.
    pub fn new_trigger(shape: ColliderShape) -> Self {
        Self {
            is_trigger: true,
            ..Self::new(shape)
        }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::new(ColliderShape::Sphere { radius: 0.5 })
    }
}

/// Per-axis freeze flags for position and rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraints {
    pub freeze_position: BVec3,
    pub freeze_rotation: BVec3,
}

impl Constraints {
    pub const NONE: Self = Self {
        freeze_position: BVec3::FALSE,
        freeze_rotation: BVec3::FALSE,
    };

    /// Freeze all three rotation axes (upright characters, crates that only slide).
    pub const FREEZE_ROTATION: Self = Self {
        freeze_position: BVec3::FALSE,
        freeze_rotation: BVec3::TRUE,
    };
}

impl Default for Constraints {
    fn default() -> Self {
        Self::NONE
    }
}

/// Rigid body component.
///
/// A body with zero mass has zero inverse mass and never moves under forces or
/// impulses, but still pushes dynamic bodies it touches.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub(crate) mass: f32,
    pub(crate) inverse_mass: f32,
    /// Diagonal of the local inertia tensor.
    pub(crate) inertia: Vec3,
    pub(crate) inverse_inertia: Vec3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub force_accumulator: Vec3,
    pub torque_accumulator: Vec3,
    /// Linear damping factor (default: 0.01).
    pub linear_damping: f32,
    /// Angular damping factor (default: 0.01).
    pub angular_damping: f32,
    /// Coefficient of restitution (0.0 - 1.0).
    pub restitution: f32,
    /// Friction coefficient.
    pub friction: f32,
    /// Friction is applied every integration step while enabled.
    pub use_friction: bool,
    /// Gravity scale (default: 1.0).
    pub gravity_scale: f32,
    pub constraints: Constraints,
    /// Position before the last integration step.
    pub previous_position: Vec3,
    /// Rotation before the last integration step.
    pub previous_rotation: Quat,
}

impl RigidBody {
    /// Create a new dynamic rigid body with the given mass.
    ///
    /// The inertia tensor starts as that of a unit cube; registration with a
    /// collider replaces it with the shape's own tensor.
    pub fn new_dynamic(mass: f32) -> Self {
        let mut body = Self {
            mass: 0.0,
            inverse_mass: 0.0,
            inertia: Vec3::ZERO,
            inverse_inertia: Vec3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force_accumulator: Vec3::ZERO,
            torque_accumulator: Vec3::ZERO,
            linear_damping: 0.01,
            angular_damping: 0.01,
            restitution: 0.3,
            friction: 0.5,
            use_friction: false,
            gravity_scale: 1.0,
            constraints: Constraints::NONE,
            previous_position: Vec3::ZERO,
            previous_rotation: Quat::IDENTITY,
        };
        body.set_mass(mass);
        body
    }

    /// Create an immovable rigid body (zero mass).
    pub fn new_static() -> Self {
        Self {
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 0.0,
            ..Self::new_dynamic(0.0)
        }
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self.use_friction = true;
        self
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    pub fn inertia(&self) -> Vec3 {
        self.inertia
    }

    pub fn inverse_inertia(&self) -> Vec3 {
        self.inverse_inertia
    }

    /// True when the body cannot be moved by forces or impulses.
    #[inline]
    pub fn is_immovable(&self) -> bool {
        self.inverse_mass == 0.0
    }

    /// Set the mass. Non-positive mass makes the body immovable.
    ///
    /// The inertia tensor is reset to the unit-cube approximation.
    pub fn set_mass(&mut self, mass: f32) {
        if mass > 0.0 {
            self.mass = mass;
            self.inverse_mass = 1.0 / mass;
            // Unit cube: I = m * (1 + 1) / 12 on every axis.
            self.set_inertia(Vec3::splat(mass / 6.0));
        } else {
            self.mass = 0.0;
            self.inverse_mass = 0.0;
            self.set_inertia(Vec3::ZERO);
        }
    }

    /// Set the diagonal inertia tensor; zero components get zero inverse.
    pub fn set_inertia(&mut self, inertia: Vec3) {
        self.inertia = inertia.max(Vec3::ZERO);
        self.inverse_inertia = Vec3::new(
            if self.inertia.x > 0.0 { 1.0 / self.inertia.x } else { 0.0 },
            if self.inertia.y > 0.0 { 1.0 / self.inertia.y } else { 0.0 },
            if self.inertia.z > 0.0 { 1.0 / self.inertia.z } else { 0.0 },
        );
    }
}

/// Triangle mesh attached to a body for the ground-snap heuristic.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    /// Axis-aligned box mesh centered on the origin.
    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        let vertices = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let triangles = vec![
            // bottom
            [0, 1, 2],
            [0, 2, 3],
            // top
            [4, 6, 5],
            [4, 7, 6],
            // sides
            [0, 4, 5],
            [0, 5, 1],
            [1, 5, 6],
            [1, 6, 2],
            [2, 6, 7],
            [2, 7, 3],
            [3, 7, 4],
            [3, 4, 0],
        ];
        Self {
            vertices,
            triangles,
        }
    }

    /// Iterate triangles as vertex triples, skipping out-of-range indices.
    pub fn iter_triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.triangles.iter().filter_map(|tri| {
            Some([
                *self.vertices.get(tri[0] as usize)?,
                *self.vertices.get(tri[1] as usize)?,
                *self.vertices.get(tri[2] as usize)?,
            ])
        })
    }
}
