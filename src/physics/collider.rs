//! Collider shape support functions: world-space bounds, capsule segments and inertia.

use glam::{Mat4, Vec3};

use crate::ecs::components::physics::ColliderShape;
use crate::ecs::components::transform::GlobalTransform;

/// Axis-aligned bounding box for broadphase collision detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsAabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl PhysicsAabb {
    /// Test whether two AABBs overlap.
    #[inline]
    pub fn overlaps(&self, other: &PhysicsAabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Full extents along each world axis.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// World-space central segment of a capsule, plus its world radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleSegment {
    pub start: Vec3,
    pub end: Vec3,
    pub radius: f32,
}

impl ColliderShape {
    /// Compute the world-space AABB for this shape.
    #[inline]
    pub fn compute_aabb(&self, transform: &GlobalTransform) -> PhysicsAabb {
        let mat = transform.0;

        match *self {
            ColliderShape::Sphere { radius } => {
                let center = transform.translation();
                let world_radius = sphere_world_radius(radius, transform);
                PhysicsAabb {
                    min: center - Vec3::splat(world_radius),
                    max: center + Vec3::splat(world_radius),
                }
            }
            ColliderShape::Box { size } => aabb_from_extents(size * 0.5, mat),
            ColliderShape::Capsule { radius, height } => {
                let segment = capsule_segment(radius, height, transform);
                let r = Vec3::splat(segment.radius);
                PhysicsAabb {
                    min: segment.start.min(segment.end) - r,
                    max: segment.start.max(segment.end) + r,
                }
            }
        }
    }

    /// Diagonal inertia tensor for a body of `mass` with this shape, scaled by `scale`.
    pub fn inertia(&self, mass: f32, scale: Vec3) -> Vec3 {
        if mass <= 0.0 {
            return Vec3::ZERO;
        }
        match *self {
            ColliderShape::Box { size } => {
                let s = size * scale;
                let (w2, h2, d2) = (s.x * s.x, s.y * s.y, s.z * s.z);
                Vec3::new(h2 + d2, w2 + d2, w2 + h2) * (mass / 12.0)
            }
            ColliderShape::Sphere { radius } => {
                let r = radius * scale.max_element();
                Vec3::splat(0.4 * mass * r * r)
            }
            ColliderShape::Capsule { radius, height } => {
                let r = radius * scale.x.max(scale.z);
                let length = (height * scale.y - 2.0 * r).max(0.0);
                capsule_inertia(mass, r, length)
            }
        }
    }
}

/// Sphere radius after applying the largest axis scale of the transform.
#[inline]
pub fn sphere_world_radius(radius: f32, transform: &GlobalTransform) -> f32 {
    // max(sqrt(a), sqrt(b)) == sqrt(max(a, b))
    let mat = transform.0;
    let scale = mat
        .x_axis
        .truncate()
        .length_squared()
        .max(mat.y_axis.truncate().length_squared())
        .max(mat.z_axis.truncate().length_squared())
        .sqrt();
    radius * scale
}

/// World-space central segment of a capsule aligned with local Y.
#[inline]
pub fn capsule_segment(radius: f32, height: f32, transform: &GlobalTransform) -> CapsuleSegment {
    let scale = transform.scale();
    let world_radius = radius * scale.x.max(scale.z);
    let half_segment = (height * scale.y * 0.5 - world_radius).max(0.0);
    let center = transform.translation();
    let up = transform.0.y_axis.truncate().normalize_or_zero();
    CapsuleSegment {
        start: center - up * half_segment,
        end: center + up * half_segment,
        radius: world_radius,
    }
}

/// Inertia of a solid capsule: a cylinder of `length` with two hemispherical caps.
fn capsule_inertia(mass: f32, radius: f32, length: f32) -> Vec3 {
    let r2 = radius * radius;
    let cylinder_volume = std::f32::consts::PI * r2 * length;
    let caps_volume = 4.0 / 3.0 * std::f32::consts::PI * r2 * radius;
    let total = cylinder_volume + caps_volume;
    if total <= 0.0 {
        return Vec3::ZERO;
    }
    let cylinder_mass = mass * cylinder_volume / total;
    let caps_mass = mass - cylinder_mass;

    let axial = cylinder_mass * r2 * 0.5 + caps_mass * 0.4 * r2;
    let transverse = cylinder_mass * (length * length / 12.0 + r2 * 0.25)
        + caps_mass * (0.4 * r2 + length * length * 0.25 + 0.375 * length * radius);
    Vec3::new(transverse, axial, transverse)
}

/// Compute world-space AABB from local half-extents and a transform matrix.
#[inline]
fn aabb_from_extents(half_extents: Vec3, mat: Mat4) -> PhysicsAabb {
    let center = mat.transform_point3(Vec3::ZERO);

    // For each world axis, compute the extent by projecting the local box axes
    let abs_col0 = mat.x_axis.truncate().abs();
    let abs_col1 = mat.y_axis.truncate().abs();
    let abs_col2 = mat.z_axis.truncate().abs();

    let extent = abs_col0 * half_extents.x + abs_col1 * half_extents.y + abs_col2 * half_extents.z;

    PhysicsAabb {
        min: center - extent,
        max: center + extent,
    }
}
