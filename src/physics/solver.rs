//! Impulse-based contact response for a single contact per collider pair.

use glam::{BVec3, Vec3};

use crate::ecs::components::physics::RigidBody;
use crate::ecs::components::transform::Transform;

use super::contact::ContactInfo;

/// Extra separation left between a body and an immovable obstacle.
pub const STATIC_SEPARATION: f32 = 0.01;

/// Resolve a contact between two bodies.
///
/// `contact.normal` points from `other` toward `current`. Velocities are only
/// changed when the bodies approach each other along the normal; penetration is
/// always projected out, split by inverse mass. Returns `false` if either
/// entity is missing its `RigidBody` or `Transform`.
pub fn resolve_pair(
    world: &mut hecs::World,
    current: hecs::Entity,
    other: hecs::Entity,
    contact: &ContactInfo,
) -> bool {
    // Read rigid body data for both entities
    let (Some(mut a), Some(mut b)) = (RbData::read(world, current), RbData::read(world, other))
    else {
        return false;
    };

    let inv_mass_sum = a.inv_mass + b.inv_mass;
    if inv_mass_sum <= 0.0 {
        return true;
    }

    let normal = contact.normal;
    let r_a = contact.point - a.position;
    let r_b = contact.point - b.position;

    let vel_a = a.linear_velocity + a.angular_velocity.cross(r_a);
    let vel_b = b.linear_velocity + b.angular_velocity.cross(r_b);
    let contact_velocity = (vel_a - vel_b).dot(normal);

    // Only approaching bodies receive an impulse
    if contact_velocity <= 0.0 {
        let r_a_cross_n = r_a.cross(normal);
        let r_b_cross_n = r_b.cross(normal);
        let denom = inv_mass_sum
            + (a.inv_inertia * r_a_cross_n).dot(r_a_cross_n)
            + (b.inv_inertia * r_b_cross_n).dot(r_b_cross_n);

        let restitution = a.restitution.min(b.restitution);
        let j = -(1.0 + restitution) * contact_velocity / denom;
        let impulse = normal * j;

        a.apply_impulse(impulse, r_a);
        b.apply_impulse(-impulse, r_b);
        tracing::trace!(?current, ?other, j, "contact impulse");
    }

    let correction = normal * contact.penetration;
    a.position += mask(a.frozen, correction * (a.inv_mass / inv_mass_sum));
    b.position -= mask(b.frozen, correction * (b.inv_mass / inv_mass_sum));

    a.write(world, current);
    b.write(world, other);
    true
}

/// Resolve a contact between a body and an immovable obstacle.
///
/// `normal` points from the obstacle toward the body. An approaching velocity
/// component is reflected with the body's restitution, and the body is moved
/// out of the obstacle plus [`STATIC_SEPARATION`]. Bodies with zero inverse
/// mass are left untouched. Returns `false` if the entity is missing its
/// `RigidBody` or `Transform`.
pub fn resolve_static(
    world: &mut hecs::World,
    entity: hecs::Entity,
    normal: Vec3,
    penetration: f32,
) -> bool {
    let Ok((rb, transform)) = world.query_one_mut::<(&mut RigidBody, &mut Transform)>(entity)
    else {
        return false;
    };
    if rb.is_immovable() {
        return true;
    }

    let normal_velocity = rb.linear_velocity.dot(normal);
    if normal_velocity < 0.0 {
        rb.linear_velocity -= normal * (1.0 + rb.restitution) * normal_velocity;
    }

    let correction = normal * (penetration + STATIC_SEPARATION);
    transform.position += mask(rb.constraints.freeze_position, correction);
    true
}

/// Push a collider without rigid body state out of a contact.
pub fn separate(
    world: &mut hecs::World,
    entity: hecs::Entity,
    normal: Vec3,
    penetration: f32,
) -> bool {
    let Ok(mut transform) = world.get::<&mut Transform>(entity) else {
        return false;
    };
    transform.position += normal * penetration;
    true
}

#[inline]
fn mask(frozen: BVec3, v: Vec3) -> Vec3 {
    Vec3::select(frozen, Vec3::ZERO, v)
}

/// Rigid body state copied out of the world so two bodies can be updated at once.
struct RbData {
    inv_mass: f32,
    inv_inertia: Vec3,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    position: Vec3,
    restitution: f32,
    frozen: BVec3,
}

impl RbData {
    fn read(world: &hecs::World, entity: hecs::Entity) -> Option<Self> {
        let rb = world.get::<&RigidBody>(entity).ok()?;
        let transform = world.get::<&Transform>(entity).ok()?;
        Some(Self {
            inv_mass: rb.inverse_mass(),
            inv_inertia: rb.inverse_inertia(),
            linear_velocity: rb.linear_velocity,
            angular_velocity: rb.angular_velocity,
            position: transform.position,
            restitution: rb.restitution,
            frozen: rb.constraints.freeze_position,
        })
    }

    #[inline]
    fn apply_impulse(&mut self, impulse: Vec3, lever_arm: Vec3) {
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia * lever_arm.cross(impulse);
    }

    fn write(&self, world: &mut hecs::World, entity: hecs::Entity) {
        if let Ok((rb, transform)) =
            world.query_one_mut::<(&mut RigidBody, &mut Transform)>(entity)
        {
            rb.linear_velocity = self.linear_velocity;
            rb.angular_velocity = self.angular_velocity;
            transform.position = self.position;
        }
    }
}
