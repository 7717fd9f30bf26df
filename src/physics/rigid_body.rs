//! Rigid body integration functions.

use glam::{Quat, Vec3};

use crate::ecs::components::physics::{ColliderShape, RigidBody, TriangleMesh};
use crate::ecs::components::transform::{GlobalTransform, Transform};

/// Vertices within this height of each other count as one horizontal face.
const FLAT_FACE_TOLERANCE: f32 = 0.01;

impl RigidBody {
    /// Accumulate a force through the center of mass.
    #[inline]
    pub fn apply_force(&mut self, force: Vec3) {
        self.force_accumulator += force;
    }

    #[inline]
    pub fn apply_torque(&mut self, torque: Vec3) {
        self.torque_accumulator += torque;
    }

    /// Accumulate a force applied at a world-space point, given the body's center.
    pub fn apply_force_at_point(&mut self, force: Vec3, point: Vec3, center: Vec3) {
        self.force_accumulator += force;
        self.torque_accumulator += (point - center).cross(force);
    }

    /// Apply an instantaneous impulse at `lever_arm` from the center of mass.
    #[inline]
    pub fn apply_impulse(&mut self, impulse: Vec3, lever_arm: Vec3) {
        self.linear_velocity += impulse * self.inverse_mass;
        self.angular_velocity += self.inverse_inertia * lever_arm.cross(impulse);
    }

    /// Replace the inertia tensor with the one of `shape` at the given scale.
    pub fn set_inertia_from_shape(&mut self, shape: &ColliderShape, scale: Vec3) {
        let inertia = shape.inertia(self.mass, scale);
        self.set_inertia(inertia);
    }

    /// Velocity of the body at `lever_arm` from its center of mass.
    #[inline]
    pub fn velocity_at(&self, lever_arm: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(lever_arm)
    }

    /// Advance the body and its transform by `dt` seconds.
    ///
    /// Immovable bodies are left in place. Frozen position axes keep their
    /// exact previous value and frozen rotation axes have no angular velocity.
    pub fn integrate(
        &mut self,
        transform: &mut Transform,
        mesh: Option<&TriangleMesh>,
        gravity: Vec3,
        ground_height: f32,
        dt: f32,
    ) {
        self.previous_position = transform.position;
        self.previous_rotation = transform.rotation;

        if self.is_immovable() {
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
            self.clear_forces();
            return;
        }

        self.force_accumulator += gravity * self.mass * self.gravity_scale;

        // Semi-implicit Euler: velocities first, then positions
        self.linear_velocity += self.force_accumulator * self.inverse_mass * dt;
        self.linear_velocity *= (1.0 - self.linear_damping).max(0.0);

        self.angular_velocity += self.torque_accumulator * self.inverse_inertia * dt;
        self.angular_velocity *= (1.0 - self.angular_damping).max(0.0);

        let frozen = self.constraints.freeze_position;
        let candidate = transform.position + self.linear_velocity * dt;
        transform.position = Vec3::select(frozen, transform.position, candidate);

        self.angular_velocity = Vec3::select(
            self.constraints.freeze_rotation,
            Vec3::ZERO,
            self.angular_velocity,
        );

        // q' = q + 0.5 * dt * omega_quat * q
        let omega = self.angular_velocity;
        if omega.length_squared() > 1e-10 {
            let omega_quat = Quat::from_xyzw(omega.x, omega.y, omega.z, 0.0);
            let q_dot = omega_quat * transform.rotation * 0.5;
            transform.rotation = Quat::from_xyzw(
                transform.rotation.x + q_dot.x * dt,
                transform.rotation.y + q_dot.y * dt,
                transform.rotation.z + q_dot.z * dt,
                transform.rotation.w + q_dot.w * dt,
            )
            .normalize();
        }

        // Velocity-proportional drag: a = -v * mu, never reversing direction
        if self.use_friction {
            self.linear_velocity *= (1.0 - self.friction * dt).max(0.0);
        }

        self.clear_forces();

        if let Some(mesh) = mesh {
            if !frozen.y {
                self.snap_to_ground(transform, mesh, ground_height);
            }
        }
    }

    #[inline]
    pub fn clear_forces(&mut self) {
        self.force_accumulator = Vec3::ZERO;
        self.torque_accumulator = Vec3::ZERO;
    }

    /// Lift the body so its lowest horizontal face rests on `ground_height`.
    ///
    /// Returns `true` if the body was moved.
    fn snap_to_ground(
        &mut self,
        transform: &mut Transform,
        mesh: &TriangleMesh,
        ground_height: f32,
    ) -> bool {
        let Some(lowest) = lowest_flat_face_height(mesh, transform.rotation, transform.scale)
        else {
            return false;
        };

        let world_lowest = transform.position.y + lowest;
        if world_lowest >= ground_height {
            return false;
        }

        transform.position.y += ground_height - world_lowest;
        if self.linear_velocity.y < 0.0 {
            self.linear_velocity.y = 0.0;
        }
        true
    }
}

/// Height (relative to the body origin) of the lowest vertex of the lowest
/// near-horizontal triangle, after rotation and scale.
fn lowest_flat_face_height(mesh: &TriangleMesh, rotation: Quat, scale: Vec3) -> Option<f32> {
    mesh.iter_triangles()
        .filter_map(|tri| {
            let ys = tri.map(|v| (rotation * (v * scale)).y);
            let min = ys[0].min(ys[1]).min(ys[2]);
            let max = ys[0].max(ys[1]).max(ys[2]);
            (max - min <= FLAT_FACE_TOLERANCE).then_some(min)
        })
        .min_by(f32::total_cmp)
}

/// Integrate the given bodies in order. Entities without both a `RigidBody`
/// and a `Transform` are skipped.
pub fn integrate_bodies(
    world: &mut hecs::World,
    bodies: &[hecs::Entity],
    gravity: Vec3,
    ground_height: f32,
    dt: f32,
) {
    for &entity in bodies {
        let Ok((rb, transform, mesh)) = world
            .query_one_mut::<(&mut RigidBody, &mut Transform, Option<&TriangleMesh>)>(entity)
        else {
            continue;
        };
        rb.integrate(transform, mesh, gravity, ground_height, dt);
    }
}

/// Synchronize Transform to GlobalTransform.
pub fn sync_transforms(world: &mut hecs::World) {
    for (_, (transform, global)) in world.query_mut::<(&Transform, &mut GlobalTransform)>() {
        global.0 = transform.to_matrix();
    }
}

/// Pose between the previous and current step, `alpha` in [0, 1].
pub fn interpolated(rb: &RigidBody, transform: &Transform, alpha: f32) -> (Vec3, Quat) {
    let alpha = alpha.clamp(0.0, 1.0);
    (
        rb.previous_position.lerp(transform.position, alpha),
        rb.previous_rotation.slerp(transform.rotation, alpha),
    )
}
