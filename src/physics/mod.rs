//! CPU rigid-body collision detection and response.
//!
//! # Architecture
//!
//! The physics pipeline runs in a fixed timestep loop. Each step:
//!
//! 1. Integrate registered rigid bodies (gravity, damping, constraints, ground snap)
//! 2. Synchronize transforms
//! 3. Refresh every registered collider's cells in the [`SpatialGrid`]
//! 4. For each non-static collider, in registration order: query the grid for
//!    candidates, route each pair through the [`CollisionDispatcher`] to the
//!    matching narrowphase test and respond to any contact
//! 5. Synchronize transforms
//!
//! Each unordered collider pair is resolved at most once per step.

pub mod broadphase;
pub mod collider;
pub mod contact;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod narrowphase;
pub mod rigid_body;
pub mod solver;

use std::collections::HashSet;

use glam::Vec3;
use hecs::Entity;

use crate::ecs::components::physics::{Collider, RigidBody};
use crate::ecs::components::transform::Transform;

use self::broadphase::{SpatialGrid, DEFAULT_CELL_SIZE};
use self::contact::{ContactInfo, PairKey};
use self::dispatch::CollisionDispatcher;
use self::error::{validate_cell_size, PhysicsError};
use self::event::CollisionEvent;

/// Configuration for the physics simulation.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Gravity vector. Default: (0, -9.81, 0).
    pub gravity: Vec3,
    /// Fixed timestep for physics updates in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of sub-steps per frame. Default: 4.
    pub max_substeps: u32,
    /// Broadphase grid cell size. Default: 2.0.
    pub cell_size: f32,
    /// World height that bodies with a [`TriangleMesh`] snap onto. Default: 0.0.
    ///
    /// [`TriangleMesh`]: crate::ecs::components::physics::TriangleMesh
    pub ground_height: f32,
    /// Push a collider out of contacts where neither side has a rigid body.
    /// Default: false (such contacts only raise events).
    pub separate_unbodied: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            cell_size: DEFAULT_CELL_SIZE,
            ground_height: 0.0,
            separate_unbodied: false,
        }
    }
}

impl PhysicsConfig {
    /// Check the cell size and timestep.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        validate_cell_size(self.cell_size)?;
        if !(self.fixed_timestep.is_finite() && self.fixed_timestep > 0.0) {
            return Err(PhysicsError::InvalidTimestep(self.fixed_timestep));
        }
        Ok(())
    }
}

/// The main physics world managing simulation state.
///
/// Owns the broadphase grid, the ordered lists of registered colliders and
/// bodies, and the events raised since the last [`drain_events`](Self::drain_events).
/// Component data stays in the `hecs::World` passed to each call.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    accumulator: f64,
    grid: SpatialGrid,
    colliders: Vec<Entity>,
    bodies: Vec<Entity>,
    processed: HashSet<PairKey>,
    events: Vec<CollisionEvent>,
}

impl PhysicsWorld {
    /// Create a new physics world with the given configuration.
    ///
    /// An invalid cell size or timestep is logged and replaced with its default.
    pub fn new(mut config: PhysicsConfig) -> Self {
        if let Err(e) = validate_cell_size(config.cell_size) {
            tracing::warn!("{e}; using {DEFAULT_CELL_SIZE}");
            config.cell_size = DEFAULT_CELL_SIZE;
        }
        if let Err(e) = config.validate() {
            let fallback = PhysicsConfig::default().fixed_timestep;
            tracing::warn!("{e}; using {fallback}");
            config.fixed_timestep = fallback;
        }

        Self {
            grid: SpatialGrid::new(config.cell_size),
            config,
            accumulator: 0.0,
            colliders: Vec::new(),
            bodies: Vec::new(),
            processed: HashSet::new(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Registered colliders in processing order.
    pub fn colliders(&self) -> &[Entity] {
        &self.colliders
    }

    /// Registered rigid bodies in integration order.
    pub fn bodies(&self) -> &[Entity] {
        &self.bodies
    }

    /// Events raised since the last drain.
    pub fn events(&self) -> &[CollisionEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, CollisionEvent> {
        self.events.drain(..)
    }

    /// Fraction of a fixed step left in the accumulator, for rendering
    /// between `previous_position` and the current pose.
    pub fn interpolation_alpha(&self) -> f32 {
        (self.accumulator / self.config.fixed_timestep).clamp(0.0, 1.0) as f32
    }

    /// Change the broadphase cell size. Invalid sizes are logged and ignored.
    pub fn set_cell_size(&mut self, cell_size: f32) {
        self.grid.set_cell_size(cell_size);
        self.config.cell_size = self.grid.cell_size();
    }

    /// Register a collider and insert it into the grid.
    ///
    /// The entity needs a `Collider` and a `Transform`. Registering twice is a no-op.
    pub fn register_collider(
        &mut self,
        world: &hecs::World,
        entity: Entity,
    ) -> Result<(), PhysicsError> {
        world.entity(entity)?;
        let collider = world.get::<&Collider>(entity)?;
        let transform = world.get::<&Transform>(entity)?;

        let aabb = collider
            .shape
            .compute_aabb(&transform.collision_transform(collider.offset));
        self.grid.insert(entity, aabb.center(), aabb.size());

        if !self.colliders.contains(&entity) {
            self.colliders.push(entity);
            tracing::debug!(?entity, shape = ?collider.shape.kind(), "registered collider");
        }
        Ok(())
    }

    /// Register a rigid body for integration.
    ///
    /// The entity needs a `RigidBody` and a `Transform`. If it also has a
    /// `Collider`, the body's inertia tensor is computed from that shape.
    pub fn register_body(
        &mut self,
        world: &hecs::World,
        entity: Entity,
    ) -> Result<(), PhysicsError> {
        world.entity(entity)?;
        let transform = *world.get::<&Transform>(entity)?;
        let shape = world.get::<&Collider>(entity).ok().map(|c| c.shape);

        let mut rb = world.get::<&mut RigidBody>(entity)?;
        if let Some(shape) = shape {
            rb.set_inertia_from_shape(&shape, transform.scale);
        }
        rb.previous_position = transform.position;
        rb.previous_rotation = transform.rotation;

        if !self.bodies.contains(&entity) {
            self.bodies.push(entity);
            tracing::debug!(?entity, mass = rb.mass(), "registered rigid body");
        }
        Ok(())
    }

    /// Register whichever of collider and rigid body the entity carries.
    pub fn register(&mut self, world: &hecs::World, entity: Entity) -> Result<(), PhysicsError> {
        world.entity(entity)?;
        if world.get::<&Collider>(entity).is_ok() {
            self.register_collider(world, entity)?;
        }
        if world.get::<&RigidBody>(entity).is_ok() {
            self.register_body(world, entity)?;
        }
        Ok(())
    }

    pub fn unregister_collider(&mut self, entity: Entity) {
        self.grid.remove(entity);
        if let Some(index) = self.colliders.iter().position(|&e| e == entity) {
            self.colliders.remove(index);
            tracing::debug!(?entity, "unregistered collider");
        }
    }

    pub fn unregister_body(&mut self, entity: Entity) {
        if let Some(index) = self.bodies.iter().position(|&e| e == entity) {
            self.bodies.remove(index);
            tracing::debug!(?entity, "unregistered rigid body");
        }
    }

    /// Unregister an entity and remove it from the world.
    pub fn despawn(&mut self, world: &mut hecs::World, entity: Entity) -> Result<(), PhysicsError> {
        self.unregister_collider(entity);
        self.unregister_body(entity);
        world.despawn(entity)?;
        Ok(())
    }

    /// Colliders whose approximate bounds reach a sphere.
    pub fn overlap_sphere(&self, world: &hecs::World, center: Vec3, radius: f32) -> Vec<Entity> {
        self.grid.query_sphere(world, center, radius)
    }

    /// Step the physics simulation forward by `delta_time` seconds.
    ///
    /// Uses a fixed timestep accumulator to ensure deterministic simulation.
    pub fn step(&mut self, world: &mut hecs::World, delta_time: f64) {
        self.accumulator += delta_time;

        let mut substeps = 0u32;
        while self.accumulator >= self.config.fixed_timestep && substeps < self.config.max_substeps
        {
            self.fixed_step(world, self.config.fixed_timestep as f32);
            self.accumulator -= self.config.fixed_timestep;
            substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > self.config.fixed_timestep * self.config.max_substeps as f64 {
            self.accumulator = 0.0;
        }
    }

    /// Run exactly one step of `dt` seconds.
    pub fn fixed_step(&mut self, world: &mut hecs::World, dt: f32) {
        self.prune_dead(world);

        rigid_body::integrate_bodies(
            world,
            &self.bodies,
            self.config.gravity,
            self.config.ground_height,
            dt,
        );
        rigid_body::sync_transforms(world);

        for (_, collider) in world.query_mut::<&mut Collider>() {
            collider.is_colliding = false;
        }
        self.refresh_grid(world);

        self.processed.clear();
        for index in 0..self.colliders.len() {
            let entity = self.colliders[index];
            self.manage_collisions(world, entity);
        }

        rigid_body::sync_transforms(world);
    }

    /// Drop registrations whose entity was despawned without unregistering.
    fn prune_dead(&mut self, world: &hecs::World) {
        let grid = &mut self.grid;
        self.colliders.retain(|&e| {
            let alive = world.contains(e);
            if !alive {
                grid.remove(e);
                tracing::debug!(entity = ?e, "dropped collider of despawned entity");
            }
            alive
        });
        self.bodies.retain(|&e| world.contains(e));
    }

    fn refresh_grid(&mut self, world: &hecs::World) {
        for &entity in &self.colliders {
            let Some((collider, transform)) = collider_state(world, entity) else {
                continue;
            };
            let aabb = collider
                .shape
                .compute_aabb(&transform.collision_transform(collider.offset));
            self.grid.update(entity, aabb.center(), aabb.size());
        }
    }

    /// Detect and respond to every contact of one collider.
    ///
    /// Static colliders never run their own pass. Candidates whose entity is
    /// gone or lacks a `Collider`/`Transform` are skipped, as are pairs already
    /// resolved this step.
    pub fn manage_collisions(&mut self, world: &mut hecs::World, entity: Entity) {
        let Some((current, transform)) = collider_state(world, entity) else {
            return;
        };
        if current.is_static {
            return;
        }

        let global = transform.collision_transform(current.offset);
        let aabb = current.shape.compute_aabb(&global);
        let candidates = self.grid.query(world, entity, aabb.center(), aabb.size());

        let mut dispatcher = CollisionDispatcher::new(current.shape, global);

        for other in candidates {
            let key = PairKey::new(entity, other);
            if self.processed.contains(&key) {
                continue;
            }
            let Some((candidate, candidate_transform)) = collider_state(world, other) else {
                continue;
            };

            let candidate_global = candidate_transform.collision_transform(candidate.offset);
            let Some(contact) = dispatcher.resolve(&candidate.shape, &candidate_global) else {
                continue;
            };
            self.processed.insert(key);

            set_colliding(world, entity);
            set_colliding(world, other);

            if current.is_trigger || candidate.is_trigger {
                self.events.push(CollisionEvent::TriggerEnter {
                    collider: entity,
                    other,
                });
                self.events.push(CollisionEvent::TriggerEnter {
                    collider: other,
                    other: entity,
                });
                continue;
            }

            self.respond(world, entity, other, &candidate, &contact);

            tracing::trace!(
                ?entity,
                ?other,
                penetration = contact.penetration,
                "collision"
            );
            self.events.push(CollisionEvent::CollisionEnter {
                collider: entity,
                other,
                point: contact.point,
                normal: contact.normal,
                penetration: contact.penetration,
            });
            self.events.push(CollisionEvent::CollisionEnter {
                collider: other,
                other: entity,
                point: contact.point,
                normal: -contact.normal,
                penetration: contact.penetration,
            });

            // The response may have moved the current collider
            if let Ok(transform) = world.get::<&Transform>(entity) {
                dispatcher.set_current(current.shape, transform.collision_transform(current.offset));
            }
        }
    }

    /// Apply the physical response for one contact. `contact.normal` points
    /// from `other` toward `entity`.
    fn respond(
        &self,
        world: &mut hecs::World,
        entity: Entity,
        other: Entity,
        candidate: &Collider,
        contact: &ContactInfo,
    ) {
        let current_body = world.get::<&RigidBody>(entity).is_ok();
        let other_body = world.get::<&RigidBody>(other).is_ok();

        match (current_body, other_body) {
            // A static candidate never moves, with or without a body
            (true, true) if !candidate.is_static => {
                solver::resolve_pair(world, entity, other, contact);
            }
            (true, _) => {
                solver::resolve_static(world, entity, contact.normal, contact.penetration);
            }
            (false, true) => {
                if !candidate.is_static {
                    solver::resolve_static(world, other, -contact.normal, contact.penetration);
                }
            }
            (false, false) => {
                if self.config.separate_unbodied {
                    solver::separate(world, entity, contact.normal, contact.penetration);
                }
            }
        }
    }
}

/// Copy of an entity's collider and transform, if it has both.
fn collider_state(world: &hecs::World, entity: Entity) -> Option<(Collider, Transform)> {
    let collider = world.get::<&Collider>(entity).ok()?;
    let transform = world.get::<&Transform>(entity).ok()?;
    Some(((*collider).clone(), *transform))
}

fn set_colliding(world: &hecs::World, entity: Entity) {
    if let Ok(mut collider) = world.get::<&mut Collider>(entity) {
        collider.is_colliding = true;
    }
}
