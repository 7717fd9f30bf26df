//! Shared setup helpers for rein-collision benchmarks.
//!
//! ## Running
//!
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics
//!
//! Filter by group:
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics -- broadphase

use glam::Vec3;
use rein_collision::ecs::components::physics::{Collider, ColliderShape, RigidBody};
use rein_collision::ecs::components::transform::{GlobalTransform, Transform};
use rein_collision::physics::{PhysicsConfig, PhysicsWorld};

/// Spawn an entity with a collider (and optional body) and register it.
pub fn spawn_registered(
    world: &mut hecs::World,
    physics: &mut PhysicsWorld,
    position: Vec3,
    collider: Collider,
    body: Option<RigidBody>,
) -> anyhow::Result<hecs::Entity> {
    let transform = Transform::from_position(position);
    let entity = world.spawn((transform, GlobalTransform::from(&transform), collider));
    if let Some(body) = body {
        world.insert_one(entity, body)?;
    }
    physics.register(world, entity)?;
    Ok(entity)
}

// ---------------------------------------------------------------------------
// Basic scenes
// ---------------------------------------------------------------------------

fn grid_scene(
    n: usize,
    spacing: f32,
    mut shape_for: impl FnMut(usize) -> Collider,
) -> anyhow::Result<(hecs::World, PhysicsWorld)> {
    let mut world = hecs::World::new();
    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    let cols = (n as f32).sqrt().ceil() as usize;

    for i in 0..n {
        let x = (i % cols) as f32 * spacing;
        let z = (i / cols) as f32 * spacing;
        let collider = shape_for(i);
        let body = (!collider.is_static).then(|| RigidBody::new_dynamic(1.0));
        spawn_registered(&mut world, &mut physics, Vec3::new(x, 0.0, z), collider, body)?;
    }
    Ok((world, physics))
}

/// `n` dynamic unit spheres 1.5 apart, so neighbours overlap.
pub fn setup_sphere_world(n: usize) -> anyhow::Result<(hecs::World, PhysicsWorld)> {
    grid_scene(n, 1.5, |_| Collider::new(ColliderShape::Sphere { radius: 1.0 }))
}

/// Alternating dynamic spheres, static boxes and dynamic capsules.
pub fn setup_mixed_world(n: usize) -> anyhow::Result<(hecs::World, PhysicsWorld)> {
    grid_scene(n, 1.5, |i| match i % 3 {
        0 => Collider::new(ColliderShape::Sphere { radius: 1.0 }),
        1 => Collider::new_static(ColliderShape::cuboid(1.0, 1.0, 1.0)),
        _ => Collider::new(ColliderShape::Capsule {
            radius: 0.5,
            height: 2.0,
        }),
    })
}

/// Bodies spread far apart (no overlaps).
pub fn setup_sparse_world(n: usize) -> anyhow::Result<(hecs::World, PhysicsWorld)> {
    grid_scene(n, 10.0, |_| Collider::new(ColliderShape::Sphere { radius: 0.5 }))
}

/// Static ground + `n` dynamic bodies above it (mixed spheres/boxes).
pub fn setup_scene(n: usize) -> anyhow::Result<(hecs::World, PhysicsWorld)> {
    let mut world = hecs::World::new();
    let mut physics = PhysicsWorld::new(PhysicsConfig::default());

    spawn_registered(
        &mut world,
        &mut physics,
        Vec3::new(0.0, -0.5, 0.0),
        Collider::new_static(ColliderShape::cuboid(200.0, 1.0, 200.0)),
        None,
    )?;

    let cols = (n as f32).sqrt().ceil() as usize;
    for i in 0..n {
        let x = (i % cols) as f32 * 2.0 - (cols as f32);
        let z = (i / cols) as f32 * 2.0 - (cols as f32);
        let y = 1.0 + (i % 5) as f32 * 1.5;

        let shape = if i % 2 == 0 {
            ColliderShape::Sphere { radius: 0.5 }
        } else {
            ColliderShape::cuboid(0.8, 0.8, 0.8)
        };
        spawn_registered(
            &mut world,
            &mut physics,
            Vec3::new(x, y, z),
            Collider::new(shape),
            Some(RigidBody::new_dynamic(1.0)),
        )?;
    }

    Ok((world, physics))
}

// ---------------------------------------------------------------------------
// Solver setup
// ---------------------------------------------------------------------------

/// `n` approaching sphere pairs laid out along X, each overlapping by 0.1.
pub fn setup_pairs(n: usize) -> anyhow::Result<(hecs::World, Vec<(hecs::Entity, hecs::Entity)>)> {
    let mut world = hecs::World::new();
    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    let mut pairs = Vec::with_capacity(n);

    for i in 0..n {
        let x = i as f32 * 4.0;
        let a = spawn_registered(
            &mut world,
            &mut physics,
            Vec3::new(x, 0.0, 0.0),
            Collider::new(ColliderShape::Sphere { radius: 0.5 }),
            Some(RigidBody::new_dynamic(1.0).with_velocity(Vec3::X)),
        )?;
        let b = spawn_registered(
            &mut world,
            &mut physics,
            Vec3::new(x + 0.9, 0.0, 0.0),
            Collider::new(ColliderShape::Sphere { radius: 0.5 }),
            Some(RigidBody::new_dynamic(1.0).with_velocity(-Vec3::X)),
        )?;
        pairs.push((a, b));
    }

    Ok((world, pairs))
}

// ---------------------------------------------------------------------------
// Mass physics scenario (continuous spawning)
// ---------------------------------------------------------------------------

const SPAWN_RADIUS: f32 = 8.0;
const SPAWN_HEIGHT: f32 = 15.0;

/// Spawn a single physics object at a deterministic position.
fn spawn_object(
    world: &mut hecs::World,
    physics: &mut PhysicsWorld,
    index: usize,
) -> anyhow::Result<()> {
    let angle = (index * 137) as f32 * 0.01;
    let r = SPAWN_RADIUS * (((index * 73 + 17) % 100) as f32 / 100.0).sqrt();
    let height_jitter = (index % 5) as f32 * 0.6;
    let pos = Vec3::new(
        r * angle.cos(),
        SPAWN_HEIGHT + height_jitter,
        r * angle.sin(),
    );

    let shape = match index % 3 {
        0 => ColliderShape::Sphere { radius: 0.4 },
        1 => ColliderShape::cuboid(0.8, 0.8, 0.8),
        _ => ColliderShape::Capsule {
            radius: 0.3,
            height: 1.2,
        },
    };

    spawn_registered(
        world,
        physics,
        pos,
        Collider::new(shape),
        Some(RigidBody::new_dynamic(1.0)),
    )?;
    Ok(())
}

/// Ground + `initial` pre-existing falling bodies.
pub fn setup_mass_scene(initial: usize) -> anyhow::Result<(hecs::World, PhysicsWorld)> {
    let mut world = hecs::World::new();
    let mut physics = PhysicsWorld::new(PhysicsConfig::default());

    spawn_registered(
        &mut world,
        &mut physics,
        Vec3::ZERO,
        Collider::new_static(ColliderShape::cuboid(40.0, 10.0, 40.0))
            .with_offset(Vec3::new(0.0, -5.0, 0.0)),
        None,
    )?;

    for i in 0..initial {
        spawn_object(&mut world, &mut physics, i)?;
    }

    Ok((world, physics))
}

/// Run `frames` frames, spawning `spawn_per_frame` objects each frame + physics step.
pub fn run_mass_physics(
    world: &mut hecs::World,
    physics: &mut PhysicsWorld,
    frames: usize,
    spawn_per_frame: usize,
    start_index: usize,
) -> anyhow::Result<()> {
    let mut idx = start_index;
    for _ in 0..frames {
        for _ in 0..spawn_per_frame {
            spawn_object(world, physics, idx)?;
            idx += 1;
        }
        physics.step(world, 1.0 / 60.0);
        let _ = physics.drain_events();
    }
    Ok(())
}
