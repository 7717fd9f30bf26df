use glam::{Quat, Vec3};
use rein_collision::ecs::components::physics::{
    Collider, ColliderShape, Constraints, RigidBody, TriangleMesh,
};
use rein_collision::ecs::components::transform::{GlobalTransform, Transform};
use rein_collision::physics::event::CollisionEvent;
use rein_collision::physics::{PhysicsConfig, PhysicsWorld};

const FRAME_TIME: f64 = 1.0 / 60.0;
const FRAMES: usize = 300;

/// Drop a few bodies of each shape onto static ground and log what they hit.
struct DropScene {
    physics: PhysicsWorld,
    world: hecs::World,
    trigger: hecs::Entity,
}

impl DropScene {
    fn new() -> anyhow::Result<Self> {
        let mut scene = Self {
            physics: PhysicsWorld::new(PhysicsConfig::default()),
            world: hecs::World::new(),
            trigger: hecs::Entity::DANGLING,
        };

        // Ground slab with its top face at y=0
        scene.spawn(
            Transform::from_position(Vec3::new(0.0, -0.5, 0.0)),
            Collider::new_static(ColliderShape::cuboid(40.0, 1.0, 40.0)),
            None,
        )?;

        // Pickup zone around the landing area of the first sphere
        scene.trigger = scene.spawn(
            Transform::from_position(Vec3::new(-3.0, 0.5, 0.0)),
            Collider::new_trigger(ColliderShape::cuboid(2.0, 1.0, 2.0)),
            None,
        )?;

        for i in 0..3 {
            let x = i as f32 * 3.0 - 3.0;
            scene.spawn(
                Transform::from_position(Vec3::new(x, 4.0 + i as f32, 0.0)),
                Collider::new(ColliderShape::Sphere { radius: 0.5 }),
                Some(RigidBody::new_dynamic(1.0).with_restitution(0.6)),
            )?;

            scene.spawn(
                Transform::from_position_rotation(
                    Vec3::new(x, 6.0 + i as f32, 3.0),
                    Quat::from_rotation_z(0.3 * i as f32),
                ),
                Collider::new(ColliderShape::cuboid(1.0, 1.0, 1.0)),
                Some(RigidBody::new_dynamic(2.0).with_friction(0.5)),
            )?;

            scene.spawn(
                Transform::from_position(Vec3::new(x, 8.0 + i as f32, -3.0)),
                Collider::new(ColliderShape::Capsule {
                    radius: 0.3,
                    height: 1.6,
                }),
                Some(RigidBody::new_dynamic(1.0).with_constraints(Constraints::FREEZE_ROTATION)),
            )?;
        }

        // A crate that snaps onto the ground through its mesh
        let crate_entity = scene.spawn(
            Transform::from_position(Vec3::new(6.0, 3.0, 0.0)),
            Collider::new(ColliderShape::cuboid(1.0, 1.0, 1.0)),
            Some(RigidBody::new_dynamic(1.0)),
        )?;
        scene
            .world
            .insert_one(crate_entity, TriangleMesh::cuboid(Vec3::ONE))?;

        log::info!(
            "spawned {} colliders, {} bodies",
            scene.physics.colliders().len(),
            scene.physics.bodies().len()
        );
        Ok(scene)
    }

    fn spawn(
        &mut self,
        transform: Transform,
        collider: Collider,
        body: Option<RigidBody>,
    ) -> anyhow::Result<hecs::Entity> {
        let entity = self
            .world
            .spawn((transform, GlobalTransform::from(&transform), collider));
        if let Some(body) = body {
            self.world.insert_one(entity, body)?;
        }
        self.physics.register(&self.world, entity)?;
        Ok(entity)
    }

    fn update(&mut self, frame: usize) {
        self.physics.step(&mut self.world, FRAME_TIME);

        for event in self.physics.drain_events() {
            match event {
                CollisionEvent::TriggerEnter { collider, other } if collider == self.trigger => {
                    log::info!("frame {frame}: {other:?} entered the pickup zone");
                }
                CollisionEvent::CollisionEnter {
                    collider,
                    other,
                    penetration,
                    ..
                } if penetration > 0.05 => {
                    log::debug!("frame {frame}: {collider:?} hit {other:?} ({penetration:.3})");
                }
                _ => {}
            }
        }
    }

    fn report(&self) {
        for (entity, (transform, rb)) in self.world.query::<(&Transform, &RigidBody)>().iter() {
            log::info!(
                "{entity:?}: position {:.2?} speed {:.3}",
                transform.position,
                rb.linear_velocity.length()
            );
        }

        let nearby = self.physics.overlap_sphere(&self.world, Vec3::ZERO, 2.0);
        log::info!("{} colliders within 2m of the origin", nearby.len());
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut scene = DropScene::new()?;
    for frame in 0..FRAMES {
        scene.update(frame);
    }
    scene.report();
    Ok(())
}
