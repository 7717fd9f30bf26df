//! Collision notifications raised during the collision pass.

use glam::Vec3;

/// A notification for one collider about a contact found this tick.
///
/// Each detected pair produces one event per side. `normal` points from
/// `other` toward `collider`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionEvent {
    /// A physical contact between two solid colliders.
    CollisionEnter {
        collider: hecs::Entity,
        other: hecs::Entity,
        point: Vec3,
        normal: Vec3,
        penetration: f32,
    },
    /// An overlap involving a trigger; no response was applied.
    TriggerEnter {
        collider: hecs::Entity,
        other: hecs::Entity,
    },
}

impl CollisionEvent {
    /// The collider this event is addressed to.
    pub fn collider(&self) -> hecs::Entity {
        match *self {
            CollisionEvent::CollisionEnter { collider, .. }
            | CollisionEvent::TriggerEnter { collider, .. } => collider,
        }
    }

    pub fn other(&self) -> hecs::Entity {
        match *self {
            CollisionEvent::CollisionEnter { other, .. }
            | CollisionEvent::TriggerEnter { other, .. } => other,
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, CollisionEvent::TriggerEnter { .. })
    }
}
