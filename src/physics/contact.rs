//! Contact data structures for collision response.

use glam::Vec3;

/// Information about a single contact between two shapes.
///
/// Narrow-phase tests return `Option<ContactInfo>`; `None` means no contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInfo {
    /// Unit contact normal (from shape A to shape B).
    pub normal: Vec3,
    /// Penetration depth, non-negative.
    pub penetration: f32,
    /// Contact point in world space.
    pub point: Vec3,
}

impl ContactInfo {
    /// The same contact seen from the other shape.
    #[inline]
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Order-independent key for a collider pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(hecs::Entity, hecs::Entity);

impl PairKey {
    /// Canonical pair key (smaller entity first).
    pub fn new(a: hecs::Entity, b: hecs::Entity) -> Self {
        if a < b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    pub fn entities(&self) -> (hecs::Entity, hecs::Entity) {
        (self.0, self.1)
    }
}
