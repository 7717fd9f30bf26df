//! Rein collision detection and rigid body response.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **ecs** - hecs components (`Transform`, `GlobalTransform`, `Collider`, `RigidBody`, `TriangleMesh`)
//! 2. **physics** - Uniform grid broadphase, shape-pair narrowphase tests,
//!    visitor-based dispatch, impulse solver and the fixed-step [`PhysicsWorld`]
//!
//! Component data lives in a `hecs::World` owned by the caller. The
//! [`PhysicsWorld`] keeps registration order, the broadphase grid and the
//! events raised by each step.

pub mod ecs;
pub mod physics;

// Re-export commonly used types
pub use ecs::prelude::*;

pub use physics::broadphase::{CellIndex, SpatialGrid};
pub use physics::collider::PhysicsAabb;
pub use physics::contact::{ContactInfo, PairKey};
pub use physics::dispatch::{detect_collision, CollisionDispatcher, ShapeVisitor};
pub use physics::error::PhysicsError;
pub use physics::event::CollisionEvent;
pub use physics::{PhysicsConfig, PhysicsWorld};

// Re-export glam and hecs for convenience
pub use glam;
pub use hecs;
