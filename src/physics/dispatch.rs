//! Double dispatch from a pair of collider shapes to the matching narrowphase test.
//!
//! The candidate shape calls back into a [`ShapeVisitor`] with its concrete
//! parameters ([`ColliderShape::accept`]); [`CollisionDispatcher`] then matches
//! on the shape of the collider currently being resolved. Both steps are
//! exhaustive matches, so adding a shape is a compile error until every pair
//! has a test.

use glam::Vec3;

use crate::ecs::components::physics::ColliderShape;
use crate::ecs::components::transform::GlobalTransform;

use super::contact::ContactInfo;
use super::narrowphase::{
    box_box, box_capsule, box_sphere, capsule_capsule, capsule_sphere, sphere_sphere,
};

/// One entry point per concrete shape.
pub trait ShapeVisitor {
    type Output;

    /// `size` is the full box extents before scale.
    fn visit_box(&mut self, size: Vec3, transform: &GlobalTransform) -> Self::Output;

    fn visit_sphere(&mut self, radius: f32, transform: &GlobalTransform) -> Self::Output;

    /// `height` is the total capsule height including both caps.
    fn visit_capsule(
        &mut self,
        radius: f32,
        height: f32,
        transform: &GlobalTransform,
    ) -> Self::Output;
}

impl ColliderShape {
    /// Call the visitor entry point matching this shape.
    #[inline]
    pub fn accept<V: ShapeVisitor>(&self, transform: &GlobalTransform, visitor: &mut V) -> V::Output {
        match *self {
            ColliderShape::Box { size } => visitor.visit_box(size, transform),
            ColliderShape::Sphere { radius } => visitor.visit_sphere(radius, transform),
            ColliderShape::Capsule { radius, height } => {
                visitor.visit_capsule(radius, height, transform)
            }
        }
    }
}

/// Resolves contacts against the collider currently being processed.
///
/// Every contact it reports has its normal pointing from the visited
/// (candidate) shape toward the current shape.
#[derive(Debug, Clone, Copy)]
pub struct CollisionDispatcher {
    shape: ColliderShape,
    transform: GlobalTransform,
}

impl CollisionDispatcher {
    pub fn new(shape: ColliderShape, transform: GlobalTransform) -> Self {
        Self { shape, transform }
    }

    /// Replace the current collider for the next resolution pass.
    pub fn set_current(&mut self, shape: ColliderShape, transform: GlobalTransform) {
        self.shape = shape;
        self.transform = transform;
    }

    pub fn current_shape(&self) -> &ColliderShape {
        &self.shape
    }

    /// Test `other` against the current collider.
    #[inline]
    pub fn resolve(
        &mut self,
        other: &ColliderShape,
        other_transform: &GlobalTransform,
    ) -> Option<ContactInfo> {
        other.accept(other_transform, self)
    }
}

impl ShapeVisitor for CollisionDispatcher {
    type Output = Option<ContactInfo>;

    fn visit_box(&mut self, size: Vec3, transform: &GlobalTransform) -> Self::Output {
        let half = size * 0.5;
        match self.shape {
            ColliderShape::Box { size: current } => {
                box_box(half, transform, current * 0.5, &self.transform)
            }
            ColliderShape::Sphere { radius } => box_sphere(half, transform, radius, &self.transform),
            ColliderShape::Capsule { radius, height } => {
                box_capsule(half, transform, radius, height, &self.transform)
            }
        }
    }

    fn visit_sphere(&mut self, radius: f32, transform: &GlobalTransform) -> Self::Output {
        match self.shape {
            ColliderShape::Box { size } => {
                box_sphere(size * 0.5, &self.transform, radius, transform).map(ContactInfo::flipped)
            }
            ColliderShape::Sphere { radius: current } => {
                sphere_sphere(radius, transform, current, &self.transform)
            }
            ColliderShape::Capsule {
                radius: current,
                height,
            } => capsule_sphere(current, height, &self.transform, radius, transform)
                .map(ContactInfo::flipped),
        }
    }

    fn visit_capsule(
        &mut self,
        radius: f32,
        height: f32,
        transform: &GlobalTransform,
    ) -> Self::Output {
        match self.shape {
            ColliderShape::Box { size } => {
                box_capsule(size * 0.5, &self.transform, radius, height, transform)
                    .map(ContactInfo::flipped)
            }
            ColliderShape::Sphere { radius: current } => {
                capsule_sphere(radius, height, transform, current, &self.transform)
            }
            ColliderShape::Capsule {
                radius: current,
                height: current_height,
            } => capsule_capsule(
                radius,
                height,
                transform,
                current,
                current_height,
                &self.transform,
            ),
        }
    }
}

/// Detect collision between two shapes.
///
/// The returned normal points from `shape_a` toward `shape_b`.
pub fn detect_collision(
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
) -> Option<ContactInfo> {
    CollisionDispatcher::new(*shape_a, *transform_a)
        .resolve(shape_b, transform_b)
        .map(ContactInfo::flipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::ShapeKind;
    use glam::Mat4;

    fn shapes() -> [ColliderShape; 3] {
        [
            ColliderShape::cuboid(2.0, 2.0, 2.0),
            ColliderShape::Sphere { radius: 1.0 },
            ColliderShape::Capsule {
                radius: 1.0,
                height: 3.0,
            },
        ]
    }

    struct KindVisitor;

    impl ShapeVisitor for KindVisitor {
        type Output = ShapeKind;

        fn visit_box(&mut self, _: Vec3, _: &GlobalTransform) -> ShapeKind {
            ShapeKind::Box
        }

        fn visit_sphere(&mut self, _: f32, _: &GlobalTransform) -> ShapeKind {
            ShapeKind::Sphere
        }

        fn visit_capsule(&mut self, _: f32, _: f32, _: &GlobalTransform) -> ShapeKind {
            ShapeKind::Capsule
        }
    }

    #[test]
    fn test_accept_calls_matching_entry_point() {
        let transform = GlobalTransform::default();
        for shape in shapes() {
            assert_eq!(shape.accept(&transform, &mut KindVisitor), shape.kind());
        }
    }

    #[test]
    fn test_dispatcher_normal_points_toward_current() {
        // Every shape reaches 1.0 along X from its center, so all nine ordered
        // pairs overlap by 0.5 when 1.5 apart.
        let current_transform = GlobalTransform(Mat4::IDENTITY);
        let other_transform = GlobalTransform(Mat4::from_translation(Vec3::new(1.5, 0.0, 0.0)));
        let eps = 1e-4;

        for current in shapes() {
            let mut dispatcher = CollisionDispatcher::new(current, current_transform);
            for other in shapes() {
                let info = dispatcher
                    .resolve(&other, &other_transform)
                    .unwrap_or_else(|| panic!("{:?} vs {:?}", current.kind(), other.kind()));
                assert!(
                    (info.normal + Vec3::X).length() < eps,
                    "{:?} vs {:?}: {:?}",
                    current.kind(),
                    other.kind(),
                    info.normal
                );
                assert!((info.penetration - 0.5).abs() < eps);
            }
        }
    }

    #[test]
    fn test_dispatcher_misses() {
        let far = GlobalTransform(Mat4::from_translation(Vec3::new(2.5, 0.0, 0.0)));
        for current in shapes() {
            let mut dispatcher = CollisionDispatcher::new(current, GlobalTransform::default());
            for other in shapes() {
                assert!(dispatcher.resolve(&other, &far).is_none());
            }
        }
    }

    #[test]
    fn test_set_current_switches_test() {
        let mut dispatcher = CollisionDispatcher::new(
            ColliderShape::Sphere { radius: 0.1 },
            GlobalTransform::default(),
        );
        let other = ColliderShape::Sphere { radius: 1.0 };
        let other_transform = GlobalTransform(Mat4::from_translation(Vec3::new(1.5, 0.0, 0.0)));
        assert!(dispatcher.resolve(&other, &other_transform).is_none());

        dispatcher.set_current(ColliderShape::cuboid(2.0, 2.0, 2.0), GlobalTransform::default());
        assert_eq!(dispatcher.current_shape().kind(), ShapeKind::Box);
        assert!(dispatcher.resolve(&other, &other_transform).is_some());
    }

    #[test]
    fn test_detect_collision_normal_points_a_to_b() {
        let ta = GlobalTransform::default();
        let tb = GlobalTransform(Mat4::from_translation(Vec3::new(0.0, 0.0, 1.5)));
        let eps = 1e-4;
        for a in shapes() {
            for b in shapes() {
                let info = detect_collision(&a, &ta, &b, &tb).unwrap();
                assert!((info.normal - Vec3::Z).length() < eps);
            }
        }
    }
}
