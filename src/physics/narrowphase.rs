//! Narrowphase collision detection: exact tests for every pair of box, sphere and capsule.
//!
//! Every test returns `Some(ContactInfo)` when the shapes overlap, with the
//! normal pointing from the first shape toward the second. Shapes that only
//! touch (zero overlap) are not in contact.
//!
//! Swapping the arguments negates the normal, with one exception: when the
//! direction is undefined (coincident sphere centers, or a center or segment
//! on or inside a box) the normal is `+Y` for either argument order.

use glam::Vec3;

use crate::ecs::components::transform::GlobalTransform;

use super::collider::{capsule_segment, sphere_world_radius};
use super::contact::ContactInfo;

const EPSILON: f32 = 1e-6;

/// SAT (Separating Axis Theorem) test for box-box collision.
///
/// Tests the 15 candidate axes and reports the one with the smallest positive
/// overlap. Cross-product axes with length squared below `1e-6` come from
/// parallel edges and are skipped.
pub fn box_box(
    half_a: Vec3,
    transform_a: &GlobalTransform,
    half_b: Vec3,
    transform_b: &GlobalTransform,
) -> Option<ContactInfo> {
    let center_a = transform_a.translation();
    let center_b = transform_b.translation();

    let axes_a = transform_a.axes();
    let axes_b = transform_b.axes();

    let half_a = half_a * transform_a.scale();
    let half_b = half_b * transform_b.scale();
    let half_a_arr = half_a.to_array();
    let half_b_arr = half_b.to_array();

    let t = center_b - center_a;

    let mut min_overlap = f32::MAX;
    let mut best_axis = Vec3::ZERO;

    let mut test = |axis: Vec3| -> bool {
        match sat_test_axis(axis, &axes_a, &half_a_arr, &axes_b, &half_b_arr, t) {
            Some(overlap) => {
                if overlap < min_overlap {
                    min_overlap = overlap;
                    best_axis = axis;
                }
                true
            }
            None => false,
        }
    };

    // A's face normals, then B's
    for axis in axes_a.iter().chain(axes_b.iter()) {
        if !test(*axis) {
            return None;
        }
    }

    // Edge-edge cross products
    for a in &axes_a {
        for b in &axes_b {
            let axis = a.cross(*b);
            let len_sq = axis.length_squared();
            if len_sq < EPSILON {
                continue;
            }
            if !test(axis / len_sq.sqrt()) {
                return None;
            }
        }
    }

    if best_axis == Vec3::ZERO {
        return None;
    }

    // Ensure normal points from A to B
    if best_axis.dot(t) < 0.0 {
        best_axis = -best_axis;
    }

    let proj_a = project_half_extents(best_axis, &axes_a, &half_a_arr);
    let proj_b = project_half_extents(best_axis, &axes_b, &half_b_arr);

    // Contact depth along the axis: midpoint between the two closest faces
    let face_a = center_a.dot(best_axis) + proj_a;
    let face_b = center_b.dot(best_axis) - proj_b;
    let contact_d = (face_a + face_b) * 0.5;

    // Lateral position from the smaller box, projected onto the contact plane
    let ref_center = if proj_a > proj_b { center_b } else { center_a };
    let point = ref_center + best_axis * (contact_d - ref_center.dot(best_axis));

    Some(ContactInfo {
        normal: best_axis,
        penetration: min_overlap,
        point,
    })
}

#[inline]
fn project_half_extents(axis: Vec3, axes: &[Vec3; 3], half: &[f32; 3]) -> f32 {
    half[0] * axes[0].dot(axis).abs()
        + half[1] * axes[1].dot(axis).abs()
        + half[2] * axes[2].dot(axis).abs()
}

/// Test a single SAT axis. Returns Some(overlap) if overlapping, None if separating.
#[inline]
fn sat_test_axis(
    axis: Vec3,
    axes_a: &[Vec3; 3],
    half_a: &[f32; 3],
    axes_b: &[Vec3; 3],
    half_b: &[f32; 3],
    t: Vec3,
) -> Option<f32> {
    let proj_a = project_half_extents(axis, axes_a, half_a);
    let proj_b = project_half_extents(axis, axes_b, half_b);

    let dist = t.dot(axis).abs();
    let overlap = proj_a + proj_b - dist;

    if overlap > 0.0 {
        Some(overlap)
    } else {
        None
    }
}

/// Oriented box in world space with scaled half extents.
struct WorldBox {
    center: Vec3,
    axes: [Vec3; 3],
    half: Vec3,
}

impl WorldBox {
    fn new(half_extents: Vec3, transform: &GlobalTransform) -> Self {
        Self {
            center: transform.translation(),
            axes: transform.axes(),
            half: half_extents * transform.scale(),
        }
    }

    #[inline]
    fn to_local(&self, point: Vec3) -> Vec3 {
        let diff = point - self.center;
        Vec3::new(
            diff.dot(self.axes[0]),
            diff.dot(self.axes[1]),
            diff.dot(self.axes[2]),
        )
    }

    #[inline]
    fn to_world(&self, local: Vec3) -> Vec3 {
        self.center + self.axes[0] * local.x + self.axes[1] * local.y + self.axes[2] * local.z
    }

    /// Clamp a local point onto the box volume.
    #[inline]
    fn clamp_local(&self, local: Vec3) -> Vec3 {
        local.clamp(-self.half, self.half)
    }
}

/// Specialized box-sphere intersection test.
///
/// When the sphere center lies on or inside the box the normal falls back to `+Y`.
pub fn box_sphere(
    half_extents: Vec3,
    box_transform: &GlobalTransform,
    radius: f32,
    sphere_transform: &GlobalTransform,
) -> Option<ContactInfo> {
    let sphere_center = sphere_transform.translation();
    let world_radius = sphere_world_radius(radius, sphere_transform);
    let obb = WorldBox::new(half_extents, box_transform);

    // Clamp to box extents to find closest point on box
    let closest_world = obb.to_world(obb.clamp_local(obb.to_local(sphere_center)));

    let to_sphere = sphere_center - closest_world;
    let dist_sq = to_sphere.length_squared();

    if dist_sq >= world_radius * world_radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > EPSILON {
        to_sphere / dist
    } else {
        Vec3::Y
    };

    Some(ContactInfo {
        normal,
        penetration: world_radius - dist,
        point: closest_world,
    })
}

/// Box-capsule intersection test using the exact distance between the
/// capsule's central segment and the box.
///
/// When the segment touches or crosses the box the normal falls back to `+Y`.
pub fn box_capsule(
    half_extents: Vec3,
    box_transform: &GlobalTransform,
    radius: f32,
    height: f32,
    capsule_transform: &GlobalTransform,
) -> Option<ContactInfo> {
    let segment = capsule_segment(radius, height, capsule_transform);
    let obb = WorldBox::new(half_extents, box_transform);

    let start = obb.to_local(segment.start);
    let end = obb.to_local(segment.end);
    let t = closest_segment_parameter_to_box(start, end - start, obb.half);

    let on_segment = start + (end - start) * t;
    let on_box = obb.clamp_local(on_segment);

    let dist_sq = (on_segment - on_box).length_squared();
    if dist_sq >= segment.radius * segment.radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    let segment_world = obb.to_world(on_segment);
    let box_world = obb.to_world(on_box);
    let normal = if dist > EPSILON {
        (segment_world - box_world) / dist
    } else {
        Vec3::Y
    };

    Some(ContactInfo {
        normal,
        penetration: segment.radius - dist,
        point: box_world,
    })
}

/// Parameter in [0, 1] of the segment point closest to an origin-centered box.
///
/// Squared distance to the box is `sum(max(0, |p_i(t)| - h_i)^2)`, a convex
/// piecewise quadratic in `t`. Its pieces are bounded by the parameters where a
/// coordinate crosses a face plane; each piece is minimized in closed form.
fn closest_segment_parameter_to_box(start: Vec3, dir: Vec3, half: Vec3) -> f32 {
    let sq_dist_at = |t: f32| -> f32 {
        let p = start + dir * t;
        let excess = (p.abs() - half).max(Vec3::ZERO);
        excess.length_squared()
    };

    // At most 6 face-plane crossings plus both ends
    let mut breaks = [0.0f32; 8];
    let mut count = 0;
    breaks[count] = 0.0;
    count += 1;
    breaks[count] = 1.0;
    count += 1;
    for i in 0..3 {
        if dir[i].abs() < EPSILON {
            continue;
        }
        for plane in [-half[i], half[i]] {
            let t = (plane - start[i]) / dir[i];
            if t > 0.0 && t < 1.0 {
                breaks[count] = t;
                count += 1;
            }
        }
    }
    let breaks = &mut breaks[..count];
    breaks.sort_by(f32::total_cmp);

    let mut best_t = 0.0;
    let mut best = sq_dist_at(0.0);

    for pair in breaks.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if hi - lo <= 0.0 {
            continue;
        }
        let mid = start + dir * ((lo + hi) * 0.5);

        // On this piece each axis is either inside its slab (no term) or
        // beyond one face: (start_i + dir_i t - face_i)^2
        let mut a = 0.0;
        let mut b = 0.0;
        for i in 0..3 {
            let face = if mid[i] > half[i] {
                half[i]
            } else if mid[i] < -half[i] {
                -half[i]
            } else {
                continue;
            };
            a += dir[i] * dir[i];
            b += 2.0 * dir[i] * (start[i] - face);
        }

        let t = if a > EPSILON {
            (-b / (2.0 * a)).clamp(lo, hi)
        } else {
            lo
        };
        for candidate in [t, hi] {
            let d = sq_dist_at(candidate);
            if d < best {
                best = d;
                best_t = candidate;
            }
        }
    }

    best_t
}

/// Specialized sphere-sphere intersection test.
///
/// Coincident centers report `+Y` regardless of argument order, with the
/// penetration equal to the sum of the radii.
pub fn sphere_sphere(
    radius_a: f32,
    transform_a: &GlobalTransform,
    radius_b: f32,
    transform_b: &GlobalTransform,
) -> Option<ContactInfo> {
    let center_a = transform_a.translation();
    let center_b = transform_b.translation();

    // Account for scale
    let world_radius_a = sphere_world_radius(radius_a, transform_a);
    let world_radius_b = sphere_world_radius(radius_b, transform_b);

    let diff = center_b - center_a;
    let dist_sq = diff.length_squared();
    let min_dist = world_radius_a + world_radius_b;

    if dist_sq >= min_dist * min_dist {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > EPSILON { diff / dist } else { Vec3::Y };

    let penetration = min_dist - dist;
    let point = center_a + normal * (world_radius_a - penetration * 0.5);

    Some(ContactInfo {
        normal,
        penetration,
        point,
    })
}

/// Capsule-sphere intersection test.
pub fn capsule_sphere(
    capsule_radius: f32,
    capsule_height: f32,
    capsule_transform: &GlobalTransform,
    sphere_radius: f32,
    sphere_transform: &GlobalTransform,
) -> Option<ContactInfo> {
    let segment = capsule_segment(capsule_radius, capsule_height, capsule_transform);
    let sphere_center = sphere_transform.translation();
    let world_radius = sphere_world_radius(sphere_radius, sphere_transform);

    let closest = closest_point_on_segment(sphere_center, segment.start, segment.end);
    spheres_contact(closest, segment.radius, sphere_center, world_radius)
}

/// Capsule-capsule intersection test.
pub fn capsule_capsule(
    radius_a: f32,
    height_a: f32,
    transform_a: &GlobalTransform,
    radius_b: f32,
    height_b: f32,
    transform_b: &GlobalTransform,
) -> Option<ContactInfo> {
    let seg_a = capsule_segment(radius_a, height_a, transform_a);
    let seg_b = capsule_segment(radius_b, height_b, transform_b);

    let (on_a, on_b) = closest_points_segments(
        seg_a.start,
        seg_a.end - seg_a.start,
        seg_b.start,
        seg_b.end - seg_b.start,
    );
    spheres_contact(on_a, seg_a.radius, on_b, seg_b.radius)
}

/// Contact between two spheres given by center and world radius.
/// Falls back to `+Y` when the centers coincide.
fn spheres_contact(
    center_a: Vec3,
    radius_a: f32,
    center_b: Vec3,
    radius_b: f32,
) -> Option<ContactInfo> {
    let diff = center_b - center_a;
    let dist_sq = diff.length_squared();
    let min_dist = radius_a + radius_b;
    if dist_sq >= min_dist * min_dist {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > EPSILON { diff / dist } else { Vec3::Y };
    let penetration = min_dist - dist;

    Some(ContactInfo {
        normal,
        penetration,
        point: center_a + normal * (radius_a - penetration * 0.5),
    })
}

/// Closest point to `point` on the segment `start..end`.
#[inline]
pub fn closest_point_on_segment(point: Vec3, start: Vec3, end: Vec3) -> Vec3 {
    let ab = end - start;
    let len_sq = ab.length_squared();
    if len_sq < EPSILON {
        return start;
    }
    let t = ((point - start).dot(ab) / len_sq).clamp(0.0, 1.0);
    start + ab * t
}

/// Closest points between segments `start_a + s * dir_a` and
/// `start_b + t * dir_b` with `s, t` in [0, 1].
///
/// Parallel segments pick `s = 0` and clamp the other parameter.
pub fn closest_points_segments(
    start_a: Vec3,
    dir_a: Vec3,
    start_b: Vec3,
    dir_b: Vec3,
) -> (Vec3, Vec3) {
    let r = start_a - start_b;
    let a = dir_a.dot(dir_a);
    let e = dir_b.dot(dir_b);
    let f = dir_b.dot(r);

    // Both segments degenerate to points
    if a < EPSILON && e < EPSILON {
        return (start_a, start_b);
    }

    let (s, t);
    if a < EPSILON {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = dir_a.dot(r);
        if e < EPSILON {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = dir_a.dot(dir_b);
            let denom = a * e - b * b;

            s = if denom.abs() > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let t_num = b * s + f;
            if t_num < 0.0 {
                let s = (-c / a).clamp(0.0, 1.0);
                return (start_a + dir_a * s, start_b);
            }
            if t_num > e {
                let s = ((b - c) / a).clamp(0.0, 1.0);
                return (start_a + dir_a * s, start_b + dir_b);
            }
            t = t_num / e;
        }
    }

    (start_a + dir_a * s, start_b + dir_b * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Quat};

    fn at(x: f32, y: f32, z: f32) -> GlobalTransform {
        GlobalTransform(Mat4::from_translation(Vec3::new(x, y, z)))
    }

    fn posed(position: Vec3, rotation: Quat) -> GlobalTransform {
        GlobalTransform(Mat4::from_rotation_translation(rotation, position))
    }

    #[test]
    fn test_sphere_sphere_intersection() {
        let info = sphere_sphere(1.0, &at(0.0, 0.0, 0.0), 1.0, &at(1.5, 0.0, 0.0)).unwrap();
        let eps = 1e-4;
        assert!((info.normal - Vec3::X).length() < eps);
        assert!((info.penetration - 0.5).abs() < eps);
        assert!((info.point - Vec3::new(0.75, 0.0, 0.0)).length() < eps);
    }

    #[test]
    fn test_sphere_sphere_no_intersection() {
        assert!(sphere_sphere(1.0, &at(0.0, 0.0, 0.0), 1.0, &at(2.5, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_sphere_sphere_touching_is_not_contact() {
        assert!(sphere_sphere(1.0, &at(0.0, 0.0, 0.0), 1.0, &at(2.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_sphere_sphere_coincident_uses_fallback_normal() {
        let info = sphere_sphere(1.0, &at(0.0, 0.0, 0.0), 0.5, &at(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(info.normal, Vec3::Y);
        assert!((info.penetration - 1.5).abs() < 1e-5);

        // No direction to negate, so the swapped order keeps +Y
        let swapped = sphere_sphere(0.5, &at(0.0, 0.0, 0.0), 1.0, &at(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(swapped.normal, Vec3::Y);
        assert!((swapped.penetration - 1.5).abs() < 1e-5);

        // Sphere center on the capsule segment
        let info = capsule_sphere(0.3, 2.0, &at(0.0, 0.0, 0.0), 0.5, &at(0.0, 0.2, 0.0)).unwrap();
        assert_eq!(info.normal, Vec3::Y);
        assert!((info.penetration - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_sphere_scaled() {
        let scaled = GlobalTransform(Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::IDENTITY,
            Vec3::ZERO,
        ));
        // World radius 2 + 1 reaches past 2.5
        let info = sphere_sphere(1.0, &scaled, 1.0, &at(2.5, 0.0, 0.0)).unwrap();
        assert!((info.penetration - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_box_box_intersection() {
        let info = box_box(
            Vec3::splat(1.0),
            &at(0.0, 0.0, 0.0),
            Vec3::splat(1.0),
            &at(1.5, 0.0, 0.0),
        )
        .unwrap();
        let eps = 1e-4;
        assert!((info.normal - Vec3::X).length() < eps);
        assert!((info.penetration - 0.5).abs() < eps);
        // Midway between A's +X face (1.0) and B's -X face (0.5)
        assert!((info.point.x - 0.75).abs() < eps);
    }

    #[test]
    fn test_box_box_no_intersection() {
        assert!(box_box(
            Vec3::splat(1.0),
            &at(0.0, 0.0, 0.0),
            Vec3::splat(1.0),
            &at(2.5, 0.0, 0.0)
        )
        .is_none());
    }

    #[test]
    fn test_box_box_touching_is_not_contact() {
        assert!(box_box(
            Vec3::splat(1.0),
            &at(0.0, 0.0, 0.0),
            Vec3::splat(1.0),
            &at(2.0, 0.0, 0.0)
        )
        .is_none());
    }

    #[test]
    fn test_box_box_picks_minimum_overlap_axis() {
        // Deep along X, shallow along Y
        let info = box_box(
            Vec3::splat(1.0),
            &at(0.0, 0.0, 0.0),
            Vec3::splat(1.0),
            &at(0.2, -1.8, 0.0),
        )
        .unwrap();
        let eps = 1e-4;
        assert!((info.normal + Vec3::Y).length() < eps);
        assert!((info.penetration - 0.2).abs() < eps);
    }

    #[test]
    fn test_box_box_rotated_diamond() {
        // B rotated 45 degrees about Z: its corner reaches sqrt(2) along X
        let b = posed(
            Vec3::new(2.3, 0.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_4),
        );
        let info = box_box(Vec3::splat(1.0), &at(0.0, 0.0, 0.0), Vec3::splat(1.0), &b).unwrap();
        let eps = 1e-4;
        let expected = 1.0 + std::f32::consts::SQRT_2 - 2.3;
        assert!((info.penetration - expected).abs() < eps);
        assert!((info.normal - Vec3::X).length() < eps);

        let far = posed(
            Vec3::new(2.5, 0.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_4),
        );
        assert!(box_box(Vec3::splat(1.0), &at(0.0, 0.0, 0.0), Vec3::splat(1.0), &far).is_none());
    }

    #[test]
    fn test_box_box_symmetry() {
        let ta = posed(Vec3::ZERO, Quat::from_rotation_y(0.3));
        let tb = posed(Vec3::new(0.9, 0.3, -0.2), Quat::from_rotation_x(0.7));
        let half_a = Vec3::new(1.0, 0.5, 0.75);
        let half_b = Vec3::new(0.5, 0.5, 0.5);

        let ab = box_box(half_a, &ta, half_b, &tb).unwrap();
        let ba = box_box(half_b, &tb, half_a, &ta).unwrap();
        let eps = 1e-4;
        assert!((ab.penetration - ba.penetration).abs() < eps);
        assert!((ab.normal + ba.normal).length() < eps);
    }

    #[test]
    fn test_box_sphere_face_contact() {
        let info = box_sphere(Vec3::splat(1.0), &at(0.0, 0.0, 0.0), 0.5, &at(0.0, 1.25, 0.0))
            .unwrap();
        let eps = 1e-4;
        assert!((info.normal - Vec3::Y).length() < eps);
        assert!((info.penetration - 0.25).abs() < eps);
        assert!((info.point - Vec3::new(0.0, 1.0, 0.0)).length() < eps);
    }

    #[test]
    fn test_box_sphere_corner_and_miss() {
        // Diagonal from the (1, 1, 0) edge
        let d = 0.3 / std::f32::consts::SQRT_2;
        let info = box_sphere(
            Vec3::splat(1.0),
            &at(0.0, 0.0, 0.0),
            0.5,
            &at(1.0 + d, 1.0 + d, 0.0),
        )
        .unwrap();
        let eps = 1e-4;
        assert!((info.penetration - 0.2).abs() < eps);
        let diag = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert!((info.normal - diag).length() < eps);

        assert!(
            box_sphere(Vec3::splat(1.0), &at(0.0, 0.0, 0.0), 0.5, &at(0.0, 1.6, 0.0)).is_none()
        );
    }

    #[test]
    fn test_box_sphere_center_inside_uses_fallback() {
        let info =
            box_sphere(Vec3::splat(1.0), &at(0.0, 0.0, 0.0), 0.5, &at(0.2, 0.0, 0.0)).unwrap();
        assert_eq!(info.normal, Vec3::Y);
        assert!((info.penetration - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_box_sphere_rotated_box() {
        let tb = posed(Vec3::ZERO, Quat::from_rotation_z(std::f32::consts::FRAC_PI_4));
        // Rotated unit box reaches sqrt(2) along X
        let info = box_sphere(Vec3::splat(1.0), &tb, 0.5, &at(1.8, 0.0, 0.0)).unwrap();
        let eps = 1e-4;
        assert!((info.penetration - (std::f32::consts::SQRT_2 + 0.5 - 1.8)).abs() < eps);
        assert!((info.normal - Vec3::X).length() < eps);
    }

    #[test]
    fn test_box_capsule_standing_on_box() {
        // Capsule of total height 2 standing with its bottom 0.1 inside the box top
        let info = box_capsule(
            Vec3::new(2.0, 0.5, 2.0),
            &at(0.0, 0.0, 0.0),
            0.5,
            2.0,
            &at(0.0, 1.4, 0.0),
        )
        .unwrap();
        let eps = 1e-4;
        assert!((info.normal - Vec3::Y).length() < eps);
        assert!((info.penetration - 0.1).abs() < eps);
        assert!((info.point - Vec3::new(0.0, 0.5, 0.0)).length() < eps);
    }

    #[test]
    fn test_box_capsule_lying_across_edge() {
        // Horizontal capsule whose segment passes just past the box's +X/+Y edge
        let capsule = posed(
            Vec3::new(1.05, 1.05, 0.0),
            Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
        );
        let info = box_capsule(Vec3::splat(1.0), &at(0.0, 0.0, 0.0), 0.1, 4.0, &capsule).unwrap();
        let eps = 1e-4;
        let dist = (0.05f32 * 0.05 * 2.0).sqrt();
        assert!((info.penetration - (0.1 - dist)).abs() < eps);
        let diag = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert!((info.normal - diag).length() < eps);
    }

    #[test]
    fn test_box_capsule_steep_thin_segment() {
        // A thin, steep capsule whose closest approach to the box corner lies
        // midway along its segment, 0.01 outside the corner
        let corner = Vec3::ONE;
        let outward = Vec3::ONE.normalize();
        let dir = Vec3::new(1.0, -2.0, 1.0).normalize();
        let capsule = posed(corner + outward * 0.01, Quat::from_rotation_arc(Vec3::Y, dir));

        let info = box_capsule(Vec3::splat(1.0), &at(0.0, 0.0, 0.0), 0.02, 6.0, &capsule)
            .expect("grazing contact");
        let eps = 1e-4;
        assert!((info.penetration - 0.01).abs() < eps);
        assert!((info.normal - outward).length() < 1e-2);
        assert!((info.point - corner).length() < eps);

        let miss = box_capsule(Vec3::splat(1.0), &at(0.0, 0.0, 0.0), 0.005, 6.0, &capsule);
        assert!(miss.is_none());
    }

    #[test]
    fn test_box_capsule_segment_crossing_box_uses_fallback() {
        let info =
            box_capsule(Vec3::splat(1.0), &at(0.0, 0.0, 0.0), 0.5, 4.0, &at(0.5, 0.0, 0.0))
                .unwrap();
        assert_eq!(info.normal, Vec3::Y);
        assert!((info.penetration - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_box_capsule_miss() {
        assert!(
            box_capsule(Vec3::splat(1.0), &at(0.0, 0.0, 0.0), 0.5, 2.0, &at(0.0, 3.0, 0.0))
                .is_none()
        );
    }

    #[test]
    fn test_capsule_sphere() {
        // Vertical capsule, segment y in [-1, 1]; sphere beside its middle
        let info = capsule_sphere(0.5, 3.0, &at(0.0, 0.0, 0.0), 0.5, &at(0.8, 0.5, 0.0)).unwrap();
        let eps = 1e-4;
        assert!((info.normal - Vec3::X).length() < eps);
        assert!((info.penetration - 0.2).abs() < eps);

        // Above the top cap
        let info = capsule_sphere(0.5, 3.0, &at(0.0, 0.0, 0.0), 0.5, &at(0.0, 1.9, 0.0)).unwrap();
        assert!((info.normal - Vec3::Y).length() < eps);
        assert!((info.penetration - 0.1).abs() < eps);

        assert!(capsule_sphere(0.5, 3.0, &at(0.0, 0.0, 0.0), 0.5, &at(0.0, 2.1, 0.0)).is_none());
    }

    fn assert_swapped(ab: ContactInfo, ba: ContactInfo, eps: f32) {
        assert!((ab.penetration - ba.penetration).abs() < eps);
        assert!((ab.normal + ba.normal).length() < eps);
    }

    #[test]
    fn test_box_capsule_symmetry() {
        use crate::ecs::components::physics::ColliderShape;
        use crate::physics::dispatch::detect_collision;

        let box_shape = ColliderShape::cuboid(2.0, 1.0, 1.5);
        let capsule = ColliderShape::Capsule {
            radius: 0.4,
            height: 2.0,
        };
        let tb = posed(Vec3::ZERO, Quat::from_rotation_y(0.5));
        let tc = posed(Vec3::new(1.1, 0.9, 0.0), Quat::from_rotation_z(0.6));

        let direct = box_capsule(Vec3::new(1.0, 0.5, 0.75), &tb, 0.4, 2.0, &tc).unwrap();
        let eps = 1e-3;
        assert!((direct.penetration - 0.2238).abs() < eps);
        assert!((direct.normal - Vec3::new(0.7524, 0.5148, -0.4110)).length() < eps);

        let ab = detect_collision(&box_shape, &tb, &capsule, &tc).unwrap();
        let ba = detect_collision(&capsule, &tc, &box_shape, &tb).unwrap();
        assert!((ab.normal - direct.normal).length() < 1e-5);
        assert_swapped(ab, ba, 1e-5);
    }

    #[test]
    fn test_capsule_sphere_symmetry() {
        use crate::ecs::components::physics::ColliderShape;
        use crate::physics::dispatch::detect_collision;

        let capsule = ColliderShape::Capsule {
            radius: 0.5,
            height: 3.0,
        };
        let sphere = ColliderShape::Sphere { radius: 0.6 };
        let tc = posed(Vec3::new(0.2, 0.1, -0.3), Quat::from_rotation_x(0.7));
        let ts = posed(Vec3::new(0.9, 0.6, 0.1), Quat::from_rotation_y(1.1));

        let direct = capsule_sphere(0.5, 3.0, &tc, 0.6, &ts).unwrap();
        let eps = 1e-3;
        assert!((direct.penetration - 0.3998).abs() < eps);
        assert!((direct.normal - Vec3::new(0.9997, 0.0149, -0.0177)).length() < eps);

        // A capsule no taller than its diameter is a sphere, taken in the other order
        let as_capsule = capsule_capsule(0.6, 1.2, &ts, 0.5, 3.0, &tc).unwrap();
        assert_swapped(direct, as_capsule, 1e-4);

        let ab = detect_collision(&capsule, &tc, &sphere, &ts).unwrap();
        let ba = detect_collision(&sphere, &ts, &capsule, &tc).unwrap();
        assert_swapped(ab, ba, 1e-5);
    }

    #[test]
    fn test_capsule_capsule_symmetry() {
        let ta = posed(Vec3::ZERO, Quat::from_rotation_z(0.5));
        let tb = posed(Vec3::new(0.5, 0.3, 0.2), Quat::from_rotation_x(0.9));

        let ab = capsule_capsule(0.4, 2.0, &ta, 0.3, 1.8, &tb).unwrap();
        let ba = capsule_capsule(0.3, 1.8, &tb, 0.4, 2.0, &ta).unwrap();
        let eps = 1e-3;
        assert!((ab.penetration - 0.2266).abs() < eps);
        assert!((ab.normal - Vec3::new(0.8201, 0.4483, -0.3557)).length() < eps);
        assert_swapped(ab, ba, 1e-4);
    }

    #[test]
    fn test_capsule_capsule_crossed() {
        // Perpendicular capsules, one vertical and one along Z, 0.8 apart on X
        let lying = posed(
            Vec3::new(0.8, 0.0, 0.0),
            Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
        );
        let info = capsule_capsule(0.5, 3.0, &at(0.0, 0.0, 0.0), 0.5, 3.0, &lying).unwrap();
        let eps = 1e-4;
        assert!((info.normal - Vec3::X).length() < eps);
        assert!((info.penetration - 0.2).abs() < eps);
    }

    #[test]
    fn test_capsule_capsule_parallel() {
        let info =
            capsule_capsule(0.5, 3.0, &at(0.0, 0.0, 0.0), 0.5, 3.0, &at(0.0, 0.5, 0.9)).unwrap();
        let eps = 1e-4;
        assert!((info.normal - Vec3::Z).length() < eps);
        assert!((info.penetration - 0.1).abs() < eps);

        assert!(
            capsule_capsule(0.5, 3.0, &at(0.0, 0.0, 0.0), 0.5, 3.0, &at(0.0, 0.0, 1.1)).is_none()
        );
    }

    #[test]
    fn test_closest_point_on_segment_clamps() {
        let a = Vec3::ZERO;
        let b = Vec3::new(2.0, 0.0, 0.0);
        assert_eq!(closest_point_on_segment(Vec3::new(-1.0, 1.0, 0.0), a, b), a);
        assert_eq!(closest_point_on_segment(Vec3::new(3.0, 1.0, 0.0), a, b), b);
        assert_eq!(
            closest_point_on_segment(Vec3::new(1.0, 1.0, 0.0), a, b),
            Vec3::new(1.0, 0.0, 0.0)
        );
        assert_eq!(closest_point_on_segment(Vec3::ONE, a, a), a);
    }

    #[test]
    fn test_closest_points_segments_skew() {
        let (p, q) = closest_points_segments(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, -1.0),
            Vec3::new(0.0, 0.0, 2.0),
        );
        let eps = 1e-5;
        assert!(p.length() < eps);
        assert!((q - Vec3::new(0.0, 1.0, 0.0)).length() < eps);
    }

    #[test]
    fn test_segment_box_parameter_matches_brute_force() {
        let half = Vec3::new(1.0, 0.5, 0.75);
        let cases = [
            (Vec3::new(-3.0, 2.0, 0.1), Vec3::new(6.0, -0.5, 0.3)),
            (Vec3::new(2.0, -2.0, 2.0), Vec3::new(-1.0, 5.0, -3.0)),
            (Vec3::new(0.0, 3.0, 0.0), Vec3::new(0.1, 0.2, 0.0)),
        ];
        for (start, dir) in cases {
            let sq = |t: f32| {
                let p = start + dir * t;
                ((p.abs() - half).max(Vec3::ZERO)).length_squared()
            };
            let t = closest_segment_parameter_to_box(start, dir, half);
            let brute = (0..=10_000)
                .map(|i| sq(i as f32 / 10_000.0))
                .fold(f32::MAX, f32::min);
            assert!(sq(t) <= brute + 1e-4, "t = {t}, {} vs {brute}", sq(t));
        }
    }
}
