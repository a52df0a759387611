//! Ray casting against annotations.
//!
//! Labels are unit quads in their local XY plane; arrows are a shaft cylinder
//! plus a head cone along local +Y. Rays are moved into the local frame of the
//! object, so the returned distances are measured along the world ray.

use glam::{Mat4, Vec2, Vec3};

use crate::geometry::{Ray, Transform};
use crate::model::{Annotation, AnnotationId, AnnotationKind, ArrowDimensions};

const EPSILON: f32 = 1e-7;

/// Part of a composite annotation that a ray hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickPart {
    Label,
    ArrowShaft,
    ArrowHead,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub id: AnnotationId,
    pub distance: f32,
    pub point: Vec3,
    pub part: PickPart,
}

/// Nearest annotation hit by `ray`. Insertion order does not matter.
pub fn pick(ray: &Ray, candidates: &[Annotation]) -> Option<PickHit> {
    candidates
        .iter()
        .filter_map(|annotation| {
            let (distance, part) = intersect_annotation(ray, annotation)?;
            Some(PickHit {
                id: annotation.id(),
                distance,
                point: ray.at(distance),
                part,
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Distance along `ray` to the nearest part of `annotation`.
pub fn intersect_annotation(ray: &Ray, annotation: &Annotation) -> Option<(f32, PickPart)> {
    match annotation.kind() {
        AnnotationKind::TextLabel(_) => {
            ray_label_quad(ray, annotation.transform()).map(|(t, _)| (t, PickPart::Label))
        }
        AnnotationKind::Arrow(arrow) => ray_arrow(ray, annotation.transform(), arrow.dimensions()),
    }
}

/// Hit on a unit quad centred at the transform origin, with its texture coordinate.
///
/// `uv = (0, 0)` is the top-left corner of the label bitmap.
pub fn ray_label_quad(ray: &Ray, transform: &Transform) -> Option<(f32, Vec2)> {
    ray_unit_quad(ray, &transform.matrix().inverse())
}

/// [`ray_label_quad`] with the inverse model matrix already computed.
pub fn ray_unit_quad(ray: &Ray, inverse: &Mat4) -> Option<(f32, Vec2)> {
    if !inverse.is_finite() {
        return None;
    }
    let origin = inverse.transform_point3(ray.origin);
    let direction = inverse.transform_vector3(ray.direction);
    if direction.z.abs() < EPSILON {
        return None;
    }
    let t = -origin.z / direction.z;
    if t < 0.0 {
        return None;
    }
    let p = origin + direction * t;
    if p.x.abs() > 0.5 || p.y.abs() > 0.5 {
        return None;
    }
    Some((t, Vec2::new(p.x + 0.5, 0.5 - p.y)))
}

/// Hit on an arrow's shaft or head.
pub fn ray_arrow(ray: &Ray, transform: &Transform, dimensions: &ArrowDimensions) -> Option<(f32, PickPart)> {
    let inverse = transform.rotation.inverse();
    let origin = inverse * (ray.origin - transform.position);
    let direction = inverse * ray.direction;

    let shaft = [
        ray_cylinder(origin, direction, dimensions.shaft_width, 0.0, dimensions.shaft_length),
        ray_disc(origin, direction, 0.0, dimensions.shaft_width),
        ray_disc(origin, direction, dimensions.shaft_length, dimensions.shaft_width),
    ]
    .into_iter()
    .flatten()
    .map(|t| (t, PickPart::ArrowShaft));

    let head = [
        ray_cone(origin, direction, dimensions.head_width, dimensions.shaft_length, dimensions.length),
        ray_disc(origin, direction, dimensions.shaft_length, dimensions.head_width),
    ]
    .into_iter()
    .flatten()
    .map(|t| (t, PickPart::ArrowHead));

    shaft.chain(head).min_by(|a, b| a.0.total_cmp(&b.0))
}

/// Smallest non-negative root of `a t² + b t + c` accepted by `valid`.
fn nearest_root(a: f32, b: f32, c: f32, valid: impl Fn(f32) -> bool) -> Option<f32> {
    let roots: [Option<f32>; 2] = if a.abs() < EPSILON {
        if b.abs() < EPSILON {
            return None;
        }
        [Some(-c / b), None]
    } else {
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        [Some((-b - root) / (2.0 * a)), Some((-b + root) / (2.0 * a))]
    };
    roots
        .into_iter()
        .flatten()
        .filter(|&t| t >= 0.0 && valid(t))
        .min_by(f32::total_cmp)
}

/// Open cylinder of `radius` around +Y between `y0` and `y1`.
fn ray_cylinder(o: Vec3, d: Vec3, radius: f32, y0: f32, y1: f32) -> Option<f32> {
    let a = d.x * d.x + d.z * d.z;
    let b = 2.0 * (o.x * d.x + o.z * d.z);
    let c = o.x * o.x + o.z * o.z - radius * radius;
    nearest_root(a, b, c, |t| (y0..=y1).contains(&(o.y + d.y * t)))
}

/// Open cone around +Y with its base of `radius` at `base_y` and apex at `apex_y`.
fn ray_cone(o: Vec3, d: Vec3, radius: f32, base_y: f32, apex_y: f32) -> Option<f32> {
    let height = apex_y - base_y;
    if height <= 0.0 {
        return None;
    }
    let k2 = (radius / height).powi(2);
    let w = apex_y - o.y;
    let a = d.x * d.x + d.z * d.z - k2 * d.y * d.y;
    let b = 2.0 * (o.x * d.x + o.z * d.z) + 2.0 * k2 * w * d.y;
    let c = o.x * o.x + o.z * o.z - k2 * w * w;
    nearest_root(a, b, c, |t| (base_y..=apex_y).contains(&(o.y + d.y * t)))
}

/// Disc of `radius` in the plane `y = height`.
fn ray_disc(o: Vec3, d: Vec3, height: f32, radius: f32) -> Option<f32> {
    if d.y.abs() < EPSILON {
        return None;
    }
    let t = (height - o.y) / d.y;
    if t < 0.0 {
        return None;
    }
    let p = o + d * t;
    (p.x * p.x + p.z * p.z <= radius * radius).then_some(t)
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::color::Rgb;
    use crate::geometry::look_at_rotation;
    use crate::model::create_arrow;

    fn towards(target: Vec3) -> Ray {
        Ray::new(Vec3::ZERO, target)
    }

    fn label_transform(position: Vec3, width: f32, height: f32) -> Transform {
        Transform {
            position,
            rotation: look_at_rotation(position, Vec3::ZERO),
            scale: Vec3::new(width, height, 1.0),
        }
    }

    #[test]
    fn test_label_quad_hit_and_uv() {
        let transform = label_transform(Vec3::new(0.0, 0.0, 4.5), 2.0, 1.0);

        let (t, uv) = ray_label_quad(&towards(Vec3::Z), &transform).unwrap();
        assert!((t - 4.5).abs() < 1e-4);
        assert!((uv - Vec2::splat(0.5)).length() < 1e-4);

        // The top edge of the quad maps to v = 0.
        let (_, uv) = ray_label_quad(&towards(Vec3::new(0.0, 0.45, 4.5)), &transform).unwrap();
        assert!(uv.y < 0.1);

        assert!(ray_label_quad(&towards(Vec3::new(0.9, 0.0, 4.5)), &transform).is_some());
        assert!(ray_label_quad(&towards(Vec3::new(1.2, 0.0, 4.5)), &transform).is_none());
        assert!(ray_label_quad(&towards(Vec3::NEG_Z), &transform).is_none());
    }

    #[test]
    fn test_arrow_parts_are_distinguished() {
        // Vertical arrow from (0,0,4) to (0,2,4): shaft up to y = 1.6, head above.
        let arrow = create_arrow(AnnotationId(1), Vec3::new(0.0, 0.0, 4.0), Vec3::new(0.0, 2.0, 4.0), Rgb::RED)
            .unwrap();

        let (_, part) = intersect_annotation(&towards(Vec3::new(0.0, 0.8, 4.0)), &arrow).unwrap();
        assert_eq!(part, PickPart::ArrowShaft);

        let (t, part) = intersect_annotation(&towards(Vec3::new(0.0, 1.7, 4.0)), &arrow).unwrap();
        assert_eq!(part, PickPart::ArrowHead);
        assert!(t < Vec3::new(0.0, 1.7, 4.0).length());

        assert!(intersect_annotation(&towards(Vec3::new(0.5, 0.8, 4.0)), &arrow).is_none());
        assert!(intersect_annotation(&towards(Vec3::new(0.0, 2.5, 4.0)), &arrow).is_none());
    }

    #[test]
    fn test_nearest_hit_wins_regardless_of_order() {
        let far = create_arrow(AnnotationId(1), Vec3::new(0.0, -1.0, 4.5), Vec3::new(0.0, 1.0, 4.5), Rgb::RED)
            .unwrap();
        let near = create_arrow(AnnotationId(2), Vec3::new(0.0, -1.0, 3.0), Vec3::new(0.0, 1.0, 3.0), Rgb::RED)
            .unwrap();
        let ray = towards(Vec3::Z);

        let hit = pick(&ray, &[far, near]).unwrap();
        assert_eq!(hit.id, AnnotationId(2));
        assert!((hit.distance - (3.0 - 0.08)).abs() < 1e-3);
        assert!((hit.point - ray.at(hit.distance)).length() < 1e-6);
    }

    #[test]
    fn test_pick_empty_set_misses() {
        assert!(pick(&towards(Vec3::Z), &[]).is_none());
    }

    #[test]
    fn test_rotated_arrow_hit() {
        // Arrow lying along +X at z = 4.
        let transform = Transform::from_position_rotation(
            Vec3::new(-1.0, 0.0, 4.0),
            Quat::from_rotation_arc(Vec3::Y, Vec3::X),
        );
        let dims = ArrowDimensions::for_length(2.0).unwrap();
        assert!(ray_arrow(&towards(Vec3::new(0.0, 0.0, 4.0)), &transform, &dims).is_some());
        assert!(ray_arrow(&towards(Vec3::new(0.0, 0.5, 4.0)), &transform, &dims).is_none());
    }
}
