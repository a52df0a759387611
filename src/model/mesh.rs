//! Triangle meshes for arrow parts, in arrow-local space (+Y from the start point).

use std::f32::consts::TAU;

use glam::Vec3;

use super::annotation::ArrowDimensions;
use crate::constants::arrow::SEGMENTS;

/// Indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Closed frustum around the Y axis between `y_bottom` and `y_top`.
///
/// A zero `radius_top` gives a cone; its top cap is omitted.
pub fn frustum(radius_bottom: f32, radius_top: f32, y_bottom: f32, y_top: f32, segments: u32) -> MeshData {
    let segments = segments.max(3);
    let mut mesh = MeshData::default();

    let ring = |radius: f32, y: f32| {
        (0..segments).map(move |i| {
            let angle = i as f32 / segments as f32 * TAU;
            Vec3::new(radius * angle.sin(), y, radius * angle.cos())
        })
    };

    mesh.positions.extend(ring(radius_bottom, y_bottom));
    mesh.positions.extend(ring(radius_top, y_top));

    for i in 0..segments {
        let next = (i + 1) % segments;
        let (b0, b1) = (i, next);
        let (t0, t1) = (i + segments, next + segments);
        mesh.indices.extend_from_slice(&[b0, b1, t1, b0, t1, t0]);
    }

    let mut cap = |radius: f32, y: f32, ring_start: u32, facing_up: bool| {
        if radius <= 0.0 {
            return;
        }
        let center = mesh.positions.len() as u32;
        mesh.positions.push(Vec3::new(0.0, y, 0.0));
        for i in 0..segments {
            let a = ring_start + i;
            let b = ring_start + (i + 1) % segments;
            if facing_up {
                mesh.indices.extend_from_slice(&[center, a, b]);
            } else {
                mesh.indices.extend_from_slice(&[center, b, a]);
            }
        }
    };
    cap(radius_bottom, y_bottom, 0, false);
    cap(radius_top, y_top, segments, true);

    mesh
}

/// Shaft cylinder from the start point up to the head.
pub fn arrow_shaft(dimensions: &ArrowDimensions) -> MeshData {
    frustum(
        dimensions.shaft_width,
        dimensions.shaft_width,
        0.0,
        dimensions.shaft_length,
        SEGMENTS,
    )
}

/// Head cone from the end of the shaft to the tip.
pub fn arrow_head(dimensions: &ArrowDimensions) -> MeshData {
    frustum(
        dimensions.head_width,
        0.0,
        dimensions.shaft_length,
        dimensions.length,
        SEGMENTS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cylinder_counts() {
        let mesh = frustum(1.0, 1.0, 0.0, 2.0, 12);
        // two rings plus two cap centres
        assert_eq!(mesh.positions.len(), 26);
        // sides + both caps
        assert_eq!(mesh.triangle_count(), 24 + 24);
    }

    #[test]
    fn test_cone_has_no_top_cap() {
        let mesh = frustum(1.0, 0.0, 0.0, 1.0, 12);
        assert_eq!(mesh.triangle_count(), 24 + 12);
    }

    #[test]
    fn test_arrow_parts_span_length() {
        let dims = ArrowDimensions::for_length(5.0).unwrap();
        let shaft = arrow_shaft(&dims);
        let head = arrow_head(&dims);

        let max_y = |m: &MeshData| m.positions.iter().map(|p| p.y).fold(f32::MIN, f32::max);
        let min_y = |m: &MeshData| m.positions.iter().map(|p| p.y).fold(f32::MAX, f32::min);

        assert!(min_y(&shaft).abs() < 1e-6);
        assert!((max_y(&shaft) - 4.0).abs() < 1e-5);
        assert!((min_y(&head) - 4.0).abs() < 1e-5);
        assert!((max_y(&head) - 5.0).abs() < 1e-5);
        assert!(shaft.indices.iter().all(|&i| (i as usize) < shaft.positions.len()));
    }
}
