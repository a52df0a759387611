//! Geometry and projection utilities.
//!
//! Pure functions shared by picking, rendering and export: ray/sphere
//! intersection, screen to NDC conversion, the equirectangular mapping in both
//! directions, cube face addressing, and the rotation helpers used to orient
//! annotations.

use std::f32::consts::PI;

use glam::{Mat3, Mat4, Quat, Vec2, Vec3};

/// Ray with a unit-length (or zero) direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Intersection with the plane through `point` with normal `normal`, if in front.
    pub fn intersect_plane(&self, point: Vec3, normal: Vec3) -> Option<Vec3> {
        let denom = self.direction.dot(normal);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = (point - self.origin).dot(normal) / denom;
        (t >= 0.0).then(|| self.at(t))
    }
}

/// Position and rotation/scale of an object in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Pixel rectangle of the drawing surface in pointer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewportRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Rectangle of a surface that starts at the pointer origin.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width.max(1) as f32, height.max(1) as f32)
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// Nearest forward intersection of a ray with the origin-centred sphere.
///
/// Returns `None` on a miss, when both intersections lie behind `origin`, or
/// when `direction` is zero. `direction` does not need to be normalised.
pub fn ray_sphere_hit(origin: Vec3, direction: Vec3, radius: f32) -> Option<Vec3> {
    let dir = direction.normalize_or_zero();
    if dir == Vec3::ZERO {
        return None;
    }
    let b = origin.dot(dir);
    let c = origin.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let near = -b - root;
    let far = -b + root;
    let t = if near >= 0.0 {
        near
    } else if far >= 0.0 {
        far
    } else {
        return None;
    };
    Some(origin + dir * t)
}

/// Pointer position to normalised device coordinates (y up).
pub fn screen_to_ndc(px: f32, py: f32, rect: &ViewportRect) -> Vec2 {
    Vec2::new(
        (px - rect.left) / rect.width * 2.0 - 1.0,
        -((py - rect.top) / rect.height) * 2.0 + 1.0,
    )
}

/// View direction for equirectangular coordinates `u, v` in `[0, 1]`.
///
/// `theta = PI - u * 2PI`, `phi = v * PI`; `v = 0` is straight up.
pub fn equirect_direction_for_pixel(u: f32, v: f32) -> Vec3 {
    let theta = PI - u * 2.0 * PI;
    let phi = v * PI;
    Vec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos())
}

/// Inverse of [`equirect_direction_for_pixel`]; `u` lands in `[0, 1)`.
pub fn equirect_uv_for_direction(direction: Vec3) -> Vec2 {
    let dir = direction.normalize_or_zero();
    let phi = dir.y.clamp(-1.0, 1.0).acos();
    let theta = dir.x.atan2(dir.z);
    let u = (PI - theta) / (2.0 * PI);
    Vec2::new(if u >= 1.0 { u - 1.0 } else { u }, phi / PI)
}

/// Rotation taking unit vector `from` onto unit vector `to`.
pub fn rotation_between(from: Vec3, to: Vec3) -> Quat {
    Quat::from_rotation_arc(from.normalize(), to.normalize())
}

/// Rotation that points an object's +Z axis from `position` towards `target`, keeping +Y up.
pub fn look_at_rotation(position: Vec3, target: Vec3) -> Quat {
    let forward = (target - position).normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let mut right = Vec3::Y.cross(forward);
    if right.length_squared() < 1e-10 {
        // Looking straight up or down: any horizontal right vector will do.
        right = Vec3::Z.cross(forward);
    }
    let right = right.normalize();
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward))
}

/// Faces of a cube capture, in GPU layer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Major axis, then the world directions of increasing face `s` and `t`.
    fn axes(self) -> (Vec3, Vec3, Vec3) {
        match self {
            CubeFace::PositiveX => (Vec3::X, Vec3::NEG_Z, Vec3::NEG_Y),
            CubeFace::NegativeX => (Vec3::NEG_X, Vec3::Z, Vec3::NEG_Y),
            CubeFace::PositiveY => (Vec3::Y, Vec3::X, Vec3::Z),
            CubeFace::NegativeY => (Vec3::NEG_Y, Vec3::X, Vec3::NEG_Z),
            CubeFace::PositiveZ => (Vec3::Z, Vec3::X, Vec3::NEG_Y),
            CubeFace::NegativeZ => (Vec3::NEG_Z, Vec3::NEG_X, Vec3::NEG_Y),
        }
    }

    /// Direction through face coordinates `s, t` in `[0, 1]` (`t = 0` is the top row).
    pub fn direction(self, s: f32, t: f32) -> Vec3 {
        let (major, s_axis, t_axis) = self.axes();
        (major + s_axis * (2.0 * s - 1.0) + t_axis * (2.0 * t - 1.0)).normalize()
    }

    /// Face and face coordinates hit by a direction.
    pub fn locate(direction: Vec3) -> (CubeFace, Vec2) {
        let abs = direction.abs();
        let face = if abs.x >= abs.y && abs.x >= abs.z {
            if direction.x >= 0.0 {
                CubeFace::PositiveX
            } else {
                CubeFace::NegativeX
            }
        } else if abs.y >= abs.z {
            if direction.y >= 0.0 {
                CubeFace::PositiveY
            } else {
                CubeFace::NegativeY
            }
        } else if direction.z >= 0.0 {
            CubeFace::PositiveZ
        } else {
            CubeFace::NegativeZ
        };
        let (major, s_axis, t_axis) = face.axes();
        let ma = direction.dot(major);
        let s = (direction.dot(s_axis) / ma + 1.0) * 0.5;
        let t = (direction.dot(t_axis) / ma + 1.0) * 0.5;
        (face, Vec2::new(s.clamp(0.0, 1.0), t.clamp(0.0, 1.0)))
    }

    /// 90° view-projection for rendering this face from `origin`.
    ///
    /// Screen right follows `s` and screen up follows `-t`, so the rendered
    /// image has the same row order the cube sampler expects. The view is
    /// mirrored for some faces; pipelines must not cull.
    pub fn view_projection(self, origin: Vec3, near: f32, far: f32) -> Mat4 {
        let (major, s_axis, t_axis) = self.axes();
        let up = -t_axis;
        let basis = Mat3::from_cols(s_axis, up, -major).transpose();
        let view = Mat4::from_mat3(basis) * Mat4::from_translation(-origin);
        let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, near, far);
        projection * view
    }
}
