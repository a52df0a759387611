//! Transform gizmo.
//!
//! Attaches to the selected annotation and lets the user drag it around
//! (translate) or spin it about the view axis (rotate). Labels only support
//! translation. The gizmo computes new transforms; the session applies them.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::gizmo::{HANDLE_RADIUS, ROTATE_RADIANS_PER_PX};
use crate::geometry::{Ray, Transform};
use crate::model::AnnotationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GizmoMode {
    #[default]
    Translate,
    Rotate,
}

impl GizmoMode {
    pub fn name(&self) -> &'static str {
        match self {
            GizmoMode::Translate => "Move",
            GizmoMode::Rotate => "Rotate",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    start: Transform,
    start_pointer: Vec2,
    /// Where the pointer ray met the drag plane when the drag began.
    anchor: Vec3,
    plane_normal: Vec3,
}

#[derive(Debug)]
pub struct Gizmo {
    attached: Option<AnnotationId>,
    mode: GizmoMode,
    rotate_allowed: bool,
    helper_visible: bool,
    drag: Option<DragState>,
}

impl Default for Gizmo {
    fn default() -> Self {
        Self::new()
    }
}

impl Gizmo {
    pub fn new() -> Self {
        Self {
            attached: None,
            mode: GizmoMode::Translate,
            rotate_allowed: true,
            helper_visible: true,
            drag: None,
        }
    }

    /// Attach to an annotation. Without rotation support the mode falls back to translate.
    pub fn attach(&mut self, id: AnnotationId, rotate_allowed: bool) {
        self.attached = Some(id);
        self.rotate_allowed = rotate_allowed;
        if !rotate_allowed {
            self.mode = GizmoMode::Translate;
        }
        self.drag = None;
    }

    pub fn detach(&mut self) {
        self.attached = None;
        self.drag = None;
    }

    pub fn attached(&self) -> Option<AnnotationId> {
        self.attached
    }

    pub fn mode(&self) -> GizmoMode {
        self.mode
    }

    pub fn rotate_allowed(&self) -> bool {
        self.rotate_allowed
    }

    /// Switch mode. Returns false (and keeps translate) when rotation is not allowed.
    pub fn set_mode(&mut self, mode: GizmoMode) -> bool {
        if mode == GizmoMode::Rotate && !self.rotate_allowed {
            return false;
        }
        self.mode = mode;
        true
    }

    pub fn helper_visible(&self) -> bool {
        self.helper_visible
    }

    pub fn set_helper_visible(&mut self, visible: bool) {
        self.helper_visible = visible;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Whether `ray` passes through the grab handle around `position`.
    pub fn hits_handle(&self, ray: &Ray, position: Vec3) -> bool {
        if self.attached.is_none() {
            return false;
        }
        let t = (position - ray.origin).dot(ray.direction);
        if t < 0.0 {
            return false;
        }
        ray.at(t).distance(position) <= HANDLE_RADIUS
    }

    pub fn begin_drag(&mut self, ray: &Ray, pointer: Vec2, start: Transform) {
        let plane_normal = -ray.direction;
        let anchor = ray
            .intersect_plane(start.position, plane_normal)
            .unwrap_or(start.position);
        self.drag = Some(DragState {
            start,
            start_pointer: pointer,
            anchor,
            plane_normal,
        });
        log::debug!("Gizmo drag started ({})", self.mode.name());
    }

    /// Transform for the current pointer position, or `None` when not dragging.
    pub fn drag_to(&self, ray: &Ray, pointer: Vec2) -> Option<Transform> {
        let drag = self.drag.as_ref()?;
        match self.mode {
            GizmoMode::Translate => {
                let hit = ray.intersect_plane(drag.start.position, drag.plane_normal)?;
                Some(Transform {
                    position: drag.start.position + (hit - drag.anchor),
                    ..drag.start
                })
            }
            GizmoMode::Rotate => {
                let axis = drag.start.position.normalize_or_zero();
                if axis == Vec3::ZERO {
                    return Some(drag.start);
                }
                let angle = (pointer.x - drag.start_pointer.x) * ROTATE_RADIANS_PER_PX;
                Some(Transform {
                    rotation: Quat::from_axis_angle(axis, angle) * drag.start.rotation,
                    ..drag.start
                })
            }
        }
    }

    /// Finish a drag. Returns whether one was active.
    pub fn end_drag(&mut self) -> bool {
        let was_dragging = self.drag.take().is_some();
        if was_dragging {
            log::debug!("Gizmo drag finished");
        }
        was_dragging
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attached_gizmo() -> Gizmo {
        let mut gizmo = Gizmo::new();
        gizmo.attach(AnnotationId(1), true);
        gizmo
    }

    #[test]
    fn test_handle_hit_requires_attachment() {
        let position = Vec3::new(0.0, 0.0, 4.5);
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(!Gizmo::new().hits_handle(&ray, position));
        assert!(attached_gizmo().hits_handle(&ray, position));
        assert!(!attached_gizmo().hits_handle(&Ray::new(Vec3::ZERO, Vec3::X), position));
    }

    #[test]
    fn test_translate_follows_pointer_plane() {
        let mut gizmo = attached_gizmo();
        let start = Transform::from_position_rotation(Vec3::new(0.0, 0.0, 4.0), Quat::IDENTITY);
        gizmo.begin_drag(&Ray::new(Vec3::ZERO, Vec3::Z), Vec2::ZERO, start);

        let moved = gizmo
            .drag_to(&Ray::new(Vec3::ZERO, Vec3::new(0.25, 0.0, 1.0)), Vec2::new(10.0, 0.0))
            .unwrap();
        assert!((moved.position - Vec3::new(1.0, 0.0, 4.0)).length() < 1e-5);
        assert_eq!(moved.rotation, start.rotation);
    }

    #[test]
    fn test_rotate_spins_about_view_axis() {
        let mut gizmo = attached_gizmo();
        assert!(gizmo.set_mode(GizmoMode::Rotate));
        let start = Transform::from_position_rotation(Vec3::new(0.0, 0.0, 4.0), Quat::IDENTITY);
        gizmo.begin_drag(&Ray::new(Vec3::ZERO, Vec3::Z), Vec2::ZERO, start);

        let pixels = std::f32::consts::FRAC_PI_2 / ROTATE_RADIANS_PER_PX;
        let rotated = gizmo
            .drag_to(&Ray::new(Vec3::ZERO, Vec3::Z), Vec2::new(pixels, 0.0))
            .unwrap();
        assert_eq!(rotated.position, start.position);
        assert!((rotated.rotation * Vec3::X - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn test_labels_cannot_rotate() {
        let mut gizmo = Gizmo::new();
        gizmo.attach(AnnotationId(1), true);
        gizmo.set_mode(GizmoMode::Rotate);
        gizmo.attach(AnnotationId(2), false);
        assert_eq!(gizmo.mode(), GizmoMode::Translate);
        assert!(!gizmo.set_mode(GizmoMode::Rotate));
    }

    #[test]
    fn test_detach_cancels_drag() {
        let mut gizmo = attached_gizmo();
        gizmo.begin_drag(&Ray::new(Vec3::ZERO, Vec3::Z), Vec2::ZERO, Transform::IDENTITY);
        assert!(gizmo.is_dragging());
        gizmo.detach();
        assert!(!gizmo.is_dragging());
        assert!(!gizmo.end_drag());
    }
}
