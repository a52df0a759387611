//! Orbit camera at the centre of the panorama sphere.
//!
//! Dragging accumulates a pending yaw/pitch delta which [`OrbitCamera::update`]
//! applies a fraction at a time, giving the damped feel of an orbit control.
//! The wheel zooms by narrowing the field of view; the eye never moves.

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::camera;
use crate::geometry::Ray;

/// Tunable camera behaviour, part of the user configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub fov_degrees: f32,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    /// Degrees of field of view per wheel line.
    pub zoom_speed: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: camera::FOV_DEGREES,
            damping_factor: camera::DAMPING_FACTOR,
            rotate_speed: camera::ROTATE_SPEED,
            zoom_speed: camera::ZOOM_SPEED,
        }
    }
}

/// Orientation and zoom, as saved for reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub yaw: f32,
    pub pitch: f32,
    pub fov_degrees: f32,
}

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    state: CameraState,
    saved: CameraState,
    settings: CameraSettings,
    aspect: f32,
    /// Rotation still to be applied by damping (yaw, pitch).
    pending: Vec2,
    enabled: bool,
    drag_from: Option<Vec2>,
}

impl OrbitCamera {
    pub fn new(settings: CameraSettings, aspect: f32) -> Self {
        let state = CameraState {
            yaw: 0.0,
            pitch: 0.0,
            fov_degrees: settings
                .fov_degrees
                .clamp(camera::MIN_FOV_DEGREES, camera::MAX_FOV_DEGREES),
        };
        Self {
            state,
            saved: state,
            settings,
            aspect: aspect.max(f32::EPSILON),
            pending: Vec2::ZERO,
            enabled: true,
            drag_from: None,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn eye(&self) -> Vec3 {
        Vec3::ZERO
    }

    pub fn forward(&self) -> Vec3 {
        let CameraState { yaw, pitch, .. } = self.state;
        Vec3::new(pitch.cos() * yaw.sin(), pitch.sin(), pitch.cos() * yaw.cos())
    }

    pub fn fov_degrees(&self) -> f32 {
        self.state.fov_degrees
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.eye(), self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.state.fov_degrees.to_radians(),
            self.aspect,
            camera::NEAR,
            camera::FAR,
        )
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray through a point in normalised device coordinates.
    pub fn ray_through_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_proj().inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(self.eye(), far - near)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling drops any drag in progress; damping still runs out.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.drag_from = None;
        }
    }

    pub fn pointer_pressed(&mut self, position: Vec2) {
        if self.enabled {
            self.drag_from = Some(position);
        }
    }

    pub fn pointer_moved(&mut self, position: Vec2, viewport_height: f32) {
        if !self.enabled {
            return;
        }
        if let Some(from) = self.drag_from.replace(position) {
            self.rotate_by_pixels(position - from, viewport_height);
        }
    }

    pub fn pointer_released(&mut self) {
        self.drag_from = None;
    }

    /// Queue a rotation for a pointer drag of `delta` pixels.
    ///
    /// A drag across the full viewport height turns a full circle at speed 1.
    /// The view follows the pointer: dragging right turns left, dragging down looks up.
    pub fn rotate_by_pixels(&mut self, delta: Vec2, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        let scale = std::f32::consts::TAU / viewport_height * self.settings.rotate_speed;
        self.pending += delta * scale;
    }

    /// Zoom by wheel lines; positive lines zoom in.
    pub fn zoom(&mut self, lines: f32) {
        if !self.enabled || !lines.is_finite() {
            return;
        }
        self.state.fov_degrees = (self.state.fov_degrees - lines * self.settings.zoom_speed)
            .clamp(camera::MIN_FOV_DEGREES, camera::MAX_FOV_DEGREES);
    }

    /// Apply one frame of damping. Returns whether the orientation changed.
    pub fn update(&mut self) -> bool {
        if self.pending.length_squared() < 1e-12 {
            self.pending = Vec2::ZERO;
            return false;
        }
        let damping = self.settings.damping_factor.clamp(0.0, 1.0);
        let step = self.pending * damping;
        self.state.yaw = (self.state.yaw + step.x).rem_euclid(std::f32::consts::TAU);
        let limit = camera::MAX_PITCH_DEGREES.to_radians();
        self.state.pitch = (self.state.pitch + step.y).clamp(-limit, limit);
        self.pending *= 1.0 - damping;
        true
    }

    pub fn save_state(&mut self) {
        self.saved = self.state;
    }

    /// Return to the last saved state, dropping any pending motion.
    pub fn reset(&mut self) {
        self.state = self.saved;
        self.pending = Vec2::ZERO;
        self.drag_from = None;
        log::debug!("Camera reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(CameraSettings::default(), 2.0)
    }

    fn settle(camera: &mut OrbitCamera) {
        for _ in 0..500 {
            camera.update();
        }
    }

    #[test]
    fn test_center_ray_follows_forward() {
        let mut camera = camera();
        let ray = camera.ray_through_ndc(Vec2::ZERO);
        assert_eq!(ray.origin, Vec3::ZERO);
        assert!((ray.direction - Vec3::Z).length() < 1e-4);

        camera.rotate_by_pixels(Vec2::new(100.0, -40.0), 600.0);
        settle(&mut camera);
        let ray = camera.ray_through_ndc(Vec2::ZERO);
        assert!((ray.direction - camera.forward()).length() < 1e-4);
    }

    #[test]
    fn test_drag_right_turns_view_left() {
        let mut camera = camera();
        let right_edge = camera.ray_through_ndc(Vec2::new(1.0, 0.0)).direction;
        camera.pointer_pressed(Vec2::new(100.0, 100.0));
        camera.pointer_moved(Vec2::new(150.0, 100.0), 600.0);
        settle(&mut camera);
        // The view turned towards what used to be on the left.
        assert!(camera.forward().dot(right_edge) < Vec3::Z.dot(right_edge));
        let expected = std::f32::consts::TAU * 50.0 / 600.0 * 0.5;
        assert!((camera.state().yaw - expected).abs() < 1e-3);
    }

    #[test]
    fn test_damping_applies_gradually() {
        let mut camera = camera();
        camera.rotate_by_pixels(Vec2::new(0.0, 60.0), 600.0);
        assert!(camera.update());
        let first = camera.state().pitch;
        let total = std::f32::consts::TAU * 60.0 / 600.0 * 0.5;
        assert!((first - total * 0.1).abs() < 1e-5);
        settle(&mut camera);
        assert!((camera.state().pitch - total).abs() < 1e-3);
        assert!(!camera.update());
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = camera();
        camera.rotate_by_pixels(Vec2::new(0.0, 5000.0), 600.0);
        settle(&mut camera);
        assert!(camera.state().pitch <= 89f32.to_radians() + 1e-6);
    }

    #[test]
    fn test_zoom_clamps_fov() {
        let mut camera = camera();
        camera.zoom(100.0);
        assert_eq!(camera.fov_degrees(), 20.0);
        camera.zoom(-100.0);
        assert_eq!(camera.fov_degrees(), 100.0);
    }

    #[test]
    fn test_disabled_camera_ignores_drag() {
        let mut camera = camera();
        camera.set_enabled(false);
        camera.pointer_pressed(Vec2::ZERO);
        camera.pointer_moved(Vec2::new(300.0, 0.0), 600.0);
        assert!(!camera.update());
        assert_eq!(camera.state().yaw, 0.0);
    }

    #[test]
    fn test_reset_restores_saved_state() {
        let mut camera = camera();
        camera.save_state();
        camera.zoom(3.0);
        camera.rotate_by_pixels(Vec2::new(40.0, 10.0), 600.0);
        settle(&mut camera);
        camera.reset();
        assert_eq!(camera.state(), CameraState { yaw: 0.0, pitch: 0.0, fov_degrees: 75.0 });
    }
}
