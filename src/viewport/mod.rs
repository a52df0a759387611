//! Viewport: camera, panorama sphere, picking and the render loop.
//!
//! One `Viewport` exists per loaded media item. Loading new media builds a new
//! viewport with the next generation number and tears the old one down, which
//! retires its [`Scope`] and releases its panorama texture.

pub mod camera;
pub mod picking;
pub mod scope;

use glam::{Vec2, Vec3};

use crate::constants::SPHERE_RADIUS;
use crate::geometry::{ray_sphere_hit, screen_to_ndc, Ray, ViewportRect};
use crate::model::{Annotation, AnnotationId};
use crate::render::{RenderError, SceneRenderer, SceneSnapshot, TextureId, TextureStore, ViewParams};

pub use camera::{CameraSettings, CameraState, OrbitCamera};
pub use picking::{PickHit, PickPart};
pub use scope::{CancellationToken, FrameOutcome, ListenerKind, ListenerRegistry, RenderLoop, Scope};

#[derive(Debug)]
pub struct Viewport {
    scope: Scope,
    camera: OrbitCamera,
    rect: ViewportRect,
    panorama: Option<TextureId>,
    /// Native size of the media; unknown for video until metadata arrives.
    source_size: Option<(u32, u32)>,
    render_loop: RenderLoop,
}

impl Viewport {
    pub fn new(generation: u64, rect: ViewportRect, camera_settings: CameraSettings) -> Self {
        let scope = Scope::new(generation);
        let render_loop = RenderLoop::new(scope.token());
        let mut camera = OrbitCamera::new(camera_settings, rect.aspect());
        camera.save_state();
        Self {
            scope,
            camera,
            rect,
            panorama: None,
            source_size: None,
            render_loop,
        }
    }

    pub fn generation(&self) -> u64 {
        self.scope.generation()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_live(&self) -> bool {
        !self.scope.is_retired()
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn rect(&self) -> ViewportRect {
        self.rect
    }

    pub fn panorama(&self) -> Option<TextureId> {
        self.panorama
    }

    pub fn source_size(&self) -> Option<(u32, u32)> {
        self.source_size
    }

    pub fn set_source_size(&mut self, size: Option<(u32, u32)>) {
        self.source_size = size.filter(|&(w, h)| w > 0 && h > 0);
    }

    /// Show a new panorama texture, releasing the one it replaces.
    pub fn set_panorama(&mut self, texture: TextureId, store: &mut dyn TextureStore) {
        if let Some(previous) = self.panorama.replace(texture) {
            if previous != texture {
                store.release(previous);
            }
        }
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.rect = ViewportRect::new(self.rect.left, self.rect.top, width as f32, height as f32);
        self.camera.set_aspect(self.rect.aspect());
        log::debug!("Viewport resized to {}x{}", width, height);
    }

    /// Camera ray through a pointer position.
    pub fn pick_ray(&self, pointer: Vec2) -> Ray {
        let ndc = screen_to_ndc(pointer.x, pointer.y, &self.rect);
        self.camera.ray_through_ndc(ndc)
    }

    /// Point on the panorama sphere under the pointer. Annotations are ignored.
    pub fn get_intersect_point(&self, pointer: Vec2) -> Option<Vec3> {
        let ray = self.pick_ray(pointer);
        ray_sphere_hit(ray.origin, ray.direction, SPHERE_RADIUS)
    }

    /// Annotation whose nearest part lies under the pointer.
    pub fn check_intersection(&self, pointer: Vec2, candidates: &[Annotation]) -> Option<AnnotationId> {
        let hit = picking::pick(&self.pick_ray(pointer), candidates)?;
        log::debug!("Pointer hit {} ({:?}) at {:.3}", hit.id, hit.part, hit.distance);
        Some(hit.id)
    }

    pub fn view_params(&self) -> ViewParams {
        ViewParams {
            view_proj: self.camera.view_proj(),
            eye: self.camera.eye(),
            width: self.rect.width.round().max(1.0) as u32,
            height: self.rect.height.round().max(1.0) as u32,
        }
    }

    /// Render one frame and advance camera damping, unless this viewport was torn down.
    pub fn frame<R: SceneRenderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        scene: &SceneSnapshot,
    ) -> Result<FrameOutcome, RenderError> {
        let view = self.view_params();
        let camera = &mut self.camera;
        self.render_loop.frame(|| {
            renderer.render_view(&view, scene)?;
            camera.update();
            Ok(())
        })
    }

    /// Retire the scope and release the panorama texture.
    pub fn teardown(&mut self, store: &mut dyn TextureStore) {
        self.scope.retire();
        if let Some(texture) = self.panorama.take() {
            store.release(texture);
        }
        log::debug!("Viewport generation {} torn down", self.generation());
    }
}
