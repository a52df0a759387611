//! CPU ray-casting renderer.
//!
//! Produces the same images as the GPU path, one ray per pixel: the panorama
//! sky, arrow meshes in front of it, then labels blended on top in draw order.
//! Used headless (tests, machines without a usable adapter) and as the
//! reference for the export pipeline.

use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3};
use image::{Rgba, RgbaImage};

use super::{
    gizmo_helper_arrows, PixelReadback, RenderError, RenderNode, Result, SceneRenderer,
    SceneSnapshot, TargetId, TextureId, TextureStore, ViewParams,
};
use crate::geometry::{
    equirect_direction_for_pixel, equirect_uv_for_direction, CubeFace, Ray, Transform,
};
use crate::model::ArrowDimensions;
use crate::viewport::picking::{ray_arrow, ray_unit_quad};

const BACKGROUND: [u8; 4] = [0, 0, 0, 255];

/// Readback that stays in flight for a fixed number of polls.
struct DeferredPixels {
    polls_left: u32,
    result: Option<Result<RgbaImage>>,
}

impl PixelReadback for DeferredPixels {
    fn poll(&mut self) -> Option<Result<RgbaImage>> {
        if self.polls_left > 0 {
            self.polls_left -= 1;
            return None;
        }
        self.result.take()
    }
}

#[derive(Debug)]
enum Target {
    Cube { size: u32, faces: Vec<RgbaImage> },
    Flat(RgbaImage),
}

#[derive(Debug, Default)]
pub struct SoftwareRenderer {
    textures: HashMap<TextureId, RgbaImage>,
    targets: HashMap<TargetId, Target>,
    next_texture: u64,
    next_target: u64,
    frames: u64,
    last_frame: Option<RgbaImage>,
    last_capture: Option<SceneSnapshot>,
    fail_readback: bool,
    readback_polls: u32,
    refuse_uploads: bool,
}

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(&self, id: TextureId) -> Option<&RgbaImage> {
        self.textures.get(&id)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// The most recent interactive frame.
    pub fn last_frame(&self) -> Option<&RgbaImage> {
        self.last_frame.as_ref()
    }

    /// Scene passed to the most recent cube capture.
    pub fn last_capture(&self) -> Option<&SceneSnapshot> {
        self.last_capture.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn fail_readbacks(&mut self, fail: bool) {
        self.fail_readback = fail;
    }

    /// Readbacks report `None` for `polls` polls before completing, like a
    /// GPU copy still in flight.
    #[cfg(test)]
    pub(crate) fn defer_readbacks(&mut self, polls: u32) {
        self.readback_polls = polls;
    }

    #[cfg(test)]
    pub(crate) fn refuse_uploads(&mut self, refuse: bool) {
        self.refuse_uploads = refuse;
    }

    fn allocate_target(&mut self, target: Target) -> TargetId {
        self.next_target += 1;
        let id = TargetId(self.next_target);
        self.targets.insert(id, target);
        id
    }
}

impl TextureStore for SoftwareRenderer {
    fn upload_rgba(&mut self, image: &RgbaImage) -> Result<TextureId> {
        if self.refuse_uploads {
            return Err(RenderError::Gpu("texture upload refused".to_string()));
        }
        self.next_texture += 1;
        let id = TextureId(self.next_texture);
        self.textures.insert(id, image.clone());
        Ok(id)
    }

    fn release(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_none() {
            log::warn!("Release of unknown texture {:?}", texture);
        }
    }
}

impl SceneRenderer for SoftwareRenderer {
    fn render_view(&mut self, view: &ViewParams, scene: &SceneSnapshot) -> Result<()> {
        let prepared = PreparedScene::new(&self.textures, scene)?;
        let inverse = view.view_proj.inverse();
        let (width, height) = (view.width.max(1), view.height.max(1));
        let frame = RgbaImage::from_fn(width, height, |x, y| {
            let ndc = Vec2::new(
                (x as f32 + 0.5) / width as f32 * 2.0 - 1.0,
                1.0 - (y as f32 + 0.5) / height as f32 * 2.0,
            );
            let near = inverse.project_point3(ndc.extend(0.0));
            let far = inverse.project_point3(ndc.extend(1.0));
            Rgba(prepared.shade(&Ray::new(view.eye, far - near)))
        });
        self.last_frame = Some(frame);
        self.frames += 1;
        Ok(())
    }

    fn create_cube_target(&mut self, size: u32) -> Result<TargetId> {
        let size = size.max(1);
        let faces = (0..6).map(|_| RgbaImage::new(size, size)).collect();
        Ok(self.allocate_target(Target::Cube { size, faces }))
    }

    fn capture_cube(&mut self, target: TargetId, origin: Vec3, scene: &SceneSnapshot) -> Result<()> {
        self.last_capture = Some(scene.clone());
        let prepared = PreparedScene::new(&self.textures, scene)?;
        let Some(entry) = self.targets.get_mut(&target) else {
            return Err(RenderError::UnknownTarget(target));
        };
        let Target::Cube { size, faces } = entry else {
            return Err(RenderError::WrongTargetKind {
                target,
                expected: "cube",
            });
        };
        let size = *size;
        for face in CubeFace::ALL {
            let image = &mut faces[face.index()];
            for (x, y, pixel) in image.enumerate_pixels_mut() {
                let s = (x as f32 + 0.5) / size as f32;
                let t = (y as f32 + 0.5) / size as f32;
                *pixel = Rgba(prepared.shade(&Ray::new(origin, face.direction(s, t))));
            }
        }
        Ok(())
    }

    fn create_target(&mut self, width: u32, height: u32) -> Result<TargetId> {
        Ok(self.allocate_target(Target::Flat(RgbaImage::new(width.max(1), height.max(1)))))
    }

    fn reproject_equirect(&mut self, cube: TargetId, target: TargetId) -> Result<()> {
        let (width, height) = match self.targets.get(&target) {
            Some(Target::Flat(image)) => image.dimensions(),
            Some(Target::Cube { .. }) => {
                return Err(RenderError::WrongTargetKind {
                    target,
                    expected: "flat target",
                })
            }
            None => return Err(RenderError::UnknownTarget(target)),
        };
        let (size, faces) = match self.targets.get(&cube) {
            Some(Target::Cube { size, faces }) => (*size, faces),
            Some(Target::Flat(_)) => {
                return Err(RenderError::WrongTargetKind {
                    target: cube,
                    expected: "cube",
                })
            }
            None => return Err(RenderError::UnknownTarget(cube)),
        };

        let output = RgbaImage::from_fn(width, height, |x, y| {
            let u = (x as f32 + 0.5) / width as f32;
            let v = (y as f32 + 0.5) / height as f32;
            let (face, st) = CubeFace::locate(equirect_direction_for_pixel(u, v));
            let px = ((st.x * size as f32) as u32).min(size - 1);
            let py = ((st.y * size as f32) as u32).min(size - 1);
            *faces[face.index()].get_pixel(px, py)
        });

        if let Some(Target::Flat(image)) = self.targets.get_mut(&target) {
            *image = output;
        }
        Ok(())
    }

    fn read_pixels(&mut self, target: TargetId) -> Result<Box<dyn PixelReadback>> {
        let image = match self.targets.get(&target) {
            Some(Target::Flat(image)) => image.clone(),
            Some(Target::Cube { .. }) => {
                return Err(RenderError::WrongTargetKind {
                    target,
                    expected: "flat target",
                })
            }
            None => return Err(RenderError::UnknownTarget(target)),
        };
        let result = if self.fail_readback {
            Err(RenderError::Gpu("readback failed".to_string()))
        } else {
            Ok(image)
        };
        Ok(Box::new(DeferredPixels {
            polls_left: self.readback_polls,
            result: Some(result),
        }))
    }

    fn release_target(&mut self, target: TargetId) {
        if self.targets.remove(&target).is_none() {
            log::warn!("Release of unknown render target {:?}", target);
        }
    }
}

/// Scene with textures resolved and label matrices inverted, ready for ray casting.
struct PreparedScene<'a> {
    sky: Option<&'a RgbaImage>,
    meshes: Vec<(Transform, ArrowDimensions, [u8; 4])>,
    labels: Vec<(Mat4, &'a RgbaImage)>,
}

impl<'a> PreparedScene<'a> {
    fn new(textures: &'a HashMap<TextureId, RgbaImage>, scene: &SceneSnapshot) -> Result<Self> {
        let lookup = |id: TextureId| textures.get(&id).ok_or(RenderError::UnknownTexture(id));
        let sky = scene.panorama.map(lookup).transpose()?;
        let mut meshes = Vec::new();
        let mut labels = Vec::new();
        for node in &scene.nodes {
            match node {
                RenderNode::Label {
                    texture, transform, ..
                } => labels.push((transform.matrix().inverse(), lookup(*texture)?)),
                RenderNode::Arrow {
                    transform,
                    dimensions,
                    color,
                    ..
                } => meshes.push((*transform, *dimensions, color.to_rgba8())),
                RenderNode::GizmoHelper { position, mode } => meshes.extend(
                    gizmo_helper_arrows(*position, *mode)
                        .into_iter()
                        .map(|(transform, dims, color)| (transform, dims, color.to_rgba8())),
                ),
            }
        }
        Ok(Self { sky, meshes, labels })
    }

    fn shade(&self, ray: &Ray) -> [u8; 4] {
        let nearest_mesh = self
            .meshes
            .iter()
            .filter_map(|(transform, dims, color)| {
                ray_arrow(ray, transform, dims).map(|(t, _)| (t, *color))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));

        let mut pixel = match nearest_mesh {
            Some((_, color)) => color,
            None => self
                .sky
                .map_or(BACKGROUND, |sky| sample_nearest(sky, equirect_uv_for_direction(ray.direction))),
        };

        for (inverse, bitmap) in &self.labels {
            if let Some((_, uv)) = ray_unit_quad(ray, inverse) {
                pixel = blend_over(sample_nearest(bitmap, uv), pixel);
            }
        }
        pixel
    }
}

fn sample_nearest(image: &RgbaImage, uv: Vec2) -> [u8; 4] {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return BACKGROUND;
    }
    let x = ((uv.x * width as f32) as u32).min(width - 1);
    let y = ((uv.y * height as f32) as u32).min(height - 1);
    image.get_pixel(x, y).0
}

/// Straight-alpha "over" onto an opaque destination.
fn blend_over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let alpha = src[3] as f32 / 255.0;
    let mix = |s: u8, d: u8| (s as f32 * alpha + d as f32 * (1.0 - alpha)).round() as u8;
    [mix(src[0], dst[0]), mix(src[1], dst[1]), mix(src[2], dst[2]), 255]
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::color::Rgb;
    use crate::geometry::look_at_rotation;
    use crate::gizmo::GizmoMode;
    use crate::model::AnnotationId;

    /// Four horizontal colour bands with a left/right split.
    fn banded_panorama(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let band = (y * 4 / height) as u8;
            let side = if x < width / 2 { 0 } else { 1 };
            Rgba([band * 60, side * 200, 100, 255])
        })
    }

    fn straight_ahead(width: u32, height: u32) -> ViewParams {
        let view = Mat4::look_to_rh(Vec3::ZERO, Vec3::Z, Vec3::Y);
        let projection = Mat4::perspective_rh(60f32.to_radians(), width as f32 / height as f32, 1.0, 100.0);
        ViewParams {
            view_proj: projection * view,
            eye: Vec3::ZERO,
            width,
            height,
        }
    }

    #[test]
    fn test_unannotated_export_reproduces_source() {
        let mut renderer = SoftwareRenderer::new();
        let source = banded_panorama(64, 32);
        let panorama = renderer.upload_rgba(&source).unwrap();
        let scene = SceneSnapshot { panorama: Some(panorama), nodes: Vec::new() };

        let cube = renderer.create_cube_target(64).unwrap();
        renderer.capture_cube(cube, Vec3::ZERO, &scene).unwrap();
        let flat = renderer.create_target(64, 32).unwrap();
        renderer.reproject_equirect(cube, flat).unwrap();
        let output = renderer.read_pixels(flat).unwrap().poll().unwrap().unwrap();

        // Compare away from the band edges, where nearest sampling may differ by a texel.
        for &(x, y) in &[(10, 4), (50, 12), (20, 20), (40, 28), (5, 27)] {
            assert_eq!(output.get_pixel(x, y), source.get_pixel(x, y), "pixel {x},{y}");
        }
    }

    #[test]
    fn test_label_draws_over_arrow_and_sky() {
        let mut renderer = SoftwareRenderer::new();
        let bitmap = RgbaImage::from_pixel(8, 8, Rgba([10, 250, 10, 255]));
        let texture = renderer.upload_rgba(&bitmap).unwrap();
        let position = Vec3::new(0.0, 0.0, 4.5);
        let scene = SceneSnapshot {
            panorama: None,
            nodes: vec![
                RenderNode::Label {
                    id: AnnotationId(1),
                    texture,
                    transform: Transform {
                        position,
                        rotation: look_at_rotation(position, Vec3::ZERO),
                        scale: Vec3::new(1.0, 1.0, 1.0),
                    },
                },
                RenderNode::Arrow {
                    id: Some(AnnotationId(2)),
                    transform: Transform::from_position_rotation(Vec3::new(0.0, -2.0, 3.0), Quat::IDENTITY),
                    dimensions: ArrowDimensions::for_length(4.0).unwrap(),
                    color: Rgb::RED,
                },
            ],
        };
        renderer.render_view(&straight_ahead(33, 33), &scene).unwrap();
        let frame = renderer.last_frame().unwrap();
        // The label sits behind the arrow but is still drawn on top.
        assert_eq!(frame.get_pixel(16, 16).0, [10, 250, 10, 255]);
        // Below the label the arrow shaft shows.
        assert_eq!(frame.get_pixel(16, 30).0, [255, 0, 0, 255]);
        // Elsewhere the empty sky is black.
        assert_eq!(frame.get_pixel(1, 1).0, BACKGROUND);
    }

    #[test]
    fn test_gizmo_helper_is_drawn() {
        let mut renderer = SoftwareRenderer::new();
        let scene = SceneSnapshot {
            panorama: None,
            nodes: vec![RenderNode::GizmoHelper { position: Vec3::new(0.0, -0.5, 3.0), mode: GizmoMode::Translate }],
        };
        renderer.render_view(&straight_ahead(33, 33), &scene).unwrap();
        let frame = renderer.last_frame().unwrap();
        assert!(frame.pixels().any(|p| p.0 != BACKGROUND));
    }

    #[test]
    fn test_target_kinds_are_checked() {
        let mut renderer = SoftwareRenderer::new();
        let cube = renderer.create_cube_target(4).unwrap();
        let flat = renderer.create_target(4, 2).unwrap();
        assert!(matches!(renderer.read_pixels(cube), Err(RenderError::WrongTargetKind { .. })));
        assert!(matches!(renderer.reproject_equirect(flat, flat), Err(RenderError::WrongTargetKind { .. })));
        assert!(matches!(
            renderer.capture_cube(flat, Vec3::ZERO, &SceneSnapshot::default()),
            Err(RenderError::WrongTargetKind { .. })
        ));

        renderer.release_target(cube);
        renderer.release_target(flat);
        assert_eq!(renderer.target_count(), 0);
        assert!(matches!(renderer.read_pixels(flat), Err(RenderError::UnknownTarget(id)) if id == flat));
    }

    #[test]
    fn test_unknown_texture_is_an_error() {
        let mut renderer = SoftwareRenderer::new();
        let scene = SceneSnapshot { panorama: Some(TextureId(99)), nodes: Vec::new() };
        assert_eq!(
            renderer.render_view(&straight_ahead(4, 4), &scene),
            Err(RenderError::UnknownTexture(TextureId(99)))
        );
    }

    #[test]
    fn test_deferred_readback_outlives_its_target() {
        let mut renderer = SoftwareRenderer::new();
        renderer.defer_readbacks(2);
        let flat = renderer.create_target(4, 2).unwrap();
        let mut readback = renderer.read_pixels(flat).unwrap();
        renderer.release_target(flat);

        assert!(readback.poll().is_none());
        assert!(readback.poll().is_none());
        assert_eq!(readback.poll().unwrap().unwrap().dimensions(), (4, 2));
        assert!(readback.poll().is_none());
    }

    #[test]
    fn test_blend_over_respects_alpha() {
        assert_eq!(blend_over([255, 255, 255, 0], [10, 20, 30, 255]), [10, 20, 30, 255]);
        assert_eq!(blend_over([200, 0, 0, 255], [10, 20, 30, 255]), [200, 0, 0, 255]);
        assert_eq!(blend_over([0, 0, 0, 204], [255, 255, 255, 255]), [51, 51, 51, 255]);
    }
}
