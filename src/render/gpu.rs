//! wgpu scene renderer.
//!
//! Every frame, cube face and export pass is one render pass: the panorama
//! sky first (no depth write), then arrow meshes with depth testing, then
//! label sprites blended on top. Arrow meshes are a unit cylinder and a unit
//! cone scaled per draw, so no geometry is rebuilt while dragging.

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use image::RgbaImage;
use panomark_gpu::context::{GpuContext, OFFSCREEN_FORMAT};
use panomark_gpu::readback::PendingReadback;
use panomark_gpu::{
    CameraUniform, CubeTexture, DepthTexture, EquirectPipeline, GpuError, MeshBuffers,
    MeshPipeline, MeshVertex, ModelUniform, RenderTarget, SamplerConfig, SceneLayouts,
    SkyPipeline, SpritePipeline, Texture,
};
use wgpu::util::DeviceExt;

#[cfg(not(target_arch = "wasm32"))]
use super::ReadyPixels;
use super::{
    gizmo_helper_arrows, PixelReadback, RenderError, RenderNode, Result, SceneRenderer,
    SceneSnapshot, TargetId, TextureId, TextureStore, ViewParams,
};
use crate::color::Rgb;
use crate::constants::{arrow, camera};
use crate::geometry::{CubeFace, Transform};
use crate::model::mesh::{frustum, MeshData};
use crate::model::ArrowDimensions;

impl From<GpuError> for RenderError {
    fn from(err: GpuError) -> Self {
        RenderError::Gpu(err.to_string())
    }
}

fn rgba_image(width: u32, height: u32, pixels: Vec<u8>) -> Result<RgbaImage> {
    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| RenderError::Gpu("readback size mismatch".to_string()))
}

/// Readback finished on a later tick by polling the device.
#[cfg(target_arch = "wasm32")]
struct GpuPixels(PendingReadback);

#[cfg(target_arch = "wasm32")]
impl PixelReadback for GpuPixels {
    fn poll(&mut self) -> Option<Result<RgbaImage>> {
        let (width, height) = self.0.dimensions();
        let pixels = self.0.try_finish()?;
        Some(pixels.map_err(RenderError::from).and_then(|pixels| rgba_image(width, height, pixels)))
    }
}

/// Sky, mesh and sprite pipelines for one color format.
struct ScenePipelines {
    sky: SkyPipeline,
    mesh: MeshPipeline,
    sprite: SpritePipeline,
}

impl ScenePipelines {
    fn new(
        device: &wgpu::Device,
        layouts: &SceneLayouts,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            sky: SkyPipeline::new(device, layouts, format),
            mesh: MeshPipeline::new(device, layouts, format),
            sprite: SpritePipeline::new(device, layouts, format),
        }
    }
}

struct GpuTexture {
    _texture: Texture,
    bind_group: wgpu::BindGroup,
}

enum GpuTarget {
    Cube { cube: CubeTexture, depth: DepthTexture },
    Flat(RenderTarget),
}

#[derive(Clone, Copy)]
enum MeshKind {
    Shaft,
    Head,
}

pub struct GpuSceneRenderer {
    ctx: GpuContext,
    layouts: SceneLayouts,
    surface_pipelines: ScenePipelines,
    offscreen_pipelines: ScenePipelines,
    equirect: EquirectPipeline,
    shaft: MeshBuffers,
    head: MeshBuffers,
    textures: HashMap<TextureId, GpuTexture>,
    targets: HashMap<TargetId, GpuTarget>,
    surface_depth: Option<DepthTexture>,
    next_texture: u64,
    next_target: u64,
}

fn upload_mesh(device: &wgpu::Device, mesh: &MeshData) -> MeshBuffers {
    let vertices: Vec<MeshVertex> = mesh
        .positions
        .iter()
        .map(|p| MeshVertex { position: p.to_array() })
        .collect();
    MeshBuffers::new(device, &vertices, &mesh.indices)
}

impl GpuSceneRenderer {
    pub fn new(ctx: GpuContext) -> Self {
        let layouts = SceneLayouts::new(&ctx.device);
        let surface_pipelines = ScenePipelines::new(&ctx.device, &layouts, ctx.surface_format());
        let offscreen_pipelines = ScenePipelines::new(&ctx.device, &layouts, OFFSCREEN_FORMAT);
        let equirect = EquirectPipeline::new(&ctx.device);
        // Unit shapes, scaled per draw by the arrow dimensions.
        let shaft = upload_mesh(&ctx.device, &frustum(1.0, 1.0, 0.0, 1.0, arrow::SEGMENTS));
        let head = upload_mesh(&ctx.device, &frustum(1.0, 0.0, 0.0, 1.0, arrow::SEGMENTS));
        log::info!("Scene renderer ready ({:?} surface)", ctx.surface_format());
        Self {
            ctx,
            layouts,
            surface_pipelines,
            offscreen_pipelines,
            equirect,
            shaft,
            head,
            textures: HashMap::new(),
            targets: HashMap::new(),
            surface_depth: None,
            next_texture: 0,
            next_target: 0,
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
        self.surface_depth = None;
    }

    fn camera_bind_group(&self, view_proj: Mat4) -> wgpu::BindGroup {
        let uniform = CameraUniform::new(
            view_proj.to_cols_array_2d(),
            view_proj.inverse().to_cols_array_2d(),
        );
        let buffer = self
            .ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform"),
                contents: bytemuck::bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        self.layouts.camera_bind_group(&self.ctx.device, &buffer)
    }

    fn model_bind_group(&self, model: Mat4, color: [f32; 4]) -> wgpu::BindGroup {
        let uniform = ModelUniform::new(model.to_cols_array_2d(), color);
        let buffer = self
            .ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Model Uniform"),
                contents: bytemuck::bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        self.layouts.model_bind_group(&self.ctx.device, &buffer)
    }

    fn arrow_draws(&self, transform: &Transform, dims: &ArrowDimensions, color: Rgb) -> [(MeshKind, wgpu::BindGroup); 2] {
        let base = Mat4::from_rotation_translation(transform.rotation, transform.position);
        let shaft = base
            * Mat4::from_scale(Vec3::new(dims.shaft_width, dims.shaft_length, dims.shaft_width));
        let head = base
            * Mat4::from_translation(Vec3::new(0.0, dims.shaft_length, 0.0))
            * Mat4::from_scale(Vec3::new(dims.head_width, dims.head_length, dims.head_width));
        let color = color.to_linear_rgba();
        [
            (MeshKind::Shaft, self.model_bind_group(shaft, color)),
            (MeshKind::Head, self.model_bind_group(head, color)),
        ]
    }

    /// Record one scene pass into `color` with depth buffer `depth`.
    fn encode_scene(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        pipelines: &ScenePipelines,
        view_proj: Mat4,
        scene: &SceneSnapshot,
    ) -> Result<()> {
        let texture = |id: TextureId| {
            self.textures
                .get(&id)
                .map(|t| &t.bind_group)
                .ok_or(RenderError::UnknownTexture(id))
        };

        let camera_group = self.camera_bind_group(view_proj);
        let sky = scene.panorama.map(texture).transpose()?;

        let mut meshes = Vec::new();
        let mut sprites = Vec::new();
        for node in &scene.nodes {
            match node {
                RenderNode::Label {
                    texture: id,
                    transform,
                    ..
                } => sprites.push((
                    self.model_bind_group(transform.matrix(), [1.0; 4]),
                    texture(*id)?,
                )),
                RenderNode::Arrow {
                    transform,
                    dimensions,
                    color,
                    ..
                } => meshes.extend(self.arrow_draws(transform, dimensions, *color)),
                RenderNode::GizmoHelper { position, mode } => {
                    for (transform, dims, color) in gizmo_helper_arrows(*position, *mode) {
                        meshes.extend(self.arrow_draws(&transform, &dims, color));
                    }
                }
            }
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        if let Some(panorama) = sky {
            pipelines.sky.draw(&mut pass, &camera_group, panorama);
        }
        for (kind, model) in &meshes {
            let mesh = match kind {
                MeshKind::Shaft => &self.shaft,
                MeshKind::Head => &self.head,
            };
            pipelines.mesh.draw(&mut pass, &camera_group, model, mesh);
        }
        for (model, texture) in &sprites {
            pipelines.sprite.draw(&mut pass, &camera_group, model, texture);
        }
        Ok(())
    }

    fn allocate_target(&mut self, target: GpuTarget) -> TargetId {
        self.next_target += 1;
        let id = TargetId(self.next_target);
        self.targets.insert(id, target);
        id
    }
}

impl TextureStore for GpuSceneRenderer {
    fn upload_rgba(&mut self, image: &RgbaImage) -> Result<TextureId> {
        let (width, height) = image.dimensions();
        // Wrapping in u suits the panorama; labels keep a transparent border so it never shows.
        let texture = Texture::upload(
            &self.ctx,
            image.as_raw(),
            width,
            height,
            SamplerConfig::PANORAMA,
        )?;
        let bind_group = self
            .layouts
            .texture_bind_group(&self.ctx.device, &texture.view, &texture.sampler);
        self.next_texture += 1;
        let id = TextureId(self.next_texture);
        self.textures.insert(
            id,
            GpuTexture {
                _texture: texture,
                bind_group,
            },
        );
        Ok(id)
    }

    fn release(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_none() {
            log::warn!("Release of unknown texture {:?}", texture);
        }
    }
}

impl SceneRenderer for GpuSceneRenderer {
    fn render_view(&mut self, view: &ViewParams, scene: &SceneSnapshot) -> Result<()> {
        if self.ctx.width() != view.width.max(1) || self.ctx.height() != view.height.max(1) {
            self.resize(view.width, view.height);
        }
        let frame = match self.ctx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost, reconfiguring");
                self.resize(self.ctx.width(), self.ctx.height());
                return Ok(());
            }
            Err(err) => return Err(GpuError::SurfaceAcquire(err).into()),
        };
        let (width, height) = (self.ctx.width(), self.ctx.height());
        if !self
            .surface_depth
            .as_ref()
            .is_some_and(|depth| depth.matches(width, height))
        {
            self.surface_depth = Some(DepthTexture::new(&self.ctx, width, height));
        }
        let Some(depth) = self.surface_depth.as_ref() else {
            return Ok(());
        };

        let color = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        self.encode_scene(
            &mut encoder,
            &color,
            &depth.view,
            &self.surface_pipelines,
            view.view_proj,
            scene,
        )?;
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn create_cube_target(&mut self, size: u32) -> Result<TargetId> {
        let cube = CubeTexture::new(&self.ctx, size)?;
        let depth = DepthTexture::new(&self.ctx, size, size);
        Ok(self.allocate_target(GpuTarget::Cube { cube, depth }))
    }

    fn capture_cube(&mut self, target: TargetId, origin: Vec3, scene: &SceneSnapshot) -> Result<()> {
        let (cube, depth) = match self.targets.get(&target) {
            Some(GpuTarget::Cube { cube, depth }) => (cube, depth),
            Some(GpuTarget::Flat(_)) => {
                return Err(RenderError::WrongTargetKind {
                    target,
                    expected: "cube",
                })
            }
            None => return Err(RenderError::UnknownTarget(target)),
        };
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Cube Capture Encoder"),
            });
        for face in CubeFace::ALL {
            let view_proj = face.view_projection(origin, camera::NEAR, camera::FAR);
            self.encode_scene(
                &mut encoder,
                &cube.face_views[face.index()],
                &depth.view,
                &self.offscreen_pipelines,
                view_proj,
                scene,
            )?;
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        log::debug!("Captured cube of {}px faces", cube.size);
        Ok(())
    }

    fn create_target(&mut self, width: u32, height: u32) -> Result<TargetId> {
        let target = RenderTarget::new(&self.ctx, width, height)?;
        Ok(self.allocate_target(GpuTarget::Flat(target)))
    }

    fn reproject_equirect(&mut self, cube: TargetId, target: TargetId) -> Result<()> {
        let cube_texture = match self.targets.get(&cube) {
            Some(GpuTarget::Cube { cube, .. }) => cube,
            Some(GpuTarget::Flat(_)) => {
                return Err(RenderError::WrongTargetKind {
                    target: cube,
                    expected: "cube",
                })
            }
            None => return Err(RenderError::UnknownTarget(cube)),
        };
        let flat = match self.targets.get(&target) {
            Some(GpuTarget::Flat(flat)) => flat,
            Some(GpuTarget::Cube { .. }) => {
                return Err(RenderError::WrongTargetKind {
                    target,
                    expected: "flat target",
                })
            }
            None => return Err(RenderError::UnknownTarget(target)),
        };
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Equirect Encoder"),
            });
        self.equirect
            .render(&self.ctx.device, &mut encoder, cube_texture, flat);
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn read_pixels(&mut self, target: TargetId) -> Result<Box<dyn PixelReadback>> {
        let flat = match self.targets.get(&target) {
            Some(GpuTarget::Flat(flat)) => flat,
            Some(GpuTarget::Cube { .. }) => {
                return Err(RenderError::WrongTargetKind {
                    target,
                    expected: "flat target",
                })
            }
            None => return Err(RenderError::UnknownTarget(target)),
        };
        let pending = PendingReadback::begin(&self.ctx, flat);
        #[cfg(not(target_arch = "wasm32"))]
        {
            let (width, height) = pending.dimensions();
            let pixels = pending.wait().map_err(RenderError::from);
            Ok(Box::new(ReadyPixels::new(
                pixels.and_then(|pixels| rgba_image(width, height, pixels)),
            )))
        }
        #[cfg(target_arch = "wasm32")]
        {
            Ok(Box::new(GpuPixels(pending)))
        }
    }

    fn release_target(&mut self, target: TargetId) {
        if self.targets.remove(&target).is_none() {
            log::warn!("Release of unknown render target {:?}", target);
        }
    }
}
