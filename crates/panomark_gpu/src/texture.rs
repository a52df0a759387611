use crate::config::SamplerConfig;
use crate::context::{GpuContext, DEPTH_FORMAT, OFFSCREEN_FORMAT};
use crate::error::{GpuError, Result};

fn allocate(
    ctx: &GpuContext,
    label: &str,
    (width, height, layers): (u32, u32, u32),
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: layers,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}

fn within_limits(ctx: &GpuContext, width: u32, height: u32) -> Result<()> {
    let limit = ctx.max_texture_dimension();
    if width == 0 || height == 0 || width.max(height) > limit {
        return Err(GpuError::texture_too_large(width, height, limit));
    }
    Ok(())
}

/// Sampled RGBA8 texture (panorama frames, label bitmaps).
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Uploads tightly packed RGBA8 pixels.
    pub fn upload(
        ctx: &GpuContext,
        pixels: &[u8],
        width: u32,
        height: u32,
        sampling: SamplerConfig,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(GpuError::Texture(format!(
                "{}x{} RGBA8 needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        within_limits(ctx, width, height)?;

        let texture = allocate(
            ctx,
            "Sampled Texture",
            (width, height, 1),
            wgpu::TextureFormat::Rgba8UnormSrgb,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        ctx.queue.write_texture(
            texture.as_image_copy(),
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            texture.size(),
        );

        Ok(Self {
            view: texture.create_view(&Default::default()),
            sampler: sampling.build(&ctx.device, "Sampled Texture Sampler"),
            texture,
            width,
            height,
        })
    }
}

/// Offscreen color target that can be copied back to the CPU.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub fn new(ctx: &GpuContext, width: u32, height: u32) -> Result<Self> {
        within_limits(ctx, width, height)?;
        let texture = allocate(
            ctx,
            "Offscreen Target",
            (width, height, 1),
            OFFSCREEN_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        Ok(Self {
            view: texture.create_view(&Default::default()),
            texture,
            width,
            height,
        })
    }
}

/// Six-face cube render target.
///
/// Layers follow the wgpu cube order +X, -X, +Y, -Y, +Z, -Z. Each layer gets
/// its own 2D view to render into; `cube_view` samples all six at once.
pub struct CubeTexture {
    pub texture: wgpu::Texture,
    pub face_views: Vec<wgpu::TextureView>,
    pub cube_view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub size: u32,
}

impl CubeTexture {
    pub fn new(ctx: &GpuContext, size: u32) -> Result<Self> {
        within_limits(ctx, size, size)?;
        let texture = allocate(
            ctx,
            "Cube Capture",
            (size, size, 6),
            OFFSCREEN_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );

        let face_views = (0..6)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Cube Face"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        let cube_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Cube Capture View"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            array_layer_count: Some(6),
            ..Default::default()
        });

        Ok(Self {
            sampler: SamplerConfig::CLAMPED.build(&ctx.device, "Cube Capture Sampler"),
            texture,
            face_views,
            cube_view,
            size,
        })
    }
}

/// Depth attachment for the scene passes.
pub struct DepthTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl DepthTexture {
    pub fn new(ctx: &GpuContext, width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let texture = allocate(
            ctx,
            "Scene Depth",
            (width, height, 1),
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        Self {
            view: texture.create_view(&Default::default()),
            texture,
            width,
            height,
        }
    }

    /// Whether this attachment fits a color target of the given size.
    pub fn matches(&self, width: u32, height: u32) -> bool {
        (self.width, self.height) == (width.max(1), height.max(1))
    }
}
