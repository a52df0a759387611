//! Panorama sky pipeline.

use super::{DepthMode, PipelineBuilder, SceneLayouts};
use crate::bindings;

/// Draws the equirectangular panorama behind everything else as one
/// full-screen triangle; never writes depth.
pub struct SkyPipeline {
    pub render_pipeline: wgpu::RenderPipeline,
}

impl SkyPipeline {
    pub fn new(
        device: &wgpu::Device,
        layouts: &SceneLayouts,
        format: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sky Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/sky.wgsl").into()),
        });

        let render_pipeline = PipelineBuilder::new(device, "Sky Pipeline", &shader)
            .groups(&[&layouts.camera, &layouts.texture])
            .depth(DepthMode::Ignore)
            .build(format);

        Self { render_pipeline }
    }

    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        camera: &wgpu::BindGroup,
        panorama: &wgpu::BindGroup,
    ) {
        pass.set_pipeline(&self.render_pipeline);
        pass.set_bind_group(bindings::CAMERA_GROUP, camera, &[]);
        pass.set_bind_group(bindings::sky::TEXTURE_GROUP, panorama, &[]);
        pass.draw(0..3, 0..1);
    }
}
