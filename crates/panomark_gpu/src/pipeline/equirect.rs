//! Cube to equirectangular re-projection pipeline.

use super::builder::{bind_group_layout, sampler_entry, texture_entry};
use super::PipelineBuilder;
use crate::bindings::equirect::*;
use crate::context::OFFSCREEN_FORMAT;
use crate::texture::{CubeTexture, RenderTarget};

/// Full-screen pass that samples a cube capture along the equirectangular
/// direction of every output pixel.
pub struct EquirectPipeline {
    pub render_pipeline: wgpu::RenderPipeline,
    pub cube_bind_group_layout: wgpu::BindGroupLayout,
}

impl EquirectPipeline {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Equirect Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/equirect.wgsl").into()),
        });

        let cube_bind_group_layout = bind_group_layout(
            device,
            "Cube Layout",
            &[
                texture_entry(CUBE_BINDING, wgpu::TextureViewDimension::Cube),
                sampler_entry(SAMPLER_BINDING),
            ],
        );
        let render_pipeline = PipelineBuilder::new(device, "Equirect Pipeline", &shader)
            .groups(&[&cube_bind_group_layout])
            .build(OFFSCREEN_FORMAT);

        Self {
            render_pipeline,
            cube_bind_group_layout,
        }
    }

    /// Record the re-projection of `cube` into `target`.
    pub fn render(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        cube: &CubeTexture,
        target: &RenderTarget,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cube Bind Group"),
            layout: &self.cube_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: CUBE_BINDING,
                    resource: wgpu::BindingResource::TextureView(&cube.cube_view),
                },
                wgpu::BindGroupEntry {
                    binding: SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&cube.sampler),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Equirect Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        pass.set_pipeline(&self.render_pipeline);
        pass.set_bind_group(CUBE_GROUP, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
