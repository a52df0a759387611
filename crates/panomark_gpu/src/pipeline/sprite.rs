//! Label sprite pipeline.

use wgpu::util::DeviceExt;

use super::{DepthMode, PipelineBuilder, SceneLayouts};
use crate::bindings;
use crate::vertex::SpriteVertex;

/// Alpha-blended textured quads drawn on top of the scene without depth testing.
pub struct SpritePipeline {
    pub render_pipeline: wgpu::RenderPipeline,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl SpritePipeline {
    pub fn new(
        device: &wgpu::Device,
        layouts: &SceneLayouts,
        format: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/sprite.wgsl").into()),
        });

        let render_pipeline = PipelineBuilder::new(device, "Sprite Pipeline", &shader)
            .vertices(SpriteVertex::desc())
            .groups(&[&layouts.camera, &layouts.model, &layouts.texture])
            .blend(wgpu::BlendState::ALPHA_BLENDING)
            .depth(DepthMode::Ignore)
            .build(format);

        let (vertices, indices) = SpriteVertex::unit_quad();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sprite Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sprite Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            render_pipeline,
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }

    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        camera: &wgpu::BindGroup,
        model: &wgpu::BindGroup,
        texture: &wgpu::BindGroup,
    ) {
        pass.set_pipeline(&self.render_pipeline);
        pass.set_bind_group(bindings::CAMERA_GROUP, camera, &[]);
        pass.set_bind_group(bindings::model::MODEL_GROUP, model, &[]);
        pass.set_bind_group(bindings::model::TEXTURE_GROUP, texture, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.num_indices, 0, 0..1);
    }
}
