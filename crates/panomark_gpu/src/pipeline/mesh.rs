//! Flat-colored mesh pipeline for arrows and gizmo axes.

use wgpu::util::DeviceExt;

use super::{DepthMode, PipelineBuilder, SceneLayouts};
use crate::bindings;
use crate::vertex::MeshVertex;

/// Uploaded triangle mesh.
pub struct MeshBuffers {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl MeshBuffers {
    pub fn new(device: &wgpu::Device, vertices: &[MeshVertex], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }
}

/// Depth-tested, flat-colored meshes.
pub struct MeshPipeline {
    pub render_pipeline: wgpu::RenderPipeline,
}

impl MeshPipeline {
    pub fn new(
        device: &wgpu::Device,
        layouts: &SceneLayouts,
        format: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/mesh.wgsl").into()),
        });

        let render_pipeline = PipelineBuilder::new(device, "Mesh Pipeline", &shader)
            .vertices(MeshVertex::desc())
            .groups(&[&layouts.camera, &layouts.model])
            .depth(DepthMode::TestAndWrite)
            .build(format);

        Self { render_pipeline }
    }

    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        camera: &wgpu::BindGroup,
        model: &wgpu::BindGroup,
        mesh: &MeshBuffers,
    ) {
        pass.set_pipeline(&self.render_pipeline);
        pass.set_bind_group(bindings::CAMERA_GROUP, camera, &[]);
        pass.set_bind_group(bindings::model::MODEL_GROUP, model, &[]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..mesh.num_indices, 0, 0..1);
    }
}
