//! Vertex layouts for mesh and sprite geometry.

use bytemuck::{Pod, Zeroable};

/// Position-only vertex for flat-shaded annotation meshes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Textured vertex for label quads.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl SpriteVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Unit quad centred on the origin in the XY plane, facing +Z.
    pub fn unit_quad() -> ([SpriteVertex; 4], [u16; 6]) {
        let vertices = [
            SpriteVertex { position: [-0.5, -0.5, 0.0], tex_coords: [0.0, 1.0] },
            SpriteVertex { position: [0.5, -0.5, 0.0], tex_coords: [1.0, 1.0] },
            SpriteVertex { position: [0.5, 0.5, 0.0], tex_coords: [1.0, 0.0] },
            SpriteVertex { position: [-0.5, 0.5, 0.0], tex_coords: [0.0, 0.0] },
        ];
        (vertices, [0, 1, 2, 0, 2, 3])
    }
}
