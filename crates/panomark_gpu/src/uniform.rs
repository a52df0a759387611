//! Shared uniform types for the scene pipelines.

use bytemuck::{Pod, Zeroable};

/// Camera matrices, shared by every pass of a frame or cube face.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Inverse of `view_proj`; the sky pass unprojects NDC with it.
    pub inv_view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new(view_proj: [[f32; 4]; 4], inv_view_proj: [[f32; 4]; 4]) -> Self {
        Self {
            view_proj,
            inv_view_proj,
        }
    }
}

/// Per-draw model matrix and flat color.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    /// Linear RGBA; sprites ignore it.
    pub color: [f32; 4],
}

impl ModelUniform {
    pub fn new(model: [[f32; 4]; 4], color: [f32; 4]) -> Self {
        Self { model, color }
    }
}
