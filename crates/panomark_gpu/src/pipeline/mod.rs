//! Render pipelines for the panorama scene.
//!
//! The sky, mesh and sprite pipelines share one set of bind group layouts
//! ([`SceneLayouts`]) so a single camera bind group serves a whole pass.

pub mod builder;
pub mod equirect;
pub mod mesh;
pub mod sky;
pub mod sprite;

pub use builder::{DepthMode, PipelineBuilder};
pub use equirect::EquirectPipeline;
pub use mesh::{MeshBuffers, MeshPipeline};
pub use sky::SkyPipeline;
pub use sprite::SpritePipeline;

use builder::{bind_group_layout, sampler_entry, texture_entry, uniform_entry};

use crate::bindings;

/// Bind group layouts shared by the scene pipelines.
pub struct SceneLayouts {
    pub camera: wgpu::BindGroupLayout,
    pub model: wgpu::BindGroupLayout,
    pub texture: wgpu::BindGroupLayout,
}

impl SceneLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let stages = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        Self {
            camera: bind_group_layout(
                device,
                "Camera Layout",
                &[uniform_entry(bindings::CAMERA_BINDING, stages)],
            ),
            model: bind_group_layout(
                device,
                "Model Layout",
                &[uniform_entry(bindings::model::MODEL_BINDING, stages)],
            ),
            // Sky and sprite textures use the same binding numbers.
            texture: bind_group_layout(
                device,
                "Texture Layout",
                &[
                    texture_entry(bindings::model::TEXTURE_BINDING, wgpu::TextureViewDimension::D2),
                    sampler_entry(bindings::model::SAMPLER_BINDING),
                ],
            ),
        }
    }

    pub fn camera_bind_group(&self, device: &wgpu::Device, buffer: &wgpu::Buffer) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &self.camera,
            entries: &[wgpu::BindGroupEntry {
                binding: bindings::CAMERA_BINDING,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    pub fn model_bind_group(&self, device: &wgpu::Device, buffer: &wgpu::Buffer) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout: &self.model,
            entries: &[wgpu::BindGroupEntry {
                binding: bindings::model::MODEL_BINDING,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    pub fn texture_bind_group(
        &self,
        device: &wgpu::Device,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture Bind Group"),
            layout: &self.texture,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: bindings::model::TEXTURE_BINDING,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: bindings::model::SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }
}
