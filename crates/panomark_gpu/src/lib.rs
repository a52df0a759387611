//! GPU plumbing for the panomark viewer.
//!
//! Device and surface setup, textures (2D, cube, render targets), the render
//! pipelines for the panorama sky, annotation meshes, label sprites and the
//! cube-to-equirectangular re-projection, and pixel readback for export.

pub mod bindings;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod readback;
pub mod texture;
pub mod uniform;
pub mod vertex;

pub use config::{GpuConfig, SamplerConfig};
pub use context::GpuContext;
pub use error::{GpuError, Result};
pub use pipeline::{
    EquirectPipeline, MeshBuffers, MeshPipeline, SceneLayouts, SkyPipeline, SpritePipeline,
};
pub use texture::{CubeTexture, DepthTexture, RenderTarget, Texture};
pub use uniform::{CameraUniform, ModelUniform};
pub use vertex::{MeshVertex, SpriteVertex};
