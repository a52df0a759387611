//! Shader binding constants.
//!
//! Binding numbers shared between Rust code and the WGSL shaders under
//! `src/shaders/`. Every scene shader uses group 0 for the camera.
//!
//! ```wgsl
//! @group(0) @binding(0)  // CAMERA_GROUP, CAMERA_BINDING
//! var<uniform> camera: Camera;
//! ```

/// Group 0: camera uniform (sky, mesh and sprite shaders).
pub const CAMERA_GROUP: u32 = 0;
/// Binding 0 in group 0: camera matrices
pub const CAMERA_BINDING: u32 = 0;

/// Binding constants for the sky pass.
pub mod sky {
    /// Group 1: panorama texture
    pub const TEXTURE_GROUP: u32 = 1;
    pub const TEXTURE_BINDING: u32 = 0;
    pub const SAMPLER_BINDING: u32 = 1;
}

/// Binding constants for the mesh and sprite passes.
pub mod model {
    /// Group 1: per-draw model uniform
    pub const MODEL_GROUP: u32 = 1;
    pub const MODEL_BINDING: u32 = 0;

    /// Group 2: sprite texture (sprite pass only)
    pub const TEXTURE_GROUP: u32 = 2;
    pub const TEXTURE_BINDING: u32 = 0;
    pub const SAMPLER_BINDING: u32 = 1;
}

/// Binding constants for the cube to equirectangular pass.
pub mod equirect {
    /// Group 0: cube texture
    pub const CUBE_GROUP: u32 = 0;
    pub const CUBE_BINDING: u32 = 0;
    pub const SAMPLER_BINDING: u32 = 1;
}
