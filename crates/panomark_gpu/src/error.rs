use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("Failed to request adapter: {0}")]
    AdapterRequest(#[from] wgpu::RequestAdapterError),

    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("Failed to create surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    #[error("Failed to acquire surface texture: {0}")]
    SurfaceAcquire(#[from] wgpu::SurfaceError),

    #[error("Texture error: {0}")]
    Texture(String),

    #[error("Readback failed: {0}")]
    Readback(String),
}

impl GpuError {
    /// Error for a texture whose requested size exceeds the device limit.
    pub fn texture_too_large(width: u32, height: u32, limit: u32) -> Self {
        Self::Texture(format!(
            "{}x{} exceeds the maximum texture dimension {}",
            width, height, limit
        ))
    }
}

pub type Result<T> = std::result::Result<T, GpuError>;
