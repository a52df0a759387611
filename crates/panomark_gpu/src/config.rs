//! Surface and sampler settings.

/// Adapter and swapchain preferences used when the context is created.
#[derive(Debug, Clone)]
pub struct GpuConfig {
    pub power_preference: wgpu::PowerPreference,
    /// Falls back to `Fifo` when the surface does not offer it.
    pub present_mode: wgpu::PresentMode,
    pub frame_latency: u32,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            present_mode: wgpu::PresentMode::AutoVsync,
            frame_latency: 2,
        }
    }
}

/// How a sampled texture is filtered and wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub filter: wgpu::FilterMode,
    /// Horizontal addressing; vertical always clamps.
    pub horizontal: wgpu::AddressMode,
}

impl SamplerConfig {
    /// Equirectangular frames wrap across the 180° seam and clamp at the poles.
    pub const PANORAMA: Self = Self {
        filter: wgpu::FilterMode::Linear,
        horizontal: wgpu::AddressMode::Repeat,
    };

    /// Cube captures and anything else sampled inside its bounds.
    pub const CLAMPED: Self = Self {
        filter: wgpu::FilterMode::Linear,
        horizontal: wgpu::AddressMode::ClampToEdge,
    };

    pub(crate) fn build(self, device: &wgpu::Device, label: &str) -> wgpu::Sampler {
        device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: self.horizontal,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: self.filter,
            min_filter: self.filter,
            ..Default::default()
        })
    }
}
