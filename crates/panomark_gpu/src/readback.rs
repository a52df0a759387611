//! Copying offscreen targets back to the CPU.

use std::sync::mpsc::{self, Receiver, TryRecvError};

use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::texture::RenderTarget;

/// Row pitch of a readback buffer: tight RGBA8 rows rounded up to the copy alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Copy of a render target on its way back to the CPU.
///
/// The copy and the map request are submitted by [`PendingReadback::begin`].
/// Native builds may block on it with [`PendingReadback::wait`]; the browser
/// cannot block on a WebGL fence, so there [`PendingReadback::try_finish`] is
/// polled once per event-loop tick instead.
pub struct PendingReadback {
    device: wgpu::Device,
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    bytes_per_row: u32,
    mapped: Receiver<std::result::Result<(), wgpu::BufferAsyncError>>,
}

impl PendingReadback {
    pub fn begin(ctx: &GpuContext, target: &RenderTarget) -> Self {
        let bytes_per_row = padded_bytes_per_row(target.width);
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: bytes_per_row as u64 * target.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            target.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(target.height),
                },
            },
            target.texture.size(),
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let (tx, mapped) = mpsc::channel();
        buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            if tx.send(result).is_err() {
                log::warn!("Readback finished after its request was dropped");
            }
        });

        Self {
            device: ctx.device.clone(),
            buffer,
            width: target.width,
            height: target.height,
            bytes_per_row,
            mapped,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Tight RGBA8 rows, top row first, once the buffer is mapped.
    ///
    /// Never blocks: `None` means the copy is still in flight. Yields the
    /// result once.
    pub fn try_finish(&mut self) -> Option<Result<Vec<u8>>> {
        if let Err(err) = self.device.poll(wgpu::PollType::Poll) {
            return Some(Err(GpuError::Readback(err.to_string())));
        }
        match self.mapped.try_recv() {
            Ok(Ok(())) => Some(Ok(self.copy_rows())),
            Ok(Err(err)) => Some(Err(GpuError::Readback(err.to_string()))),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(GpuError::Readback(
                "map request was dropped".to_string(),
            ))),
        }
    }

    /// Block until the copy lands.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn wait(mut self) -> Result<Vec<u8>> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|err| GpuError::Readback(err.to_string()))?;
        self.try_finish()
            .unwrap_or_else(|| Err(GpuError::Readback("buffer map did not complete".to_string())))
    }

    fn copy_rows(&self) -> Vec<u8> {
        let row_bytes = (self.width * 4) as usize;
        let mut pixels = Vec::with_capacity(row_bytes * self.height as usize);
        {
            let data = self.buffer.slice(..).get_mapped_range();
            for row in data.chunks(self.bytes_per_row as usize).take(self.height as usize) {
                pixels.extend_from_slice(&row[..row_bytes]);
            }
        }
        self.buffer.unmap();
        log::debug!(
            "Read back {}x{} target ({} bytes)",
            self.width,
            self.height,
            pixels.len()
        );
        pixels
    }
}
