//! Test doubles shared by unit and scenario tests.

use std::cell::RefCell;
use std::rc::Rc;

use image::RgbaImage;

use crate::app::PanoApp;
use crate::config::AppConfig;
use crate::export::encode::encode;
use crate::export::{self, ExportFormat, ExportSink, ExportedImage};
use crate::media::VideoPlayback;
use crate::model::{GlyphMask, GlyphRasterizer, LabelPainter};
use crate::render::software::SoftwareRenderer;
use crate::render::{self, TextureId, TextureStore};

/// Fully inked block per visible character, `0.6 × font_size` wide and `font_size` tall.
pub struct BlockRasterizer;

impl GlyphRasterizer for BlockRasterizer {
    fn rasterize(&mut self, text: &str, font_size: f32) -> GlyphMask {
        let glyph_width = (font_size * 0.6).round() as u32;
        let height = font_size.round() as u32;
        let chars: Vec<char> = text.chars().collect();
        if chars.iter().all(|c| c.is_whitespace()) {
            return GlyphMask::default();
        }
        let width = glyph_width * chars.len() as u32;
        let mut coverage = vec![0u8; (width * height) as usize];
        for (i, c) in chars.iter().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let x0 = i as u32 * glyph_width;
            for y in 0..height {
                for x in x0..x0 + glyph_width {
                    coverage[(y * width + x) as usize] = 255;
                }
            }
        }
        GlyphMask::new(width, height, coverage)
    }
}

pub fn block_painter() -> LabelPainter {
    LabelPainter::new(Box::new(BlockRasterizer), Default::default())
}

/// Records uploads and releases without keeping pixels.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub uploads: Vec<TextureId>,
    pub released: Vec<TextureId>,
    /// Refuse every upload while set.
    pub refuse_uploads: bool,
    next: u64,
}

impl RecordingStore {
    /// Uploaded textures that have not been released.
    pub fn live(&self) -> Vec<TextureId> {
        self.uploads
            .iter()
            .copied()
            .filter(|id| !self.released.contains(id))
            .collect()
    }
}

impl TextureStore for RecordingStore {
    fn upload_rgba(&mut self, _image: &RgbaImage) -> render::Result<TextureId> {
        if self.refuse_uploads {
            return Err(render::RenderError::Gpu("out of texture memory".to_string()));
        }
        self.next += 1;
        let id = TextureId(self.next);
        self.uploads.push(id);
        Ok(id)
    }

    fn release(&mut self, texture: TextureId) {
        self.released.push(texture);
    }
}

/// Equirectangular test panorama: hue varies with longitude, brightness with latitude.
pub fn gradient_panorama(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        image::Rgba([r, g, 128, 255])
    })
}

/// PNG bytes of [`gradient_panorama`].
pub fn encoded_panorama(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient_panorama(width, height), ExportFormat::Png).unwrap()
}

/// Keeps every delivered export for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub delivered: Rc<RefCell<Vec<ExportedImage>>>,
}

impl ExportSink for RecordingSink {
    fn deliver(&mut self, image: &ExportedImage) -> export::Result<()> {
        self.delivered.borrow_mut().push(image.clone());
        Ok(())
    }
}

/// Editor on the software renderer with block glyphs and a recording sink.
pub fn test_app(size: (u32, u32)) -> (PanoApp<SoftwareRenderer>, RecordingSink) {
    let sink = RecordingSink::default();
    let app = PanoApp::new(
        SoftwareRenderer::new(),
        AppConfig::default(),
        Box::new(BlockRasterizer),
        Box::new(sink.clone()),
        size,
    );
    (app, sink)
}

/// Video that always has the same frame ready and tracks its play state.
#[derive(Debug)]
pub struct ScriptedVideo {
    pub paused: bool,
    pub time: f64,
    pub size: Option<(u32, u32)>,
}

impl ScriptedVideo {
    /// Leading bytes of an MP4 file.
    pub const MP4_HEADER: [u8; 12] = [0, 0, 0, 0x18, b'f', b't', b'y', b'p', b'i', b's', b'o', b'm'];
}

impl VideoPlayback for ScriptedVideo {
    fn is_paused(&self) -> bool {
        self.paused
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn duration(&self) -> Option<f64> {
        Some(60.0)
    }

    fn seek(&mut self, seconds: f64) {
        self.time = seconds;
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.size
    }

    fn take_frame(&mut self) -> Option<RgbaImage> {
        self.size.map(|(w, h)| gradient_panorama(w, h))
    }
}
