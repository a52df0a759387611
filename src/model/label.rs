//! Label bitmaps.
//!
//! A label is drawn as its glyph coverage mask surrounded by a transparent
//! margin, outlined in translucent black and filled with the label color. The
//! world size of the label follows directly from the bitmap size, so the same
//! text and style always produce the same `base_scale`.

use glam::Vec2;
use image::{Rgba, RgbaImage};

use crate::color::Rgb;
use crate::constants::label;

/// Coverage of rendered glyphs, cropped to their ink bounding box.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlyphMask {
    pub width: u32,
    pub height: u32,
    /// Row-major coverage, 0 = empty, 255 = fully inked.
    pub coverage: Vec<u8>,
}

impl GlyphMask {
    pub fn new(width: u32, height: u32, coverage: Vec<u8>) -> Self {
        debug_assert_eq!(coverage.len(), width as usize * height as usize);
        Self {
            width,
            height,
            coverage,
        }
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.coverage[(y * self.width + x) as usize]
    }
}

/// Turns text into a glyph coverage mask.
pub trait GlyphRasterizer {
    /// Rasterise `text` in a bold face at `font_size` pixels.
    fn rasterize(&mut self, text: &str, font_size: f32) -> GlyphMask;
}

/// Label bitmap parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub font_size: f32,
    pub stroke_width: f32,
    pub padding: f32,
    pub outline: [u8; 4],
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: label::FONT_SIZE,
            stroke_width: label::STROKE_WIDTH,
            padding: label::PADDING,
            outline: label::OUTLINE_RGBA,
        }
    }
}

impl LabelStyle {
    /// Transparent border on every side of the glyph box: half the stroke plus padding.
    pub fn margin(&self) -> u32 {
        (self.stroke_width / 2.0 + self.padding).round().max(0.0) as u32
    }
}

/// Rasteriser plus style; renders label bitmaps on demand.
pub struct LabelPainter {
    rasterizer: Box<dyn GlyphRasterizer>,
    style: LabelStyle,
}

impl LabelPainter {
    pub fn new(rasterizer: Box<dyn GlyphRasterizer>, style: LabelStyle) -> Self {
        Self { rasterizer, style }
    }

    pub fn style(&self) -> &LabelStyle {
        &self.style
    }

    /// Render `text` in `color` as a complete label bitmap.
    pub fn paint(&mut self, text: &str, color: Rgb) -> RgbaImage {
        let mask = self.rasterizer.rasterize(text, self.style.font_size);
        compose_label(&mask, color, &self.style)
    }
}

/// World-space size of a label bitmap before the user scale is applied.
pub fn base_scale_for(bitmap_width: u32, bitmap_height: u32) -> Vec2 {
    Vec2::new(bitmap_width as f32, bitmap_height as f32) * label::PIXEL_TO_WORLD
}

/// Composite outline and fill for a glyph mask.
pub fn compose_label(mask: &GlyphMask, color: Rgb, style: &LabelStyle) -> RgbaImage {
    let margin = style.margin();
    let width = mask.width + 2 * margin;
    let height = mask.height + 2 * margin;

    // The stroke straddles the glyph edge, so its outer half reaches stroke/2 past the ink.
    let radius = style.stroke_width / 2.0;
    let reach = radius.ceil() as i32;
    let disc: Vec<(i32, i32)> = (-reach..=reach)
        .flat_map(|dy| (-reach..=reach).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| ((dx * dx + dy * dy) as f32) <= radius * radius)
        .collect();

    let outline_alpha = style.outline[3] as f32 / 255.0;
    let mut outline = vec![0.0f32; width as usize * height as usize];
    for y in 0..mask.height {
        for x in 0..mask.width {
            let coverage = mask.get(x, y);
            if coverage == 0 {
                continue;
            }
            let alpha = coverage as f32 / 255.0 * outline_alpha;
            for &(dx, dy) in &disc {
                let px = (x + margin) as i32 + dx;
                let py = (y + margin) as i32 + dy;
                if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                    continue;
                }
                let slot = &mut outline[py as usize * width as usize + px as usize];
                *slot = slot.max(alpha);
            }
        }
    }

    let fill = [color.r as f32, color.g as f32, color.b as f32];
    let dark = [
        style.outline[0] as f32,
        style.outline[1] as f32,
        style.outline[2] as f32,
    ];

    RgbaImage::from_fn(width, height, |x, y| {
        let fill_alpha = if x >= margin && y >= margin {
            mask.get(x - margin, y - margin) as f32 / 255.0
        } else {
            0.0
        };
        let stroke_alpha = outline[y as usize * width as usize + x as usize] * (1.0 - fill_alpha);
        let alpha = fill_alpha + stroke_alpha;
        if alpha <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        let channel = |i: usize| ((fill[i] * fill_alpha + dark[i] * stroke_alpha) / alpha).round() as u8;
        Rgba([
            channel(0),
            channel(1),
            channel(2),
            (alpha * 255.0).round().min(255.0) as u8,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_mask(width: u32, height: u32) -> GlyphMask {
        GlyphMask::new(width, height, vec![255; (width * height) as usize])
    }

    #[test]
    fn test_margin_is_half_stroke_plus_padding() {
        assert_eq!(LabelStyle::default().margin(), 22);
    }

    #[test]
    fn test_bitmap_size_includes_margin() {
        let image = compose_label(&solid_mask(30, 10), Rgb::RED, &LabelStyle::default());
        assert_eq!(image.dimensions(), (74, 54));
    }

    #[test]
    fn test_fill_outline_and_transparent_border() {
        let image = compose_label(&solid_mask(30, 10), Rgb::RED, &LabelStyle::default());

        // Glyph interior is the fill color.
        assert_eq!(image.get_pixel(22 + 5, 22 + 5).0, [255, 0, 0, 255]);
        // Just outside the ink is the dark outline.
        let outline = image.get_pixel(21, 22 + 5).0;
        assert_eq!(&outline[..3], &[0, 0, 0]);
        assert_eq!(outline[3], 204);
        // Far corner stays transparent.
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        // The stroke reaches exactly two pixels past the ink.
        assert_eq!(image.get_pixel(19, 22 + 5).0[3], 0);
        assert!(image.get_pixel(20, 22 + 5).0[3] > 0);
    }

    #[test]
    fn test_empty_mask_gives_margin_only_bitmap() {
        let image = compose_label(&GlyphMask::default(), Rgb::WHITE, &LabelStyle::default());
        assert_eq!(image.dimensions(), (44, 44));
        assert!(image.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_base_scale_is_pixel_size_times_factor() {
        let scale = base_scale_for(100, 50);
        assert!((scale.x - 2.0).abs() < 1e-6);
        assert!((scale.y - 1.0).abs() < 1e-6);
    }
}
