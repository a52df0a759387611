//! Glyph rasterisation with cosmic-text.

use cosmic_text::{Align, Attrs, Buffer, Color, Family, FontSystem, Metrics, Shaping, SwashCache, Weight};

use crate::model::{GlyphMask, GlyphRasterizer};

/// Line height relative to the font size.
const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Shapes and rasterises label text using the system fonts (plus any loaded font data).
pub struct CosmicTextRasterizer {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl Default for CosmicTextRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CosmicTextRasterizer {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
        }
    }

    /// Make an extra font available, e.g. one configured by the user.
    pub fn load_font_data(&mut self, bytes: Vec<u8>) {
        self.font_system.db_mut().load_font_data(bytes);
    }
}

impl GlyphRasterizer for CosmicTextRasterizer {
    fn rasterize(&mut self, text: &str, font_size: f32) -> GlyphMask {
        let metrics = Metrics::new(font_size, font_size * LINE_HEIGHT_FACTOR);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);
        buffer.set_size(&mut self.font_system, None, None);
        let attrs = Attrs::new().family(Family::SansSerif).weight(Weight::BOLD);
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, Some(Align::Left));
        buffer.shape_until_scroll(&mut self.font_system, false);

        // Collect coverage spans first; the ink box is only known afterwards.
        let mut spans: Vec<(i32, i32, u32, u32, u8)> = Vec::new();
        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            Color::rgb(255, 255, 255),
            |x, y, w, h, color| {
                let alpha = color.a();
                if alpha > 0 && w > 0 && h > 0 {
                    spans.push((x, y, w, h, alpha));
                }
            },
        );

        let Some(bounds) = ink_bounds(&spans) else {
            return GlyphMask::default();
        };
        let (min_x, min_y, max_x, max_y) = bounds;
        let width = (max_x - min_x) as u32;
        let height = (max_y - min_y) as u32;
        let mut coverage = vec![0u8; width as usize * height as usize];
        for &(x, y, w, h, alpha) in &spans {
            for py in y..y + h as i32 {
                for px in x..x + w as i32 {
                    let index = (py - min_y) as usize * width as usize + (px - min_x) as usize;
                    coverage[index] = coverage[index].max(alpha);
                }
            }
        }
        GlyphMask::new(width, height, coverage)
    }
}

/// Exclusive bounding box `(min_x, min_y, max_x, max_y)` of the drawn spans.
fn ink_bounds(spans: &[(i32, i32, u32, u32, u8)]) -> Option<(i32, i32, i32, i32)> {
    spans.iter().fold(None, |acc, &(x, y, w, h, _)| {
        let (x1, y1) = (x + w as i32, y + h as i32);
        Some(match acc {
            None => (x, y, x1, y1),
            Some((a, b, c, d)) => (a.min(x), b.min(y), c.max(x1), d.max(y1)),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ink_bounds_cover_all_spans() {
        let spans = [(3, 4, 2, 1, 255), (-1, 6, 1, 3, 10)];
        assert_eq!(ink_bounds(&spans), Some((-1, 4, 5, 9)));
        assert_eq!(ink_bounds(&[]), None);
    }
}
