//! Drawing surface
//!
//! The renderer only needs filled rectangles, text and raw pixel access.
//! `Canvas` is an in-memory RGBA surface; text draws are kept in a glyph
//! layer anchored at their baseline since no font rasteriser is involved.

use std::collections::BTreeMap;

use crate::config::Color;

/// Pixel rectangle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// RGBA pixel block, row-major, four bytes per pixel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

pub trait Surface {
    fn size(&self) -> (u32, u32);

    /// Resize and clear
    fn resize(&mut self, width: u32, height: u32);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draw `text` with its baseline at `baseline`, squeezed into `max_width`
    fn fill_text(&mut self, text: &str, x: u32, baseline: u32, max_width: u32, color: Color, font: &str);

    fn get_image_data(&self, rect: Rect) -> ImageData;

    fn put_image_data(&mut self, image: &ImageData, x: u32, y: u32);
}

/// Invert every colour channel in `rect`, leaving alpha alone.
pub fn invert_rect<S: Surface + ?Sized>(surface: &mut S, rect: Rect) {
    let mut image = surface.get_image_data(rect);
    for px in image.data.chunks_exact_mut(4) {
        px[0] = 255 - px[0];
        px[1] = 255 - px[1];
        px[2] = 255 - px[2];
    }
    surface.put_image_data(&image, rect.x, rect.y);
}

/// A text draw
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Glyph {
    pub text: String,
    pub color: Color,
}

/// In-memory surface
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    /// Keyed by (baseline, x)
    glyphs: BTreeMap<(u32, u32), Glyph>,
}

impl Canvas {
    /// A black canvas. Sizes whose pixel buffer cannot be addressed give
    /// an empty canvas.
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4));
        let (width, height, len) = match len {
            Some(len) => (width, height, len),
            None => (0, 0, 0),
        };
        Self {
            width,
            height,
            pixels: vec![0; len],
            glyphs: BTreeMap::new(),
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y as usize * self.width as usize + x as usize) * 4)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let i = self.offset(x, y)?;
        Some(Color::new(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]))
    }

    pub fn glyph_at(&self, x: u32, baseline: u32) -> Option<&Glyph> {
        self.glyphs.get(&(baseline, x))
    }

    /// Clip `rect` to the canvas
    fn clip(&self, rect: Rect) -> Rect {
        let x = rect.x.min(self.width);
        let y = rect.y.min(self.height);
        Rect {
            x,
            y,
            width: rect.width.min(self.width - x),
            height: rect.height.min(self.height - y),
        }
    }
}

impl Surface for Canvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        *self = Canvas::new(width, height);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let rect = self.clip(rect);
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                if let Some(i) = self.offset(x, y) {
                    self.pixels[i..i + 4].copy_from_slice(&[color.r, color.g, color.b, 255]);
                }
            }
        }
        self.glyphs.retain(|&(baseline, x), _| !rect.contains(x, baseline));
    }

    fn fill_text(&mut self, text: &str, x: u32, baseline: u32, _max_width: u32, color: Color, _font: &str) {
        if x >= self.width || baseline > self.height {
            return;
        }
        self.glyphs.insert(
            (baseline, x),
            Glyph {
                text: text.to_string(),
                color,
            },
        );
    }

    fn get_image_data(&self, rect: Rect) -> ImageData {
        let mut data = Vec::with_capacity((rect.width * rect.height * 4) as usize);
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                match self.offset(x, y) {
                    Some(i) => data.extend_from_slice(&self.pixels[i..i + 4]),
                    None => data.extend_from_slice(&[0, 0, 0, 0]),
                }
            }
        }
        ImageData {
            width: rect.width,
            height: rect.height,
            data,
        }
    }

    fn put_image_data(&mut self, image: &ImageData, x: u32, y: u32) {
        for dy in 0..image.height {
            for dx in 0..image.width {
                let src = ((dy * image.width + dx) * 4) as usize;
                if let Some(dst) = self.offset(x + dx, y + dy) {
                    self.pixels[dst..dst + 4].copy_from_slice(&image.data[src..src + 4]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::new(200, 10, 0);

    #[test]
    fn test_fill_rect_clips() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(Rect::new(2, 2, 10, 10), RED);
        assert_eq!(canvas.pixel(3, 3), Some(RED));
        assert_eq!(canvas.pixel(1, 1), Some(Color::new(0, 0, 0)));
        assert_eq!(canvas.pixel(4, 4), None);
    }

    #[test]
    fn test_unaddressable_canvas_is_empty() {
        let canvas = Canvas::new(u32::MAX, u32::MAX);
        assert_eq!(canvas.size(), (0, 0));
        assert_eq!(canvas.pixel(0, 0), None);
    }

    #[test]
    fn test_invert_rect() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(Rect::new(0, 0, 4, 4), RED);
        invert_rect(&mut canvas, Rect::new(0, 2, 4, 2));
        assert_eq!(canvas.pixel(0, 1), Some(RED));
        assert_eq!(canvas.pixel(0, 2), Some(Color::new(55, 245, 255)));

        // Twice is a no-op
        invert_rect(&mut canvas, Rect::new(0, 2, 4, 2));
        assert_eq!(canvas.pixel(3, 3), Some(RED));
    }

    #[test]
    fn test_fill_rect_erases_glyphs() {
        let mut canvas = Canvas::new(16, 14);
        canvas.fill_text("a", 0, 10, 8, RED, "");
        canvas.fill_text("b", 8, 10, 8, RED, "");
        assert_eq!(canvas.glyph_at(0, 10).map(|g| g.text.as_str()), Some("a"));

        canvas.fill_rect(Rect::new(0, 0, 8, 14), RED);
        assert_eq!(canvas.glyph_at(0, 10), None);
        assert!(canvas.glyph_at(8, 10).is_some());
    }
}
