//! Headless RGBA8 raster surface with PNG export

use anyhow::{Context, Result};

use super::surface::{Surface, TextAlign};
use crate::config::Rgba;

/// A text label handed to the canvas (not rasterized)
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub align: TextAlign,
}

/// Software canvas in device pixels
///
/// Rectangles are snapped to whole pixels and composited source-over.
/// Text has no glyph rasterizer here; labels are recorded instead.
#[derive(Debug, Clone)]
pub struct PixelCanvas {
    width: usize,
    height: usize,
    data: Vec<u8>,
    labels: Vec<Label>,
}

impl PixelCanvas {
    /// Fully transparent canvas
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 4],
            labels: Vec::new(),
        }
    }

    /// Resize and clear to transparent
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.data = vec![0; width * height * 4];
        self.labels.clear();
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y * self.width + x) * 4;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.data[offset..offset + 4]);
        Some(rgba)
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Encode the current pixels as PNG
    ///
    /// A canvas nothing has been drawn on yet encodes as a blank transparent image.
    pub fn export_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, self.width.max(1) as u32, self.height.max(1) as u32);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().context("Failed to write PNG header")?;
            if self.width == 0 || self.height == 0 {
                writer
                    .write_image_data(&[0, 0, 0, 0])
                    .context("Failed to write PNG data")?;
            } else {
                writer
                    .write_image_data(&self.data)
                    .context("Failed to write PNG data")?;
            }
            writer.finish().context("Failed to finish PNG stream")?;
        }
        Ok(bytes)
    }

    fn span(start: f32, length: f32, limit: usize) -> (usize, usize) {
        let mut from = start.round();
        let mut to = (start + length).round();
        if to <= from && length > 0.0 {
            to = from + 1.0;
        }
        from = from.clamp(0.0, limit as f32);
        to = to.clamp(0.0, limit as f32);
        (from as usize, to as usize)
    }

    fn blend(dst: &mut [u8], src: [u8; 4]) {
        let alpha = src[3] as u32;
        if alpha == 255 {
            dst.copy_from_slice(&src);
            return;
        }
        if alpha == 0 {
            return;
        }
        let inverse = 255 - alpha;
        for i in 0..3 {
            dst[i] = ((src[i] as u32 * alpha + dst[i] as u32 * inverse) / 255) as u8;
        }
        dst[3] = (alpha + dst[3] as u32 * inverse / 255).min(255) as u8;
    }
}

impl Surface for PixelCanvas {
    fn size(&self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let (x0, x1) = Self::span(x, width, self.width);
        let (y0, y1) = Self::span(y, height, self.height);
        let src = color.to_rgba8();

        for row in y0..y1 {
            let base = row * self.width * 4;
            for col in x0..x1 {
                let offset = base + col * 4;
                Self::blend(&mut self.data[offset..offset + 4], src);
            }
        }
    }

    fn text(&mut self, x: f32, y: f32, label: &str, _size: f32, align: TextAlign, _color: Rgba) {
        self.labels.push(Label {
            x,
            y,
            text: label.to_string(),
            align,
        });
    }

    fn clear(&mut self, color: Rgba) {
        let src = color.to_rgba8();
        for pixel in self.data.chunks_exact_mut(4) {
            pixel.copy_from_slice(&src);
        }
        self.labels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_canvas_exports_png() {
        let canvas = PixelCanvas::new(4, 3);
        let png = canvas.export_png().unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
        assert!(canvas.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_fill_rect_snaps_and_clips() {
        let mut canvas = PixelCanvas::new(4, 4);
        let red = Rgba::rgb(1.0, 0.0, 0.0);
        canvas.fill_rect(2.2, -1.0, 10.0, 2.0, red);

        assert_eq!(canvas.pixel(2, 0), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(3, 0), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(1, 0), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(2, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_thin_rect_covers_one_pixel() {
        let mut canvas = PixelCanvas::new(4, 4);
        canvas.fill_rect(1.0, 1.0, 0.3, 0.3, Rgba::rgb(0.0, 1.0, 0.0));
        assert_eq!(canvas.pixel(1, 1), Some([0, 255, 0, 255]));
    }

    #[test]
    fn test_translucent_blend() {
        let mut canvas = PixelCanvas::new(1, 1);
        canvas.clear(Rgba::rgb(0.0, 0.0, 0.0));
        canvas.fill_rect(0.0, 0.0, 1.0, 1.0, Rgba::new(1.0, 1.0, 1.0, 0.5));
        let [r, g, b, a] = canvas.pixel(0, 0).unwrap();
        assert!((126..=129).contains(&r));
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 255);
    }
}
