use super::MAX_DIMENSION;
use crate::gradient::{BackgroundGradient, Rgb};

// ============================================================================
// Utility Functions
// ============================================================================

/// Alpha blend a single color channel
/// Uses fast approximation: (x + 1 + (x >> 8)) >> 8 instead of x / 255
#[inline]
fn blend_channel(src: u8, dst: u8, alpha: u16) -> u8 {
    let result = src as u16 * alpha + dst as u16 * (255 - alpha);
    ((result + 1 + (result >> 8)) >> 8) as u8
}

/// Bytes for a capped `width` x `height` surface; sides are at most
/// `MAX_DIMENSION`, so the product stays far below `usize::MAX`
#[inline]
fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

/// Write ABGR pixel to slice (RGBA8888 little-endian byte order)
#[inline]
fn write_pixel(dest: &mut [u8], r: u8, g: u8, b: u8) {
    dest[0] = 255; // A
    dest[1] = b; // B
    dest[2] = g; // G
    dest[3] = r; // R
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// RGBA8888 surface the sky is painted into, uploaded to SDL once per frame
pub struct PixelBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Create a pixel buffer; each side is capped at `MAX_DIMENSION`
    pub fn with_size(width: u32, height: u32) -> Self {
        let (width, height) = (width.min(MAX_DIMENSION), height.min(MAX_DIMENSION));
        Self {
            pixels: vec![0; byte_len(width, height)],
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reallocate for a new size. Contents are cleared to black.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.min(MAX_DIMENSION), height.min(MAX_DIMENSION));
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; byte_len(width, height)];
    }

    /// Check if coordinates are within bounds
    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    /// Calculate byte offset for pixel at (x, y)
    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Clear to a solid color
    /// Optimized: uses u32 fill for maximum speed
    pub fn clear(&mut self, r: u8, g: u8, b: u8) {
        let pixel = u32::from_ne_bytes([255, b, g, r]);
        let ptr = self.pixels.as_mut_ptr() as *mut u32;
        let len = self.pixels.len() / 4;
        for i in 0..len {
            // Safety: pixels.len() is width * height * 4, so i < len stays in
            // bounds; write_unaligned makes no alignment assumption about Vec<u8>.
            unsafe {
                ptr.add(i).write_unaligned(pixel);
            }
        }
    }

    /// Set a single pixel (bounds checked)
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            write_pixel(&mut self.pixels[idx..idx + 4], r, g, b);
        }
    }

    /// Set pixel with alpha blending
    #[inline]
    pub fn blend_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
        if a == 0 || !self.in_bounds(x, y) {
            return;
        }
        let idx = self.pixel_index(x as u32, y as u32);
        let alpha = a as u16;
        self.pixels[idx] = 255; // A - always opaque
        self.pixels[idx + 1] = blend_channel(b, self.pixels[idx + 1], alpha);
        self.pixels[idx + 2] = blend_channel(g, self.pixels[idx + 2], alpha);
        self.pixels[idx + 3] = blend_channel(r, self.pixels[idx + 3], alpha);
    }

    /// Read a pixel from the buffer (bounds checked)
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<(u8, u8, u8)> {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            Some((
                self.pixels[idx + 3], // R
                self.pixels[idx + 2], // G
                self.pixels[idx + 1], // B
            ))
        } else {
            None
        }
    }

    /// Draw a horizontal line
    /// Computes starting index once, then increments by 4
    pub fn hline(&mut self, x1: i32, x2: i32, y: i32, r: u8, g: u8, b: u8) {
        if y < 0 || y >= self.height as i32 {
            return;
        }
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let start = x1.max(0);
        let end = x2.min(self.width as i32 - 1);
        if start > end {
            return;
        }

        let mut idx = self.pixel_index(start as u32, y as u32);
        let count = (end - start + 1) as usize;
        for _ in 0..count {
            write_pixel(&mut self.pixels[idx..idx + 4], r, g, b);
            idx += 4;
        }
    }

    /// Fill the whole surface with the sky's top-to-bottom gradient
    pub fn fill_vertical_gradient(&mut self, gradient: &BackgroundGradient) {
        for y in 0..self.height {
            let Rgb(r, g, b) = gradient.color_at_row(y, self.height);
            self.hline(0, self.width as i32 - 1, y as i32, r, g, b);
        }
    }

    /// Raw bytes for SDL texture upload
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_and_read() {
        let mut buf = PixelBuffer::with_size(4, 3);
        buf.clear(10, 20, 30);
        assert_eq!(buf.get_pixel(3, 2), Some((10, 20, 30)));
        assert_eq!(buf.get_pixel(4, 0), None);
    }

    #[test]
    fn test_blend_extremes() {
        let mut buf = PixelBuffer::with_size(2, 1);
        buf.clear(0, 0, 0);
        buf.blend_pixel(0, 0, 200, 100, 50, 255);
        buf.blend_pixel(1, 0, 200, 100, 50, 0);
        assert_eq!(buf.get_pixel(0, 0), Some((200, 100, 50)));
        assert_eq!(buf.get_pixel(1, 0), Some((0, 0, 0)));
    }

    #[test]
    fn test_vertical_gradient_endpoints() {
        let mut buf = PixelBuffer::with_size(3, 5);
        buf.fill_vertical_gradient(&BackgroundGradient {
            top: Rgb(100, 0, 0),
            bottom: Rgb(0, 0, 100),
        });
        assert_eq!(buf.get_pixel(1, 0), Some((100, 0, 0)));
        assert_eq!(buf.get_pixel(1, 4), Some((0, 0, 100)));
        assert_eq!(buf.get_pixel(2, 2), Some((50, 0, 50)));
    }

    #[test]
    fn test_resize_reallocates() {
        let mut buf = PixelBuffer::with_size(4, 4);
        buf.resize(8, 2);
        assert_eq!((buf.width(), buf.height()), (8, 2));
        assert_eq!(buf.as_bytes().len(), 8 * 2 * 4);
    }

    #[test]
    fn test_oversized_request_is_capped() {
        let mut buf = PixelBuffer::with_size(u32::MAX, 2);
        assert_eq!((buf.width(), buf.height()), (MAX_DIMENSION, 2));
        assert_eq!(buf.as_bytes().len(), MAX_DIMENSION as usize * 2 * 4);

        buf.resize(1, u32::MAX);
        assert_eq!((buf.width(), buf.height()), (1, MAX_DIMENSION));
        buf.clear(1, 2, 3);
        assert_eq!(buf.get_pixel(0, MAX_DIMENSION as i32 - 1), Some((1, 2, 3)));
    }
}
