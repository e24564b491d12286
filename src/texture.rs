//! Cloud textures
//!
//! RGBA pixel storage, sprite sampling, the procedural fallback puff, and
//! the shareable handle every cloud holds.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::noise::fbm;

/// A texture stored as RGBA pixels
#[derive(Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<u8>, // RGBA format, 4 bytes per pixel
}

impl Texture {
    /// Fully transparent square, `size` already capped by the caller
    fn transparent(size: u32) -> Self {
        Self {
            width: size,
            height: size,
            pixels: vec![0; size as usize * size as usize * 4],
        }
    }

    /// Create texture from raw RGBA data
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if width > 0 && height > 0 && rgba_len(width, height) == Some(data.len()) {
            Some(Self {
                width,
                height,
                pixels: data,
            })
        } else {
            None
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

    #[inline]
    fn texel_index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Set a pixel in the texture
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8, a: u8) {
        if x < self.width && y < self.height {
            let idx = self.texel_index(x, y);
            self.pixels[idx] = r;
            self.pixels[idx + 1] = g;
            self.pixels[idx + 2] = b;
            self.pixels[idx + 3] = a;
        }
    }

    /// Read a texel, `None` outside the texture
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.texel_index(x, y);
        Some((
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ))
    }

    /// Nearest-neighbor sample with UV clamped to the sprite (no wrapping).
    /// UV outside [0, 1) is fully transparent.
    #[inline]
    pub fn sample_clamped(&self, u: f32, v: f32) -> (u8, u8, u8, u8) {
        if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
            return (0, 0, 0, 0);
        }
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        let idx = self.texel_index(x, y);
        (
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        )
    }

    /// Soft white puff: opaque center, alpha falling to zero at the inscribed
    /// circle. Angular noise bends the falloff so edges look billowy, but
    /// the center texel is always 255 and everything past the radius is 0.
    pub fn radial_fallback(size: u32, seed: u32) -> Self {
        let size = size.clamp(2, MAX_FALLBACK_SIZE);
        let mut tex = Self::transparent(size);
        let center = (size as f32 - 1.0) / 2.0;
        let radius = size as f32 / 2.0;

        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - center;
                let dy = y as f32 - center;
                let dist = (dx * dx + dy * dy).sqrt() / radius;
                if dist >= 1.0 {
                    tex.set_pixel(x, y, 255, 255, 255, 0);
                    continue;
                }
                let angle = dy.atan2(dx);
                let n = fbm(angle.cos() * 2.0 + 8.0, angle.sin() * 2.0 + 8.0, 4, seed);
                let falloff = 1.0 - dist;
                let alpha = falloff.powf(0.6 + n) * 255.0;
                tex.set_pixel(x, y, 255, 255, 255, alpha.round().clamp(0.0, 255.0) as u8);
            }
        }
        tex
    }
}

/// Where a pooled texture came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureOrigin {
    Loaded(PathBuf),
    Fallback,
}

/// Immutable, cheaply cloned reference to a cloud texture.
/// Per-cloud tint and opacity live on the cloud, never on the texture.
#[derive(Clone)]
pub struct TextureHandle {
    texture: Arc<Texture>,
    origin: TextureOrigin,
}

impl TextureHandle {
    pub fn loaded(texture: Texture, path: impl AsRef<Path>) -> Self {
        Self {
            texture: Arc::new(texture),
            origin: TextureOrigin::Loaded(path.as_ref().to_path_buf()),
        }
    }

    pub fn fallback(seed: u32) -> Self {
        Self {
            texture: Arc::new(Texture::radial_fallback(FALLBACK_SIZE, seed)),
            origin: TextureOrigin::Fallback,
        }
    }

    #[inline]
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn origin(&self) -> &TextureOrigin {
        &self.origin
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == TextureOrigin::Fallback
    }

    /// True when both handles share the same pixel storage
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.texture, &other.texture)
    }
}

impl fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureHandle")
            .field("size", &(self.texture.width, self.texture.height))
            .field("origin", &self.origin)
            .finish()
    }
}

/// Edge length of synthesized puffs
pub const FALLBACK_SIZE: u32 = 128;
/// Largest puff `radial_fallback` will build
const MAX_FALLBACK_SIZE: u32 = 1024;

/// Byte length of a `width` x `height` RGBA image, `None` if it cannot be addressed
fn rgba_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_rejects_bad_length() {
        assert!(Texture::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(Texture::from_rgba(0, 0, Vec::new()).is_none());
        assert!(Texture::from_rgba(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn test_from_rgba_huge_dimensions_do_not_overflow() {
        assert!(Texture::from_rgba(u32::MAX, u32::MAX, vec![0; 16]).is_none());
        assert!(Texture::from_rgba(u32::MAX, 2, vec![0; 16]).is_none());
    }

    #[test]
    fn test_fallback_size_is_capped() {
        let tex = Texture::radial_fallback(u32::MAX, 2);
        assert_eq!((tex.width(), tex.height()), (MAX_FALLBACK_SIZE, MAX_FALLBACK_SIZE));
    }

    #[test]
    fn test_fallback_center_opaque_edge_transparent() {
        let tex = Texture::radial_fallback(65, 3);
        assert_eq!(tex.get_pixel(32, 32), Some((255, 255, 255, 255)));
        for &(x, y) in &[(0, 0), (64, 0), (0, 64), (64, 64)] {
            assert_eq!(tex.get_pixel(x, y).unwrap().3, 0);
        }
    }

    #[test]
    fn test_fallback_alpha_decreases_outward() {
        // Odd size puts the center on a texel, so this row has a constant angle
        let tex = Texture::radial_fallback(65, 11);
        let row: Vec<u8> = (32..65).map(|x| tex.get_pixel(x, 32).unwrap().3).collect();
        for pair in row.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn test_sample_clamped_outside_is_transparent() {
        let tex = Texture::radial_fallback(16, 1);
        assert_eq!(tex.sample_clamped(-0.1, 0.5).3, 0);
        assert_eq!(tex.sample_clamped(0.5, 1.0).3, 0);
        assert!(tex.sample_clamped(0.5, 0.5).3 > 200);
    }

    #[test]
    fn test_handle_clone_shares_pixels() {
        let handle = TextureHandle::fallback(5);
        let copy = handle.clone();
        assert!(handle.ptr_eq(&copy));
        assert!(copy.is_fallback());
    }
}
