//! Color Gradient Pipeline
//!
//! Maps a scroll progress scalar onto a three-stop piecewise-linear RGB
//! gradient. The same pipeline colors the clouds and paints the sky.

use serde::{Deserialize, Serialize};

/// 8-bit RGB triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    /// Build from a packed 0xRRGGBB value
    pub const fn from_hex(hex: u32) -> Self {
        Self((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }
}

/// Per-channel linear interpolation, each channel rounded to the nearest integer.
/// `t` is clamped to [0, 1].
#[inline]
pub fn interpolate(a: Rgb, b: Rgb, t: f32) -> Rgb {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let ch = |a: u8, b: u8| -> u8 {
        let v = a as f32 + (b as f32 - a as f32) * t;
        v.round().clamp(0.0, 255.0) as u8
    };
    Rgb(ch(a.0, b.0), ch(a.1, b.1), ch(a.2, b.2))
}

/// Darker companion color: 70% of each channel
#[inline]
pub fn shade(c: Rgb) -> Rgb {
    let ch = |v: u8| (v as f32 * 0.7).round() as u8;
    Rgb(ch(c.0), ch(c.1), ch(c.2))
}

/// Exactly three color anchors covering [0, 0.5) and [0.5, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorStops(pub [Rgb; 3]);

impl ColorStops {
    pub const fn new(first: Rgb, middle: Rgb, last: Rgb) -> Self {
        Self([first, middle, last])
    }

    /// Cloud tint journey: white, sunrise orange, sunset pink
    pub const fn clouds() -> Self {
        Self::new(
            Rgb::from_hex(0xffffff),
            Rgb::from_hex(0xffa500),
            Rgb::from_hex(0xffc0cb),
        )
    }

    /// Sky journey: daylight blue, dusk rose, night violet
    pub const fn sky() -> Self {
        Self::new(
            Rgb::from_hex(0x87ceeb),
            Rgb::from_hex(0xff7f6a),
            Rgb::from_hex(0x4e3d8b),
        )
    }

    #[inline]
    pub fn stop(&self, index: usize) -> Rgb {
        self.0[index]
    }

    /// Color for a scroll progress value. Out-of-range input is clamped.
    pub fn tint(&self, progress: f32) -> Rgb {
        let p = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        let [c0, c1, c2] = self.0;
        if p < 0.5 {
            interpolate(c0, c1, p / 0.5)
        } else {
            interpolate(c1, c2, (p - 0.5) / 0.5)
        }
    }
}

impl Default for ColorStops {
    fn default() -> Self {
        Self::clouds()
    }
}

/// Vertical background fill: tint at the top, its shade at the bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundGradient {
    pub top: Rgb,
    pub bottom: Rgb,
}

impl BackgroundGradient {
    pub fn at(stops: &ColorStops, progress: f32) -> Self {
        let top = stops.tint(progress);
        Self {
            top,
            bottom: shade(top),
        }
    }

    /// Color for row `y` of a surface `height` rows tall
    pub fn color_at_row(&self, y: u32, height: u32) -> Rgb {
        if height <= 1 {
            return self.top;
        }
        interpolate(self.top, self.bottom, y as f32 / (height - 1) as f32)
    }
}
