//! Cloud Field Generator
//!
//! Layers are plain configuration records; [`generate_field`] turns them into
//! a fixed pool of [`Cloud`] sprites. The pool size never changes afterwards.

use serde::{Deserialize, Serialize};

use crate::gradient::Rgb;
use crate::loader::TexturePool;
use crate::math3d::Vec3;
use crate::texture::TextureHandle;
use crate::util::Rng;

/// Closed numeric range sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Degenerate span holding a single value
    pub const fn fixed(v: f32) -> Self {
        Self { min: v, max: v }
    }

    #[inline]
    pub fn sample(&self, rng: &mut Rng) -> f32 {
        rng.range_f32(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, v: f32) -> bool {
        v >= self.min && v <= self.max
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max - self.min
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Background,
    Midground,
    Foreground,
}

/// How clouds are spread across a layer's lateral span
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Placement {
    /// Independent uniform samples
    Scattered,
    /// Even spacing plus jitter, reads as a continuous strip.
    /// `jitter` is a fraction of the slot width.
    Band { jitter: f32 },
}

/// A named band of clouds sharing size, depth, opacity and motion ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudLayer {
    pub name: String,
    pub kind: LayerKind,
    pub count: usize,
    pub width: Span,
    pub height: Span,
    pub scale: Span,
    pub opacity: Span,
    /// Static sprite rotation in radians
    pub rotation: Span,
    pub lateral: Span,
    pub center_y: f32,
    /// Half-height of the vertical band around `center_y`
    pub band_y: f32,
    pub depth: Span,
    pub base_speed: Span,
    pub float_speed: Span,
    pub float_amount: Span,
    pub placement: Placement,
}

impl CloudLayer {
    pub fn vertical(&self) -> Span {
        Span::new(self.center_y - self.band_y, self.center_y + self.band_y)
    }

    /// Lateral position for cloud `index` of this layer
    pub fn sample_x(&self, index: usize, rng: &mut Rng) -> f32 {
        match self.placement {
            Placement::Scattered => self.lateral.sample(rng),
            Placement::Band { jitter } => {
                let slot = self.lateral.width() / self.count.max(1) as f32;
                let center = self.lateral.min + slot * (index as f32 + 0.5);
                let offset = (rng.next_f32() - 0.5) * jitter * slot;
                (center + offset).clamp(self.lateral.min, self.lateral.max)
            },
        }
    }
}

/// One cloud sprite. Mutated in place by the motion simulator and the
/// scene controller; never created or destroyed after generation.
#[derive(Debug, Clone)]
pub struct Cloud {
    pub position: Vec3,
    pub scale: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub opacity: f32,
    pub tint: Rgb,
    pub base_speed: f32,
    pub float_speed: f32,
    pub float_amount: f32,
    /// Anchor the vertical float oscillates around
    pub original_y: f32,
    /// Depth at spawn (generation or last respawn)
    pub initial_depth: f32,
    /// Index into the layer list this cloud was generated from
    pub layer: usize,
    pub kind: LayerKind,
    pub texture: TextureHandle,
}

impl Cloud {
    #[inline]
    pub fn is_background(&self) -> bool {
        self.kind == LayerKind::Background
    }
}

/// Populate every layer. Produces exactly `layer.count` clouds per layer.
pub fn generate_field(layers: &[CloudLayer], pool: &TexturePool, rng: &mut Rng) -> Vec<Cloud> {
    let total: usize = layers.iter().map(|l| l.count).sum();
    let mut clouds = Vec::with_capacity(total);

    for (layer_index, layer) in layers.iter().enumerate() {
        let vertical = layer.vertical();
        for i in 0..layer.count {
            let texture = pool.pick(rng).clone();
            let x = layer.sample_x(i, rng);
            let y = vertical.sample(rng);
            let z = layer.depth.sample(rng);
            clouds.push(Cloud {
                position: Vec3::new(x, y, z),
                scale: layer.scale.sample(rng),
                width: layer.width.sample(rng),
                height: layer.height.sample(rng),
                rotation: layer.rotation.sample(rng),
                opacity: layer.opacity.sample(rng),
                tint: Rgb::WHITE,
                base_speed: layer.base_speed.sample(rng),
                float_speed: layer.float_speed.sample(rng),
                float_amount: layer.float_amount.sample(rng),
                original_y: y,
                initial_depth: z,
                layer: layer_index,
                kind: layer.kind,
                texture,
            });
        }
    }

    clouds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureHandle;

    fn layer(count: usize, placement: Placement) -> CloudLayer {
        CloudLayer {
            name: "test".into(),
            kind: LayerKind::Midground,
            count,
            width: Span::new(4.0, 8.0),
            height: Span::new(2.0, 4.0),
            scale: Span::new(0.8, 1.2),
            opacity: Span::new(0.4, 0.9),
            rotation: Span::new(-0.1, 0.1),
            lateral: Span::new(-30.0, 30.0),
            center_y: 2.0,
            band_y: 1.5,
            depth: Span::new(-20.0, -10.0),
            base_speed: Span::new(0.5, 1.0),
            float_speed: Span::new(0.2, 0.4),
            float_amount: Span::new(0.1, 0.3),
            placement,
        }
    }

    fn pool(n: u32) -> TexturePool {
        TexturePool::from_handles((0..n).map(TextureHandle::fallback).collect())
    }

    #[test]
    fn test_generates_exact_count_within_ranges() {
        let cfg = layer(50, Placement::Scattered);
        let mut rng = Rng::new(1234);
        let clouds = generate_field(std::slice::from_ref(&cfg), &pool(3), &mut rng);
        assert_eq!(clouds.len(), 50);
        for c in &clouds {
            assert!(cfg.lateral.contains(c.position.x));
            assert!(cfg.vertical().contains(c.position.y));
            assert!(cfg.depth.contains(c.position.z));
            assert!(cfg.opacity.contains(c.opacity));
            assert!(c.opacity > 0.0 && c.opacity <= 1.0);
            assert!(cfg.scale.contains(c.scale));
            assert!(cfg.width.contains(c.width));
            assert!(cfg.height.contains(c.height));
            assert_eq!(c.original_y, c.position.y);
            assert_eq!(c.initial_depth, c.position.z);
            assert_eq!(c.layer, 0);
        }
    }

    #[test]
    fn test_count_per_layer() {
        let mut back = layer(7, Placement::Band { jitter: 0.5 });
        back.kind = LayerKind::Background;
        let front = layer(3, Placement::Scattered);
        let mut rng = Rng::new(9);
        let clouds = generate_field(&[back, front], &pool(1), &mut rng);
        assert_eq!(clouds.iter().filter(|c| c.layer == 0).count(), 7);
        assert_eq!(clouds.iter().filter(|c| c.layer == 1).count(), 3);
        assert!(clouds[..7].iter().all(Cloud::is_background));
        assert!(!clouds[7..].iter().any(Cloud::is_background));
    }

    #[test]
    fn test_band_placement_is_evenly_spread() {
        let cfg = layer(10, Placement::Band { jitter: 0.2 });
        let mut rng = Rng::new(77);
        let clouds = generate_field(std::slice::from_ref(&cfg), &pool(2), &mut rng);
        let slot = cfg.lateral.width() / 10.0;
        for (i, c) in clouds.iter().enumerate() {
            let center = cfg.lateral.min + slot * (i as f32 + 0.5);
            assert!((c.position.x - center).abs() <= 0.1 * slot + 1e-4);
        }
    }

    #[test]
    fn test_band_jitter_clamped_to_span() {
        let cfg = layer(2, Placement::Band { jitter: 4.0 });
        let mut rng = Rng::new(5);
        for _ in 0..100 {
            for i in 0..2 {
                assert!(cfg.lateral.contains(cfg.sample_x(i, &mut rng)));
            }
        }
    }

    #[test]
    fn test_textures_shared_not_copied() {
        let pool = pool(2);
        let mut rng = Rng::new(42);
        let clouds = generate_field(&[layer(20, Placement::Scattered)], &pool, &mut rng);
        for c in &clouds {
            assert!(pool.iter().any(|h| h.ptr_eq(&c.texture)));
        }
    }

    #[test]
    fn test_empty_layer_list() {
        let mut rng = Rng::new(1);
        assert!(generate_field(&[], &pool(1), &mut rng).is_empty());
    }
}
