//! Sky configuration
//!
//! Everything that shapes a sky lives in [`SkyConfig`], which round-trips
//! through JSON so a setup can be tuned without rebuilding.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::camera::CameraConfig;
use crate::error::SkyError;
use crate::field::{CloudLayer, LayerKind, Placement, Span};
use crate::gradient::ColorStops;
use crate::math3d::Vec3;
use crate::motion::{DriftAxis, MotionConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    /// Cloud images, loaded concurrently; failures become procedural puffs
    pub textures: Vec<PathBuf>,
    /// Background gradient stops
    pub sky: ColorStops,
    /// Cloud tint stops
    pub clouds: ColorStops,
    pub layers: Vec<CloudLayer>,
    pub motion: MotionConfig,
    pub camera: CameraConfig,
    /// Sprite row ripple as a fraction of sprite width (0 disables)
    pub ripple: f32,
}

impl Default for SkyConfig {
    /// Horizontal wind: three layers drifting along +X
    fn default() -> Self {
        Self {
            textures: (1..=3)
                .map(|i| PathBuf::from(format!("assets/cloud{}.png", i)))
                .collect(),
            sky: ColorStops::sky(),
            clouds: ColorStops::clouds(),
            layers: vec![
                CloudLayer {
                    name: "background".into(),
                    kind: LayerKind::Background,
                    count: 12,
                    width: Span::new(14.0, 22.0),
                    height: Span::new(6.0, 9.0),
                    scale: Span::new(1.0, 1.4),
                    opacity: Span::new(0.35, 0.6),
                    rotation: Span::new(-0.05, 0.05),
                    lateral: Span::new(-30.0, 30.0),
                    center_y: 6.0,
                    band_y: 3.0,
                    depth: Span::new(-40.0, -25.0),
                    base_speed: Span::new(0.2, 0.4),
                    float_speed: Span::new(0.1, 0.3),
                    float_amount: Span::new(0.1, 0.3),
                    placement: Placement::Band { jitter: 0.6 },
                },
                CloudLayer {
                    name: "midground".into(),
                    kind: LayerKind::Midground,
                    count: 16,
                    width: Span::new(8.0, 14.0),
                    height: Span::new(4.0, 7.0),
                    scale: Span::new(0.8, 1.2),
                    opacity: Span::new(0.5, 0.8),
                    rotation: Span::new(-0.15, 0.15),
                    lateral: Span::new(-30.0, 30.0),
                    center_y: 2.0,
                    band_y: 4.0,
                    depth: Span::new(-22.0, -12.0),
                    base_speed: Span::new(0.4, 0.8),
                    float_speed: Span::new(0.2, 0.5),
                    float_amount: Span::new(0.2, 0.4),
                    placement: Placement::Scattered,
                },
                CloudLayer {
                    name: "foreground".into(),
                    kind: LayerKind::Foreground,
                    count: 10,
                    width: Span::new(5.0, 9.0),
                    height: Span::new(3.0, 5.0),
                    scale: Span::new(0.7, 1.0),
                    opacity: Span::new(0.7, 1.0),
                    rotation: Span::new(-0.25, 0.25),
                    lateral: Span::new(-30.0, 30.0),
                    center_y: -2.0,
                    band_y: 3.0,
                    depth: Span::new(-10.0, -4.0),
                    base_speed: Span::new(0.8, 1.4),
                    float_speed: Span::new(0.3, 0.6),
                    float_amount: Span::new(0.2, 0.5),
                    placement: Placement::Scattered,
                },
            ],
            motion: MotionConfig::lateral(),
            camera: CameraConfig::default(),
            ripple: 0.01,
        }
    }
}

impl SkyConfig {
    /// Fly-through: clouds stream toward the viewer along +Z while the
    /// camera climbs with scroll progress
    pub fn flythrough() -> Self {
        let mut config = Self::default();
        config.textures = (1..=5)
            .map(|i| PathBuf::from(format!("assets/cloud{}.png", i)))
            .collect();
        config.motion = MotionConfig::depth();
        config.camera = CameraConfig {
            start: Vec3::new(0.0, 0.0, 5.0),
            pullback: 15.0,
            rise: 3.0,
            ..CameraConfig::default()
        };
        let depths = [
            Span::new(-65.0, -35.0),
            Span::new(-50.0, -15.0),
            Span::new(-35.0, 0.0),
        ];
        for (layer, depth) in config.layers.iter_mut().zip(depths) {
            layer.depth = depth;
            layer.lateral = Span::new(-25.0, 25.0);
            layer.placement = Placement::Scattered;
        }
        config
    }

    pub fn drift_axis(&self) -> DriftAxis {
        self.motion.axis
    }

    pub fn cloud_count(&self) -> usize {
        self.layers.iter().map(|l| l.count).sum()
    }

    /// Save config to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SkyError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| SkyError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load and validate a config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SkyError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SkyError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject ranges the generator and simulator cannot honor
    pub fn validate(&self) -> Result<(), SkyError> {
        let bad = |msg: String| Err(SkyError::InvalidConfig(msg));

        for layer in &self.layers {
            let spans = [
                ("width", layer.width),
                ("height", layer.height),
                ("scale", layer.scale),
                ("opacity", layer.opacity),
                ("rotation", layer.rotation),
                ("lateral", layer.lateral),
                ("depth", layer.depth),
                ("base_speed", layer.base_speed),
                ("float_speed", layer.float_speed),
                ("float_amount", layer.float_amount),
            ];
            for (field, span) in spans {
                if !span.is_valid() {
                    return bad(format!(
                        "layer '{}': {} range [{}, {}] is empty",
                        layer.name, field, span.min, span.max
                    ));
                }
            }
            if layer.opacity.min <= 0.0 || layer.opacity.max > 1.0 {
                return bad(format!(
                    "layer '{}': opacity must lie in (0, 1]",
                    layer.name
                ));
            }
            if layer.band_y < 0.0 {
                return bad(format!("layer '{}': band_y must be >= 0", layer.name));
            }
            if layer.count == 0 {
                return bad(format!("layer '{}': count must be > 0", layer.name));
            }
        }

        let m = &self.motion;
        if m.exit_threshold <= m.entry_threshold {
            return bad(format!(
                "exit threshold {} must exceed entry threshold {}",
                m.exit_threshold, m.entry_threshold
            ));
        }
        if m.respawn_jitter < 0.0 || m.drift_gain < 0.0 {
            return bad("respawn_jitter and drift_gain must be >= 0".into());
        }
        if !(self.camera.fov_deg > 0.0 && self.camera.fov_deg < 180.0) {
            return bad(format!("camera fov {} out of range", self.camera.fov_deg));
        }
        if self.ripple < 0.0 {
            return bad("ripple must be >= 0".into());
        }
        Ok(())
    }
}
