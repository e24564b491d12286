//! Motion Simulator
//!
//! Per-frame drift along one axis, a vertical float, and the wrap that turns
//! a fixed cloud pool into an endless sky.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::field::{Cloud, CloudLayer};
use crate::util::Rng;

/// Axis that carries the scroll-accelerated drift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftAxis {
    /// Horizontal wind along +X
    Lateral,
    /// Fly-through toward the viewer along +Z
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    pub axis: DriftAxis,
    /// How strongly scroll progress multiplies drift speed
    pub drift_gain: f32,
    /// Drift coordinate past which a cloud wraps
    pub exit_threshold: f32,
    /// Upper edge of the re-entry span
    pub entry_threshold: f32,
    /// Re-entry lands in `[entry_threshold - respawn_jitter, entry_threshold]`
    pub respawn_jitter: f32,
}

impl MotionConfig {
    pub fn lateral() -> Self {
        Self {
            axis: DriftAxis::Lateral,
            drift_gain: 3.0,
            exit_threshold: 30.0,
            entry_threshold: -30.0,
            respawn_jitter: 10.0,
        }
    }

    pub fn depth() -> Self {
        Self {
            axis: DriftAxis::Depth,
            drift_gain: 4.0,
            exit_threshold: 10.0,
            entry_threshold: -50.0,
            respawn_jitter: 15.0,
        }
    }

    /// Speed multiplier at a given scroll progress
    #[inline]
    pub fn speed_factor(&self, progress: f32) -> f32 {
        1.0 + progress * self.drift_gain
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self::lateral()
    }
}

#[inline]
fn drift_coord(cloud: &mut Cloud, axis: DriftAxis) -> &mut f32 {
    match axis {
        DriftAxis::Lateral => &mut cloud.position.x,
        DriftAxis::Depth => &mut cloud.position.z,
    }
}

/// Advance every cloud by one frame. Returns how many clouds wrapped.
///
/// - `dt`: seconds since the previous frame
/// - `progress`: scroll progress in [0, 1]
/// - `now`: monotonically increasing time in seconds, drives the float
pub fn advance(
    clouds: &mut [Cloud],
    layers: &[CloudLayer],
    motion: &MotionConfig,
    dt: f32,
    progress: f32,
    now: f32,
    rng: &mut Rng,
) -> usize {
    let factor = motion.speed_factor(progress);
    let mut respawned = 0;

    for cloud in clouds.iter_mut() {
        let speed = cloud.base_speed * factor;
        let coord = drift_coord(cloud, motion.axis);
        *coord += speed * dt;

        if *coord > motion.exit_threshold {
            if let Some(layer) = layers.get(cloud.layer) {
                respawn(cloud, layer, motion, rng);
                respawned += 1;
            }
        }

        cloud.position.y = cloud.original_y + (now * cloud.float_speed).sin() * cloud.float_amount;
    }

    if respawned > 0 {
        trace!("{} clouds wrapped", respawned);
    }
    respawned
}

/// Put a cloud back on the entry side of the volume, in place
pub fn respawn(cloud: &mut Cloud, layer: &CloudLayer, motion: &MotionConfig, rng: &mut Rng) {
    let entry = motion.entry_threshold - rng.next_f32() * motion.respawn_jitter;
    *drift_coord(cloud, motion.axis) = entry;

    let y = layer.vertical().sample(rng);
    cloud.original_y = y;
    cloud.position.y = y;

    match motion.axis {
        DriftAxis::Lateral => {
            cloud.position.z = cloud.initial_depth;
        },
        DriftAxis::Depth => {
            cloud.position.x = layer.lateral.sample(rng);
            cloud.initial_depth = entry;
        },
    }
}
