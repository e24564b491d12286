//! Perspective camera whose pose follows scroll progress.

use serde::{Deserialize, Serialize};

use crate::math3d::Vec3;

/// Camera framing and how it responds to scrolling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Pose at progress 0
    pub start: Vec3,
    /// Vertical field of view in degrees
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    /// Distance travelled along -Z between progress 0 and 1
    pub pullback: f32,
    /// Height gained between progress 0 and 1
    pub rise: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            start: Vec3::new(0.0, 0.0, 5.0),
            fov_deg: 75.0,
            near: 0.1,
            far: 1000.0,
            pullback: 8.0,
            rise: 0.0,
        }
    }
}

/// A cloud center mapped onto the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub x: f32,
    pub y: f32,
    /// Distance in front of the camera
    pub depth: f32,
    /// Pixels per scene unit at this depth
    pub scale: f32,
}

/// Perspective camera bound to the surface it projects onto
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    fov_deg: f32,
    near: f32,
    far: f32,
    width: u32,
    height: u32,
}

impl Camera {
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: config.start,
            fov_deg: config.fov_deg,
            near: config.near,
            far: config.far,
            width: 1,
            height: 1,
        };
        camera.set_viewport(width, height);
        camera
    }

    /// Width over height of the current viewport
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Adopt a new surface size; zero sides are treated as 1
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    /// Move along the scroll path: z recedes linearly, y rises linearly
    pub fn follow_scroll(&mut self, config: &CameraConfig, progress: f32) {
        self.position.z = config.start.z - progress * config.pullback;
        self.position.y = config.start.y + progress * config.rise;
        self.position.x = config.start.x;
    }

    /// Vertical focal length in pixels
    #[inline]
    pub fn focal_length(&self) -> f32 {
        let half_fov = (self.fov_deg.to_radians() / 2.0).max(1e-3);
        self.height as f32 / 2.0 / half_fov.tan()
    }

    /// Project a world point onto the viewport; `None` when outside the
    /// near/far range
    pub fn project(&self, point: Vec3) -> Option<Projected> {
        let view = point - self.position;
        let depth = -view.z;
        if depth <= self.near || depth > self.far {
            return None;
        }
        let scale = self.focal_length() / depth;
        Some(Projected {
            x: self.width as f32 / 2.0 + view.x * scale,
            y: self.height as f32 / 2.0 - view.y * scale,
            depth,
            scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_resize_is_idempotent() {
        let config = CameraConfig::default();
        let mut cam = Camera::new(&config, 640, 480);
        cam.set_viewport(1920, 1080);
        let once = cam.aspect();
        cam.set_viewport(1920, 1080);
        assert_eq!(cam.aspect(), once);
        assert_relative_eq!(once, 16.0 / 9.0);
    }

    #[test]
    fn test_zero_height_does_not_divide_by_zero() {
        let cam = Camera::new(&CameraConfig::default(), 640, 0);
        assert!(cam.aspect().is_finite());
    }

    #[test]
    fn test_follow_scroll_pose() {
        let config = CameraConfig {
            rise: 4.0,
            ..CameraConfig::default()
        };
        let mut cam = Camera::new(&config, 640, 480);
        cam.follow_scroll(&config, 0.0);
        assert_relative_eq!(cam.position.z, 5.0);
        cam.follow_scroll(&config, 1.0);
        assert_relative_eq!(cam.position.z, 5.0 - 8.0);
        assert_relative_eq!(cam.position.y, 4.0);
        cam.follow_scroll(&config, 0.5);
        assert_relative_eq!(cam.position.z, 1.0);
    }

    #[test]
    fn test_project_center_and_behind() {
        let cam = Camera::new(&CameraConfig::default(), 640, 480);
        let p = cam.project(Vec3::new(0.0, 0.0, -5.0)).unwrap();
        assert_relative_eq!(p.x, 320.0);
        assert_relative_eq!(p.y, 240.0);
        assert_relative_eq!(p.depth, 10.0);
        // Behind the camera
        assert!(cam.project(Vec3::new(0.0, 0.0, 6.0)).is_none());
        // Up is up on screen
        let above = cam.project(Vec3::new(0.0, 1.0, -5.0)).unwrap();
        assert!(above.y < 240.0);
    }

    #[test]
    fn test_projection_follows_viewport() {
        let mut cam = Camera::new(&CameraConfig::default(), 640, 480);
        cam.set_viewport(1000, 500);
        assert_eq!(cam.viewport(), (1000, 500));

        let p = cam.project(Vec3::new(0.0, 0.0, -5.0)).unwrap();
        assert_relative_eq!(p.x, 500.0);
        assert_relative_eq!(p.y, 250.0);

        // Same pixels per unit on both axes
        let focal = 250.0 / (37.5f32).to_radians().tan();
        let q = cam.project(Vec3::new(1.0, 1.0, -5.0)).unwrap();
        assert_relative_eq!(q.x - 500.0, focal / 10.0, epsilon = 1e-3);
        assert_relative_eq!(250.0 - q.y, focal / 10.0, epsilon = 1e-3);
    }
}
