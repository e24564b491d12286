//! Scene/Render Loop Controller
//!
//! [`SkyScene`] owns the camera, the surface and the cloud pool, and walks
//! `Uninitialized -> Loading -> Populating -> Running -> Disposed`.
//! The host calls [`SkyScene::poll`] and [`SkyScene::tick`] once per vsync;
//! a tick only runs while a frame request is outstanding, and `unmount`
//! withdraws it.

use std::cmp::Ordering;
use std::f32::consts::TAU;

use log::{debug, info, trace, warn};

use crate::camera::Camera;
use crate::config::SkyConfig;
use crate::display::{PixelBuffer, MAX_DIMENSION};
use crate::field::{generate_field, Cloud};
use crate::gradient::{BackgroundGradient, Rgb};
use crate::loader::{PendingTextures, TextureLoader, TexturePool};
use crate::math3d::rotate_2d;
use crate::motion;
use crate::util::Rng;

/// Longest frame step fed to the simulator, so a stalled window does not
/// teleport clouds on the next frame
const MAX_FRAME_DT: f32 = 0.1;

/// Size of the drawable surface. Each side lies in `1..=MAX_DIMENSION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.clamp(1, MAX_DIMENSION),
            height: height.clamp(1, MAX_DIMENSION),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    Uninitialized,
    Loading,
    Populating,
    Running,
    Disposed,
}

enum Phase {
    Uninitialized,
    Loading(PendingTextures),
    Populating(TexturePool),
    Running,
    Disposed,
}

/// Outstanding request for the next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest {
    pub id: u64,
}

pub struct SkyScene {
    config: SkyConfig,
    phase: Phase,
    viewport: Viewport,
    camera: Camera,
    surface: Option<PixelBuffer>,
    pool: Option<TexturePool>,
    clouds: Vec<Cloud>,
    draw_order: Vec<usize>,
    scroll_progress: f32,
    frame: Option<FrameRequest>,
    next_frame_id: u64,
    last_tick: Option<f32>,
    elapsed: f32,
    rng: Rng,
}

impl SkyScene {
    /// A new scene with a clock-seeded layout
    pub fn new(config: SkyConfig) -> Self {
        Self::with_rng(config, Rng::from_time())
    }

    pub fn with_rng(config: SkyConfig, rng: Rng) -> Self {
        let viewport = Viewport::new(1, 1);
        let camera = Camera::new(&config.camera, viewport.width, viewport.height);
        Self {
            config,
            phase: Phase::Uninitialized,
            viewport,
            camera,
            surface: None,
            pool: None,
            clouds: Vec::new(),
            draw_order: Vec::new(),
            scroll_progress: 0.0,
            frame: None,
            next_frame_id: 0,
            last_tick: None,
            elapsed: 0.0,
            rng,
        }
    }

    pub fn state(&self) -> SceneState {
        match self.phase {
            Phase::Uninitialized => SceneState::Uninitialized,
            Phase::Loading(_) => SceneState::Loading,
            Phase::Populating(_) => SceneState::Populating,
            Phase::Running => SceneState::Running,
            Phase::Disposed => SceneState::Disposed,
        }
    }

    pub fn config(&self) -> &SkyConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn clouds(&self) -> &[Cloud] {
        &self.clouds
    }

    pub fn textures(&self) -> Option<&TexturePool> {
        self.pool.as_ref()
    }

    /// The painted frame, present between `mount` and `unmount`
    pub fn surface(&self) -> Option<&PixelBuffer> {
        self.surface.as_ref()
    }

    pub fn scroll_progress(&self) -> f32 {
        self.scroll_progress
    }

    /// Current sky fill, for hosts that paint their own background too
    pub fn background(&self) -> BackgroundGradient {
        BackgroundGradient::at(&self.config.sky, self.scroll_progress)
    }

    /// Number of frames waiting to run (0 or 1)
    pub fn scheduled_frames(&self) -> usize {
        usize::from(self.frame.is_some())
    }

    /// Attach to a surface of the given size and start loading textures
    pub fn mount(&mut self, viewport: Viewport) {
        if !matches!(self.phase, Phase::Uninitialized) {
            warn!("mount ignored: scene is already {:?}", self.state());
            return;
        }
        self.viewport = Viewport::new(viewport.width, viewport.height);
        self.camera = Camera::new(&self.config.camera, self.viewport.width, self.viewport.height);
        self.surface = Some(PixelBuffer::with_size(
            self.viewport.width,
            self.viewport.height,
        ));
        self.phase = Phase::Loading(TextureLoader::spawn(&self.config.textures));
        info!(
            "Sky mounted at {}x{}, loading {} cloud textures",
            self.viewport.width,
            self.viewport.height,
            self.config.textures.len()
        );
    }

    /// Advance the lifecycle without blocking: join texture loads and,
    /// once they settle, populate the field and schedule the first frame.
    pub fn poll(&mut self) -> SceneState {
        if let Phase::Loading(pending) = &mut self.phase {
            if let Some(pool) = pending.try_resolve() {
                self.phase = Phase::Populating(pool);
            }
        }
        if matches!(self.phase, Phase::Populating(_)) {
            self.populate();
        }
        self.state()
    }

    fn populate(&mut self) {
        let Phase::Populating(pool) = std::mem::replace(&mut self.phase, Phase::Running) else {
            return;
        };
        self.clouds = generate_field(&self.config.layers, &pool, &mut self.rng);
        self.pool = Some(pool);
        self.refresh_tints();
        self.camera
            .follow_scroll(&self.config.camera, self.scroll_progress);
        self.schedule_frame();
        info!(
            "Sky running: {} clouds across {} layers, drifting {:?}",
            self.clouds.len(),
            self.config.layers.len(),
            self.config.motion.axis
        );
    }

    /// Record the latest scroll progress; read on the next tick
    pub fn set_scroll_progress(&mut self, progress: f32) {
        if matches!(self.phase, Phase::Disposed) {
            debug!("scroll update after unmount ignored");
            return;
        }
        self.scroll_progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
    }

    /// Match a new surface size. Valid in every state but `Disposed`.
    pub fn resize(&mut self, width: u32, height: u32) {
        if matches!(self.phase, Phase::Disposed) {
            debug!("resize after unmount ignored");
            return;
        }
        self.viewport = Viewport::new(width, height);
        self.camera
            .set_viewport(self.viewport.width, self.viewport.height);
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(self.viewport.width, self.viewport.height);
        }
        debug!(
            "Sky resized to {}x{} (aspect {:.3})",
            self.viewport.width,
            self.viewport.height,
            self.camera.aspect()
        );
    }

    /// Run one frame if one is scheduled. `now` is host time in seconds.
    /// Returns whether a frame ran.
    pub fn tick(&mut self, now: f32) -> bool {
        let Some(frame) = self.frame.take() else {
            return false;
        };

        let dt = match self.last_tick {
            Some(prev) => (now - prev).clamp(0.0, MAX_FRAME_DT),
            None => 0.0,
        };
        self.last_tick = Some(now);
        self.elapsed += dt;

        let progress = self.scroll_progress;
        let wrapped = motion::advance(
            &mut self.clouds,
            &self.config.layers,
            &self.config.motion,
            dt,
            progress,
            now,
            &mut self.rng,
        );
        self.refresh_tints();
        self.camera.follow_scroll(&self.config.camera, progress);
        self.render();

        trace!(
            "frame {} dt={:.4} progress={:.3} wrapped={}",
            frame.id,
            dt,
            progress,
            wrapped
        );
        self.schedule_frame();
        true
    }

    /// Cancel the frame loop and release everything this scene created.
    /// Safe from any state, including mid-load and repeated calls.
    pub fn unmount(&mut self) {
        if matches!(self.phase, Phase::Disposed) {
            return;
        }
        let was = self.state();
        self.frame = None;
        // Dropping a pending join just makes the workers' sends fail
        self.phase = Phase::Disposed;
        self.clouds = Vec::new();
        self.draw_order = Vec::new();
        self.pool = None;
        self.surface = None;
        info!("Sky unmounted (was {:?})", was);
    }

    fn schedule_frame(&mut self) {
        self.next_frame_id += 1;
        self.frame = Some(FrameRequest {
            id: self.next_frame_id,
        });
    }

    fn refresh_tints(&mut self) {
        let tint = self.config.clouds.tint(self.scroll_progress);
        for cloud in &mut self.clouds {
            cloud.tint = tint;
        }
    }

    fn render(&mut self) {
        let background = self.background();

        let clouds = &self.clouds;
        self.draw_order.clear();
        self.draw_order.extend(0..clouds.len());
        // Background layer first, then far to near (more negative z is farther)
        self.draw_order.sort_by(|&a, &b| {
            let (ca, cb) = (&clouds[a], &clouds[b]);
            cb.is_background()
                .cmp(&ca.is_background())
                .then_with(|| {
                    ca.position
                        .z
                        .partial_cmp(&cb.position.z)
                        .unwrap_or(Ordering::Equal)
                })
        });

        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        surface.fill_vertical_gradient(&background);
        for &index in &self.draw_order {
            draw_cloud(
                surface,
                &self.camera,
                &self.clouds[index],
                self.config.ripple,
                self.elapsed,
            );
        }
    }
}

impl Drop for SkyScene {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[inline]
fn modulate(c: u8, tint: u8) -> u8 {
    ((c as u16 * tint as u16 + 127) / 255) as u8
}

/// Rasterize one cloud sprite: projected, rotated, tinted, alpha-blended
fn draw_cloud(surface: &mut PixelBuffer, camera: &Camera, cloud: &Cloud, ripple: f32, time: f32) {
    let (width, height) = (surface.width(), surface.height());
    let Some(p) = camera.project(cloud.position) else {
        return;
    };

    let half_w = cloud.width * cloud.scale * p.scale / 2.0;
    let half_h = cloud.height * cloud.scale * p.scale / 2.0;
    if half_w < 0.5 || half_h < 0.5 {
        return;
    }

    // Screen box covering the sprite at any rotation
    let reach = (half_w * half_w + half_h * half_h).sqrt();
    let x0 = (p.x - reach).floor().max(0.0);
    let x1 = (p.x + reach).ceil().min(width as f32 - 1.0);
    let y0 = (p.y - reach).floor().max(0.0);
    let y1 = (p.y + reach).ceil().min(height as f32 - 1.0);
    if x0 > x1 || y0 > y1 {
        return;
    }

    let texture = cloud.texture.texture();
    let Rgb(tr, tg, tb) = cloud.tint;
    let opacity = cloud.opacity.clamp(0.0, 1.0);

    for sy in y0 as i32..=y1 as i32 {
        for sx in x0 as i32..=x1 as i32 {
            let dx = sx as f32 + 0.5 - p.x;
            let dy = sy as f32 + 0.5 - p.y;
            let (lx, ly) = rotate_2d(dx, dy, -cloud.rotation);
            let v = ly / (2.0 * half_h) + 0.5;
            let mut u = lx / (2.0 * half_w) + 0.5;
            if ripple > 0.0 {
                u += ripple * (time * 0.5 + v * TAU).sin();
            }
            let (r, g, b, a) = texture.sample_clamped(u, v);
            if a == 0 {
                continue;
            }
            let alpha = (a as f32 * opacity) as u8;
            surface.blend_pixel(
                sx,
                sy,
                modulate(r, tr),
                modulate(g, tg),
                modulate(b, tb),
                alpha,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{CloudLayer, LayerKind, Placement, Span};
    use crate::gradient::ColorStops;
    use crate::math3d::Vec3;
    use approx::assert_relative_eq;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    fn quick_config() -> SkyConfig {
        SkyConfig {
            textures: Vec::new(),
            ..SkyConfig::default()
        }
    }

    fn run_until(scene: &mut SkyScene, state: SceneState) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while scene.poll() != state {
            assert!(Instant::now() < deadline, "scene never reached {:?}", state);
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn running(config: SkyConfig) -> SkyScene {
        let mut scene = SkyScene::with_rng(config, Rng::new(2024));
        scene.mount(Viewport::new(320, 240));
        run_until(&mut scene, SceneState::Running);
        scene
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut scene = SkyScene::with_rng(quick_config(), Rng::new(1));
        assert_eq!(scene.state(), SceneState::Uninitialized);
        assert!(!scene.tick(0.0));

        scene.mount(Viewport::new(320, 240));
        assert_eq!(scene.state(), SceneState::Loading);
        assert_eq!(scene.scheduled_frames(), 0);

        run_until(&mut scene, SceneState::Running);
        assert_eq!(scene.scheduled_frames(), 1);
        assert_eq!(scene.clouds().len(), scene.config().cloud_count());

        scene.unmount();
        assert_eq!(scene.state(), SceneState::Disposed);
    }

    #[test]
    fn test_scroll_drives_tints_and_stops_after_unmount() {
        let mut scene = running(quick_config());
        let stops = scene.config().clouds;
        assert!(scene.clouds().iter().all(|c| c.tint == stops.stop(0)));

        scene.set_scroll_progress(1.0);
        assert!(scene.tick(0.016));
        assert!(scene.clouds().iter().all(|c| c.tint == stops.stop(2)));

        scene.unmount();
        assert_eq!(scene.scheduled_frames(), 0);
        assert!(!scene.tick(0.032));
        assert!(scene.clouds().is_empty());
        assert!(scene.surface().is_none());
        assert!(scene.textures().is_none());
    }

    #[test]
    fn test_each_tick_schedules_exactly_one_frame() {
        let mut scene = running(quick_config());
        for i in 0..10 {
            assert!(scene.tick(i as f32 / 60.0));
            assert_eq!(scene.scheduled_frames(), 1);
        }
    }

    #[test]
    fn test_camera_follows_scroll_on_tick() {
        let mut scene = running(quick_config());
        let cam = scene.config().camera;
        scene.set_scroll_progress(0.5);
        // Not applied until the next frame
        assert_relative_eq!(scene.camera().position.z, cam.start.z);
        scene.tick(0.0);
        assert_relative_eq!(scene.camera().position.z, cam.start.z - 0.5 * cam.pullback);
    }

    #[test]
    fn test_resize_idempotent_and_resizes_surface() {
        let mut scene = running(quick_config());
        scene.resize(800, 600);
        let aspect = scene.camera().aspect();
        scene.resize(800, 600);
        assert_eq!(scene.camera().aspect(), aspect);
        let surface = scene.surface().unwrap();
        assert_eq!((surface.width(), surface.height()), (800, 600));
    }

    #[test]
    fn test_oversized_resize_is_capped_and_renders() {
        let mut scene = running(quick_config());
        scene.resize(u32::MAX, 1);
        assert!(scene.tick(0.0));
        assert_eq!(scene.viewport(), Viewport::new(MAX_DIMENSION, 1));
        let surface = scene.surface().unwrap();
        assert_eq!((surface.width(), surface.height()), (MAX_DIMENSION, 1));

        scene.resize(1, u32::MAX);
        assert!(scene.tick(0.016));
        assert_eq!(scene.camera().viewport(), (1, MAX_DIMENSION));
        assert_eq!(
            scene.surface().unwrap().as_bytes().len(),
            MAX_DIMENSION as usize * 4
        );
    }

    #[test]
    fn test_resize_while_loading() {
        let mut config = quick_config();
        config.textures = vec![PathBuf::from("/nonexistent/cloud1.png")];
        let mut scene = SkyScene::with_rng(config, Rng::new(3));
        scene.mount(Viewport::new(320, 240));
        scene.resize(1024, 512);
        assert_relative_eq!(scene.camera().aspect(), 2.0);
        run_until(&mut scene, SceneState::Running);
        assert_eq!(scene.surface().unwrap().width(), 1024);
    }

    #[test]
    fn test_unmount_mid_load() {
        let mut config = quick_config();
        config.textures = vec![
            PathBuf::from("/nonexistent/cloud1.png"),
            PathBuf::from("/nonexistent/cloud2.png"),
        ];
        let mut scene = SkyScene::with_rng(config, Rng::new(4));
        scene.mount(Viewport::new(64, 64));
        scene.unmount();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(scene.poll(), SceneState::Disposed);
        assert!(!scene.tick(1.0));
        assert!(scene.clouds().is_empty());
    }

    #[test]
    fn test_late_calls_after_dispose_are_noops() {
        let mut scene = running(quick_config());
        scene.unmount();
        scene.set_scroll_progress(0.7);
        scene.resize(10, 10);
        scene.unmount();
        assert_eq!(scene.state(), SceneState::Disposed);
        assert_eq!(scene.scroll_progress(), 0.0);
    }

    #[test]
    fn test_unmount_before_mount() {
        let mut scene = SkyScene::with_rng(quick_config(), Rng::new(5));
        scene.unmount();
        assert_eq!(scene.state(), SceneState::Disposed);
        scene.mount(Viewport::new(10, 10));
        assert_eq!(scene.state(), SceneState::Disposed);
    }

    #[test]
    fn test_second_mount_ignored() {
        let mut scene = running(quick_config());
        scene.mount(Viewport::new(1, 1));
        assert_eq!(scene.state(), SceneState::Running);
        assert_eq!(scene.viewport(), Viewport::new(320, 240));
    }

    #[test]
    fn test_scroll_progress_clamped() {
        let mut scene = SkyScene::with_rng(quick_config(), Rng::new(6));
        scene.set_scroll_progress(1.5);
        assert_eq!(scene.scroll_progress(), 1.0);
        scene.set_scroll_progress(-0.2);
        assert_eq!(scene.scroll_progress(), 0.0);
        scene.set_scroll_progress(f32::NAN);
        assert_eq!(scene.scroll_progress(), 0.0);
    }

    #[test]
    fn test_long_stall_is_clamped() {
        let mut scene = running(quick_config());
        scene.tick(0.0);
        let before: Vec<f32> = scene.clouds().iter().map(|c| c.position.x).collect();
        scene.tick(100.0);
        for (c, x0) in scene.clouds().iter().zip(before) {
            let step = c.position.x - x0;
            // Either wrapped or moved at most one clamped step
            assert!(step < 0.0 || step <= c.base_speed * MAX_FRAME_DT + 1e-4);
        }
    }

    fn single_cloud_config() -> SkyConfig {
        let black = Rgb(0, 0, 0);
        let red = Rgb(255, 0, 0);
        SkyConfig {
            textures: Vec::new(),
            sky: ColorStops::new(black, black, black),
            clouds: ColorStops::new(red, red, red),
            layers: vec![CloudLayer {
                name: "probe".into(),
                kind: LayerKind::Foreground,
                count: 1,
                width: Span::fixed(2.0),
                height: Span::fixed(2.0),
                scale: Span::fixed(1.0),
                opacity: Span::fixed(1.0),
                rotation: Span::fixed(0.0),
                lateral: Span::fixed(0.0),
                center_y: 0.0,
                band_y: 0.0,
                depth: Span::fixed(-5.0),
                base_speed: Span::fixed(0.0),
                float_speed: Span::fixed(0.0),
                float_amount: Span::fixed(0.0),
                placement: Placement::Scattered,
            }],
            ripple: 0.0,
            ..SkyConfig::default()
        }
    }

    #[test]
    fn test_renders_tinted_sprite_over_sky() {
        let mut scene = running(single_cloud_config());
        assert!(scene.clouds()[0].position.approx_eq(&Vec3::new(0.0, 0.0, -5.0), 1e-6));
        scene.tick(0.0);
        let surface = scene.surface().unwrap();
        let (r, g, b) = surface.get_pixel(160, 120).unwrap();
        assert!(r > 200, "sprite center too dark: {}", r);
        assert_eq!((g, b), (0, 0));
        assert_eq!(surface.get_pixel(0, 0), Some((0, 0, 0)));
    }

    #[test]
    fn test_sprite_recenters_after_resize() {
        let mut scene = running(single_cloud_config());
        scene.resize(400, 200);
        scene.tick(0.0);
        let surface = scene.surface().unwrap();
        let (r, _, _) = surface.get_pixel(200, 100).unwrap();
        assert!(r > 200, "sprite not at new center: {}", r);
        assert_eq!(surface.get_pixel(5, 5), Some((0, 0, 0)));
    }

    #[test]
    fn test_background_follows_scroll() {
        let mut config = single_cloud_config();
        config.layers.clear();
        config.sky = ColorStops::new(Rgb(0, 0, 0), Rgb(100, 100, 100), Rgb(200, 0, 0));
        let mut scene = running(config);
        scene.set_scroll_progress(1.0);
        scene.tick(0.0);
        let surface = scene.surface().unwrap();
        assert_eq!(surface.get_pixel(5, 0), Some((200, 0, 0)));
        assert_eq!(scene.background().bottom, Rgb(140, 0, 0));
    }
}
