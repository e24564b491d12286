//! Scroll-driven procedural cloud sky, painted in software.
//!
//! [`sky::SkyScene`] is the engine: mount it on a surface, feed it scroll
//! progress, and call `poll`/`tick` once per vsync. The `skyfacer` binary
//! hosts it in an SDL2 window.

pub mod camera;
pub mod config;
pub mod control;
pub mod display;
pub mod error;
pub mod field;
pub mod gradient;
pub mod loader;
pub mod math3d;
pub mod motion;
pub mod mqtt;
pub mod noise;
pub mod scroll;
pub mod sky;
pub mod texture;
pub mod util;
