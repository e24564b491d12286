use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use sdl2::keyboard::Keycode;
use skyfacer::config::SkyConfig;
use skyfacer::control::{Command, Controller};
use skyfacer::display::{Display, InputEvent, RenderTarget, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use skyfacer::error::SkyError;
use skyfacer::mqtt::ScrollFeed;
use skyfacer::scroll::{PageScroll, LINE_STEP};
use skyfacer::sky::{SceneState, SkyScene, Viewport};
use skyfacer::util::FpsCounter;

/// Config picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG: &str = "sky.json";
/// Height of the simulated page, in viewports
const PAGE_COUNT: f32 = 5.0;
/// Seconds between FPS log lines
const FPS_LOG_INTERVAL: Duration = Duration::from_secs(5);

struct Args {
    width: u32,
    height: u32,
    vsync: bool,
    config: Option<PathBuf>,
    flythrough: bool,
    mqtt: Option<String>,
    control: bool,
}

fn print_help() {
    println!("Usage: skyfacer [OPTIONS]");
    println!();
    println!("Options:");
    println!(
        "  --width W, -w W           Set window width (default: {})",
        DEFAULT_WIDTH
    );
    println!(
        "  --height H, -h H          Set window height (default: {})",
        DEFAULT_HEIGHT
    );
    println!("  --resolution WxH, -r WxH  Set resolution (e.g., 1920x1080)");
    println!(
        "  --config PATH, -c PATH    Sky config JSON (default: {} if present)",
        DEFAULT_CONFIG
    );
    println!("  --flythrough              Clouds stream toward the camera instead of across");
    println!(
        "  --mqtt HOST               Follow scroll progress on MQTT topic '{}'",
        ScrollFeed::default_topic()
    );
    println!(
        "  --control                 Accept commands on {}",
        Controller::socket_path()
    );
    println!("  --no-vsync                Disable VSync for uncapped framerate");
    println!("  --help                    Show this help message");
    println!();
    println!("Controls:");
    println!("  Wheel, Up/Down      - Scroll");
    println!("  PageUp/PageDown     - Scroll one screen");
    println!("  Home/End            - Jump to top/bottom");
    println!("  Escape, Q           - Quit");
}

/// Parse command line arguments
fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        width: DEFAULT_WIDTH,
        height: DEFAULT_HEIGHT,
        vsync: true,
        config: None,
        flythrough: false,
        mqtt: None,
        control: false,
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--no-vsync" => parsed.vsync = false,
            "--flythrough" => parsed.flythrough = true,
            "--control" => parsed.control = true,
            "--width" | "-w" => {
                if let Some(w) = value.and_then(|v| v.parse().ok()) {
                    parsed.width = w;
                }
                i += 1;
            },
            "--height" | "-h" => {
                if let Some(h) = value.and_then(|v| v.parse().ok()) {
                    parsed.height = h;
                }
                i += 1;
            },
            "--resolution" | "-r" => {
                // WxH, e.g. 1920x1080
                if let Some((w, h)) = value.and_then(|v| v.split_once('x')) {
                    if let (Ok(w), Ok(h)) = (w.parse(), h.parse()) {
                        parsed.width = w;
                        parsed.height = h;
                    }
                }
                i += 1;
            },
            "--config" | "-c" => {
                parsed.config = value.map(PathBuf::from);
                i += 1;
            },
            "--mqtt" => {
                parsed.mqtt = Some(value.cloned().unwrap_or_default());
                i += 1;
            },
            "--help" => {
                print_help();
                std::process::exit(0);
            },
            other => warn!("Ignoring unknown argument {:?}", other),
        }
        i += 1;
    }

    let size = Viewport::new(parsed.width, parsed.height);
    parsed.width = size.width;
    parsed.height = size.height;
    parsed
}

/// Swap in a resource rebuilt for a new size. On failure the current one
/// stays and the resize is dropped; returns whether the swap happened.
fn replace_or_keep<T>(current: &mut T, rebuilt: Result<T, String>, size: Viewport) -> bool {
    match rebuilt {
        Ok(value) => {
            *current = value;
            true
        },
        Err(e) => {
            warn!(
                "Resize to {}x{} rejected: {}; keeping previous size",
                size.width, size.height, e
            );
            false
        },
    }
}

/// An explicit `--config` must load; the implicit one falls back to a preset
fn load_config(args: &Args) -> Result<SkyConfig, SkyError> {
    let preset = || {
        if args.flythrough {
            SkyConfig::flythrough()
        } else {
            SkyConfig::default()
        }
    };

    if let Some(path) = &args.config {
        let config = SkyConfig::load(path)?;
        info!("Loaded sky config from {}", path.display());
        return Ok(config);
    }

    let implicit = Path::new(DEFAULT_CONFIG);
    if !implicit.exists() {
        return Ok(preset());
    }
    match SkyConfig::load(implicit) {
        Ok(config) => {
            info!("Loaded sky config from {}", implicit.display());
            Ok(config)
        },
        Err(e) => {
            warn!("{}; using built-in preset", e);
            Ok(preset())
        },
    }
}

fn main() -> Result<(), SkyError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();
    let config = load_config(&args)?;

    let (mut display, texture_creator) =
        Display::with_options("skyfacer", args.width, args.height, args.vsync)?;
    let mut target = RenderTarget::with_size(&texture_creator, args.width, args.height)?;

    let controller = if args.control {
        match Controller::new() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Remote control disabled: {}", e);
                None
            },
        }
    } else {
        None
    };

    let feed = match &args.mqtt {
        Some(host) => match ScrollFeed::new(host, "") {
            Ok(feed) => Some(feed),
            Err(e) => {
                warn!("MQTT disabled: {}", e);
                None
            },
        },
        None => None,
    };

    info!("=== skyfacer ===");
    info!(
        "Resolution: {}x{}, VSync {}, drift {:?}, {} clouds",
        args.width,
        args.height,
        if args.vsync { "on" } else { "off" },
        config.drift_axis(),
        config.cloud_count()
    );

    let mut page = PageScroll::new(args.height as f32, PAGE_COUNT);
    let mut fps_counter = FpsCounter::new(120);
    let mut last_fps_log = Instant::now();
    let clock = Instant::now();

    let mut scene = SkyScene::new(config);
    scene.mount(Viewport::new(args.width, args.height));

    'main: loop {
        let mut resize_to = None;

        for event in display.poll_events() {
            match event {
                InputEvent::Quit => break 'main,
                InputEvent::KeyDown(key) => match key {
                    Keycode::Escape | Keycode::Q => break 'main,
                    Keycode::Down => page.scroll_by(LINE_STEP),
                    Keycode::Up => page.scroll_by(-LINE_STEP),
                    Keycode::PageDown | Keycode::Space => page.page_down(),
                    Keycode::PageUp => page.page_up(),
                    Keycode::Home => page.home(),
                    Keycode::End => page.end(),
                    _ => {},
                },
                // Wheel up moves toward the top of the page
                InputEvent::Wheel(notches) => page.scroll_by(-(notches as f32) * LINE_STEP),
                InputEvent::Resized { width, height } => {
                    resize_to = Some(Viewport::new(width, height));
                },
            }
        }

        if let Some(controller) = &controller {
            for command in controller.poll() {
                match command {
                    Command::Scroll(progress) => page.scroll_to_progress(progress),
                    Command::Resize(width, height) => {
                        let size = Viewport::new(width, height);
                        match display.set_size(size.width, size.height) {
                            Ok(()) => resize_to = Some(size),
                            Err(e) => warn!(
                                "Window resize to {}x{} failed: {}",
                                size.width, size.height, e
                            ),
                        }
                    },
                    Command::Quit => break 'main,
                }
            }
        }

        if let Some(progress) = feed.as_ref().and_then(ScrollFeed::poll) {
            page.scroll_to_progress(progress);
        }

        if let Some(size) = resize_to {
            let rebuilt = RenderTarget::with_size(&texture_creator, size.width, size.height);
            if replace_or_keep(&mut target, rebuilt, size) {
                page.set_viewport_height(size.height as f32);
                scene.resize(size.width, size.height);
            }
        }

        scene.set_scroll_progress(page.progress());
        scene.poll();

        let now = clock.elapsed().as_secs_f32();
        if scene.tick(now) {
            if let Some(surface) = scene.surface() {
                if let Err(e) = display.present(&mut target, surface) {
                    warn!("Present failed: {}", e);
                }
            }
        } else if scene.state() == SceneState::Loading {
            // Nothing to present yet, so vsync will not pace us
            std::thread::sleep(Duration::from_millis(5));
            continue;
        }

        let (_, avg_fps) = fps_counter.tick();
        if last_fps_log.elapsed() >= FPS_LOG_INTERVAL {
            let (min_fps, max_fps) = fps_counter.min_max_fps();
            debug!(
                "{:.1} fps (min {:.1}, max {:.1}), {:.2} ms/frame, progress {:.3}",
                avg_fps,
                min_fps,
                max_fps,
                fps_counter.avg_frame_time_ms(),
                scene.scroll_progress()
            );
            last_fps_log = Instant::now();
        }
    }

    scene.unmount();
    info!("Goodbye");
    Ok(())
}
