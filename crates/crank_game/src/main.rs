//! Pong on the Crank engine.
//!
//! winit drives the event loop via `ApplicationHandler`. Window events are
//! translated into engine events and queued; each `RedrawRequested` hands the
//! queue to `Game::frame`, which runs input, update, fixed steps, render and
//! the destroy sweep in that order. Redraws are paced to the game's frame rate
//! with `ControlFlow::WaitUntil`.
//!
//! F3 toggles the debug overlay, Escape quits.

mod pong;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crank_core::cache::AssetSource;
use crank_core::config::{load_config_from_path, EngineConfig};
use crank_core::device::FontHandle;
use crank_core::error::EngineResult;
use crank_core::event::RawEvent;
use crank_core::input::Key;
use crank_core::Game;
use crank_devtools::{DebugOverlay, OverlayStats};
use crank_platform::{apply_window_request, create_window, translate_window_event, PlatformConfig};
use crank_render::WgpuDevice;
use pong::{GameManager, SCORE_FONT_SIZE};

const CONFIG_PATH: &str = "assets/config/engine.json";
const FONT_PATH: &str = "assets/fonts/score.ttf";
const DEFAULT_TITLE: &str = "Pong Demo";

type PongGame = Game<WgpuDevice<DebugOverlay>>;

/// Everything that only exists while the window does. Field order matters:
/// the game (and its GPU device) drops before the window it renders into.
struct Running {
    game: PongGame,
    window: Arc<Window>,
    pending: Vec<RawEvent>,
    last_frame: Instant,
}

impl Running {
    fn new(event_loop: &ActiveEventLoop, config: &EngineConfig) -> EngineResult<Self> {
        let window = create_window(event_loop, &PlatformConfig::from(config))?;
        let device = WgpuDevice::with_overlay(window.clone(), config.vsync, |gpu| {
            DebugOverlay::new(&gpu.device, gpu.surface_format)
        })?;
        let mut game = Game::new(device, config);
        let font = load_score_font(&mut game);
        game.add_root(GameManager::new(font));

        Ok(Self {
            game,
            window,
            pending: Vec::new(),
            last_frame: Instant::now(),
        })
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let real_dt = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;

        self.game.frame(self.pending.drain(..), real_dt);

        let stats = OverlayStats::from_time(self.game.time(), self.game.scene().len());
        self.game.device_mut().overlay_mut().update(stats);

        if let Some(request) = self.game.take_window_request() {
            apply_window_request(&self.window, request.title.as_deref(), request.size);
        }
    }

    fn next_frame_at(&self) -> Instant {
        self.last_frame + self.game.time().target_frame_duration()
    }
}

/// The score font from disk, else egui's bundled font, else none at all.
fn load_score_font(game: &mut PongGame) -> Option<FontHandle> {
    match game.load_font(AssetSource::Path(Path::new(FONT_PATH)), SCORE_FONT_SIZE) {
        Ok(font) => return Some(font),
        Err(e) => log::warn!("{e}; falling back to the built-in font"),
    }
    match game.device_mut().builtin_font(SCORE_FONT_SIZE) {
        Ok(font) => Some(font),
        Err(e) => {
            log::error!("No font available: {e}");
            None
        }
    }
}

fn load_config() -> EngineConfig {
    let path = Path::new(CONFIG_PATH);
    if !path.exists() {
        log::info!("No config at {CONFIG_PATH}, using defaults");
        return EngineConfig {
            title: DEFAULT_TITLE.to_owned(),
            ..EngineConfig::default()
        };
    }
    match load_config_from_path(path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}; using defaults");
            EngineConfig {
                title: DEFAULT_TITLE.to_owned(),
                ..EngineConfig::default()
            }
        }
    }
}

struct App {
    config: EngineConfig,
    state: Option<Running>,
    failed: bool,
}

impl App {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: None,
            failed: false,
        }
    }

    fn shut_down(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(running) = self.state.take() {
            let Running { game, window, .. } = running;
            drop(game.shutdown());
            drop(window);
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match Running::new(event_loop, &self.config) {
            Ok(running) => {
                log::info!(
                    "Window created: {}x{}",
                    running.game.width(),
                    running.game.height()
                );
                self.state = Some(running);
            }
            Err(e) => {
                log::error!("Startup failed: {e}");
                self.failed = true;
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match &event {
            WindowEvent::Resized(size) => {
                state.game.device_mut().resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                state.redraw();
                if state.game.quit_requested() {
                    self.shut_down(event_loop);
                }
                return;
            }
            _ => {}
        }

        if let Some(raw) = translate_window_event(&event) {
            if raw == RawEvent::KeyDown(Key::F3) {
                state.game.device_mut().overlay_mut().toggle();
            }
            state.pending.push(raw);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let next = state.next_frame_at();
        if Instant::now() >= next {
            state.window.request_redraw();
        } else {
            event_loop.set_control_flow(ControlFlow::WaitUntil(next));
        }
    }
}

fn main() -> std::process::ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Crank Pong starting...");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let mut app = App::new(load_config());
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {e}");
        return std::process::ExitCode::FAILURE;
    }
    if app.failed {
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}
