//! Root context: owns the scene forest, the frame snapshot and the device,
//! and runs one frame as a fixed phase sequence:
//!
//!   1. input: clear last frame's edges, drain this frame's raw events
//!   2. variable update with the measured delta time
//!   3. `while should_step()`: fixed update, one fixed step per call
//!   4. render: clear, viewport, z-sorted scene, present
//!   5. destroy sweep
//!
//! `frame` runs the sequence once for host-driven loops (winit's
//! `RedrawRequested`); `run` is the blocking loop that also paces frames.

use crate::behavior::Behavior;
use crate::cache::{AssetSource, Assets};
use crate::config::EngineConfig;
use crate::context::{Env, ScreenInfo};
use crate::device::{FontHandle, RenderDevice, TextureInfo};
use crate::error::EngineResult;
use crate::event::{EventSource, RawEvent};
use crate::input::InputState;
use crate::scene::{NodeId, Scene};
use crate::time::TimeState;
use crate::transform::Rect;
use crate::util::Color;
use glam::Vec2;
use std::time::Instant;

/// Window changes requested through the setters, for the host to apply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowRequest {
    pub title: Option<String>,
    pub size: Option<(u32, u32)>,
}

pub struct Game<D: RenderDevice> {
    scene: Scene,
    input: InputState,
    time: TimeState,
    screen: ScreenInfo,
    quit: bool,
    device: D,
    assets: Assets,
    clear_color: Color,
    title: String,
    window_request: WindowRequest,
}

impl<D: RenderDevice> Game<D> {
    pub fn new(device: D, config: &EngineConfig) -> Self {
        let mut time = TimeState::new();
        time.fixed_dt = config.fixed_step;
        time.max_accumulator = config.max_frame_time;
        time.set_frame_rate(config.frame_rate);
        Self {
            scene: Scene::new(),
            input: InputState::new(),
            time,
            screen: ScreenInfo::new(config.width, config.height),
            quit: false,
            device,
            assets: Assets::new(),
            clear_color: config.clear_color,
            title: config.title.clone(),
            window_request: WindowRequest::default(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn time(&self) -> &TimeState {
        &self.time
    }

    pub fn screen(&self) -> &ScreenInfo {
        &self.screen
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn add_root<B: Behavior>(&mut self, behavior: B) -> NodeId {
        self.scene.add_root(behavior)
    }

    pub fn load_texture(&mut self, source: AssetSource<'_>) -> EngineResult<TextureInfo> {
        self.assets.texture(&mut self.device, source)
    }

    pub fn load_font(&mut self, source: AssetSource<'_>, point_size: f32) -> EngineResult<FontHandle> {
        self.assets.font(&mut self.device, source, point_size)
    }

    /// Scene and device together, for APIs such as `TextNode::set_text`
    /// that need both outside a hook.
    pub fn scene_and_device(&mut self) -> (&mut Scene, &mut D) {
        (&mut self.scene, &mut self.device)
    }

    // --- settings ---

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.window_request.title = Some(self.title.clone());
    }

    /// Resize the logical screen. The host resizes the window to match.
    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("Ignoring screen size {width}x{height}");
            return;
        }
        self.screen.width = width;
        self.screen.height = height;
        self.window_request.size = Some((width, height));
    }

    /// Window changes made since the last call, if any.
    pub fn take_window_request(&mut self) -> Option<WindowRequest> {
        let request = std::mem::take(&mut self.window_request);
        (request != WindowRequest::default()).then_some(request)
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    pub fn frame_rate(&self) -> f64 {
        self.time.frame_rate()
    }

    pub fn set_frame_rate(&mut self, frame_rate: f64) {
        self.time.set_frame_rate(frame_rate);
    }

    pub fn set_dpi_scale(&mut self, dpi_scale: f32) {
        self.screen.dpi_scale = dpi_scale;
    }

    pub fn width(&self) -> u32 {
        self.screen.width
    }

    pub fn height(&self) -> u32 {
        self.screen.height
    }

    pub fn fps(&self) -> f64 {
        self.time.fps
    }

    pub fn has_focus(&self) -> bool {
        self.screen.focused
    }

    pub fn viewport(&self) -> Rect {
        self.screen.viewport()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Stop after the current frame.
    pub fn quit(&mut self) {
        self.quit = true;
    }

    // --- phases ---

    fn split(&mut self) -> (&mut Scene, Env<'_>) {
        (
            &mut self.scene,
            Env {
                input: &self.input,
                time: &self.time,
                screen: &self.screen,
                device: &mut self.device,
                assets: &mut self.assets,
                quit: &mut self.quit,
            },
        )
    }

    pub fn handle_input(&mut self, events: impl IntoIterator<Item = RawEvent>) {
        self.input.clear_edges();
        for event in events {
            match event {
                RawEvent::Quit => {
                    log::info!("Quit requested");
                    self.quit = true;
                }
                RawEvent::KeyDown(key) => self.input.key_down(key),
                RawEvent::KeyUp(key) => self.input.key_up(key),
                RawEvent::MouseMove { x, y } => {
                    self.input.mouse_position = Vec2::new(x, y) * self.screen.dpi_scale;
                }
                RawEvent::MouseDown(button) => self.input.mouse_button_down(button),
                RawEvent::MouseUp(button) => self.input.mouse_button_up(button),
                RawEvent::WindowResized { width, height } => {
                    if width > 0 && height > 0 {
                        self.screen.width = width;
                        self.screen.height = height;
                        log::info!("Resized to {width}x{height}");
                    }
                }
                RawEvent::FocusGained => self.screen.focused = true,
                RawEvent::FocusLost => {
                    self.screen.focused = false;
                    // Key-ups sent while unfocused never reach us.
                    self.input.reset();
                }
            }
        }
    }

    pub fn update(&mut self) {
        let dt = self.time.delta_time;
        let (scene, mut env) = self.split();
        scene.update(&mut env, dt);
    }

    /// Catch up every whole fixed step that has accumulated.
    pub fn fixed_update(&mut self) {
        while self.time.should_step() {
            let dt = self.time.fixed_dt;
            let (scene, mut env) = self.split();
            scene.fixed_update(&mut env, dt);
        }
    }

    /// Returns whether a frame was presented. A frame target that cannot be
    /// acquired skips drawing for this frame only.
    pub fn render(&mut self) -> bool {
        if let Err(e) = self.device.begin_frame() {
            log::warn!("Frame abandoned: {e}");
            return false;
        }
        self.device.clear(self.clear_color);
        self.device.set_viewport(self.screen.viewport());
        {
            let (scene, mut env) = self.split();
            scene.render(&mut env);
        }
        match self.device.present() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Present failed: {e}");
                false
            }
        }
    }

    pub fn destroy_sweep(&mut self) -> usize {
        let (scene, mut env) = self.split();
        scene.destroy_sweep(&mut env)
    }

    /// One full iteration. `real_dt` is the wall time the previous iteration
    /// took.
    pub fn frame(&mut self, events: impl IntoIterator<Item = RawEvent>, real_dt: f64) {
        self.handle_input(events);
        self.time.advance(real_dt);
        self.update();
        self.fixed_update();
        self.render();
        self.destroy_sweep();
    }

    /// Blocking loop: poll, run a frame, sleep out the rest of the target
    /// frame duration. Returns once quit is requested.
    pub fn run<E: EventSource>(&mut self, events: &mut E) {
        log::info!("Entering main loop at {} fps", self.time.frame_rate());
        let mut last = Instant::now();
        while !self.quit {
            let frame_start = Instant::now();
            let real_dt = frame_start.duration_since(last).as_secs_f64();
            last = frame_start;

            let batch = events.poll_events();
            self.frame(batch, real_dt);

            let target = self.time.target_frame_duration();
            let elapsed = frame_start.elapsed();
            if elapsed < target {
                std::thread::sleep(target - elapsed);
            }
        }
        log::info!("Main loop exited after {} frames", self.time.frame_count);
    }

    /// Tear down in order: the whole forest (firing `on_destroy`), then the
    /// asset caches. Hands the device back so the host drops it before the
    /// window.
    pub fn shutdown(mut self) -> D {
        self.scene.destroy_all();
        self.destroy_sweep();
        self.assets.clear_all(&mut self.device);
        log::info!("Shut down");
        self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NodeContext;
    use crate::device::test_support::tiny_png;
    use crate::device::{DrawCommand, RecordingDevice};
    use crate::event::ScriptedEvents;
    use crate::input::{Key, MouseButton};
    use crate::nodes::RectNode;
    use std::cell::RefCell;
    use std::rc::Rc;

    const EPS: f64 = 1e-9;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Tracer {
        log: Log,
    }

    impl Behavior for Tracer {
        fn update(&mut self, ctx: &mut NodeContext<'_, '_>, _dt: f64) {
            let pressed = ctx.input().is_key_pressed(Key::Space);
            self.log.borrow_mut().push(format!("update pressed={pressed}"));
        }

        fn fixed_update(&mut self, _ctx: &mut NodeContext<'_, '_>, dt: f64) {
            self.log.borrow_mut().push(format!("fixed {dt}"));
        }

        fn render(&mut self, _ctx: &mut NodeContext<'_, '_>) {
            self.log.borrow_mut().push("render".into());
        }

        fn on_destroy(&mut self, _ctx: &mut NodeContext<'_, '_>) {
            self.log.borrow_mut().push("destroy".into());
        }
    }

    fn game() -> Game<RecordingDevice> {
        Game::new(RecordingDevice::new(), &EngineConfig::default())
    }

    fn tracer(game: &mut Game<RecordingDevice>) -> (NodeId, Log) {
        let log = Log::default();
        let id = game.add_root(Tracer { log: log.clone() });
        (id, log)
    }

    #[test]
    fn config_is_applied() {
        let config = EngineConfig {
            title: "Test".into(),
            width: 320,
            height: 240,
            frame_rate: 30.0,
            fixed_step: 0.01,
            clear_color: Color::rgb(1, 2, 3),
            ..EngineConfig::default()
        };
        let game = Game::new(RecordingDevice::new(), &config);
        assert_eq!((game.width(), game.height()), (320, 240));
        assert!((game.frame_rate() - 30.0).abs() < EPS);
        assert!((game.time().fixed_dt - 0.01).abs() < EPS);
        assert_eq!(game.clear_color(), Color::rgb(1, 2, 3));
        assert_eq!(game.title(), "Test");
        assert_eq!(game.viewport(), Rect::new(0.0, 0.0, 320.0, 240.0));
    }

    #[test]
    fn phases_run_in_order() {
        let mut game = game();
        let (id, log) = tracer(&mut game);
        game.scene_mut().set_update(id, |ctx, _dt| ctx.destroy());
        game.frame(vec![], 0.02);

        assert_eq!(
            *log.borrow(),
            vec!["update pressed=false", "fixed 0.02", "render", "destroy"]
        );
        assert!(game.scene().is_empty());
    }

    #[test]
    fn pressed_lasts_one_frame() {
        let mut game = game();
        let (_, log) = tracer(&mut game);
        game.frame(vec![RawEvent::KeyDown(Key::Space)], 0.0);
        game.frame(vec![], 0.0);
        game.frame(vec![RawEvent::KeyDown(Key::Space)], 0.0);

        assert_eq!(
            *log.borrow(),
            vec!["update pressed=true", "render", "update pressed=false", "render", "update pressed=false", "render"]
        );
        assert!(game.input().is_key_down(Key::Space));

        game.frame(vec![RawEvent::KeyUp(Key::Space)], 0.0);
        assert!(game.input().is_key_released(Key::Space));
        game.frame(vec![], 0.0);
        assert!(!game.input().is_key_released(Key::Space));
    }

    #[test]
    fn fixed_steps_catch_up_and_carry_remainder() {
        let mut game = game();
        let (_, log) = tracer(&mut game);
        game.frame(vec![], 0.05);
        let fixed = |log: &Log| log.borrow().iter().filter(|l| l.starts_with("fixed")).count();
        assert_eq!(fixed(&log), 2);
        assert!((game.time().accumulator() - 0.01).abs() < EPS);

        game.frame(vec![], 0.01);
        assert_eq!(fixed(&log), 3);
    }

    #[test]
    fn long_frame_is_capped() {
        let mut game = game();
        game.frame(vec![], 5.0);
        assert_eq!(game.time().steps_this_frame, 12);
        assert!((game.time().delta_time - 0.25).abs() < EPS);
    }

    #[test]
    fn render_clears_sets_viewport_and_presents() {
        let mut game = game();
        game.set_clear_color(Color::rgb(9, 9, 9));
        let id = game.add_root(RectNode::filled(Color::WHITE));
        game.scene_mut()[id].set_size(10.0, 10.0);
        game.frame(vec![], 0.016);

        let frame = game.device().last_frame();
        assert_eq!(frame.first(), Some(&DrawCommand::Clear(Color::rgb(9, 9, 9))));
        assert_eq!(
            frame.get(1),
            Some(&DrawCommand::Viewport(Rect::new(0.0, 0.0, 800.0, 600.0)))
        );
        assert!(matches!(frame.get(2), Some(DrawCommand::Rect { .. })));
        assert_eq!(frame.last(), Some(&DrawCommand::Present));
        assert_eq!(game.device().frames_presented, 1);
    }

    #[test]
    fn lost_frame_skips_drawing_but_not_the_sweep() {
        let mut game = game();
        let (id, log) = tracer(&mut game);
        game.frame(vec![], 0.0);
        game.scene_mut().destroy(id);
        game.device_mut().fail_next_frame = true;
        game.frame(vec![], 0.0);

        assert_eq!(game.device().frames_presented, 1);
        assert_eq!(log.borrow().iter().filter(|l| *l == "render").count(), 1);
        assert_eq!(log.borrow().last().map(String::as_str), Some("destroy"));

        game.frame(vec![], 0.0);
        assert_eq!(game.device().frames_presented, 2);
    }

    #[test]
    fn pointer_is_scaled_once() {
        let mut game = game();
        game.set_dpi_scale(2.0);
        game.frame(vec![RawEvent::MouseMove { x: 10.0, y: 20.0 }], 0.0);
        assert_eq!(game.input().mouse_position, Vec2::new(20.0, 40.0));
    }

    #[test]
    fn resize_and_focus_events_update_the_screen() {
        let mut game = game();
        game.frame(
            vec![
                RawEvent::KeyDown(Key::Char('W')),
                RawEvent::MouseDown(MouseButton::Left),
                RawEvent::WindowResized { width: 1024, height: 768 },
                RawEvent::FocusLost,
            ],
            0.0,
        );
        assert_eq!(game.viewport(), Rect::new(0.0, 0.0, 1024.0, 768.0));
        assert!(!game.has_focus());
        assert!(!game.input().is_key_down(Key::Char('W')));
        assert!(!game.input().is_mouse_down(MouseButton::Left));

        game.frame(vec![RawEvent::FocusGained], 0.0);
        assert!(game.has_focus());
    }

    #[test]
    fn run_stops_on_quit_event() {
        let mut game = game();
        game.set_frame_rate(1000.0);
        let (_, log) = tracer(&mut game);
        let mut events = ScriptedEvents::new(vec![vec![], vec![RawEvent::KeyDown(Key::Space)]]);
        game.run(&mut events);

        assert!(game.quit_requested());
        assert_eq!(game.time().frame_count, 3);
        assert_eq!(game.device().frames_presented, 3);
        assert!(log.borrow().contains(&"update pressed=true".to_string()));
    }

    #[test]
    fn run_stops_when_a_node_quits() {
        let mut game = game();
        game.set_frame_rate(1000.0);
        let id = game.add_root(crate::behavior::Empty);
        game.scene_mut().set_update(id, |ctx, _dt| {
            if ctx.time().frame_count == 2 {
                ctx.quit();
            }
        });
        let mut events = ScriptedEvents::new(vec![vec![]; 10]);
        game.run(&mut events);
        assert_eq!(game.time().frame_count, 2);
        assert_eq!(events.remaining(), 8);
    }

    #[test]
    fn window_requests_are_taken_once() {
        let mut game = game();
        assert_eq!(game.take_window_request(), None);
        game.set_title("Pong");
        game.set_screen_size(640, 480);
        game.set_screen_size(0, 480);
        assert_eq!(
            game.take_window_request(),
            Some(WindowRequest {
                title: Some("Pong".into()),
                size: Some((640, 480)),
            })
        );
        assert_eq!(game.take_window_request(), None);
        assert_eq!(game.width(), 640);
    }

    #[test]
    fn shutdown_destroys_nodes_then_releases_assets() {
        let mut game = game();
        let (_, log) = tracer(&mut game);
        game.load_texture(AssetSource::Bytes(&tiny_png()))
            .expect("texture");
        let font = game
            .load_font(AssetSource::Bytes(b"font"), 12.0)
            .expect("font");
        assert_eq!(game.load_font(AssetSource::Bytes(b"font"), 12.0).ok(), Some(font));

        let device = game.shutdown();
        assert_eq!(log.borrow().last().map(String::as_str), Some("destroy"));
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.live_fonts(), 0);
    }
}
