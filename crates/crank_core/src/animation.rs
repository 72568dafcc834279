//! Timeline primitives and their composition.
//!
//! An `Animation` wraps a step function `(scene, dt, elapsed) -> remaining`
//! and only advances while `Running`. An `Animator` is a scene node that owns
//! a list of animations and drives them either all at once (`Parallel`) or
//! one after another (`Sequence`).
//!
//! Parallel mode restarts every animation as soon as none of them is still
//! running, whether or not `looping` is set. Sequence mode only wraps around
//! when `looping` is set. Otherwise, once the last animation finishes, the
//! cursor stays on it and the animator's own state changes to `Complete`.
//! The animations themselves are not restarted or reset: each keeps the state
//! it finished in, and further ticks leave them frozen.

use crate::behavior::Behavior;
use crate::context::NodeContext;
use crate::scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Idle,
    Running,
    Paused,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
}

impl Easing {
    /// Map normalized time `t` (clamped to [0,1]) to eased progress.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::InQuad => t * t,
            Easing::OutQuad => t * (2.0 - t),
            Easing::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::InCubic => t * t * t,
            Easing::OutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Easing::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * u * u * u + 1.0
                }
            }
        }
    }
}

/// `(scene, dt, elapsed) -> remaining`. Zero (or less) means done.
pub type StepFn = Box<dyn FnMut(&mut Scene, f64, f64) -> f64>;

pub struct Animation {
    step: StepFn,
    state: PlayState,
    elapsed: f64,
    start_count: u32,
}

impl Animation {
    pub fn from_step(step: impl FnMut(&mut Scene, f64, f64) -> f64 + 'static) -> Self {
        Self {
            step: Box::new(step),
            state: PlayState::Idle,
            elapsed: 0.0,
            start_count: 0,
        }
    }

    /// Feed eased progress in [0,1] to `apply` over `duration` seconds. A
    /// non-positive duration jumps straight to 1.
    pub fn tween(
        duration: f64,
        easing: Easing,
        mut apply: impl FnMut(&mut Scene, f32) + 'static,
    ) -> Self {
        Self::from_step(move |scene, _dt, elapsed| {
            let t = if duration <= 0.0 {
                1.0
            } else {
                (elapsed / duration).min(1.0)
            };
            apply(scene, easing.apply(t as f32));
            (duration - elapsed).max(0.0)
        })
    }

    /// Does nothing for `duration` seconds.
    pub fn wait(duration: f64) -> Self {
        Self::from_step(move |_scene, _dt, elapsed| (duration - elapsed).max(0.0))
    }

    pub fn start(&mut self) {
        self.elapsed = 0.0;
        self.state = PlayState::Running;
        self.start_count += 1;
    }

    pub fn pause(&mut self) {
        if self.state == PlayState::Running {
            self.state = PlayState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == PlayState::Paused {
            self.state = PlayState::Running;
        }
    }

    /// Advance by `dt` and return the time remaining, or 0 once complete.
    /// Anything but a running animation returns 0 without advancing.
    pub fn tick(&mut self, scene: &mut Scene, dt: f64) -> f64 {
        if self.state != PlayState::Running {
            return 0.0;
        }
        self.elapsed += dt;
        let remaining = (self.step)(scene, dt, self.elapsed);
        if remaining > 0.0 {
            remaining
        } else {
            self.state = PlayState::Complete;
            0.0
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// How many times `start` has been called.
    pub fn start_count(&self) -> u32 {
        self.start_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimatorMode {
    Parallel,
    #[default]
    Sequence,
}

#[derive(Default)]
pub struct Animator {
    animations: Vec<Animation>,
    mode: AnimatorMode,
    looping: bool,
    cursor: usize,
    state: PlayState,
}

impl Animator {
    pub fn new(mode: AnimatorMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn looping(mode: AnimatorMode) -> Self {
        Self {
            mode,
            looping: true,
            ..Self::default()
        }
    }

    pub fn with(mut self, animation: Animation) -> Self {
        self.animations.push(animation);
        self
    }

    pub fn add_animation(&mut self, animation: Animation) {
        self.animations.push(animation);
    }

    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn set_state(&mut self, state: PlayState) {
        self.state = state;
    }

    pub fn mode(&self) -> AnimatorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: AnimatorMode) {
        self.mode = mode;
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Index of the current animation. Only meaningful in sequence mode.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Start from the beginning. An empty animator stays idle.
    pub fn start(&mut self) {
        if self.animations.is_empty() {
            return;
        }
        match self.mode {
            AnimatorMode::Parallel => self.start_parallel(),
            AnimatorMode::Sequence => {
                self.cursor = 0;
                self.animations[0].start();
                self.state = PlayState::Running;
            }
        }
    }

    fn start_parallel(&mut self) {
        for animation in &mut self.animations {
            animation.start();
        }
        self.state = PlayState::Running;
    }

    /// Pauses the animations only when currently running. The animator
    /// itself always ends up paused.
    pub fn pause(&mut self) {
        if self.state == PlayState::Running {
            for animation in &mut self.animations {
                animation.pause();
            }
        }
        self.state = PlayState::Paused;
    }

    pub fn resume(&mut self) {
        if self.state == PlayState::Paused {
            for animation in &mut self.animations {
                animation.resume();
            }
        }
        self.state = PlayState::Running;
    }

    pub fn tick(&mut self, scene: &mut Scene, dt: f64) {
        if self.animations.is_empty() || self.state != PlayState::Running {
            return;
        }
        match self.mode {
            AnimatorMode::Parallel => self.tick_parallel(scene, dt),
            AnimatorMode::Sequence => self.tick_sequence(scene, dt),
        }
    }

    fn tick_parallel(&mut self, scene: &mut Scene, dt: f64) {
        let mut still_running = false;
        for animation in &mut self.animations {
            if animation.state() == PlayState::Running && animation.tick(scene, dt) != 0.0 {
                still_running = true;
            }
        }
        if !still_running {
            self.start_parallel();
        }
    }

    fn tick_sequence(&mut self, scene: &mut Scene, dt: f64) {
        let Some(current) = self.animations.get_mut(self.cursor) else {
            return;
        };
        if current.state() != PlayState::Running || current.tick(scene, dt) != 0.0 {
            return;
        }

        self.cursor += 1;
        if self.cursor >= self.animations.len() {
            if !self.looping {
                self.cursor = self.animations.len() - 1;
                self.state = PlayState::Complete;
                return;
            }
            self.cursor = 0;
        }
        self.animations[self.cursor].start();
    }
}

impl Behavior for Animator {
    fn start(&mut self, _ctx: &mut NodeContext<'_, '_>) {
        Animator::start(self);
    }

    fn update(&mut self, ctx: &mut NodeContext<'_, '_>, dt: f64) {
        self.tick(ctx.scene, dt);
    }
}
