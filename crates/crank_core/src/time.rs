use std::time::Duration;

pub const DEFAULT_FRAME_RATE: f64 = 60.0;
pub const DEFAULT_FIXED_STEP: f64 = 0.02;
pub const DEFAULT_MAX_FRAME_TIME: f64 = 0.25;

pub struct TimeState {
    pub fixed_dt: f64,
    pub max_accumulator: f64,
    accumulator: f64,
    pub fixed_step_count: u64,
    pub frame_count: u64,
    pub steps_this_frame: u32,
    /// Measured duration of the previous iteration, fed to variable updates.
    pub delta_time: f64,

    frame_rate: f64,

    fps_window_time: f64,
    fps_window_frames: u32,
    /// Frames per second, refreshed once per real second.
    pub fps: f64,
}

impl TimeState {
    pub fn new() -> Self {
        Self {
            fixed_dt: DEFAULT_FIXED_STEP,
            max_accumulator: DEFAULT_MAX_FRAME_TIME,
            accumulator: 0.0,
            fixed_step_count: 0,
            frame_count: 0,
            steps_this_frame: 0,
            delta_time: 0.0,
            frame_rate: DEFAULT_FRAME_RATE,
            fps_window_time: 0.0,
            fps_window_frames: 0,
            fps: 0.0,
        }
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn set_frame_rate(&mut self, frame_rate: f64) {
        if frame_rate > 0.0 {
            self.frame_rate = frame_rate;
        } else {
            log::warn!("Ignoring non-positive frame rate {frame_rate}");
        }
    }

    pub fn target_frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate)
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Feed an externally measured frame duration.
    pub fn advance(&mut self, real_dt: f64) {
        let mut dt = real_dt.max(0.0);

        // Spiral-of-death cap
        if dt > self.max_accumulator {
            log::warn!(
                "Frame took {:.1}ms, capping to {}ms",
                dt * 1000.0,
                self.max_accumulator * 1000.0
            );
            dt = self.max_accumulator;
        }

        self.delta_time = dt;
        self.accumulator += dt;
        self.steps_this_frame = 0;
        self.frame_count += 1;

        self.fps_window_time += real_dt.max(0.0);
        self.fps_window_frames += 1;
        if self.fps_window_time >= 1.0 {
            self.fps = self.fps_window_frames as f64 / self.fps_window_time;
            self.fps_window_time = 0.0;
            self.fps_window_frames = 0;
        }
    }

    /// Consume one fixed step if enough time has accumulated. Decrements by
    /// exactly one step so no simulated time is lost.
    pub fn should_step(&mut self) -> bool {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            self.fixed_step_count += 1;
            self.steps_this_frame += 1;
            true
        } else {
            false
        }
    }
}

impl Default for TimeState {
    fn default() -> Self {
        Self::new()
    }
}
