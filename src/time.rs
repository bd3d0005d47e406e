//! Frame timing.
//!
//! [`FrameClock`] is the single source of elapsed time, frame delta and FPS
//! for the simulation loop. It can follow the wall clock or be advanced by
//! hand, which keeps headless runs and tests deterministic.
//!
//! ```ignore
//! let mut clock = FrameClock::new();
//! clock.set_fixed_delta(Some(1.0 / 60.0));
//!
//! // Once per tick
//! let (elapsed, delta) = clock.update();
//! ```

use std::time::{Duration, Instant};

const FPS_WINDOW: f32 = 0.5;

/// Elapsed time, frame delta, frame count and FPS.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_tick: Option<Instant>,
    elapsed_secs: f32,
    delta_secs: f32,
    frame_count: u64,
    fps: f32,
    window_frames: u32,
    window_secs: f32,
    paused: bool,
    fixed_delta: Option<f32>,
    time_scale: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_tick: None,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            window_frames: 0,
            window_secs: 0.0,
            paused: false,
            fixed_delta: None,
            time_scale: 1.0,
        }
    }

    /// Advance from the wall clock. Call once per frame.
    ///
    /// The first call after construction or [`resume`](Self::resume) measures
    /// no time. Returns `(elapsed, delta)`.
    pub fn update(&mut self) -> (f32, f32) {
        let now = Instant::now();
        let raw = match self.last_tick.replace(now) {
            Some(last) => now.duration_since(last).as_secs_f32(),
            None => 0.0,
        };
        self.advance(raw)
    }

    /// Advance by `raw_delta` seconds of real time.
    ///
    /// A fixed delta, if set, replaces `raw_delta` for the simulation delta;
    /// FPS still follows the real time passed in.
    pub fn advance(&mut self, raw_delta: f32) -> (f32, f32) {
        if self.paused {
            self.delta_secs = 0.0;
            return (self.elapsed_secs, self.delta_secs);
        }

        let raw_delta = raw_delta.max(0.0);
        self.delta_secs = self.fixed_delta.unwrap_or(raw_delta) * self.time_scale;
        self.elapsed_secs += self.delta_secs;
        self.frame_count += 1;

        self.window_frames += 1;
        self.window_secs += raw_delta;
        if self.window_secs >= FPS_WINDOW {
            self.fps = self.window_frames as f32 / self.window_secs;
            self.window_frames = 0;
            self.window_secs = 0.0;
        }

        (self.elapsed_secs, self.delta_secs)
    }

    /// Scaled simulation time in seconds.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Delta of the last frame in seconds.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second over the last half second of real time.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Stop time. `delta()` reads 0 and `elapsed()` holds until resumed.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume after a pause. Time spent paused is not counted.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.last_tick = None;
        }
    }

    /// Use a constant delta instead of measured time. `None` measures again.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }

    /// Speed multiplier. Negative values clamp to 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Back to frame zero, keeping fixed delta and time scale.
    pub fn reset(&mut self) {
        *self = Self {
            fixed_delta: self.fixed_delta,
            time_scale: self.time_scale,
            ..Self::new()
        };
    }

    /// Delta of the last frame as a `Duration`.
    pub fn delta_duration(&self) -> Duration {
        Duration::from_secs_f32(self.delta_secs)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_new() {
        let clock = FrameClock::new();
        assert_eq!(clock.frame(), 0);
        assert!(!clock.is_paused());
        assert_eq!(clock.time_scale(), 1.0);
    }

    #[test]
    fn test_clock_update() {
        let mut clock = FrameClock::new();
        clock.update();
        thread::sleep(Duration::from_millis(10));
        let (elapsed, delta) = clock.update();

        assert!(elapsed > 0.0);
        assert!(delta > 0.0);
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn test_clock_advance() {
        let mut clock = FrameClock::new();
        for _ in 0..60 {
            clock.advance(1.0 / 60.0);
        }
        assert!((clock.elapsed() - 1.0).abs() < 1e-4);
        assert!((clock.fps() - 60.0).abs() < 0.5);
    }

    #[test]
    fn test_clock_pause() {
        let mut clock = FrameClock::new();
        clock.advance(0.1);
        clock.pause();

        let elapsed_before = clock.elapsed();
        clock.advance(0.1);

        assert_eq!(clock.elapsed(), elapsed_before);
        assert_eq!(clock.delta(), 0.0);
        assert_eq!(clock.frame(), 1);

        clock.resume();
        clock.advance(0.1);
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn test_time_scale() {
        let mut clock = FrameClock::new();
        clock.set_time_scale(2.0);
        clock.advance(0.1);
        assert!((clock.delta() - 0.2).abs() < 1e-6);

        clock.set_time_scale(-1.0);
        assert_eq!(clock.time_scale(), 0.0);
    }

    #[test]
    fn test_fixed_delta() {
        let mut clock = FrameClock::new();
        clock.set_fixed_delta(Some(1.0 / 60.0));

        clock.advance(0.1);

        assert!((clock.delta() - 1.0 / 60.0).abs() < 0.0001);
    }

    #[test]
    fn test_reset_keeps_settings() {
        let mut clock = FrameClock::new();
        clock.set_fixed_delta(Some(0.01));
        clock.set_time_scale(0.5);
        clock.advance(1.0);

        clock.reset();

        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.elapsed(), 0.0);
        clock.advance(1.0);
        assert!((clock.delta() - 0.005).abs() < 1e-6);
    }
}
