//! Frame clock for hosts.
//!
//! The engine does not own a timer; it is advanced by whatever delta the host
//! passes to [`ParticleSystem::update`](crate::ParticleSystem::update).
//! [`Time`] turns the wall clock into those deltas.
//!
//! # Example
//!
//! ```ignore
//! let mut time = Time::new().with_fixed_delta(Some(Duration::from_millis(33)));
//!
//! // In the host's frame callback:
//! let delta = time.update();
//! system.update(delta);
//! ```

use std::time::{Duration, Instant};

/// Wall-clock time source producing per-frame deltas.
#[derive(Debug)]
pub struct Time {
    last_frame: Instant,
    /// Scaled time handed out so far.
    elapsed: Duration,
    delta: Duration,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    paused: bool,
    fixed_delta: Option<Duration>,
    max_delta: Option<Duration>,
    time_scale: f32,
}

impl Time {
    /// Start the clock now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            elapsed: Duration::ZERO,
            delta: Duration::ZERO,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
            fixed_delta: None,
            max_delta: None,
            time_scale: 1.0,
        }
    }

    /// Hand out `delta` every frame regardless of the wall clock.
    pub fn with_fixed_delta(mut self, delta: Option<Duration>) -> Self {
        self.fixed_delta = delta;
        self
    }

    /// Clamp long frames, e.g. after the app was in the background.
    pub fn with_max_delta(mut self, max: Option<Duration>) -> Self {
        self.max_delta = max;
        self
    }

    /// Advance one frame. Returns the delta to feed the particle system.
    ///
    /// Returns zero while paused.
    pub fn update(&mut self) -> Duration {
        let now = Instant::now();
        if self.paused {
            self.delta = Duration::ZERO;
            return self.delta;
        }

        let raw = self.fixed_delta.unwrap_or_else(|| now.duration_since(self.last_frame));
        let raw = match self.max_delta {
            Some(max) => raw.min(max),
            None => raw,
        };
        self.delta = scale(raw, self.time_scale);
        self.last_frame = now;
        self.elapsed += self.delta;
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        self.delta
    }

    /// Scaled time handed out since start.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Delta of the last frame.
    #[inline]
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Measured frames per second, refreshed twice a second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Whether [`update`](Self::update) currently returns zero deltas.
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Multiplier applied to every delta. 1.0 is real time.
    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Stop handing out time.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume after [`pause`](Self::pause). The paused interval is skipped.
    pub fn resume(&mut self) {
        if self.paused {
            self.last_frame = Instant::now();
            self.paused = false;
        }
    }

    /// Pause if running, resume if paused.
    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// See [`with_fixed_delta`](Self::with_fixed_delta).
    pub fn set_fixed_delta(&mut self, delta: Option<Duration>) {
        self.fixed_delta = delta;
    }

    /// Speed multiplier. `0.5` is slow motion. Negative values clamp to 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = if scale.is_finite() { scale.max(0.0) } else { 1.0 };
    }

    /// Restart from zero.
    pub fn reset(&mut self) {
        *self = Self {
            fixed_delta: self.fixed_delta,
            max_delta: self.max_delta,
            time_scale: self.time_scale,
            ..Self::new()
        };
    }
}

fn scale(delta: Duration, factor: f32) -> Duration {
    if factor == 1.0 {
        return delta;
    }
    Duration::from_nanos((delta.as_nanos() as f64 * f64::from(factor)).round() as u64)
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_time_new() {
        let time = Time::new();
        assert_eq!(time.frame(), 0);
        assert!(!time.is_paused());
        assert_eq!(time.time_scale(), 1.0);
    }

    #[test]
    fn test_time_update() {
        let mut time = Time::new();
        thread::sleep(Duration::from_millis(10));
        let delta = time.update();

        assert!(delta >= Duration::from_millis(10));
        assert_eq!(time.elapsed(), delta);
        assert_eq!(time.frame(), 1);
    }

    #[test]
    fn test_time_pause() {
        let mut time = Time::new();
        time.update();
        time.pause();

        let elapsed_before = time.elapsed();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(time.update(), Duration::ZERO);
        assert_eq!(time.elapsed(), elapsed_before);

        time.resume();
        assert!(!time.is_paused());
    }

    #[test]
    fn test_toggle_pause() {
        let mut time = Time::new().with_fixed_delta(Some(Duration::from_millis(16)));
        time.toggle_pause();
        assert!(time.is_paused());
        assert_eq!(time.update(), Duration::ZERO);

        time.toggle_pause();
        assert!(!time.is_paused());
        assert_eq!(time.update(), Duration::from_millis(16));
        assert_eq!(time.time_scale(), 1.0);
    }

    #[test]
    fn test_fixed_delta_and_scale() {
        let mut time = Time::new().with_fixed_delta(Some(Duration::from_millis(20)));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(time.update(), Duration::from_millis(20));

        time.set_time_scale(0.5);
        assert_eq!(time.update(), Duration::from_millis(10));
        assert_eq!(time.elapsed(), Duration::from_millis(30));

        time.set_time_scale(-1.0);
        assert_eq!(time.time_scale(), 0.0);
    }

    #[test]
    fn test_max_delta_clamps() {
        let mut time = Time::new().with_max_delta(Some(Duration::from_millis(5)));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(time.update(), Duration::from_millis(5));
    }

    #[test]
    fn test_reset_keeps_settings() {
        let mut time = Time::new().with_fixed_delta(Some(Duration::from_millis(16)));
        time.update();
        time.reset();
        assert_eq!(time.frame(), 0);
        assert_eq!(time.update(), Duration::from_millis(16));
    }
}
