//! Frame timing for driving the solver from a real-time loop.

use std::time::{Duration, Instant};

/// Longest frame delta handed to the simulation, in seconds.
///
/// A stall (debugger, window drag) otherwise produces one enormous step
/// that launches every particle through the walls.
const MAX_DELTA: f32 = 0.25;

/// Tracks wall-clock frame deltas with a spiral-of-death clamp.
///
/// ```no_run
/// use verlet2d::clock::FrameClock;
///
/// let mut clock = FrameClock::new();
/// loop {
///     let dt = clock.tick();
///     // solver.update(dt);
/// }
/// ```
#[derive(Debug)]
pub struct FrameClock {
    start: Instant,
    last_frame: Instant,
    frame_count: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            frame_count: 0,
        }
    }

    /// Advance one frame and return the clamped delta in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_count += 1;
        delta.min(MAX_DELTA)
    }

    /// Total wall-clock time since the clock was created.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Frames ticked so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Average frames per second over the whole run.
    pub fn average_fps(&self) -> f32 {
        let secs = self.elapsed().as_secs_f32();
        if secs > 0.0 {
            self.frame_count as f32 / secs
        } else {
            0.0
        }
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
    fn test_tick_measures_time() {
        let mut clock = FrameClock::new();
        thread::sleep(Duration::from_millis(10));
        let dt = clock.tick();

        assert!(dt > 0.0);
        assert!(dt <= MAX_DELTA);
        assert_eq!(clock.frame(), 1);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut clock = FrameClock::new();
        // Simulate a long stall by back-dating the last frame.
        clock.last_frame = Instant::now() - Duration::from_secs(5);
        assert_eq!(clock.tick(), MAX_DELTA);
    }
}
