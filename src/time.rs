// src/time.rs
//! Frame timing for driving `World::update` from a render loop.

use std::time::Instant;

/// Longest step handed out, so a stall (tab-out, breakpoint) does not explode the simulation.
pub const DEFAULT_MAX_DELTA: f32 = 0.25;

#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last_frame: Instant,
    last_delta: f32,
    frame: u64,
    max_delta: f32,
}

impl Default for FrameClock {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            last_delta: 0.0,
            frame: 0,
            max_delta: DEFAULT_MAX_DELTA,
        }
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_delta(max_delta: f32) -> Self {
        Self { max_delta, ..Self::default() }
    }

    /// Mark the start of a frame and return the seconds since the previous one.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let raw = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.last_delta = raw.min(self.max_delta);
        self.frame += 1;
        self.last_delta
    }

    /// Seconds between the last two ticks; zero before the first one.
    #[inline]
    pub fn last_frame_time(&self) -> f32 {
        self.last_delta
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Wall-clock seconds since the clock was created.
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}
