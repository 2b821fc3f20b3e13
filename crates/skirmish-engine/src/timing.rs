//! Frame timing.
//!
//! Turns the time that passes per outer tick into simulation steps, either
//! one variable step per tick or a fixed timestep accumulator. Also tracks
//! how long each step took to compute.

use std::collections::VecDeque;
use std::time::Duration;

/// Maximum fixed updates per tick to prevent a spiral of death.
const MAX_UPDATES_PER_TICK: u32 = 10;

/// Frame timing manager.
#[derive(Debug)]
pub struct FrameTiming {
    /// Accumulator for fixed timestep
    accumulator: f32,
    /// Fixed timestep delta
    fixed_dt: f32,
    /// Maximum variable delta per step
    max_dt: f32,
    /// Whether steps use the fixed timestep
    fixed_step: bool,
    /// Recent step compute times for averaging
    step_times: VecDeque<f32>,
    /// Maximum samples for averaging
    max_samples: usize,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

impl FrameTiming {
    /// Create a fixed-step frame timing manager.
    #[must_use]
    pub fn new(fixed_dt: f32) -> Self {
        Self {
            accumulator: 0.0,
            fixed_dt: fixed_dt.max(0.001), // Minimum 1ms
            max_dt: 0.25,                  // Max 250ms delta
            fixed_step: true,
            step_times: VecDeque::with_capacity(120),
            max_samples: 120,
        }
    }

    /// Switch between fixed and variable steps.
    #[must_use]
    pub fn with_fixed_step(mut self, fixed_step: bool) -> Self {
        self.fixed_step = fixed_step;
        self
    }

    /// Get the fixed timestep value.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Whether the fixed timestep is in use.
    #[must_use]
    pub fn is_fixed_step(&self) -> bool {
        self.fixed_step
    }

    /// Accumulate time for fixed timestep updates.
    /// Returns the number of fixed updates that should be performed.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut count = 0;

        while self.accumulator >= self.fixed_dt && count < MAX_UPDATES_PER_TICK {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // If we're still behind, drop the backlog
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        count
    }

    /// Step deltas to run for a tick of `dt` seconds.
    ///
    /// Fixed mode yields zero or more `fixed_dt` steps; variable mode yields
    /// exactly one step clamped to `max_dt`.
    pub fn steps(&mut self, dt: f32) -> Vec<f32> {
        if self.fixed_step {
            let count = self.accumulate(dt);
            vec![self.fixed_dt; count as usize]
        } else {
            vec![dt.clamp(0.0, self.max_dt)]
        }
    }

    /// Record how long one simulation step took to compute.
    pub fn record_step(&mut self, elapsed: Duration) {
        self.step_times.push_back(elapsed.as_secs_f32());
        if self.step_times.len() > self.max_samples {
            self.step_times.pop_front();
        }
    }

    /// Get the average step compute time in milliseconds.
    #[must_use]
    pub fn average_step_time_ms(&self) -> f32 {
        if self.step_times.is_empty() {
            return 0.0;
        }

        (self.step_times.iter().sum::<f32>() / self.step_times.len() as f32) * 1000.0
    }
}
