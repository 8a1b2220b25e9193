//! Bounded per-update delta factor.
//!
//! Simulation code scales its per-update movement by
//! [`Timestep::delta_factor`], the ratio of the last observed update interval
//! to the fixed frame time. The ratio is clamped to
//! [`MAX_DELTA_FACTOR`], so a long stall (breakpoint, scheduler hiccup) can
//! never advance anything by more than one nominal frame's worth in a single
//! update.

use crate::{DEFAULT_FRAME_TIME_MS, MAX_DELTA_FACTOR};

/// Tracks the interval between update ticks.
///
/// Mutated once per update tick via [`update`](Self::update); read-only in
/// between.
#[derive(Debug, Clone, PartialEq)]
pub struct Timestep {
    previous_ticks: f64,
    delta: f64,
    frame_time_ms: f64,
    max_delta_factor: f64,
}

impl Timestep {
    /// A timestep for the default 60 Hz frame time and a factor cap of 1.0.
    pub fn new() -> Self {
        Self::with_frame_time(DEFAULT_FRAME_TIME_MS, MAX_DELTA_FACTOR)
    }

    /// A timestep for a custom frame time and factor cap.
    ///
    /// # Panics
    ///
    /// Panics if either value is not positive and finite.
    pub fn with_frame_time(frame_time_ms: f64, max_delta_factor: f64) -> Self {
        assert!(
            frame_time_ms > 0.0 && frame_time_ms.is_finite(),
            "frame_time_ms must be positive and finite, got {frame_time_ms}"
        );
        assert!(
            max_delta_factor > 0.0 && max_delta_factor.is_finite(),
            "max_delta_factor must be positive and finite, got {max_delta_factor}"
        );
        Self {
            previous_ticks: 0.0,
            delta: 0.0,
            frame_time_ms,
            max_delta_factor,
        }
    }

    /// Record a new tick sample (milliseconds). Callers pass non-decreasing
    /// values.
    pub fn update(&mut self, current_ticks: f64) {
        self.delta = current_ticks - self.previous_ticks;
        self.previous_ticks = current_ticks;
    }

    /// The raw interval between the last two samples, in milliseconds.
    pub fn delta_ms(&self) -> f64 {
        self.delta
    }

    /// `min(delta / frame_time, max_delta_factor)`.
    pub fn delta_factor(&self) -> f64 {
        (self.delta / self.frame_time_ms).min(self.max_delta_factor)
    }

    /// The tick value recorded by the last [`update`](Self::update).
    pub fn previous_ticks(&self) -> f64 {
        self.previous_ticks
    }

    /// The fixed frame time this timestep normalizes against.
    pub fn frame_time_ms(&self) -> f64 {
        self.frame_time_ms
    }
}

impl Default for Timestep {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
