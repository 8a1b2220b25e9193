//! Cadence Timing -- time sources and pacing primitives for the runtime loop.
//!
//! This crate holds the leaf components the runtime loop is built from:
//!
//! - [`Clock`](clock::Clock): elapsed time since a reference instant, backed by
//!   an interchangeable [`TimeSource`](clock::TimeSource).
//! - [`Timestep`](timestep::Timestep): turns raw tick samples into a bounded
//!   per-update delta factor.
//! - [`FrameAccumulator`](frame::FrameAccumulator): the fixed-timestep
//!   accumulator plus per-second frame/update statistics.
//! - [`UtilizationSampler`](sampler::UtilizationSampler): polls host CPU
//!   utilization at most once per interval without stalling the loop.
//!
//! # Quick Start
//!
//! ```
//! use cadence_timing::prelude::*;
//! use std::time::Duration;
//!
//! let source = ManualSource::new();
//! let handle = source.handle();
//! let mut clock = Clock::new(Box::new(source));
//! clock.start();
//!
//! let mut frames = FrameAccumulator::new();
//! let mut timestep = Timestep::new();
//!
//! handle.advance(Duration::from_millis(20));
//! let now = clock.elapsed_milliseconds();
//! if frames.poll_update(now) {
//!     timestep.update(now);
//! }
//! assert_eq!(frames.total_updates(), 1);
//! assert!((timestep.delta_factor() - 1.0).abs() < f64::EPSILON);
//! ```

#![deny(unsafe_code)]

pub mod clock;
pub mod frame;
pub mod sampler;
pub mod timestep;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default update rate in ticks per second.
pub const DEFAULT_UPDATE_HZ: f64 = 60.0;

/// Default fixed frame time in milliseconds (`1000 / 60`).
pub const DEFAULT_FRAME_TIME_MS: f64 = 1000.0 / DEFAULT_UPDATE_HZ;

/// Upper bound on the per-update delta factor.
pub const MAX_DELTA_FACTOR: f64 = 1.0;

/// Default CPU sampling cadence in milliseconds.
pub const DEFAULT_SAMPLE_INTERVAL_MS: f64 = 1000.0;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by time sources and utilization queries.
///
/// None of these are fatal to the loop: the [`Clock`](clock::Clock) degrades a
/// failed reading to a zero-elapsed sample, and the
/// [`UtilizationSampler`](sampler::UtilizationSampler) disables itself when
/// its query cannot be acquired.
#[derive(Debug, thiserror::Error)]
pub enum TimingError {
    /// The time source could not be queried.
    #[error("time source '{backend}' unavailable: {details}")]
    ClockUnavailable {
        backend: &'static str,
        details: String,
    },

    /// The time source produced a reading earlier than the clock's
    /// reference instant.
    #[error("time source '{backend}' read {behind_ms} ms before the clock reference")]
    ReadingBeforeReference {
        backend: &'static str,
        behind_ms: f64,
    },

    /// The CPU utilization query could not be acquired.
    #[error("cpu utilization query unavailable: {details}")]
    SamplerUnavailable { details: String },

    /// A previously acquired CPU utilization query failed to produce a sample.
    #[error("cpu utilization sample failed: {details}")]
    SampleFailed { details: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::clock::{
        Clock, ManualHandle, ManualSource, MonotonicSource, SystemTimeSource, TimeSource,
    };
    pub use crate::frame::{FrameAccumulator, FrameStats};
    pub use crate::sampler::{CpuQuery, SysinfoQuery, UtilizationSampler};
    pub use crate::timestep::Timestep;
    pub use crate::TimingError;
    pub use crate::{
        DEFAULT_FRAME_TIME_MS, DEFAULT_SAMPLE_INTERVAL_MS, DEFAULT_UPDATE_HZ, MAX_DELTA_FACTOR,
    };
}
