//! Fixed-timestep accumulator and per-second frame statistics.
//!
//! Each loop iteration the runtime asks the [`FrameAccumulator`] whether an
//! update tick is due for the current tick sample. A tick is due once more
//! than one frame time has passed since the previous tick boundary. The
//! boundary then advances by exactly one frame time, not by the observed
//! delta, so late checks do not push later ticks back and the update cadence
//! stays locked to the configured rate.
//!
//! At most one tick is reported per call. If the loop falls more than one
//! frame behind, the backlog is worked off one tick per iteration rather than
//! in a burst.
//!
//! Independently, once per second the frame and update counters are
//! snapshotted into [`FrameStats`] and reset.

use serde::{Deserialize, Serialize};

use crate::DEFAULT_FRAME_TIME_MS;

// ---------------------------------------------------------------------------
// FrameStats
// ---------------------------------------------------------------------------

/// Frame and update counts for the last complete second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStats {
    pub frames_per_second: u32,
    pub updates_per_second: u32,
}

// ---------------------------------------------------------------------------
// FrameAccumulator
// ---------------------------------------------------------------------------

/// Pacing markers and per-second aggregates for the runtime loop.
#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    frame_time_ms: f64,
    /// Tick boundaries crossed so far. The previous tick marker is computed
    /// as `ticks_elapsed * frame_time_ms` to avoid floating-point drift from
    /// repeated addition.
    ticks_elapsed: u64,
    /// Whole seconds rolled over so far.
    seconds_elapsed: u64,
    frames: u32,
    updates: u32,
    stats: FrameStats,
    total_frames: u64,
    total_updates: u64,
}

impl FrameAccumulator {
    /// An accumulator for the default 60 Hz frame time.
    pub fn new() -> Self {
        Self::with_frame_time(DEFAULT_FRAME_TIME_MS)
    }

    /// An accumulator for a custom frame time in milliseconds.
    ///
    /// # Panics
    ///
    /// Panics if `frame_time_ms` is not positive and finite.
    pub fn with_frame_time(frame_time_ms: f64) -> Self {
        assert!(
            frame_time_ms > 0.0 && frame_time_ms.is_finite(),
            "frame_time_ms must be positive and finite, got {frame_time_ms}"
        );
        Self {
            frame_time_ms,
            ticks_elapsed: 0,
            seconds_elapsed: 0,
            frames: 0,
            updates: 0,
            stats: FrameStats::default(),
            total_frames: 0,
            total_updates: 0,
        }
    }

    /// Decide whether an update tick is due at `current_ticks` (milliseconds
    /// since the clock started).
    ///
    /// When due, the tick boundary advances by one frame time and the update
    /// counters are incremented; the caller then runs exactly one update.
    pub fn poll_update(&mut self, current_ticks: f64) -> bool {
        if current_ticks - self.previous_ticks() > self.frame_time_ms {
            self.ticks_elapsed += 1;
            self.updates += 1;
            self.total_updates += 1;
            true
        } else {
            false
        }
    }

    /// Whether at least one update has run. Rendering is gated on this.
    pub fn should_render(&self) -> bool {
        self.total_updates > 0
    }

    /// Count one rendered frame.
    pub fn record_frame(&mut self) {
        self.frames += 1;
        self.total_frames += 1;
    }

    /// Roll the per-second counters if more than one second has passed since
    /// the previous boundary. Returns the fresh snapshot when a rollover
    /// happened.
    pub fn roll_second(&mut self, elapsed_seconds: f64) -> Option<FrameStats> {
        if elapsed_seconds - self.previous_seconds() > 1.0 {
            self.stats = FrameStats {
                frames_per_second: self.frames,
                updates_per_second: self.updates,
            };
            self.frames = 0;
            self.updates = 0;
            self.seconds_elapsed += 1;
            Some(self.stats)
        } else {
            None
        }
    }

    // -- accessors ----------------------------------------------------------

    /// The tick boundary of the most recent update, in milliseconds.
    pub fn previous_ticks(&self) -> f64 {
        self.ticks_elapsed as f64 * self.frame_time_ms
    }

    /// The most recent one-second boundary, in seconds.
    pub fn previous_seconds(&self) -> f64 {
        self.seconds_elapsed as f64
    }

    /// Frames rendered since the last rollover.
    pub fn frames_this_second(&self) -> u32 {
        self.frames
    }

    /// Updates run since the last rollover.
    pub fn updates_this_second(&self) -> u32 {
        self.updates
    }

    /// Snapshot from the last rollover.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn total_updates(&self) -> u64 {
        self.total_updates
    }

    pub fn frame_time_ms(&self) -> f64 {
        self.frame_time_ms
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Drive the accumulator the way the runtime loop does for one iteration.
    fn iterate(acc: &mut FrameAccumulator, t_ms: f64) -> (bool, bool) {
        let ticked = acc.poll_update(t_ms);
        let rendered = acc.should_render();
        if rendered {
            acc.record_frame();
        }
        acc.roll_second(t_ms / 1000.0);
        (ticked, rendered)
    }

    #[test]
    fn no_tick_before_one_frame_time() {
        let mut acc = FrameAccumulator::new();
        assert!(!acc.poll_update(5.0));
        assert!(!acc.poll_update(16.0));
        assert!(!acc.poll_update(DEFAULT_FRAME_TIME_MS));
        assert!(acc.poll_update(17.0));
        assert_eq!(acc.total_updates(), 1);
    }

    #[test]
    fn boundary_advances_by_frame_time_not_delta() {
        let mut acc = FrameAccumulator::new();
        assert!(acc.poll_update(30.0));
        assert!((acc.previous_ticks() - DEFAULT_FRAME_TIME_MS).abs() < 1e-12);

        // 30 - 16.67 = 13.33 is not more than a frame: no tick.
        assert!(!acc.poll_update(30.0));
        assert!(acc.poll_update(34.0));
        assert!((acc.previous_ticks() - 2.0 * DEFAULT_FRAME_TIME_MS).abs() < 1e-12);
    }

    #[test]
    fn one_tick_per_poll_even_when_far_behind() {
        let mut acc = FrameAccumulator::new();
        // 10 frames late: only one tick per call, the backlog drains over
        // subsequent calls.
        assert!(acc.poll_update(170.0));
        assert_eq!(acc.total_updates(), 1);

        let mut extra = 0;
        while acc.poll_update(170.0) {
            extra += 1;
        }
        assert_eq!(extra, 9);
    }

    #[test]
    fn render_is_gated_on_first_update() {
        let mut acc = FrameAccumulator::new();
        let (ticked, rendered) = iterate(&mut acc, 5.0);
        assert!(!ticked);
        assert!(!rendered);
        assert_eq!(acc.total_frames(), 0);

        let (ticked, rendered) = iterate(&mut acc, 20.0);
        assert!(ticked);
        assert!(rendered);

        // Renders continue on iterations without an update.
        let (ticked, rendered) = iterate(&mut acc, 25.0);
        assert!(!ticked);
        assert!(rendered);
        assert_eq!(acc.total_frames(), 2);
    }

    #[test]
    fn five_ms_steps_lock_to_fixed_cadence_without_drift() {
        let mut acc = FrameAccumulator::new();
        let mut t = 0.0_f64;
        let mut ticks = 0u64;

        while ticks < 1000 {
            t += 5.0;
            let boundary = acc.previous_ticks();
            let due = t - boundary > DEFAULT_FRAME_TIME_MS;
            let fired = acc.poll_update(t);
            assert_eq!(fired, due, "tick decision mismatch at t={t}");
            if fired {
                ticks += 1;
                let advanced = acc.previous_ticks() - boundary;
                assert!((advanced - DEFAULT_FRAME_TIME_MS).abs() < 1e-9);
            }
        }

        let expected = 1000.0 * DEFAULT_FRAME_TIME_MS;
        assert!((acc.previous_ticks() - expected).abs() < 1e-9);
        let lag = t - acc.previous_ticks();
        assert!(lag > 0.0 && lag <= DEFAULT_FRAME_TIME_MS + 5.0, "lag {lag}");
    }

    #[test]
    fn per_second_rollover_snapshots_and_resets() {
        let mut acc = FrameAccumulator::new();
        let mut frames = 0u32;
        let mut updates = 0u32;
        let mut t = 0.0_f64;

        loop {
            t += 5.0;
            if acc.poll_update(t) {
                updates += 1;
            }
            if acc.should_render() {
                acc.record_frame();
                frames += 1;
            }
            if let Some(stats) = acc.roll_second(t / 1000.0) {
                assert_eq!(stats.frames_per_second, frames);
                assert_eq!(stats.updates_per_second, updates);
                break;
            }
            assert!(t < 2000.0, "rollover never happened");
        }

        // Exactly 1.0 s does not roll; the first sample past it does.
        assert!((t - 1005.0).abs() < 1e-9);
        assert_eq!(acc.stats().updates_per_second, 60);
        assert_eq!(acc.frames_this_second(), 0);
        assert_eq!(acc.updates_this_second(), 0);
        assert_eq!(acc.previous_seconds(), 1.0);
    }

    #[test]
    fn no_rollover_within_the_second() {
        let mut acc = FrameAccumulator::new();
        assert!(acc.roll_second(0.5).is_none());
        assert!(acc.roll_second(1.0).is_none());
        assert!(acc.roll_second(1.01).is_some());
        assert!(acc.roll_second(1.5).is_none());
        assert!(acc.roll_second(2.02).is_some());
    }

    #[test]
    fn stats_serialize_to_json() {
        let stats = FrameStats {
            frames_per_second: 200,
            updates_per_second: 60,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["frames_per_second"], 200);
        assert_eq!(json["updates_per_second"], 60);
    }

    proptest! {
        #[test]
        fn boundary_never_runs_ahead_of_time(
            steps in prop::collection::vec(1u32..50, 1..500)
        ) {
            let mut acc = FrameAccumulator::new();
            let mut t = 0.0_f64;
            for step in steps {
                t += f64::from(step);
                let before = acc.previous_ticks();
                if acc.poll_update(t) {
                    prop_assert!(t > before + DEFAULT_FRAME_TIME_MS);
                }
                prop_assert!(acc.previous_ticks() < t);
            }
        }
    }
}
