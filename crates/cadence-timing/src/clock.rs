//! Wall-clock time sources and the [`Clock`] that measures elapsed time.
//!
//! A [`Clock`] captures a reference reading on [`start`](Clock::start) and
//! reports time elapsed since then. The reading itself comes from a boxed
//! [`TimeSource`], so the high-resolution monotonic backend, the OS system
//! clock and the manually advanced clock used in headless runs are
//! interchangeable: the clock's API does not change with the backend.
//!
//! Elapsed values never decrease. When the backend fails (or jumps
//! backwards) the clock logs a warning and reports the last good sample, i.e.
//! the failed reading contributes zero elapsed time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::TimingError;

// ---------------------------------------------------------------------------
// TimeSource
// ---------------------------------------------------------------------------

/// A backend producing absolute time readings.
///
/// Readings only need to be comparable with each other; the [`Clock`]
/// subtracts its reference reading from every subsequent one.
pub trait TimeSource: Send {
    /// Short backend name used in log output.
    fn name(&self) -> &'static str;

    /// Read the current time.
    fn read(&mut self) -> Result<Duration, TimingError>;
}

/// High-resolution monotonic backend built on [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicSource {
    origin: Instant,
}

impl MonotonicSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicSource {
    fn name(&self) -> &'static str {
        "monotonic"
    }

    fn read(&mut self) -> Result<Duration, TimingError> {
        Ok(self.origin.elapsed())
    }
}

/// OS system-clock backend (time since the UNIX epoch).
///
/// Fails when the system clock is set before the epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn name(&self) -> &'static str {
        "system"
    }

    fn read(&mut self) -> Result<Duration, TimingError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| TimingError::ClockUnavailable {
                backend: self.name(),
                details: e.to_string(),
            })
    }
}

/// Externally advanced backend for headless simulation and tests.
///
/// The current reading lives behind a shared [`ManualHandle`]. An optional
/// auto-step advances the reading after every read, which turns each loop
/// iteration into a fixed slice of simulated time.
#[derive(Debug, Clone, Default)]
pub struct ManualSource {
    handle: ManualHandle,
    step_nanos: u64,
}

impl ManualSource {
    /// A manual clock reading zero that only moves when advanced.
    pub fn new() -> Self {
        Self::default()
    }

    /// A manual clock that advances by `step` after every read.
    pub fn stepping(step: Duration) -> Self {
        Self {
            handle: ManualHandle::default(),
            step_nanos: duration_to_nanos(step),
        }
    }

    /// A handle sharing this source's reading.
    pub fn handle(&self) -> ManualHandle {
        self.handle.clone()
    }
}

impl TimeSource for ManualSource {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn read(&mut self) -> Result<Duration, TimingError> {
        let nanos = self.handle.nanos.fetch_add(self.step_nanos, Ordering::SeqCst);
        Ok(Duration::from_nanos(nanos))
    }
}

/// Shared handle to a [`ManualSource`]'s reading.
#[derive(Debug, Clone, Default)]
pub struct ManualHandle {
    nanos: Arc<AtomicU64>,
}

impl ManualHandle {
    /// Move the reading forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.nanos
            .fetch_add(duration_to_nanos(delta), Ordering::SeqCst);
    }

    /// Set the reading to an absolute value.
    pub fn set(&self, now: Duration) {
        self.nanos.store(duration_to_nanos(now), Ordering::SeqCst);
    }

    /// The current reading.
    pub fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

fn duration_to_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Measures monotonic elapsed time since [`start`](Clock::start).
pub struct Clock {
    source: Box<dyn TimeSource>,
    /// Reference reading; `None` until a reading succeeds after `start`.
    reference: Option<Duration>,
    started: bool,
    /// Last elapsed value handed out.
    last: Duration,
    /// Whether the backend is currently failing (used to avoid log spam).
    degraded: bool,
}

impl Clock {
    /// Create a clock over the given backend. The clock reads zero until
    /// [`start`](Self::start) is called.
    pub fn new(source: Box<dyn TimeSource>) -> Self {
        Self {
            source,
            reference: None,
            started: false,
            last: Duration::ZERO,
            degraded: false,
        }
    }

    /// A clock over the high-resolution [`MonotonicSource`].
    pub fn monotonic() -> Self {
        Self::new(Box::new(MonotonicSource::new()))
    }

    /// Capture the reference instant. Restarting resets elapsed time to zero.
    ///
    /// If the backend fails here, the first later reading that succeeds
    /// becomes the reference.
    pub fn start(&mut self) {
        self.started = true;
        self.last = Duration::ZERO;
        self.reference = self.read_or_degrade();
        tracing::debug!(backend = self.source.name(), "clock started");
    }

    /// Whether [`start`](Self::start) has been called.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Time elapsed since the reference instant. Never decreases.
    pub fn elapsed(&mut self) -> Duration {
        if !self.started {
            return Duration::ZERO;
        }
        let Some(reading) = self.read_or_degrade() else {
            return self.last;
        };
        let reference = *self.reference.get_or_insert(reading);
        let elapsed = match since_reference(self.source.name(), reading, reference) {
            Ok(elapsed) => elapsed,
            Err(e) => {
                tracing::warn!(error = %e, "holding last sample");
                return self.last;
            }
        };
        if elapsed < self.last {
            tracing::warn!(
                backend = self.source.name(),
                last_ms = self.last.as_secs_f64() * 1000.0,
                reading_ms = elapsed.as_secs_f64() * 1000.0,
                "time source went backwards -- holding last sample"
            );
            return self.last;
        }
        self.last = elapsed;
        elapsed
    }

    /// Elapsed time in milliseconds.
    pub fn elapsed_milliseconds(&mut self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    /// Elapsed time in seconds.
    pub fn elapsed_seconds(&mut self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    fn read_or_degrade(&mut self) -> Option<Duration> {
        match self.source.read() {
            Ok(reading) => {
                if self.degraded {
                    tracing::info!(backend = self.source.name(), "time source recovered");
                    self.degraded = false;
                }
                Some(reading)
            }
            Err(e) => {
                if self.degraded {
                    tracing::trace!(error = %e, "time source still failing");
                } else {
                    tracing::warn!(
                        backend = self.source.name(),
                        error = %e,
                        "degraded timing: substituting zero-elapsed sample"
                    );
                    self.degraded = true;
                }
                None
            }
        }
    }
}

fn since_reference(
    backend: &'static str,
    reading: Duration,
    reference: Duration,
) -> Result<Duration, TimingError> {
    reading
        .checked_sub(reference)
        .ok_or_else(|| TimingError::ReadingBeforeReference {
            backend,
            behind_ms: (reference - reading).as_secs_f64() * 1000.0,
        })
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("started", &self.started)
            .field("last", &self.last)
            .field("degraded", &self.degraded)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
