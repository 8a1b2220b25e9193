//! Host CPU utilization sampling on a fixed cadence.
//!
//! The [`UtilizationSampler`] owns a platform [`CpuQuery`] between
//! [`start`](UtilizationSampler::start) and [`stop`](UtilizationSampler::stop).
//! [`update`](UtilizationSampler::update) is cheap to call every loop
//! iteration: it only queries the platform once the sampling interval has
//! elapsed on the loop's own tick counter, and is a no-op otherwise.
//!
//! If the query cannot be acquired the sampler disables itself for good and
//! reports 0% from then on. It never retries and never fails the loop.

use sysinfo::System;

use crate::{TimingError, DEFAULT_SAMPLE_INTERVAL_MS};

// ---------------------------------------------------------------------------
// CpuQuery
// ---------------------------------------------------------------------------

/// An acquired platform query producing CPU utilization percentages.
pub trait CpuQuery: Send {
    /// Sample current utilization in percent (0-100).
    fn sample(&mut self) -> Result<f32, TimingError>;
}

/// [`CpuQuery`] backed by `sysinfo`'s global CPU usage.
pub struct SysinfoQuery {
    system: System,
}

impl SysinfoQuery {
    /// Acquire the query. Fails on platforms `sysinfo` does not support.
    pub fn acquire() -> Result<Self, TimingError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(TimingError::SamplerUnavailable {
                details: format!("sysinfo does not support {}", std::env::consts::OS),
            });
        }
        let mut system = System::new();
        // Usage is computed between two refreshes; prime the first one.
        system.refresh_cpu_usage();
        Ok(Self { system })
    }
}

impl CpuQuery for SysinfoQuery {
    fn sample(&mut self) -> Result<f32, TimingError> {
        self.system.refresh_cpu_usage();
        let usage = self.system.global_cpu_usage();
        if usage.is_finite() {
            Ok(usage.clamp(0.0, 100.0))
        } else {
            Err(TimingError::SampleFailed {
                details: format!("non-finite usage value {usage}"),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// UtilizationSampler
// ---------------------------------------------------------------------------

type AcquireFn = Box<dyn FnOnce() -> Result<Box<dyn CpuQuery>, TimingError> + Send>;

/// Polls CPU utilization at most once per sampling interval.
pub struct UtilizationSampler {
    /// Consumed by the first `start`; acquisition is never retried.
    acquire: Option<AcquireFn>,
    query: Option<Box<dyn CpuQuery>>,
    polling_enabled: bool,
    percentage: f32,
    last_sample_ticks: f64,
    interval_ms: f64,
    samples_taken: u64,
}

impl UtilizationSampler {
    /// A sampler over [`SysinfoQuery`] with the default one-second cadence.
    pub fn new() -> Self {
        Self::with_query(|| SysinfoQuery::acquire().map(|q| Box::new(q) as Box<dyn CpuQuery>))
    }

    /// A sampler whose query is produced by `acquire` at [`start`](Self::start).
    pub fn with_query<F>(acquire: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn CpuQuery>, TimingError> + Send + 'static,
    {
        Self {
            acquire: Some(Box::new(acquire)),
            query: None,
            polling_enabled: false,
            percentage: 0.0,
            last_sample_ticks: 0.0,
            interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            samples_taken: 0,
        }
    }

    /// A sampler that never polls and always reports 0%.
    pub fn disabled() -> Self {
        Self {
            acquire: None,
            query: None,
            polling_enabled: false,
            percentage: 0.0,
            last_sample_ticks: 0.0,
            interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            samples_taken: 0,
        }
    }

    /// Override the sampling interval.
    ///
    /// # Panics
    ///
    /// Panics if `interval_ms` is not positive and finite.
    pub fn with_interval(mut self, interval_ms: f64) -> Self {
        assert!(
            interval_ms > 0.0 && interval_ms.is_finite(),
            "interval_ms must be positive and finite, got {interval_ms}"
        );
        self.interval_ms = interval_ms;
        self
    }

    /// Acquire the platform query. `now_ticks` is the loop's current tick
    /// value in milliseconds and starts the first sampling interval.
    pub fn start(&mut self, now_ticks: f64) {
        let Some(acquire) = self.acquire.take() else {
            if !self.polling_enabled {
                tracing::debug!("cpu sampler not available -- reporting 0%");
            }
            return;
        };
        match acquire() {
            Ok(query) => {
                self.query = Some(query);
                self.polling_enabled = true;
                self.last_sample_ticks = now_ticks;
                tracing::debug!(interval_ms = self.interval_ms, "cpu sampler started");
            }
            Err(e) => {
                self.polling_enabled = false;
                tracing::warn!(error = %e, "cpu sampler unavailable -- disabling sampling");
            }
        }
    }

    /// Sample if the interval has elapsed since the last sample. Returns
    /// whether a sample was taken.
    pub fn update(&mut self, now_ticks: f64) -> bool {
        if !self.polling_enabled || now_ticks - self.last_sample_ticks < self.interval_ms {
            return false;
        }
        let Some(query) = self.query.as_mut() else {
            return false;
        };
        match query.sample() {
            Ok(percentage) => self.percentage = percentage,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    previous = self.percentage,
                    "cpu sample failed -- keeping previous value"
                );
            }
        }
        self.last_sample_ticks = now_ticks;
        self.samples_taken += 1;
        true
    }

    /// Latest sampled utilization, or 0 when sampling is disabled.
    pub fn percentage(&self) -> f32 {
        if self.polling_enabled {
            self.percentage
        } else {
            0.0
        }
    }

    /// Release the platform query. Safe to call more than once.
    pub fn stop(&mut self) {
        if self.query.take().is_some() {
            tracing::debug!(samples = self.samples_taken, "cpu sampler stopped");
        }
        self.polling_enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.polling_enabled
    }

    /// Number of samples taken since start.
    pub fn samples_taken(&self) -> u64 {
        self.samples_taken
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }
}

impl Default for UtilizationSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UtilizationSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtilizationSampler")
            .field("polling_enabled", &self.polling_enabled)
            .field("percentage", &self.percentage)
            .field("last_sample_ticks", &self.last_sample_ticks)
            .field("interval_ms", &self.interval_ms)
            .field("samples_taken", &self.samples_taken)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
