//! The top-level runtime loop.
//!
//! [`RuntimeLoop`] owns the [`StateStack`], the [`Clock`], the [`Timestep`],
//! the [`FrameAccumulator`] and the [`UtilizationSampler`], and drives them
//! through three phases:
//!
//! 1. **Init** -- [`initialize`](RuntimeLoop::initialize) pushes the bootstrap
//!    state as an overlay and starts the clock and the sampler.
//! 2. **Running** -- [`run`](RuntimeLoop::run) loops while the stack is not
//!    empty. The inner loop iterates while the current state is active: poll
//!    input, run at most one fixed update tick, render, roll per-second
//!    statistics, tick the sampler. When the inner loop exits, a dead current
//!    state is removed.
//! 3. **Terminating** -- once the stack drains the sampler is stopped and
//!    control returns to the caller, which shuts down its own subsystems and
//!    then calls [`shutdown`](RuntimeLoop::shutdown).
//!
//! A window close (or Escape, when enabled) kills both the current and the
//! previous state. The loop observes this at its next inner-loop check and
//! unwinds, so the stack drains within two outer iterations.
//!
//! Everything runs on one thread. State calls run to completion before the
//! next one starts, and stack transitions requested during a call are applied
//! right after it returns.

use cadence_timing::clock::Clock;
use cadence_timing::frame::{FrameAccumulator, FrameStats};
use cadence_timing::sampler::UtilizationSampler;
use cadence_timing::timestep::Timestep;
use serde::{Deserialize, Serialize};

use crate::config::RuntimeConfig;
use crate::input::{InputOracle, Key};
use crate::stack::StateStack;
use crate::state::{FrameContext, State, Transitions};
use crate::RuntimeError;

// ---------------------------------------------------------------------------
// LoopPhase
// ---------------------------------------------------------------------------

/// Lifecycle phase of the runtime loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopPhase {
    /// Constructed; no bootstrap state yet.
    Init,
    /// Bootstrap state pushed, clock and sampler started.
    Running,
    /// Stack drained, sampler stopped; waiting for `shutdown`.
    Terminating,
    /// Shut down.
    Terminated,
}

// ---------------------------------------------------------------------------
// IterationOutcome / RunSummary
// ---------------------------------------------------------------------------

/// What a single inner-loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// A close was requested; current and previous states were killed.
    Closed,
    /// The iteration ran normally.
    Continued { updated: bool, rendered: bool },
}

/// Totals reported by [`RuntimeLoop::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub outer_iterations: u64,
    pub inner_iterations: u64,
    pub total_updates: u64,
    pub total_frames: u64,
    /// Statistics from the last one-second rollover.
    pub last_stats: FrameStats,
    /// Last sampled CPU utilization before the sampler was stopped.
    pub cpu_percentage: f32,
    /// Clock time at termination, in milliseconds.
    pub elapsed_ms: f64,
}

#[derive(Clone, Copy)]
enum Pass {
    Update,
    Render,
}

// ---------------------------------------------------------------------------
// RuntimeLoop
// ---------------------------------------------------------------------------

/// Fixed-timestep driver over a stack of states.
pub struct RuntimeLoop<I: InputOracle> {
    config: RuntimeConfig,
    stack: StateStack,
    transitions: Transitions,
    clock: Clock,
    timestep: Timestep,
    frames: FrameAccumulator,
    sampler: UtilizationSampler,
    input: I,
    phase: LoopPhase,
    outer_iterations: u64,
    inner_iterations: u64,
}

impl<I: InputOracle> RuntimeLoop<I> {
    /// A loop over the monotonic clock and the platform CPU sampler (disabled
    /// when `config.cpu_sampling` is false).
    pub fn new(config: RuntimeConfig, input: I) -> Result<Self, RuntimeError> {
        config.validate()?;
        let sampler = if config.cpu_sampling {
            UtilizationSampler::new().with_interval(config.sample_interval_ms)
        } else {
            UtilizationSampler::disabled()
        };
        Self::with_parts(config, Clock::monotonic(), sampler, input)
    }

    /// A loop over explicitly supplied parts.
    pub fn with_parts(
        config: RuntimeConfig,
        clock: Clock,
        sampler: UtilizationSampler,
        input: I,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let frame_time_ms = config.frame_time_ms();
        Ok(Self {
            timestep: Timestep::with_frame_time(frame_time_ms, config.max_delta_factor),
            frames: FrameAccumulator::with_frame_time(frame_time_ms),
            config,
            stack: StateStack::new(),
            transitions: Transitions::new(),
            clock,
            sampler,
            input,
            phase: LoopPhase::Init,
            outer_iterations: 0,
            inner_iterations: 0,
        })
    }

    /// Push the bootstrap state as an overlay, start the clock and the
    /// sampler, and enter the Running phase.
    pub fn initialize<S: State + 'static>(&mut self, bootstrap: S) -> Result<(), RuntimeError> {
        match self.phase {
            LoopPhase::Init => {}
            LoopPhase::Running => return Err(RuntimeError::AlreadyInitialized),
            LoopPhase::Terminating | LoopPhase::Terminated => {
                return Err(RuntimeError::AlreadyTerminated)
            }
        }
        self.stack.push_overlay(bootstrap);
        self.clock.start();
        self.sampler.start(0.0);
        self.phase = LoopPhase::Running;
        tracing::info!(
            bootstrap = self.stack.current().name(),
            update_hz = self.config.update_hz,
            cpu_sampling = self.sampler.is_enabled(),
            "runtime loop initialized"
        );
        Ok(())
    }

    /// Run until the state stack drains, then enter the Terminating phase.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::NotInitialized`] before [`initialize`](Self::initialize).
    /// - [`RuntimeError::AlreadyTerminated`] after the loop terminated.
    /// - [`RuntimeError::StalledState`] if the current state is alive but
    ///   inactive, which would otherwise spin forever.
    pub fn run(&mut self) -> Result<RunSummary, RuntimeError> {
        match self.phase {
            LoopPhase::Running => {}
            LoopPhase::Init => return Err(RuntimeError::NotInitialized),
            LoopPhase::Terminating | LoopPhase::Terminated => {
                return Err(RuntimeError::AlreadyTerminated)
            }
        }

        while !self.stack.is_empty() {
            self.outer_iterations += 1;

            while self.stack.current().flags().is_running() {
                if let IterationOutcome::Closed = self.iterate() {
                    break;
                }
            }

            let current = self.stack.current();
            if !current.flags().is_alive() {
                self.stack.remove_current();
            } else if !current.flags().is_active() {
                let name = current.name();
                tracing::error!(state = name, "current state inactive but alive -- stalled");
                return Err(RuntimeError::StalledState { name });
            }

            if self.stack.is_empty() {
                self.stack.clear();
            }
        }

        Ok(self.terminate())
    }

    /// Run one inner-loop iteration against the current state.
    ///
    /// A current state that is not running (inactive or dead) is neither
    /// updated nor rendered, and no update tick is consumed for it.
    ///
    /// # Panics
    ///
    /// Panics with [`RuntimeError::EmptyStackAccess`] if the stack is empty.
    pub fn iterate(&mut self) -> IterationOutcome {
        if self.stack.is_empty() {
            panic!("{}", RuntimeError::EmptyStackAccess { operation: "current" });
        }
        self.inner_iterations += 1;
        self.input.poll();

        if self.close_requested() {
            self.close_current_and_previous();
            return IterationOutcome::Closed;
        }

        let now_ms = self.clock.elapsed_milliseconds();

        let updated =
            self.stack.current().flags().is_running() && self.frames.poll_update(now_ms);
        if updated {
            self.timestep.update(now_ms);
            self.dispatch(Pass::Update);
        }

        let rendered = self.frames.should_render() && self.stack.current().flags().is_running();
        if rendered {
            self.dispatch(Pass::Render);
            self.frames.record_frame();
        }

        if let Some(stats) = self.frames.roll_second(now_ms / 1000.0) {
            tracing::debug!(
                fps = stats.frames_per_second,
                ups = stats.updates_per_second,
                cpu = self.sampler.percentage(),
                "frame stats"
            );
        }

        self.sampler.update(now_ms);

        tracing::trace!(now_ms, updated, rendered, "iteration");
        IterationOutcome::Continued { updated, rendered }
    }

    /// Release everything the loop still owns and enter the Terminated
    /// phase. Safe to call from any phase and more than once.
    pub fn shutdown(&mut self) {
        if self.phase == LoopPhase::Terminated {
            return;
        }
        self.sampler.stop();
        self.stack.clear();
        self.phase = LoopPhase::Terminated;
        tracing::info!("runtime loop shut down");
    }

    fn close_requested(&self) -> bool {
        if self.input.is_window_closed() {
            tracing::info!("window closed");
            return true;
        }
        if self.config.escape_closes && self.input.is_key_down(Key::Escape) {
            tracing::info!("escape pressed");
            return true;
        }
        if let Some(cap) = self.config.max_iterations {
            if self.inner_iterations >= cap {
                tracing::warn!(cap, "iteration cap reached");
                return true;
            }
        }
        false
    }

    fn close_current_and_previous(&mut self) {
        if let Some((current, previous)) = self.stack.split_current_mut() {
            current.flags_mut().kill();
            if let Some(previous) = previous {
                previous.flags_mut().kill();
            }
        }
        tracing::debug!(states = ?self.stack.names(), "current and previous states killed");
    }

    /// Call update or render on the current state, then apply any
    /// transitions it requested.
    fn dispatch(&mut self, pass: Pass) -> bool {
        let stats = self.frames.stats();
        let cpu = self.sampler.percentage();

        let (current, previous) = match self.stack.split_current_mut() {
            Some(split) => split,
            None => panic!("{}", RuntimeError::EmptyStackAccess { operation: "current" }),
        };
        let name = current.name();
        let mut ctx = FrameContext::new(&self.timestep, &self.input, &mut self.transitions)
            .with_previous(previous.map(|state| state.flags_mut()))
            .with_diagnostics(stats, cpu);

        let ok = match pass {
            Pass::Update => current.update(&mut ctx),
            Pass::Render => current.render(&mut ctx),
        };
        if !ok {
            tracing::trace!(state = name, "state call returned false");
        }

        let applied = self.stack.apply(&mut self.transitions);
        if applied > 0 {
            tracing::info!(
                from = name,
                to = self.stack.current().name(),
                depth = self.stack.len(),
                "state transition"
            );
        }
        ok
    }

    fn terminate(&mut self) -> RunSummary {
        self.phase = LoopPhase::Terminating;
        let summary = RunSummary {
            outer_iterations: self.outer_iterations,
            inner_iterations: self.inner_iterations,
            total_updates: self.frames.total_updates(),
            total_frames: self.frames.total_frames(),
            last_stats: self.frames.stats(),
            cpu_percentage: self.sampler.percentage(),
            elapsed_ms: self.clock.elapsed_milliseconds(),
        };
        self.sampler.stop();
        tracing::info!(
            updates = summary.total_updates,
            frames = summary.total_frames,
            elapsed_ms = summary.elapsed_ms,
            "state stack drained -- terminating"
        );
        summary
    }

    // -- accessors ----------------------------------------------------------

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn stack(&self) -> &StateStack {
        &self.stack
    }

    /// Mutable stack access, e.g. to seed a permanent base state before the
    /// first `run`.
    pub fn stack_mut(&mut self) -> &mut StateStack {
        &mut self.stack
    }

    pub fn timestep(&self) -> &Timestep {
        &self.timestep
    }

    pub fn frames(&self) -> &FrameAccumulator {
        &self.frames
    }

    /// Statistics from the last one-second rollover.
    pub fn frame_stats(&self) -> FrameStats {
        self.frames.stats()
    }

    pub fn sampler(&self) -> &UtilizationSampler {
        &self.sampler
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn inner_iterations(&self) -> u64 {
        self.inner_iterations
    }

    pub fn outer_iterations(&self) -> u64 {
        self.outer_iterations
    }
}

impl<I: InputOracle> std::fmt::Debug for RuntimeLoop<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeLoop")
            .field("phase", &self.phase)
            .field("stack", &self.stack)
            .field("timestep", &self.timestep)
            .field("frames", &self.frames)
            .field("sampler", &self.sampler)
            .field("inner_iterations", &self.inner_iterations)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
