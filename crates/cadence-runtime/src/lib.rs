//! Cadence Runtime -- fixed-timestep application loop over a stack of states.
//!
//! This crate builds on [`cadence_timing`] to provide the application driver:
//! a [`RuntimeLoop`](runtime::RuntimeLoop) that owns a
//! [`StateStack`](stack::StateStack), runs updates on a fixed 60 Hz cadence,
//! renders every iteration once the first update has happened, retires dead
//! states, and terminates when the stack drains.
//!
//! # Quick Start
//!
//! ```
//! use cadence_runtime::prelude::*;
//! use std::time::Duration;
//!
//! struct Splash {
//!     flags: StateFlags,
//!     ticks: u32,
//! }
//!
//! impl State for Splash {
//!     fn update(&mut self, _ctx: &mut FrameContext<'_>) -> bool {
//!         self.ticks += 1;
//!         if self.ticks == 3 {
//!             self.flags.kill();
//!         }
//!         true
//!     }
//!
//!     fn render(&mut self, _ctx: &mut FrameContext<'_>) -> bool {
//!         true
//!     }
//!
//!     fn flags(&self) -> &StateFlags {
//!         &self.flags
//!     }
//!
//!     fn flags_mut(&mut self) -> &mut StateFlags {
//!         &mut self.flags
//!     }
//! }
//!
//! let clock = Clock::new(Box::new(ManualSource::stepping(Duration::from_millis(5))));
//! let mut runtime = RuntimeLoop::with_parts(
//!     RuntimeConfig::default(),
//!     clock,
//!     UtilizationSampler::disabled(),
//!     HeadlessInput::new(),
//! )
//! .unwrap();
//!
//! runtime.initialize(Splash { flags: StateFlags::new(), ticks: 0 }).unwrap();
//! let summary = runtime.run().unwrap();
//! runtime.shutdown();
//!
//! assert_eq!(summary.total_updates, 3);
//! assert_eq!(runtime.phase(), LoopPhase::Terminated);
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod input;
pub mod runtime;
pub mod stack;
pub mod state;

/// Re-export the timing crate for convenience.
pub use cadence_timing;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the runtime loop and its configuration.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// `current()`/`previous()` was called with no states on the stack. This
    /// is a state-transition bug; the panicking accessors abort with it.
    #[error("EmptyStackAccess: {operation}() called on an empty state stack")]
    EmptyStackAccess { operation: &'static str },

    /// `run` was called before `initialize`.
    #[error("runtime loop not initialized")]
    NotInitialized,

    /// `initialize` was called twice.
    #[error("runtime loop already initialized")]
    AlreadyInitialized,

    /// The loop already terminated and cannot run again.
    #[error("runtime loop already terminated")]
    AlreadyTerminated,

    /// The current state is alive but inactive with nothing to run, so the
    /// loop would spin forever.
    #[error("state '{name}' is alive but inactive and nothing above it can run")]
    StalledState { name: &'static str },

    /// A configuration value is out of range.
    #[error("invalid config field '{field}': {details}")]
    InvalidConfig {
        field: &'static str,
        details: String,
    },

    /// A configuration or input script could not be parsed.
    #[error("failed to parse JSON: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A configuration or input script could not be read.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use cadence_timing::prelude::*;

    pub use crate::config::RuntimeConfig;
    pub use crate::input::{HeadlessInput, InputFrame, InputOracle, Key, ScriptedInput};
    pub use crate::runtime::{IterationOutcome, LoopPhase, RunSummary, RuntimeLoop};
    pub use crate::stack::StateStack;
    pub use crate::state::{FrameContext, State, StateFlags, Transition, Transitions};
    pub use crate::RuntimeError;
}
