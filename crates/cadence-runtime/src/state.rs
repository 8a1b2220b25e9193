//! The state capability, its activity flags, and the per-call context.
//!
//! A [`State`] is one unit of application behavior (a menu, a gameplay
//! session, a pause overlay). The runtime loop calls
//! [`update`](State::update) once per fixed tick and [`render`](State::render)
//! once per frame on whichever state is current.
//!
//! States never touch the [`StateStack`](crate::stack::StateStack) directly.
//! Each call receives a [`FrameContext`] carrying the transition capability
//! ([`Transitions`]), and requested transitions are applied by the loop
//! right after the call returns, in request order.

use cadence_timing::frame::FrameStats;
use cadence_timing::timestep::Timestep;
use serde::{Deserialize, Serialize};

use crate::input::{InputOracle, Key};

// ---------------------------------------------------------------------------
// StateFlags
// ---------------------------------------------------------------------------

/// Activity flags every state carries.
///
/// - `active`: the state receives update/render calls while current.
/// - `alive`: the state stays on the stack. A dead state is removed at the
///   next opportunity and never called again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFlags {
    active: bool,
    alive: bool,
}

impl StateFlags {
    /// Fresh flags: active and alive.
    pub fn new() -> Self {
        Self {
            active: true,
            alive: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Active and alive.
    pub fn is_running(&self) -> bool {
        self.active && self.alive
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Deactivate and mark for removal.
    pub fn kill(&mut self) {
        self.active = false;
        self.alive = false;
    }
}

impl Default for StateFlags {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// A polymorphic application state owned by the state stack.
///
/// The return values of `update` and `render` are advisory: the loop logs a
/// `false` but does not act on it.
pub trait State {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Advance the simulation by one fixed tick.
    fn update(&mut self, ctx: &mut FrameContext<'_>) -> bool;

    /// Present the current state.
    fn render(&mut self, ctx: &mut FrameContext<'_>) -> bool;

    fn flags(&self) -> &StateFlags;

    fn flags_mut(&mut self) -> &mut StateFlags;
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// A requested stack mutation.
pub enum Transition {
    /// Insert at the front; becomes the current state.
    Temporary(Box<dyn State>),
    /// Insert at the back; becomes the base state.
    Permanent(Box<dyn State>),
}

impl Transition {
    pub fn state_name(&self) -> &'static str {
        match self {
            Transition::Temporary(state) | Transition::Permanent(state) => state.name(),
        }
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (kind, state) = match self {
            Transition::Temporary(state) => ("Temporary", state),
            Transition::Permanent(state) => ("Permanent", state),
        };
        f.debug_tuple(kind).field(&state.name()).finish()
    }
}

/// Buffer of pending stack transitions, drained FIFO by the loop.
#[derive(Debug, Default)]
pub struct Transitions {
    pending: Vec<Transition>,
}

impl Transitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a base-layer transition (menu -> gameplay). The requesting
    /// state usually kills itself in the same call.
    pub fn make_permanent<S: State + 'static>(&mut self, state: S) {
        self.pending.push(Transition::Permanent(Box::new(state)));
    }

    /// Request an overlay (pause, sub-screen) above the current state.
    pub fn make_temporary<S: State + 'static>(&mut self, state: S) {
        self.pending.push(Transition::Temporary(Box::new(state)));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take all pending transitions in request order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Transition> {
        self.pending.drain(..)
    }
}

// ---------------------------------------------------------------------------
// FrameContext
// ---------------------------------------------------------------------------

/// Everything a state may read or request during one update/render call.
pub struct FrameContext<'a> {
    timestep: &'a Timestep,
    input: &'a dyn InputOracle,
    stats: FrameStats,
    cpu_percentage: f32,
    previous: Option<&'a mut StateFlags>,
    transitions: &'a mut Transitions,
}

impl<'a> FrameContext<'a> {
    /// A context with no previous state and zeroed diagnostics.
    pub fn new(
        timestep: &'a Timestep,
        input: &'a dyn InputOracle,
        transitions: &'a mut Transitions,
    ) -> Self {
        Self {
            timestep,
            input,
            stats: FrameStats::default(),
            cpu_percentage: 0.0,
            previous: None,
            transitions,
        }
    }

    /// Attach the flags of the state beneath the current one.
    pub fn with_previous(mut self, previous: Option<&'a mut StateFlags>) -> Self {
        self.previous = previous;
        self
    }

    /// Attach the latest diagnostics.
    pub fn with_diagnostics(mut self, stats: FrameStats, cpu_percentage: f32) -> Self {
        self.stats = stats;
        self.cpu_percentage = cpu_percentage;
        self
    }

    pub fn timestep(&self) -> &Timestep {
        self.timestep
    }

    /// Shorthand for `timestep().delta_factor()`.
    pub fn delta_factor(&self) -> f64 {
        self.timestep.delta_factor()
    }

    pub fn input(&self) -> &dyn InputOracle {
        self.input
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.input.is_key_down(key)
    }

    /// Frame statistics from the last one-second rollover.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn cpu_percentage(&self) -> f32 {
        self.cpu_percentage
    }

    /// Flags of the previous (base) state, if it is not the current one.
    pub fn previous(&self) -> Option<&StateFlags> {
        self.previous.as_deref()
    }

    /// Mutable flags of the previous (base) state, e.g. to reactivate it
    /// before an overlay kills itself.
    pub fn previous_mut(&mut self) -> Option<&mut StateFlags> {
        self.previous.as_deref_mut()
    }

    /// See [`Transitions::make_permanent`].
    pub fn make_permanent<S: State + 'static>(&mut self, state: S) {
        self.transitions.make_permanent(state);
    }

    /// See [`Transitions::make_temporary`].
    pub fn make_temporary<S: State + 'static>(&mut self, state: S) {
        self.transitions.make_temporary(state);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::HeadlessInput;

    struct Idle {
        flags: StateFlags,
    }

    impl State for Idle {
        fn update(&mut self, _ctx: &mut FrameContext<'_>) -> bool {
            true
        }

        fn render(&mut self, _ctx: &mut FrameContext<'_>) -> bool {
            true
        }

        fn flags(&self) -> &StateFlags {
            &self.flags
        }

        fn flags_mut(&mut self) -> &mut StateFlags {
            &mut self.flags
        }
    }

    #[test]
    fn flags_lifecycle() {
        let mut flags = StateFlags::new();
        assert!(flags.is_running());

        flags.deactivate();
        assert!(!flags.is_active());
        assert!(flags.is_alive());
        assert!(!flags.is_running());

        flags.activate();
        assert!(flags.is_running());

        flags.kill();
        assert!(!flags.is_active());
        assert!(!flags.is_alive());
    }

    #[test]
    fn default_name_is_type_name() {
        let state = Idle {
            flags: StateFlags::new(),
        };
        assert!(state.name().ends_with("Idle"));
    }

    #[test]
    fn transitions_keep_request_order() {
        let mut transitions = Transitions::new();
        transitions.make_permanent(Idle {
            flags: StateFlags::new(),
        });
        transitions.make_temporary(Idle {
            flags: StateFlags::new(),
        });
        assert_eq!(transitions.len(), 2);

        let kinds: Vec<bool> = transitions
            .drain()
            .map(|t| matches!(t, Transition::Permanent(_)))
            .collect();
        assert_eq!(kinds, vec![true, false]);
        assert!(transitions.is_empty());
    }

    #[test]
    fn context_exposes_previous_flags() {
        let timestep = Timestep::new();
        let input = HeadlessInput::new();
        let mut transitions = Transitions::new();
        let mut base = StateFlags::new();
        base.deactivate();

        {
            let mut ctx = FrameContext::new(&timestep, &input, &mut transitions)
                .with_previous(Some(&mut base));
            assert!(!ctx.previous().unwrap().is_active());
            ctx.previous_mut().unwrap().activate();
            ctx.make_temporary(Idle {
                flags: StateFlags::new(),
            });
        }

        assert!(base.is_active());
        assert_eq!(transitions.len(), 1);
    }

    #[test]
    fn context_reports_diagnostics() {
        let timestep = Timestep::new();
        let input = HeadlessInput::new();
        let mut transitions = Transitions::new();
        let stats = FrameStats {
            frames_per_second: 144,
            updates_per_second: 60,
        };
        let ctx = FrameContext::new(&timestep, &input, &mut transitions)
            .with_diagnostics(stats, 12.5);
        assert_eq!(ctx.stats(), stats);
        assert_eq!(ctx.cpu_percentage(), 12.5);
        assert_eq!(ctx.delta_factor(), 0.0);
        assert!(!ctx.is_key_down(Key::Escape));
    }
}
