//! Ownership stack of polymorphic application states.
//!
//! The front of the stack is the *current* state: the one the runtime loop
//! updates and renders. The back is the *previous* (base) state, the
//! long-lived mode underneath any overlays.
//!
//! - [`push_overlay`](StateStack::push_overlay) inserts at the front
//!   (temporary semantics: pause screens, sub-screens).
//! - [`push_permanent`](StateStack::push_permanent) inserts at the back
//!   (permanent semantics: menu -> gameplay).
//!
//! The stack is the sole owner of its states. Removing a state drops it, and
//! dropping the stack drops everything still on it.

use std::collections::VecDeque;

use crate::state::{State, Transition, Transitions};
use crate::RuntimeError;

/// Ordered, exclusively-owning sequence of states.
#[derive(Default)]
pub struct StateStack {
    states: VecDeque<Box<dyn State>>,
}

impl StateStack {
    pub fn new() -> Self {
        Self::default()
    }

    // -- insertion ----------------------------------------------------------

    /// Insert `state` at the front; it becomes the current state.
    pub fn push_overlay<S: State + 'static>(&mut self, state: S) {
        self.push_overlay_boxed(Box::new(state));
    }

    /// Insert `state` at the back; it becomes the previous (base) state.
    pub fn push_permanent<S: State + 'static>(&mut self, state: S) {
        self.push_permanent_boxed(Box::new(state));
    }

    pub fn push_overlay_boxed(&mut self, state: Box<dyn State>) {
        tracing::debug!(state = state.name(), depth = self.states.len() + 1, "push overlay");
        self.states.push_front(state);
    }

    pub fn push_permanent_boxed(&mut self, state: Box<dyn State>) {
        tracing::debug!(state = state.name(), depth = self.states.len() + 1, "push permanent");
        self.states.push_back(state);
    }

    /// Apply buffered transitions in request order. Returns how many were
    /// applied.
    pub fn apply(&mut self, transitions: &mut Transitions) -> usize {
        let mut applied = 0;
        for transition in transitions.drain() {
            match transition {
                Transition::Temporary(state) => self.push_overlay_boxed(state),
                Transition::Permanent(state) => self.push_permanent_boxed(state),
            }
            applied += 1;
        }
        applied
    }

    // -- access -------------------------------------------------------------

    /// The current (front) state.
    ///
    /// # Panics
    ///
    /// Panics with [`RuntimeError::EmptyStackAccess`] if the stack is empty.
    /// Callers check [`is_empty`](Self::is_empty) first.
    pub fn current(&self) -> &dyn State {
        self.try_current().unwrap_or_else(|e| panic!("{e}"))
    }

    /// Mutable access to the current (front) state.
    ///
    /// # Panics
    ///
    /// Panics with [`RuntimeError::EmptyStackAccess`] if the stack is empty.
    pub fn current_mut(&mut self) -> &mut (dyn State + 'static) {
        match self.states.front_mut() {
            Some(state) => &mut **state,
            None => panic!("{}", RuntimeError::EmptyStackAccess { operation: "current" }),
        }
    }

    /// The previous (back) state. With a single state this is the current one.
    ///
    /// # Panics
    ///
    /// Panics with [`RuntimeError::EmptyStackAccess`] if the stack is empty.
    pub fn previous(&self) -> &dyn State {
        self.try_previous().unwrap_or_else(|e| panic!("{e}"))
    }

    /// Mutable access to the previous (back) state.
    ///
    /// # Panics
    ///
    /// Panics with [`RuntimeError::EmptyStackAccess`] if the stack is empty.
    pub fn previous_mut(&mut self) -> &mut (dyn State + 'static) {
        match self.states.back_mut() {
            Some(state) => &mut **state,
            None => panic!("{}", RuntimeError::EmptyStackAccess { operation: "previous" }),
        }
    }

    pub fn try_current(&self) -> Result<&dyn State, RuntimeError> {
        self.states
            .front()
            .map(|state| &**state)
            .ok_or(RuntimeError::EmptyStackAccess { operation: "current" })
    }

    pub fn try_previous(&self) -> Result<&dyn State, RuntimeError> {
        self.states
            .back()
            .map(|state| &**state)
            .ok_or(RuntimeError::EmptyStackAccess { operation: "previous" })
    }

    /// The current state together with the previous one when they differ.
    ///
    /// Lets the loop hand the current state a mutable view of the base
    /// state's flags during the same call.
    pub fn split_current_mut(
        &mut self,
    ) -> Option<(&mut (dyn State + 'static), Option<&mut (dyn State + 'static)>)> {
        let (current, rest) = self.states.make_contiguous().split_first_mut()?;
        let previous = match rest.last_mut() {
            Some(state) => Some(&mut **state),
            None => None,
        };
        Some((&mut **current, previous))
    }

    // -- removal ------------------------------------------------------------

    /// Drop the current (front) state. Returns whether a state was removed.
    pub fn remove_current(&mut self) -> bool {
        match self.states.pop_front() {
            Some(state) => {
                tracing::debug!(
                    state = state.name(),
                    remaining = self.states.len(),
                    "remove current"
                );
                true
            }
            None => false,
        }
    }

    /// Drop every state.
    pub fn clear(&mut self) {
        if !self.states.is_empty() {
            tracing::debug!(count = self.states.len(), "clearing state stack");
        }
        self.states.clear();
    }

    // -- inspection ---------------------------------------------------------

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// State names from front (current) to back (previous).
    pub fn names(&self) -> Vec<&'static str> {
        self.states.iter().map(|state| state.name()).collect()
    }
}

impl std::fmt::Debug for StateStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStack")
            .field("states", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
