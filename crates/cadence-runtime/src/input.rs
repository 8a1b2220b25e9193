//! Input-polling oracle consumed by the runtime loop.
//!
//! The loop only needs two answers from the platform: has the window been
//! closed, and is a given key held. Real backends (winit, SDL, a terminal)
//! implement [`InputOracle`]; this module ships the two oracles headless runs
//! use: [`HeadlessInput`] and the replayable [`ScriptedInput`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::RuntimeError;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Keys the runtime and its states query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Enter,
    Space,
    Up,
    Down,
    Left,
    Right,
    Char(char),
}

// ---------------------------------------------------------------------------
// InputOracle
// ---------------------------------------------------------------------------

/// Platform input as seen by the runtime loop.
pub trait InputOracle {
    /// Pump platform events. Called once at the top of every inner-loop
    /// iteration.
    fn poll(&mut self) {}

    /// Whether the user asked to close the application window.
    fn is_window_closed(&self) -> bool;

    /// Whether `key` is currently held.
    fn is_key_down(&self, key: Key) -> bool;
}

// ---------------------------------------------------------------------------
// HeadlessInput
// ---------------------------------------------------------------------------

/// Oracle with no window and no keyboard.
///
/// Optionally reports a window close once a number of polls has elapsed,
/// which bounds headless runs.
#[derive(Debug, Clone, Default)]
pub struct HeadlessInput {
    polls: u64,
    close_after: Option<u64>,
}

impl HeadlessInput {
    /// Never closes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports the window closed from poll number `polls` onwards.
    pub fn closing_after(polls: u64) -> Self {
        Self {
            polls: 0,
            close_after: Some(polls),
        }
    }

    /// Number of polls so far.
    pub fn polls(&self) -> u64 {
        self.polls
    }
}

impl InputOracle for HeadlessInput {
    fn poll(&mut self) {
        self.polls += 1;
    }

    fn is_window_closed(&self) -> bool {
        self.close_after.is_some_and(|limit| self.polls >= limit)
    }

    fn is_key_down(&self, _key: Key) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// ScriptedInput
// ---------------------------------------------------------------------------

/// Input observed during one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFrame {
    #[serde(default)]
    pub window_closed: bool,
    #[serde(default)]
    pub keys_down: Vec<Key>,
}

impl InputFrame {
    pub fn closed() -> Self {
        Self {
            window_closed: true,
            keys_down: Vec::new(),
        }
    }

    pub fn keys(keys: &[Key]) -> Self {
        Self {
            window_closed: false,
            keys_down: keys.to_vec(),
        }
    }
}

/// Replays a recorded sequence of [`InputFrame`]s, one per poll.
///
/// Before the first poll nothing is pressed. Once the script runs out, the
/// last frame is held.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    frames: Vec<InputFrame>,
    cursor: Option<usize>,
}

impl ScriptedInput {
    pub fn new(frames: Vec<InputFrame>) -> Self {
        Self {
            frames,
            cursor: None,
        }
    }

    /// Idle frames followed by a window close on poll number `poll`
    /// (1-based).
    ///
    /// # Panics
    ///
    /// Panics if `poll` is zero.
    pub fn closing_on_poll(poll: usize) -> Self {
        assert!(poll > 0, "polls are numbered from 1");
        let mut frames = vec![InputFrame::default(); poll - 1];
        frames.push(InputFrame::closed());
        Self::new(frames)
    }

    /// Parse a JSON array of input frames.
    pub fn from_json_str(json: &str) -> Result<Self, RuntimeError> {
        let frames: Vec<InputFrame> = serde_json::from_str(json)?;
        Ok(Self::new(frames))
    }

    /// Load a JSON array of input frames from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Number of polls consumed so far (capped at the script length).
    pub fn position(&self) -> usize {
        self.cursor.map_or(0, |c| c + 1)
    }

    fn current(&self) -> Option<&InputFrame> {
        self.cursor.and_then(|c| self.frames.get(c))
    }
}

impl InputOracle for ScriptedInput {
    fn poll(&mut self) {
        if self.frames.is_empty() {
            return;
        }
        let last = self.frames.len() - 1;
        self.cursor = Some(self.cursor.map_or(0, |c| (c + 1).min(last)));
    }

    fn is_window_closed(&self) -> bool {
        self.current().is_some_and(|f| f.window_closed)
    }

    fn is_key_down(&self, key: Key) -> bool {
        self.current().is_some_and(|f| f.keys_down.contains(&key))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
