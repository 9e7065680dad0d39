//! Key-event data model
//!
//! The gateway delivers every grabbed key press/release as a [`KeyEvent`];
//! the same type is handed back when an event is forwarded to the target
//! window, so a replayed event carries the original keycode, timestamp, and
//! modifier-bit snapshot verbatim.

use crate::gateway::{Keycode, ModifierMask, Timestamp};

/// Whether a key went down or came up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Press,
    Release,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Press => write!(f, "press"),
            EventKind::Release => write!(f, "release"),
        }
    }
}

/// One keyboard event as seen on the windowing connection
///
/// Window and subwindow are deliberately absent: the forwarder always rewrites
/// them to the configured target when sending, and never reads the originals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: EventKind,
    /// Platform keycode (X11 `detail` field)
    pub keycode: Keycode,
    /// Server timestamp in milliseconds
    pub time: Timestamp,
    /// Modifier and button bits at the time of the event
    pub state: ModifierMask,
}

impl KeyEvent {
    pub fn is_press(&self) -> bool {
        self.kind == EventKind::Press
    }

    pub fn is_release(&self) -> bool {
        self.kind == EventKind::Release
    }
}

impl std::fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} keycode={} time={}", self.kind, self.keycode, self.time)
    }
}
