//! Windowing gateway: the seam between the forwarder core and X11
//!
//! Everything the state machine and intake filter need from the windowing
//! system is expressed as the [`WindowingGateway`] trait. The production
//! implementation ([`X11Gateway`]) speaks the X protocol through x11rb; tests
//! drive the core through a scripted mock instead of a live server.

mod x11;

#[cfg(test)]
pub(crate) mod mock;

pub use x11::X11Gateway;

use thiserror::Error;

use crate::events::KeyEvent;

/// X window identifier
pub type WindowId = u32;
/// Platform keycode (X11 keycodes fit in a byte)
pub type Keycode = u8;
/// Server timestamp, milliseconds
pub type Timestamp = u32;
/// Modifier/button state bits as reported by a pointer query
pub type ModifierMask = u16;

/// Where input focus reverts if the focused window disappears
///
/// Mirrors the X11 revert-to values; saved together with the focused window
/// and passed back unchanged on restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertMode {
    None,
    PointerRoot,
    Parent,
}

/// Errors raised by gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to open X display at {display}: {source}")]
    Connect {
        display: String,
        #[source]
        source: x11rb::errors::ConnectError,
    },

    #[error("no keysym named {0:?}")]
    UnknownKeysym(String),

    #[error("X connection error: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),

    #[error("X request failed: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Synchronous windowing operations consumed by the forwarder core
///
/// All methods are best-effort from the caller's point of view: the state
/// machine logs failures of side-effecting calls and carries on, so that the
/// keyboard grab is always released regardless of what the server thought of
/// an individual request.
pub trait WindowingGateway {
    /// The root window key grabs are registered on
    fn root_window(&self) -> WindowId;

    /// Resolve a keysym name to every keycode producing it, empty if the
    /// running server has no keycode for the symbol
    fn resolve_keysym(&mut self, name: &str) -> Result<Vec<Keycode>>;

    /// Register a passive grab for one keycode under the given modifier bits
    fn grab_key(&mut self, window: WindowId, modifiers: ModifierMask, keycode: Keycode)
        -> Result<()>;

    /// Current modifier/button bits from a pointer query
    fn query_modifier_mask(&mut self) -> Result<ModifierMask>;

    /// Block until the next key press or release; non-key events are skipped
    fn wait_next_event(&mut self) -> Result<KeyEvent>;

    /// Non-blocking probe: is a press with this keycode and timestamp already
    /// queued? A hit consumes the queued press (it is the ghost half of an
    /// auto-repeat pair and must not be delivered).
    fn peek_matching_press(&mut self, keycode: Keycode, time: Timestamp) -> Result<bool>;

    /// Actively capture the whole keyboard
    fn grab_keyboard(&mut self, window: WindowId) -> Result<()>;

    /// Release the active keyboard capture
    fn ungrab_keyboard(&mut self) -> Result<()>;

    /// Children of `root` in the server's bottom-to-top order
    fn stacking_order(&mut self, root: WindowId) -> Result<Vec<WindowId>>;

    /// Restack `windows`, given top-to-bottom
    fn restack_windows(&mut self, windows: &[WindowId]) -> Result<()>;

    /// Raise one window to the top of the stack
    fn raise_window(&mut self, window: WindowId) -> Result<()>;

    /// Currently focused window and its revert mode
    fn input_focus(&mut self) -> Result<(WindowId, RevertMode)>;

    /// Set input focus, with `revert` as the fallback if the window goes away
    fn set_input_focus(&mut self, window: WindowId, revert: RevertMode) -> Result<()>;

    /// Inject `event` into the target's queue as a synthetic key event, with
    /// its window/subwindow fields rewritten to `window`/`subwindow`
    fn send_key_event(
        &mut self,
        window: WindowId,
        subwindow: WindowId,
        event: &KeyEvent,
    ) -> Result<()>;
}
