//! Core forwarding state machine
//!
//! Classifies each grabbed key event as single-shot hotkey use, transient
//! modifier use, or neither, and drives the gateway accordingly. Whether a
//! trigger press is a hotkey or a chord prefix cannot be known until a second
//! key arrives or the trigger is released, hence the middle state: KeyHeld
//! captures the keyboard and waits, then either folds back to Idle (single
//! shot, target keeps focus) or escalates to ActingAsModifier (chord, focus
//! and stacking are mirrored back on release).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::DiscardPolicy;
use crate::events::{EventKind, KeyEvent};
use crate::gateway::{
    GatewayError, Keycode, ModifierMask, RevertMode, WindowId, WindowingGateway,
};

use super::intake;

/// The three possible states of the forwarder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No trigger active, keyboard not captured
    Idle,
    /// Trigger pressed, keyboard captured, waiting to disambiguate
    KeyHeld,
    /// Trigger is being used as a modifier for other keys
    ActingAsModifier,
}

impl Default for State {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::KeyHeld => write!(f, "KeyHeld"),
            State::ActingAsModifier => write!(f, "ActingAsModifier"),
        }
    }
}

/// Where forwarded events are sent
#[derive(Debug, Clone, Copy)]
pub struct ForwardTarget {
    /// Window written into the event and used as the send destination
    pub window: WindowId,
    /// Subwindow written into the event; receives focus while capturing
    pub subwindow: WindowId,
}

/// The state machine that owns the gateway and the per-capture session data
pub struct StateMachine<G: WindowingGateway> {
    gateway: G,
    root: WindowId,
    target: ForwardTarget,
    discard: DiscardPolicy,
    /// Modifier bits captured at startup; the intake ritual refreshes this on
    /// every release but grabs keep the startup value
    modifier_mask: ModifierMask,
    state: State,
    /// Keycode being tracked as the hot key; Some exactly while state != Idle
    trigger_keycode: Option<Keycode>,
    saved_focus: Option<(WindowId, RevertMode)>,
    /// Pre-capture stacking order, already reversed to top-to-bottom;
    /// replaced wholesale on every entry into KeyHeld
    saved_stacking: Option<Vec<WindowId>>,
    /// Trigger press retained for replay under the modifier discard policy
    pending_trigger: Option<KeyEvent>,
    state_entered_at: Option<Instant>,
}

impl<G: WindowingGateway> StateMachine<G> {
    pub fn new(
        gateway: G,
        target: ForwardTarget,
        discard: DiscardPolicy,
        modifier_mask: ModifierMask,
    ) -> Self {
        let root = gateway.root_window();
        Self {
            gateway,
            root,
            target,
            discard,
            modifier_mask,
            state: State::Idle,
            trigger_keycode: None,
            saved_focus: None,
            saved_stacking: None,
            pending_trigger: None,
            state_entered_at: None,
        }
    }

    /// Get the current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Run until the stop flag is set or the event wait fails
    ///
    /// The flag is only observed between event waits; a blocked wait ends with
    /// process teardown, which releases all grabs server-side anyway.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), GatewayError> {
        info!(state = %self.state, "event loop started");

        while !stop.load(Ordering::SeqCst) {
            let event =
                match intake::next_event(&mut self.gateway, &mut self.modifier_mask) {
                    Ok(event) => event,
                    Err(e) => {
                        self.abort_capture();
                        return Err(e);
                    }
                };
            self.handle_event(event);
        }

        self.abort_capture();
        info!("event loop stopped");
        Ok(())
    }

    /// Feed one repeat-filtered key event through the machine
    pub fn handle_event(&mut self, event: KeyEvent) {
        match self.state {
            State::Idle => self.handle_idle(event),
            State::KeyHeld => self.handle_key_held(event),
            State::ActingAsModifier => self.handle_acting_as_modifier(event),
        }
    }

    fn handle_idle(&mut self, event: KeyEvent) {
        if !event.is_press() {
            // stray release of a grabbed key; nothing was captured for it
            return;
        }

        self.begin_capture(&event);

        match self.discard {
            DiscardPolicy::Never => self.forward(&event),
            DiscardPolicy::Modifier => {
                debug!(%event, "trigger press held back for possible replay");
                self.pending_trigger = Some(event);
            }
            DiscardPolicy::Always => {
                debug!(%event, "trigger press discarded");
            }
        }

        self.transition_to(State::KeyHeld);
    }

    fn handle_key_held(&mut self, event: KeyEvent) {
        let is_trigger = Some(event.keycode) == self.trigger_keycode;

        match event.kind {
            EventKind::Press if is_trigger => {
                // repeat of the trigger that slipped past the intake filter
                debug!(%event, "trigger repeat suppressed");
            }
            EventKind::Press => {
                self.forward(&event);
                self.transition_to(State::ActingAsModifier);
            }
            EventKind::Release if is_trigger => {
                match self.discard {
                    DiscardPolicy::Never => self.forward(&event),
                    DiscardPolicy::Modifier => {
                        if let Some(press) = self.pending_trigger.take() {
                            self.forward(&press);
                        }
                    }
                    DiscardPolicy::Always => {}
                }
                self.end_capture();
                self.clear_session();
                self.transition_to(State::Idle);
            }
            EventKind::Release => {
                // a key that was down before the trigger came up under our
                // grab; the trigger is in modifier use, but this release
                // belongs to a press we never saw
                self.transition_to(State::ActingAsModifier);
            }
        }
    }

    fn handle_acting_as_modifier(&mut self, event: KeyEvent) {
        let is_trigger = Some(event.keycode) == self.trigger_keycode;

        if event.is_release() && is_trigger {
            self.restore_session();
            self.end_capture();
            self.clear_session();
            self.transition_to(State::Idle);
        } else {
            self.forward(&event);
        }
    }

    /// Capture the keyboard and save everything that must survive the trip:
    /// stacking order before the raise, input focus before the refocus
    fn begin_capture(&mut self, event: &KeyEvent) {
        if let Err(e) = self.gateway.grab_keyboard(self.root) {
            warn!(error = %e, "keyboard grab failed");
        }
        self.trigger_keycode = Some(event.keycode);

        self.saved_stacking = match self.gateway.stacking_order(self.root) {
            Ok(mut order) => {
                // the server reports bottom-to-top; restacking wants
                // top-to-bottom
                order.reverse();
                Some(order)
            }
            Err(e) => {
                warn!(error = %e, "could not save stacking order");
                None
            }
        };

        if let Err(e) = self.gateway.raise_window(self.target.window) {
            warn!(error = %e, "could not raise target window");
        }

        self.saved_focus = match self.gateway.input_focus() {
            Ok(focus) => Some(focus),
            Err(e) => {
                warn!(error = %e, "could not save input focus");
                None
            }
        };

        if let Err(e) = self
            .gateway
            .set_input_focus(self.target.subwindow, RevertMode::None)
        {
            warn!(error = %e, "could not focus target subwindow");
        }
    }

    /// Put focus and stacking back the way they were before the capture
    fn restore_session(&mut self) {
        if let Some((window, revert)) = self.saved_focus.take() {
            if let Err(e) = self.gateway.set_input_focus(window, revert) {
                warn!(error = %e, window, "could not restore input focus");
            }
        }
        if let Some(order) = self.saved_stacking.take() {
            if let Err(e) = self.gateway.restack_windows(&order) {
                warn!(error = %e, "could not restore stacking order");
            }
        }
    }

    fn end_capture(&mut self) {
        if let Err(e) = self.gateway.ungrab_keyboard() {
            warn!(error = %e, "keyboard ungrab failed");
        }
    }

    fn clear_session(&mut self) {
        self.trigger_keycode = None;
        self.saved_focus = None;
        self.saved_stacking = None;
        self.pending_trigger = None;
    }

    /// Rewrite the event onto the target and inject it there
    fn forward(&mut self, event: &KeyEvent) {
        debug!(%event, window = self.target.window, "forwarding");
        if let Err(e) =
            self.gateway
                .send_key_event(self.target.window, self.target.subwindow, event)
        {
            warn!(error = %e, %event, "failed to forward key event");
        }
    }

    /// Release a live capture on an abnormal exit so the session is not left
    /// keyboard-starved; conservative in that it also restores from KeyHeld
    fn abort_capture(&mut self) {
        if self.state == State::Idle {
            return;
        }
        warn!(state = %self.state, "releasing capture on abnormal exit");
        self.restore_session();
        self.end_capture();
        self.clear_session();
        self.transition_to(State::Idle);
    }

    fn transition_to(&mut self, next: State) {
        let held_ms = self
            .state_entered_at
            .map(|entered| entered.elapsed().as_millis() as u64)
            .unwrap_or(0);

        info!(from = %self.state, to = %next, held_ms, "state transition");

        self.state = next;
        self.state_entered_at = (next != State::Idle).then(Instant::now);
    }
}
