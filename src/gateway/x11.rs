//! X11 implementation of the windowing gateway
//!
//! One x11rb `RustConnection`, used from the event-loop thread only. Requests
//! are flushed as they are issued; nothing here retries or interprets server
//! errors beyond converting them into [`GatewayError`].

use std::collections::VecDeque;

use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    ConfigureWindowAux, ConnectionExt, EventMask, GrabMode, GrabStatus, InputFocus, KeyButMask,
    KeyPressEvent, ModMask, StackMode, Window, KEY_PRESS_EVENT, KEY_RELEASE_EVENT,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::CURRENT_TIME;
use xkbcommon::xkb;

use crate::events::{EventKind, KeyEvent};

use super::{GatewayError, Keycode, ModifierMask, Result, RevertMode, Timestamp, WindowId};

/// Live connection to an X server
pub struct X11Gateway {
    conn: RustConnection,
    root: Window,
    /// Events read off the wire but not yet delivered; the repeat probe drains
    /// the connection into this buffer and may remove a press from the middle
    pending: VecDeque<Event>,
}

impl X11Gateway {
    /// Connect to the ambient display (`$DISPLAY`)
    pub fn connect() -> Result<Self> {
        let display = std::env::var("DISPLAY").unwrap_or_else(|_| "<unset>".to_string());
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|source| GatewayError::Connect { display, source })?;
        let root = conn.setup().roots[screen_num].root;
        debug!(screen = screen_num, root, "connected to X server");

        Ok(Self {
            conn,
            root,
            pending: VecDeque::new(),
        })
    }

    /// Round trip to the server so every event it has already generated is
    /// readable, then move all of them into the pending buffer
    fn drain_queued_events(&mut self) -> Result<()> {
        self.conn.get_input_focus()?.reply()?;
        while let Some(event) = self.conn.poll_for_event()? {
            self.pending.push_back(event);
        }
        Ok(())
    }
}

/// Convert a wire event into the forwarder's key-event model, if it is one
fn classify(event: &Event) -> Option<KeyEvent> {
    match event {
        Event::KeyPress(e) => Some(KeyEvent {
            kind: EventKind::Press,
            keycode: e.detail,
            time: e.time,
            state: e.state.into(),
        }),
        Event::KeyRelease(e) => Some(KeyEvent {
            kind: EventKind::Release,
            keycode: e.detail,
            time: e.time,
            state: e.state.into(),
        }),
        _ => None,
    }
}

fn revert_from_x11(revert: InputFocus) -> RevertMode {
    if revert == InputFocus::POINTER_ROOT {
        RevertMode::PointerRoot
    } else if revert == InputFocus::PARENT {
        RevertMode::Parent
    } else {
        RevertMode::None
    }
}

fn revert_to_x11(revert: RevertMode) -> InputFocus {
    match revert {
        RevertMode::None => InputFocus::NONE,
        RevertMode::PointerRoot => InputFocus::POINTER_ROOT,
        RevertMode::Parent => InputFocus::PARENT,
    }
}

/// Every keycode whose keysym column contains `keysym`
///
/// `keysyms` is the flat array from a GetKeyboardMapping reply: `per` syms for
/// keycode `min`, then `per` syms for `min + 1`, and so on.
fn keycodes_for_keysym(keysyms: &[u32], per: u8, min: Keycode, keysym: u32) -> Vec<Keycode> {
    keysyms
        .chunks(per as usize)
        .enumerate()
        .filter(|(_, syms)| syms.contains(&keysym))
        .map(|(i, _)| min + i as Keycode)
        .collect()
}

impl super::WindowingGateway for X11Gateway {
    fn root_window(&self) -> WindowId {
        self.root
    }

    fn resolve_keysym(&mut self, name: &str) -> Result<Vec<Keycode>> {
        let keysym = xkb::keysym_from_name(name, xkb::KEYSYM_NO_FLAGS);
        if keysym == xkb::keysyms::KEY_NoSymbol.into() {
            return Err(GatewayError::UnknownKeysym(name.to_string()));
        }

        let (min, max) = {
            let setup = self.conn.setup();
            (setup.min_keycode, setup.max_keycode)
        };
        let mapping = self
            .conn
            .get_keyboard_mapping(min, max - min + 1)?
            .reply()?;

        Ok(keycodes_for_keysym(
            &mapping.keysyms,
            mapping.keysyms_per_keycode,
            min,
            keysym.into(),
        ))
    }

    fn grab_key(
        &mut self,
        window: WindowId,
        modifiers: ModifierMask,
        keycode: Keycode,
    ) -> Result<()> {
        self.conn.grab_key(
            false,
            window,
            ModMask::from(modifiers),
            keycode,
            GrabMode::ASYNC,
            GrabMode::ASYNC,
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn query_modifier_mask(&mut self) -> Result<ModifierMask> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;
        Ok(reply.mask.into())
    }

    fn wait_next_event(&mut self) -> Result<KeyEvent> {
        loop {
            let event = match self.pending.pop_front() {
                Some(event) => event,
                None => self.conn.wait_for_event()?,
            };
            if let Some(key_event) = classify(&event) {
                return Ok(key_event);
            }
        }
    }

    fn peek_matching_press(&mut self, keycode: Keycode, time: Timestamp) -> Result<bool> {
        self.drain_queued_events()?;

        let matched = self.pending.iter().position(|event| {
            matches!(event, Event::KeyPress(e) if e.detail == keycode && e.time == time)
        });
        if let Some(index) = matched {
            let _ = self.pending.remove(index);
            return Ok(true);
        }
        Ok(false)
    }

    fn grab_keyboard(&mut self, window: WindowId) -> Result<()> {
        let reply = self
            .conn
            .grab_keyboard(true, window, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        if reply.status != GrabStatus::SUCCESS {
            warn!(status = ?reply.status, "keyboard grab not granted");
        }
        Ok(())
    }

    fn ungrab_keyboard(&mut self) -> Result<()> {
        self.conn.ungrab_keyboard(CURRENT_TIME)?;
        self.conn.flush()?;
        Ok(())
    }

    fn stacking_order(&mut self, root: WindowId) -> Result<Vec<WindowId>> {
        let reply = self.conn.query_tree(root)?.reply()?;
        Ok(reply.children)
    }

    fn restack_windows(&mut self, windows: &[WindowId]) -> Result<()> {
        // XRestackWindows semantics: the first window keeps its position and
        // each subsequent one is stacked just below its predecessor
        for pair in windows.windows(2) {
            self.conn.configure_window(
                pair[1],
                &ConfigureWindowAux::new()
                    .sibling(pair[0])
                    .stack_mode(StackMode::BELOW),
            )?;
        }
        self.conn.flush()?;
        Ok(())
    }

    fn raise_window(&mut self, window: WindowId) -> Result<()> {
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
        self.conn.flush()?;
        Ok(())
    }

    fn input_focus(&mut self) -> Result<(WindowId, RevertMode)> {
        let reply = self.conn.get_input_focus()?.reply()?;
        Ok((reply.focus, revert_from_x11(reply.revert_to)))
    }

    fn set_input_focus(&mut self, window: WindowId, revert: RevertMode) -> Result<()> {
        self.conn
            .set_input_focus(revert_to_x11(revert), window, CURRENT_TIME)?;
        self.conn.flush()?;
        Ok(())
    }

    fn send_key_event(
        &mut self,
        window: WindowId,
        subwindow: WindowId,
        event: &KeyEvent,
    ) -> Result<()> {
        let response_type = match event.kind {
            EventKind::Press => KEY_PRESS_EVENT,
            EventKind::Release => KEY_RELEASE_EVENT,
        };
        let wire_event = KeyPressEvent {
            response_type,
            detail: event.keycode,
            sequence: 0,
            time: event.time,
            root: self.root,
            event: window,
            child: subwindow,
            root_x: 0,
            root_y: 0,
            event_x: 0,
            event_y: 0,
            state: KeyButMask::from(event.state),
            same_screen: true,
        };
        self.conn.send_event(
            true,
            window,
            EventMask::KEY_PRESS | EventMask::KEY_RELEASE,
            wire_event,
        )?;
        self.conn.flush()?;
        Ok(())
    }
}
