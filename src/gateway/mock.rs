//! Scripted, call-recording gateway for exercising the core without a server
//!
//! Tests queue the key events the "server" will deliver, configure the canned
//! stacking order / focus / repeat pairs, and assert on the ordered log of
//! calls the machine made.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::events::KeyEvent;

use super::{
    GatewayError, Keycode, ModifierMask, Result, RevertMode, Timestamp, WindowId,
    WindowingGateway,
};

/// One side-effecting (or state-reading) gateway call, as recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GrabKey {
        window: WindowId,
        modifiers: ModifierMask,
        keycode: Keycode,
    },
    GrabKeyboard(WindowId),
    UngrabKeyboard,
    QueryStacking,
    QueryFocus,
    RaiseWindow(WindowId),
    SetInputFocus {
        window: WindowId,
        revert: RevertMode,
    },
    Restack(Vec<WindowId>),
    SendKey {
        window: WindowId,
        subwindow: WindowId,
        event: KeyEvent,
    },
}

pub struct MockGateway {
    pub root: WindowId,
    /// Events delivered by `wait_next_event`, in order
    pub events: VecDeque<KeyEvent>,
    /// (keycode, timestamp) pairs for which the repeat probe reports a hit
    pub repeat_pairs: HashSet<(Keycode, Timestamp)>,
    /// Canned query-tree answer, bottom-to-top like the server reports it
    pub stacking: Vec<WindowId>,
    /// Canned focus answer
    pub focus: (WindowId, RevertMode),
    pub modifier_mask: ModifierMask,
    pub keysyms: HashMap<String, Vec<Keycode>>,
    pub calls: Vec<Call>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            root: 1,
            events: VecDeque::new(),
            repeat_pairs: HashSet::new(),
            stacking: Vec::new(),
            focus: (0, RevertMode::None),
            modifier_mask: 0,
            keysyms: HashMap::new(),
            calls: Vec::new(),
        }
    }

    /// Just the forwarded events, in order
    pub fn sent_events(&self) -> Vec<KeyEvent> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::SendKey { event, .. } => Some(*event),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| wanted(call)).count()
    }
}

impl WindowingGateway for MockGateway {
    fn root_window(&self) -> WindowId {
        self.root
    }

    fn resolve_keysym(&mut self, name: &str) -> Result<Vec<Keycode>> {
        self.keysyms
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownKeysym(name.to_string()))
    }

    fn grab_key(
        &mut self,
        window: WindowId,
        modifiers: ModifierMask,
        keycode: Keycode,
    ) -> Result<()> {
        self.calls.push(Call::GrabKey {
            window,
            modifiers,
            keycode,
        });
        Ok(())
    }

    fn query_modifier_mask(&mut self) -> Result<ModifierMask> {
        Ok(self.modifier_mask)
    }

    fn wait_next_event(&mut self) -> Result<KeyEvent> {
        Ok(self
            .events
            .pop_front()
            .expect("test consumed more events than were scripted"))
    }

    fn peek_matching_press(&mut self, keycode: Keycode, time: Timestamp) -> Result<bool> {
        Ok(self.repeat_pairs.contains(&(keycode, time)))
    }

    fn grab_keyboard(&mut self, window: WindowId) -> Result<()> {
        self.calls.push(Call::GrabKeyboard(window));
        Ok(())
    }

    fn ungrab_keyboard(&mut self) -> Result<()> {
        self.calls.push(Call::UngrabKeyboard);
        Ok(())
    }

    fn stacking_order(&mut self, _root: WindowId) -> Result<Vec<WindowId>> {
        self.calls.push(Call::QueryStacking);
        Ok(self.stacking.clone())
    }

    fn restack_windows(&mut self, windows: &[WindowId]) -> Result<()> {
        self.calls.push(Call::Restack(windows.to_vec()));
        Ok(())
    }

    fn raise_window(&mut self, window: WindowId) -> Result<()> {
        self.calls.push(Call::RaiseWindow(window));
        Ok(())
    }

    fn input_focus(&mut self) -> Result<(WindowId, RevertMode)> {
        self.calls.push(Call::QueryFocus);
        Ok(self.focus)
    }

    fn set_input_focus(&mut self, window: WindowId, revert: RevertMode) -> Result<()> {
        self.calls.push(Call::SetInputFocus { window, revert });
        Ok(())
    }

    fn send_key_event(
        &mut self,
        window: WindowId,
        subwindow: WindowId,
        event: &KeyEvent,
    ) -> Result<()> {
        self.calls.push(Call::SendKey {
            window,
            subwindow,
            event: *event,
        });
        Ok(())
    }
}
