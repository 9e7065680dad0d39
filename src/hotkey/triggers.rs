//! Keysym resolution and grab registration

use tracing::{debug, warn};

use crate::gateway::{Keycode, ModifierMask, Result, WindowId, WindowingGateway};

/// One configured trigger: a keysym name and every keycode producing it
#[derive(Debug, Clone)]
pub struct TriggerKey {
    pub name: String,
    pub keycodes: Vec<Keycode>,
}

/// The ordered set of trigger keys registered at startup; immutable afterwards
#[derive(Debug, Clone)]
pub struct TriggerSet {
    keys: Vec<TriggerKey>,
}

impl TriggerSet {
    /// Resolve every configured name, failing on the first unknown keysym
    ///
    /// A keysym the server knows but has no keycode for is not fatal; it just
    /// grabs nothing, which matters on keyboards missing the key entirely.
    pub fn resolve<G: WindowingGateway>(gateway: &mut G, names: &[String]) -> Result<Self> {
        let mut keys = Vec::with_capacity(names.len());
        for name in names {
            let keycodes = gateway.resolve_keysym(name)?;
            if keycodes.is_empty() {
                warn!(keysym = %name, "keysym has no keycode on this keyboard, nothing to grab");
            } else {
                debug!(keysym = %name, ?keycodes, "resolved trigger");
            }
            keys.push(TriggerKey {
                name: name.clone(),
                keycodes,
            });
        }
        Ok(Self { keys })
    }

    /// Register a passive grab for every resolved keycode on `window`,
    /// all under the same startup-captured modifier bits
    pub fn grab_all<G: WindowingGateway>(
        &self,
        gateway: &mut G,
        window: WindowId,
        modifiers: ModifierMask,
    ) -> Result<()> {
        for key in &self.keys {
            for &keycode in &key.keycodes {
                gateway.grab_key(window, modifiers, keycode)?;
            }
        }
        Ok(())
    }

    /// Number of keycodes that will actually be grabbed
    pub fn grabbed_keycodes(&self) -> usize {
        self.keys.iter().map(|key| key.keycodes.len()).sum()
    }
}
