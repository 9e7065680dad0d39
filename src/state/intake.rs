//! Auto-repeat filter sitting between the gateway and the state machine
//!
//! Key-repeat shows up on the wire as a Release immediately followed by a
//! Press with the same keycode and the same timestamp. On every Release we
//! settle the queue, refresh the modifier-mask snapshot, and probe for such a
//! twin Press; a hit means the pair is a repeat artifact and both halves are
//! dropped (the probe consumes the Press, we discard the Release).
//!
//! Timestamps can collide, so a genuine lightning-fast release/press pair can
//! be mis-dropped. Known limitation, kept as-is.

use tracing::debug;

use crate::events::KeyEvent;
use crate::gateway::{GatewayError, ModifierMask, WindowingGateway};

/// Next real key event, with repeat artifacts filtered out
///
/// `modifier_mask` is refreshed as part of the Release ritual; grabs are never
/// re-registered from the refreshed value.
pub fn next_event<G: WindowingGateway>(
    gateway: &mut G,
    modifier_mask: &mut ModifierMask,
) -> Result<KeyEvent, GatewayError> {
    loop {
        let event = gateway.wait_next_event()?;

        if event.is_release() {
            *modifier_mask = gateway.query_modifier_mask()?;
            if gateway.peek_matching_press(event.keycode, event.time)? {
                debug!(%event, "auto-repeat pair dropped");
                continue;
            }
        }

        return Ok(event);
    }
}
