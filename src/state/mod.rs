//! Forwarding core: event intake and the state machine
//!
//! Three states drive everything:
//! - Idle: no trigger active, keyboard not captured
//! - KeyHeld: trigger down, keyboard captured, single-shot vs. chord unknown
//! - ActingAsModifier: trigger is chorded; mirror focus/stacking on release

mod intake;
mod machine;

pub use machine::{ForwardTarget, State, StateMachine};
