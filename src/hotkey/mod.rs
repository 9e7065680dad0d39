//! Trigger-key registration
//!
//! Resolves the configured keysym names into keycodes and registers the
//! root-window grabs that make the forwarder see them globally.

mod triggers;

pub use triggers::TriggerSet;
