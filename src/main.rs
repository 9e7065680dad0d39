//! xkeyfwd: global X11 hotkey forwarder
//!
//! Grabs the configured keysyms on the root window and, when one is pressed,
//! redirects keyboard input to a target window/subwindow:
//! - pressed and released alone: the hotkey is forwarded as a single
//!   keystroke and the target keeps focus
//! - held while other keys are struck: the trigger acts as a transient
//!   modifier; the chorded keys are forwarded, and focus and stacking are
//!   restored when the trigger is released
//!
//! The process runs silently until terminated; raise `RUST_LOG` to watch it.

mod config;
mod events;
mod gateway;
mod hotkey;
mod lifecycle;
mod state;

use std::process::exit;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Args;
use crate::gateway::{WindowingGateway, X11Gateway};
use crate::hotkey::TriggerSet;
use crate::lifecycle::ShutdownSignal;
use crate::state::{ForwardTarget, StateMachine};

#[tokio::main]
async fn main() -> Result<()> {
    // usage problems: clap's message on stderr, exit code 1
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            use clap::error::ErrorKind;
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                e.exit();
            }
            let _ = e.print();
            exit(1);
        }
    };

    // Silent on a healthy run: default filter is warn, output on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "xkeyfwd starting");

    let mut gateway = match X11Gateway::connect() {
        Ok(gateway) => gateway,
        Err(e) => {
            eprintln!("xkeyfwd: {e}, is $DISPLAY set?");
            exit(1);
        }
    };
    let root = gateway.root_window();

    // One pointer query fixes the modifier bits used for every grab; runtime
    // modifier changes (NumLock and friends) are knowingly not tracked.
    let modifier_mask = gateway.query_modifier_mask()?;

    let triggers = match TriggerSet::resolve(&mut gateway, &args.keysyms) {
        Ok(triggers) => triggers,
        Err(e) => {
            eprintln!("xkeyfwd: {e}");
            exit(1);
        }
    };
    triggers.grab_all(&mut gateway, root, modifier_mask)?;
    info!(
        keycodes = triggers.grabbed_keycodes(),
        mask = modifier_mask,
        window = args.window,
        subwindow = args.subwindow,
        "triggers registered"
    );

    let mut machine = StateMachine::new(
        gateway,
        ForwardTarget {
            window: args.window,
            subwindow: args.subwindow,
        },
        args.discard,
        modifier_mask,
    );

    let shutdown = ShutdownSignal::new();
    let stop = shutdown.stop_flag();

    // The event loop blocks in the X event wait, so it gets its own thread;
    // main only waits for it to die or for a signal.
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    std::thread::Builder::new()
        .name("x11-events".to_string())
        .spawn(move || {
            let _ = done_tx.send(machine.run(&stop));
        })?;

    tokio::select! {
        result = done_rx => {
            if let Ok(Err(e)) = result {
                error!(error = %e, "event loop failed");
                return Err(e.into());
            }
            info!("event loop exited");
        }
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Grabs die with the connection when the process exits; the loop thread
    // may still be parked in the event wait and is torn down with us.
    info!("xkeyfwd stopped");
    Ok(())
}
