// src/engine/mod.rs

//! USB monitoring engine.
//!
//! [`Supervisor`] owns the device registry and the set of running monitor
//! sessions and reconciles the two every poll tick. [`run_usb_monitor`] is
//! the blocking entry point used by the menu and the `usb` subcommand: it
//! wires the supervisor to the quit-key listener and returns once every
//! session has been stopped.

pub mod supervisor;

pub use supervisor::Supervisor;

use tracing::warn;

use crate::config::{ConfigFile, UsbSection};
use crate::device::DeviceRegistry;
use crate::errors::Result;
use crate::notifier::SharedNotifier;
use crate::session::{CancelToken, SessionOptions};
use crate::terminal::QuitListener;
use crate::watch::{IgnoreSet, TreeOptions};

impl SessionOptions {
    /// Session tunables from the `[usb]` section.
    pub fn from_config(usb: &UsbSection) -> Result<Self> {
        Ok(Self {
            event_backoff: usb.event_backoff(),
            tree: TreeOptions {
                pending_move_ttl: usb.pending_move_ttl(),
                ignore: IgnoreSet::new(&usb.ignore)?,
            },
        })
    }
}

/// Run the USB monitor until `quit` is cancelled or the user presses `q`.
///
/// Blocks the calling thread.
pub fn run_usb_monitor(cfg: &ConfigFile, notifier: SharedNotifier, quit: CancelToken) -> Result<()> {
    let options = SessionOptions::from_config(&cfg.usb)?;
    let registry = DeviceRegistry::new(&cfg.usb.media_root);

    println!(
        "Scanning USB devices in {}. Press 'q' to return to the menu.",
        cfg.usb.media_root.display()
    );

    let _listener = match QuitListener::spawn(quit.clone()) {
        Ok(listener) => Some(listener),
        Err(err) => {
            warn!(error = %err, "quit listener unavailable; use Ctrl+C to stop");
            None
        }
    };

    let mut supervisor = Supervisor::new(registry, options, notifier, cfg.usb.poll_interval());
    supervisor.run(&quit);

    Ok(())
}
