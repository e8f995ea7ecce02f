// src/notifier/mod.rs

//! Notification delivery.
//!
//! Everything the monitor wants the user to see (attach/detach, session
//! start/stop, file changes, fatal session errors, process alerts) goes
//! through a [`Notifier`]. Implementations must return quickly: they are
//! called from session threads in the middle of their event loops.

pub mod console;
pub mod desktop;

use std::fmt;
use std::sync::Arc;

use crate::device::DeviceRoot;
use crate::watch::SemanticEvent;

pub use console::ConsoleNotifier;
pub use desktop::DesktopNotifier;

/// What a notification is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    /// A device was attached or detached.
    Device,
    /// A monitor session started or stopped.
    Session,
    /// A file changed on this device.
    Change(DeviceRoot),
    /// A session hit a fatal error.
    Error,
    /// A process crossed the resource thresholds.
    Process,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Device | Category::Session => f.write_str("USB"),
            Category::Change(root) => write!(f, "{root}"),
            Category::Error => f.write_str("ERROR"),
            Category::Process => f.write_str("PROCESS"),
        }
    }
}

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, category: Category, message: &str);

    /// Report a classified file change on `root`.
    fn file_event(&self, root: &DeviceRoot, event: &SemanticEvent) {
        self.notify(Category::Change(root.clone()), &event.to_string());
    }
}

pub type SharedNotifier = Arc<dyn Notifier>;

/// Delivers every notification to each inner notifier, in order.
#[derive(Default, Clone)]
pub struct FanoutNotifier {
    targets: Vec<SharedNotifier>,
}

impl fmt::Debug for FanoutNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanoutNotifier")
            .field("targets", &self.targets.len())
            .finish()
    }
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: SharedNotifier) -> Self {
        self.targets.push(target);
        self
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, category: Category, message: &str) {
        for target in &self.targets {
            target.notify(category.clone(), message);
        }
    }

    fn file_event(&self, root: &DeviceRoot, event: &SemanticEvent) {
        for target in &self.targets {
            target.file_event(root, event);
        }
    }
}
