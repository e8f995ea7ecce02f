// src/session/monitor.rs

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::device::DeviceRoot;
use crate::errors::Result;
use crate::notifier::{Category, SharedNotifier};
use crate::session::CancelToken;
use crate::watch::{TreeOptions, WatchTree};

/// Lifecycle of a session. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Watching,
    Stopping,
    Stopped,
}

impl SessionState {
    fn as_u8(self) -> u8 {
        match self {
            SessionState::Starting => 0,
            SessionState::Watching => 1,
            SessionState::Stopping => 2,
            SessionState::Stopped => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => SessionState::Starting,
            1 => SessionState::Watching,
            2 => SessionState::Stopping,
            _ => SessionState::Stopped,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn set(&self, state: SessionState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Sleep after a poll that returned nothing.
    pub event_backoff: Duration,
    pub tree: TreeOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            event_backoff: Duration::from_millis(100),
            tree: TreeOptions {
                pending_move_ttl: Duration::from_secs(2),
                ..TreeOptions::default()
            },
        }
    }
}

/// What a finished session thread hands back on join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Number of watches released during teardown.
    pub released_watches: usize,
    /// Set when the session ended because of a fatal error.
    pub error: Option<String>,
}

/// One device root watched end-to-end on a dedicated thread.
pub struct MonitorSession {
    root: DeviceRoot,
    stop: CancelToken,
    state: SharedState,
    handle: Option<JoinHandle<SessionReport>>,
    report: Option<SessionReport>,
}

impl fmt::Debug for MonitorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorSession")
            .field("root", &self.root)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

impl MonitorSession {
    /// Spawn the session thread for `root`.
    ///
    /// Only fails if the OS refuses to create a thread; channel and watch
    /// failures happen on the session thread and are reported through the
    /// notifier.
    pub fn start(
        root: DeviceRoot,
        options: SessionOptions,
        notifier: SharedNotifier,
    ) -> Result<Self> {
        let stop = CancelToken::new();
        let state = SharedState::default();

        let handle = {
            let root = root.clone();
            let stop = stop.clone();
            let state = state.clone();
            thread::Builder::new()
                .name(format!("session:{}", root.name()))
                .spawn(move || run_session(root, options, notifier, stop, state))?
        };

        debug!(root = %root, "session thread spawned");

        Ok(Self {
            root,
            stop,
            state,
            handle: Some(handle),
            report: None,
        })
    }

    pub fn root(&self) -> &DeviceRoot {
        &self.root
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// True while the session thread is alive and has not been asked to
    /// stop.
    pub fn is_running(&self) -> bool {
        !self.stop.is_cancelled()
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Teardown summary, available once [`MonitorSession::stop`] returned.
    pub fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    /// Ask the thread to finish and wait for it.
    ///
    /// When this returns, every watch the session created has been released
    /// and its channel closed. Calling it again is a no-op.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.stop.cancel();
        match handle.join() {
            Ok(report) => {
                debug!(root = %self.root, ?report, "session thread joined");
                self.report = Some(report);
            }
            Err(_) => {
                error!(root = %self.root, "session thread panicked");
                self.state.set(SessionState::Stopped);
                self.report = Some(SessionReport {
                    released_watches: 0,
                    error: Some("session thread panicked".to_string()),
                });
            }
        }
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_session(
    root: DeviceRoot,
    options: SessionOptions,
    notifier: SharedNotifier,
    stop: CancelToken,
    state: SharedState,
) -> SessionReport {
    let mut tree = match WatchTree::open(&root, &options.tree) {
        Ok(tree) => tree,
        Err(err) => {
            error!(root = %root, error = %err, "session could not start");
            notifier.notify(
                Category::Error,
                &format!("Cannot monitor {root}: {err}"),
            );
            state.set(SessionState::Stopped);
            return SessionReport {
                released_watches: 0,
                error: Some(err.to_string()),
            };
        }
    };

    tree.register_recursive(root.path());
    info!(root = %root, watches = tree.watch_count(), "session watching");
    notifier.notify(
        Category::Session,
        &format!("Monitoring {root} in real time..."),
    );
    state.set(SessionState::Watching);

    let mut failure = None;
    while !stop.is_cancelled() {
        match tree.poll_events() {
            Ok(events) if events.is_empty() => {
                thread::sleep(options.event_backoff);
            }
            Ok(events) => {
                for event in events.iter() {
                    notifier.file_event(&root, event);
                }
            }
            Err(err) => {
                warn!(root = %root, error = %err, "session failed while reading events");
                notifier.notify(
                    Category::Error,
                    &format!("Monitoring of {root} failed: {err}"),
                );
                failure = Some(err.to_string());
                break;
            }
        }
    }

    state.set(SessionState::Stopping);
    let released_watches = tree.close();
    notifier.notify(Category::Session, &format!("Stopped monitoring {root}."));
    state.set(SessionState::Stopped);

    SessionReport {
        released_watches,
        error: failure,
    }
}
