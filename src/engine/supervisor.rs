// src/engine/supervisor.rs

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::device::{DeviceDelta, DeviceRegistry, DeviceRoot, Snapshot};
use crate::notifier::{Category, SharedNotifier};
use crate::session::{CancelToken, MonitorSession, SessionOptions};

/// Reconciles attached devices with running monitor sessions.
///
/// The supervisor is the only owner of the session map: sessions are started
/// on attach and stopped (joined) on detach, and every remaining session is
/// stopped before [`Supervisor::run`] returns or the supervisor is dropped.
pub struct Supervisor {
    registry: DeviceRegistry,
    known: Snapshot,
    sessions: BTreeMap<DeviceRoot, MonitorSession>,
    options: SessionOptions,
    notifier: SharedNotifier,
    poll_interval: Duration,
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("parent", &self.registry.parent())
            .field("sessions", &self.sessions.keys().collect::<Vec<_>>())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    pub fn new(
        registry: DeviceRegistry,
        options: SessionOptions,
        notifier: SharedNotifier,
        poll_interval: Duration,
    ) -> Self {
        Self {
            registry,
            known: Snapshot::new(),
            sessions: BTreeMap::new(),
            options,
            notifier,
            poll_interval,
        }
    }

    /// One reconcile step: snapshot, start sessions for new devices, stop
    /// sessions for removed ones.
    ///
    /// Returns the delta that was applied. A detached device's session has
    /// been joined by the time this returns.
    pub fn tick(&mut self) -> DeviceDelta {
        let snapshot = self.registry.snapshot();
        let delta = DeviceDelta::between(&self.known, &snapshot);

        for root in &delta.attached {
            info!(root = %root, "device attached");
            self.notifier
                .notify(Category::Device, &format!("New USB device detected: {root}"));
            self.start_session(root.clone());
        }

        for root in &delta.detached {
            info!(root = %root, "device detached");
            self.notifier
                .notify(Category::Device, &format!("USB device removed: {root}"));
            self.stop_session(root);
        }

        self.known = snapshot;
        delta
    }

    fn start_session(&mut self, root: DeviceRoot) {
        if self.sessions.contains_key(&root) {
            debug!(root = %root, "session already running");
            return;
        }

        match MonitorSession::start(root.clone(), self.options.clone(), self.notifier.clone()) {
            Ok(session) => {
                self.sessions.insert(root, session);
            }
            Err(err) => {
                error!(root = %root, error = %err, "could not start session");
                self.notifier
                    .notify(Category::Error, &format!("Cannot monitor {root}: {err}"));
            }
        }
    }

    fn stop_session(&mut self, root: &DeviceRoot) {
        if let Some(mut session) = self.sessions.remove(root) {
            session.stop();
        }
    }

    /// Tick every poll interval until `quit` is cancelled, then stop every
    /// session.
    pub fn run(&mut self, quit: &CancelToken) {
        info!(parent = ?self.registry.parent(), interval = ?self.poll_interval, "supervisor started");

        loop {
            self.tick();
            if quit.is_cancelled() || quit.sleep(self.poll_interval) {
                break;
            }
        }

        self.shutdown();
        info!("supervisor finished");
    }

    /// Stop and join every active session.
    ///
    /// The next [`Supervisor::tick`] treats every present device as newly
    /// attached.
    pub fn shutdown(&mut self) {
        let sessions = std::mem::take(&mut self.sessions);
        if !sessions.is_empty() {
            debug!(count = sessions.len(), "stopping all sessions");
        }
        for (_, mut session) in sessions {
            session.stop();
        }
        self.known.clear();
    }

    /// Roots with a session in the active set, in path order.
    pub fn active_roots(&self) -> Vec<DeviceRoot> {
        self.sessions.keys().cloned().collect()
    }

    pub fn session(&self, root: &DeviceRoot) -> Option<&MonitorSession> {
        self.sessions.get(root)
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
