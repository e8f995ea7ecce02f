// src/notifier/desktop.rs

//! Desktop notifications through `notify-send`.
//!
//! Callers only ever `try_send` into a bounded channel; a tokio task owns the
//! slow part (spawning `notify-send`) so a session thread is never held up
//! by the desktop notification daemon.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use super::{Category, Notifier};

const QUEUE_CAPACITY: usize = 64;
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
struct DesktopMessage {
    summary: String,
    body: String,
}

/// Hands notifications to `notify-send` in the background.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    tx: mpsc::Sender<DesktopMessage>,
}

impl DesktopNotifier {
    /// Spawn the delivery loop on `runtime`.
    ///
    /// The loop ends once every `DesktopNotifier` clone has been dropped.
    pub fn spawn(runtime: &Handle) -> Self {
        let (tx, mut rx) = mpsc::channel::<DesktopMessage>(QUEUE_CAPACITY);

        runtime.spawn(async move {
            debug!("desktop notification loop started");
            while let Some(msg) = rx.recv().await {
                deliver(msg).await;
            }
            debug!("desktop notification loop finished (channel closed)");
        });

        Self { tx }
    }
}

async fn deliver(msg: DesktopMessage) {
    let mut cmd = Command::new("notify-send");
    cmd.arg(&msg.summary)
        .arg(&msg.body)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(DELIVERY_TIMEOUT, cmd.status()).await {
        Ok(Ok(status)) if status.success() => {}
        Ok(Ok(status)) => {
            debug!(code = ?status.code(), "notify-send exited unsuccessfully");
        }
        Ok(Err(err)) => {
            warn!(error = %err, "could not run notify-send");
        }
        Err(_) => {
            info!(timeout = ?DELIVERY_TIMEOUT, "notify-send timed out; killed");
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, category: Category, message: &str) {
        let msg = DesktopMessage {
            summary: category.to_string(),
            body: message.to_string(),
        };

        match self.tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) => {
                warn!(summary = %msg.summary, "desktop notification queue full; dropping");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("desktop notification loop gone; dropping");
            }
        }
    }
}
