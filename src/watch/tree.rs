// src/watch/tree.rs

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use inotify::{Inotify, WatchDescriptor, WatchMask};
use tracing::{debug, info, trace, warn};

use crate::device::DeviceRoot;
use crate::errors::{GuardError, Result};
use crate::watch::classify::{RawEvent, WatchAction, WatchCore};
use crate::watch::event::SemanticEvent;
use crate::watch::ignore::IgnoreSet;

/// Size of the buffer handed to one `read(2)` on the inotify descriptor.
const EVENT_BUFFER_LEN: usize = 64 * 1024;

fn watch_mask() -> WatchMask {
    WatchMask::CREATE
        | WatchMask::DELETE
        | WatchMask::MODIFY
        | WatchMask::MOVED_FROM
        | WatchMask::MOVED_TO
        | WatchMask::ATTRIB
        | WatchMask::DELETE_SELF
        | WatchMask::MOVE_SELF
}

/// Tunables for one [`WatchTree`].
#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    pub pending_move_ttl: Duration,
    pub ignore: IgnoreSet,
}

/// Recursive inotify watch over one device root.
///
/// Owns the kernel channel and the classification core. Directories created
/// after the initial walk are picked up through their `CREATE` event, but
/// children created before that new watch is armed are not reported.
pub struct WatchTree {
    root: DeviceRoot,
    inotify: Inotify,
    core: WatchCore<WatchDescriptor>,
    buffer: Vec<u8>,
}

impl fmt::Debug for WatchTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchTree")
            .field("root", &self.root)
            .field("watches", &self.core.table().len())
            .finish_non_exhaustive()
    }
}

impl WatchTree {
    /// Open a non-blocking notification channel for `root`. No watches are
    /// registered yet; call [`WatchTree::register_recursive`].
    pub fn open(root: &DeviceRoot, options: &TreeOptions) -> Result<Self> {
        let inotify = Inotify::init().map_err(GuardError::ChannelInit)?;
        let core = WatchCore::new(
            root.path(),
            options.pending_move_ttl,
            options.ignore.clone(),
        );

        Ok(Self {
            root: root.clone(),
            inotify,
            core,
            buffer: vec![0; EVENT_BUFFER_LEN],
        })
    }

    pub fn root(&self) -> &DeviceRoot {
        &self.root
    }

    pub fn watch_count(&self) -> usize {
        self.core.table().len()
    }

    pub fn pending_move_count(&self) -> usize {
        self.core.pending_moves().len()
    }

    pub fn is_watched(&self, path: &Path) -> bool {
        self.core.table().contains_path(path)
    }

    /// Watch `path` and every directory below it, as listed right now.
    ///
    /// Failures on individual directories (permission denied, vanished
    /// mid-walk) are logged and skipped. Symlinked directories are not
    /// followed. Already-watched directories are left alone.
    pub fn register_recursive(&mut self, path: &Path) {
        let mut stack: Vec<PathBuf> = vec![path.to_path_buf()];

        while let Some(dir) = stack.pop() {
            if self.core.table().contains_path(&dir) {
                trace!(path = ?dir, "already watched");
                continue;
            }

            match self.inotify.watches().add(&dir, watch_mask()) {
                Ok(wd) => {
                    self.core.table_mut().insert(wd, dir.clone());
                }
                Err(err) => {
                    warn!(path = ?dir, error = %err, "could not watch directory; skipping");
                }
            }

            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    debug!(path = ?dir, error = %err, "could not list directory; skipping");
                    continue;
                }
            };

            for entry in entries.flatten() {
                match entry.file_type() {
                    Ok(ft) if ft.is_dir() => stack.push(entry.path()),
                    Ok(_) => {}
                    Err(err) => {
                        trace!(path = ?entry.path(), error = %err, "could not stat entry");
                    }
                }
            }
        }
    }

    /// Read and classify one batch of kernel events without blocking.
    ///
    /// An empty vector means nothing was pending; callers should back off
    /// before polling again. Events are returned in kernel delivery order,
    /// followed by any pending moves that just expired.
    pub fn poll_events(&mut self) -> Result<Vec<SemanticEvent>> {
        let now = Instant::now();

        let raw_events: Vec<RawEvent<WatchDescriptor>> =
            match self.inotify.read_events(&mut self.buffer) {
                Ok(events) => events
                    .map(|e| RawEvent {
                        handle: e.wd,
                        mask: e.mask,
                        cookie: e.cookie,
                        name: e.name.map(|n| n.to_os_string()),
                    })
                    .collect(),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => Vec::new(),
                Err(err) => return Err(GuardError::EventRead(err)),
            };

        let mut out = Vec::new();
        for raw in raw_events {
            let step = self.core.handle(raw, now);
            self.apply(step.actions);
            out.extend(step.events);
        }

        let expired = self.core.expire(now);
        self.apply(expired.actions);
        out.extend(expired.events);

        Ok(out)
    }

    fn apply(&mut self, actions: Vec<WatchAction<WatchDescriptor>>) {
        for action in actions {
            match action {
                WatchAction::RegisterRecursive(path) => self.register_recursive(&path),
                WatchAction::Release(handles) => {
                    for wd in handles {
                        // The kernel may already have dropped it.
                        if let Err(err) = self.inotify.watches().remove(wd) {
                            trace!(error = %err, "watch already gone");
                        }
                    }
                }
            }
        }
    }

    /// Release every watch, drop unmatched moves and close the channel.
    ///
    /// Returns how many watches were released.
    pub fn close(mut self) -> usize {
        let entries = self.core.release_all();
        let released = entries.len();

        for (wd, path) in entries {
            if let Err(err) = self.inotify.watches().remove(wd) {
                trace!(path = ?path, error = %err, "watch already gone");
            }
        }

        if let Err(err) = self.inotify.close() {
            warn!(root = %self.root, error = %err, "closing notification channel failed");
        }

        info!(root = %self.root, released, "watch tree closed");
        released
    }
}
