// src/device/registry.rs

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::DeviceRoot;

/// Set of device roots observed at one poll tick.
pub type Snapshot = BTreeSet<DeviceRoot>;

/// Attach/detach changes between two snapshots.
///
/// A path appears in at most one of the two lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDelta {
    pub attached: Vec<DeviceRoot>,
    pub detached: Vec<DeviceRoot>,
}

impl DeviceDelta {
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty() && self.detached.is_empty()
    }

    /// `attached = current - previous`, `detached = previous - current`.
    pub fn between(previous: &Snapshot, current: &Snapshot) -> Self {
        Self {
            attached: current.difference(previous).cloned().collect(),
            detached: previous.difference(current).cloned().collect(),
        }
    }
}

/// Lists the device mount points below one parent directory.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    parent: PathBuf,
}

impl DeviceRegistry {
    pub fn new(parent: impl Into<PathBuf>) -> Self {
        Self {
            parent: parent.into(),
        }
    }

    pub fn parent(&self) -> &Path {
        &self.parent
    }

    /// Take a snapshot of the directories directly below the parent.
    ///
    /// Never fails: an unreadable parent (not mounted yet, permissions in
    /// flux while a device settles) is reported as "nothing attached", and
    /// entries that vanish mid-listing are skipped.
    pub fn snapshot(&self) -> Snapshot {
        let entries = match fs::read_dir(&self.parent) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(parent = ?self.parent, error = %err, "media root not readable; assuming no devices");
                return Snapshot::new();
            }
        };

        let mut roots = Snapshot::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    trace!(parent = ?self.parent, error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            // Follows symlinks, so a link to a mount point counts as a device.
            let path = entry.path();
            if path.is_dir() {
                roots.insert(DeviceRoot::new(path));
            }
        }
        roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(paths: &[&str]) -> Snapshot {
        paths.iter().map(|p| DeviceRoot::new(*p)).collect()
    }

    #[test]
    fn delta_reports_both_directions() {
        let previous = snap(&["/media/a", "/media/b"]);
        let current = snap(&["/media/b", "/media/c"]);

        let delta = DeviceDelta::between(&previous, &current);
        assert_eq!(delta.attached, vec![DeviceRoot::new("/media/c")]);
        assert_eq!(delta.detached, vec![DeviceRoot::new("/media/a")]);
    }

    #[test]
    fn identical_snapshots_yield_empty_delta() {
        let s = snap(&["/media/a"]);
        assert!(DeviceDelta::between(&s, &s).is_empty());
    }

    #[test]
    fn missing_parent_is_an_empty_snapshot() {
        let registry = DeviceRegistry::new("/definitely/not/a/real/media/root");
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn snapshot_lists_only_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("stick")).unwrap();
        fs::write(dir.path().join("stray.txt"), b"x").unwrap();

        let registry = DeviceRegistry::new(dir.path());
        let snapshot = registry.snapshot();
        assert_eq!(snapshot, snap(&[dir.path().join("stick").to_str().unwrap()]));
    }
}
