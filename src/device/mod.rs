// src/device/mod.rs

//! Removable device discovery.
//!
//! A device is identified only by its mount point: an immediate subdirectory
//! of the configured media root. [`DeviceRegistry`] snapshots that directory
//! and diffs successive snapshots into attach/detach deltas.

pub mod registry;

use std::fmt;
use std::path::{Path, PathBuf};

pub use registry::{DeviceDelta, DeviceRegistry, Snapshot};

/// Absolute path of a mounted device's top directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceRoot(PathBuf);

impl DeviceRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Last path component, used for thread names and short labels.
    pub fn name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.to_string_lossy().into_owned())
    }
}

impl AsRef<Path> for DeviceRoot {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for DeviceRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
