#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use mediaguard::device::DeviceRoot;
use tempfile::TempDir;

/// A throwaway media root whose subdirectories play the part of mounted
/// devices.
pub struct TempMediaRoot {
    dir: TempDir,
}

impl TempMediaRoot {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp media root"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create `<root>/<name>` and return it as a device root.
    pub fn attach(&self, name: &str) -> DeviceRoot {
        let path = self.device_path(name);
        fs::create_dir_all(&path).expect("create device dir");
        DeviceRoot::new(path)
    }

    /// Remove `<root>/<name>` and everything below it.
    pub fn detach(&self, name: &str) {
        fs::remove_dir_all(self.device_path(name)).expect("remove device dir");
    }

    pub fn device_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Default for TempMediaRoot {
    fn default() -> Self {
        Self::new()
    }
}
