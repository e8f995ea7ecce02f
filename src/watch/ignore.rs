// src/watch/ignore.rs

//! `[usb].ignore` glob handling.

use std::fmt;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::{GuardError, Result};
use crate::watch::event::SemanticEvent;

/// Compiled ignore globs, matched against paths relative to a device root
/// (forward slashes, no leading `./`).
#[derive(Clone, Default)]
pub struct IgnoreSet {
    set: Option<GlobSet>,
}

impl fmt::Debug for IgnoreSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreSet")
            .field("patterns", &self.set.as_ref().map_or(0, GlobSet::len))
            .finish()
    }
}

impl IgnoreSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::default());
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                GuardError::ConfigError(format!("invalid ignore pattern '{pattern}': {e}"))
            })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| GuardError::ConfigError(format!("building ignore set: {e}")))?;

        Ok(Self { set: Some(set) })
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_none()
    }

    pub fn matches(&self, root: &Path, path: &Path) -> bool {
        let Some(set) = &self.set else {
            return false;
        };
        match relative_str(root, path) {
            Some(rel) => set.is_match(rel),
            None => false,
        }
    }

    /// An event is suppressed only when every path it mentions is ignored,
    /// so moves into or out of an ignored area stay visible.
    pub fn suppresses(&self, root: &Path, event: &SemanticEvent) -> bool {
        if self.is_empty() {
            return false;
        }
        event.paths().iter().all(|p| self.matches(root, p))
    }
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if the path is not under `root`.
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn trash_directory_is_ignored() {
        let ignore = IgnoreSet::new(&[".Trash-*/**".to_string()]).unwrap();
        let root = Path::new("/media/x");

        assert!(ignore.matches(root, Path::new("/media/x/.Trash-1000/files/a")));
        assert!(!ignore.matches(root, Path::new("/media/x/docs/a")));
    }

    #[test]
    fn move_out_of_ignored_area_is_kept() {
        let ignore = IgnoreSet::new(&["tmp/**".to_string()]).unwrap();
        let root = Path::new("/media/x");
        let moved = SemanticEvent::Moved {
            from: PathBuf::from("/media/x/tmp/a"),
            to: PathBuf::from("/media/x/a"),
        };
        assert!(!ignore.suppresses(root, &moved));

        let deleted = SemanticEvent::Deleted {
            path: PathBuf::from("/media/x/tmp/a"),
        };
        assert!(ignore.suppresses(root, &deleted));
    }
}
