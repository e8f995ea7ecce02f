// src/watch/event.rs

use std::fmt;
use std::path::{Path, PathBuf};

/// Classified, user-facing description of one filesystem change under a
/// device root. This is what the notifier receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticEvent {
    Created { path: PathBuf, is_dir: bool },
    Deleted { path: PathBuf },
    Modified { path: PathBuf },
    AttributeChanged { path: PathBuf },
    /// Move-away and move-in shared a cookie and a parent directory.
    Renamed { from: PathBuf, to: PathBuf },
    /// Move-away and move-in shared a cookie but not a parent directory.
    Moved { from: PathBuf, to: PathBuf },
    /// Move-in whose source lies outside any watched tree.
    CreatedFromExternalMove { path: PathBuf },
}

impl SemanticEvent {
    /// Every path the event mentions, source first.
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            SemanticEvent::Created { path, .. }
            | SemanticEvent::Deleted { path }
            | SemanticEvent::Modified { path }
            | SemanticEvent::AttributeChanged { path }
            | SemanticEvent::CreatedFromExternalMove { path } => vec![path.as_path()],
            SemanticEvent::Renamed { from, to } | SemanticEvent::Moved { from, to } => {
                vec![from.as_path(), to.as_path()]
            }
        }
    }
}

impl fmt::Display for SemanticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticEvent::Created { path, is_dir: true } => {
                write!(f, "[CREATED dir] {}", path.display())
            }
            SemanticEvent::Created { path, is_dir: false } => {
                write!(f, "[CREATED file] {}", path.display())
            }
            SemanticEvent::Deleted { path } => write!(f, "[DELETED] {}", path.display()),
            SemanticEvent::Modified { path } => write!(f, "[MODIFIED] {}", path.display()),
            SemanticEvent::AttributeChanged { path } => {
                write!(f, "[ATTRIB changed] {}", path.display())
            }
            SemanticEvent::Renamed { from, to } => {
                write!(f, "[RENAMED] {} -> {}", from.display(), to.display())
            }
            SemanticEvent::Moved { from, to } => {
                write!(f, "[MOVED] {} -> {}", from.display(), to.display())
            }
            SemanticEvent::CreatedFromExternalMove { path } => {
                write!(f, "[CREATED (moved in)] {}", path.display())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_human_readable() {
        let renamed = SemanticEvent::Renamed {
            from: PathBuf::from("/media/x/a.txt"),
            to: PathBuf::from("/media/x/b.txt"),
        };
        assert_eq!(renamed.to_string(), "[RENAMED] /media/x/a.txt -> /media/x/b.txt");

        let created = SemanticEvent::Created {
            path: PathBuf::from("/media/x/d"),
            is_dir: true,
        };
        assert_eq!(created.to_string(), "[CREATED dir] /media/x/d");
    }
}
