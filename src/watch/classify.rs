// src/watch/classify.rs

//! Pure event classification core.
//!
//! [`WatchCore`] turns decoded kernel notifications into [`SemanticEvent`]s
//! and tells the IO shell (`watch::tree::WatchTree`) which watches to add or
//! release. It owns the [`WatchTable`] and [`PendingMoveTable`] of one device
//! root but never touches the kernel or the filesystem itself, so every
//! classification and correlation rule can be unit tested with synthetic
//! events.

use std::ffi::OsString;
use std::fmt;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use inotify::EventMask;
use tracing::{debug, trace, warn};

use crate::watch::event::SemanticEvent;
use crate::watch::ignore::IgnoreSet;
use crate::watch::moves::{Cookie, PendingMove, PendingMoveTable};
use crate::watch::table::WatchTable;

/// One kernel notification, decoded but not yet interpreted.
#[derive(Debug, Clone)]
pub struct RawEvent<H> {
    pub handle: H,
    pub mask: EventMask,
    pub cookie: Cookie,
    /// Entry name relative to the watched directory; `None` when the event
    /// concerns the watched directory itself.
    pub name: Option<OsString>,
}

/// Side effect the IO shell must perform on the kernel channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction<H> {
    /// Watch this new directory and everything below it.
    RegisterRecursive(PathBuf),
    /// These handles were purged from the table but may still be live in the
    /// kernel; remove them.
    Release(Vec<H>),
}

/// Result of feeding one event (or one expiry pass) into the core.
#[derive(Debug)]
pub struct CoreStep<H> {
    pub events: Vec<SemanticEvent>,
    pub actions: Vec<WatchAction<H>>,
}

impl<H> CoreStep<H> {
    fn empty() -> Self {
        Self {
            events: Vec::new(),
            actions: Vec::new(),
        }
    }
}

/// Classification and move-correlation state for one device root.
pub struct WatchCore<H> {
    root: PathBuf,
    table: WatchTable<H>,
    moves: PendingMoveTable,
    move_ttl: Duration,
    ignore: IgnoreSet,
}

impl<H> fmt::Debug for WatchCore<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchCore")
            .field("root", &self.root)
            .field("move_ttl", &self.move_ttl)
            .field("pending_moves", &self.moves.len())
            .finish_non_exhaustive()
    }
}

impl<H: Eq + Hash + Clone + fmt::Debug> WatchCore<H> {
    pub fn new(root: impl Into<PathBuf>, move_ttl: Duration, ignore: IgnoreSet) -> Self {
        Self {
            root: root.into(),
            table: WatchTable::new(),
            moves: PendingMoveTable::new(),
            move_ttl,
            ignore,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table(&self) -> &WatchTable<H> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut WatchTable<H> {
        &mut self.table
    }

    pub fn pending_moves(&self) -> &PendingMoveTable {
        &self.moves
    }

    /// Interpret a single kernel event.
    ///
    /// Flags are checked independently and in a fixed order, so an event
    /// carrying several bits yields one semantic event per bit.
    pub fn handle(&mut self, raw: RawEvent<H>, now: Instant) -> CoreStep<H> {
        let mut step = CoreStep::empty();
        let mask = raw.mask;

        if mask.contains(EventMask::Q_OVERFLOW) {
            warn!(root = ?self.root, "kernel event queue overflowed; some changes were lost");
            return step;
        }

        if mask.contains(EventMask::IGNORED) {
            if let Some(path) = self.table.remove(&raw.handle) {
                trace!(path = ?path, "watch invalidated by kernel");
            }
            return step;
        }

        let Some(base) = self.table.path_of(&raw.handle).map(Path::to_path_buf) else {
            debug!(handle = ?raw.handle, mask = ?mask, "event for unknown watch handle; dropping");
            return step;
        };

        let is_dir = mask.contains(EventMask::ISDIR);
        let path = match &raw.name {
            Some(name) => base.join(name),
            None => base.clone(),
        };

        if mask.contains(EventMask::CREATE) {
            step.events.push(SemanticEvent::Created {
                path: path.clone(),
                is_dir,
            });
            if is_dir {
                step.actions.push(WatchAction::RegisterRecursive(path.clone()));
            }
        }

        if mask.contains(EventMask::DELETE) {
            step.events.push(SemanticEvent::Deleted { path: path.clone() });
        }

        if mask.contains(EventMask::MODIFY) {
            step.events.push(SemanticEvent::Modified { path: path.clone() });
        }

        if mask.contains(EventMask::ATTRIB) {
            step.events
                .push(SemanticEvent::AttributeChanged { path: path.clone() });
        }

        if mask.contains(EventMask::MOVED_FROM) && raw.name.is_some() {
            let pending = PendingMove {
                source: path.clone(),
                is_dir,
                since: now,
            };
            if let Some(displaced) = self.moves.insert(raw.cookie, pending) {
                warn!(cookie = raw.cookie, source = ?displaced.source, "cookie reused before its move completed");
            }
        }

        if mask.contains(EventMask::MOVED_TO) && raw.name.is_some() {
            self.complete_move(raw.cookie, path.clone(), is_dir, &mut step);
        }

        if mask.contains(EventMask::DELETE_SELF) && self.table.remove(&raw.handle).is_some() {
            trace!(path = ?base, "watched directory deleted");
        }

        if mask.contains(EventMask::MOVE_SELF) && self.moves.is_pending_source(&base) {
            // The directory left the tree; its handle and every handle below
            // it still report events from the new, unwatched location.
            let released = self.table.remove_subtree(&base);
            debug!(path = ?base, released = released.len(), "watched directory moved away");
            if !released.is_empty() {
                step.actions.push(WatchAction::Release(released));
            }
        }

        self.retain_visible(&mut step);
        step
    }

    fn complete_move(&mut self, cookie: Cookie, to: PathBuf, is_dir: bool, step: &mut CoreStep<H>) {
        match self.moves.take(cookie) {
            Some(pending) => {
                if is_dir {
                    self.table.rebase(&pending.source, &to);
                }
                let event = if pending.source.parent() == to.parent() {
                    SemanticEvent::Renamed {
                        from: pending.source,
                        to,
                    }
                } else {
                    SemanticEvent::Moved {
                        from: pending.source,
                        to,
                    }
                };
                step.events.push(event);
            }
            None => {
                step.events
                    .push(SemanticEvent::CreatedFromExternalMove { path: to.clone() });
                if is_dir {
                    step.actions.push(WatchAction::RegisterRecursive(to));
                }
            }
        }
    }

    /// Report pending moves older than the configured TTL as deletions: the
    /// source left every watched tree and no move-in will ever pair with it.
    pub fn expire(&mut self, now: Instant) -> CoreStep<H> {
        let mut step = CoreStep::empty();

        for pending in self.moves.expire(now, self.move_ttl) {
            debug!(source = ?pending.source, "pending move expired; treating as deletion");
            if pending.is_dir {
                let released = self.table.remove_subtree(&pending.source);
                if !released.is_empty() {
                    step.actions.push(WatchAction::Release(released));
                }
            }
            step.events.push(SemanticEvent::Deleted {
                path: pending.source,
            });
        }

        self.retain_visible(&mut step);
        step
    }

    /// Forget everything: every table entry is handed back so the shell can
    /// release it, and unmatched moves are dropped.
    pub fn release_all(&mut self) -> Vec<(H, PathBuf)> {
        self.moves.clear();
        self.table.drain()
    }

    fn retain_visible(&self, step: &mut CoreStep<H>) {
        if self.ignore.is_empty() {
            return;
        }
        step.events
            .retain(|event| !self.ignore.suppresses(&self.root, event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/media/x";

    fn core() -> WatchCore<i32> {
        let mut core = WatchCore::new(ROOT, Duration::from_secs(2), IgnoreSet::default());
        core.table_mut().insert(1, PathBuf::from(ROOT));
        core.table_mut().insert(2, PathBuf::from("/media/x/sub"));
        core
    }

    fn raw(handle: i32, mask: EventMask, cookie: Cookie, name: Option<&str>) -> RawEvent<i32> {
        RawEvent {
            handle,
            mask,
            cookie,
            name: name.map(OsString::from),
        }
    }

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn create_file_and_dir() {
        let mut core = core();
        let now = Instant::now();

        let step = core.handle(raw(1, EventMask::CREATE, 0, Some("a.txt")), now);
        assert_eq!(
            step.events,
            vec![SemanticEvent::Created {
                path: p("/media/x/a.txt"),
                is_dir: false
            }]
        );
        assert!(step.actions.is_empty());

        let step = core.handle(
            raw(1, EventMask::CREATE | EventMask::ISDIR, 0, Some("d")),
            now,
        );
        assert_eq!(
            step.events,
            vec![SemanticEvent::Created {
                path: p("/media/x/d"),
                is_dir: true
            }]
        );
        assert_eq!(
            step.actions,
            vec![WatchAction::RegisterRecursive(p("/media/x/d"))]
        );
    }

    #[test]
    fn delete_modify_attrib_map_one_to_one() {
        let mut core = core();
        let now = Instant::now();

        let deleted = core.handle(raw(2, EventMask::DELETE, 0, Some("f")), now);
        let modified = core.handle(raw(2, EventMask::MODIFY, 0, Some("f")), now);
        let attrib = core.handle(raw(2, EventMask::ATTRIB, 0, Some("f")), now);

        assert_eq!(deleted.events, vec![SemanticEvent::Deleted { path: p("/media/x/sub/f") }]);
        assert_eq!(modified.events, vec![SemanticEvent::Modified { path: p("/media/x/sub/f") }]);
        assert_eq!(
            attrib.events,
            vec![SemanticEvent::AttributeChanged { path: p("/media/x/sub/f") }]
        );
    }

    #[test]
    fn same_parent_pair_is_a_rename() {
        let mut core = core();
        let now = Instant::now();

        let away = core.handle(raw(1, EventMask::MOVED_FROM, 42, Some("a.txt")), now);
        assert!(away.events.is_empty());
        assert_eq!(core.pending_moves().len(), 1);

        let back = core.handle(raw(1, EventMask::MOVED_TO, 42, Some("b.txt")), now);
        assert_eq!(
            back.events,
            vec![SemanticEvent::Renamed {
                from: p("/media/x/a.txt"),
                to: p("/media/x/b.txt")
            }]
        );
        assert!(core.pending_moves().is_empty());
    }

    #[test]
    fn different_parent_pair_is_a_move() {
        let mut core = core();
        let now = Instant::now();

        core.handle(raw(1, EventMask::MOVED_FROM, 9, Some("b.txt")), now);
        let step = core.handle(raw(2, EventMask::MOVED_TO, 9, Some("b.txt")), now);

        assert_eq!(
            step.events,
            vec![SemanticEvent::Moved {
                from: p("/media/x/b.txt"),
                to: p("/media/x/sub/b.txt")
            }]
        );
        assert!(core.pending_moves().is_empty());
    }

    #[test]
    fn unmatched_move_in_is_external_and_leaves_other_tokens_alone() {
        let mut core = core();
        let now = Instant::now();

        core.handle(raw(1, EventMask::MOVED_FROM, 5, Some("keep.txt")), now);
        let step = core.handle(raw(2, EventMask::MOVED_TO, 6, Some("new.txt")), now);

        assert_eq!(
            step.events,
            vec![SemanticEvent::CreatedFromExternalMove {
                path: p("/media/x/sub/new.txt")
            }]
        );
        assert_eq!(core.pending_moves().len(), 1);
        assert!(core.pending_moves().is_pending_source(Path::new("/media/x/keep.txt")));
    }

    #[test]
    fn external_directory_move_in_is_registered() {
        let mut core = core();
        let step = core.handle(
            raw(1, EventMask::MOVED_TO | EventMask::ISDIR, 3, Some("incoming")),
            Instant::now(),
        );
        assert_eq!(
            step.actions,
            vec![WatchAction::RegisterRecursive(p("/media/x/incoming"))]
        );
    }

    #[test]
    fn renamed_directory_keeps_its_handles() {
        let mut core = core();
        core.table_mut().insert(3, p("/media/x/sub/deep"));
        let now = Instant::now();

        core.handle(raw(1, EventMask::MOVED_FROM | EventMask::ISDIR, 11, Some("sub")), now);
        core.handle(raw(1, EventMask::MOVED_TO | EventMask::ISDIR, 11, Some("renamed")), now);
        let self_move = core.handle(raw(2, EventMask::MOVE_SELF, 0, None), now);

        assert!(self_move.actions.is_empty());
        assert_eq!(core.table().path_of(&2), Some(Path::new("/media/x/renamed")));
        assert_eq!(core.table().path_of(&3), Some(Path::new("/media/x/renamed/deep")));

        let step = core.handle(raw(3, EventMask::CREATE, 0, Some("f")), now);
        assert_eq!(
            step.events,
            vec![SemanticEvent::Created {
                path: p("/media/x/renamed/deep/f"),
                is_dir: false
            }]
        );
    }

    #[test]
    fn directory_moved_out_is_purged() {
        let mut core = core();
        core.table_mut().insert(3, p("/media/x/sub/deep"));
        let now = Instant::now();

        core.handle(raw(1, EventMask::MOVED_FROM | EventMask::ISDIR, 12, Some("sub")), now);
        let step = core.handle(raw(2, EventMask::MOVE_SELF, 0, None), now);

        match step.actions.as_slice() {
            [WatchAction::Release(handles)] => {
                let mut handles = handles.clone();
                handles.sort();
                assert_eq!(handles, vec![2, 3]);
            }
            other => panic!("expected a single release, got {other:?}"),
        }
        assert!(core.table().path_of(&2).is_none());
        assert_eq!(core.table().len(), 1);
    }

    #[test]
    fn delete_self_and_ignored_purge_entry() {
        let mut core = core();
        let now = Instant::now();

        core.handle(raw(2, EventMask::DELETE_SELF, 0, None), now);
        assert!(core.table().path_of(&2).is_none());

        core.table_mut().insert(4, p("/media/x/other"));
        core.handle(raw(4, EventMask::IGNORED, 0, None), now);
        assert!(core.table().path_of(&4).is_none());
    }

    #[test]
    fn stale_handle_is_dropped() {
        let mut core = core();
        let step = core.handle(raw(99, EventMask::CREATE, 0, Some("x")), Instant::now());
        assert!(step.events.is_empty());
    }

    #[test]
    fn expired_move_becomes_deletion() {
        let mut core = core();
        let start = Instant::now();

        core.handle(raw(1, EventMask::MOVED_FROM, 77, Some("gone.txt")), start);
        assert!(core.expire(start + Duration::from_millis(500)).events.is_empty());

        let step = core.expire(start + Duration::from_secs(3));
        assert_eq!(step.events, vec![SemanticEvent::Deleted { path: p("/media/x/gone.txt") }]);
        assert!(core.pending_moves().is_empty());
    }

    #[test]
    fn ignored_paths_are_filtered() {
        let ignore = IgnoreSet::new(&[".Trash-*/**".to_string()]).unwrap();
        let mut core = WatchCore::new(ROOT, Duration::from_secs(2), ignore);
        core.table_mut().insert(1, p(ROOT));
        core.table_mut().insert(5, p("/media/x/.Trash-1000"));

        let step = core.handle(raw(5, EventMask::CREATE, 0, Some("junk")), Instant::now());
        assert!(step.events.is_empty());
    }

    #[test]
    fn release_all_empties_both_tables() {
        let mut core = core();
        core.handle(raw(1, EventMask::MOVED_FROM, 1, Some("a")), Instant::now());

        let released = core.release_all();
        assert_eq!(released.len(), 2);
        assert!(core.table().is_empty());
        assert!(core.pending_moves().is_empty());
    }
}
