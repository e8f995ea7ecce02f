// src/watch/table.rs

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};

/// Bidirectional map between kernel watch handles and the absolute paths
/// they watch, for a single device root.
///
/// At most one live entry per handle and at most one live handle per path.
#[derive(Debug)]
pub struct WatchTable<H> {
    by_handle: HashMap<H, PathBuf>,
    by_path: HashMap<PathBuf, H>,
}

impl<H> Default for WatchTable<H> {
    fn default() -> Self {
        Self {
            by_handle: HashMap::new(),
            by_path: HashMap::new(),
        }
    }
}

impl<H: Eq + Hash + Clone> WatchTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }

    /// Record `handle -> path`.
    ///
    /// Returns `false` when exactly this entry is already live. A handle that
    /// previously pointed elsewhere (the kernel hands out the same handle for
    /// the same inode) is re-pointed, and a path previously held by another
    /// handle drops that stale entry.
    pub fn insert(&mut self, handle: H, path: PathBuf) -> bool {
        if self.by_path.get(&path) == Some(&handle) {
            return false;
        }

        if let Some(old_path) = self.by_handle.remove(&handle) {
            self.by_path.remove(&old_path);
        }
        if let Some(old_handle) = self.by_path.remove(&path) {
            self.by_handle.remove(&old_handle);
        }

        self.by_path.insert(path.clone(), handle.clone());
        self.by_handle.insert(handle, path);
        true
    }

    pub fn path_of(&self, handle: &H) -> Option<&Path> {
        self.by_handle.get(handle).map(PathBuf::as_path)
    }

    pub fn handle_of(&self, path: &Path) -> Option<&H> {
        self.by_path.get(path)
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn remove(&mut self, handle: &H) -> Option<PathBuf> {
        let path = self.by_handle.remove(handle)?;
        self.by_path.remove(&path);
        Some(path)
    }

    /// Remove `dir` and every entry below it, returning the released handles.
    pub fn remove_subtree(&mut self, dir: &Path) -> Vec<H> {
        let doomed: Vec<PathBuf> = self
            .by_path
            .keys()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect();

        doomed
            .into_iter()
            .filter_map(|p| {
                let handle = self.by_path.remove(&p)?;
                self.by_handle.remove(&handle);
                Some(handle)
            })
            .collect()
    }

    /// Rewrite every path at or below `from` so it lives below `to` instead.
    ///
    /// Used when a watched directory is renamed inside the tree: the kernel
    /// keeps its handles, only our view of the paths changes.
    pub fn rebase(&mut self, from: &Path, to: &Path) {
        let moved: Vec<(PathBuf, H)> = self
            .by_path
            .iter()
            .filter(|(p, _)| p.starts_with(from))
            .map(|(p, h)| (p.clone(), h.clone()))
            .collect();

        for (old_path, _) in moved.iter() {
            self.by_path.remove(old_path);
        }

        for (old_path, handle) in moved {
            let Ok(suffix) = old_path.strip_prefix(from) else {
                continue;
            };
            let new_path = if suffix.as_os_str().is_empty() {
                to.to_path_buf()
            } else {
                to.join(suffix)
            };
            self.by_path.insert(new_path.clone(), handle.clone());
            self.by_handle.insert(handle, new_path);
        }
    }

    /// Empty the table, handing back every entry.
    pub fn drain(&mut self) -> Vec<(H, PathBuf)> {
        self.by_path.clear();
        self.by_handle.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinserting_same_entry_is_noop() {
        let mut table = WatchTable::new();
        assert!(table.insert(1, PathBuf::from("/m/x")));
        assert!(!table.insert(1, PathBuf::from("/m/x")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn path_has_at_most_one_handle() {
        let mut table = WatchTable::new();
        table.insert(1, PathBuf::from("/m/x"));
        table.insert(2, PathBuf::from("/m/x"));

        assert_eq!(table.len(), 1);
        assert_eq!(table.handle_of(Path::new("/m/x")), Some(&2));
        assert_eq!(table.path_of(&1), None);
    }

    #[test]
    fn remove_subtree_leaves_siblings() {
        let mut table = WatchTable::new();
        table.insert(1, PathBuf::from("/m/x"));
        table.insert(2, PathBuf::from("/m/x/a"));
        table.insert(3, PathBuf::from("/m/x/a/b"));
        table.insert(4, PathBuf::from("/m/x/ab"));

        let mut released = table.remove_subtree(Path::new("/m/x/a"));
        released.sort();
        assert_eq!(released, vec![2, 3]);
        assert_eq!(table.path_of(&4), Some(Path::new("/m/x/ab")));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn rebase_rewrites_nested_paths() {
        let mut table = WatchTable::new();
        table.insert(1, PathBuf::from("/m/x/old"));
        table.insert(2, PathBuf::from("/m/x/old/inner"));
        table.insert(3, PathBuf::from("/m/x/other"));

        table.rebase(Path::new("/m/x/old"), Path::new("/m/x/new"));

        assert_eq!(table.path_of(&1), Some(Path::new("/m/x/new")));
        assert_eq!(table.path_of(&2), Some(Path::new("/m/x/new/inner")));
        assert_eq!(table.path_of(&3), Some(Path::new("/m/x/other")));
        assert!(!table.contains_path(Path::new("/m/x/old")));
    }
}
