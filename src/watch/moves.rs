// src/watch/moves.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Correlation token shared by a move-away / move-in pair.
pub type Cookie = u32;

/// A move-away still waiting for its move-in counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    pub source: PathBuf,
    pub is_dir: bool,
    pub since: Instant,
}

/// Pending moves keyed by cookie; one entry per cookie at most.
#[derive(Debug, Default)]
pub struct PendingMoveTable {
    entries: HashMap<Cookie, PendingMove>,
}

impl PendingMoveTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Park a move-away. Returns the entry it displaced, if the cookie was
    /// somehow already pending.
    pub fn insert(&mut self, cookie: Cookie, pending: PendingMove) -> Option<PendingMove> {
        self.entries.insert(cookie, pending)
    }

    /// Consume the pending entry for `cookie`.
    pub fn take(&mut self, cookie: Cookie) -> Option<PendingMove> {
        self.entries.remove(&cookie)
    }

    pub fn is_pending_source(&self, path: &Path) -> bool {
        self.entries.values().any(|p| p.source == path)
    }

    /// Remove and return every entry at least `ttl` old, oldest first.
    pub fn expire(&mut self, now: Instant, ttl: Duration) -> Vec<PendingMove> {
        let stale: Vec<Cookie> = self
            .entries
            .iter()
            .filter(|(_, p)| now.saturating_duration_since(p.since) >= ttl)
            .map(|(c, _)| *c)
            .collect();

        let mut expired: Vec<PendingMove> = stale
            .into_iter()
            .filter_map(|c| self.entries.remove(&c))
            .collect();
        expired.sort_by_key(|p| p.since);
        expired
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
