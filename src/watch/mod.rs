// src/watch/mod.rs

//! Recursive change monitoring for one device root.
//!
//! This module is responsible for:
//! - Mapping kernel watch handles to paths ([`table`]).
//! - Holding move-away events until their move-in arrives ([`moves`]).
//! - Classifying raw inotify events into [`SemanticEvent`]s ([`classify`]).
//! - Owning the inotify channel and growing the watch set ([`tree`]).
//!
//! It knows nothing about sessions, threads or notification delivery.

pub mod classify;
pub mod event;
pub mod ignore;
pub mod moves;
pub mod table;
pub mod tree;

pub use classify::{CoreStep, RawEvent, WatchAction, WatchCore};
pub use event::SemanticEvent;
pub use ignore::IgnoreSet;
pub use moves::{Cookie, PendingMove, PendingMoveTable};
pub use table::WatchTable;
pub use tree::{TreeOptions, WatchTree};
