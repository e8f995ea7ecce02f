// src/session/mod.rs

//! Per-device monitor sessions.
//!
//! A [`MonitorSession`] drives one `WatchTree` on its own OS thread. The
//! supervisor owns the session handle and is the only one allowed to stop
//! it; [`CancelToken`] is the only state shared with the thread.

pub mod cancel;
pub mod monitor;

pub use cancel::CancelToken;
pub use monitor::{MonitorSession, SessionOptions, SessionReport, SessionState};
